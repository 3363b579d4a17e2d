//! DMR air-interface and host wire formats
//!
//! - burst: fields living in fixed positions of a 33 byte burst (sync, slot type, EMB, short LC)
//! - lc: link control, full and embedded, plus talker alias and GPS payloads
//! - csbk, data_header: the BPTC protected control payloads
//! - network: call packets exchanged with the network and their homebrew encoding
//! - modem: MMDVM frame envelope

pub mod burst;
pub mod csbk;
pub mod data_header;
pub mod lc;
pub mod modem;
pub mod network;

pub use csbk::pdus::csbk::{Csbk, CsbkBody};
pub use csbk::enums::csbko::Csbko;
pub use data_header::pdus::data_header::{DataHeader, DataHeaderBody};
pub use data_header::enums::dpf::Dpf;
pub use lc::embedded_data::EmbeddedData;
pub use lc::full_lc::FullLc;
pub use lc::link_control::Lc;
pub use modem::mmdvm_command::MmdvmCommand;
pub use modem::mmdvm_frame::MmdvmFrame;
pub use network::dmr_data::DmrData;
