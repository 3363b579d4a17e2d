//! DMR protocol engine of the MMDVM host
//!
//! - slot: the per-timeslot RF and network state machines
//! - dmr_control: both slots plus the short LC activity update
//! - access_control: source, destination and talkgroup rewrite policy
//! - modem, network: the UDP links to the modem and the network gateway

pub mod access_control;
pub mod dmr_control;
pub mod lookup;
pub mod modem;
pub mod network;
pub mod rssi;
pub mod slot;

pub use access_control::{AccessControl, SlotRewriteState};
pub use dmr_control::DmrControl;
pub use lookup::{IdLookup, TableLookup};
pub use modem::{ModemEvent, UdpModem};
pub use network::NetworkFrame;
pub use network::dmr_network::DmrNetwork;
pub use rssi::RssiMapper;
pub use slot::dmr_slot::{DmrSlot, NetState, RfState};
