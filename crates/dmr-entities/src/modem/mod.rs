//! MMDVM modem link: host protocol framing over a datagram transport

use dmr_core::SlotNo;

pub mod udp_modem;

pub use udp_modem::UdpModem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModemEvent {
    /// Burst in host layout [tag, flags, 33 bytes, (rssi)], or a lone Lost tag
    Burst { slot_no: SlotNo, burst: Vec<u8> },
    /// Free DMR buffer space per slot, in bursts
    Status { tx: bool, dmr_space1: u8, dmr_space2: u8 },
    Version { protocol: u8, description: String },
    Ack { command: u8 },
    Nak { command: u8, reason: u8 },
}
