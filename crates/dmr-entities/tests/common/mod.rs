#![allow(dead_code)]

pub mod bursts;

use std::sync::Arc;

use dmr_config::DmrConfig;
use dmr_core::SlotNo;
use dmr_core::defines::{DMR_FRAME_LENGTH_BYTES, MODEM_BURST_LEN};
use dmr_entities::{DmrSlot, NetworkFrame, TableLookup};

pub use bursts::*;

pub const REPEATER_ID: u32 = 2345678;
pub const SRC_ID: u32 = 2345001;

/// Creates a default config for testing: duplex, colour code 1, no network
/// section (so no jitter buffer). It can still be modified as needed before
/// passing it to `new_slot`
pub fn default_test_config() -> DmrConfig {
    DmrConfig::new(REPEATER_ID, 1)
}

pub fn new_slot(config: DmrConfig, slot_no: SlotNo) -> DmrSlot {
    let lookup = TableLookup::from_lines("2345001 PD0ABC Alice\n2345002 PD0XYZ Bob\n");
    DmrSlot::new(slot_no, Arc::new(config), Arc::new(lookup))
}

/// Everything queued towards the modem
pub fn drain_modem(slot: &mut DmrSlot) -> Vec<[u8; MODEM_BURST_LEN]> {
    std::iter::from_fn(|| slot.read_modem()).collect()
}

/// Everything queued towards the network
pub fn drain_network(slot: &mut DmrSlot) -> Vec<NetworkFrame> {
    std::iter::from_fn(|| slot.read_network()).collect()
}

/// The 33 burst bytes of a queued modem entry
pub fn payload(entry: &[u8; MODEM_BURST_LEN]) -> [u8; DMR_FRAME_LENGTH_BYTES] {
    let mut burst = [0u8; DMR_FRAME_LENGTH_BYTES];
    burst.copy_from_slice(&entry[2..]);
    burst
}
