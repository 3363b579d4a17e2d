use dmr_core::SlotNo;
use dmr_pdus::DmrData;
use dmr_pdus::network::homebrew;

pub mod dmr_network;
pub mod transports;
pub mod worker;

/// Packets the slots hand to the network, encoded by the worker with the repeater id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkFrame {
    Data(DmrData),
    /// Talker alias header or block, as received in the embedded LC
    TalkerAlias { slot_no: SlotNo, src_id: u32, block: u8, raw: [u8; 9] },
    /// GPS Info LC of the transmitting radio
    RadioPosition { slot_no: SlotNo, src_id: u32, raw: [u8; 9] },
}

impl NetworkFrame {
    pub fn slot_no(&self) -> SlotNo {
        match self {
            NetworkFrame::Data(data) => data.slot_no,
            NetworkFrame::TalkerAlias { slot_no, .. } => *slot_no,
            NetworkFrame::RadioPosition { slot_no, .. } => *slot_no,
        }
    }

    pub fn to_bytes(&self, repeater_id: u32) -> Vec<u8> {
        match self {
            NetworkFrame::Data(data) => data.to_dmrd(repeater_id).to_vec(),
            NetworkFrame::TalkerAlias { src_id, block, raw, .. } => homebrew::build_talker_alias(repeater_id, *src_id, *block, raw).to_vec(),
            NetworkFrame::RadioPosition { src_id, raw, .. } => homebrew::build_radio_position(repeater_id, *src_id, raw).to_vec(),
        }
    }
}
