use std::sync::Arc;

use dmr_config::SharedConfig;
use dmr_core::SlotNo;
use dmr_core::defines::MODEM_BURST_LEN;
use dmr_pdus::DmrData;
use dmr_pdus::burst::short_lc::{self, SlotActivity};

use crate::lookup::IdLookup;
use crate::network::NetworkFrame;
use crate::slot::dmr_slot::DmrSlot;

/// Owns both timeslots and routes modem bursts and network packets to them.
/// Also produces the short LC activity update shared by the two slots.
pub struct DmrControl {
    config: SharedConfig,
    slot1: DmrSlot,
    slot2: DmrSlot,
    activity: [SlotActivity; 2],
    /// Network side gets slot 1 and slot 2 packets in turn
    next_read: SlotNo,
}

impl DmrControl {
    pub fn new(config: SharedConfig, lookup: Arc<dyn IdLookup>) -> Self {
        let cfg = config.config();
        tracing::info!(
            "DMR id {}, colour code {}, {}",
            cfg.dmr.id,
            cfg.dmr.color_code,
            if cfg.dmr.duplex { "duplex" } else { "simplex" }
        );
        Self {
            slot1: DmrSlot::new(1, Arc::clone(&cfg), Arc::clone(&lookup)),
            slot2: DmrSlot::new(2, cfg, lookup),
            config,
            activity: [SlotActivity::default(); 2],
            next_read: 1,
        }
    }

    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    pub fn slot(&self, slot_no: SlotNo) -> Option<&DmrSlot> {
        match slot_no {
            1 => Some(&self.slot1),
            2 => Some(&self.slot2),
            _ => None,
        }
    }

    fn slot_mut(&mut self, slot_no: SlotNo) -> Option<&mut DmrSlot> {
        match slot_no {
            1 => Some(&mut self.slot1),
            2 => Some(&mut self.slot2),
            _ => None,
        }
    }

    pub fn write_modem(&mut self, slot_no: SlotNo, data: &[u8]) -> bool {
        match self.slot_mut(slot_no) {
            Some(slot) => slot.write_modem(data),
            None => {
                tracing::warn!("burst for unknown slot {}", slot_no);
                false
            }
        }
    }

    pub fn read_modem(&mut self, slot_no: SlotNo) -> Option<[u8; MODEM_BURST_LEN]> {
        self.slot_mut(slot_no)?.read_modem()
    }

    /// Routes a network packet by its slot number. Packets for a slot the network
    /// does not carry are dropped.
    pub fn write_network(&mut self, data: &DmrData) -> bool {
        let carried = self.config.config().network.as_ref().is_none_or(|n| n.carries_slot(data.slot_no));
        if !carried {
            tracing::debug!("dropping network packet for slot {}", data.slot_no);
            return false;
        }
        match self.slot_mut(data.slot_no) {
            Some(slot) => slot.write_network(data),
            None => {
                tracing::warn!("network packet for unknown slot {}", data.slot_no);
                false
            }
        }
    }

    pub fn read_network(&mut self) -> Option<NetworkFrame> {
        let first = self.next_read;
        let second = if first == 1 { 2 } else { 1 };
        self.next_read = second;

        if let Some(frame) = self.slot_mut(first).and_then(|s| s.read_network()) {
            return Some(frame);
        }
        self.slot_mut(second).and_then(|s| s.read_network())
    }

    pub fn clock(&mut self, ms: u32) {
        self.slot1.clock(ms);
        self.slot2.clock(ms);
    }

    /// Encoded short LC when the activity of either slot changed since the last call
    pub fn short_lc(&mut self) -> Option<[u8; 9]> {
        let changed1 = self.slot1.take_activity_change();
        let changed2 = self.slot2.take_activity_change();
        if changed1.is_none() && changed2.is_none() {
            return None;
        }
        if let Some(a) = changed1 {
            self.activity[0] = a;
        }
        if let Some(a) = changed2 {
            self.activity[1] = a;
        }

        let lc = short_lc::build_activity_update(&self.activity[0], &self.activity[1]);
        tracing::debug!("short LC activity update {:02X?}", lc);
        Some(short_lc::encode(&lc))
    }
}

#[cfg(test)]
mod tests {
    use dmr_core::debug;
    use dmr_core::defines::{DataType, Flco};
    use dmr_pdus::{FullLc, Lc};

    use super::*;
    use crate::lookup::TableLookup;

    fn net_header(slot_no: SlotNo, dst_id: u32) -> DmrData {
        let mut data = DmrData::new(slot_no, DataType::VoiceLcHeader);
        data.src_id = 2345001;
        data.dst_id = dst_id;
        FullLc::encode(&Lc::new(Flco::Group, 2345001, dst_id), DataType::VoiceLcHeader, &mut data.data);
        data
    }

    #[test]
    fn test_routes_by_slot() {
        debug::setup_logging_verbose();
        let mut ctrl = DmrControl::new(SharedConfig::new(2345678, 1), Arc::new(TableLookup::default()));
        assert!(ctrl.write_network(&net_header(2, 91)));
        assert!(ctrl.read_modem(1).is_none());
        assert!(ctrl.read_modem(2).is_some());
        assert!(!ctrl.write_network(&net_header(3, 91)));
    }

    #[test]
    fn test_short_lc_on_change_only() {
        let mut ctrl = DmrControl::new(SharedConfig::new(2345678, 1), Arc::new(TableLookup::default()));
        assert!(ctrl.short_lc().is_none());

        ctrl.write_network(&net_header(1, 91));
        let coded = ctrl.short_lc().unwrap();
        let lc = short_lc::decode(&coded).unwrap();
        assert_eq!(lc[0], 0x01);
        assert_ne!(lc[1] & 0xF0, 0, "slot 1 active");
        assert_eq!(lc[1] & 0x0F, 0, "slot 2 idle");
        assert!(ctrl.short_lc().is_none());
    }
}
