use std::sync::Arc;
use std::time::{Duration, Instant};

use dmr_config::{DIRECT_DIAL_ID, DmrConfig, PARROT_ID, PROMPT_TG, REFLECTOR_PROMPT_IDS};
use dmr_core::SlotNo;
use dmr_core::defines::Flco;

/// Talkgroup rewrite memory of one timeslot
#[derive(Debug, Clone, Default)]
pub struct SlotRewriteState {
    last_real_tg: u32,
    over_end: Option<Instant>,
}

impl SlotRewriteState {
    /// Starts the call-hang window
    pub fn set_over_end_time(&mut self) {
        self.over_end = Some(Instant::now());
    }

    pub fn last_real_tg(&self) -> u32 {
        self.last_real_tg
    }

    fn within_call_hang(&self, call_hang_secs: u32) -> bool {
        match self.over_end {
            Some(t) => t.elapsed() < Duration::from_secs(call_hang_secs as u64),
            None => false,
        }
    }
}

/// Source and destination policy for both timeslots. Stateless apart from the
/// per-slot rewrite state the caller passes in.
#[derive(Clone)]
pub struct AccessControl {
    cfg: Arc<DmrConfig>,
}

impl AccessControl {
    pub fn new(cfg: Arc<DmrConfig>) -> Self {
        Self { cfg }
    }

    pub fn validate_src_id(&self, id: u32) -> bool {
        let dmr = &self.cfg.dmr;
        if dmr.self_only {
            return id == dmr.id;
        }
        if dmr.src_blacklist.contains(&id) {
            return false;
        }

        let prefix = id / 10000;
        if prefix == 0 || prefix > 999 {
            return false;
        }
        if !dmr.prefixes.is_empty() && !dmr.prefixes.contains(&prefix) {
            return false;
        }

        dmr.src_whitelist.is_empty() || dmr.src_whitelist.contains(&id)
    }

    pub fn validate_destination(&self, id: u32, slot_no: SlotNo, from_network: bool) -> bool {
        let slot = self.cfg.dmr.slot(slot_no);
        if slot.blacklist(from_network).contains(&id) {
            return false;
        }

        let whitelist = slot.whitelist(from_network);
        if whitelist.is_empty() || id == 0 || whitelist.contains(&id) {
            return true;
        }

        // Ids outside the whitelist that are still reachable on each slot
        if slot_no == 1 {
            id >= 99999
        } else if id >= 4000 {
            !(id > 5000 && id < 10000)
        } else {
            false
        }
    }

    /// Returns the new destination id, or 0 when the destination stays as is.
    /// May coerce `flco` to a group call.
    pub fn rewrite_destination(
        &self,
        dst_id: u32,
        src_id: u32,
        slot_no: SlotNo,
        from_network: bool,
        flco: &mut Flco,
        state: &mut SlotRewriteState,
    ) -> u32 {
        if !self.cfg.dmr.slot(slot_no).tg_rewrite {
            return 0;
        }

        if from_network {
            match *flco {
                Flco::Group if dst_id != PROMPT_TG && dst_id != PARROT_ID && !REFLECTOR_PROMPT_IDS.contains(&dst_id) => {
                    tracing::info!(slot = slot_no, "rewrite dst id of inbound network traffic from {} to {}", dst_id, PROMPT_TG);
                    state.last_real_tg = dst_id;
                    PROMPT_TG
                }
                Flco::UserUser if REFLECTOR_PROMPT_IDS.contains(&src_id) || src_id == DIRECT_DIAL_ID => {
                    tracing::info!(slot = slot_no, "rewrite inbound private call from {} to group call on {}", src_id, PROMPT_TG);
                    *flco = Flco::Group;
                    PROMPT_TG
                }
                _ => 0,
            }
        } else {
            if *flco != Flco::Group {
                return 0;
            }
            let hang = state.within_call_hang(self.cfg.dmr.call_hang_secs);
            if dst_id == PROMPT_TG && hang && state.last_real_tg != 0 {
                tracing::info!(slot = slot_no, "rewrite dst id of outbound RF traffic from {} to {}", PROMPT_TG, state.last_real_tg);
                return state.last_real_tg;
            }
            if dst_id != PROMPT_TG && !hang {
                state.last_real_tg = dst_id;
            }
            0
        }
    }
}
