use serde::Deserialize;
use std::ops::RangeInclusive;
use std::sync::{Arc, RwLock};

use crate::dmr_config_modem::CfgModem;
use crate::dmr_config_network::CfgNetwork;

/// Talkgroup network traffic is rewritten onto when talkgroup rewrite is enabled
pub const PROMPT_TG: u32 = 9;
/// Echo test service, never rewritten
pub const PARROT_ID: u32 = 9990;
/// Reflector link control and voice prompt ids
pub const REFLECTOR_PROMPT_IDS: RangeInclusive<u32> = 4000..=5000;
/// Private calls from this id are network announcements and get coerced onto the prompt talkgroup
pub const DIRECT_DIAL_ID: u32 = 9999;

/// Over voice channel mode handling for CSBKs and voice LCs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum OvcmMode {
    /// Leave the flag as received
    Off,
    /// Set on traffic from the network
    RxOn,
    /// Set on traffic from RF
    TxOn,
    /// Set both ways
    On,
    /// Clear on traffic from RF
    ForceOff,
}

impl OvcmMode {
    pub fn set_on_rf(self) -> bool {
        matches!(self, OvcmMode::TxOn | OvcmMode::On)
    }

    pub fn set_on_net(self) -> bool {
        matches!(self, OvcmMode::RxOn | OvcmMode::On)
    }

    pub fn clear_on_rf(self) -> bool {
        self == OvcmMode::ForceOff
    }
}

/// Destination lists and talkgroup rewrite for one timeslot
#[derive(Debug, Clone, Default)]
pub struct CfgSlot {
    pub rf_blacklist: Vec<u32>,
    pub rf_whitelist: Vec<u32>,
    pub net_blacklist: Vec<u32>,
    pub net_whitelist: Vec<u32>,
    pub tg_rewrite: bool,
}

impl CfgSlot {
    pub fn blacklist(&self, from_network: bool) -> &[u32] {
        if from_network { &self.net_blacklist } else { &self.rf_blacklist }
    }

    pub fn whitelist(&self, from_network: bool) -> &[u32] {
        if from_network { &self.net_whitelist } else { &self.rf_whitelist }
    }
}

#[derive(Debug, Clone)]
pub struct CfgDmr {
    /// Own radio id, used for self-only and as the default repeater id
    pub id: u32,
    /// 4 bits
    pub color_code: u8,
    pub self_only: bool,
    /// Duplex repeater, regenerated bursts are queued back to the modem
    pub duplex: bool,
    /// RF call timeout in seconds, 0 disables
    pub timeout_secs: u32,
    /// Seconds after an over during which a talkgroup rewrite is reversed
    pub call_hang_secs: u32,
    /// Allowed id / 10000 prefixes, empty allows all
    pub prefixes: Vec<u32>,
    pub src_blacklist: Vec<u32>,
    /// Empty allows all
    pub src_whitelist: Vec<u32>,
    /// Re-emit only the call LC in network voice, dropping talker alias and GPS embedded data
    pub embedded_lc_only: bool,
    /// Log talker alias fragments as they complete
    pub dump_talker_alias: bool,
    pub ovcm: OvcmMode,
    pub slot1: CfgSlot,
    pub slot2: CfgSlot,
}

impl Default for CfgDmr {
    fn default() -> Self {
        Self {
            id: 0,
            color_code: default_color_code(),
            self_only: false,
            duplex: true,
            timeout_secs: default_timeout_secs(),
            call_hang_secs: default_call_hang_secs(),
            prefixes: Vec::new(),
            src_blacklist: Vec::new(),
            src_whitelist: Vec::new(),
            embedded_lc_only: false,
            dump_talker_alias: false,
            ovcm: OvcmMode::Off,
            slot1: CfgSlot::default(),
            slot2: CfgSlot::default(),
        }
    }
}

impl CfgDmr {
    /// Slot specific settings. Anything but slot 1 is slot 2.
    pub fn slot(&self, slot_no: u8) -> &CfgSlot {
        if slot_no == 1 { &self.slot1 } else { &self.slot2 }
    }
}

#[inline]
pub(crate) fn default_color_code() -> u8 {
    1
}

#[inline]
pub(crate) fn default_timeout_secs() -> u32 {
    180
}

#[inline]
pub(crate) fn default_call_hang_secs() -> u32 {
    3
}

#[derive(Debug, Clone)]
pub struct DmrConfig {
    pub debug_log: Option<String>,
    /// "id callsign" table used to name radios in the log
    pub id_lookup: Option<String>,

    pub dmr: CfgDmr,

    /// Modem transport, absent when the engine is driven by other means (tests)
    pub modem: Option<CfgModem>,

    /// Network transport, absent for a standalone repeater
    pub network: Option<CfgNetwork>,
}

impl DmrConfig {
    pub fn new(id: u32, color_code: u8) -> Self {
        DmrConfig {
            debug_log: None,
            id_lookup: None,
            dmr: CfgDmr { id, color_code, ..Default::default() },
            modem: None,
            network: None,
        }
    }

    /// Validate that all required configuration fields are properly set.
    pub fn validate(&self) -> Result<(), &str> {
        if self.dmr.id == 0 || self.dmr.id > 0xFFFFFF {
            return Err("dmr id must be a nonzero 24 bit id");
        }
        if self.dmr.color_code > 15 {
            return Err("dmr color_code must be in 0..=15");
        }
        if self.dmr.self_only && !self.dmr.src_whitelist.is_empty() {
            return Err("dmr src_whitelist has no effect with self_only");
        }
        if self.dmr.prefixes.iter().any(|&p| p == 0 || p > 999) {
            return Err("dmr prefixes must be in 1..=999");
        }

        if let Some(ref modem) = self.modem {
            if modem.rssi_mapping.windows(2).any(|w| w[0].0 >= w[1].0) {
                return Err("modem rssi_mapping raw values must be strictly ascending");
            }
        }

        if let Some(ref net) = self.network {
            if net.repeater_id == 0 {
                return Err("network repeater_id must be nonzero");
            }
            if !net.slot1 && !net.slot2 {
                return Err("network must carry at least one slot");
            }
            if net.jitter_ms < 120 || net.jitter_ms > 1000 {
                return Err("network jitter_ms must be in 120..=1000");
            }
        }

        Ok(())
    }
}

/// Mutable, host-editable state (lock-protected).
#[derive(Debug, Clone, Default)]
pub struct DmrState {
    /// Set by the network worker while the gateway is reachable
    pub network_connected: bool,
    /// Set by the modem transport once the modem answered
    pub modem_connected: bool,
}

/// Global shared configuration: immutable config + mutable state.
#[derive(Debug, Clone)]
pub struct SharedConfig {
    /// Read-only configuration (immutable after construction).
    cfg: Arc<DmrConfig>,
    /// Mutable state guarded with RwLock (write by the transports, read by others).
    state: Arc<RwLock<DmrState>>,
}

impl SharedConfig {
    pub fn new(id: u32, color_code: u8) -> Self {
        Self::from_config(DmrConfig::new(id, color_code))
    }

    pub fn from_config(cfg: DmrConfig) -> Self {
        Self::from_parts(cfg, DmrState::default())
    }

    pub fn from_parts(cfg: DmrConfig, state: DmrState) -> Self {
        // Check config for validity before returning the SharedConfig object
        match cfg.validate() {
            Ok(_) => {}
            Err(e) => panic!("Invalid DMR configuration: {}", e),
        }

        Self {
            cfg: Arc::new(cfg),
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Access immutable config.
    pub fn config(&self) -> Arc<DmrConfig> {
        Arc::clone(&self.cfg)
    }

    /// Read guard for mutable state.
    pub fn state_read(&self) -> std::sync::RwLockReadGuard<'_, DmrState> {
        self.state.read().expect("DmrState RwLock blocked")
    }

    /// Write guard for mutable state.
    pub fn state_write(&self) -> std::sync::RwLockWriteGuard<'_, DmrState> {
        self.state.write().expect("DmrState RwLock blocked")
    }
}
