use std::collections::HashMap;
use std::net::SocketAddr;

use serde::Deserialize;
use toml::Value;

/// Homebrew style network gateway reached over UDP
#[derive(Debug, Clone)]
pub struct CfgNetwork {
    pub local_address: SocketAddr,
    pub gateway_address: SocketAddr,
    /// Id stamped into every packet, defaults to the dmr id
    pub repeater_id: u32,
    /// Playout delay applied to network voice, in ms
    pub jitter_ms: u32,
    pub slot1: bool,
    pub slot2: bool,
    /// Log every packet exchanged with the gateway
    pub debug: bool,
}

impl CfgNetwork {
    pub fn carries_slot(&self, slot_no: u8) -> bool {
        match slot_no {
            1 => self.slot1,
            2 => self.slot2,
            _ => false,
        }
    }
}

#[derive(Deserialize)]
pub struct CfgNetworkDto {
    pub local_address: SocketAddr,
    pub gateway_address: SocketAddr,
    pub repeater_id: Option<u32>,
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u32,
    #[serde(default = "default_true")]
    pub slot1: bool,
    #[serde(default = "default_true")]
    pub slot2: bool,
    #[serde(default)]
    pub debug: bool,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

fn default_jitter_ms() -> u32 {
    360
}

fn default_true() -> bool {
    true
}

/// Convert a CfgNetworkDto (from TOML) into a CfgNetwork, the repeater id falls back to `dmr_id`
pub fn apply_network_patch(src: CfgNetworkDto, dmr_id: u32) -> CfgNetwork {
    CfgNetwork {
        local_address: src.local_address,
        gateway_address: src.gateway_address,
        repeater_id: src.repeater_id.unwrap_or(dmr_id),
        jitter_ms: src.jitter_ms,
        slot1: src.slot1,
        slot2: src.slot2,
        debug: src.debug,
    }
}
