use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use toml::Value;

use super::dmr_config_modem::{CfgModemDto, apply_modem_patch};
use super::dmr_config_network::{CfgNetworkDto, apply_network_patch};

use super::dmr_config::{
    CfgDmr, CfgSlot, DmrConfig, DmrState, OvcmMode, SharedConfig, default_call_hang_secs, default_color_code, default_timeout_secs,
};

/// Build `SharedConfig` from a TOML configuration file
pub fn from_toml_str(toml_str: &str) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let root: TomlConfigRoot = toml::from_str(toml_str)?;

    // Various sanity checks
    let expected_config_version = "0.1";
    if !root.config_version.eq(expected_config_version) {
        return Err(format!(
            "Unrecognized config_version: {}, expect {}",
            root.config_version, expected_config_version
        )
        .into());
    }
    if !root.extra.is_empty() {
        return Err(format!("Unrecognized top-level fields: {:?}", sorted_keys(&root.extra)).into());
    }
    if !root.dmr.extra.is_empty() {
        return Err(format!("Unrecognized fields in dmr: {:?}", sorted_keys(&root.dmr.extra)).into());
    }
    for (name, slot) in [("slot1", &root.dmr.slot1), ("slot2", &root.dmr.slot2)] {
        if let Some(slot) = slot {
            if !slot.extra.is_empty() {
                return Err(format!("Unrecognized fields: dmr.{}::{:?}", name, sorted_keys(&slot.extra)).into());
            }
        }
    }
    if let Some(ref modem) = root.modem {
        if !modem.extra.is_empty() {
            return Err(format!("Unrecognized fields in modem config: {:?}", sorted_keys(&modem.extra)).into());
        }
    }
    if let Some(ref net) = root.network {
        if !net.extra.is_empty() {
            return Err(format!("Unrecognized fields in network config: {:?}", sorted_keys(&net.extra)).into());
        }
    }

    let mut cfg = DmrConfig {
        debug_log: root.debug_log,
        id_lookup: root.id_lookup,
        dmr: CfgDmr::default(),
        modem: None,
        network: None,
    };
    apply_dmr_patch(&mut cfg.dmr, root.dmr);

    if let Some(modem) = root.modem {
        cfg.modem = Some(apply_modem_patch(modem));
    }

    if let Some(net) = root.network {
        cfg.network = Some(apply_network_patch(net, cfg.dmr.id));
    }

    // Surface validation problems as errors rather than the panic in from_parts
    cfg.validate().map_err(|e| format!("Invalid configuration: {}", e))?;

    Ok(SharedConfig::from_parts(cfg, DmrState::default()))
}

/// Build `SharedConfig` from any reader.
pub fn from_reader<R: Read>(reader: R) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let mut contents = String::new();
    let mut reader = BufReader::new(reader);
    reader.read_to_string(&mut contents)?;
    from_toml_str(&contents)
}

/// Build `SharedConfig` from a file path.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<SharedConfig, Box<dyn std::error::Error>> {
    let f = File::open(path)?;
    let r = BufReader::new(f);
    let cfg = from_reader(r)?;
    Ok(cfg)
}

fn apply_dmr_patch(dst: &mut CfgDmr, src: DmrDto) {
    dst.id = src.id;
    dst.color_code = src.color_code;
    dst.timeout_secs = src.timeout;
    dst.call_hang_secs = src.call_hang;

    dst.prefixes = src.prefixes;
    dst.src_blacklist = src.src_blacklist;
    dst.src_whitelist = src.src_whitelist;

    if let Some(v) = src.self_only {
        dst.self_only = v;
    }
    if let Some(v) = src.duplex {
        dst.duplex = v;
    }
    if let Some(v) = src.embedded_lc_only {
        dst.embedded_lc_only = v;
    }
    if let Some(v) = src.dump_talker_alias {
        dst.dump_talker_alias = v;
    }
    if let Some(v) = src.ovcm {
        dst.ovcm = v;
    }
    if let Some(s) = src.slot1 {
        apply_slot_patch(&mut dst.slot1, s);
    }
    if let Some(s) = src.slot2 {
        apply_slot_patch(&mut dst.slot2, s);
    }
}

fn apply_slot_patch(dst: &mut CfgSlot, src: SlotDto) {
    dst.rf_blacklist = src.rf_blacklist;
    dst.rf_whitelist = src.rf_whitelist;
    dst.net_blacklist = src.net_blacklist;
    dst.net_whitelist = src.net_whitelist;
    dst.tg_rewrite = src.tg_rewrite;
}

fn sorted_keys(map: &HashMap<String, Value>) -> Vec<&str> {
    let mut v: Vec<&str> = map.keys().map(|s| s.as_str()).collect();
    v.sort_unstable();
    v
}

/// ----------------------- DTOs for input shape -----------------------

#[derive(Deserialize)]
struct TomlConfigRoot {
    config_version: String,
    debug_log: Option<String>,
    id_lookup: Option<String>,

    dmr: DmrDto,

    #[serde(default)]
    modem: Option<CfgModemDto>,

    #[serde(default)]
    network: Option<CfgNetworkDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct DmrDto {
    pub id: u32,
    #[serde(default = "default_color_code")]
    pub color_code: u8,
    #[serde(default = "default_timeout_secs")]
    pub timeout: u32,
    #[serde(default = "default_call_hang_secs")]
    pub call_hang: u32,

    #[serde(default)]
    pub prefixes: Vec<u32>,
    #[serde(default)]
    pub src_blacklist: Vec<u32>,
    #[serde(default)]
    pub src_whitelist: Vec<u32>,

    pub self_only: Option<bool>,
    pub duplex: Option<bool>,
    pub embedded_lc_only: Option<bool>,
    pub dump_talker_alias: Option<bool>,
    pub ovcm: Option<OvcmMode>,

    #[serde(default)]
    pub slot1: Option<SlotDto>,
    #[serde(default)]
    pub slot2: Option<SlotDto>,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[derive(Default, Deserialize)]
struct SlotDto {
    #[serde(default)]
    pub rf_blacklist: Vec<u32>,
    #[serde(default)]
    pub rf_whitelist: Vec<u32>,
    #[serde(default)]
    pub net_blacklist: Vec<u32>,
    #[serde(default)]
    pub net_whitelist: Vec<u32>,
    #[serde(default)]
    pub tg_rewrite: bool,

    #[serde(flatten)]
    extra: HashMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
config_version = "0.1"
debug_log = "mmdvm-dmr.log"
id_lookup = "DMRIds.dat"

[dmr]
id = 2345678
color_code = 3
call_hang = 5
prefixes = [234, 235]
src_blacklist = [2345999]
ovcm = "RxOn"
embedded_lc_only = true

[dmr.slot2]
net_blacklist = [91]
tg_rewrite = true

[modem]
local_address = "127.0.0.1:3335"
modem_address = "127.0.0.1:3334"
rssi = true
rssi_mapping = [[43, -43], [53, -53], [75, -75]]

[network]
local_address = "0.0.0.0:62032"
gateway_address = "127.0.0.1:62031"
slot1 = false
"#;

    #[test]
    fn test_full_config() {
        let shared = from_toml_str(FULL).unwrap();
        let cfg = shared.config();
        assert_eq!(cfg.debug_log.as_deref(), Some("mmdvm-dmr.log"));
        assert_eq!(cfg.dmr.id, 2345678);
        assert_eq!(cfg.dmr.color_code, 3);
        assert_eq!(cfg.dmr.call_hang_secs, 5);
        assert_eq!(cfg.dmr.timeout_secs, 180);
        assert_eq!(cfg.dmr.prefixes, vec![234, 235]);
        assert_eq!(cfg.dmr.ovcm, OvcmMode::RxOn);
        assert!(cfg.dmr.embedded_lc_only);
        assert!(cfg.dmr.duplex);
        assert!(cfg.dmr.slot2.tg_rewrite);
        assert!(!cfg.dmr.slot1.tg_rewrite);
        assert_eq!(cfg.dmr.slot2.net_blacklist, vec![91]);

        let modem = cfg.modem.as_ref().unwrap();
        assert!(modem.rssi);
        assert_eq!(modem.rssi_mapping[1], (53, -53));

        let net = cfg.network.as_ref().unwrap();
        assert_eq!(net.repeater_id, 2345678);
        assert_eq!(net.jitter_ms, 360);
        assert!(!net.carries_slot(1));
        assert!(net.carries_slot(2));
    }

    #[test]
    fn test_example_config_loads() {
        let shared = from_toml_str(include_str!("../../../config.example.toml")).unwrap();
        let cfg = shared.config();
        assert_eq!(cfg.dmr.ovcm, OvcmMode::Off);
        assert!(cfg.dmr.slot2.tg_rewrite);
        assert_eq!(cfg.network.as_ref().unwrap().repeater_id, 2345678);
    }

    #[test]
    fn test_minimal_config() {
        let shared = from_toml_str("config_version = \"0.1\"\n[dmr]\nid = 1234567\n").unwrap();
        let cfg = shared.config();
        assert_eq!(cfg.dmr.color_code, 1);
        assert!(cfg.modem.is_none());
        assert!(cfg.network.is_none());
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let err = from_toml_str("config_version = \"0.1\"\ncolour = 1\n[dmr]\nid = 1234567\n").unwrap_err();
        assert!(err.to_string().contains("colour"));

        let err = from_toml_str("config_version = \"0.1\"\n[dmr]\nid = 1234567\n[dmr.slot1]\nrewrite = true\n").unwrap_err();
        assert!(err.to_string().contains("dmr.slot1"));
    }

    #[test]
    fn test_rejects_bad_version_and_values() {
        assert!(from_toml_str("config_version = \"0.5\"\n[dmr]\nid = 1234567\n").is_err());
        assert!(from_toml_str("config_version = \"0.1\"\n[dmr]\nid = 1234567\ncolor_code = 20\n").is_err());
        assert!(from_toml_str("config_version = \"0.1\"\n[dmr]\nid = 1234567\novcm = \"Sometimes\"\n").is_err());
    }
}
