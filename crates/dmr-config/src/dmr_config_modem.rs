use std::collections::HashMap;
use std::net::SocketAddr;

use serde::Deserialize;
use toml::Value;

/// MMDVM modem reached over UDP (a modem bridge or a network attached modem)
#[derive(Debug, Clone)]
pub struct CfgModem {
    /// Address we bind to
    pub local_address: SocketAddr,
    /// Address of the modem or bridge
    pub modem_address: SocketAddr,
    /// Modem appends two raw RSSI bytes to each received burst
    pub rssi: bool,
    /// Raw RSSI to dBm mapping points, ascending by raw value
    pub rssi_mapping: Vec<(u16, i16)>,
    /// Log every frame exchanged with the modem
    pub trace: bool,
}

#[derive(Deserialize)]
pub struct CfgModemDto {
    pub local_address: SocketAddr,
    pub modem_address: SocketAddr,
    #[serde(default)]
    pub rssi: bool,
    #[serde(default)]
    pub rssi_mapping: Vec<(u16, i16)>,
    #[serde(default)]
    pub trace: bool,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// Convert a CfgModemDto (from TOML) into a CfgModem (used in the host config)
pub fn apply_modem_patch(src: CfgModemDto) -> CfgModem {
    CfgModem {
        local_address: src.local_address,
        modem_address: src.modem_address,
        rssi: src.rssi,
        rssi_mapping: src.rssi_mapping,
        trace: src.trace,
    }
}
