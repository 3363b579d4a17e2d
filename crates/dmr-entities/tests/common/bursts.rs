//! Burst builders standing in for a modem and a network peer

use dmr_core::defines::*;
use dmr_pdus::burst::emb::Emb;
use dmr_pdus::burst::slot_type::SlotType;
use dmr_pdus::burst::sync::{add_audio_sync, add_data_sync};
use dmr_pdus::{Csbk, DataHeader, DmrData, EmbeddedData, FullLc, Lc};

/// Data burst with LC, slot type and MS sourced sync
pub fn lc_burst(lc: &Lc, data_type: DataType) -> [u8; DMR_FRAME_LENGTH_BYTES] {
    let mut burst = [0u8; DMR_FRAME_LENGTH_BYTES];
    FullLc::encode(lc, data_type, &mut burst);
    SlotType::new(1, data_type).encode(&mut burst);
    add_data_sync(&mut burst, false);
    burst
}

/// Voice burst `n` of a superframe carrying `embedded` in bursts 1 to 4
pub fn voice_burst(embedded: &Lc, n: u8) -> [u8; DMR_FRAME_LENGTH_BYTES] {
    let mut burst = DMR_SILENCE_DATA;
    if n == 0 {
        add_audio_sync(&mut burst, false);
    } else {
        let mut data = EmbeddedData::new();
        data.set_lc(embedded);
        let lcss = data.get_data(&mut burst, n);
        Emb { color_code: 1, pi: false, lcss }.encode(&mut burst);
    }
    burst
}

/// Host burst as the modem delivers it: [tag, flags, 33 bytes]
pub fn modem_burst(flags: u8, burst: &[u8; DMR_FRAME_LENGTH_BYTES]) -> Vec<u8> {
    let mut data = vec![Tag::Data.into_raw() as u8, flags];
    data.extend_from_slice(burst);
    data
}

pub fn rf_header(lc: &Lc) -> Vec<u8> {
    modem_burst(DMR_SYNC_DATA | DataType::VoiceLcHeader.into_raw() as u8, &lc_burst(lc, DataType::VoiceLcHeader))
}

pub fn rf_terminator(lc: &Lc) -> Vec<u8> {
    modem_burst(DMR_SYNC_DATA | DataType::TerminatorWithLc.into_raw() as u8, &lc_burst(lc, DataType::TerminatorWithLc))
}

pub fn rf_voice(embedded: &Lc, n: u8) -> Vec<u8> {
    let flags = if n == 0 { DMR_SYNC_AUDIO } else { n };
    modem_burst(flags, &voice_burst(embedded, n))
}

pub fn rf_csbk(csbk: &Csbk) -> Vec<u8> {
    let mut burst = [0u8; DMR_FRAME_LENGTH_BYTES];
    csbk.encode(&mut burst);
    SlotType::new(1, DataType::Csbk).encode(&mut burst);
    add_data_sync(&mut burst, false);
    modem_burst(DMR_SYNC_DATA | DataType::Csbk.into_raw() as u8, &burst)
}

pub fn rf_data_header(header: &DataHeader) -> Vec<u8> {
    let mut burst = [0u8; DMR_FRAME_LENGTH_BYTES];
    header.encode(&mut burst);
    SlotType::new(1, DataType::DataHeader).encode(&mut burst);
    add_data_sync(&mut burst, false);
    modem_burst(DMR_SYNC_DATA | DataType::DataHeader.into_raw() as u8, &burst)
}

pub fn rf_rate12_block(payload: &[u8; 12]) -> Vec<u8> {
    let mut burst = [0u8; DMR_FRAME_LENGTH_BYTES];
    dmr_fec::bptc19696::encode(payload, &mut burst);
    SlotType::new(1, DataType::Rate12Data).encode(&mut burst);
    add_data_sync(&mut burst, false);
    modem_burst(DMR_SYNC_DATA | DataType::Rate12Data.into_raw() as u8, &burst)
}

/// Network packet for `lc`. Headers and terminators carry the full LC, voice
/// carries `lc` as embedded data.
pub fn net_packet(slot_no: u8, lc: &Lc, data_type: DataType, n: u8) -> DmrData {
    let mut data = DmrData::new(slot_no, data_type);
    data.src_id = lc.src_id;
    data.dst_id = lc.dst_id;
    data.flco = lc.flco;
    data.n = n;
    data.data = match data_type {
        DataType::VoiceSync => voice_burst(lc, 0),
        DataType::Voice => voice_burst(lc, n),
        other => lc_burst(lc, other),
    };
    data
}
