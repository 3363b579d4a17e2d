use dmr_core::defines::*;
use dmr_fec::{bptc19696, crc, rs129};

use crate::lc::link_control::Lc;

/// Full LC as carried by voice LC headers and terminators: 9 LC bytes plus
/// 3 RS(12,9) parity bytes XORed with a frame type mask, BPTC(196,96) coded.
pub struct FullLc;

impl FullLc {
    fn mask(data_type: DataType) -> Option<&'static [u8; 3]> {
        match data_type {
            DataType::VoiceLcHeader => Some(&VOICE_LC_HEADER_CRC_MASK),
            DataType::TerminatorWithLc => Some(&TERMINATOR_WITH_LC_CRC_MASK),
            _ => None,
        }
    }

    pub fn decode(burst: &[u8; DMR_FRAME_LENGTH_BYTES], data_type: DataType) -> Option<Lc> {
        let Some(mask) = Self::mask(data_type) else {
            tracing::warn!("full LC: no LC in a {} burst", data_type);
            return None;
        };

        let mut payload = bptc19696::decode(burst)?;
        for (p, m) in payload[9..].iter_mut().zip(mask.iter()) {
            *p ^= m;
        }
        if !rs129::check(&payload) {
            tracing::debug!("full LC: RS(12,9) check failed for {}", data_type);
            return None;
        }

        let mut bytes = [0u8; 9];
        bytes.copy_from_slice(&payload[..9]);
        Lc::from_bytes(&bytes).ok()
    }

    pub fn encode(lc: &Lc, data_type: DataType, burst: &mut [u8; DMR_FRAME_LENGTH_BYTES]) {
        let Some(mask) = Self::mask(data_type) else {
            tracing::warn!("full LC: cannot encode LC into a {} burst", data_type);
            return;
        };

        let bytes = lc.to_bytes();
        let parity = rs129::encode(&bytes);
        let mut payload = [0u8; 12];
        payload[..9].copy_from_slice(&bytes);
        for i in 0..3 {
            payload[9 + i] = parity[i] ^ mask[i];
        }
        bptc19696::encode(&payload, burst);
    }

    /// Decodes a privacy indicator header and checks its masked CRC.
    /// The 10 payload bytes stay opaque to the host.
    pub fn decode_pi_header(burst: &[u8; DMR_FRAME_LENGTH_BYTES]) -> Option<[u8; 12]> {
        let payload = bptc19696::decode(burst)?;
        if !crc::check_ccitt16_masked(&payload, PI_HEADER_CRC_MASK) {
            tracing::debug!("full LC: PI header CRC failed");
            return None;
        }
        Some(payload)
    }
}
