use core::fmt;

use dmr_core::defines::DMR_FRAME_LENGTH_BYTES;
use dmr_fec::qr1676;

/// Embedded signalling field of voice bursts B to F, ETSI TS 102 361-1 Clause 9.1.2
/// Bits: 4 colour code, 1 PI, 2 LCSS, 9 parity. The 16-bit QR code is split in two
/// bytes either side of the embedded data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Emb {
    pub color_code: u8,
    pub pi: bool,
    /// Link control start/stop: 0 single fragment, 1 first, 2 last, 3 continuation
    pub lcss: u8,
}

impl Emb {
    pub fn decode(burst: &[u8; DMR_FRAME_LENGTH_BYTES]) -> Self {
        let hi = ((burst[13] << 4) & 0xF0) | ((burst[14] >> 4) & 0x0F);
        let lo = ((burst[18] << 4) & 0xF0) | ((burst[19] >> 4) & 0x0F);
        let data = qr1676::decode(u16::from_be_bytes([hi, lo]));
        Emb {
            color_code: (data >> 3) & 0x0F,
            pi: data & 0x04 != 0,
            lcss: data & 0x03,
        }
    }

    pub fn encode(&self, burst: &mut [u8; DMR_FRAME_LENGTH_BYTES]) {
        let data = ((self.color_code & 0x0F) << 3) | ((self.pi as u8) << 2) | (self.lcss & 0x03);
        let [hi, lo] = qr1676::encode(data).to_be_bytes();
        burst[13] = (burst[13] & 0xF0) | (hi >> 4);
        burst[14] = (burst[14] & 0x0F) | (hi << 4);
        burst[18] = (burst[18] & 0xF0) | (lo >> 4);
        burst[19] = (burst[19] & 0x0F) | (lo << 4);
    }
}

impl fmt::Display for Emb {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Emb {{ color_code: {:?} pi: {:?} lcss: {:?} }}", self.color_code, self.pi, self.lcss)
    }
}
