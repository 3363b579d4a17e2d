//! Quadratic residue (16,7,6) code protecting the EMB field,
//! ETSI TS 102 361-1 Annex B.3.2. The (15,7) QR code with generator
//! x^8+x^5+x^4+x^3+1, extended with an even parity bit.

const GEN_POLY: u32 = 0x139;

fn remainder(mut value: u32) -> u32 {
    for i in (8..15).rev() {
        if value & (1 << i) != 0 {
            value ^= GEN_POLY << (i - 8);
        }
    }
    value
}

/// 7 data bits -> 16-bit codeword, data in the upper bits
pub fn encode(data: u8) -> u16 {
    let data = (data & 0x7F) as u32;
    let code = (data << 8) | remainder(data << 8);
    ((code << 1) | (code.count_ones() & 1)) as u16
}

/// Minimum distance decode, corrects up to 2 bit errors. Returns the 7 data bits.
pub fn decode(code: u16) -> u8 {
    let mut best = 0u8;
    let mut best_dist = u32::MAX;
    for data in 0..0x80u8 {
        let dist = (encode(data) ^ code).count_ones();
        if dist < best_dist {
            best_dist = dist;
            best = data;
            if dist == 0 {
                break;
            }
        }
    }
    best
}
