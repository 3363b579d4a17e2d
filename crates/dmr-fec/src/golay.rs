//! Golay codes built on the (23,12) generator x^11+x^10+x^6+x^5+x^4+x^2+1.
//!
//! - Golay(23,12,7) and its extended form Golay(24,12,8) protect AMBE voice
//! - Golay(20,8,7) protects the slot type. It is the (23,12) code shortened by
//!   four data bits plus an even parity bit.

use std::sync::OnceLock;

const GEN_POLY: u32 = 0xC75;

/// Remainder of `value` (up to 23 bits) divided by the generator
fn remainder(mut value: u32) -> u32 {
    for i in (11..23).rev() {
        if value & (1 << i) != 0 {
            value ^= GEN_POLY << (i - 11);
        }
    }
    value
}

#[inline]
fn parity(value: u32) -> u32 {
    value.count_ones() & 1
}

/// 12 data bits -> 23-bit systematic codeword, data in the upper bits
pub fn encode23127(data: u32) -> u32 {
    let data = data & 0xFFF;
    (data << 11) | remainder(data << 11)
}

/// 12 data bits -> 24-bit codeword: the (23,12) codeword followed by even parity
pub fn encode24128(data: u32) -> u32 {
    let code = encode23127(data);
    (code << 1) | parity(code)
}

/// Syndrome -> error pattern. The (23,12) code is perfect, every syndrome maps to
/// exactly one pattern of weight 3 or less.
fn decoding_table() -> &'static [u32] {
    static TABLE: OnceLock<Vec<u32>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = vec![0u32; 1 << 11];
        for a in 0..23 {
            let e = 1 << a;
            table[remainder(e) as usize] = e;
            for b in a + 1..23 {
                let e = e | (1 << b);
                table[remainder(e) as usize] = e;
                for c in b + 1..23 {
                    let e = e | (1 << c);
                    table[remainder(e) as usize] = e;
                }
            }
        }
        table
    })
}

/// Corrects up to 3 bit errors, returns the 12 data bits
pub fn decode23127(code: u32) -> u32 {
    let code = code & 0x7FFFFF;
    let error = decoding_table()[remainder(code) as usize];
    (code ^ error) >> 11
}

/// Corrects up to 3 bit errors, ignoring the parity bit
pub fn decode24128(code: u32) -> u32 {
    decode23127(code >> 1)
}

/// 8 data bits -> 20-bit codeword, data in the upper bits
pub fn encode2087(data: u8) -> u32 {
    let code = encode23127(data as u32);
    (code << 1) | parity(code)
}

/// Minimum distance decode over the 256 codewords
pub fn decode2087(code: u32) -> u8 {
    let code = code & 0xFFFFF;
    let mut best = 0u8;
    let mut best_dist = u32::MAX;
    for data in 0..=255u8 {
        let dist = (encode2087(data) ^ code).count_ones();
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_codeword() {
        // Data 1 encodes to the generator itself
        assert_eq!(encode23127(1), 0x800 | 0x475);
        assert_eq!(encode24128(1), 0x18EB);
        assert_eq!(encode2087(1), 0x18EB);
    }

    #[test]
    fn test_decoding_table_complete() {
        let table = decoding_table();
        assert!(table[1..].iter().all(|e| *e != 0 && e.count_ones() <= 3));
    }

    #[test]
    fn test_correct_three_errors() {
        for _ in 0..50 {
            let data: u32 = rand::random_range(0..4096);
            let mut code = encode24128(data);
            for _ in 0..3 {
                code ^= 1 << rand::random_range(0..24);
            }
            assert_eq!(decode24128(code), data);
        }
    }

    #[test]
    fn test_2087() {
        for data in 0..=255u8 {
            let code = encode2087(data);
            assert_eq!(decode2087(code), data);
            assert_eq!(decode2087(code ^ 0x80401), data);
        }
    }
}
