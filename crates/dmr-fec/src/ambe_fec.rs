//! Bit-level repair of the three AMBE+2 frames in a DMR voice burst.
//!
//! Each 72-bit frame carries a 24-bit Golay(24,12) word A, a 23-bit Golay(23,12)
//! word B scrambled with a PRNG seeded from A's data, and 25 unprotected C bits.
//! Regeneration decodes and re-encodes A and B in place. The vocoder content
//! itself stays opaque.

use crate::bits::{read_bit, write_bit};
use crate::golay;

const A_TABLE: [usize; 24] = [0, 4, 8, 12, 16, 20, 24, 28, 32, 36, 40, 44, 48, 52, 56, 60, 64, 68, 1, 5, 9, 13, 17, 21];
const B_TABLE: [usize; 23] = [25, 29, 33, 37, 41, 45, 49, 53, 57, 61, 65, 69, 2, 6, 10, 14, 18, 22, 26, 30, 34, 38, 42];

/// Burst bit index of bit `pos` (0..72) of AMBE frame `frame` (0..3).
/// The second frame straddles the 48-bit sync / embedded signalling field.
#[inline]
fn frame_bit_pos(frame: usize, pos: usize) -> usize {
    match frame {
        0 => pos,
        1 => {
            let n = pos + 72;
            if n >= 108 { n + 48 } else { n }
        }
        _ => pos + 192,
    }
}

/// Scrambling mask for B, from the 12 data bits of A
fn prng(seed: u32) -> u32 {
    let mut pr = 16 * seed;
    let mut mask = 0u32;
    for _ in 0..23 {
        pr = (173 * pr + 13849) % 65536;
        mask = (mask << 1) | (pr >> 15);
    }
    mask
}

fn read_word(burst: &[u8; 33], frame: usize, table: &[usize]) -> u32 {
    table.iter().fold(0u32, |acc, &p| (acc << 1) | read_bit(burst, frame_bit_pos(frame, p)) as u32)
}

fn write_word(burst: &mut [u8; 33], frame: usize, table: &[usize], word: u32) {
    let n = table.len();
    for (i, &p) in table.iter().enumerate() {
        write_bit(burst, frame_bit_pos(frame, p), (word >> (n - 1 - i)) & 1 == 1);
    }
}

/// Returns the regenerated (a, b) pair and the number of bits changed
fn regenerate_words(a: u32, b: u32) -> (u32, u32, u32) {
    let data = golay::decode24128(a);
    let new_a = golay::encode24128(data);

    let p = prng(data);
    let datb = golay::decode23127(b ^ p);
    let new_b = golay::encode23127(datb) ^ p;

    let errors = (new_a ^ a).count_ones() + (new_b ^ b).count_ones();
    (new_a, new_b, errors)
}

/// Repairs the Golay protected bits of all three frames of a voice burst.
/// Returns the number of corrected bits.
pub fn regenerate_dmr(burst: &mut [u8; 33]) -> u32 {
    let mut errors = 0;
    for frame in 0..3 {
        let a = read_word(burst, frame, &A_TABLE);
        let b = read_word(burst, frame, &B_TABLE);
        let (new_a, new_b, errs) = regenerate_words(a, b);
        write_word(burst, frame, &A_TABLE, new_a);
        write_word(burst, frame, &B_TABLE, new_b);
        errors += errs;
    }
    errors
}

/// Counts correctable bit errors without modifying the burst
pub fn measure_dmr_ber(burst: &[u8; 33]) -> u32 {
    let mut copy = *burst;
    regenerate_dmr(&mut copy)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three AMBE silence frames around a zeroed centre
    const SILENCE: [u8; 33] = [
        0xB9, 0xE8, 0x81, 0x52, 0x61, 0x73, 0x00, 0x2A, 0x6B, 0xB9, 0xE8, 0x81, 0x52, 0x60, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x01, 0x73, 0x00, 0x2A, 0x6B, 0xB9, 0xE8, 0x81, 0x52, 0x61, 0x73, 0x00, 0x2A, 0x6B,
    ];

    #[test]
    fn test_silence_is_clean() {
        let mut burst = SILENCE;
        assert_eq!(regenerate_dmr(&mut burst), 0);
        assert_eq!(burst, SILENCE);
    }

    #[test]
    fn test_repairs_errors() {
        let mut burst = SILENCE;
        // One error in A and one in B of the first frame, one in A of the last
        for p in [frame_bit_pos(0, 4), frame_bit_pos(0, 29), frame_bit_pos(2, 8)] {
            burst[p / 8] ^= 0x80 >> (p % 8);
        }
        assert_eq!(measure_dmr_ber(&burst), 3);
        assert_eq!(regenerate_dmr(&mut burst), 3);
        assert_eq!(burst, SILENCE);
    }

    #[test]
    fn test_centre_untouched() {
        let mut burst = SILENCE;
        burst[14..19].copy_from_slice(&[0x12, 0x34, 0x56, 0x78, 0x9A]);
        let before = burst;
        regenerate_dmr(&mut burst);
        assert_eq!(&burst[13..20], &before[13..20]);
    }
}
