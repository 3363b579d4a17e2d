//! BPTC(196,96), ETSI TS 102 361-1 Annex B.1.1
//!
//! The 196 coded bits sit on both sides of the 68-bit sync / slot type centre of a
//! burst. After deinterleaving they form a 13x15 matrix (plus one leading unused
//! bit): 9 rows protected by Hamming(15,11,3), 15 columns by Hamming(13,9,3).

use crate::bits::{read_bit, write_bit};
use crate::hamming::{self, HammingResult};

const CODED_BITS: usize = 196;
const ROWS: usize = 13;
const DATA_ROWS: usize = 9;
const COLS: usize = 15;
const MAX_PASSES: usize = 5;

/// Payload bit ranges within the deinterleaved matrix, inclusive.
/// Bits 1..=3 are reserved and bits 0 and row parity are skipped.
const PAYLOAD_RANGES: [(usize, usize); 9] = [
    (4, 11),
    (16, 26),
    (31, 41),
    (46, 56),
    (61, 71),
    (76, 86),
    (91, 101),
    (106, 116),
    (121, 131),
];

/// Burst bit index of coded bit `i`
#[inline]
fn burst_pos(i: usize) -> usize {
    if i < 98 { i } else { i + 68 }
}

fn extract_raw(burst: &[u8; 33]) -> [bool; CODED_BITS] {
    let mut raw = [false; CODED_BITS];
    for (i, b) in raw.iter_mut().enumerate() {
        *b = read_bit(burst, burst_pos(i));
    }
    raw
}

fn insert_raw(raw: &[bool; CODED_BITS], burst: &mut [u8; 33]) {
    for (i, b) in raw.iter().enumerate() {
        write_bit(burst, burst_pos(i), *b);
    }
}

#[inline]
fn row_start(r: usize) -> usize {
    r * COLS + 1
}

fn column(matrix: &[bool; CODED_BITS], c: usize) -> [bool; ROWS] {
    let mut col = [false; ROWS];
    for (r, b) in col.iter_mut().enumerate() {
        *b = matrix[c + 1 + r * COLS];
    }
    col
}

fn set_column(matrix: &mut [bool; CODED_BITS], c: usize, col: &[bool; ROWS]) {
    for (r, b) in col.iter().enumerate() {
        matrix[c + 1 + r * COLS] = *b;
    }
}

/// Runs the iterative row/column correction. Returns false if any syndrome remains.
fn correct(matrix: &mut [bool; CODED_BITS]) -> bool {
    for _ in 0..MAX_PASSES {
        let mut fixing = false;

        for c in 0..COLS {
            let mut col = column(matrix, c);
            if let HammingResult::Corrected(_) = hamming::decode1393(&mut col) {
                set_column(matrix, c, &col);
                fixing = true;
            }
        }

        for r in 0..DATA_ROWS {
            let start = row_start(r);
            if let HammingResult::Corrected(_) = hamming::decode15113(&mut matrix[start..start + COLS]) {
                fixing = true;
            }
        }

        if !fixing {
            break;
        }
    }

    let rows_ok = (0..DATA_ROWS).all(|r| {
        let start = row_start(r);
        let mut row = [false; COLS];
        row.copy_from_slice(&matrix[start..start + COLS]);
        hamming::decode15113(&mut row) == HammingResult::Valid
    });
    let cols_ok = (0..COLS).all(|c| {
        let mut col = column(matrix, c);
        hamming::decode1393(&mut col) == HammingResult::Valid
    });
    rows_ok && cols_ok
}

/// Decodes the 12-byte payload of a data-sync burst.
/// Returns None if errors remain after correction.
pub fn decode(burst: &[u8; 33]) -> Option<[u8; 12]> {
    let raw = extract_raw(burst);

    let mut matrix = [false; CODED_BITS];
    for (a, b) in matrix.iter_mut().enumerate() {
        *b = raw[(a * 181) % CODED_BITS];
    }

    if !correct(&mut matrix) {
        tracing::trace!("bptc19696: uncorrectable");
        return None;
    }

    let mut payload = [0u8; 12];
    let mut n = 0;
    for (lo, hi) in PAYLOAD_RANGES {
        for i in lo..=hi {
            write_bit(&mut payload, n, matrix[i]);
            n += 1;
        }
    }
    Some(payload)
}

/// Encodes a 12-byte payload into the coded part of `burst`, leaving the centre untouched.
pub fn encode(payload: &[u8; 12], burst: &mut [u8; 33]) {
    let mut matrix = [false; CODED_BITS];
    let mut n = 0;
    for (lo, hi) in PAYLOAD_RANGES {
        for i in lo..=hi {
            matrix[i] = read_bit(payload, n);
            n += 1;
        }
    }

    for r in 0..DATA_ROWS {
        let start = row_start(r);
        hamming::encode15113(&mut matrix[start..start + COLS]);
    }
    for c in 0..COLS {
        let mut col = column(&matrix, c);
        hamming::encode1393(&mut col);
        set_column(&mut matrix, c, &col);
    }

    let mut raw = [false; CODED_BITS];
    for (a, b) in matrix.iter().enumerate() {
        raw[(a * 181) % CODED_BITS] = *b;
    }
    insert_raw(&raw, burst);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Idle burst as transmitted by a BS, with the idle message fill pattern
    const IDLE_BURST: [u8; 33] = [
        0x53, 0xC2, 0x5E, 0xAB, 0xA8, 0x67, 0x1D, 0xC7, 0x38, 0x3B, 0xD9, 0x36, 0x00, 0x0D, 0xFF, 0x57, 0xD7, 0x5D, 0xF5,
        0xD0, 0x03, 0xF6, 0xE4, 0x65, 0x17, 0x1B, 0x48, 0xCA, 0x6D, 0x4F, 0xC6, 0x10, 0xB4,
    ];
    const IDLE_PAYLOAD: [u8; 12] = [0xFF, 0x83, 0xDF, 0x17, 0x32, 0x09, 0x4E, 0xD1, 0xE7, 0xCD, 0x8A, 0x91];

    fn random_payload() -> [u8; 12] {
        let mut p = [0u8; 12];
        for b in p.iter_mut() {
            *b = rand::random_range(0..=255);
        }
        p
    }

    #[test]
    fn test_idle_burst() {
        assert_eq!(decode(&IDLE_BURST), Some(IDLE_PAYLOAD));

        let mut burst = IDLE_BURST;
        burst[..12].fill(0);
        burst[21..].fill(0);
        encode(&IDLE_PAYLOAD, &mut burst);
        assert_eq!(burst, IDLE_BURST);
    }

    #[test]
    fn test_round_trip() {
        for _ in 0..50 {
            let payload = random_payload();
            let mut burst = [0u8; 33];
            encode(&payload, &mut burst);
            assert_eq!(decode(&burst), Some(payload));
        }
    }

    #[test]
    fn test_centre_untouched() {
        let mut burst = [0u8; 33];
        burst[12..21].copy_from_slice(&[0x3F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFC]);
        encode(&random_payload(), &mut burst);
        assert_eq!(burst[12] & 0x3F, 0x3F);
        assert_eq!(&burst[13..20], &[0xFF; 7]);
        assert_eq!(burst[20] & 0xFC, 0xFC);
    }

    #[test]
    fn test_one_error_per_row() {
        let payload = random_payload();
        let mut clean = [0u8; 33];
        encode(&payload, &mut clean);

        // One flipped bit in each of the 9 data rows, each in a different column
        let mut burst = clean;
        for r in 0..DATA_ROWS {
            let a = row_start(r) + r;
            let pos = burst_pos((a * 181) % CODED_BITS);
            burst[pos / 8] ^= 0x80 >> (pos % 8);
        }
        assert_eq!(decode(&burst), Some(payload));
    }

    #[test]
    fn test_uncorrectable() {
        let mut burst = [0u8; 33];
        encode(&random_payload(), &mut burst);
        // A 2x2 square of errors leaves two errors in each affected row and column
        for a in [row_start(2), row_start(2) + 1, row_start(3), row_start(3) + 1] {
            let pos = burst_pos((a * 181) % CODED_BITS);
            burst[pos / 8] ^= 0x80 >> (pos % 8);
        }
        assert_eq!(decode(&burst), None);
    }
}
