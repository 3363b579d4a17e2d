//! Rate 3/4 trellis code, ETSI TS 102 361-1 Annex B.2
//!
//! 144 payload bits become 48 tribits plus a flushing zero tribit. Each tribit,
//! together with the previous one as state, selects one of 16 constellation
//! points, transmitted as two dibits. The 98 dibits are interleaved around the
//! burst centre.

use crate::bits::{read_bit, write_bit};

const POINTS: usize = 49;
const TRIBITS: usize = 48;
const STATES: usize = 8;

/// Highest acceptable Viterbi path metric, in bit errors
pub const MAX_PATH_ERRORS: u32 = 4;

/// Point index -> position of its first dibit within the 98 burst dibits
const INTERLEAVE_TABLE: [usize; POINTS] = [
    0, 8, 16, 24, 32, 40, 48, 56, 64, 72, 80, 88, 96, 2, 10, 18, 26, 34, 42, 50, 58, 66, 74, 82, 90, 4, 12, 20, 28, 36, 44,
    52, 60, 68, 76, 84, 92, 6, 14, 22, 30, 38, 46, 54, 62, 70, 78, 86, 94,
];

/// [state][tribit] -> constellation point
const ENCODE_TABLE: [[u8; STATES]; STATES] = [
    [0, 8, 4, 12, 2, 10, 6, 14],
    [4, 12, 2, 10, 6, 14, 0, 8],
    [1, 9, 5, 13, 3, 11, 7, 15],
    [5, 13, 3, 11, 7, 15, 1, 9],
    [3, 11, 7, 15, 1, 9, 5, 13],
    [7, 15, 1, 9, 5, 13, 3, 11],
    [2, 10, 6, 14, 0, 8, 4, 12],
    [6, 14, 0, 8, 4, 12, 2, 10],
];

/// Constellation point -> dibit pair as 4 transmitted bits
const POINT_TO_DIBITS: [u8; 16] = [0x2, 0xA, 0x7, 0xF, 0xE, 0x6, 0xB, 0x3, 0xD, 0x5, 0x8, 0x0, 0x1, 0x9, 0x4, 0xC];

/// Inverse of POINT_TO_DIBITS
pub const DIBITS_TO_POINT: [u8; 16] = [11, 12, 0, 7, 14, 9, 5, 2, 10, 13, 1, 6, 15, 8, 4, 3];

/// Burst bit index of bit `j` (0..4) of point `i`
#[inline]
fn point_bit_pos(i: usize, j: usize) -> usize {
    let n = INTERLEAVE_TABLE[i] * 2 + j;
    if n >= 98 { n + 68 } else { n }
}

fn payload_to_tribits(payload: &[u8; 18]) -> [u8; POINTS] {
    let mut tribits = [0u8; POINTS];
    for (i, t) in tribits[..TRIBITS].iter_mut().enumerate() {
        let n = 143 - i * 3;
        *t = (read_bit(payload, n) as u8) << 2 | (read_bit(payload, n - 1) as u8) << 1 | read_bit(payload, n - 2) as u8;
    }
    tribits
}

fn tribits_to_payload(tribits: &[u8; POINTS]) -> [u8; 18] {
    let mut payload = [0u8; 18];
    for (i, t) in tribits[..TRIBITS].iter().enumerate() {
        let n = 143 - i * 3;
        write_bit(&mut payload, n, t & 4 != 0);
        write_bit(&mut payload, n - 1, t & 2 != 0);
        write_bit(&mut payload, n - 2, t & 1 != 0);
    }
    payload
}

/// Encodes 18 payload bytes into the coded part of `burst`, leaving the centre untouched
pub fn encode(payload: &[u8; 18], burst: &mut [u8; 33]) {
    let tribits = payload_to_tribits(payload);
    let mut state = 0usize;
    for (i, &t) in tribits.iter().enumerate() {
        let point = ENCODE_TABLE[state][t as usize];
        state = t as usize;
        let dibits = POINT_TO_DIBITS[point as usize];
        for j in 0..4 {
            write_bit(burst, point_bit_pos(i, j), (dibits >> (3 - j)) & 1 == 1);
        }
    }
}

/// Hard-decision Viterbi decode. Returns the payload and the path metric
/// (number of bit differences from the nearest valid sequence).
pub fn decode_with_metric(burst: &[u8; 33]) -> ([u8; 18], u32) {
    let mut received = [0u8; POINTS];
    for (i, r) in received.iter_mut().enumerate() {
        for j in 0..4 {
            *r = (*r << 1) | read_bit(burst, point_bit_pos(i, j)) as u8;
        }
    }

    const INF: u32 = u32::MAX / 2;
    let mut metric = [INF; STATES];
    metric[0] = 0;
    let mut history = [[0u8; STATES]; POINTS];

    for (i, &rx) in received.iter().enumerate() {
        let mut next = [INF; STATES];
        for s in 0..STATES {
            if metric[s] >= INF {
                continue;
            }
            for t in 0..STATES {
                // The final tribit is always zero
                if i == POINTS - 1 && t != 0 {
                    continue;
                }
                let point = ENCODE_TABLE[s][t];
                let cost = metric[s] + (POINT_TO_DIBITS[point as usize] ^ rx).count_ones();
                if cost < next[t] {
                    next[t] = cost;
                    history[i][t] = s as u8;
                }
            }
        }
        metric = next;
    }

    // State after point i is tribit i, walk back from the flushed zero state
    let mut tribits = [0u8; POINTS];
    let mut state = 0u8;
    for i in (0..POINTS).rev() {
        tribits[i] = state;
        state = history[i][state as usize];
    }

    (tribits_to_payload(&tribits), metric[0])
}

/// Decodes a rate 3/4 burst, None if the best path needs more than MAX_PATH_ERRORS corrections
pub fn decode(burst: &[u8; 33]) -> Option<[u8; 18]> {
    let (payload, metric) = decode_with_metric(burst);
    if metric > MAX_PATH_ERRORS {
        tracing::trace!("trellis: path metric {} too high", metric);
        return None;
    }
    Some(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_payload() -> [u8; 18] {
        let mut p = [0u8; 18];
        for b in p.iter_mut() {
            *b = rand::random_range(0..=255);
        }
        p
    }

    #[test]
    fn test_tables_consistent() {
        for (p, d) in POINT_TO_DIBITS.iter().enumerate() {
            assert_eq!(DIBITS_TO_POINT[*d as usize] as usize, p);
        }
        let mut seen = [false; 98];
        for i in 0..POINTS {
            seen[INTERLEAVE_TABLE[i]] = true;
            seen[INTERLEAVE_TABLE[i] + 1] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_round_trip() {
        for _ in 0..20 {
            let payload = random_payload();
            let mut burst = [0u8; 33];
            encode(&payload, &mut burst);
            assert_eq!(decode_with_metric(&burst), (payload, 0));
        }
    }

    #[test]
    fn test_single_error() {
        let payload = random_payload();
        let mut burst = [0u8; 33];
        encode(&payload, &mut burst);
        let pos = point_bit_pos(20, 1);
        burst[pos / 8] ^= 0x80 >> (pos % 8);
        assert_eq!(decode(&burst), Some(payload));
    }

    #[test]
    fn test_garbage_rejected() {
        let burst = [0xA5u8; 33];
        assert_eq!(decode(&burst), None);
    }
}
