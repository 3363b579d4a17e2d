//! Embedded signalling reassembly, ETSI TS 102 361-1 Clause 9.1.4 and Annex B.2.1.
//!
//! A 72-bit LC plus a 5-bit checksum is laid out in a 16x8 bit matrix: seven
//! Hamming(16,11,4) rows and a column parity row. The matrix is read out column
//! wise and spread over four voice bursts, 32 bits each, with the LCSS field of
//! the EMB marking first, continuation and last fragments.

use dmr_core::defines::{DMR_FRAME_LENGTH_BYTES, Flco};
use dmr_fec::bits::{bits_to_bytes, bytes_to_bits, read_bit, write_bit};
use dmr_fec::{crc, hamming};

use crate::lc::link_control::Lc;

const RAW_BITS: usize = 128;
const FRAGMENT_BITS: usize = 32;
/// First burst bit of the embedded data, between the two EMB halves
const FRAGMENT_OFFSET: usize = 116;

/// Matrix bit ranges holding the 72 LC bits
const DATA_RANGES: [(usize, usize); 7] = [(0, 11), (16, 27), (32, 42), (48, 58), (64, 74), (80, 90), (96, 106)];
/// Matrix bits holding the checksum, most significant first
const CRC_BITS: [usize; 5] = [42, 58, 74, 90, 106];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LcState {
    None,
    First,
    Second,
    Third,
}

/// Per-call embedded data accumulator, also used to re-emit an LC as fragments
#[derive(Debug, Clone)]
pub struct EmbeddedData {
    raw: [bool; RAW_BITS],
    state: LcState,
    data: [u8; 9],
    flco: Flco,
    valid: bool,
}

impl Default for EmbeddedData {
    fn default() -> Self {
        Self::new()
    }
}

/// Walks the matrix column by column. Yields (raw index, matrix index).
fn column_walk() -> impl Iterator<Item = (usize, usize)> {
    let mut b = 0usize;
    (0..RAW_BITS).map(move |a| {
        let cur = b;
        b += 16;
        if b > RAW_BITS - 1 {
            b -= RAW_BITS - 1;
        }
        (a, cur)
    })
}

impl EmbeddedData {
    pub fn new() -> Self {
        EmbeddedData {
            raw: [false; RAW_BITS],
            state: LcState::None,
            data: [0; 9],
            flco: Flco::Group,
            valid: false,
        }
    }

    pub fn reset(&mut self) {
        self.state = LcState::None;
        self.valid = false;
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Feeds the embedded fragment of a voice burst. Returns true when a fourth
    /// fragment completes a checked LC. Fragments out of sequence restart the
    /// accumulation.
    pub fn add_data(&mut self, burst: &[u8; DMR_FRAME_LENGTH_BYTES], lcss: u8) -> bool {
        let mut fragment = [false; FRAGMENT_BITS];
        bytes_to_bits(burst, FRAGMENT_OFFSET, &mut fragment);

        let (slot, next) = match (lcss, self.state) {
            (1, _) => (0, LcState::First),
            (3, LcState::First) => (1, LcState::Second),
            (3, LcState::Second) => (2, LcState::Third),
            (2, LcState::Third) => (3, LcState::None),
            _ => {
                // Single fragment signalling (lcss 0) or a missed fragment
                self.state = LcState::None;
                return false;
            }
        };

        if slot == 0 {
            self.valid = false;
        }
        self.raw[slot * FRAGMENT_BITS..(slot + 1) * FRAGMENT_BITS].copy_from_slice(&fragment);
        self.state = next;

        if slot < 3 {
            return false;
        }
        self.decode_embedded_data();
        if self.valid {
            self.encode_embedded_data();
        }
        self.valid
    }

    /// Writes fragment `n` (1..=4) into the burst and returns its LCSS. Any other
    /// `n` clears the embedded field and returns 0.
    pub fn get_data(&self, burst: &mut [u8; DMR_FRAME_LENGTH_BYTES], n: u8) -> u8 {
        if (1..=4).contains(&n) {
            let idx = (n - 1) as usize;
            for i in 0..FRAGMENT_BITS {
                write_bit(burst, FRAGMENT_OFFSET + i, self.raw[idx * FRAGMENT_BITS + i]);
            }
            match idx {
                0 => 1,
                3 => 2,
                _ => 3,
            }
        } else {
            for i in 0..FRAGMENT_BITS {
                write_bit(burst, FRAGMENT_OFFSET + i, false);
            }
            0
        }
    }

    /// Loads an LC for re-emission through get_data
    pub fn set_lc(&mut self, lc: &Lc) {
        self.data = lc.to_bytes();
        self.flco = lc.flco;
        self.valid = true;
        self.encode_embedded_data();
    }

    /// The reassembled LC, only for group and individual calls. Other FLCOs
    /// (talker alias, GPS) are read through raw_data.
    pub fn lc(&self) -> Option<Lc> {
        if !self.valid || !self.flco.is_call() {
            return None;
        }
        Lc::from_bytes(&self.data).ok()
    }

    pub fn raw_data(&self) -> Option<[u8; 9]> {
        self.valid.then_some(self.data)
    }

    pub fn flco(&self) -> Flco {
        self.flco
    }

    fn decode_embedded_data(&mut self) {
        let mut matrix = [false; RAW_BITS];
        for (a, b) in column_walk() {
            matrix[b] = self.raw[a];
        }

        for row in (0..112).step_by(16) {
            if !hamming::decode16114(&mut matrix[row..row + 16]).is_ok() {
                tracing::debug!("embedded LC: row {} uncorrectable", row / 16);
                return;
            }
        }
        for c in 0..16 {
            let parity = (0..8).fold(false, |acc, r| acc ^ matrix[c + r * 16]);
            if parity {
                tracing::debug!("embedded LC: column {} parity failed", c);
                return;
            }
        }

        let mut bits = [false; 72];
        let mut n = 0;
        for (lo, hi) in DATA_RANGES {
            for i in lo..hi {
                bits[n] = matrix[i];
                n += 1;
            }
        }
        let mut data = [0u8; 9];
        bits_to_bytes(&bits, &mut data, 0);

        let crc = CRC_BITS.iter().fold(0u8, |acc, &i| (acc << 1) | matrix[i] as u8);
        if !crc::check_five_bit(&data, crc) {
            tracing::debug!("embedded LC: checksum failed");
            return;
        }

        self.data = data;
        self.flco = Flco::from_raw(data[0]);
        self.valid = true;
    }

    fn encode_embedded_data(&mut self) {
        let mut matrix = [false; RAW_BITS];

        let crc = crc::encode_five_bit(&self.data);
        for (k, &i) in CRC_BITS.iter().enumerate() {
            matrix[i] = (crc >> (4 - k)) & 1 == 1;
        }

        let mut n = 0;
        for (lo, hi) in DATA_RANGES {
            for i in lo..hi {
                matrix[i] = read_bit(&self.data, n);
                n += 1;
            }
        }

        for row in (0..112).step_by(16) {
            hamming::encode16114(&mut matrix[row..row + 16]);
        }
        for c in 0..16 {
            matrix[112 + c] = (0..7).fold(false, |acc, r| acc ^ matrix[c + r * 16]);
        }

        for (a, b) in column_walk() {
            self.raw[a] = matrix[b];
        }
    }
}

#[cfg(test)]
mod tests {
    use dmr_core::debug;

    use super::*;

    fn fragments(lc: &Lc) -> Vec<([u8; DMR_FRAME_LENGTH_BYTES], u8)> {
        let mut source = EmbeddedData::new();
        source.set_lc(lc);
        (1..=4)
            .map(|n| {
                let mut burst = [0u8; DMR_FRAME_LENGTH_BYTES];
                let lcss = source.get_data(&mut burst, n);
                (burst, lcss)
            })
            .collect()
    }

    #[test]
    fn test_column_walk_is_permutation() {
        let mut seen = [false; RAW_BITS];
        for (_, b) in column_walk() {
            assert!(!seen[b]);
            seen[b] = true;
        }
    }

    #[test]
    fn test_group_lc_round_trip() {
        debug::setup_logging_verbose();
        let lc = Lc::new(Flco::Group, 1234567, 9);
        let frags = fragments(&lc);
        assert_eq!(frags.iter().map(|f| f.1).collect::<Vec<_>>(), vec![1, 3, 3, 2]);

        let mut sink = EmbeddedData::new();
        for (i, (burst, lcss)) in frags.iter().enumerate() {
            assert_eq!(sink.add_data(burst, *lcss), i == 3);
        }
        assert_eq!(sink.lc(), Some(lc));
    }

    #[test]
    fn test_private_lc_round_trip() {
        let lc = Lc::new(Flco::UserUser, 2345678, 3456789);
        let mut sink = EmbeddedData::new();
        for (burst, lcss) in fragments(&lc) {
            sink.add_data(&burst, lcss);
        }
        assert_eq!(sink.lc(), Some(lc));
    }

    #[test]
    fn test_non_call_flco_not_surfaced() {
        let mut lc = Lc::new(Flco::GpsInfo, 0, 0);
        lc.options = 0x5A;
        let mut sink = EmbeddedData::new();
        for (burst, lcss) in fragments(&lc) {
            sink.add_data(&burst, lcss);
        }
        assert!(sink.is_valid());
        assert_eq!(sink.lc(), None);
        assert_eq!(sink.flco(), Flco::GpsInfo);
        assert_eq!(sink.raw_data(), Some(lc.to_bytes()));
    }

    #[test]
    fn test_out_of_sequence_resets() {
        let lc = Lc::new(Flco::Group, 1234567, 9);
        let frags = fragments(&lc);
        let mut sink = EmbeddedData::new();
        sink.add_data(&frags[0].0, 1);
        sink.add_data(&frags[1].0, 3);
        // Fragment 3 lost, the last fragment arrives early
        assert!(!sink.add_data(&frags[3].0, 2));
        assert!(!sink.add_data(&frags[2].0, 3));
        assert!(!sink.add_data(&frags[3].0, 2));
        assert_eq!(sink.lc(), None);

        // A fresh sequence still completes
        for (burst, lcss) in &frags {
            sink.add_data(burst, *lcss);
        }
        assert_eq!(sink.lc(), Some(lc));
    }

    #[test]
    fn test_single_bit_error_corrected() {
        let lc = Lc::new(Flco::Group, 3100123, 3100);
        let mut frags = fragments(&lc);
        // Lands in Hamming row 2, the parity row has no correction of its own
        frags[2].0[16] ^= 0x02;
        let mut sink = EmbeddedData::new();
        for (burst, lcss) in &frags {
            sink.add_data(burst, *lcss);
        }
        assert_eq!(sink.lc(), Some(lc));
    }

    #[test]
    fn test_null_fragment() {
        let mut source = EmbeddedData::new();
        source.set_lc(&Lc::new(Flco::Group, 1, 2));
        let mut burst = [0xFFu8; DMR_FRAME_LENGTH_BYTES];
        assert_eq!(source.get_data(&mut burst, 0), 0);
        assert_eq!(burst[14], 0xF0);
        assert_eq!(&burst[15..18], &[0, 0, 0]);
        assert_eq!(burst[18], 0x0F);
        assert_eq!(source.get_data(&mut burst, 5), 0);
    }
}
