//! Short LC activity update, sent to the modem out of band so it can advertise
//! channel activity in the CACH of its idle transmissions.
//! ETSI TS 102 361-2 Clause 7.1.3, coded as in TS 102 361-1 Annex B.2.2.

use dmr_core::defines::Flco;
use dmr_fec::bits::{bytes_to_bits, bits_to_bytes};
use dmr_fec::{crc, hamming};

const ROWS: usize = 4;
const COLS: usize = 17;
const CODED_BITS: usize = ROWS * COLS;

/// Short LC opcode for an activity update
const SLCO_ACT_UPDATE: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivityType {
    #[default]
    None,
    Voice,
    Data,
    Csbk,
    Emergency,
}

/// What one timeslot is doing, as shown in the activity update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotActivity {
    pub activity: ActivityType,
    pub flco: Flco,
    /// Destination id, 0 when the slot is idle
    pub id: u32,
}

impl Default for SlotActivity {
    fn default() -> Self {
        SlotActivity { activity: ActivityType::None, flco: Flco::Group, id: 0 }
    }
}

impl SlotActivity {
    pub fn is_idle(&self) -> bool {
        self.id == 0 || self.activity == ActivityType::None
    }

    /// 4-bit activity code, ETSI TS 102 361-2 Table 7.5
    fn code(&self) -> u8 {
        if self.is_idle() {
            return 0;
        }
        let group = match self.flco {
            Flco::Group => true,
            Flco::UserUser => false,
            _ => return 0,
        };
        match (self.activity, group) {
            (ActivityType::Voice, true) => 0x08,
            (ActivityType::Voice, false) => 0x09,
            (ActivityType::Data, true) => 0x0B,
            (ActivityType::Data, false) => 0x0A,
            (ActivityType::Csbk | ActivityType::Emergency, true) => 0x02,
            (ActivityType::Csbk | ActivityType::Emergency, false) => 0x03,
            (ActivityType::None, _) => 0,
        }
    }

    fn id_hash(&self) -> u8 {
        if self.is_idle() {
            return 0;
        }
        crc::crc8(&[(self.id >> 16) as u8, (self.id >> 8) as u8, self.id as u8])
    }
}

/// Builds the 5-byte activity update. Both slots idle still gives an update,
/// it tells the modem the channel went quiet.
pub fn build_activity_update(slot1: &SlotActivity, slot2: &SlotActivity) -> [u8; 5] {
    let mut lc = [0u8; 5];
    lc[0] = SLCO_ACT_UPDATE;
    lc[1] = (slot1.code() << 4) | slot2.code();
    lc[2] = slot1.id_hash();
    lc[3] = slot2.id_hash();
    lc[4] = crc::crc8(&lc[..4]);
    lc
}

/// 36 payload bits (the low nibble of byte 0 onwards) -> 68 coded bits in 9 bytes
pub fn encode(lc: &[u8; 5]) -> [u8; 9] {
    let mut payload = [false; 40];
    bytes_to_bits(lc, 0, &mut payload);

    let mut matrix = [false; CODED_BITS];
    for row in 0..3 {
        matrix[row * COLS..row * COLS + 12].copy_from_slice(&payload[4 + row * 12..16 + row * 12]);
        hamming::encode17123(&mut matrix[row * COLS..(row + 1) * COLS]);
    }
    for c in 0..COLS {
        matrix[3 * COLS + c] = matrix[c] ^ matrix[COLS + c] ^ matrix[2 * COLS + c];
    }

    let mut coded = [false; 72];
    for a in 0..CODED_BITS - 1 {
        coded[(a * 4) % (CODED_BITS - 1)] = matrix[a];
    }
    coded[CODED_BITS - 1] = matrix[CODED_BITS - 1];

    let mut out = [0u8; 9];
    bits_to_bytes(&coded, &mut out, 0);
    out
}

/// Inverse of encode, None if a row is uncorrectable or a check fails
pub fn decode(data: &[u8; 9]) -> Option<[u8; 5]> {
    let mut coded = [false; 72];
    bytes_to_bits(data, 0, &mut coded);

    let mut matrix = [false; CODED_BITS];
    for a in 0..CODED_BITS - 1 {
        matrix[a] = coded[(a * 4) % (CODED_BITS - 1)];
    }
    matrix[CODED_BITS - 1] = coded[CODED_BITS - 1];

    for row in 0..3 {
        if !hamming::decode17123(&mut matrix[row * COLS..(row + 1) * COLS]).is_ok() {
            return None;
        }
    }
    for c in 0..COLS {
        if matrix[c] ^ matrix[COLS + c] ^ matrix[2 * COLS + c] != matrix[3 * COLS + c] {
            return None;
        }
    }

    let mut payload = [false; 40];
    for row in 0..3 {
        payload[4 + row * 12..16 + row * 12].copy_from_slice(&matrix[row * COLS..row * COLS + 12]);
    }
    let mut lc = [0u8; 5];
    bits_to_bytes(&payload, &mut lc, 0);

    if crc::crc8(&lc[..4]) != lc[4] {
        return None;
    }
    Some(lc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voice(flco: Flco, id: u32) -> SlotActivity {
        SlotActivity { activity: ActivityType::Voice, flco, id }
    }

    #[test]
    fn test_activity_codes() {
        let lc = build_activity_update(&voice(Flco::Group, 9), &SlotActivity::default());
        assert_eq!(lc[0], 0x01);
        assert_eq!(lc[1], 0x80);
        assert_eq!(lc[2], crc::crc8(&[0, 0, 9]));
        assert_eq!(lc[3], 0);

        let data = SlotActivity { activity: ActivityType::Data, flco: Flco::UserUser, id: 1234567 };
        let lc = build_activity_update(&voice(Flco::UserUser, 91), &data);
        assert_eq!(lc[1], 0x9A);
        assert_eq!(lc[3], crc::crc8(&[0x12, 0xD6, 0x87]));
        assert_eq!(lc[4], crc::crc8(&lc[..4]));
    }

    #[test]
    fn test_idle_is_all_zero() {
        let idle = [SLCO_ACT_UPDATE, 0, 0, 0, crc::crc8(&[SLCO_ACT_UPDATE, 0, 0, 0])];
        assert_eq!(build_activity_update(&SlotActivity::default(), &SlotActivity::default()), idle);
        let idle_with_id = SlotActivity { activity: ActivityType::None, flco: Flco::Group, id: 9 };
        assert_eq!(build_activity_update(&idle_with_id, &SlotActivity::default()), idle);
    }

    #[test]
    fn test_short_lc_round_trip() {
        let csbk = SlotActivity { activity: ActivityType::Csbk, flco: Flco::Group, id: 262 };
        let lc = build_activity_update(&csbk, &voice(Flco::Group, 2));
        let coded = encode(&lc);
        assert_eq!(decode(&coded), Some(lc));
    }

    #[test]
    fn test_short_lc_single_error_per_row() {
        let lc = build_activity_update(&voice(Flco::Group, 3100), &voice(Flco::UserUser, 2345678));
        let coded = encode(&lc);
        // Coded bit 0 is matrix bit 0 (row 0), bit 4 is matrix bit 1 (row 0)
        let mut damaged = coded;
        damaged[0] ^= 0x80;
        assert_eq!(decode(&damaged), Some(lc));
        let mut damaged = coded;
        damaged[0] ^= 0x88;
        assert_eq!(decode(&damaged), None);
    }
}
