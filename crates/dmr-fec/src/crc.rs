/// CRC-16 CCITT, ETSI TS 102 361-1 Annex B.3.7
pub const GEN_POLY_16: u16 = 0x1021;
/// CRC-8, used to seal the short LC sent to the modem
pub const GEN_POLY_8: u8 = 0x07;

/// CRC-8 (poly 0x07), MSB first, init 0, no final xor
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &b in data {
        crc ^= b;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ GEN_POLY_8 } else { crc << 1 };
        }
    }
    crc
}

/// CRC-16 CCITT over `data`, init 0, inverted result
pub fn ccitt16(data: &[u8]) -> u16 {
    let mut crc = 0u16;
    for &b in data {
        crc ^= (b as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 { (crc << 1) ^ GEN_POLY_16 } else { crc << 1 };
        }
    }
    !crc
}

/// Checks the big-endian CRC trailer in the last two bytes of `data`
pub fn check_ccitt16(data: &[u8]) -> bool {
    check_ccitt16_masked(data, [0, 0])
}

/// Writes the CRC of all but the last two bytes into the trailer
pub fn add_ccitt16(data: &mut [u8]) {
    add_ccitt16_masked(data, [0, 0]);
}

/// As check_ccitt16, with the trailer XORed against a structure mask first
pub fn check_ccitt16_masked(data: &[u8], mask: [u8; 2]) -> bool {
    let len = data.len();
    if len < 3 {
        return false;
    }
    let crc = ccitt16(&data[..len - 2]);
    let trailer = u16::from_be_bytes([data[len - 2] ^ mask[0], data[len - 1] ^ mask[1]]);
    crc == trailer
}

pub fn add_ccitt16_masked(data: &mut [u8], mask: [u8; 2]) {
    let len = data.len();
    assert!(len >= 3, "add_ccitt16: buffer too short");
    let crc = ccitt16(&data[..len - 2]).to_be_bytes();
    data[len - 2] = crc[0] ^ mask[0];
    data[len - 1] = crc[1] ^ mask[1];
}

/// 5-bit checksum over the 9 LC bytes of an embedded LC
pub fn encode_five_bit(data: &[u8; 9]) -> u8 {
    let total: u32 = data.iter().map(|b| *b as u32).sum();
    (total % 31) as u8
}

pub fn check_five_bit(data: &[u8; 9], crc: u8) -> bool {
    encode_five_bit(data) == crc
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECK_INPUT: &[u8] = b"123456789";

    #[test]
    fn test_reference_vectors() {
        assert_eq!(crc8(CHECK_INPUT), 0xF4);
        assert_eq!(ccitt16(CHECK_INPUT), 0xCE3C);
    }

    #[test]
    fn test_ccitt16_trailer() {
        let mut data = [0u8; 12];
        data[..10].copy_from_slice(&[0x3D, 0x00, 0x40, 0x05, 0x00, 0x00, 0x09, 0x12, 0xD6, 0x87]);
        add_ccitt16(&mut data);
        assert!(check_ccitt16(&data));

        // Any single bit flip is caught
        for bit in 0..96 {
            let mut corrupt = data;
            corrupt[bit / 8] ^= 0x80 >> (bit % 8);
            assert!(!check_ccitt16(&corrupt), "bit {} not detected", bit);
        }
    }

    #[test]
    fn test_ccitt16_masked() {
        let mut data = [0x55u8; 12];
        add_ccitt16_masked(&mut data, [0xA5, 0xA5]);
        assert!(check_ccitt16_masked(&data, [0xA5, 0xA5]));
        assert!(!check_ccitt16(&data));
        assert!(!check_ccitt16_masked(&data, [0xCC, 0xCC]));
    }

    #[test]
    fn test_five_bit() {
        let lc = [0x00, 0x00, 0x00, 0x00, 0x00, 0x09, 0x12, 0xD6, 0x87];
        // 0x09 + 0x12 + 0xD6 + 0x87 = 376, 376 % 31 = 4
        assert_eq!(encode_five_bit(&lc), 4);
        assert!(check_five_bit(&lc, 4));
        assert!(!check_five_bit(&lc, 5));
    }
}
