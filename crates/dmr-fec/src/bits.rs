//! MSB-first bit addressing within byte slices, as used by every burst layout.

#[inline]
pub fn read_bit(data: &[u8], i: usize) -> bool {
    (data[i >> 3] >> (7 - (i & 7))) & 1 == 1
}

#[inline]
pub fn write_bit(data: &mut [u8], i: usize, b: bool) {
    let mask = 0x80u8 >> (i & 7);
    if b {
        data[i >> 3] |= mask;
    } else {
        data[i >> 3] &= !mask;
    }
}

/// Unpack `out.len()` bits starting at bit `offset` of `data`
pub fn bytes_to_bits(data: &[u8], offset: usize, out: &mut [bool]) {
    for (i, b) in out.iter_mut().enumerate() {
        *b = read_bit(data, offset + i);
    }
}

/// Pack `bits` into `data` starting at bit `offset`
pub fn bits_to_bytes(bits: &[bool], data: &mut [u8], offset: usize) {
    for (i, b) in bits.iter().enumerate() {
        write_bit(data, offset + i, *b);
    }
}

/// Packs up to 32 bools into an integer, first bool most significant
pub fn bits_to_u32(bits: &[bool]) -> u32 {
    bits.iter().fold(0u32, |acc, b| (acc << 1) | *b as u32)
}

/// Inverse of bits_to_u32, fills all of `out`
pub fn u32_to_bits(value: u32, out: &mut [bool]) {
    let n = out.len();
    for (i, b) in out.iter_mut().enumerate() {
        *b = (value >> (n - 1 - i)) & 1 == 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_addressing() {
        let mut data = [0u8; 3];
        write_bit(&mut data, 0, true);
        write_bit(&mut data, 9, true);
        write_bit(&mut data, 23, true);
        assert_eq!(data, [0x80, 0x40, 0x01]);
        assert!(read_bit(&data, 9));
        write_bit(&mut data, 9, false);
        assert_eq!(data[1], 0x00);

        let mut bits = [false; 8];
        bytes_to_bits(&[0x0F, 0xF0], 4, &mut bits);
        assert_eq!(bits_to_u32(&bits), 0xFF);
        u32_to_bits(0xA5, &mut bits);
        let mut out = [0u8; 2];
        bits_to_bytes(&bits, &mut out, 4);
        assert_eq!(out, [0x0A, 0x50]);
    }
}
