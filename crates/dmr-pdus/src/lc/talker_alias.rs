//! Talker alias reassembly, ETSI TS 102 361-2 Clause 7.2.18.
//!
//! The header and up to three blocks each carry 7 bytes after the FLCO/FID pair.
//! The first header byte holds the format (2 bits) and the length in characters
//! (5 bits), the remaining bits are alias data.

use core::fmt;

use dmr_core::BitBuffer;
use dmr_core::defines::Flco;

const BLOCK_BYTES: usize = 7;
const BLOCKS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TalkerAliasFormat {
    SevenBit,
    Iso8Bit,
    Utf8,
    Utf16,
}

impl TalkerAliasFormat {
    fn from_raw(x: u8) -> Self {
        match x & 0x03 {
            0 => TalkerAliasFormat::SevenBit,
            1 => TalkerAliasFormat::Iso8Bit,
            2 => TalkerAliasFormat::Utf8,
            _ => TalkerAliasFormat::Utf16,
        }
    }
}

impl fmt::Display for TalkerAliasFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            TalkerAliasFormat::SevenBit => "7-bit",
            TalkerAliasFormat::Iso8Bit => "ISO 8-bit",
            TalkerAliasFormat::Utf8 => "UTF-8",
            TalkerAliasFormat::Utf16 => "UTF-16",
        };
        write!(f, "{}", s)
    }
}

/// Collects talker alias header and blocks for one call
#[derive(Debug, Clone, Default)]
pub struct TalkerAlias {
    buf: [u8; BLOCK_BYTES * BLOCKS],
    /// Bit per received block, header is bit 0
    received: u8,
}

impl TalkerAlias {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.buf = [0; BLOCK_BYTES * BLOCKS];
        self.received = 0;
    }

    /// Block index of a talker alias FLCO, header is 0
    pub fn block_index(flco: Flco) -> Option<usize> {
        match flco {
            Flco::TalkerAliasHeader => Some(0),
            Flco::TalkerAliasBlock1 => Some(1),
            Flco::TalkerAliasBlock2 => Some(2),
            Flco::TalkerAliasBlock3 => Some(3),
            _ => None,
        }
    }

    pub fn has_block(&self, block: usize) -> bool {
        block < BLOCKS && self.received & (1 << block) != 0
    }

    /// Stores the 7 payload bytes of a raw embedded LC. Returns false if this
    /// block was already seen or `block` is out of range.
    pub fn add(&mut self, block: usize, raw: &[u8; 9]) -> bool {
        if block >= BLOCKS || self.has_block(block) {
            return false;
        }
        self.buf[block * BLOCK_BYTES..(block + 1) * BLOCK_BYTES].copy_from_slice(&raw[2..]);
        self.received |= 1 << block;
        true
    }

    pub fn format(&self) -> Option<TalkerAliasFormat> {
        self.has_block(0).then(|| TalkerAliasFormat::from_raw(self.buf[0] >> 6))
    }

    /// Announced alias length in characters
    pub fn size(&self) -> Option<usize> {
        self.has_block(0).then(|| ((self.buf[0] >> 1) & 0x1F) as usize)
    }

    /// Bytes covered by the header and the consecutive blocks received after it
    fn available(&self) -> &[u8] {
        let blocks = (0..BLOCKS).take_while(|b| self.has_block(*b)).count();
        &self.buf[..blocks * BLOCK_BYTES]
    }

    /// Decodes as much of the alias as has arrived. None before the header.
    pub fn decode(&self) -> Option<String> {
        let format = self.format()?;
        let size = self.size()?;
        let data = self.available();

        let alias: String = match format {
            TalkerAliasFormat::SevenBit => {
                // Characters start at the last bit of the header byte
                let mut buffer = BitBuffer::from_bytes(data);
                buffer.seek(7);
                let mut s = String::with_capacity(size);
                while s.len() < size {
                    match buffer.read_bits(7) {
                        Some(c) => s.push(c as u8 as char),
                        None => break,
                    }
                }
                s
            }
            TalkerAliasFormat::Iso8Bit => data[1..].iter().take(size).map(|b| *b as char).collect(),
            TalkerAliasFormat::Utf8 => {
                let bytes: Vec<u8> = data[1..].iter().copied().take_while(|b| *b != 0).collect();
                String::from_utf8_lossy(&bytes).chars().take(size).collect()
            }
            TalkerAliasFormat::Utf16 => {
                let units: Vec<u16> = data[1..].chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]])).take(size).collect();
                char::decode_utf16(units).map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)).collect()
            }
        };
        Some(alias.trim_end_matches('\0').to_string())
    }

    /// True once all announced characters have been decoded
    pub fn is_complete(&self) -> bool {
        match (self.size(), self.decode()) {
            (Some(size), Some(alias)) => alias.chars().count() >= size,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(flco: Flco, payload: &[u8]) -> [u8; 9] {
        let mut r = [0u8; 9];
        r[0] = flco.into_raw();
        r[2..2 + payload.len()].copy_from_slice(payload);
        r
    }

    #[test]
    fn test_iso8_alias() {
        // Format 1, 9 characters "PD0ABC Jo"
        let mut ta = TalkerAlias::new();
        let header = [0x40 | (9 << 1), b'P', b'D', b'0', b'A', b'B', b'C'];
        assert!(ta.add(0, &raw(Flco::TalkerAliasHeader, &header)));
        assert_eq!(ta.format(), Some(TalkerAliasFormat::Iso8Bit));
        assert_eq!(ta.decode().as_deref(), Some("PD0ABC"));
        assert!(!ta.is_complete());

        assert!(ta.add(1, &raw(Flco::TalkerAliasBlock1, b" Jo\0\0\0\0")));
        assert_eq!(ta.decode().as_deref(), Some("PD0ABC Jo"));
        assert!(ta.is_complete());
        assert!(!ta.add(1, &raw(Flco::TalkerAliasBlock1, b"xxxxxxx")));
    }

    #[test]
    fn test_seven_bit_alias() {
        // "AB": header byte 0b00_00010_0 then 'A' (1000001) and 'B' (1000010)
        // 'A' starts at the last header bit
        let mut bits = BitBuffer::new(7 * 8);
        bits.write_bits(0, 2);
        bits.write_bits(2, 5);
        bits.write_bits(b'A' as u64, 7);
        bits.write_bits(b'B' as u64, 7);
        let mut header = [0u8; 7];
        header.copy_from_slice(bits.as_bytes());

        let mut ta = TalkerAlias::new();
        ta.add(0, &raw(Flco::TalkerAliasHeader, &header));
        assert_eq!(ta.decode().as_deref(), Some("AB"));
        assert!(ta.is_complete());
    }

    #[test]
    fn test_utf16_alias() {
        let mut ta = TalkerAlias::new();
        let header = [0xC0 | (3 << 1), 0x00, b'H', 0x00, b'i', 0x00, b'!'];
        ta.add(0, &raw(Flco::TalkerAliasHeader, &header));
        assert_eq!(ta.decode().as_deref(), Some("Hi!"));
    }

    #[test]
    fn test_blocks_before_header() {
        let mut ta = TalkerAlias::new();
        ta.add(2, &raw(Flco::TalkerAliasBlock2, b"1234567"));
        assert_eq!(ta.decode(), None);
        assert_eq!(TalkerAlias::block_index(Flco::TalkerAliasBlock3), Some(3));
        assert_eq!(TalkerAlias::block_index(Flco::GpsInfo), None);
        ta.reset();
        assert!(!ta.has_block(2));
    }
}
