use std::fmt;

use crate::codec_error::CodecErr;

/// MSB-first bit cursor over a fixed-size byte buffer.
/// Used to lay out and parse the 9 and 12 byte logical payloads (LC, CSBK, data headers)
/// field by field, the way the over-the-air tables describe them.
pub struct BitBuffer {
    buffer: Vec<u8>,
    pos: usize,
    end: usize,
}

impl BitBuffer {
    /// Create a zeroed buffer holding exactly `len_bits` bits.
    pub fn new(len_bits: usize) -> Self {
        BitBuffer {
            buffer: vec![0; len_bits.div_ceil(8)],
            pos: 0,
            end: len_bits,
        }
    }

    pub fn from_bytes(data: &[u8]) -> Self {
        BitBuffer {
            buffer: data.to_vec(),
            pos: 0,
            end: data.len() * 8,
        }
    }

    /// Construct a BitBuffer from a string of '0'/'1' characters, ignoring spaces.
    /// Returns None if any other character is encountered.
    pub fn from_bitstr(bitstr: &str) -> Option<Self> {
        let bits: Vec<u8> = bitstr.chars().filter(|c| *c != ' ').map(|c| match c {
            '0' => Some(0),
            '1' => Some(1),
            _ => None,
        }).collect::<Option<Vec<u8>>>()?;

        let mut buf = BitBuffer::new(bits.len());
        for bit in bits {
            buf.write_bit(bit);
        }
        buf.pos = 0;
        Some(buf)
    }

    /// Peek `num_bits` at an absolute offset, without moving the cursor.
    /// Returns None on overflow or if `num_bits > 64`.
    pub fn peek_bits_at(&self, offset: usize, num_bits: usize) -> Option<u64> {
        if num_bits > 64 || offset + num_bits > self.end {
            return None;
        }
        let mut v = 0u64;
        for i in offset..offset + num_bits {
            v = (v << 1) | self.bit_at(i) as u64;
        }
        Some(v)
    }

    /// Read `num_bits` at the cursor, advancing on success.
    pub fn read_bits(&mut self, num_bits: usize) -> Option<u64> {
        let v = self.peek_bits_at(self.pos, num_bits)?;
        self.pos += num_bits;
        Some(v)
    }

    /// Similar to read_bits, but names the field that ran past the end of the buffer.
    pub fn read_field(&mut self, num_bits: usize, field: &'static str) -> Result<u64, CodecErr> {
        self.read_bits(num_bits).ok_or(CodecErr::BufferEnded { field: Some(field) })
    }

    pub fn read_bool(&mut self, field: &'static str) -> Result<bool, CodecErr> {
        Ok(self.read_field(1, field)? == 1)
    }

    /// Write a single bit at the cursor
    pub fn write_bit(&mut self, value: u8) {
        assert!(value <= 1, "write_bit: value must be 0 or 1");
        assert!(self.pos < self.end, "write would exceed buffer end");
        let mask = 0x80u8 >> (self.pos % 8);
        let byte = &mut self.buffer[self.pos / 8];
        if value == 1 {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
        self.pos += 1;
    }

    /// Write up to 64 bits MSB first, advancing the cursor. Panics past the end of the buffer.
    pub fn write_bits(&mut self, value: u64, num_bits: usize) {
        assert!(num_bits <= 64, "can only write up to 64 bits");
        assert!(num_bits == 64 || value >> num_bits == 0, "value exceeds num_bits {} {}", value, num_bits);
        assert!(self.pos + num_bits <= self.end, "write would exceed buffer end");
        for i in (0..num_bits).rev() {
            self.write_bit(((value >> i) & 1) as u8);
        }
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_bit(value as u8);
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        for b in data {
            self.write_bits(*b as u64, 8);
        }
    }

    /// Active length in bits
    pub fn get_len(&self) -> usize {
        self.end
    }

    pub fn get_len_remaining(&self) -> usize {
        self.end - self.pos
    }

    pub fn get_pos(&self) -> usize {
        self.pos
    }

    pub fn seek(&mut self, offset: usize) {
        assert!(offset <= self.end, "seek out of window: got {}, allowed [0,{}]", offset, self.end);
        self.pos = offset;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Uppercase hex of the whole buffer, no separators
    pub fn dump_hex(&self) -> String {
        self.buffer.iter().map(|b| format!("{:02X}", b)).collect()
    }

    /// Binary string with a ^ marker before the cursor
    pub fn dump_bin(&self) -> String {
        let mut s = String::with_capacity(self.end + 1);
        for i in 0..self.end {
            if i == self.pos {
                s.push('^');
            }
            s.push(if self.bit_at(i) == 1 { '1' } else { '0' });
        }
        if self.pos == self.end {
            s.push('^');
        }
        s
    }

    #[inline]
    fn bit_at(&self, i: usize) -> u8 {
        (self.buffer[i / 8] >> (7 - (i % 8))) & 1
    }
}

impl fmt::Debug for BitBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitBuffer {{ ^{} >{} {} }}", self.pos, self.end, self.dump_hex())
    }
}
