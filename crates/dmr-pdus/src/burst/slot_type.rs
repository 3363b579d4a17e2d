use core::fmt;

use dmr_core::defines::{DMR_FRAME_LENGTH_BYTES, DataType};
use dmr_fec::bits::{read_bit, write_bit};
use dmr_fec::golay;

/// The two 10-bit halves of the Golay(20,8) slot type code sit either side of the sync
const FIRST_HALF: usize = 98;
const SECOND_HALF: usize = 156;

/// Slot type field of data sync bursts, ETSI TS 102 361-1 Clause 9.1.3
/// Bits: 4 colour code, 4 data type, 12 parity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotType {
    pub color_code: u8,
    pub data_type: DataType,
}

impl SlotType {
    pub fn new(color_code: u8, data_type: DataType) -> Self {
        SlotType { color_code, data_type }
    }

    /// Error-corrects and parses the slot type. None for reserved data types.
    pub fn decode(burst: &[u8; DMR_FRAME_LENGTH_BYTES]) -> Option<Self> {
        let mut code = 0u32;
        for i in 0..10 {
            code = (code << 1) | read_bit(burst, FIRST_HALF + i) as u32;
        }
        for i in 0..10 {
            code = (code << 1) | read_bit(burst, SECOND_HALF + i) as u32;
        }

        let data = golay::decode2087(code);
        let data_type = DataType::try_from((data & 0x0F) as u64).ok()?;
        Some(SlotType { color_code: data >> 4, data_type })
    }

    pub fn encode(&self, burst: &mut [u8; DMR_FRAME_LENGTH_BYTES]) {
        let data = ((self.color_code & 0x0F) << 4) | (self.data_type.into_raw() as u8 & 0x0F);
        let code = golay::encode2087(data);
        for i in 0..10 {
            write_bit(burst, FIRST_HALF + i, (code >> (19 - i)) & 1 == 1);
        }
        for i in 0..10 {
            write_bit(burst, SECOND_HALF + i, (code >> (9 - i)) & 1 == 1);
        }
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SlotType {{ color_code: {:?} data_type: {} }}", self.color_code, self.data_type)
    }
}
