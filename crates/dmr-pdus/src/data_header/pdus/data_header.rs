use core::fmt;

use dmr_core::defines::{DATA_HEADER_CRC_MASK, DMR_FRAME_LENGTH_BYTES};
use dmr_fec::{bptc19696, crc};

use crate::data_header::enums::dpf::Dpf;

/// Format dependent part of a data header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataHeaderBody {
    /// Appended blocks, 1 to 4
    Udt { blocks: u8 },
    Response { blocks: u8 },
    Unconfirmed { full_message: bool, blocks: u8 },
    Confirmed { full_message: bool, blocks: u8, resync: bool, send_seq: u8 },
    DefinedShort { full_message: bool, blocks: u8, resync: bool },
    DefinedRaw { full_message: bool, blocks: u8, resync: bool },
    /// Carries no addressing
    Proprietary,
    /// Reserved DPF values
    Unknown(u8),
}

/// Data header, ETSI TS 102 361-1 Clause 9.2.6.
/// The host only validates and forwards it, so the payload is kept as received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataHeader {
    pub group: bool,
    pub response_requested: bool,
    pub dst_id: u32,
    pub src_id: u32,
    pub body: DataHeaderBody,
    payload: [u8; 12],
}

fn read_id(bytes: &[u8]) -> u32 {
    (bytes[0] as u32) << 16 | (bytes[1] as u32) << 8 | bytes[2] as u32
}

impl DataHeader {
    /// Parses a 12-byte payload whose CRC has already been checked
    pub fn from_bytes(payload: &[u8; 12]) -> Self {
        let group = payload[0] & 0x80 != 0;
        let response_requested = payload[0] & 0x40 != 0;
        let dpf = payload[0] & 0x0F;

        let f_last = payload[8] & 0x80 != 0;
        let blocks_7 = payload[8] & 0x7F;
        let body = match Dpf::try_from(dpf as u64) {
            Ok(Dpf::Udt) => DataHeaderBody::Udt { blocks: (payload[8] & 0x03) + 1 },
            Ok(Dpf::Response) => DataHeaderBody::Response { blocks: blocks_7 },
            Ok(Dpf::Unconfirmed) => DataHeaderBody::Unconfirmed { full_message: f_last, blocks: blocks_7 },
            Ok(Dpf::Confirmed) => DataHeaderBody::Confirmed {
                full_message: f_last,
                blocks: blocks_7,
                resync: payload[9] & 0x80 != 0,
                send_seq: (payload[9] >> 4) & 0x07,
            },
            Ok(dpf @ (Dpf::DefinedShort | Dpf::DefinedRaw)) => {
                let blocks = (payload[0] & 0x30) + (payload[1] & 0x0F);
                let full_message = payload[8] & 0x01 != 0;
                let resync = payload[8] & 0x02 != 0;
                if dpf == Dpf::DefinedShort {
                    DataHeaderBody::DefinedShort { full_message, blocks, resync }
                } else {
                    DataHeaderBody::DefinedRaw { full_message, blocks, resync }
                }
            }
            Ok(Dpf::Proprietary) => DataHeaderBody::Proprietary,
            Err(()) => DataHeaderBody::Unknown(dpf),
        };

        let (dst_id, src_id) = match body {
            DataHeaderBody::Proprietary => (0, 0),
            _ => (read_id(&payload[2..5]), read_id(&payload[5..8])),
        };

        DataHeader { group, response_requested, dst_id, src_id, body, payload: *payload }
    }

    /// Lays out a new header. Used to originate data, the relay path keeps received bytes.
    pub fn new(group: bool, response_requested: bool, dst_id: u32, src_id: u32, body: DataHeaderBody) -> Self {
        let mut p = [0u8; 12];
        p[0] = (group as u8) << 7 | (response_requested as u8) << 6;
        match body {
            DataHeaderBody::Udt { blocks } => {
                p[0] |= Dpf::Udt.into_raw() as u8;
                p[8] = blocks.saturating_sub(1) & 0x03;
            }
            DataHeaderBody::Response { blocks } => {
                p[0] |= Dpf::Response.into_raw() as u8;
                p[8] = blocks & 0x7F;
            }
            DataHeaderBody::Unconfirmed { full_message, blocks } => {
                p[0] |= Dpf::Unconfirmed.into_raw() as u8;
                p[8] = (full_message as u8) << 7 | (blocks & 0x7F);
            }
            DataHeaderBody::Confirmed { full_message, blocks, resync, send_seq } => {
                p[0] |= Dpf::Confirmed.into_raw() as u8;
                p[8] = (full_message as u8) << 7 | (blocks & 0x7F);
                p[9] = (resync as u8) << 7 | (send_seq & 0x07) << 4;
            }
            DataHeaderBody::DefinedShort { full_message, blocks, resync }
            | DataHeaderBody::DefinedRaw { full_message, blocks, resync } => {
                let dpf = if matches!(body, DataHeaderBody::DefinedShort { .. }) { Dpf::DefinedShort } else { Dpf::DefinedRaw };
                p[0] |= dpf.into_raw() as u8 | (blocks & 0x30);
                p[1] = blocks & 0x0F;
                p[8] = (resync as u8) << 1 | full_message as u8;
            }
            DataHeaderBody::Proprietary => p[0] |= Dpf::Proprietary.into_raw() as u8,
            DataHeaderBody::Unknown(dpf) => p[0] |= dpf & 0x0F,
        }
        if body != DataHeaderBody::Proprietary {
            p[2..5].copy_from_slice(&dst_id.to_be_bytes()[1..]);
            p[5..8].copy_from_slice(&src_id.to_be_bytes()[1..]);
        }
        crc::add_ccitt16_masked(&mut p, DATA_HEADER_CRC_MASK);
        Self::from_bytes(&p)
    }

    /// BPTC decode, CRC check and parse
    pub fn decode(burst: &[u8; DMR_FRAME_LENGTH_BYTES]) -> Option<Self> {
        let payload = bptc19696::decode(burst)?;
        if !crc::check_ccitt16_masked(&payload, DATA_HEADER_CRC_MASK) {
            tracing::debug!("data header: CRC failed");
            return None;
        }
        Some(Self::from_bytes(&payload))
    }

    /// Re-emits the payload exactly as received
    pub fn encode(&self, burst: &mut [u8; DMR_FRAME_LENGTH_BYTES]) {
        bptc19696::encode(&self.payload, burst);
    }

    pub fn to_bytes(&self) -> [u8; 12] {
        self.payload
    }

    pub fn dpf(&self) -> Option<Dpf> {
        Dpf::try_from((self.payload[0] & 0x0F) as u64).ok()
    }

    /// Data blocks announced to follow the header
    pub fn blocks(&self) -> u8 {
        match self.body {
            DataHeaderBody::Udt { blocks }
            | DataHeaderBody::Response { blocks }
            | DataHeaderBody::Unconfirmed { blocks, .. }
            | DataHeaderBody::Confirmed { blocks, .. }
            | DataHeaderBody::DefinedShort { blocks, .. }
            | DataHeaderBody::DefinedRaw { blocks, .. } => blocks,
            DataHeaderBody::Proprietary | DataHeaderBody::Unknown(_) => 0,
        }
    }
}

impl fmt::Display for DataHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "DataHeader {{ group: {:?} response_requested: {:?} dst_id: {:?} src_id: {:?} body: {:?} }}",
            self.group, self.response_requested, self.dst_id, self.src_id, self.body
        )
    }
}
