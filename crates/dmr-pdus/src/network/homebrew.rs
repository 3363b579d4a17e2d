//! Homebrew repeater protocol packets carried over UDP. Only the call data
//! family is spoken here, the peer is a local gateway that needs no login.

use dmr_core::CodecErr;

use crate::network::dmr_data::DmrData;

pub const MAGIC_DMRD: &[u8; 4] = b"DMRD";
pub const MAGIC_DMRA: &[u8; 4] = b"DMRA";
pub const MAGIC_DMRG: &[u8; 4] = b"DMRG";

pub const DMRD_LEN: usize = 55;
pub const DMRA_LEN: usize = 19;
pub const DMRG_LEN: usize = 18;

fn put_header(buf: &mut [u8], magic: &[u8; 4], repeater_id: u32, src_id: u32) {
    buf[0..4].copy_from_slice(magic);
    buf[4..8].copy_from_slice(&repeater_id.to_be_bytes());
    buf[8..11].copy_from_slice(&src_id.to_be_bytes()[1..]);
}

/// Talker alias block forwarding: magic(4) repeater(4) src(3) block(1) payload(7).
/// `raw` is the 9-byte embedded LC, its FLCO/FID pair is dropped.
pub fn build_talker_alias(repeater_id: u32, src_id: u32, block: u8, raw: &[u8; 9]) -> [u8; DMRA_LEN] {
    let mut buf = [0u8; DMRA_LEN];
    put_header(&mut buf, MAGIC_DMRA, repeater_id, src_id);
    buf[11] = block;
    buf[12..19].copy_from_slice(&raw[2..9]);
    buf
}

/// Position report forwarding: magic(4) repeater(4) src(3) payload(7)
pub fn build_radio_position(repeater_id: u32, src_id: u32, raw: &[u8; 9]) -> [u8; DMRG_LEN] {
    let mut buf = [0u8; DMRG_LEN];
    put_header(&mut buf, MAGIC_DMRG, repeater_id, src_id);
    buf[11..18].copy_from_slice(&raw[2..9]);
    buf
}

/// Inbound packets the engine cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HomebrewPacket {
    Data { data: DmrData, repeater_id: u32 },
    /// Anything else the gateway sends (pings, acks), identified by its magic
    Other { magic: [u8; 4] },
}

impl HomebrewPacket {
    pub fn parse(buf: &[u8]) -> Result<Self, CodecErr> {
        if buf.len() < 4 {
            return Err(CodecErr::BufferEnded { field: Some("magic") });
        }
        if &buf[0..4] == MAGIC_DMRD {
            let (data, repeater_id) = DmrData::from_dmrd(buf)?;
            return Ok(HomebrewPacket::Data { data, repeater_id });
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&buf[0..4]);
        Ok(HomebrewPacket::Other { magic })
    }
}

#[cfg(test)]
mod tests {
    use dmr_core::defines::DataType;

    use super::*;

    const RAW: [u8; 9] = [0x04, 0x00, 1, 2, 3, 4, 5, 6, 7];

    #[test]
    fn test_talker_alias_packet() {
        let buf = build_talker_alias(0x01020304, 2345678, 0, &RAW);
        assert_eq!(&buf[0..4], b"DMRA");
        assert_eq!(&buf[4..8], &[1, 2, 3, 4]);
        assert_eq!(&buf[8..11], &[0x23, 0xCA, 0xCE]);
        assert_eq!(buf[11], 0);
        assert_eq!(&buf[12..], &[1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_radio_position_packet() {
        let buf = build_radio_position(7, 1, &RAW);
        assert_eq!(buf.len(), 18);
        assert_eq!(&buf[0..4], b"DMRG");
        assert_eq!(&buf[8..11], &[0, 0, 1]);
        assert_eq!(&buf[11..], &[1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_parse() {
        let data = DmrData::new(1, DataType::Csbk);
        let buf = data.to_dmrd(99);
        assert_eq!(HomebrewPacket::parse(&buf), Ok(HomebrewPacket::Data { data, repeater_id: 99 }));
        assert_eq!(HomebrewPacket::parse(b"MSTPONG1234"), Ok(HomebrewPacket::Other { magic: *b"MSTP" }));
        assert!(HomebrewPacket::parse(b"DM").is_err());
        assert!(HomebrewPacket::parse(&buf[..30]).is_err());
    }
}
