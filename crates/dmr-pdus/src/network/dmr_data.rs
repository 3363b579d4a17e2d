use core::fmt;

use dmr_core::defines::{DMR_FRAME_LENGTH_BYTES, DataType, Flco};
use dmr_core::{CodecErr, expect_len};

use crate::network::homebrew::{DMRD_LEN, MAGIC_DMRD};

/// One burst worth of call data exchanged with the network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmrData {
    pub slot_no: u8,
    pub data_type: DataType,
    pub src_id: u32,
    pub dst_id: u32,
    /// Only Group and UserUser travel on the network
    pub flco: Flco,
    /// Voice burst position in the superframe, 0 for sync bursts
    pub n: u8,
    /// Running packet sequence number
    pub seq_no: u8,
    /// Corrected bits in this burst
    pub ber: u8,
    /// Signal strength, dBm as an absolute value, 0 when unknown
    pub rssi: u8,
    pub stream_id: u32,
    pub data: [u8; DMR_FRAME_LENGTH_BYTES],
}

impl DmrData {
    pub fn new(slot_no: u8, data_type: DataType) -> Self {
        DmrData {
            slot_no,
            data_type,
            src_id: 0,
            dst_id: 0,
            flco: Flco::Group,
            n: 0,
            seq_no: 0,
            ber: 0,
            rssi: 0,
            stream_id: 0,
            data: [0; DMR_FRAME_LENGTH_BYTES],
        }
    }

    /// Homebrew DMRD packet: magic(4) seq(1) src(3) dst(3) repeater(4) flags(1)
    /// stream(4) data(33) ber(1) rssi(1)
    pub fn to_dmrd(&self, repeater_id: u32) -> [u8; DMRD_LEN] {
        let mut buf = [0u8; DMRD_LEN];
        buf[0..4].copy_from_slice(MAGIC_DMRD);
        buf[4] = self.seq_no;
        buf[5..8].copy_from_slice(&self.src_id.to_be_bytes()[1..]);
        buf[8..11].copy_from_slice(&self.dst_id.to_be_bytes()[1..]);
        buf[11..15].copy_from_slice(&repeater_id.to_be_bytes());

        let mut flags = if self.slot_no == 2 { 0x80 } else { 0x00 };
        if self.flco != Flco::Group {
            flags |= 0x40;
        }
        flags |= match self.data_type {
            DataType::VoiceSync => 0x10,
            DataType::Voice => self.n & 0x0F,
            dt => 0x20 | (dt.into_raw() as u8 & 0x0F),
        };
        buf[15] = flags;

        buf[16..20].copy_from_slice(&self.stream_id.to_be_bytes());
        buf[20..53].copy_from_slice(&self.data);
        buf[53] = self.ber;
        buf[54] = self.rssi;
        buf
    }

    /// Parses a DMRD packet. Returns the packet and the sending repeater id.
    pub fn from_dmrd(buf: &[u8]) -> Result<(Self, u32), CodecErr> {
        expect_len!(buf, DMRD_LEN)?;
        if &buf[0..4] != MAGIC_DMRD {
            return Err(CodecErr::InvalidMagic { expected: "DMRD" });
        }

        let id24 = |b: &[u8]| (b[0] as u32) << 16 | (b[1] as u32) << 8 | b[2] as u32;
        let flags = buf[15];

        let (data_type, n) = if flags & 0x20 != 0 {
            let raw = flags & 0x0F;
            let dt = DataType::try_from(raw as u64).map_err(|_| CodecErr::InvalidValue { field: "data_type", value: raw as u64 })?;
            (dt, 0)
        } else if flags & 0x10 != 0 {
            (DataType::VoiceSync, 0)
        } else {
            (DataType::Voice, flags & 0x0F)
        };

        let mut data = [0u8; DMR_FRAME_LENGTH_BYTES];
        data.copy_from_slice(&buf[20..53]);

        let packet = DmrData {
            slot_no: if flags & 0x80 != 0 { 2 } else { 1 },
            data_type,
            src_id: id24(&buf[5..8]),
            dst_id: id24(&buf[8..11]),
            flco: if flags & 0x40 != 0 { Flco::UserUser } else { Flco::Group },
            n,
            seq_no: buf[4],
            ber: buf[53],
            rssi: buf[54],
            stream_id: u32::from_be_bytes([buf[16], buf[17], buf[18], buf[19]]),
            data,
        };
        let repeater_id = u32::from_be_bytes([buf[11], buf[12], buf[13], buf[14]]);
        Ok((packet, repeater_id))
    }
}

impl fmt::Display for DmrData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "DmrData {{ slot_no: {:?} data_type: {} src_id: {:?} dst_id: {:?} flco: {} n: {:?} seq_no: {:?} ber: {:?} rssi: {:?} stream_id: 0x{:08X} }}",
            self.slot_no, self.data_type, self.src_id, self.dst_id, self.flco, self.n, self.seq_no, self.ber, self.rssi, self.stream_id
        )
    }
}
