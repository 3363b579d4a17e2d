use core::fmt;

use dmr_core::defines::{DMR_FRAME_LENGTH_BYTES, MODEM_BURST_LEN, Tag};
use dmr_core::{CodecErr, SlotNo, expect_len, expect_value};

use crate::modem::mmdvm_command::MmdvmCommand;

pub const MMDVM_FRAME_START: u8 = 0xE0;
/// Start marker, length, type
pub const MMDVM_HEADER_LEN: usize = 3;

/// One MMDVM host protocol frame: [0xE0, total length, type, payload..]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MmdvmFrame {
    pub command: MmdvmCommand,
    pub payload: Vec<u8>,
}

impl MmdvmFrame {
    pub fn new(command: MmdvmCommand, payload: &[u8]) -> Self {
        MmdvmFrame { command, payload: payload.to_vec() }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let len = MMDVM_HEADER_LEN + self.payload.len();
        debug_assert!(len <= u8::MAX as usize, "MMDVM frame too long");
        let mut buf = Vec::with_capacity(len);
        buf.push(MMDVM_FRAME_START);
        buf.push(len as u8);
        buf.push(self.command.into_raw() as u8);
        buf.extend_from_slice(&self.payload);
        buf
    }

    /// Parses the frame at the front of `buf`. Returns it with the number of bytes consumed,
    /// a datagram may carry several frames back to back.
    pub fn from_bytes(buf: &[u8]) -> Result<(Self, usize), CodecErr> {
        if buf.len() < MMDVM_HEADER_LEN {
            return Err(CodecErr::BufferEnded { field: Some("header") });
        }
        expect_value!(buf[0], MMDVM_FRAME_START, "frame_start")?;
        let len = buf[1] as usize;
        if len < MMDVM_HEADER_LEN {
            return Err(CodecErr::InvalidValue { field: "length", value: len as u64 });
        }
        if buf.len() < len {
            return Err(CodecErr::BufferEnded { field: Some("payload") });
        }
        let command = MmdvmCommand::try_from(buf[2] as u64).map_err(|_| CodecErr::Unsupported { field: "command", value: buf[2] as u64 })?;
        Ok((MmdvmFrame::new(command, &buf[MMDVM_HEADER_LEN..len]), len))
    }

    /// Converts a received burst frame into the host burst layout
    /// [tag, flags, 33 bytes, (rssi hi, rssi lo)] and the slot it arrived on
    pub fn to_dmr_burst(&self) -> Result<(SlotNo, Vec<u8>), CodecErr> {
        match self.command {
            MmdvmCommand::DmrData1 | MmdvmCommand::DmrData2 => {
                let len = self.payload.len();
                if len != DMR_FRAME_LENGTH_BYTES + 1 && len != DMR_FRAME_LENGTH_BYTES + 3 {
                    return Err(CodecErr::InconsistentLength { expected: DMR_FRAME_LENGTH_BYTES + 1, found: len });
                }
                let mut burst = Vec::with_capacity(len + 1);
                burst.push(Tag::Data.into_raw() as u8);
                burst.extend_from_slice(&self.payload);
                Ok((if self.command == MmdvmCommand::DmrData1 { 1 } else { 2 }, burst))
            }
            MmdvmCommand::DmrLost1 => Ok((1, vec![Tag::Lost.into_raw() as u8])),
            MmdvmCommand::DmrLost2 => Ok((2, vec![Tag::Lost.into_raw() as u8])),
            other => Err(CodecErr::InvalidType { expected: MmdvmCommand::DmrData1.into_raw(), found: other.into_raw() }),
        }
    }

    /// Wraps a queued burst [tag, flags, 33 bytes] for transmission; the tag stays on the host
    pub fn from_dmr_burst(slot: SlotNo, burst: &[u8]) -> Result<Self, CodecErr> {
        let command = MmdvmCommand::dmr_data(slot).ok_or(CodecErr::InvalidValue { field: "slot", value: slot as u64 })?;
        expect_len!(burst, MODEM_BURST_LEN)?;
        Ok(MmdvmFrame::new(command, &burst[1..]))
    }

    pub fn short_lc(lc: &[u8; 9]) -> Self {
        MmdvmFrame::new(MmdvmCommand::DmrShortLc, lc)
    }

    pub fn start(tx: bool) -> Self {
        MmdvmFrame::new(MmdvmCommand::DmrStart, &[tx as u8])
    }

    pub fn abort(slot: SlotNo) -> Self {
        MmdvmFrame::new(MmdvmCommand::DmrAbort, &[slot])
    }
}

impl fmt::Display for MmdvmFrame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "MmdvmFrame {{ command: {} payload_len: {} }}", self.command, self.payload.len())
    }
}
