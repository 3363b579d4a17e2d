/// MMDVM host protocol frame type, the subset used by a DMR-only host
/// Bits: 8
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MmdvmCommand {
    GetVersion = 0x00,
    GetStatus = 0x01,
    SetConfig = 0x02,
    SetMode = 0x03,
    /// Burst on slot 1, either direction
    DmrData1 = 0x18,
    /// Modem lost sync on slot 1
    DmrLost1 = 0x19,
    DmrData2 = 0x1A,
    DmrLost2 = 0x1B,
    /// Out of band activity summary for the modem display
    DmrShortLc = 0x1C,
    /// Keys the transmitter in duplex mode
    DmrStart = 0x1D,
    /// Flushes the transmit queue of one slot
    DmrAbort = 0x1E,
    Ack = 0x70,
    Nak = 0x7F,
}

impl std::convert::TryFrom<u64> for MmdvmCommand {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            0x00 => Ok(MmdvmCommand::GetVersion),
            0x01 => Ok(MmdvmCommand::GetStatus),
            0x02 => Ok(MmdvmCommand::SetConfig),
            0x03 => Ok(MmdvmCommand::SetMode),
            0x18 => Ok(MmdvmCommand::DmrData1),
            0x19 => Ok(MmdvmCommand::DmrLost1),
            0x1A => Ok(MmdvmCommand::DmrData2),
            0x1B => Ok(MmdvmCommand::DmrLost2),
            0x1C => Ok(MmdvmCommand::DmrShortLc),
            0x1D => Ok(MmdvmCommand::DmrStart),
            0x1E => Ok(MmdvmCommand::DmrAbort),
            0x70 => Ok(MmdvmCommand::Ack),
            0x7F => Ok(MmdvmCommand::Nak),
            _ => Err(()),
        }
    }
}

impl MmdvmCommand {
    /// Convert this enum back into the raw integer value
    pub fn into_raw(self) -> u64 {
        self as u64
    }

    /// Burst frame type for a slot, None for anything but 1 or 2
    pub fn dmr_data(slot: u8) -> Option<Self> {
        match slot {
            1 => Some(MmdvmCommand::DmrData1),
            2 => Some(MmdvmCommand::DmrData2),
            _ => None,
        }
    }

    /// Slot a burst or lost frame belongs to
    pub fn slot(self) -> Option<u8> {
        match self {
            MmdvmCommand::DmrData1 | MmdvmCommand::DmrLost1 => Some(1),
            MmdvmCommand::DmrData2 | MmdvmCommand::DmrLost2 => Some(2),
            _ => None,
        }
    }
}

impl From<MmdvmCommand> for u64 {
    fn from(e: MmdvmCommand) -> Self {
        e.into_raw()
    }
}

impl core::fmt::Display for MmdvmCommand {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MmdvmCommand::GetVersion => write!(f, "GetVersion"),
            MmdvmCommand::GetStatus => write!(f, "GetStatus"),
            MmdvmCommand::SetConfig => write!(f, "SetConfig"),
            MmdvmCommand::SetMode => write!(f, "SetMode"),
            MmdvmCommand::DmrData1 => write!(f, "DmrData1"),
            MmdvmCommand::DmrLost1 => write!(f, "DmrLost1"),
            MmdvmCommand::DmrData2 => write!(f, "DmrData2"),
            MmdvmCommand::DmrLost2 => write!(f, "DmrLost2"),
            MmdvmCommand::DmrShortLc => write!(f, "DmrShortLc"),
            MmdvmCommand::DmrStart => write!(f, "DmrStart"),
            MmdvmCommand::DmrAbort => write!(f, "DmrAbort"),
            MmdvmCommand::Ack => write!(f, "Ack"),
            MmdvmCommand::Nak => write!(f, "Nak"),
        }
    }
}
