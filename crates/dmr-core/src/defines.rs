//! Air-interface constants shared by the codecs and the call state machine.
//! Byte offsets are into a 33-byte (264-bit) DMR burst.

pub const DMR_FRAME_LENGTH_BITS: usize = 264;
pub const DMR_FRAME_LENGTH_BYTES: usize = 33;

/// Burst as exchanged with the modem: tag, flags, burst
pub const MODEM_BURST_LEN: usize = DMR_FRAME_LENGTH_BYTES + 2;
/// Same, with the two trailing raw RSSI bytes
pub const MODEM_BURST_LEN_RSSI: usize = MODEM_BURST_LEN + 2;

pub const DMR_SYNC_LENGTH_BYTES: usize = 7;
/// Offset of the sync / EMB / embedded signalling centre
pub const DMR_SYNC_OFFSET: usize = 13;

/// Duration of one burst on a slot, in ms
pub const DMR_SLOT_TIME: u32 = 60;
/// Number of AMBE frames carried per voice burst
pub const AMBE_PER_SLOT: u32 = 3;
/// Correctable bits per voice burst, used for bit error rate percentages
pub const VOICE_FEC_BITS_PER_BURST: u32 = 141;
pub const VOICE_SYNC_FEC_BITS_PER_BURST: u32 = 141;

pub const BS_SOURCED_AUDIO_SYNC: [u8; 7] = [0x07, 0x55, 0xFD, 0x7D, 0xF7, 0x5F, 0x70];
pub const BS_SOURCED_DATA_SYNC: [u8; 7] = [0x0D, 0xFF, 0x57, 0xD7, 0x5D, 0xF5, 0xD0];
pub const MS_SOURCED_AUDIO_SYNC: [u8; 7] = [0x07, 0xF7, 0xD5, 0xDD, 0x57, 0xDF, 0xD0];
pub const MS_SOURCED_DATA_SYNC: [u8; 7] = [0x0D, 0x5D, 0x7F, 0x77, 0xFD, 0x75, 0x70];
pub const DIRECT_SLOT1_AUDIO_SYNC: [u8; 7] = [0x05, 0xD5, 0x77, 0xF7, 0x75, 0x7F, 0xF0];
pub const DIRECT_SLOT1_DATA_SYNC: [u8; 7] = [0x0F, 0x7F, 0xDD, 0x5D, 0xDF, 0xD5, 0x50];
pub const DIRECT_SLOT2_AUDIO_SYNC: [u8; 7] = [0x07, 0xDF, 0xFD, 0x5F, 0x55, 0xD5, 0xF0];
pub const DIRECT_SLOT2_DATA_SYNC: [u8; 7] = [0x0D, 0x75, 0x57, 0xF5, 0xFF, 0x7F, 0x50];
pub const SYNC_MASK: [u8; 7] = [0x0F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xF0];

/// PR FILL payload with BS data sync. The slot type is left zero, senders fill in
/// their colour code and DataType::Idle.
pub const DMR_IDLE_DATA: [u8; DMR_FRAME_LENGTH_BYTES] = [
    0x53, 0xC2, 0x5E, 0xAB, 0xA8, 0x67, 0x1D, 0xC7, 0x38, 0x3B, 0xD9, 0x36, 0x00, 0x0D, 0xFF, 0x57, 0xD7, 0x5D, 0xF5, 0xD0,
    0x03, 0xF6, 0xE4, 0x65, 0x17, 0x1B, 0x48, 0xCA, 0x6D, 0x4F, 0xC6, 0x10, 0xB4,
];

/// Three AMBE silence frames around a zeroed embedded signalling field
pub const DMR_SILENCE_DATA: [u8; DMR_FRAME_LENGTH_BYTES] = [
    0xB9, 0xE8, 0x81, 0x52, 0x61, 0x73, 0x00, 0x2A, 0x6B, 0xB9, 0xE8, 0x81, 0x52, 0x60, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
    0x73, 0x00, 0x2A, 0x6B, 0xB9, 0xE8, 0x81, 0x52, 0x61, 0x73, 0x00, 0x2A, 0x6B,
];

pub const VOICE_LC_HEADER_CRC_MASK: [u8; 3] = [0x96, 0x96, 0x96];
pub const TERMINATOR_WITH_LC_CRC_MASK: [u8; 3] = [0x99, 0x99, 0x99];
pub const PI_HEADER_CRC_MASK: [u8; 2] = [0x69, 0x69];
pub const DATA_HEADER_CRC_MASK: [u8; 2] = [0xCC, 0xCC];
pub const CSBK_CRC_MASK: [u8; 2] = [0xA5, 0xA5];

/// Modem burst flag bits
pub const DMR_IDLE_RX: u8 = 0x80;
pub const DMR_SYNC_DATA: u8 = 0x40;
pub const DMR_SYNC_AUDIO: u8 = 0x20;
pub const DT_MASK: u8 = 0x0F;

pub const FID_ETSI: u8 = 0;
pub const FID_DMRA: u8 = 16;

/// Talkgroup used for "all call" in id displays
pub const ID_ALL_CALL: u32 = 0xFFFFFF;

/// Tag byte leading every burst between the modem and the host
/// Bits: 8
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    Header = 0,
    Data = 1,
    Lost = 2,
    Eot = 3,
}

impl std::convert::TryFrom<u64> for Tag {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            0 => Ok(Tag::Header),
            1 => Ok(Tag::Data),
            2 => Ok(Tag::Lost),
            3 => Ok(Tag::Eot),
            _ => Err(()),
        }
    }
}

impl Tag {
    pub fn into_raw(self) -> u64 {
        self as u64
    }
}

/// Slot type data type, ETSI TS 102 361-1 Table 6.1,
/// extended with the two voice pseudo types used between host components
/// Bits: 4 (8 for the pseudo types)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    VoicePiHeader = 0x00,
    VoiceLcHeader = 0x01,
    TerminatorWithLc = 0x02,
    Csbk = 0x03,
    MbcHeader = 0x04,
    MbcContinuation = 0x05,
    DataHeader = 0x06,
    Rate12Data = 0x07,
    Rate34Data = 0x08,
    Idle = 0x09,
    Rate1Data = 0x0A,
    VoiceSync = 0xF0,
    Voice = 0xF1,
}

impl std::convert::TryFrom<u64> for DataType {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            0x00 => Ok(DataType::VoicePiHeader),
            0x01 => Ok(DataType::VoiceLcHeader),
            0x02 => Ok(DataType::TerminatorWithLc),
            0x03 => Ok(DataType::Csbk),
            0x04 => Ok(DataType::MbcHeader),
            0x05 => Ok(DataType::MbcContinuation),
            0x06 => Ok(DataType::DataHeader),
            0x07 => Ok(DataType::Rate12Data),
            0x08 => Ok(DataType::Rate34Data),
            0x09 => Ok(DataType::Idle),
            0x0A => Ok(DataType::Rate1Data),
            0xF0 => Ok(DataType::VoiceSync),
            0xF1 => Ok(DataType::Voice),
            _ => Err(()),
        }
    }
}

impl DataType {
    pub fn into_raw(self) -> u64 {
        self as u64
    }

    /// True for the types carried in a data-sync burst with a slot type field
    pub fn has_slot_type(self) -> bool {
        !matches!(self, DataType::VoiceSync | DataType::Voice)
    }
}

impl From<DataType> for u64 {
    fn from(e: DataType) -> Self {
        e.into_raw()
    }
}

impl core::fmt::Display for DataType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            DataType::VoicePiHeader => "PI Header",
            DataType::VoiceLcHeader => "Voice LC Header",
            DataType::TerminatorWithLc => "Terminator with LC",
            DataType::Csbk => "CSBK",
            DataType::MbcHeader => "MBC Header",
            DataType::MbcContinuation => "MBC Continuation",
            DataType::DataHeader => "Data Header",
            DataType::Rate12Data => "Rate 1/2 Data",
            DataType::Rate34Data => "Rate 3/4 Data",
            DataType::Idle => "Idle",
            DataType::Rate1Data => "Rate 1 Data",
            DataType::VoiceSync => "Voice Sync",
            DataType::Voice => "Voice",
        };
        write!(f, "{}", s)
    }
}

/// Full Link Control Opcode, ETSI TS 102 361-2 Clause 7.1.1
/// Bits: 6
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flco {
    Group,
    UserUser,
    TalkerAliasHeader,
    TalkerAliasBlock1,
    TalkerAliasBlock2,
    TalkerAliasBlock3,
    GpsInfo,
    /// Opcodes this host does not interpret, carried through unchanged
    Unknown(u8),
}

impl Flco {
    pub fn from_raw(x: u8) -> Self {
        match x & 0x3F {
            0 => Flco::Group,
            3 => Flco::UserUser,
            4 => Flco::TalkerAliasHeader,
            5 => Flco::TalkerAliasBlock1,
            6 => Flco::TalkerAliasBlock2,
            7 => Flco::TalkerAliasBlock3,
            8 => Flco::GpsInfo,
            other => Flco::Unknown(other),
        }
    }

    pub fn into_raw(self) -> u8 {
        match self {
            Flco::Group => 0,
            Flco::UserUser => 3,
            Flco::TalkerAliasHeader => 4,
            Flco::TalkerAliasBlock1 => 5,
            Flco::TalkerAliasBlock2 => 6,
            Flco::TalkerAliasBlock3 => 7,
            Flco::GpsInfo => 8,
            Flco::Unknown(x) => x & 0x3F,
        }
    }

    /// Group and individual voice calls, the only kinds routed as calls
    pub fn is_call(self) -> bool {
        matches!(self, Flco::Group | Flco::UserUser)
    }

    pub fn is_talker_alias(self) -> bool {
        matches!(
            self,
            Flco::TalkerAliasHeader | Flco::TalkerAliasBlock1 | Flco::TalkerAliasBlock2 | Flco::TalkerAliasBlock3
        )
    }
}

impl core::fmt::Display for Flco {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Flco::Group => write!(f, "group"),
            Flco::UserUser => write!(f, "private"),
            Flco::TalkerAliasHeader => write!(f, "talker alias header"),
            Flco::TalkerAliasBlock1 => write!(f, "talker alias block 1"),
            Flco::TalkerAliasBlock2 => write!(f, "talker alias block 2"),
            Flco::TalkerAliasBlock3 => write!(f, "talker alias block 3"),
            Flco::GpsInfo => write!(f, "GPS info"),
            Flco::Unknown(x) => write!(f, "FLCO 0x{:02X}", x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_raw() {
        for raw in 0u64..=0x0A {
            let dt = DataType::try_from(raw).unwrap();
            assert_eq!(dt.into_raw(), raw);
            assert!(dt.has_slot_type());
        }
        assert!(DataType::try_from(0x0Bu64).is_err());
        assert_eq!(DataType::try_from(0xF0u64), Ok(DataType::VoiceSync));
        assert!(!DataType::Voice.has_slot_type());
    }

    #[test]
    fn test_flco_raw() {
        assert_eq!(Flco::from_raw(0x80), Flco::Group);
        assert_eq!(Flco::from_raw(3), Flco::UserUser);
        assert_eq!(Flco::from_raw(0x30), Flco::Unknown(0x30));
        assert_eq!(Flco::Unknown(0x30).into_raw(), 0x30);
        assert!(Flco::TalkerAliasBlock2.is_talker_alias());
        assert!(!Flco::GpsInfo.is_call());
    }
}
