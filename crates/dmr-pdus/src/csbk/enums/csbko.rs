/// CSBK opcode, ETSI TS 102 361-2 Clause 7.2 and the DMRA feature set
/// Bits: 6
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Csbko {
    /// Unit to unit voice service request
    UuVReq = 0x04,
    /// Unit to unit voice service answer response
    UuAnsRsp = 0x05,
    CallAlert = 0x1F,
    CallAlertAck = 0x20,
    RadioCheck = 0x24,
    NackRsp = 0x26,
    CallEmergency = 0x27,
    /// BS outbound activation
    BsDwnAct = 0x38,
    /// Preamble, announces blocks to follow
    PreCcsbk = 0x3D,
}

impl std::convert::TryFrom<u64> for Csbko {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            0x04 => Ok(Csbko::UuVReq),
            0x05 => Ok(Csbko::UuAnsRsp),
            0x1F => Ok(Csbko::CallAlert),
            0x20 => Ok(Csbko::CallAlertAck),
            0x24 => Ok(Csbko::RadioCheck),
            0x26 => Ok(Csbko::NackRsp),
            0x27 => Ok(Csbko::CallEmergency),
            0x38 => Ok(Csbko::BsDwnAct),
            0x3D => Ok(Csbko::PreCcsbk),
            _ => Err(()),
        }
    }
}

impl Csbko {
    /// Convert this enum back into the raw integer value
    pub fn into_raw(self) -> u64 {
        self as u64
    }
}

impl From<Csbko> for u64 {
    fn from(e: Csbko) -> Self {
        e.into_raw()
    }
}

impl core::fmt::Display for Csbko {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Csbko::UuVReq => write!(f, "Unit to Unit Voice Service Request"),
            Csbko::UuAnsRsp => write!(f, "Unit to Unit Voice Service Answer Response"),
            Csbko::CallAlert => write!(f, "Call Alert"),
            Csbko::CallAlertAck => write!(f, "Call Alert ACK"),
            Csbko::RadioCheck => write!(f, "Radio Check"),
            Csbko::NackRsp => write!(f, "Negative ACK Response"),
            Csbko::CallEmergency => write!(f, "Call Emergency"),
            Csbko::BsDwnAct => write!(f, "BS Downlink Activate"),
            Csbko::PreCcsbk => write!(f, "Preamble"),
        }
    }
}
