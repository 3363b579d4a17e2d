/// Data packet format, ETSI TS 102 361-1 Clause 9.3.1
/// Bits: 4
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Dpf {
    /// Unified data transport
    Udt = 0,
    Response = 1,
    Unconfirmed = 2,
    Confirmed = 3,
    DefinedShort = 13,
    DefinedRaw = 14,
    Proprietary = 15,
}

impl std::convert::TryFrom<u64> for Dpf {
    type Error = ();
    fn try_from(x: u64) -> Result<Self, Self::Error> {
        match x {
            0 => Ok(Dpf::Udt),
            1 => Ok(Dpf::Response),
            2 => Ok(Dpf::Unconfirmed),
            3 => Ok(Dpf::Confirmed),
            13 => Ok(Dpf::DefinedShort),
            14 => Ok(Dpf::DefinedRaw),
            15 => Ok(Dpf::Proprietary),
            _ => Err(()),
        }
    }
}

impl Dpf {
    /// Convert this enum back into the raw integer value
    pub fn into_raw(self) -> u64 {
        self as u64
    }
}

impl From<Dpf> for u64 {
    fn from(e: Dpf) -> Self {
        e.into_raw()
    }
}

impl core::fmt::Display for Dpf {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Dpf::Udt => write!(f, "Unified Data Transport"),
            Dpf::Response => write!(f, "Response"),
            Dpf::Unconfirmed => write!(f, "Unconfirmed Data"),
            Dpf::Confirmed => write!(f, "Confirmed Data"),
            Dpf::DefinedShort => write!(f, "Defined Short Data"),
            Dpf::DefinedRaw => write!(f, "Defined Raw Data"),
            Dpf::Proprietary => write!(f, "Proprietary"),
        }
    }
}
