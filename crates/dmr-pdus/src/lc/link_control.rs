use core::fmt;

use dmr_core::defines::{FID_ETSI, Flco};
use dmr_core::{BitBuffer, CodecErr, let_field};

/// Service options bit signalling Open Voice Channel Mode
const OPTIONS_OVCM: u8 = 0x04;

/// Link Control payload, ETSI TS 102 361-2 Clause 7.1.1.
/// Carried in full by voice LC headers and terminators (RS(12,9) protected) and
/// spread over four voice bursts as embedded LC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lc {
    /// 1 bit, protect flag
    pub pf: bool,
    /// 1 bit, reserved
    pub reserved: bool,
    /// 6 bits
    pub flco: Flco,
    /// 8 bits, feature set id
    pub fid: u8,
    /// 8 bits, service options
    pub options: u8,
    /// 24 bits
    pub dst_id: u32,
    /// 24 bits
    pub src_id: u32,
}

impl Lc {
    pub fn new(flco: Flco, src_id: u32, dst_id: u32) -> Self {
        Lc { pf: false, reserved: false, flco, fid: FID_ETSI, options: 0, dst_id, src_id }
    }

    pub fn from_bitbuf(buffer: &mut BitBuffer) -> Result<Self, CodecErr> {
        let pf = buffer.read_bool("pf")?;
        let reserved = buffer.read_bool("reserved")?;
        let_field!(buffer, flco, 6);
        let_field!(buffer, fid, 8);
        let_field!(buffer, options, 8);
        let_field!(buffer, dst_id, 24);
        let_field!(buffer, src_id, 24);

        Ok(Lc {
            pf,
            reserved,
            flco: Flco::from_raw(flco as u8),
            fid: fid as u8,
            options: options as u8,
            dst_id: dst_id as u32,
            src_id: src_id as u32,
        })
    }

    pub fn to_bitbuf(&self, buffer: &mut BitBuffer) {
        buffer.write_bool(self.pf);
        buffer.write_bool(self.reserved);
        buffer.write_bits(self.flco.into_raw() as u64, 6);
        buffer.write_bits(self.fid as u64, 8);
        buffer.write_bits(self.options as u64, 8);
        buffer.write_bits((self.dst_id & 0xFFFFFF) as u64, 24);
        buffer.write_bits((self.src_id & 0xFFFFFF) as u64, 24);
    }

    pub fn from_bytes(bytes: &[u8; 9]) -> Result<Self, CodecErr> {
        Self::from_bitbuf(&mut BitBuffer::from_bytes(bytes))
    }

    pub fn to_bytes(&self) -> [u8; 9] {
        let mut buffer = BitBuffer::new(72);
        self.to_bitbuf(&mut buffer);
        let mut bytes = [0u8; 9];
        bytes.copy_from_slice(buffer.as_bytes());
        bytes
    }

    pub fn ovcm(&self) -> bool {
        self.options & OPTIONS_OVCM != 0
    }

    pub fn set_ovcm(&mut self, ovcm: bool) {
        if ovcm {
            self.options |= OPTIONS_OVCM;
        } else {
            self.options &= !OPTIONS_OVCM;
        }
    }

    pub fn is_group(&self) -> bool {
        self.flco == Flco::Group
    }
}

impl fmt::Display for Lc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Lc {{ pf: {:?} flco: {} fid: {:?} options: 0x{:02X} dst_id: {:?} src_id: {:?} }}",
            self.pf, self.flco, self.fid, self.options, self.dst_id, self.src_id
        )
    }
}

#[cfg(test)]
mod tests {
    use dmr_core::debug;

    use super::*;

    #[test]
    fn test_lc_layout() {
        debug::setup_logging_verbose();
        let bytes = [0x83, 0x10, 0x24, 0x00, 0x00, 0x09, 0x12, 0xD6, 0x87];
        let lc = Lc::from_bytes(&bytes).expect("Failed parsing");
        tracing::info!("Parsed: {}", lc);

        assert!(lc.pf);
        assert_eq!(lc.flco, Flco::UserUser);
        assert_eq!(lc.fid, 0x10);
        assert!(lc.ovcm());
        assert_eq!(lc.dst_id, 9);
        assert_eq!(lc.src_id, 1234567);
        assert_eq!(lc.to_bytes(), bytes);
    }

    #[test]
    fn test_ovcm() {
        let mut lc = Lc::new(Flco::Group, 1, 2);
        assert!(!lc.ovcm());
        lc.set_ovcm(true);
        assert_eq!(lc.to_bytes()[2], 0x04);
        lc.set_ovcm(false);
        assert_eq!(lc.options, 0);
    }

    #[test]
    fn test_unknown_flco_kept() {
        let bytes = [0x3E, 0, 0, 0, 0, 1, 0, 0, 2];
        let lc = Lc::from_bytes(&bytes).unwrap();
        assert_eq!(lc.flco, Flco::Unknown(0x3E));
        assert_eq!(lc.to_bytes(), bytes);
    }
}
