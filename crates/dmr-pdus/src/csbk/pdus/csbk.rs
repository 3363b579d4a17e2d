use core::fmt;

use dmr_core::defines::{CSBK_CRC_MASK, DMR_FRAME_LENGTH_BYTES};
use dmr_fec::{bptc19696, crc};

use crate::csbk::enums::csbko::Csbko;

/// Opcode dependent part of a CSBK. Ids are 24 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsbkBody {
    BsDownlinkActivate { bs_id: u32, src_id: u32 },
    UnitToUnitRequest { dst_id: u32, src_id: u32, ovcm: bool },
    UnitToUnitAnswer { dst_id: u32, src_id: u32, ovcm: bool },
    Preamble { group: bool, data_content: bool, cbf: u8, dst_id: u32, src_id: u32 },
    /// Sent by the target, ids are in reverse order on air
    NegativeAck { src_id: u32, dst_id: u32 },
    CallAlert { group: bool, data_content: bool, cbf: u8, dst_id: u32, src_id: u32 },
    CallAlertAck { group: bool, data_content: bool, cbf: u8, dst_id: u32, src_id: u32 },
    /// A request carries 0x80 in byte 3 and dst before src, an acknowledgement the reverse
    RadioCheck { request: bool, dst_id: u32, src_id: u32 },
    CallEmergency { group: bool, data_content: bool, cbf: u8, dst_id: u32, src_id: u32 },
    /// Opcodes the host passes through without interpreting
    Unhandled { opcode: u8, raw: [u8; 12] },
}

/// Control Signalling Block, ETSI TS 102 361-2 Clause 7.2.
/// 10 bytes plus a CRC-CCITT16 masked with 0xA5A5, BPTC(196,96) coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Csbk {
    /// 1 bit
    pub last_block: bool,
    /// 1 bit
    pub protect_flag: bool,
    /// 8 bits, feature set id
    pub fid: u8,
    pub body: CsbkBody,
    /// Payload as received. Bits no body variant models are re-emitted from here.
    payload: [u8; 12],
}

fn read_id(bytes: &[u8]) -> u32 {
    (bytes[0] as u32) << 16 | (bytes[1] as u32) << 8 | bytes[2] as u32
}

fn write_id(bytes: &mut [u8], id: u32) {
    bytes[0] = (id >> 16) as u8;
    bytes[1] = (id >> 8) as u8;
    bytes[2] = id as u8;
}

fn set_flag(byte: &mut u8, mask: u8, value: bool) {
    if value {
        *byte |= mask;
    } else {
        *byte &= !mask;
    }
}

impl Csbk {
    pub fn new(body: CsbkBody) -> Self {
        let mut csbk = Csbk { last_block: true, protect_flag: false, fid: 0, body, payload: [0; 12] };
        csbk.payload = csbk.to_bytes();
        csbk
    }

    /// Parses a 12-byte payload whose CRC has already been checked
    pub fn from_bytes(payload: &[u8; 12]) -> Self {
        let opcode = payload[0] & 0x3F;
        let group = payload[2] & 0x40 != 0;
        let data_content = payload[2] & 0x80 != 0;
        let cbf = payload[3];
        let first = read_id(&payload[4..7]);
        let second = read_id(&payload[7..10]);

        let body = match Csbko::try_from(opcode as u64) {
            Ok(Csbko::BsDwnAct) => CsbkBody::BsDownlinkActivate { bs_id: first, src_id: second },
            Ok(Csbko::UuVReq) => CsbkBody::UnitToUnitRequest { dst_id: first, src_id: second, ovcm: payload[2] & 0x04 != 0 },
            Ok(Csbko::UuAnsRsp) => CsbkBody::UnitToUnitAnswer { dst_id: first, src_id: second, ovcm: payload[2] & 0x04 != 0 },
            Ok(Csbko::PreCcsbk) => CsbkBody::Preamble { group, data_content, cbf, dst_id: first, src_id: second },
            Ok(Csbko::NackRsp) => CsbkBody::NegativeAck { src_id: first, dst_id: second },
            Ok(Csbko::CallAlert) => CsbkBody::CallAlert { group, data_content, cbf, dst_id: first, src_id: second },
            Ok(Csbko::CallAlertAck) => CsbkBody::CallAlertAck { group, data_content, cbf, dst_id: first, src_id: second },
            Ok(Csbko::CallEmergency) => CsbkBody::CallEmergency { group, data_content, cbf, dst_id: first, src_id: second },
            Ok(Csbko::RadioCheck) => {
                if cbf == 0x80 {
                    CsbkBody::RadioCheck { request: true, dst_id: first, src_id: second }
                } else {
                    CsbkBody::RadioCheck { request: false, src_id: first, dst_id: second }
                }
            }
            Err(()) => CsbkBody::Unhandled { opcode, raw: *payload },
        };

        Csbk {
            last_block: payload[0] & 0x80 != 0,
            protect_flag: payload[0] & 0x40 != 0,
            fid: payload[1],
            body,
            payload: *payload,
        }
    }

    /// Serializes into 12 bytes with a fresh masked CRC
    pub fn to_bytes(&self) -> [u8; 12] {
        let mut p = match self.body {
            CsbkBody::Unhandled { raw, .. } => raw,
            _ => self.payload,
        };

        p[0] = (self.last_block as u8) << 7 | (self.protect_flag as u8) << 6 | self.opcode();
        p[1] = self.fid;

        match self.body {
            CsbkBody::BsDownlinkActivate { bs_id, src_id } => {
                write_id(&mut p[4..7], bs_id);
                write_id(&mut p[7..10], src_id);
            }
            CsbkBody::UnitToUnitRequest { dst_id, src_id, ovcm } | CsbkBody::UnitToUnitAnswer { dst_id, src_id, ovcm } => {
                set_flag(&mut p[2], 0x04, ovcm);
                write_id(&mut p[4..7], dst_id);
                write_id(&mut p[7..10], src_id);
            }
            CsbkBody::Preamble { group, data_content, cbf, dst_id, src_id }
            | CsbkBody::CallAlert { group, data_content, cbf, dst_id, src_id }
            | CsbkBody::CallAlertAck { group, data_content, cbf, dst_id, src_id }
            | CsbkBody::CallEmergency { group, data_content, cbf, dst_id, src_id } => {
                set_flag(&mut p[2], 0x40, group);
                set_flag(&mut p[2], 0x80, data_content);
                p[3] = cbf;
                write_id(&mut p[4..7], dst_id);
                write_id(&mut p[7..10], src_id);
            }
            CsbkBody::NegativeAck { src_id, dst_id } => {
                write_id(&mut p[4..7], src_id);
                write_id(&mut p[7..10], dst_id);
            }
            CsbkBody::RadioCheck { request: true, dst_id, src_id } => {
                p[3] = 0x80;
                write_id(&mut p[4..7], dst_id);
                write_id(&mut p[7..10], src_id);
            }
            CsbkBody::RadioCheck { request: false, dst_id, src_id } => {
                if p[3] == 0x80 {
                    p[3] = 0;
                }
                write_id(&mut p[4..7], src_id);
                write_id(&mut p[7..10], dst_id);
            }
            CsbkBody::Unhandled { .. } => {}
        }

        crc::add_ccitt16_masked(&mut p, CSBK_CRC_MASK);
        p
    }

    /// BPTC decode, CRC check and parse. Unknown opcodes are accepted as Unhandled.
    pub fn decode(burst: &[u8; DMR_FRAME_LENGTH_BYTES]) -> Option<Self> {
        let payload = bptc19696::decode(burst)?;
        if !crc::check_ccitt16_masked(&payload, CSBK_CRC_MASK) {
            tracing::debug!("csbk: CRC failed");
            return None;
        }
        let csbk = Self::from_bytes(&payload);
        if let CsbkBody::Unhandled { opcode, .. } = csbk.body {
            tracing::warn!("csbk: unhandled opcode 0x{:02X}", opcode);
        }
        Some(csbk)
    }

    pub fn encode(&self, burst: &mut [u8; DMR_FRAME_LENGTH_BYTES]) {
        bptc19696::encode(&self.to_bytes(), burst);
    }

    pub fn opcode(&self) -> u8 {
        match self.body {
            CsbkBody::BsDownlinkActivate { .. } => Csbko::BsDwnAct.into_raw() as u8,
            CsbkBody::UnitToUnitRequest { .. } => Csbko::UuVReq.into_raw() as u8,
            CsbkBody::UnitToUnitAnswer { .. } => Csbko::UuAnsRsp.into_raw() as u8,
            CsbkBody::Preamble { .. } => Csbko::PreCcsbk.into_raw() as u8,
            CsbkBody::NegativeAck { .. } => Csbko::NackRsp.into_raw() as u8,
            CsbkBody::CallAlert { .. } => Csbko::CallAlert.into_raw() as u8,
            CsbkBody::CallAlertAck { .. } => Csbko::CallAlertAck.into_raw() as u8,
            CsbkBody::RadioCheck { .. } => Csbko::RadioCheck.into_raw() as u8,
            CsbkBody::CallEmergency { .. } => Csbko::CallEmergency.into_raw() as u8,
            CsbkBody::Unhandled { opcode, .. } => opcode & 0x3F,
        }
    }

    pub fn csbko(&self) -> Option<Csbko> {
        Csbko::try_from(self.opcode() as u64).ok()
    }

    /// Source id, 0 where the opcode has none
    pub fn src_id(&self) -> u32 {
        match self.body {
            CsbkBody::BsDownlinkActivate { src_id, .. }
            | CsbkBody::UnitToUnitRequest { src_id, .. }
            | CsbkBody::UnitToUnitAnswer { src_id, .. }
            | CsbkBody::Preamble { src_id, .. }
            | CsbkBody::NegativeAck { src_id, .. }
            | CsbkBody::CallAlert { src_id, .. }
            | CsbkBody::CallAlertAck { src_id, .. }
            | CsbkBody::RadioCheck { src_id, .. }
            | CsbkBody::CallEmergency { src_id, .. } => src_id,
            CsbkBody::Unhandled { .. } => 0,
        }
    }

    /// Destination id, 0 where the opcode has none
    pub fn dst_id(&self) -> u32 {
        match self.body {
            CsbkBody::UnitToUnitRequest { dst_id, .. }
            | CsbkBody::UnitToUnitAnswer { dst_id, .. }
            | CsbkBody::Preamble { dst_id, .. }
            | CsbkBody::NegativeAck { dst_id, .. }
            | CsbkBody::CallAlert { dst_id, .. }
            | CsbkBody::CallAlertAck { dst_id, .. }
            | CsbkBody::RadioCheck { dst_id, .. }
            | CsbkBody::CallEmergency { dst_id, .. } => dst_id,
            CsbkBody::BsDownlinkActivate { .. } | CsbkBody::Unhandled { .. } => 0,
        }
    }

    pub fn is_group(&self) -> bool {
        match self.body {
            CsbkBody::Preamble { group, .. }
            | CsbkBody::CallAlert { group, .. }
            | CsbkBody::CallAlertAck { group, .. }
            | CsbkBody::CallEmergency { group, .. } => group,
            _ => false,
        }
    }

    pub fn data_content(&self) -> bool {
        match self.body {
            CsbkBody::Preamble { data_content, .. }
            | CsbkBody::CallAlert { data_content, .. }
            | CsbkBody::CallAlertAck { data_content, .. }
            | CsbkBody::CallEmergency { data_content, .. } => data_content,
            _ => false,
        }
    }

    /// CSBK blocks to follow
    pub fn cbf(&self) -> u8 {
        match self.body {
            CsbkBody::Preamble { cbf, .. }
            | CsbkBody::CallAlert { cbf, .. }
            | CsbkBody::CallAlertAck { cbf, .. }
            | CsbkBody::CallEmergency { cbf, .. } => cbf,
            _ => 0,
        }
    }

    pub fn set_cbf(&mut self, value: u8) {
        match &mut self.body {
            CsbkBody::Preamble { cbf, .. }
            | CsbkBody::CallAlert { cbf, .. }
            | CsbkBody::CallAlertAck { cbf, .. }
            | CsbkBody::CallEmergency { cbf, .. } => *cbf = value,
            _ => {}
        }
    }

    /// Only unit to unit request and answer carry the OVCM bit
    pub fn set_ovcm(&mut self, value: bool) {
        match &mut self.body {
            CsbkBody::UnitToUnitRequest { ovcm, .. } | CsbkBody::UnitToUnitAnswer { ovcm, .. } => *ovcm = value,
            _ => {}
        }
    }

    pub fn ovcm(&self) -> bool {
        matches!(
            self.body,
            CsbkBody::UnitToUnitRequest { ovcm: true, .. } | CsbkBody::UnitToUnitAnswer { ovcm: true, .. }
        )
    }
}

impl fmt::Display for Csbk {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Csbk {{ last_block: {:?} protect_flag: {:?} fid: {:?} body: {:?} }}",
            self.last_block, self.protect_flag, self.fid, self.body
        )
    }
}

#[cfg(test)]
mod tests {
    use dmr_core::debug;

    use super::*;

    fn through_air(csbk: &Csbk) -> Csbk {
        let mut burst = [0u8; DMR_FRAME_LENGTH_BYTES];
        csbk.encode(&mut burst);
        Csbk::decode(&burst).expect("valid csbk")
    }

    #[test]
    fn test_round_trip_per_opcode() {
        debug::setup_logging_verbose();
        let bodies = [
            CsbkBody::BsDownlinkActivate { bs_id: 0x123456, src_id: 2345678 },
            CsbkBody::UnitToUnitRequest { dst_id: 3456789, src_id: 2345678, ovcm: true },
            CsbkBody::UnitToUnitAnswer { dst_id: 2345678, src_id: 3456789, ovcm: false },
            CsbkBody::Preamble { group: true, data_content: true, cbf: 12, dst_id: 9, src_id: 2345678 },
            CsbkBody::NegativeAck { src_id: 3456789, dst_id: 2345678 },
            CsbkBody::CallAlert { group: false, data_content: false, cbf: 0, dst_id: 3456789, src_id: 2345678 },
            CsbkBody::CallAlertAck { group: false, data_content: false, cbf: 0, dst_id: 2345678, src_id: 3456789 },
            CsbkBody::RadioCheck { request: true, dst_id: 3456789, src_id: 2345678 },
            CsbkBody::RadioCheck { request: false, dst_id: 2345678, src_id: 3456789 },
            CsbkBody::CallEmergency { group: true, data_content: false, cbf: 0, dst_id: 91, src_id: 2345678 },
        ];
        for body in bodies {
            let csbk = Csbk::new(body);
            let decoded = through_air(&csbk);
            tracing::info!("Decoded: {}", decoded);
            assert_eq!(decoded.body, body);
            assert_eq!(decoded.src_id(), csbk.src_id());
            assert_eq!(decoded.dst_id(), csbk.dst_id());
            assert_eq!(decoded.to_bytes(), csbk.to_bytes());
        }
    }

    #[test]
    fn test_nack_ids_swapped_on_air() {
        let csbk = Csbk::new(CsbkBody::NegativeAck { src_id: 0x010203, dst_id: 0x040506 });
        let bytes = csbk.to_bytes();
        assert_eq!(bytes[0] & 0x3F, 0x26);
        assert_eq!(&bytes[4..10], &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_radio_check_direction() {
        let mut payload = [0u8; 12];
        payload[0] = 0x24;
        payload[3] = 0x00;
        payload[4..10].copy_from_slice(&[0, 0, 1, 0, 0, 2]);
        let ack = Csbk::from_bytes(&payload);
        assert_eq!(ack.body, CsbkBody::RadioCheck { request: false, src_id: 1, dst_id: 2 });

        payload[3] = 0x80;
        let req = Csbk::from_bytes(&payload);
        assert_eq!(req.body, CsbkBody::RadioCheck { request: true, dst_id: 1, src_id: 2 });
    }

    #[test]
    fn test_unhandled_opcode_preserved() {
        debug::setup_logging_verbose();
        let mut payload = [0x5Au8; 12];
        payload[0] = 0x80 | 0x3B;
        crc::add_ccitt16_masked(&mut payload, CSBK_CRC_MASK);
        let mut burst = [0u8; DMR_FRAME_LENGTH_BYTES];
        bptc19696::encode(&payload, &mut burst);

        let csbk = Csbk::decode(&burst).expect("crc is valid");
        assert!(matches!(csbk.body, CsbkBody::Unhandled { opcode: 0x3B, .. }));
        assert_eq!(csbk.csbko(), None);
        assert_eq!(csbk.src_id(), 0);
        assert_eq!(csbk.to_bytes(), payload);
    }

    #[test]
    fn test_set_cbf_and_ovcm() {
        let mut pre = Csbk::new(CsbkBody::Preamble { group: true, data_content: true, cbf: 10, dst_id: 9, src_id: 1 });
        pre.set_cbf(3);
        assert_eq!(through_air(&pre).cbf(), 3);
        pre.set_ovcm(true);
        assert!(!pre.ovcm());

        let mut req = Csbk::new(CsbkBody::UnitToUnitRequest { dst_id: 2, src_id: 1, ovcm: false });
        req.set_ovcm(true);
        assert_eq!(req.to_bytes()[2] & 0x04, 0x04);
        assert!(through_air(&req).ovcm());
    }

    #[test]
    fn test_crc_failure_rejected() {
        let csbk = Csbk::new(CsbkBody::Preamble { group: false, data_content: false, cbf: 1, dst_id: 2, src_id: 3 });
        let mut payload = csbk.to_bytes();
        payload[5] ^= 0x01;
        let mut burst = [0u8; DMR_FRAME_LENGTH_BYTES];
        bptc19696::encode(&payload, &mut burst);
        assert_eq!(Csbk::decode(&burst), None);
    }
}
