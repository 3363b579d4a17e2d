use core::fmt;

use dmr_core::{BitBuffer, CodecErr, let_field};

const POSITION_ERRORS: [&str; 8] = [
    "less than 2m",
    "less than 20m",
    "less than 200m",
    "less than 2km",
    "less than 20km",
    "less than or equal to 200km",
    "more than 200km",
    "not known",
];

/// GPS Info LC, ETSI TS 102 361-2 Clause 7.1.1.3
/// Bits: 8 FLCO/PF, 8 FID, 4 reserved, 3 position error, 25 longitude, 24 latitude
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsInfo {
    /// 3 bits
    pub position_error: u8,
    /// 25 bits, two's complement, 360/2^25 degree steps
    pub longitude_raw: i32,
    /// 24 bits, two's complement, 180/2^24 degree steps
    pub latitude_raw: i32,
}

fn sign_extend(value: u64, bits: u32) -> i32 {
    let shift = 32 - bits;
    ((value as u32) << shift) as i32 >> shift
}

impl GpsInfo {
    pub fn from_bitbuf(buffer: &mut BitBuffer) -> Result<Self, CodecErr> {
        let_field!(buffer, _flco, 8);
        let_field!(buffer, _fid, 8);
        let_field!(buffer, _reserved, 4);
        let_field!(buffer, position_error, 3);
        let_field!(buffer, longitude, 25);
        let_field!(buffer, latitude, 24);
        Ok(GpsInfo {
            position_error: position_error as u8,
            longitude_raw: sign_extend(longitude, 25),
            latitude_raw: sign_extend(latitude, 24),
        })
    }

    pub fn from_bytes(raw: &[u8; 9]) -> Result<Self, CodecErr> {
        Self::from_bitbuf(&mut BitBuffer::from_bytes(raw))
    }

    pub fn longitude(&self) -> f64 {
        self.longitude_raw as f64 * 360.0 / (1u32 << 25) as f64
    }

    pub fn latitude(&self) -> f64 {
        self.latitude_raw as f64 * 180.0 / (1u32 << 24) as f64
    }

    pub fn position_error_text(&self) -> &'static str {
        POSITION_ERRORS[(self.position_error & 0x07) as usize]
    }
}

impl fmt::Display for GpsInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "GPS position [{:.6},{:.6}] (position error {})", self.latitude(), self.longitude(), self.position_error_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(position_error: u8, longitude_raw: i32, latitude_raw: i32) -> [u8; 9] {
        let mut buf = BitBuffer::new(72);
        buf.write_bits(0x08, 8);
        buf.write_bits(0, 8);
        buf.write_bits(0, 4);
        buf.write_bits(position_error as u64, 3);
        buf.write_bits((longitude_raw as u32 & 0x1FF_FFFF) as u64, 25);
        buf.write_bits((latitude_raw as u32 & 0xFF_FFFF) as u64, 24);
        let mut raw = [0u8; 9];
        raw.copy_from_slice(buf.as_bytes());
        raw
    }

    #[test]
    fn test_positive_position() {
        // 52.0 N, 4.5 E
        let lat = (52.0 / 180.0 * (1 << 24) as f64) as i32;
        let lon = (4.5 / 360.0 * (1 << 25) as f64) as i32;
        let gps = GpsInfo::from_bytes(&encode(2, lon, lat)).unwrap();
        assert!((gps.latitude() - 52.0).abs() < 1e-4);
        assert!((gps.longitude() - 4.5).abs() < 1e-4);
        assert_eq!(gps.position_error_text(), "less than 200m");
    }

    #[test]
    fn test_negative_position() {
        // 33.9 S, 151.2 W
        let lat = (-33.9 / 180.0 * (1 << 24) as f64) as i32;
        let lon = (-151.2 / 360.0 * (1 << 25) as f64) as i32;
        let gps = GpsInfo::from_bytes(&encode(7, lon, lat)).unwrap();
        assert!((gps.latitude() + 33.9).abs() < 1e-4);
        assert!((gps.longitude() + 151.2).abs() < 1e-4);
        assert_eq!(gps.position_error_text(), "not known");
    }
}
