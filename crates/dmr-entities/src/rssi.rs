use std::collections::BTreeMap;

/// Maps raw modem RSSI readings to dBm by linear interpolation between
/// calibration points, clamped at both ends of the table
#[derive(Debug, Clone, Default)]
pub struct RssiMapper {
    points: BTreeMap<u16, i32>,
}

impl RssiMapper {
    pub fn new(points: &[(u16, i16)]) -> Self {
        Self { points: points.iter().map(|&(raw, dbm)| (raw, dbm as i32)).collect() }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// dBm for a raw reading, 0 when there is no table
    pub fn interpolate(&self, raw: u16) -> i32 {
        let Some((&x2, &y2)) = self.points.range(raw..).next() else {
            return self.points.values().next_back().copied().unwrap_or(0);
        };
        let Some((&x1, &y1)) = self.points.range(..raw).next_back() else {
            return y2;
        };
        let p = (raw - x1) as f32 / (x2 - x1) as f32;
        ((1.0 - p) * y1 as f32 + p * y2 as f32) as i32
    }
}
