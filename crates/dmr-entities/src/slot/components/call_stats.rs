use core::fmt;

/// Corrected bit counter for one call
#[derive(Debug, Clone, Copy, Default)]
pub struct BerCounter {
    bits: u32,
    errs: u32,
}

impl BerCounter {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn add(&mut self, bits: u32, errs: u32) {
        self.bits += bits;
        self.errs += errs;
    }

    pub fn percent(&self) -> f32 {
        if self.bits == 0 {
            return 0.0;
        }
        self.errs as f32 * 100.0 / self.bits as f32
    }
}

/// Min, max and mean signal strength over a call, in dBm
#[derive(Debug, Clone, Copy, Default)]
pub struct RssiStats {
    min: i32,
    max: i32,
    sum: i64,
    count: u32,
}

impl RssiStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn add(&mut self, dbm: i32) {
        if self.count == 0 {
            self.min = dbm;
            self.max = dbm;
        } else {
            // Closer to zero is stronger
            self.min = self.min.min(dbm);
            self.max = self.max.max(dbm);
        }
        self.sum += dbm as i64;
        self.count += 1;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn average(&self) -> i32 {
        if self.count == 0 {
            return 0;
        }
        (self.sum / self.count as i64) as i32
    }
}

impl fmt::Display for RssiStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}/{} dBm", self.min, self.max, self.average())
    }
}
