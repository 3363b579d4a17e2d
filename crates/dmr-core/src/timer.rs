/// Millisecond countdown advanced explicitly by `clock()`, so the state machines
/// never read a wall clock themselves. A timeout of zero disables the timer.
#[derive(Debug, Clone, Default)]
pub struct Timer {
    timeout: u32,
    /// Elapsed ms plus one while running, zero when stopped
    timer: u32,
}

impl Timer {
    pub fn new(secs: u32, msecs: u32) -> Self {
        let mut t = Timer::default();
        t.set_timeout(secs, msecs);
        t
    }

    pub fn set_timeout(&mut self, secs: u32, msecs: u32) {
        let total = secs * 1000 + msecs;
        self.timeout = if total > 0 { total + 1 } else { 0 };
    }

    /// Configured timeout in ms, zero if disabled
    pub fn timeout_ms(&self) -> u32 {
        self.timeout.saturating_sub(1)
    }

    /// Elapsed ms since start, zero if not running
    pub fn elapsed_ms(&self) -> u32 {
        self.timer.saturating_sub(1)
    }

    pub fn start(&mut self) {
        if self.timeout > 0 {
            self.timer = 1;
        }
    }

    pub fn start_with(&mut self, secs: u32, msecs: u32) {
        self.set_timeout(secs, msecs);
        self.start();
    }

    pub fn stop(&mut self) {
        self.timer = 0;
    }

    pub fn is_running(&self) -> bool {
        self.timer > 0
    }

    pub fn clock(&mut self, ms: u32) {
        if self.timer > 0 && self.timeout > 0 {
            self.timer = self.timer.saturating_add(ms);
        }
    }

    pub fn has_expired(&self) -> bool {
        self.timeout > 0 && self.timer > 0 && self.timer >= self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry() {
        let mut t = Timer::new(1, 500);
        assert!(!t.is_running());
        t.clock(5000);
        assert!(!t.has_expired(), "stopped timer must not advance");

        t.start();
        t.clock(1499);
        assert!(!t.has_expired());
        assert_eq!(t.elapsed_ms(), 1499);
        t.clock(1);
        assert!(t.has_expired());

        t.stop();
        assert!(!t.has_expired());
        assert!(!t.is_running());
    }

    #[test]
    fn test_disabled() {
        let mut t = Timer::new(0, 0);
        t.start();
        t.clock(100_000);
        assert!(!t.is_running());
        assert!(!t.has_expired());
        assert_eq!(t.timeout_ms(), 0);
    }

    #[test]
    fn test_restart_resets_elapsed() {
        let mut t = Timer::new(0, 60);
        t.start();
        t.clock(59);
        t.start();
        t.clock(59);
        assert!(!t.has_expired());
        t.start_with(0, 10);
        t.clock(10);
        assert!(t.has_expired());
    }
}
