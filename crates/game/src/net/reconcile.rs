use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Real seconds between authoritative correction snapshots.
    pub correction_interval: f32,
    /// A local value is stale once `elapsed * staleness_scale >= rtt`.
    pub staleness_scale: f32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            correction_interval: 0.5,
            staleness_scale: 0.5,
        }
    }
}

impl ReconcileConfig {
    /// Whether a value last touched locally at `last_modified` has outlived
    /// its grace window. Slower connections get proportionally more grace.
    pub fn is_expired(&self, last_modified: f32, real_now: f32, rtt: f32) -> bool {
        (real_now - last_modified) * self.staleness_scale >= rtt
    }
}

/// A replicated value plus the real time it was last changed locally.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timestamped<T> {
    value: T,
    last_modified: f32,
}

impl<T: Copy + PartialEq> Timestamped<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            last_modified: f32::NEG_INFINITY,
        }
    }

    pub fn get(&self) -> T {
        self.value
    }

    pub fn last_modified(&self) -> f32 {
        self.last_modified
    }

    /// Returns whether the value changed. Only real changes bump the stamp.
    pub fn set(&mut self, value: T, real_now: f32) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        self.last_modified = real_now;
        true
    }

    pub fn needs_correction(
        &self,
        authoritative: T,
        real_now: f32,
        rtt: f32,
        config: &ReconcileConfig,
    ) -> bool {
        self.value != authoritative && config.is_expired(self.last_modified, real_now, rtt)
    }

    pub fn correct(
        &mut self,
        authoritative: T,
        real_now: f32,
        rtt: f32,
        config: &ReconcileConfig,
    ) -> bool {
        if !self.needs_correction(authoritative, real_now, rtt, config) {
            if self.value != authoritative {
                log::trace!("correction deferred, local value still fresh");
            }
            return false;
        }
        self.set(authoritative, real_now)
    }
}

/// Paces authoritative correction snapshots on real time.
#[derive(Debug, Clone)]
pub struct CorrectionTimer {
    next_correction: f32,
}

impl Default for CorrectionTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrectionTimer {
    pub fn new() -> Self {
        Self {
            next_correction: 0.0,
        }
    }

    pub fn is_due(&mut self, real_now: f32, config: &ReconcileConfig) -> bool {
        if real_now < self.next_correction {
            return false;
        }
        self.next_correction = real_now + config.correction_interval;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correction_needs_difference_and_staleness() {
        let config = ReconcileConfig::default();
        let mut clip = Timestamped::new(30u8);
        clip.set(29, 5.0);

        // Same value: never corrected, however stale.
        assert!(!clip.correct(29, 100.0, 0.1, &config));
        // Differs but fresh.
        assert!(!clip.correct(30, 5.1, 0.1, &config));
        assert_eq!(clip.get(), 29);
        // Differs and stale.
        assert!(clip.correct(30, 5.3, 0.1, &config));
        assert_eq!(clip.get(), 30);
    }

    #[test]
    fn grace_scales_with_round_trip() {
        let config = ReconcileConfig::default();
        assert!(config.is_expired(0.0, 0.2, 0.1));
        assert!(!config.is_expired(0.0, 0.2, 0.3));
        assert!(config.is_expired(0.0, 0.6, 0.3));
    }

    #[test]
    fn never_modified_is_always_expired() {
        let config = ReconcileConfig::default();
        let flag = Timestamped::new(false);
        assert!(flag.needs_correction(true, 0.0, 10.0, &config));
    }

    #[test]
    fn timer_fires_on_interval() {
        let config = ReconcileConfig::default();
        let mut timer = CorrectionTimer::new();

        assert!(timer.is_due(0.0, &config));
        assert!(!timer.is_due(0.3, &config));
        assert!(timer.is_due(0.5, &config));
        assert!(!timer.is_due(0.9, &config));
    }
}
