//! External power loss detection.

use core::time::Duration;

use crate::notify::MonitorEvent;
use crate::sensors::{MonitorInstant, PowerSource};

/// Default interval between power-source samples.
pub const POWER_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Debounced tracker for the active power source.
///
/// Seeded from an explicit boot-time reading so the first periodic sample
/// compares against a real observation.
#[derive(Clone, Debug)]
pub struct PowerSourceMonitor<I> {
    interval: Duration,
    last_check: I,
    current: PowerSource,
}

impl<I: MonitorInstant> PowerSourceMonitor<I> {
    pub fn new(seed: PowerSource, boot_at: I, interval: Duration) -> Self {
        Self {
            interval,
            last_check: boot_at,
            current: seed,
        }
    }

    /// Last confirmed power source.
    pub fn current(&self) -> PowerSource {
        self.current
    }

    /// Returns `true` when a sample is due at `now`.
    pub fn is_due(&self, now: I) -> bool {
        now.saturating_duration_since(self.last_check) >= self.interval
    }

    /// Feeds a sample, returning the transition it completes (if any).
    pub fn poll(&mut self, now: I, source: PowerSource) -> Option<MonitorEvent> {
        if !self.is_due(now) {
            return None;
        }
        self.last_check = now;

        let previous = self.current;
        self.current = source;

        match (previous, source) {
            (PowerSource::External, PowerSource::Battery) => Some(MonitorEvent::PowerLost),
            (PowerSource::Battery, PowerSource::External) => Some(MonitorEvent::PowerRestored),
            _ => None,
        }
    }
}
