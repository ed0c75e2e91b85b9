//! Weekly "alive" heartbeat.
//!
//! The scheduler polls every [`HEARTBEAT_CHECK_INTERVAL`] and fires once per
//! scheduled window. The window is the target weekday from the target hour and
//! minute onward; the latch re-arms as soon as any other weekday is observed.

use core::time::Duration;

use crate::notify::MonitorEvent;
use crate::sensors::{LocalTime, MonitorInstant, Weekday};

/// Default interval between heartbeat checks.
pub const HEARTBEAT_CHECK_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// When the weekly heartbeat is sent, in local time.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HeartbeatSchedule {
    pub weekday: Weekday,
    pub hour: u8,
    pub minute: u8,
}

impl HeartbeatSchedule {
    /// Sunday 09:00.
    pub const WEEKLY_DEFAULT: Self = Self::new(Weekday::Sunday, 9, 0);

    #[must_use]
    pub const fn new(weekday: Weekday, hour: u8, minute: u8) -> Self {
        Self {
            weekday,
            hour,
            minute,
        }
    }

    /// Returns `true` when `hour` and `minute` describe a real time of day.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.hour < 24 && self.minute < 60
    }

    /// Returns `true` when `local` falls inside the heartbeat window.
    #[must_use]
    pub fn window_open(&self, local: LocalTime) -> bool {
        local.weekday == self.weekday && (local.hour, local.minute) >= (self.hour, self.minute)
    }
}

impl Default for HeartbeatSchedule {
    fn default() -> Self {
        Self::WEEKLY_DEFAULT
    }
}

/// Rate-limited weekly heartbeat.
#[derive(Clone, Debug)]
pub struct HeartbeatScheduler<I> {
    schedule: HeartbeatSchedule,
    interval: Duration,
    last_check: I,
    sent_this_window: bool,
}

impl<I: MonitorInstant> HeartbeatScheduler<I> {
    pub fn new(schedule: HeartbeatSchedule, boot_at: I, interval: Duration) -> Self {
        Self {
            schedule,
            interval,
            last_check: boot_at,
            sent_this_window: false,
        }
    }

    pub fn schedule(&self) -> HeartbeatSchedule {
        self.schedule
    }

    /// Returns `true` once the heartbeat has fired for the current window.
    pub fn sent_this_window(&self) -> bool {
        self.sent_this_window
    }

    pub fn is_due(&self, now: I) -> bool {
        now.saturating_duration_since(self.last_check) >= self.interval
    }

    /// Checks the schedule.
    ///
    /// `local` is `None` while the clock is unsynchronised; such checks are
    /// skipped outright and leave both the latch and the check timer alone, so
    /// the next poll retries immediately once time arrives.
    pub fn poll(&mut self, now: I, local: Option<LocalTime>) -> Option<MonitorEvent> {
        if !self.is_due(now) {
            return None;
        }
        let local = local?;
        self.last_check = now;

        if local.weekday != self.schedule.weekday {
            self.sent_this_window = false;
            return None;
        }

        if self.schedule.window_open(local) && !self.sent_this_window {
            self.sent_this_window = true;
            return Some(MonitorEvent::Heartbeat);
        }

        None
    }
}
