use core::{fmt, time::Duration};

use crate::battery::{
    BATTERY_CHECK_INTERVAL, BATTERY_HYSTERESIS, LOW_BATTERY_NOTIFICATION, LowBatteryThresholds,
};
use crate::heartbeat::{HEARTBEAT_CHECK_INTERVAL, HeartbeatSchedule};
use crate::power::POWER_CHECK_INTERVAL;

/// Title attached to every runtime notification.
pub const NOTIFICATION_TITLE: &str = "PDC Power Monitor";
/// Title attached to the boot notification.
pub const BOOT_TITLE: &str = "PDC Power Monitor Booting...";
/// Longest title accepted by [`MonitorConfig::validate`].
pub const MAX_TITLE_LEN: usize = 48;

/// Tunables for [`PowerLossMonitor`](super::PowerLossMonitor).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MonitorConfig {
    pub power_check_interval: Duration,
    pub battery_check_interval: Duration,
    pub heartbeat_check_interval: Duration,
    pub low_battery: LowBatteryThresholds,
    /// `None` disables the weekly heartbeat.
    pub heartbeat: Option<HeartbeatSchedule>,
    pub notification_title: &'static str,
    pub boot_title: &'static str,
}

impl MonitorConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            power_check_interval: POWER_CHECK_INTERVAL,
            battery_check_interval: BATTERY_CHECK_INTERVAL,
            heartbeat_check_interval: HEARTBEAT_CHECK_INTERVAL,
            low_battery: LowBatteryThresholds::new(LOW_BATTERY_NOTIFICATION, BATTERY_HYSTERESIS),
            heartbeat: Some(HeartbeatSchedule::WEEKLY_DEFAULT),
            notification_title: NOTIFICATION_TITLE,
            boot_title: BOOT_TITLE,
        }
    }

    #[must_use]
    pub const fn with_power_check_interval(mut self, interval: Duration) -> Self {
        self.power_check_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_battery_check_interval(mut self, interval: Duration) -> Self {
        self.battery_check_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_heartbeat_check_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_check_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_low_battery(mut self, threshold: f32, hysteresis: f32) -> Self {
        self.low_battery = LowBatteryThresholds::new(threshold, hysteresis);
        self
    }

    /// Replaces the heartbeat schedule; `None` turns the heartbeat off.
    #[must_use]
    pub const fn with_heartbeat(mut self, schedule: Option<HeartbeatSchedule>) -> Self {
        self.heartbeat = schedule;
        self
    }

    #[must_use]
    pub const fn with_titles(mut self, notification: &'static str, boot: &'static str) -> Self {
        self.notification_title = notification;
        self.boot_title = boot;
        self
    }

    /// Checks the configuration for values the monitors cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.power_check_interval.is_zero()
            || self.battery_check_interval.is_zero()
            || self.heartbeat_check_interval.is_zero()
        {
            return Err(ConfigError::ZeroInterval);
        }

        let LowBatteryThresholds {
            threshold,
            hysteresis,
        } = self.low_battery;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(ConfigError::ThresholdOutOfRange);
        }
        if !(hysteresis >= 0.0 && threshold + hysteresis <= 100.0) {
            return Err(ConfigError::HysteresisOutOfRange);
        }

        if self.heartbeat.is_some_and(|schedule| !schedule.is_valid()) {
            return Err(ConfigError::InvalidHeartbeat);
        }

        for title in [self.notification_title, self.boot_title] {
            if title.is_empty() || title.len() > MAX_TITLE_LEN {
                return Err(ConfigError::InvalidTitle);
            }
        }

        Ok(())
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Reasons a [`MonitorConfig`] is rejected.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    ZeroInterval,
    ThresholdOutOfRange,
    HysteresisOutOfRange,
    InvalidHeartbeat,
    InvalidTitle,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroInterval => f.write_str("check intervals must be non-zero"),
            ConfigError::ThresholdOutOfRange => {
                f.write_str("low battery threshold must be within 0..=100")
            }
            ConfigError::HysteresisOutOfRange => {
                f.write_str("hysteresis must be non-negative and keep the reset point <= 100")
            }
            ConfigError::InvalidHeartbeat => f.write_str("heartbeat time is not a valid time of day"),
            ConfigError::InvalidTitle => write!(
                f,
                "notification titles must be 1..={MAX_TITLE_LEN} bytes"
            ),
        }
    }
}
