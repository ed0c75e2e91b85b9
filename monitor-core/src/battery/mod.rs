//! Battery state and low-charge monitoring.
//!
//! [`BatteryMonitor`] runs two independent checks on every due sample: an
//! edge-triggered comparison of the charger state and a hysteretic low-charge
//! latch. The latch sets once per excursion below the low threshold and only
//! clears after the charge climbs back to `threshold + hysteresis`.

use core::{fmt, time::Duration};

use heapless::Vec;

use crate::notify::MonitorEvent;
use crate::sensors::MonitorInstant;

/// Default interval between battery samples.
pub const BATTERY_CHECK_INTERVAL: Duration = Duration::from_secs(30);
/// Charge (percent) below which a low-battery notification is sent.
pub const LOW_BATTERY_NOTIFICATION: f32 = 10.0;
/// Width of the band above the threshold the charge must clear to re-arm.
pub const BATTERY_HYSTERESIS: f32 = 2.0;

/// Charger view of the battery.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum BatteryState {
    #[default]
    Unknown,
    NotCharging,
    Charging,
    Charged,
    Discharging,
    Fault,
    Disconnected,
}

impl BatteryState {
    /// Encodes the state using the platform's numeric codes.
    #[must_use]
    pub const fn to_raw(self) -> u8 {
        match self {
            BatteryState::Unknown => 0,
            BatteryState::NotCharging => 1,
            BatteryState::Charging => 2,
            BatteryState::Charged => 3,
            BatteryState::Discharging => 4,
            BatteryState::Fault => 5,
            BatteryState::Disconnected => 6,
        }
    }

    /// Decodes a numeric state code. Unrecognised codes are `Unknown`.
    #[must_use]
    pub const fn from_raw(code: u8) -> Self {
        match code {
            1 => BatteryState::NotCharging,
            2 => BatteryState::Charging,
            3 => BatteryState::Charged,
            4 => BatteryState::Discharging,
            5 => BatteryState::Fault,
            6 => BatteryState::Disconnected,
            _ => BatteryState::Unknown,
        }
    }

    /// Kebab-case label used on consoles and in logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            BatteryState::Unknown => "unknown",
            BatteryState::NotCharging => "not-charging",
            BatteryState::Charging => "charging",
            BatteryState::Charged => "charged",
            BatteryState::Discharging => "discharging",
            BatteryState::Fault => "fault",
            BatteryState::Disconnected => "disconnected",
        }
    }

    /// Parses a [`label`](Self::label), ignoring case.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        [
            BatteryState::Unknown,
            BatteryState::NotCharging,
            BatteryState::Charging,
            BatteryState::Charged,
            BatteryState::Discharging,
            BatteryState::Fault,
            BatteryState::Disconnected,
        ]
        .into_iter()
        .find(|state| state.label().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for BatteryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Returns `true` when `charge` is a usable percentage reading.
#[must_use]
pub fn is_valid_charge(charge: f32) -> bool {
    (0.0..=100.0).contains(&charge)
}

/// Low-charge thresholds, in percent.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LowBatteryThresholds {
    pub threshold: f32,
    pub hysteresis: f32,
}

impl LowBatteryThresholds {
    #[must_use]
    pub const fn new(threshold: f32, hysteresis: f32) -> Self {
        Self {
            threshold,
            hysteresis,
        }
    }

    /// Charge at or above which the latch clears.
    #[must_use]
    pub fn clear_at(&self) -> f32 {
        self.threshold + self.hysteresis
    }
}

impl Default for LowBatteryThresholds {
    fn default() -> Self {
        Self::new(LOW_BATTERY_NOTIFICATION, BATTERY_HYSTERESIS)
    }
}

/// Events produced by a single due battery sample.
pub type BatteryOutcome = Vec<MonitorEvent, 2>;

/// Edge-triggered state tracker plus hysteretic low-charge latch.
#[derive(Clone, Debug)]
pub struct BatteryMonitor<I> {
    interval: Duration,
    thresholds: LowBatteryThresholds,
    last_check: I,
    last_state: BatteryState,
    low_battery_active: bool,
}

impl<I: MonitorInstant> BatteryMonitor<I> {
    /// Creates a monitor that first samples one interval after `boot_at`.
    ///
    /// The remembered state starts as [`BatteryState::Unknown`], so a first
    /// sample reporting any other state is a change.
    pub fn new(boot_at: I, interval: Duration, thresholds: LowBatteryThresholds) -> Self {
        Self {
            interval,
            thresholds,
            last_check: boot_at,
            last_state: BatteryState::Unknown,
            low_battery_active: false,
        }
    }

    /// Returns `true` when a sample is due at `now`.
    pub fn is_due(&self, now: I) -> bool {
        now.saturating_duration_since(self.last_check) >= self.interval
    }

    /// Last state compared against.
    pub fn last_state(&self) -> BatteryState {
        self.last_state
    }

    /// Returns `true` while the low-battery latch is set.
    pub fn low_battery_active(&self) -> bool {
        self.low_battery_active
    }

    pub fn thresholds(&self) -> LowBatteryThresholds {
        self.thresholds
    }

    /// Feeds a sample. Returns nothing when the sample is not due.
    pub fn poll(&mut self, now: I, state: BatteryState, charge: f32) -> BatteryOutcome {
        let mut events = BatteryOutcome::new();
        if !self.is_due(now) {
            return events;
        }
        self.last_check = now;

        if state != self.last_state {
            let from = self.last_state;
            self.last_state = state;
            push_event(&mut events, MonitorEvent::BatteryStateChanged { from, to: state });
        }

        if !is_valid_charge(charge) {
            return events;
        }

        if charge < self.thresholds.threshold {
            if !self.low_battery_active {
                self.low_battery_active = true;
                push_event(&mut events, MonitorEvent::LowBattery);
            }
        } else if self.low_battery_active && charge >= self.thresholds.clear_at() {
            self.low_battery_active = false;
            push_event(&mut events, MonitorEvent::LowBatteryCleared);
        }

        events
    }
}

fn push_event(events: &mut BatteryOutcome, event: MonitorEvent) {
    // At most one state event and one charge event per sample.
    let _ = events.push(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::Ticks;

    fn monitor() -> BatteryMonitor<Ticks> {
        BatteryMonitor::new(
            Ticks::ZERO,
            BATTERY_CHECK_INTERVAL,
            LowBatteryThresholds::default(),
        )
    }

    fn at(sample: u64) -> Ticks {
        Ticks::from_secs(30 * sample)
    }

    #[test]
    fn raw_codes_decode_and_unknown_codes_fall_back() {
        for code in 0..=6 {
            assert_eq!(BatteryState::from_raw(code).to_raw(), code);
        }
        assert_eq!(BatteryState::from_raw(7), BatteryState::Unknown);
        assert_eq!(BatteryState::from_raw(u8::MAX), BatteryState::Unknown);
    }

    #[test]
    fn labels_parse_back() {
        assert_eq!(
            BatteryState::from_label("Not-Charging"),
            Some(BatteryState::NotCharging)
        );
        assert_eq!(BatteryState::from_label("flat"), None);
    }

    #[test]
    fn samples_before_interval_are_ignored() {
        let mut battery = monitor();
        let events = battery.poll(Ticks::from_secs(29), BatteryState::Fault, 5.0);
        assert!(events.is_empty());
        assert_eq!(battery.last_state(), BatteryState::Unknown);
        assert!(!battery.low_battery_active());
    }

    #[test]
    fn state_and_low_charge_fire_in_same_sample() {
        let mut battery = monitor();
        let events = battery.poll(at(1), BatteryState::Discharging, 4.0);
        assert_eq!(
            events.as_slice(),
            &[
                MonitorEvent::BatteryStateChanged {
                    from: BatteryState::Unknown,
                    to: BatteryState::Discharging,
                },
                MonitorEvent::LowBattery,
            ]
        );
    }

    #[test]
    fn invalid_charge_skips_low_battery_check() {
        let mut battery = monitor();
        let events = battery.poll(at(1), BatteryState::Charging, -1.0);
        assert_eq!(events.len(), 1);
        assert!(!battery.low_battery_active());

        let events = battery.poll(at(2), BatteryState::Charging, f32::NAN);
        assert!(events.is_empty());
        assert!(!battery.low_battery_active());
    }

    #[test]
    fn latch_clears_exactly_at_upper_bound() {
        let mut battery = monitor();
        battery.poll(at(1), BatteryState::Unknown, 9.0);
        assert!(battery.low_battery_active());

        let events = battery.poll(at(2), BatteryState::Unknown, 11.99);
        assert!(events.is_empty());
        assert!(battery.low_battery_active());

        let events = battery.poll(at(3), BatteryState::Unknown, 12.0);
        assert_eq!(events.as_slice(), &[MonitorEvent::LowBatteryCleared]);
        assert!(!battery.low_battery_active());
    }
}
