//! Sensor, clock and connectivity seams consumed by the monitors.
//!
//! The firmware implements these traits on top of the charger pins, battery
//! ADC and modem link; the emulator and tests implement them with plain
//! structs. Every read is synchronous and non-blocking.

use core::{fmt, ops::Add, time::Duration};

use crate::battery::BatteryState;

/// Where the device is currently drawing power from.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PowerSource {
    /// VIN or USB supply present.
    External,
    /// Running from the internal battery.
    Battery,
}

impl PowerSource {
    /// Lower-case label used in notifications and status lines.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            PowerSource::External => "external",
            PowerSource::Battery => "battery",
        }
    }
}

impl fmt::Display for PowerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Trait implemented by monotonic instant types driving the monitors.
pub trait MonitorInstant: Copy + Ord {
    /// Returns the saturating duration from `earlier` to `self`.
    fn saturating_duration_since(&self, earlier: Self) -> Duration;
}

/// Millisecond tick count since boot.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
pub struct Ticks(u64);

impl Ticks {
    /// Tick value at boot.
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1_000))
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

impl MonitorInstant for Ticks {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for Ticks {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        let millis = u64::try_from(rhs.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(millis))
    }
}

/// Day of the week as reported by the local clock (Sunday is day 0).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    /// All days in index order.
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    /// Deterministic index, Sunday = 0.
    #[must_use]
    pub const fn as_index(self) -> u8 {
        match self {
            Weekday::Sunday => 0,
            Weekday::Monday => 1,
            Weekday::Tuesday => 2,
            Weekday::Wednesday => 3,
            Weekday::Thursday => 4,
            Weekday::Friday => 5,
            Weekday::Saturday => 6,
        }
    }

    /// Attempts to construct a [`Weekday`] from a raw index.
    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Weekday::Sunday),
            1 => Some(Weekday::Monday),
            2 => Some(Weekday::Tuesday),
            3 => Some(Weekday::Wednesday),
            4 => Some(Weekday::Thursday),
            5 => Some(Weekday::Friday),
            6 => Some(Weekday::Saturday),
            _ => None,
        }
    }

    /// Three-letter lower-case abbreviation.
    #[must_use]
    pub const fn short_name(self) -> &'static str {
        match self {
            Weekday::Sunday => "sun",
            Weekday::Monday => "mon",
            Weekday::Tuesday => "tue",
            Weekday::Wednesday => "wed",
            Weekday::Thursday => "thu",
            Weekday::Friday => "fri",
            Weekday::Saturday => "sat",
        }
    }

    /// Parses a three-letter abbreviation or full day name, ignoring case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|day| {
            let short = day.short_name();
            name.eq_ignore_ascii_case(short)
                || (name.len() > short.len()
                    && name
                        .get(..short.len())
                        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(short))
                    && name[short.len()..].eq_ignore_ascii_case(day.name_suffix()))
        })
    }

    const fn name_suffix(self) -> &'static str {
        match self {
            Weekday::Sunday | Weekday::Monday | Weekday::Friday => "day",
            Weekday::Tuesday => "sday",
            Weekday::Wednesday => "nesday",
            Weekday::Thursday => "rsday",
            Weekday::Saturday => "urday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Minutes in one week; [`LocalTime::minute_of_week`] wraps at this value.
pub const MINUTES_PER_WEEK: u32 = 7 * 24 * 60;

/// Wall-clock time of week in the device's local timezone.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LocalTime {
    pub weekday: Weekday,
    pub hour: u8,
    pub minute: u8,
}

impl LocalTime {
    /// Creates a local time, rejecting out-of-range hours or minutes.
    #[must_use]
    pub const fn new(weekday: Weekday, hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self {
                weekday,
                hour,
                minute,
            })
        } else {
            None
        }
    }

    /// Minutes elapsed since Sunday 00:00.
    #[must_use]
    pub const fn minute_of_week(self) -> u32 {
        (self.weekday.as_index() as u32 * 24 + self.hour as u32) * 60 + self.minute as u32
    }

    /// Inverse of [`minute_of_week`](Self::minute_of_week); wraps past the end of the week.
    #[must_use]
    pub fn from_minute_of_week(minutes: u32) -> Self {
        let minutes = minutes % MINUTES_PER_WEEK;
        let day = u8::try_from(minutes / (24 * 60)).unwrap_or(0);
        let hour = u8::try_from((minutes / 60) % 24).unwrap_or(0);
        let minute = u8::try_from(minutes % 60).unwrap_or(0);
        Self {
            weekday: Weekday::from_index(day).unwrap_or(Weekday::Sunday),
            hour,
            minute,
        }
    }

    /// Returns the local time `minutes` later, wrapping at the end of the week.
    #[must_use]
    pub fn advanced_by(self, minutes: u32) -> Self {
        let total = self.minute_of_week() + minutes % MINUTES_PER_WEEK;
        Self::from_minute_of_week(total)
    }
}

impl fmt::Display for LocalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:02}:{:02}", self.weekday, self.hour, self.minute)
    }
}

/// Abstraction over the power and battery readings.
pub trait PowerSensors {
    /// Returns the current power source.
    fn power_source(&mut self) -> PowerSource;

    /// Returns the charger's view of the battery.
    fn battery_state(&mut self) -> BatteryState;

    /// Returns the state of charge in percent. Values outside `0..=100`
    /// (including NaN) mean the reading is unavailable.
    fn battery_charge_percent(&mut self) -> f32;
}

/// Injected local time source.
pub trait LocalClock {
    /// Returns `true` once the clock has been synchronised.
    fn is_time_synced(&self) -> bool;

    /// Current local time. Only meaningful when [`is_time_synced`](Self::is_time_synced).
    fn local_time(&self) -> LocalTime;

    /// Returns the local time only when the clock is synchronised.
    fn synced_local_time(&self) -> Option<LocalTime> {
        if self.is_time_synced() {
            Some(self.local_time())
        } else {
            None
        }
    }
}

/// Reports whether the notification transport is reachable.
pub trait Connectivity {
    fn connected(&self) -> bool;
}
