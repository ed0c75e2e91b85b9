//! Read-only status surface.
//!
//! [`StatusSnapshot`] captures what the monitor last observed, and
//! [`StatusFormatter`] renders it as the `power`, `battery` and `clock` lines
//! shown by front-ends.

use core::fmt;
use core::time::Duration;

use crate::battery::BatteryState;
use crate::heartbeat::HeartbeatSchedule;
use crate::sensors::{LocalTime, PowerSource};

/// Heartbeat portion of the status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeartbeatStatus {
    pub schedule: HeartbeatSchedule,
    pub sent_this_window: bool,
}

/// Snapshot of the values surfaced by the `status` command.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StatusSnapshot {
    /// `None` until the monitor has booted.
    pub power: Option<PowerSource>,
    /// Time spent on battery in the current outage.
    pub on_battery_for: Option<Duration>,
    pub battery: BatteryState,
    /// Last valid charge reading, in percent.
    pub charge_percent: Option<f32>,
    pub low_battery: bool,
    pub link_connected: bool,
    pub local_time: Option<LocalTime>,
    pub heartbeat: Option<HeartbeatStatus>,
}

impl StatusSnapshot {
    /// Builds a snapshot with no known measurements.
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            power: None,
            on_battery_for: None,
            battery: BatteryState::Unknown,
            charge_percent: None,
            low_battery: false,
            link_connected: false,
            local_time: None,
            heartbeat: None,
        }
    }
}

impl Default for StatusSnapshot {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Helper that renders a [`StatusSnapshot`] into human-readable lines.
#[derive(Clone, Copy, Debug)]
pub struct StatusFormatter<'a> {
    snapshot: &'a StatusSnapshot,
}

impl<'a> StatusFormatter<'a> {
    #[must_use]
    pub const fn new(snapshot: &'a StatusSnapshot) -> Self {
        Self { snapshot }
    }

    /// Writes the power line (e.g. `power source=battery outage=+1h02m03s`).
    pub fn write_power_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        writer.write_str("power source=")?;
        match self.snapshot.power {
            Some(source) => writer.write_str(source.label())?,
            None => writer.write_str("unknown")?,
        }

        if let Some(elapsed) = self.snapshot.on_battery_for {
            writer.write_str(" outage=")?;
            write_elapsed(writer, elapsed)?;
        }

        Ok(())
    }

    /// Writes the battery line (e.g. `battery state=charging charge=85.0% low=false`).
    pub fn write_battery_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        write!(writer, "battery state={}", self.snapshot.battery)?;

        writer.write_str(" charge=")?;
        match self.snapshot.charge_percent {
            Some(charge) => write!(writer, "{charge:.1}%")?,
            None => writer.write_str("n/a")?,
        }

        write!(writer, " low={}", self.snapshot.low_battery)
    }

    /// Writes the clock line (e.g. `clock time=sun 09:00 link=up heartbeat=sun 09:00 sent=no`).
    pub fn write_clock_line<W: fmt::Write>(&self, writer: &mut W) -> fmt::Result {
        writer.write_str("clock time=")?;
        match self.snapshot.local_time {
            Some(local) => write!(writer, "{local}")?,
            None => writer.write_str("unsynced")?,
        }

        writer.write_str(" link=")?;
        writer.write_str(if self.snapshot.link_connected {
            "up"
        } else {
            "down"
        })?;

        writer.write_str(" heartbeat=")?;
        match self.snapshot.heartbeat {
            Some(status) => {
                let schedule = status.schedule;
                write!(
                    writer,
                    "{} {:02}:{:02} sent={}",
                    schedule.weekday,
                    schedule.hour,
                    schedule.minute,
                    if status.sent_this_window { "yes" } else { "no" }
                )
            }
            None => writer.write_str("off"),
        }
    }
}

fn write_elapsed<W: fmt::Write>(writer: &mut W, elapsed: Duration) -> fmt::Result {
    let secs = elapsed.as_secs();
    let (hours, minutes, seconds) = (secs / 3_600, (secs / 60) % 60, secs % 60);
    if hours > 0 {
        write!(writer, "+{hours}h{minutes:02}m{seconds:02}s")
    } else if minutes > 0 {
        write!(writer, "+{minutes}m{seconds:02}s")
    } else {
        write!(writer, "+{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::Weekday;
    use core::fmt::Write;
    use heapless::String;

    fn render(
        write: impl Fn(&StatusFormatter<'_>, &mut String<96>) -> fmt::Result,
        snapshot: &StatusSnapshot,
    ) -> String<96> {
        let mut line = String::new();
        write(&StatusFormatter::new(snapshot), &mut line).expect("line fits");
        line
    }

    #[test]
    fn unknown_snapshot_lines() {
        let snapshot = StatusSnapshot::unknown();
        assert_eq!(
            render(|f, w| f.write_power_line(w), &snapshot).as_str(),
            "power source=unknown"
        );
        assert_eq!(
            render(|f, w| f.write_battery_line(w), &snapshot).as_str(),
            "battery state=unknown charge=n/a low=false"
        );
        assert_eq!(
            render(|f, w| f.write_clock_line(w), &snapshot).as_str(),
            "clock time=unsynced link=down heartbeat=off"
        );
    }

    #[test]
    fn outage_and_schedule_render() {
        let snapshot = StatusSnapshot {
            power: Some(PowerSource::Battery),
            on_battery_for: Some(Duration::from_secs(3_723)),
            battery: BatteryState::Discharging,
            charge_percent: Some(42.5),
            low_battery: false,
            link_connected: true,
            local_time: LocalTime::new(Weekday::Sunday, 9, 15),
            heartbeat: Some(HeartbeatStatus {
                schedule: HeartbeatSchedule::default(),
                sent_this_window: true,
            }),
        };

        assert_eq!(
            render(|f, w| f.write_power_line(w), &snapshot).as_str(),
            "power source=battery outage=+1h02m03s"
        );
        assert_eq!(
            render(|f, w| f.write_battery_line(w), &snapshot).as_str(),
            "battery state=discharging charge=42.5% low=false"
        );
        assert_eq!(
            render(|f, w| f.write_clock_line(w), &snapshot).as_str(),
            "clock time=sun 09:15 link=up heartbeat=sun 09:00 sent=yes"
        );
    }

    #[test]
    fn short_outages_use_compact_units() {
        let mut line: String<16> = String::new();
        write_elapsed(&mut line, Duration::from_secs(75)).expect("fits");
        assert_eq!(line.as_str(), "+1m15s");
        line.clear();
        write!(line, "x").expect("fits");
        write_elapsed(&mut line, Duration::from_secs(9)).expect("fits");
        assert_eq!(line.as_str(), "x+9s");
    }
}
