//! Monitor events, the notices attached to them, and the outbound payload.
//!
//! Every transition the monitors detect is a [`MonitorEvent`]. Each event maps
//! through a total table to a [`Notice`] that decides its log level, its text,
//! and whether it leaves the device at all. Events whose notice is local-only
//! still reach the event log; they are never handed to the
//! [`NotificationSink`].

use core::fmt::{self, Write};

use heapless::String;

use crate::battery::BatteryState;
use crate::sensors::PowerSource;

/// Event name used when publishing notifications.
pub const PUBLISH_EVENT_NAME: &str = "power_outage";

/// Capacity of an encoded notification payload.
pub const MAX_PAYLOAD_LEN: usize = 192;

/// Encoded notification payload.
pub type Payload = String<MAX_PAYLOAD_LEN>;

/// Severity used when a notice is logged.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// How an event is reported.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Notice {
    pub level: LogLevel,
    pub message: &'static str,
    /// `false` for events that are only logged locally.
    pub publish: bool,
}

impl Notice {
    const fn published(level: LogLevel, message: &'static str) -> Self {
        Self {
            level,
            message,
            publish: true,
        }
    }

    const fn local(level: LogLevel, message: &'static str) -> Self {
        Self {
            level,
            message,
            publish: false,
        }
    }
}

/// Transitions detected by the monitors.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum MonitorEvent {
    /// Monitor started; carries the power source read at boot.
    Booted(PowerSource),
    PowerLost,
    PowerRestored,
    BatteryStateChanged {
        from: BatteryState,
        to: BatteryState,
    },
    LowBattery,
    /// Charge climbed back past the hysteresis band. Never published.
    LowBatteryCleared,
    Heartbeat,
}

impl MonitorEvent {
    /// Looks up how this event is logged and whether it is published.
    #[must_use]
    pub const fn notice(self) -> Notice {
        match self {
            MonitorEvent::Booted(PowerSource::Battery) => {
                Notice::published(LogLevel::Info, "Power Source: battery")
            }
            MonitorEvent::Booted(PowerSource::External) => {
                Notice::published(LogLevel::Info, "Power Source: external")
            }
            MonitorEvent::PowerLost => Notice::published(LogLevel::Info, "AC power lost"),
            MonitorEvent::PowerRestored => Notice::published(LogLevel::Info, "AC power is on"),
            MonitorEvent::BatteryStateChanged { to, .. } => to.notice(),
            MonitorEvent::LowBattery => Notice::published(LogLevel::Warn, "Low Battery"),
            MonitorEvent::LowBatteryCleared => {
                Notice::local(LogLevel::Info, "battery recovered above low threshold")
            }
            MonitorEvent::Heartbeat => Notice::published(LogLevel::Info, "I'm alive"),
        }
    }
}

impl fmt::Display for MonitorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorEvent::Booted(source) => write!(f, "booted source={source}"),
            MonitorEvent::PowerLost => f.write_str("power-lost"),
            MonitorEvent::PowerRestored => f.write_str("power-restored"),
            MonitorEvent::BatteryStateChanged { from, to } => {
                write!(f, "battery-state {from}->{to}")
            }
            MonitorEvent::LowBattery => f.write_str("low-battery"),
            MonitorEvent::LowBatteryCleared => f.write_str("low-battery-cleared"),
            MonitorEvent::Heartbeat => f.write_str("heartbeat"),
        }
    }
}

impl BatteryState {
    /// Table entry describing how a change into this state is reported.
    #[must_use]
    pub const fn notice(self) -> Notice {
        match self {
            BatteryState::Unknown => Notice::published(LogLevel::Warn, "battery state is unknown!"),
            BatteryState::NotCharging => {
                Notice::published(LogLevel::Info, "battery is not charging")
            }
            BatteryState::Charging => Notice::local(LogLevel::Info, "battery is charging"),
            BatteryState::Charged => Notice::local(LogLevel::Info, "battery charged"),
            BatteryState::Discharging => Notice::local(LogLevel::Info, "battery is discharging"),
            BatteryState::Fault => Notice::published(LogLevel::Error, "battery fault!"),
            BatteryState::Disconnected => {
                Notice::published(LogLevel::Info, "battery is disconnected")
            }
        }
    }
}

/// A (title, message) pair handed to the sink.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Notification {
    pub event: MonitorEvent,
    pub title: &'static str,
    pub message: &'static str,
}

impl Notification {
    #[must_use]
    pub const fn new(event: MonitorEvent, title: &'static str) -> Self {
        Self {
            event,
            title,
            message: event.notice().message,
        }
    }

    /// Encodes the publish payload for this notification.
    pub fn payload(&self) -> Result<Payload, PayloadError> {
        encode_payload(self.title, self.message)
    }
}

/// Best-effort delivery of notifications.
///
/// Implementations must return promptly; retries, timeouts and delivery
/// failures stay inside the sink.
pub trait NotificationSink {
    fn publish(&mut self, notification: &Notification);
}

/// Errors produced while encoding outbound payloads.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PayloadError {
    /// The encoded text does not fit the fixed-capacity buffer.
    Overflow,
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadError::Overflow => f.write_str("payload exceeds buffer capacity"),
        }
    }
}

/// Encodes the push-notification key/value payload:
/// `[{"key":"title", "value":"..."},{"key":"message", "value":"..."}]`.
pub fn encode_payload<const N: usize>(
    title: &str,
    message: &str,
) -> Result<String<N>, PayloadError> {
    let mut payload = String::new();
    write_payload(&mut payload, title, message).map_err(|_| PayloadError::Overflow)?;
    Ok(payload)
}

/// Writes the payload for `title`/`message` into any [`fmt::Write`] sink.
pub fn write_payload<W: Write>(writer: &mut W, title: &str, message: &str) -> fmt::Result {
    writer.write_str("[{\"key\":\"title\", \"value\":\"")?;
    write_json_escaped(writer, title)?;
    writer.write_str("\"},{\"key\":\"message\", \"value\":\"")?;
    write_json_escaped(writer, message)?;
    writer.write_str("\"}]")
}

fn write_json_escaped<W: Write>(writer: &mut W, text: &str) -> fmt::Result {
    for ch in text.chars() {
        match ch {
            '"' => writer.write_str("\\\"")?,
            '\\' => writer.write_str("\\\\")?,
            '\n' => writer.write_str("\\n")?,
            '\r' => writer.write_str("\\r")?,
            '\t' => writer.write_str("\\t")?,
            control if u32::from(control) < 0x20 => {
                write!(writer, "\\u{:04x}", u32::from(control))?;
            }
            other => writer.write_char(other)?,
        }
    }
    Ok(())
}
