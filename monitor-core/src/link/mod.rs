//! Line protocol spoken with the cellular modem co-processor.
//!
//! Lines are CRLF terminated ASCII. The monitor sends one kind of frame:
//!
//! ```text
//! PUB power_outage [{"key":"title", "value":"..."},{"key":"message", "value":"..."}]
//! ```
//!
//! and understands these unsolicited reports from the modem:
//!
//! ```text
//! +CLOUD:1            cloud session up
//! +CLOUD:0            cloud session down
//! +TIME:0,09:05       local weekday (Sunday = 0), hour and minute
//! +TIME:UNSYNCED      no network time yet
//! ```

use core::fmt::{self, Write};

use heapless::String;
use winnow::ascii::dec_uint;
use winnow::combinator::{alt, preceded};
use winnow::prelude::*;

use crate::notify::{self, MAX_PAYLOAD_LEN, Notification, PUBLISH_EVENT_NAME, PayloadError};
use crate::sensors::{Connectivity, LocalClock, LocalTime, Weekday};

/// Longest accepted inbound line, excluding the terminator.
pub const MAX_LINE_LEN: usize = 64;

/// Capacity of an encoded outbound frame.
pub const MAX_FRAME_LEN: usize = MAX_PAYLOAD_LEN + 32;

/// Encoded outbound frame, terminator included.
pub type Frame = String<MAX_FRAME_LEN>;

/// Report received from the modem.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LinkEvent {
    Cloud(bool),
    Time(LocalTime),
    TimeUnsynced,
}

/// Errors produced while parsing inbound lines.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LinkParseError {
    /// The line is not a recognised report.
    Malformed,
    /// A report was recognised but extra characters follow it.
    TrailingInput,
}

impl fmt::Display for LinkParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkParseError::Malformed => f.write_str("unrecognised modem line"),
            LinkParseError::TrailingInput => f.write_str("unexpected characters after report"),
        }
    }
}

/// Parses a single line. A trailing `\r`/`\n` is ignored.
pub fn parse_link_line(line: &str) -> Result<LinkEvent, LinkParseError> {
    let mut input = line.trim_end_matches(['\r', '\n']);
    let event = link_event
        .parse_next(&mut input)
        .map_err(|_| LinkParseError::Malformed)?;

    if input.is_empty() {
        Ok(event)
    } else {
        Err(LinkParseError::TrailingInput)
    }
}

fn link_event(input: &mut &str) -> ModalResult<LinkEvent> {
    alt((cloud_report, time_report)).parse_next(input)
}

fn cloud_report(input: &mut &str) -> ModalResult<LinkEvent> {
    preceded("+CLOUD:", alt(('1'.value(true), '0'.value(false))))
        .map(LinkEvent::Cloud)
        .parse_next(input)
}

fn time_report(input: &mut &str) -> ModalResult<LinkEvent> {
    preceded(
        "+TIME:",
        alt((
            "UNSYNCED".value(LinkEvent::TimeUnsynced),
            local_time.map(LinkEvent::Time),
        )),
    )
    .parse_next(input)
}

fn local_time(input: &mut &str) -> ModalResult<LocalTime> {
    (small_uint, ',', small_uint, ':', small_uint)
        .verify_map(|(day, _, hour, _, minute)| {
            Weekday::from_index(day).and_then(|weekday| LocalTime::new(weekday, hour, minute))
        })
        .parse_next(input)
}

fn small_uint(input: &mut &str) -> ModalResult<u8> {
    dec_uint.parse_next(input)
}

/// Encodes the publish frame for `notification`.
pub fn encode_publish(notification: &Notification) -> Result<Frame, PayloadError> {
    let mut frame = Frame::new();
    write_publish(&mut frame, notification.title, notification.message)
        .map_err(|_| PayloadError::Overflow)?;
    Ok(frame)
}

fn write_publish<W: Write>(writer: &mut W, title: &str, message: &str) -> fmt::Result {
    write!(writer, "PUB {PUBLISH_EVENT_NAME} ")?;
    notify::write_payload(writer, title, message)?;
    writer.write_str("\r\n")
}

/// What the monitor currently knows about the modem.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct LinkState {
    pub cloud_connected: bool,
    pub local_time: Option<LocalTime>,
}

impl LinkState {
    /// Folds a report into the state.
    pub fn apply(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Cloud(up) => self.cloud_connected = up,
            LinkEvent::Time(local) => self.local_time = Some(local),
            LinkEvent::TimeUnsynced => self.local_time = None,
        }
    }
}

impl Connectivity for LinkState {
    fn connected(&self) -> bool {
        self.cloud_connected
    }
}

impl LocalClock for LinkState {
    fn is_time_synced(&self) -> bool {
        self.local_time.is_some()
    }

    fn local_time(&self) -> LocalTime {
        self.local_time.unwrap_or(LocalTime::from_minute_of_week(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MonitorEvent;

    #[test]
    fn parses_cloud_reports() {
        assert_eq!(parse_link_line("+CLOUD:1\r\n"), Ok(LinkEvent::Cloud(true)));
        assert_eq!(parse_link_line("+CLOUD:0"), Ok(LinkEvent::Cloud(false)));
        assert_eq!(parse_link_line("+CLOUD:2"), Err(LinkParseError::Malformed));
    }

    #[test]
    fn parses_time_reports() {
        assert_eq!(
            parse_link_line("+TIME:0,09:05\r\n"),
            Ok(LinkEvent::Time(
                LocalTime::new(Weekday::Sunday, 9, 5).expect("valid time")
            ))
        );
        assert_eq!(parse_link_line("+TIME:UNSYNCED"), Ok(LinkEvent::TimeUnsynced));
    }

    #[test]
    fn rejects_out_of_range_time() {
        assert_eq!(parse_link_line("+TIME:7,09:05"), Err(LinkParseError::Malformed));
        assert_eq!(parse_link_line("+TIME:1,24:00"), Err(LinkParseError::Malformed));
        assert_eq!(parse_link_line("+TIME:1,23:60"), Err(LinkParseError::Malformed));
    }

    #[test]
    fn rejects_noise() {
        assert_eq!(parse_link_line(""), Err(LinkParseError::Malformed));
        assert_eq!(parse_link_line("OK"), Err(LinkParseError::Malformed));
        assert_eq!(
            parse_link_line("+CLOUD:1 extra"),
            Err(LinkParseError::TrailingInput)
        );
    }

    #[test]
    fn publish_frame_layout() {
        let notification = Notification::new(MonitorEvent::Heartbeat, "PDC Power Monitor");
        let frame = encode_publish(&notification).expect("frame fits");
        assert!(frame.starts_with("PUB power_outage [{\"key\":\"title\""));
        assert!(frame.contains("\"value\":\"I'm alive\"}]"));
        assert!(frame.ends_with("\r\n"));
    }

    #[test]
    fn state_follows_reports() {
        let mut state = LinkState::default();
        assert!(!state.connected());
        assert_eq!(state.synced_local_time(), None);

        state.apply(LinkEvent::Cloud(true));
        let nine = LocalTime::new(Weekday::Sunday, 9, 0).expect("valid time");
        state.apply(LinkEvent::Time(nine));
        assert!(state.connected());
        assert_eq!(state.synced_local_time(), Some(nine));

        state.apply(LinkEvent::TimeUnsynced);
        assert!(!state.is_time_synced());
    }
}
