use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use monitor_core::battery::{BatteryState, is_valid_charge};
use monitor_core::link::{LinkEvent, LinkState, encode_publish, parse_link_line};
use monitor_core::monitor::{BootError, MonitorConfig, PowerLossMonitor, TickOutcome};
use monitor_core::notify::{LogLevel, MonitorEvent, Notification, NotificationSink};
use monitor_core::sensors::{
    Connectivity, LocalClock, LocalTime, PowerSensors, PowerSource, Ticks, Weekday,
};
use monitor_core::status::{StatusFormatter, StatusSnapshot};

/// Resolution of the simulated monitor loop.
const STEP: Duration = Duration::from_secs(1);

/// Longest span a single `advance` may cover.
const MAX_ADVANCE: Duration = Duration::from_secs(60 * 24 * 60 * 60);

pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "status",
        "status                         - show power, battery and clock state",
    ),
    (
        "history",
        "history                        - list the local event log",
    ),
    (
        "power",
        "power external|battery         - set the simulated power source",
    ),
    (
        "battery",
        "battery <state>                - set the charger state (unknown, not-charging, charging, charged, discharging, fault, disconnected)",
    ),
    (
        "charge",
        "charge <percent>|n/a           - set the battery charge reading",
    ),
    (
        "link",
        "link up|down                   - bring the cloud session up or down",
    ),
    (
        "time",
        "time <day> <HH:MM>|unsynced    - set or clear the local clock",
    ),
    (
        "modem",
        "modem <line>                   - feed a raw modem report (e.g. +CLOUD:1)",
    ),
    (
        "advance",
        "advance <N>(s|m|h|d)           - run the monitor loop for simulated time",
    ),
    (
        "help",
        "help [topic]                   - show help for a command",
    ),
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TranscriptProfile {
    Outage,
    LowBattery,
    Heartbeat,
}

impl TranscriptProfile {
    pub fn log_path(self) -> &'static str {
        match self {
            TranscriptProfile::Outage => "transcripts/emulator-outage.log",
            TranscriptProfile::LowBattery => "transcripts/emulator-low-battery.log",
            TranscriptProfile::Heartbeat => "transcripts/emulator-heartbeat.log",
        }
    }

    pub fn header(self) -> &'static str {
        match self {
            TranscriptProfile::Outage => "Power monitor emulator outage transcript",
            TranscriptProfile::LowBattery => "Power monitor emulator low-battery transcript",
            TranscriptProfile::Heartbeat => "Power monitor emulator heartbeat transcript",
        }
    }

    pub fn from_tag(tag: &str) -> Result<Self, String> {
        if tag.eq_ignore_ascii_case("outage") {
            Ok(Self::Outage)
        } else if tag.eq_ignore_ascii_case("low-battery") {
            Ok(Self::LowBattery)
        } else if tag.eq_ignore_ascii_case("heartbeat") {
            Ok(Self::Heartbeat)
        } else {
            Err(format!("Unknown transcript profile `{tag}`"))
        }
    }
}

/// Sensor values driven by commands.
struct SimBoard {
    source: PowerSource,
    state: BatteryState,
    charge: f32,
}

impl PowerSensors for SimBoard {
    fn power_source(&mut self) -> PowerSource {
        self.source
    }

    fn battery_state(&mut self) -> BatteryState {
        self.state
    }

    fn battery_charge_percent(&mut self) -> f32 {
        self.charge
    }
}

/// Simulated modem: link state plus every frame the monitor asked it to send.
#[derive(Default)]
struct SimModem {
    state: LinkState,
    outbox: Vec<Notification>,
}

impl Connectivity for SimModem {
    fn connected(&self) -> bool {
        self.state.connected()
    }
}

impl NotificationSink for SimModem {
    fn publish(&mut self, notification: &Notification) {
        self.outbox.push(*notification);
    }
}

pub struct Session {
    config: MonitorConfig,
    board: SimBoard,
    modem: SimModem,
    monitor: Option<PowerLossMonitor<Ticks>>,
    now: Ticks,
    /// Seconds elapsed since the local clock last ticked over a minute.
    clock_seconds: u64,
    transcript: Option<TranscriptLogger>,
}

impl Session {
    pub fn new(profile: Option<TranscriptProfile>) -> io::Result<Self> {
        let transcript = profile.map(TranscriptLogger::new).transpose()?;
        Ok(Self {
            config: MonitorConfig::default(),
            board: SimBoard {
                source: PowerSource::External,
                state: BatteryState::Charged,
                charge: 100.0,
            },
            modem: SimModem::default(),
            monitor: None,
            now: Ticks::ZERO,
            clock_seconds: 0,
            transcript,
        })
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let now = self.now;
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.append_line(now, TranscriptRole::Host, trimmed)?;
        }

        let (command, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (trimmed, ""),
        };

        let lines = match command.to_ascii_lowercase().as_str() {
            "help" => handle_help(rest),
            "status" => self.handle_status(),
            "history" => self.handle_history(),
            "power" => self.handle_power(rest),
            "battery" => self.handle_battery(rest),
            "charge" => self.handle_charge(rest),
            "link" => self.handle_link(rest),
            "time" => self.handle_time(rest),
            "modem" => self.handle_modem(rest),
            "advance" => self.handle_advance(rest),
            other => vec![format!("ERR unknown command `{other}` (try `help`)")],
        };

        self.record_output(&lines)?;
        Ok(lines)
    }

    /// Monitor instance, once booted.
    #[cfg(test)]
    pub fn monitor(&self) -> Option<&PowerLossMonitor<Ticks>> {
        self.monitor.as_ref()
    }

    fn handle_status(&self) -> Vec<String> {
        let snapshot = match &self.monitor {
            Some(monitor) => monitor.snapshot(self.now, &self.modem.state, &self.modem),
            None => StatusSnapshot {
                link_connected: self.modem.connected(),
                local_time: self.modem.state.synced_local_time(),
                ..StatusSnapshot::unknown()
            },
        };

        let formatter = StatusFormatter::new(&snapshot);
        let mut power = String::new();
        let mut battery = String::new();
        let mut clock = String::new();
        let rendered = formatter
            .write_power_line(&mut power)
            .and_then(|()| formatter.write_battery_line(&mut battery))
            .and_then(|()| formatter.write_clock_line(&mut clock));
        if rendered.is_err() {
            return vec!["ERR status unavailable".to_string()];
        }

        let mut lines = vec![power, battery, clock];
        if self.monitor.is_none() {
            lines.push("monitor not booted (waiting for link)".to_string());
        }
        lines
    }

    fn handle_history(&self) -> Vec<String> {
        let Some(monitor) = &self.monitor else {
            return vec!["history empty (monitor not booted)".to_string()];
        };

        monitor
            .event_log()
            .oldest_first()
            .map(|record| {
                let mut line = format!(
                    "#{:<3} {} {} published={}",
                    record.id,
                    format_stamp(record.timestamp),
                    record.event,
                    if record.published { "yes" } else { "no" },
                );
                if let Some(outage) = record.outage {
                    line.push_str(&format!(" outage={}s", outage.as_secs()));
                }
                line
            })
            .collect()
    }

    fn handle_power(&mut self, arg: &str) -> Vec<String> {
        let source = if arg.eq_ignore_ascii_case("external") {
            PowerSource::External
        } else if arg.eq_ignore_ascii_case("battery") {
            PowerSource::Battery
        } else {
            return vec!["ERR usage: power external|battery".to_string()];
        };
        self.board.source = source;
        vec![format!("OK power source={source}")]
    }

    fn handle_battery(&mut self, arg: &str) -> Vec<String> {
        match BatteryState::from_label(arg) {
            Some(state) => {
                self.board.state = state;
                vec![format!("OK battery state={state}")]
            }
            None => vec![format!("ERR unknown battery state `{arg}`")],
        }
    }

    fn handle_charge(&mut self, arg: &str) -> Vec<String> {
        if arg.eq_ignore_ascii_case("n/a") {
            self.board.charge = -1.0;
            return vec!["OK charge=n/a".to_string()];
        }
        match arg.trim_end_matches('%').parse::<f32>() {
            Ok(charge) => {
                self.board.charge = charge;
                if is_valid_charge(charge) {
                    vec![format!("OK charge={charge:.1}%")]
                } else {
                    vec![format!(
                        "OK charge={charge:.1}% (outside 0-100, read as unavailable)"
                    )]
                }
            }
            Err(_) => vec![format!("ERR invalid charge `{arg}`")],
        }
    }

    fn handle_link(&mut self, arg: &str) -> Vec<String> {
        let up = if arg.eq_ignore_ascii_case("up") {
            true
        } else if arg.eq_ignore_ascii_case("down") {
            false
        } else {
            return vec!["ERR usage: link up|down".to_string()];
        };
        self.apply_link_event(LinkEvent::Cloud(up))
    }

    fn handle_time(&mut self, arg: &str) -> Vec<String> {
        if arg.eq_ignore_ascii_case("unsynced") {
            return self.apply_link_event(LinkEvent::TimeUnsynced);
        }

        match parse_local_time(arg) {
            Ok(local) => self.apply_link_event(LinkEvent::Time(local)),
            Err(message) => vec![format!("ERR {message}")],
        }
    }

    fn handle_modem(&mut self, arg: &str) -> Vec<String> {
        match parse_link_line(arg) {
            Ok(event) => self.apply_link_event(event),
            Err(err) => vec![format!("ERR modem {err}")],
        }
    }

    fn apply_link_event(&mut self, event: LinkEvent) -> Vec<String> {
        self.modem.state.apply(event);
        if matches!(event, LinkEvent::Time(_)) {
            self.clock_seconds = 0;
        }

        let mut lines = vec![match event {
            LinkEvent::Cloud(up) => format!("OK link {}", if up { "up" } else { "down" }),
            LinkEvent::Time(local) => format!("OK time {local}"),
            LinkEvent::TimeUnsynced => "OK time unsynced".to_string(),
        }];
        self.try_boot(&mut lines);
        lines
    }

    fn handle_advance(&mut self, arg: &str) -> Vec<String> {
        let span = match parse_span(arg) {
            Ok(span) => span,
            Err(message) => return vec![format!("ERR {message}")],
        };

        let mut lines = Vec::new();
        let steps = span.as_secs();
        for _ in 0..steps {
            self.step(&mut lines);
        }
        lines.push(format!("OK advanced {}s now={}", steps, format_stamp(self.now)));
        lines
    }

    /// Moves simulated time forward by one loop period and runs the monitor.
    fn step(&mut self, lines: &mut Vec<String>) {
        self.now = self.now + STEP;
        self.clock_seconds += STEP.as_secs();
        if self.clock_seconds >= 60 {
            self.clock_seconds -= 60;
            if let Some(local) = self.modem.state.local_time {
                self.modem.state.local_time = Some(local.advanced_by(1));
            }
        }

        self.try_boot(lines);

        let Some(monitor) = self.monitor.as_mut() else {
            return;
        };
        let clock = self.modem.state;
        let outcome = monitor.tick(self.now, &mut self.board, &clock, &mut self.modem);
        if let TickOutcome::Polled(events) = outcome {
            describe_events(self.now, &events, &mut self.modem.outbox, lines);
        }
    }

    fn try_boot(&mut self, lines: &mut Vec<String>) {
        if self.monitor.is_some() || !self.modem.connected() {
            return;
        }

        match PowerLossMonitor::boot(self.config, self.now, &mut self.board, &mut self.modem) {
            Ok(monitor) => {
                self.monitor = Some(monitor);
                let booted = MonitorEvent::Booted(self.board.source);
                describe_events(self.now, &[booted], &mut self.modem.outbox, lines);
            }
            Err(BootError::NotConnected) => {}
            Err(err @ BootError::InvalidConfig(_)) => {
                lines.push(format!("ERR boot {err}"));
            }
        }
    }

    fn record_output(&mut self, lines: &[String]) -> io::Result<()> {
        let now = self.now;
        if let Some(transcript) = self.transcript.as_mut() {
            for line in lines {
                transcript.append_line(now, TranscriptRole::Emulator, line)?;
            }
        }
        Ok(())
    }
}

/// Renders events for the console: published ones as the modem frame, the rest as log lines.
fn describe_events(
    now: Ticks,
    events: &[MonitorEvent],
    outbox: &mut Vec<Notification>,
    lines: &mut Vec<String>,
) {
    let stamp = format_stamp(now);
    for notification in outbox.drain(..) {
        match encode_publish(&notification) {
            Ok(frame) => lines.push(format!("{stamp} {}", frame.trim_end())),
            Err(err) => lines.push(format!("{stamp} ERR encode {err}")),
        }
    }

    for event in events {
        let notice = event.notice();
        if !notice.publish {
            let level = match notice.level {
                LogLevel::Info => "INFO",
                LogLevel::Warn => "WARN",
                LogLevel::Error => "ERROR",
            };
            lines.push(format!("{stamp} LOG {level} {}", notice.message));
        }
    }
}

fn handle_help(topic: &str) -> Vec<String> {
    let mut lines = Vec::new();
    if topic.is_empty() {
        lines.push("Available commands:".to_string());
        for (_, detail) in HELP_TOPICS {
            lines.push(format!("  {detail}"));
        }
        lines.push("Type `help <topic>` for a specific command.".to_string());
    } else if let Some((_, detail)) = HELP_TOPICS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(topic))
    {
        lines.push((*detail).to_string());
    } else {
        lines.push(format!("No help available for `{topic}`."));
        lines.push(format!("Available topics: {}", help_topic_list()));
    }
    lines
}

fn help_topic_list() -> String {
    HELP_TOPICS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parses `<day> <HH:MM>`.
fn parse_local_time(arg: &str) -> Result<LocalTime, String> {
    let usage = || "usage: time <day> <HH:MM>|unsynced".to_string();
    let (day, clock) = arg.split_once(char::is_whitespace).ok_or_else(usage)?;
    let weekday = Weekday::from_name(day.trim()).ok_or_else(|| format!("unknown day `{day}`"))?;
    let (hour, minute) = clock.trim().split_once(':').ok_or_else(usage)?;
    let hour = hour.parse::<u8>().map_err(|_| usage())?;
    let minute = minute.parse::<u8>().map_err(|_| usage())?;
    LocalTime::new(weekday, hour, minute).ok_or_else(|| format!("invalid time `{clock}`"))
}

/// Parses `<N>(s|m|h|d)`.
fn parse_span(arg: &str) -> Result<Duration, String> {
    let usage = || "usage: advance <N>(s|m|h|d)".to_string();
    let split = arg
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(usage)?;
    let (count, unit) = arg.split_at(split);
    let count = count.parse::<u64>().map_err(|_| usage())?;
    let unit_secs = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        _ => return Err(usage()),
    };
    let span = Duration::from_secs(count.saturating_mul(unit_secs));
    if span > MAX_ADVANCE {
        return Err(format!("advance limited to {}d", MAX_ADVANCE.as_secs() / 86_400));
    }
    Ok(span)
}

fn format_stamp(at: Ticks) -> String {
    let secs = at.as_millis() / 1_000;
    let (days, hours, minutes, seconds) = (
        secs / 86_400,
        (secs / 3_600) % 24,
        (secs / 60) % 60,
        secs % 60,
    );
    format!("[t+{days}d{hours:02}:{minutes:02}:{seconds:02}]")
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn new(profile: TranscriptProfile) -> io::Result<Self> {
        let path = Path::new(profile.log_path());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        logger.write_header(profile)?;
        Ok(logger)
    }

    fn write_header(&mut self, profile: TranscriptProfile) -> io::Result<()> {
        writeln!(self.writer, "# {}", profile.header())?;
        writeln!(self.writer, "# Timestamps are simulated time since power-on")?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(&mut self, at: Ticks, role: TranscriptRole, line: &str) -> io::Result<()> {
        writeln!(self.writer, "{} {} {}", format_stamp(at), role.prefix(), line)?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}
