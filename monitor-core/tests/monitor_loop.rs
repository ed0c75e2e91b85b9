use core::time::Duration;

use monitor_core::battery::BatteryState;
use monitor_core::monitor::{
    BOOT_TITLE, BootError, MonitorConfig, NOTIFICATION_TITLE, PowerLossMonitor, TickOutcome,
};
use monitor_core::notify::{MonitorEvent, Notification, NotificationSink};
use monitor_core::sensors::{
    Connectivity, LocalClock, LocalTime, PowerSensors, PowerSource, Ticks, Weekday,
};
use monitor_core::status::StatusFormatter;

struct SimBoard {
    source: PowerSource,
    state: BatteryState,
    charge: f32,
}

impl SimBoard {
    fn new() -> Self {
        Self {
            source: PowerSource::External,
            state: BatteryState::Charged,
            charge: 100.0,
        }
    }
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

struct SimClock(Option<LocalTime>);

impl LocalClock for SimClock {
    fn is_time_synced(&self) -> bool {
        self.0.is_some()
    }

    fn local_time(&self) -> LocalTime {
        self.0.unwrap_or(LocalTime::from_minute_of_week(0))
    }
}

#[derive(Default)]
struct RecordingLink {
    up: bool,
    sent: Vec<Notification>,
}

impl RecordingLink {
    fn connected() -> Self {
        Self {
            up: true,
            sent: Vec::new(),
        }
    }

    fn messages(&self) -> Vec<&'static str> {
        self.sent.iter().map(|n| n.message).collect()
    }
}

impl Connectivity for RecordingLink {
    fn connected(&self) -> bool {
        self.up
    }
}

impl NotificationSink for RecordingLink {
    fn publish(&mut self, notification: &Notification) {
        self.sent.push(*notification);
    }
}

fn minute(n: u64) -> Ticks {
    Ticks::ZERO + Duration::from_secs(n * 60)
}

fn boot(board: &mut SimBoard, link: &mut RecordingLink) -> PowerLossMonitor<Ticks> {
    PowerLossMonitor::boot(MonitorConfig::default(), Ticks::ZERO, board, link).expect("boot")
}

#[test]
fn boot_publishes_power_source_under_boot_title() {
    let mut board = SimBoard::new();
    board.source = PowerSource::Battery;
    let mut link = RecordingLink::connected();

    let monitor = boot(&mut board, &mut link);

    assert_eq!(link.sent.len(), 1);
    assert_eq!(link.sent[0].title, BOOT_TITLE);
    assert_eq!(link.sent[0].message, "Power Source: battery");
    assert_eq!(monitor.power_source(), PowerSource::Battery);
    assert_eq!(monitor.event_log().len(), 1);
}

#[test]
fn boot_waits_for_connectivity() {
    let mut board = SimBoard::new();
    let mut link = RecordingLink::default();
    let result =
        PowerLossMonitor::<Ticks>::boot(MonitorConfig::default(), Ticks::ZERO, &mut board, &mut link);
    assert!(matches!(result, Err(BootError::NotConnected)));
    assert!(link.sent.is_empty());
}

#[test]
fn power_sequence_publishes_lost_then_restored() {
    use PowerSource::{Battery, External};

    let mut board = SimBoard::new();
    let mut link = RecordingLink::connected();
    let clock = SimClock(None);
    let mut monitor = boot(&mut board, &mut link);
    link.sent.clear();

    for (index, source) in [External, External, Battery, Battery, External]
        .into_iter()
        .enumerate()
    {
        board.source = source;
        monitor.tick(minute(index as u64 + 1), &mut board, &clock, &mut link);
    }

    let power_messages: Vec<_> = link
        .sent
        .iter()
        .filter(|n| matches!(n.event, MonitorEvent::PowerLost | MonitorEvent::PowerRestored))
        .map(|n| (n.title, n.message))
        .collect();
    assert_eq!(
        power_messages,
        vec![
            (NOTIFICATION_TITLE, "AC power lost"),
            (NOTIFICATION_TITLE, "AC power is on"),
        ]
    );

    let restored = monitor
        .event_log()
        .oldest_first()
        .find(|record| record.event == MonitorEvent::PowerRestored)
        .expect("restore logged");
    assert_eq!(restored.outage, Some(Duration::from_secs(120)));
}

#[test]
fn silent_battery_states_are_logged_but_not_published() {
    let mut board = SimBoard::new();
    let mut link = RecordingLink::connected();
    let clock = SimClock(None);
    let mut monitor = boot(&mut board, &mut link);
    link.sent.clear();

    board.state = BatteryState::Charging;
    board.charge = 50.0;
    let outcome = monitor.tick(Ticks::from_secs(30), &mut board, &clock, &mut link);
    assert_eq!(
        outcome.events(),
        &[MonitorEvent::BatteryStateChanged {
            from: BatteryState::Unknown,
            to: BatteryState::Charging,
        }]
    );
    assert!(link.sent.is_empty());

    let latest = monitor.event_log().latest().expect("logged");
    assert!(!latest.published);

    board.state = BatteryState::Fault;
    monitor.tick(Ticks::from_secs(60), &mut board, &clock, &mut link);
    assert_eq!(link.messages(), vec!["battery fault!"]);
}

#[test]
fn low_battery_and_state_change_share_a_tick() {
    let mut board = SimBoard::new();
    let mut link = RecordingLink::connected();
    let clock = SimClock(None);
    let mut monitor = boot(&mut board, &mut link);
    link.sent.clear();

    board.source = PowerSource::Battery;
    board.state = BatteryState::NotCharging;
    board.charge = 7.5;
    let outcome = monitor.tick(minute(1), &mut board, &clock, &mut link);

    assert_eq!(
        outcome.events(),
        &[
            MonitorEvent::PowerLost,
            MonitorEvent::BatteryStateChanged {
                from: BatteryState::Unknown,
                to: BatteryState::NotCharging,
            },
            MonitorEvent::LowBattery,
        ]
    );
    assert_eq!(
        link.messages(),
        vec!["AC power lost", "battery is not charging", "Low Battery"]
    );
    assert!(monitor.low_battery_active());
}

#[test]
fn offline_ticks_do_not_advance_monitors() {
    let mut board = SimBoard::new();
    let mut link = RecordingLink::connected();
    let clock = SimClock(None);
    let mut monitor = boot(&mut board, &mut link);
    link.sent.clear();

    link.up = false;
    board.source = PowerSource::Battery;
    assert_eq!(
        monitor.tick(minute(5), &mut board, &clock, &mut link),
        TickOutcome::Offline
    );
    assert_eq!(monitor.power_source(), PowerSource::External);

    link.up = true;
    monitor.tick(minute(6), &mut board, &clock, &mut link);
    assert_eq!(link.messages()[0], "AC power lost");
}

#[test]
fn heartbeat_fires_through_loop_when_clock_synced() {
    let mut board = SimBoard::new();
    let mut link = RecordingLink::connected();
    let mut monitor = boot(&mut board, &mut link);
    link.sent.clear();

    let unsynced = SimClock(None);
    monitor.tick(minute(15), &mut board, &unsynced, &mut link);
    assert!(link.sent.is_empty());

    let synced = SimClock(LocalTime::new(Weekday::Sunday, 9, 0));
    monitor.tick(minute(16), &mut board, &synced, &mut link);
    assert_eq!(link.messages(), vec!["I'm alive"]);

    monitor.tick(minute(31), &mut board, &synced, &mut link);
    assert_eq!(link.sent.len(), 1);
}

#[test]
fn disabled_heartbeat_never_fires() {
    let mut board = SimBoard::new();
    let mut link = RecordingLink::connected();
    let config = MonitorConfig::new().with_heartbeat(None);
    let mut monitor =
        PowerLossMonitor::<Ticks>::boot(config, Ticks::ZERO, &mut board, &mut link).expect("boot");
    link.sent.clear();

    let synced = SimClock(LocalTime::new(Weekday::Sunday, 9, 0));
    monitor.tick(minute(15), &mut board, &synced, &mut link);
    assert!(link.sent.is_empty());
}

#[test]
fn status_reflects_outage() {
    let mut board = SimBoard::new();
    let mut link = RecordingLink::connected();
    let clock = SimClock(LocalTime::new(Weekday::Tuesday, 7, 30));
    let mut monitor = boot(&mut board, &mut link);

    board.source = PowerSource::Battery;
    board.state = BatteryState::Discharging;
    board.charge = 64.0;
    monitor.tick(minute(1), &mut board, &clock, &mut link);

    let snapshot = monitor.snapshot(minute(3), &clock, &link);
    let formatter = StatusFormatter::new(&snapshot);

    let mut line = String::new();
    formatter.write_power_line(&mut line).expect("format");
    assert_eq!(line, "power source=battery outage=+2m00s");

    line.clear();
    formatter.write_battery_line(&mut line).expect("format");
    assert_eq!(line, "battery state=discharging charge=64.0% low=false");

    line.clear();
    formatter.write_clock_line(&mut line).expect("format");
    assert_eq!(line, "clock time=tue 07:30 link=up heartbeat=sun 09:00 sent=no");
}

#[test]
fn unavailable_charge_clears_reported_charge() {
    let mut board = SimBoard::new();
    let mut link = RecordingLink::connected();
    let clock = SimClock(None);
    let mut monitor = boot(&mut board, &mut link);

    board.charge = 80.0;
    monitor.tick(Ticks::from_secs(30), &mut board, &clock, &mut link);
    assert_eq!(
        monitor.snapshot(Ticks::from_secs(30), &clock, &link).charge_percent,
        Some(80.0)
    );

    board.state = BatteryState::Disconnected;
    board.charge = -1.0;
    monitor.tick(Ticks::from_secs(60), &mut board, &clock, &mut link);
    let snapshot = monitor.snapshot(Ticks::from_secs(60), &clock, &link);
    assert_eq!(snapshot.charge_percent, None);

    let mut line = String::new();
    StatusFormatter::new(&snapshot)
        .write_battery_line(&mut line)
        .expect("format");
    assert_eq!(line, "battery state=disconnected charge=n/a low=false");
}

#[test]
fn booting_on_battery_reports_outage_since_boot() {
    let mut board = SimBoard::new();
    board.source = PowerSource::Battery;
    let mut link = RecordingLink::connected();
    let clock = SimClock(None);
    let mut monitor = boot(&mut board, &mut link);

    let snapshot = monitor.snapshot(minute(5), &clock, &link);
    assert_eq!(snapshot.on_battery_for, Some(Duration::from_secs(300)));

    board.source = PowerSource::External;
    monitor.tick(minute(6), &mut board, &clock, &mut link);
    let restored = monitor
        .event_log()
        .oldest_first()
        .find(|record| record.event == MonitorEvent::PowerRestored)
        .expect("restore logged");
    assert_eq!(restored.outage, Some(Duration::from_secs(360)));
    assert_eq!(monitor.snapshot(minute(7), &clock, &link).on_battery_for, None);
}
