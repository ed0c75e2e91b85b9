use core::time::Duration;

use monitor_core::heartbeat::{HEARTBEAT_CHECK_INTERVAL, HeartbeatSchedule, HeartbeatScheduler};
use monitor_core::notify::MonitorEvent;
use monitor_core::sensors::{LocalTime, MINUTES_PER_WEEK, Ticks, Weekday};

fn scheduler() -> HeartbeatScheduler<Ticks> {
    HeartbeatScheduler::new(
        HeartbeatSchedule::WEEKLY_DEFAULT,
        Ticks::ZERO,
        HEARTBEAT_CHECK_INTERVAL,
    )
}

/// Polls every 15 minutes for `weeks`, starting at `start`, and returns when heartbeats fired.
fn run_weeks(start: LocalTime, weeks: u32) -> Vec<LocalTime> {
    let mut heartbeat = scheduler();
    let step_minutes = 15;
    let steps = weeks * MINUTES_PER_WEEK / step_minutes;

    (1..=steps)
        .filter_map(|step| {
            let now = Ticks::ZERO + Duration::from_secs(u64::from(step * step_minutes) * 60);
            let local = start.advanced_by(step * step_minutes);
            heartbeat.poll(now, Some(local)).map(|event| {
                assert_eq!(event, MonitorEvent::Heartbeat);
                local
            })
        })
        .collect()
}

#[test]
fn one_heartbeat_per_week() {
    let monday = LocalTime::new(Weekday::Monday, 0, 0).expect("valid");
    let fired = run_weeks(monday, 1);
    assert_eq!(
        fired,
        vec![LocalTime::new(Weekday::Sunday, 9, 0).expect("valid")]
    );
}

#[test]
fn one_heartbeat_per_week_over_a_month() {
    let wednesday = LocalTime::new(Weekday::Wednesday, 13, 7).expect("valid");
    let fired = run_weeks(wednesday, 4);
    assert_eq!(fired.len(), 4);
    assert!(fired.iter().all(|local| local.weekday == Weekday::Sunday));
    assert!(fired.iter().all(|local| (local.hour, local.minute) >= (9, 0)));
}

#[test]
fn booting_mid_window_still_sends() {
    let sunday_afternoon = LocalTime::new(Weekday::Sunday, 14, 0).expect("valid");
    let mut heartbeat = scheduler();
    let now = Ticks::ZERO + HEARTBEAT_CHECK_INTERVAL;
    assert_eq!(
        heartbeat.poll(now, Some(sunday_afternoon.advanced_by(15))),
        Some(MonitorEvent::Heartbeat)
    );
}

#[test]
fn unsynced_clock_never_fires_or_mutates() {
    let mut heartbeat = scheduler();
    for step in 1..=(MINUTES_PER_WEEK / 15) {
        let now = Ticks::ZERO + Duration::from_secs(u64::from(step) * 15 * 60);
        assert_eq!(heartbeat.poll(now, None), None);
        assert!(!heartbeat.sent_this_window());
        assert!(heartbeat.is_due(now));
    }
}

#[test]
fn custom_schedule_is_honoured() {
    let schedule = HeartbeatSchedule::new(Weekday::Friday, 17, 30);
    let mut heartbeat = HeartbeatScheduler::new(schedule, Ticks::ZERO, HEARTBEAT_CHECK_INTERVAL);

    let at = |minutes: u64| Ticks::ZERO + Duration::from_secs(minutes * 60);
    let friday = |hour, minute| LocalTime::new(Weekday::Friday, hour, minute);

    assert_eq!(heartbeat.poll(at(15), friday(17, 15)), None);
    assert_eq!(
        heartbeat.poll(at(30), friday(17, 30)),
        Some(MonitorEvent::Heartbeat)
    );
    assert_eq!(heartbeat.poll(at(45), friday(17, 45)), None);
}
