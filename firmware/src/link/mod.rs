//! Modem link shared between the monitor and modem tasks.
//!
//! The modem task folds unsolicited reports into [`LinkStatus`] and drains the
//! notification queue onto the UART. The monitor task reads the clock straight
//! from [`LinkStatus`] and publishes through [`ModemLink`]; neither ever awaits.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::time::Duration;

#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender, TrySendError};
use embassy_time::Instant;
use monitor_core::link::{LinkEvent, LinkState};
use monitor_core::notify::{Notification, NotificationSink};
use monitor_core::sensors::{Connectivity, LocalClock, LocalTime, MonitorInstant};
use portable_atomic::{AtomicBool, AtomicU16, Ordering};

use crate::telemetry;

/// Depth of the outbound notification queue.
pub const NOTIFY_QUEUE_DEPTH: usize = 8;

#[cfg(target_os = "none")]
type LinkMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
type LinkMutex = NoopRawMutex;

/// Queue carrying notifications from the monitor to the modem task.
pub type NotifyQueue = Channel<LinkMutex, Notification, NOTIFY_QUEUE_DEPTH>;
pub type NotifySender<'a> = Sender<'a, LinkMutex, Notification, NOTIFY_QUEUE_DEPTH>;
pub type NotifyReceiver<'a> = Receiver<'a, LinkMutex, Notification, NOTIFY_QUEUE_DEPTH>;

/// Embassy instant wrapper implementing [`MonitorInstant`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub struct FirmwareInstant(Instant);

impl FirmwareInstant {
    #[cfg(target_os = "none")]
    pub fn now() -> Self {
        Self(Instant::now())
    }

    pub fn as_millis(self) -> u64 {
        self.0.as_millis()
    }
}

impl From<Instant> for FirmwareInstant {
    fn from(value: Instant) -> Self {
        Self(value)
    }
}

impl MonitorInstant for FirmwareInstant {
    fn saturating_duration_since(&self, earlier: Self) -> Duration {
        let elapsed = self.0.saturating_duration_since(earlier.0);
        Duration::from_micros(elapsed.as_micros())
    }
}

/// Minute-of-week value stored while the modem has no network time.
const TIME_UNSYNCED: u16 = u16::MAX;

/// Lock-free view of the modem's last reports.
///
/// The link counts as connected while the last `+CLOUD` report was up and the
/// modem has not gone silent. Any report after a silence revives the last
/// cloud state, since the modem only repeats `+CLOUD` when it changes.
pub struct LinkStatus {
    cloud_connected: AtomicBool,
    modem_silent: AtomicBool,
    minute_of_week: AtomicU16,
}

impl LinkStatus {
    pub const fn new() -> Self {
        Self {
            cloud_connected: AtomicBool::new(false),
            modem_silent: AtomicBool::new(false),
            minute_of_week: AtomicU16::new(TIME_UNSYNCED),
        }
    }

    /// Folds a modem report into the status.
    pub fn apply(&self, event: LinkEvent) {
        self.modem_silent.store(false, Ordering::Release);
        match event {
            LinkEvent::Cloud(up) => self.cloud_connected.store(up, Ordering::Release),
            LinkEvent::Time(local) => {
                let minute = u16::try_from(local.minute_of_week()).unwrap_or(TIME_UNSYNCED);
                self.minute_of_week.store(minute, Ordering::Release);
            }
            LinkEvent::TimeUnsynced => self.minute_of_week.store(TIME_UNSYNCED, Ordering::Release),
        }
    }

    /// Drops connectivity until the modem reports again.
    pub fn mark_silent(&self) {
        self.modem_silent.store(true, Ordering::Release);
    }

    pub fn snapshot(&self) -> LinkState {
        let minute = self.minute_of_week.load(Ordering::Acquire);
        LinkState {
            cloud_connected: self.cloud_connected.load(Ordering::Acquire)
                && !self.modem_silent.load(Ordering::Acquire),
            local_time: (minute != TIME_UNSYNCED)
                .then(|| LocalTime::from_minute_of_week(u32::from(minute))),
        }
    }
}

impl LocalClock for LinkStatus {
    fn is_time_synced(&self) -> bool {
        self.snapshot().is_time_synced()
    }

    fn local_time(&self) -> LocalTime {
        self.snapshot().local_time()
    }
}

impl Default for LinkStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Monitor-side handle on the modem link.
pub struct ModemLink<'a> {
    status: &'a LinkStatus,
    sender: NotifySender<'a>,
    dropped: u32,
}

impl<'a> ModemLink<'a> {
    pub fn new(status: &'a LinkStatus, sender: NotifySender<'a>) -> Self {
        Self {
            status,
            sender,
            dropped: 0,
        }
    }

    /// Number of notifications dropped because the queue was full.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl Connectivity for ModemLink<'_> {
    fn connected(&self) -> bool {
        self.status.snapshot().connected()
    }
}

impl NotificationSink for ModemLink<'_> {
    fn publish(&mut self, notification: &Notification) {
        match self.sender.try_send(*notification) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                self.dropped = self.dropped.wrapping_add(1);
                telemetry::log_notification_dropped(&dropped, self.dropped);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monitor_core::notify::MonitorEvent;
    use monitor_core::sensors::Weekday;

    #[test]
    fn status_round_trips_reports() {
        let status = LinkStatus::new();
        assert_eq!(status.snapshot(), LinkState::default());

        let local = LocalTime::new(Weekday::Saturday, 23, 59).expect("valid");
        status.apply(LinkEvent::Cloud(true));
        status.apply(LinkEvent::Time(local));
        let snapshot = status.snapshot();
        assert!(snapshot.cloud_connected);
        assert_eq!(snapshot.local_time, Some(local));
        assert_eq!(status.synced_local_time(), Some(local));

        status.apply(LinkEvent::TimeUnsynced);
        status.apply(LinkEvent::Cloud(false));
        assert_eq!(status.snapshot(), LinkState::default());
    }

    #[test]
    fn any_report_after_silence_restores_link() {
        let status = LinkStatus::new();
        status.apply(LinkEvent::Cloud(true));
        status.mark_silent();
        assert!(!status.snapshot().cloud_connected);

        let local = LocalTime::new(Weekday::Monday, 6, 0).expect("valid");
        status.apply(LinkEvent::Time(local));
        let snapshot = status.snapshot();
        assert!(snapshot.cloud_connected);
        assert_eq!(snapshot.local_time, Some(local));

        status.apply(LinkEvent::Cloud(false));
        status.mark_silent();
        status.apply(LinkEvent::TimeUnsynced);
        assert!(!status.snapshot().cloud_connected);
    }

    #[test]
    fn full_queue_drops_without_blocking() {
        let queue = NotifyQueue::new();
        let status = LinkStatus::new();
        let mut link = ModemLink::new(&status, queue.sender());
        let notification = Notification::new(MonitorEvent::LowBattery, "PDC Power Monitor");

        for _ in 0..NOTIFY_QUEUE_DEPTH + 2 {
            link.publish(&notification);
        }

        assert_eq!(link.dropped(), 2);
        assert_eq!(queue.len(), NOTIFY_QUEUE_DEPTH);
        assert_eq!(queue.try_receive().map(|n| n.message), Ok("Low Battery"));
    }

    #[test]
    fn instant_wrapper_saturates() {
        let earlier = FirmwareInstant::from(Instant::from_millis(1_500));
        let later = FirmwareInstant::from(Instant::from_millis(4_000));
        assert_eq!(
            later.saturating_duration_since(earlier),
            Duration::from_millis(2_500)
        );
        assert_eq!(earlier.saturating_duration_since(later), Duration::ZERO);
    }
}
