//! Scheduling loop tying the monitors to sensors, clock and sink.
//!
//! [`PowerLossMonitor`] owns one instance of each monitor and runs them in a
//! fixed order on every [`tick`](PowerLossMonitor::tick): power, battery,
//! heartbeat. Sensors are only read when the monitor that needs them is due.
//! Nothing here blocks; publishing is fire-and-forget through the sink.

mod config;

pub use config::{BOOT_TITLE, ConfigError, MAX_TITLE_LEN, MonitorConfig, NOTIFICATION_TITLE};

use core::fmt;

use heapless::Vec;

use crate::battery::{BatteryMonitor, BatteryState, is_valid_charge};
use crate::heartbeat::HeartbeatScheduler;
use crate::notify::{MonitorEvent, Notification, NotificationSink};
use crate::power::PowerSourceMonitor;
use crate::sensors::{Connectivity, LocalClock, MonitorInstant, PowerSensors, PowerSource};
use crate::status::{HeartbeatStatus, StatusSnapshot};
use crate::telemetry::{EVENT_LOG_CAPACITY, EventLog};

/// Upper bound on events produced by a single tick (power, two battery, heartbeat).
pub const MAX_EVENTS_PER_TICK: usize = 4;

/// Events produced by one tick.
pub type TickEvents = Vec<MonitorEvent, MAX_EVENTS_PER_TICK>;

/// Result of a single [`PowerLossMonitor::tick`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The link was down; nothing was polled.
    Offline,
    /// Monitors ran; carries every event detected, published or not.
    Polled(TickEvents),
}

impl TickOutcome {
    /// Events detected by the tick, empty when offline.
    #[must_use]
    pub fn events(&self) -> &[MonitorEvent] {
        match self {
            TickOutcome::Offline => &[],
            TickOutcome::Polled(events) => events.as_slice(),
        }
    }
}

/// Reasons [`PowerLossMonitor::boot`] refuses to start.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BootError {
    InvalidConfig(ConfigError),
    /// The notification link is not up yet; retry once it connects.
    NotConnected,
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BootError::InvalidConfig(err) => write!(f, "invalid configuration: {err}"),
            BootError::NotConnected => f.write_str("notification link not connected"),
        }
    }
}

impl From<ConfigError> for BootError {
    fn from(err: ConfigError) -> Self {
        BootError::InvalidConfig(err)
    }
}

/// The power-loss monitor.
pub struct PowerLossMonitor<I, const LOG: usize = EVENT_LOG_CAPACITY> {
    config: MonitorConfig,
    power: PowerSourceMonitor<I>,
    battery: BatteryMonitor<I>,
    heartbeat: Option<HeartbeatScheduler<I>>,
    log: EventLog<I, LOG>,
    last_charge: Option<f32>,
}

impl<I, const LOG: usize> PowerLossMonitor<I, LOG>
where
    I: MonitorInstant,
{
    /// Starts the monitor.
    ///
    /// Requires the link to be connected, reads the power source once to seed
    /// the power monitor and publishes the boot notification.
    pub fn boot<S, L>(
        config: MonitorConfig,
        now: I,
        sensors: &mut S,
        link: &mut L,
    ) -> Result<Self, BootError>
    where
        S: PowerSensors + ?Sized,
        L: Connectivity + NotificationSink + ?Sized,
    {
        config.validate()?;
        if !link.connected() {
            return Err(BootError::NotConnected);
        }

        let source = sensors.power_source();
        let mut monitor = Self {
            config,
            power: PowerSourceMonitor::new(source, now, config.power_check_interval),
            battery: BatteryMonitor::new(now, config.battery_check_interval, config.low_battery),
            heartbeat: config.heartbeat.map(|schedule| {
                HeartbeatScheduler::new(schedule, now, config.heartbeat_check_interval)
            }),
            log: EventLog::new(),
            last_charge: None,
        };

        let event = MonitorEvent::Booted(source);
        link.publish(&Notification::new(event, config.boot_title));
        monitor.log.record(event, true, now);

        Ok(monitor)
    }

    /// Runs one pass of the loop.
    pub fn tick<S, C, L>(
        &mut self,
        now: I,
        sensors: &mut S,
        clock: &C,
        link: &mut L,
    ) -> TickOutcome
    where
        S: PowerSensors + ?Sized,
        C: LocalClock + ?Sized,
        L: Connectivity + NotificationSink + ?Sized,
    {
        if !link.connected() {
            return TickOutcome::Offline;
        }

        let mut events = TickEvents::new();

        if self.power.is_due(now) {
            if let Some(event) = self.power.poll(now, sensors.power_source()) {
                let _ = events.push(event);
            }
        }

        if self.battery.is_due(now) {
            let state = sensors.battery_state();
            let charge = sensors.battery_charge_percent();
            self.last_charge = is_valid_charge(charge).then_some(charge);
            for event in self.battery.poll(now, state, charge) {
                let _ = events.push(event);
            }
        }

        if let Some(heartbeat) = self.heartbeat.as_mut() {
            if heartbeat.is_due(now) {
                if let Some(event) = heartbeat.poll(now, clock.synced_local_time()) {
                    let _ = events.push(event);
                }
            }
        }

        for &event in &events {
            self.dispatch(event, now, link);
        }

        TickOutcome::Polled(events)
    }

    fn dispatch<L>(&mut self, event: MonitorEvent, now: I, link: &mut L)
    where
        L: NotificationSink + ?Sized,
    {
        let publish = event.notice().publish;
        if publish {
            link.publish(&Notification::new(event, self.config.notification_title));
        }
        self.log.record(event, publish, now);
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Last confirmed power source.
    pub fn power_source(&self) -> PowerSource {
        self.power.current()
    }

    pub fn battery_state(&self) -> BatteryState {
        self.battery.last_state()
    }

    pub fn low_battery_active(&self) -> bool {
        self.battery.low_battery_active()
    }

    /// Local record of everything the monitor detected.
    pub fn event_log(&self) -> &EventLog<I, LOG> {
        &self.log
    }

    /// Captures the values surfaced by status front-ends.
    pub fn snapshot<C, L>(&self, now: I, clock: &C, link: &L) -> StatusSnapshot
    where
        C: LocalClock + ?Sized,
        L: Connectivity + ?Sized,
    {
        StatusSnapshot {
            power: Some(self.power.current()),
            on_battery_for: self
                .log
                .outage_started()
                .map(|started| now.saturating_duration_since(started)),
            battery: self.battery.last_state(),
            charge_percent: self.last_charge,
            low_battery: self.battery.low_battery_active(),
            link_connected: link.connected(),
            local_time: clock.synced_local_time(),
            heartbeat: self.heartbeat.as_ref().map(|heartbeat| HeartbeatStatus {
                schedule: heartbeat.schedule(),
                sent_this_window: heartbeat.sent_this_window(),
            }),
        }
    }
}
