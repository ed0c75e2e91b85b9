use embassy_time::{Duration, Ticker};
use monitor_core::monitor::{BootError, MonitorConfig, PowerLossMonitor, TickOutcome};

use crate::hw::board::BoardSensors;
use crate::link::{FirmwareInstant, LinkStatus, ModemLink, NotifySender};
use crate::telemetry;

/// Period of the monitor loop. The monitors rate-limit themselves.
const LOOP_PERIOD: Duration = Duration::from_secs(1);

#[embassy_executor::task]
pub async fn run(
    mut sensors: BoardSensors<'static>,
    status: &'static LinkStatus,
    sender: NotifySender<'static>,
) -> ! {
    let mut link = ModemLink::new(status, sender);
    let mut ticker = Ticker::every(LOOP_PERIOD);
    let config = MonitorConfig::default();

    // Nothing is published until the cloud session is up.
    let mut monitor = loop {
        let now = FirmwareInstant::now();
        match PowerLossMonitor::<FirmwareInstant>::boot(config, now, &mut sensors, &mut link) {
            Ok(monitor) => {
                if let Some(record) = monitor.event_log().latest() {
                    telemetry::log_event(record.event, now.as_millis());
                }
                break monitor;
            }
            Err(err @ BootError::InvalidConfig(_)) => {
                telemetry::log_boot_deferred(err);
                loop {
                    ticker.next().await;
                }
            }
            Err(BootError::NotConnected) => ticker.next().await,
        }
    };

    loop {
        ticker.next().await;
        let now = FirmwareInstant::now();
        if let TickOutcome::Polled(events) = monitor.tick(now, &mut sensors, status, &mut link) {
            for event in events {
                telemetry::log_event(event, now.as_millis());
            }
        }
    }
}
