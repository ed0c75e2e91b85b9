//! Logging helpers.
//!
//! Events go to defmt over RTT on the target and to stdout on the host. The
//! level of each monitor event follows its notice.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use monitor_core::link::{LinkEvent, LinkParseError};
use monitor_core::monitor::BootError;
use monitor_core::notify::{LogLevel, MonitorEvent, Notification, PayloadError};

/// Logs a monitor event at the level its notice asks for.
pub fn log_event(event: MonitorEvent, timestamp_ms: u64) {
    let notice = event.notice();
    let scope = if notice.publish { "publish" } else { "local" };
    emit_event(notice.level, scope, event, notice.message, timestamp_ms);
}

#[cfg(target_os = "none")]
fn emit_event(
    level: LogLevel,
    scope: &'static str,
    event: MonitorEvent,
    message: &'static str,
    timestamp_ms: u64,
) {
    let event = defmt::Display2Format(&event);
    match level {
        LogLevel::Info => {
            defmt::info!("monitor:{} {} \"{}\" t={}ms", scope, event, message, timestamp_ms);
        }
        LogLevel::Warn => {
            defmt::warn!("monitor:{} {} \"{}\" t={}ms", scope, event, message, timestamp_ms);
        }
        LogLevel::Error => {
            defmt::error!("monitor:{} {} \"{}\" t={}ms", scope, event, message, timestamp_ms);
        }
    }
}

#[cfg(not(target_os = "none"))]
fn emit_event(
    level: LogLevel,
    scope: &'static str,
    event: MonitorEvent,
    message: &'static str,
    timestamp_ms: u64,
) {
    let level = match level {
        LogLevel::Info => "INFO",
        LogLevel::Warn => "WARN",
        LogLevel::Error => "ERROR",
    };
    println!("{level} monitor:{scope} {event} \"{message}\" t={timestamp_ms}ms");
}

#[cfg(target_os = "none")]
pub fn log_boot_deferred(err: BootError) {
    defmt::info!("monitor: boot deferred ({})", defmt::Display2Format(&err));
}

#[cfg(not(target_os = "none"))]
pub fn log_boot_deferred(err: BootError) {
    println!("INFO monitor: boot deferred ({err})");
}

#[cfg(target_os = "none")]
pub fn log_link_event(event: LinkEvent) {
    match event {
        LinkEvent::Cloud(up) => defmt::info!("modem: cloud connected={}", up),
        LinkEvent::Time(local) => defmt::debug!("modem: time {}", defmt::Display2Format(&local)),
        LinkEvent::TimeUnsynced => defmt::info!("modem: time unsynced"),
    }
}

#[cfg(not(target_os = "none"))]
pub fn log_link_event(event: LinkEvent) {
    match event {
        LinkEvent::Cloud(up) => println!("INFO modem: cloud connected={up}"),
        LinkEvent::Time(local) => println!("DEBUG modem: time {local}"),
        LinkEvent::TimeUnsynced => println!("INFO modem: time unsynced"),
    }
}

#[cfg(target_os = "none")]
pub fn log_link_parse_error(err: LinkParseError, line: &str) {
    defmt::debug!("modem: ignoring line {=str} ({})", line, defmt::Display2Format(&err));
}

#[cfg(not(target_os = "none"))]
pub fn log_link_parse_error(err: LinkParseError, line: &str) {
    println!("DEBUG modem: ignoring line {line:?} ({err})");
}

#[cfg(target_os = "none")]
pub fn log_notification_dropped(notification: &Notification, dropped: u32) {
    defmt::warn!(
        "modem: queue full, dropped \"{}\" (total {})",
        notification.message,
        dropped
    );
}

#[cfg(not(target_os = "none"))]
pub fn log_notification_dropped(notification: &Notification, dropped: u32) {
    println!(
        "WARN modem: queue full, dropped {:?} (total {dropped})",
        notification.message
    );
}

#[cfg(target_os = "none")]
pub fn log_encode_failed(notification: &Notification, err: PayloadError) {
    defmt::error!(
        "modem: cannot encode \"{}\" ({})",
        notification.message,
        defmt::Display2Format(&err)
    );
}

#[cfg(not(target_os = "none"))]
pub fn log_encode_failed(notification: &Notification, err: PayloadError) {
    println!("ERROR modem: cannot encode {:?} ({err})", notification.message);
}
