use std::io;

#[allow(dead_code)]
#[path = "../session.rs"]
mod session;

use session::{Session, TranscriptProfile};

fn main() -> io::Result<()> {
    record_profile(TranscriptProfile::Outage)?;
    record_profile(TranscriptProfile::LowBattery)?;
    record_profile(TranscriptProfile::Heartbeat)?;
    Ok(())
}

fn record_profile(profile: TranscriptProfile) -> io::Result<()> {
    let mut session = Session::new(Some(profile))?;
    let script: &[&str] = match profile {
        TranscriptProfile::Outage => OUTAGE,
        TranscriptProfile::LowBattery => LOW_BATTERY,
        TranscriptProfile::Heartbeat => HEARTBEAT,
    };

    for command in script {
        let _ = session.handle_command(command)?;
    }
    Ok(())
}

/// Boot on mains, lose power for ten minutes, then recover.
const OUTAGE: &[&str] = &[
    "status",
    "advance 5s",
    "modem +CLOUD:1",
    "advance 2m",
    "power battery",
    "battery discharging",
    "charge 96",
    "advance 10m",
    "status",
    "power external",
    "battery charging",
    "advance 2m",
    "history",
];

/// Drain the cell across the threshold, wobble around it, then recharge.
const LOW_BATTERY: &[&str] = &[
    "link up",
    "power battery",
    "battery discharging",
    "charge 12",
    "advance 1m",
    "charge 9",
    "advance 1m",
    "charge 11",
    "advance 1m",
    "charge 8",
    "advance 1m",
    "power external",
    "battery charging",
    "charge 15",
    "advance 2m",
    "charge n/a",
    "advance 1m",
    "status",
    "history",
];

/// One heartbeat per week, held back while the clock is unsynced.
const HEARTBEAT: &[&str] = &[
    "link up",
    "time unsynced",
    "advance 1h",
    "modem +TIME:0,08:50",
    "advance 1h",
    "status",
    "advance 7d",
    "help advance",
    "history",
];
