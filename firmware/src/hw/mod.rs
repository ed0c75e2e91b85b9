//! Charger and battery-sense helpers.
//!
//! The board routes the LiPo cell through a 1:2 divider into an ADC pin and
//! exposes the charger's open-drain `PGOOD` and `CHG` outputs on two GPIOs.
//! Everything in this module except [`board`] is plain arithmetic so the
//! classification rules run under `cargo test` on the host.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

#[cfg(target_os = "none")]
pub mod board;

use monitor_core::battery::BatteryState;
use monitor_core::sensors::PowerSource;

/// Cell voltage treated as 0 % charge.
pub const BATTERY_EMPTY_MV: u16 = 3_300;
/// Cell voltage treated as 100 % charge.
pub const BATTERY_FULL_MV: u16 = 4_200;
/// Below this the cell is considered absent.
pub const BATTERY_ABSENT_MV: u16 = 2_500;
/// Above this the sense line is out of range for a single cell.
pub const BATTERY_OVERVOLTAGE_MV: u16 = 4_500;
/// Idle cell on external power at or above this voltage reads as charged.
///
/// A LiPo relaxes to roughly 4.15-4.18 V after charge termination.
pub const CHARGED_ENTER_MV: u16 = 4_150;
/// An already-charged idle cell stays charged until it sags below this.
pub const CHARGED_EXIT_MV: u16 = 4_050;
/// Ratio of the battery-sense divider.
pub const DIVIDER_RATIO: u32 = 2;
/// Full-scale count of the 12-bit ADC.
pub const ADC_FULL_SCALE: u32 = 4_095;

/// Levels of the charger status outputs, already translated from active-low.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ChargerSignals {
    /// Input supply present.
    pub power_good: bool,
    /// Charge cycle in progress.
    pub charging: bool,
}

impl ChargerSignals {
    #[must_use]
    pub const fn power_source(self) -> PowerSource {
        if self.power_good {
            PowerSource::External
        } else {
            PowerSource::Battery
        }
    }
}

/// Converts a raw battery-sense sample to cell millivolts.
#[must_use]
pub fn battery_millivolts(raw: u16, vdda_mv: u16) -> u16 {
    let sensed = u32::from(raw) * u32::from(vdda_mv) / ADC_FULL_SCALE;
    u16::try_from(sensed * DIVIDER_RATIO).unwrap_or(u16::MAX)
}

/// Derives the analog supply from a VREFINT sample and its factory calibration.
///
/// The calibration word is captured at 3.0 V. Returns `None` for a zero sample.
#[must_use]
pub fn vdda_millivolts(vrefint_raw: u16, vrefint_cal: u16) -> Option<u16> {
    if vrefint_raw == 0 {
        return None;
    }
    let vdda = 3_000 * u32::from(vrefint_cal) / u32::from(vrefint_raw);
    u16::try_from(vdda).ok()
}

/// Linear LiPo state-of-charge estimate, clamped to `0..=100`.
#[must_use]
pub fn charge_percent(millivolts: u16) -> f32 {
    let span = f32::from(BATTERY_FULL_MV - BATTERY_EMPTY_MV);
    let above_empty = f32::from(millivolts.saturating_sub(BATTERY_EMPTY_MV));
    (above_empty * 100.0 / span).min(100.0)
}

/// Classifies the battery from the charger signals and cell voltage.
///
/// `previous` is the last classification; an idle cell on external power
/// moves between `Charged` and `NotCharging` through the
/// [`CHARGED_EXIT_MV`]..[`CHARGED_ENTER_MV`] band so ADC noise cannot flip it.
#[must_use]
pub fn classify_battery(
    signals: ChargerSignals,
    millivolts: u16,
    previous: BatteryState,
) -> BatteryState {
    if millivolts < BATTERY_ABSENT_MV {
        return BatteryState::Disconnected;
    }
    if millivolts > BATTERY_OVERVOLTAGE_MV {
        return BatteryState::Fault;
    }

    match (signals.power_good, signals.charging) {
        (true, true) => BatteryState::Charging,
        (true, false) => {
            let threshold = if previous == BatteryState::Charged {
                CHARGED_EXIT_MV
            } else {
                CHARGED_ENTER_MV
            };
            if millivolts >= threshold {
                BatteryState::Charged
            } else {
                BatteryState::NotCharging
            }
        }
        (false, _) => BatteryState::Discharging,
    }
}
