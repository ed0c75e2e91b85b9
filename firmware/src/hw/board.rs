//! Embassy-backed sensor implementation for the monitor board.
//!
//! Each battery read samples VREFINT first so the sense voltage is corrected
//! for the actual analog supply rather than an assumed 3.3 V.

use core::ptr;

use embassy_stm32::adc::{Adc, AnyAdcChannel, SampleTime, VrefInt};
use embassy_stm32::gpio::Input;
use embassy_stm32::peripherals::ADC1;
use monitor_core::battery::BatteryState;
use monitor_core::sensors::{PowerSensors, PowerSource};

use super::{ChargerSignals, battery_millivolts, charge_percent, classify_battery, vdda_millivolts};

/// Factory-programmed calibration constant sampled at 3.0 V.
const VREFINT_CAL_ADDR: *const u16 = 0x1FFF_75AA as *const u16;

/// Sense voltage returned when VREFINT cannot be read; treated as no battery.
const NO_READING_MV: u16 = 0;

/// Reads the factory-trimmed VREFINT calibration constant.
pub fn read_vrefint_calibration() -> u16 {
    unsafe { ptr::read_volatile(VREFINT_CAL_ADDR) }
}

/// Charger pins plus the battery-sense ADC.
pub struct BoardSensors<'d> {
    adc: Adc<'d, ADC1>,
    vrefint: VrefInt,
    vrefint_cal: u16,
    battery_sense: AnyAdcChannel<ADC1>,
    power_good_n: Input<'d>,
    charging_n: Input<'d>,
    /// Last classification, for the charged/not-charging band.
    last_state: BatteryState,
}

impl<'d> BoardSensors<'d> {
    pub fn new(
        mut adc: Adc<'d, ADC1>,
        battery_sense: AnyAdcChannel<ADC1>,
        power_good_n: Input<'d>,
        charging_n: Input<'d>,
    ) -> Self {
        adc.set_sample_time(SampleTime::CYCLES160_5);
        let vrefint = adc.enable_vrefint();
        let mut sensors = Self {
            adc,
            vrefint,
            vrefint_cal: read_vrefint_calibration(),
            battery_sense,
            power_good_n,
            charging_n,
            last_state: BatteryState::Unknown,
        };
        // First conversion after enabling VREFINT is unreliable.
        let _ = sensors.adc.blocking_read(&mut sensors.vrefint);
        sensors
    }

    fn signals(&self) -> ChargerSignals {
        ChargerSignals {
            power_good: self.power_good_n.is_low(),
            charging: self.charging_n.is_low(),
        }
    }

    /// Cell voltage in millivolts.
    pub fn battery_millivolts(&mut self) -> u16 {
        let vrefint_raw = self.adc.blocking_read(&mut self.vrefint);
        let Some(vdda_mv) = vdda_millivolts(vrefint_raw, self.vrefint_cal) else {
            return NO_READING_MV;
        };
        let raw = self.adc.blocking_read(&mut self.battery_sense);
        battery_millivolts(raw, vdda_mv)
    }
}

impl PowerSensors for BoardSensors<'_> {
    fn power_source(&mut self) -> PowerSource {
        self.signals().power_source()
    }

    fn battery_state(&mut self) -> BatteryState {
        let millivolts = self.battery_millivolts();
        self.last_state = classify_battery(self.signals(), millivolts, self.last_state);
        self.last_state
    }

    fn battery_charge_percent(&mut self) -> f32 {
        let millivolts = self.battery_millivolts();
        if millivolts < super::BATTERY_ABSENT_MV {
            // Unavailable reading; the low-battery check skips it.
            return -1.0;
        }
        charge_percent(millivolts)
    }
}
