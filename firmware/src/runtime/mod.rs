use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::adc::{Adc, AdcChannel};
use embassy_stm32::gpio::{Input, Pull};

use crate::hw::board::BoardSensors;
use crate::link::{LinkStatus, NotifyQueue};

mod modem_task;
mod monitor_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) static NOTIFY_QUEUE: NotifyQueue = NotifyQueue::new();
pub(super) static LINK_STATUS: LinkStatus = LinkStatus::new();

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        ADC1,
        PA0,
        PB4,
        PB5,
        PB0,
        PB1,
        USART5,
        ..
    } = hal::init(config);

    // Charger status outputs are open-drain and active-low.
    let sensors = BoardSensors::new(
        Adc::new(ADC1),
        PA0.degrade_adc(),
        Input::new(PB5, Pull::Up),
        Input::new(PB4, Pull::Up),
    );

    spawner
        .spawn(modem_task::run(
            &LINK_STATUS,
            NOTIFY_QUEUE.receiver(),
            USART5,
            PB0,
            PB1,
        ))
        .expect("failed to spawn modem task");

    spawner
        .spawn(monitor_task::run(
            sensors,
            &LINK_STATUS,
            NOTIFY_QUEUE.sender(),
        ))
        .expect("failed to spawn monitor task");

    core::future::pending::<()>().await;
}
