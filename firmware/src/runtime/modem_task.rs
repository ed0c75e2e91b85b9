use embassy_futures::join::join;
use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_stm32::usart::{BufferedUart, Config as UartConfig, DataBits, Parity, StopBits};
use embassy_time::{Duration, Timer, with_timeout};
use embedded_io_async::{Read, Write};
use heapless::String;
use monitor_core::link::{MAX_FRAME_LEN, MAX_LINE_LEN, encode_publish, parse_link_line};
use static_cell::StaticCell;

use crate::link::{LinkStatus, NotifyReceiver};
use crate::telemetry;

const MODEM_UART_BAUD: u32 = 115_200;
const MODEM_TX_BUFFER_SIZE: usize = MAX_FRAME_LEN * 2;
const MODEM_RX_BUFFER_SIZE: usize = MAX_LINE_LEN * 4;

/// The modem reports time every minute; this much silence means it is gone.
const MODEM_SILENCE_TIMEOUT: Duration = Duration::from_secs(180);

static UART_TX_BUFFER: StaticCell<[u8; MODEM_TX_BUFFER_SIZE]> = StaticCell::new();
static UART_RX_BUFFER: StaticCell<[u8; MODEM_RX_BUFFER_SIZE]> = StaticCell::new();

embassy_stm32::bind_interrupts!(struct UartIrqs {
    USART3_4_5_6_LPUART1 => embassy_stm32::usart::BufferedInterruptHandler<hal::peripherals::USART5>;
});

#[embassy_executor::task]
pub async fn run(
    status: &'static LinkStatus,
    notifications: NotifyReceiver<'static>,
    usart: Peri<'static, hal::peripherals::USART5>,
    tx_pin: Peri<'static, hal::peripherals::PB0>,
    rx_pin: Peri<'static, hal::peripherals::PB1>,
) -> ! {
    let mut config = UartConfig::default();
    config.baudrate = MODEM_UART_BAUD;
    config.data_bits = DataBits::DataBits8;
    config.stop_bits = StopBits::STOP1;
    config.parity = Parity::ParityNone;

    let uart = BufferedUart::new(
        usart,
        rx_pin,
        tx_pin,
        UART_TX_BUFFER.init([0; MODEM_TX_BUFFER_SIZE]),
        UART_RX_BUFFER.init([0; MODEM_RX_BUFFER_SIZE]),
        UartIrqs,
        config,
    )
    .expect("failed to initialize modem UART");

    let (mut uart_tx, mut uart_rx) = uart.split();

    let outbound = async move {
        loop {
            let notification = notifications.receive().await;
            let frame = match encode_publish(&notification) {
                Ok(frame) => frame,
                Err(err) => {
                    telemetry::log_encode_failed(&notification, err);
                    continue;
                }
            };

            if uart_tx.write_all(frame.as_bytes()).await.is_err()
                || uart_tx.flush().await.is_err()
            {
                defmt::warn!("modem: UART write error, notification lost");
                Timer::after(Duration::from_millis(5)).await;
            }
        }
    };

    let inbound = async move {
        let mut line: String<MAX_LINE_LEN> = String::new();
        let mut overflowed = false;
        let mut ingress = [0u8; MAX_LINE_LEN];

        loop {
            let count = match with_timeout(MODEM_SILENCE_TIMEOUT, uart_rx.read(&mut ingress)).await
            {
                Ok(Ok(count)) => count,
                Ok(Err(_)) => {
                    defmt::warn!("modem: UART read error");
                    Timer::after(Duration::from_millis(5)).await;
                    continue;
                }
                Err(_) => {
                    defmt::warn!("modem: no reports for {}s", MODEM_SILENCE_TIMEOUT.as_secs());
                    status.mark_silent();
                    continue;
                }
            };

            for &byte in &ingress[..count] {
                match byte {
                    b'\n' => {
                        if !overflowed {
                            handle_line(status, &line);
                        }
                        line.clear();
                        overflowed = false;
                    }
                    b'\r' => {}
                    byte if byte.is_ascii() => {
                        if line.push(char::from(byte)).is_err() {
                            overflowed = true;
                        }
                    }
                    _ => overflowed = true,
                }
            }
        }
    };

    join(outbound, inbound).await;
    loop {
        core::future::pending::<()>().await;
    }
}

fn handle_line(status: &LinkStatus, line: &str) {
    if line.is_empty() {
        return;
    }
    match parse_link_line(line) {
        Ok(event) => {
            status.apply(event);
            telemetry::log_link_event(event);
        }
        Err(err) => telemetry::log_link_parse_error(err, line),
    }
}
