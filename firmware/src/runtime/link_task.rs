use embassy_futures::select::{Either, select};
use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_stm32::usart::{
    BufferedUart, BufferedUartRx, BufferedUartTx, Config as UartConfig, DataBits, Parity, StopBits,
};
use embassy_time::{Duration, Timer};
use embedded_io_async::Read;
use static_cell::StaticCell;
use weld_core::link::{Framed, LineAssembler};

use super::{LINE_MAILBOX, USB_RX};
use crate::hw;
use crate::status;

const UART_BUFFER_SIZE: usize = 256;
/// How long a finished line may wait for the control loop to empty the mailbox.
const MAILBOX_WAIT: Duration = Duration::from_millis(20);

static UART_TX_BUFFER: StaticCell<[u8; UART_BUFFER_SIZE]> = StaticCell::new();
static UART_RX_BUFFER: StaticCell<[u8; UART_BUFFER_SIZE]> = StaticCell::new();

embassy_stm32::bind_interrupts!(struct UartIrqs {
    USART1 => embassy_stm32::usart::BufferedInterruptHandler<hal::peripherals::USART1>;
});

#[derive(Clone, Copy, defmt::Format)]
enum Source {
    Uart,
    Usb,
}

/// Brings up USART1 and splits it. The transmit half goes to the control
/// loop, the receive half to [`run`].
pub fn open_uart(
    usart: Peri<'static, hal::peripherals::USART1>,
    rx_pin: Peri<'static, hal::peripherals::PA10>,
    tx_pin: Peri<'static, hal::peripherals::PA9>,
) -> (BufferedUartTx<'static>, BufferedUartRx<'static>) {
    let mut config = UartConfig::default();
    config.baudrate = hw::UART_BAUD;
    config.data_bits = DataBits::DataBits8;
    config.stop_bits = StopBits::STOP1;
    config.parity = Parity::ParityNone;

    BufferedUart::new(
        usart,
        rx_pin,
        tx_pin,
        UART_TX_BUFFER.init([0; UART_BUFFER_SIZE]),
        UART_RX_BUFFER.init([0; UART_BUFFER_SIZE]),
        UartIrqs,
        config,
    )
    .expect("failed to initialize host UART")
    .split()
}

/// Frames UART and USB input into the line mailbox. Being the only mailbox
/// producer keeps the hand-off single-producer.
#[embassy_executor::task]
pub async fn run(mut uart_rx: BufferedUartRx<'static>) -> ! {
    let mut uart_lines = LineAssembler::new();
    let mut usb_lines = LineAssembler::new();
    let mut chunk = [0u8; 32];

    loop {
        match select(uart_rx.read(&mut chunk), USB_RX.receive()).await {
            Either::First(Ok(count)) => {
                feed(&mut uart_lines, &chunk[..count], Source::Uart).await;
            }
            Either::First(Err(_)) => {
                defmt::warn!("link: UART read error");
                Timer::after_millis(5).await;
            }
            Either::Second(packet) => feed(&mut usb_lines, &packet, Source::Usb).await,
        }
    }
}

async fn feed(assembler: &mut LineAssembler, bytes: &[u8], source: Source) {
    for &byte in bytes {
        if matches!(byte, b'\r' | b'\n') && !assembler.pending().is_empty() {
            wait_for_mailbox().await;
        }

        match assembler.push(byte, &LINE_MAILBOX) {
            Some(Framed::Dropped { len }) => {
                status::record_dropped_line();
                defmt::warn!("link: {} line of {} bytes dropped, mailbox busy", source, len);
            }
            Some(Framed::Delivered {
                len,
                truncated: true,
            }) => {
                defmt::warn!("link: {} line truncated to {} bytes", source, len);
            }
            Some(Framed::Delivered { .. }) | None => {}
        }
    }
}

async fn wait_for_mailbox() {
    let mut waited = Duration::from_ticks(0);
    let step = Duration::from_millis(1);
    while LINE_MAILBOX.is_ready() && waited < MAILBOX_WAIT {
        Timer::after(step).await;
        waited += step;
    }
}
