use embassy_stm32::usart::BufferedUartTx;
use embassy_time::{Duration, Instant, Timer};
use embedded_io::Write;
use weld_core::link::LineSink;
use weld_core::protocol::{MAX_REPLY_LEN, Reply};

use super::{LINE_MAILBOX, USB_TX};
use crate::hw::{BoardController, BoardPedal};
use crate::status;

const LOOP_PERIOD: Duration = Duration::from_millis(1);
const HEARTBEAT_PERIOD: Duration = Duration::from_secs(5);

/// Writes every reply into the UART transmit ring and, while a host is
/// attached, queues it for USB.
///
/// The ring drains from the USART interrupt, which keeps running while the
/// sequencer busy-waits, so a line written here reaches the wire even when the
/// executor is blocked for a whole weld cycle.
struct ReplySink {
    uart: BufferedUartTx<'static>,
}

impl ReplySink {
    fn write_line(&mut self, line: &[u8]) {
        let written = self
            .uart
            .write_all(line)
            .and_then(|()| self.uart.write_all(b"\r\n"));
        if written.is_err() {
            status::record_tx_overflow();
            defmt::warn!("tx: UART write failed, line lost");
        }
    }
}

impl LineSink for ReplySink {
    fn send(&mut self, reply: &Reply) {
        let Ok(line) = reply.render() else {
            defmt::error!("tx: {} reply exceeds {} bytes", reply.keyword(), MAX_REPLY_LEN);
            return;
        };

        match reply {
            Reply::Deny(_) | Reply::Error(_) => defmt::warn!("tx: {}", line.as_str()),
            _ => defmt::info!("tx: {}", line.as_str()),
        }

        self.write_line(line.as_bytes());

        if status::usb_attached() && USB_TX.try_send(line).is_err() {
            status::record_tx_overflow();
        }
    }

    /// Waits for the UART to shift out `WELD_START` before the first stage.
    fn flush(&mut self) {
        if self.uart.flush().is_err() {
            defmt::warn!("tx: UART flush failed");
        }
    }
}

#[embassy_executor::task]
pub async fn run(
    mut controller: BoardController,
    mut pedal: BoardPedal,
    uart: BufferedUartTx<'static>,
) -> ! {
    let mut sink = ReplySink { uart };
    controller.announce_boot(&mut sink);

    let mut last_heartbeat = Instant::now();
    loop {
        controller.run_once(&LINE_MAILBOX, &mut pedal, &mut sink);
        status::record_stats(controller.stats());

        if last_heartbeat.elapsed() >= HEARTBEAT_PERIOD {
            last_heartbeat = Instant::now();
            let faults = controller.output().faults();
            defmt::info!("heartbeat: {} pwm_faults={}", status::heartbeat(), faults);
        }

        Timer::after(LOOP_PERIOD).await;
    }
}
