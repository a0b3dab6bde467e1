use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::gpio::{Input, Level, Output, OutputType, Pull, Speed};
use embassy_stm32::time::Hertz;
use embassy_stm32::timer::simple_pwm::{PwmPin, SimplePwm};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::Timer;
use heapless::Vec;
use weld_core::controller::WeldController;
use weld_core::link::LineMailbox;
use weld_core::protocol::OutboundLine;
use weld_core::sequencer::PwmWeldOutput;
use weld_core::trigger::{ActiveLowPedal, PedalInput};

use crate::hw::{self, EmbassyClock};
use crate::usb;

mod control_task;
mod link_task;
#[cfg(feature = "adc-telemetry")]
mod telemetry_task;
mod usb_task;

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

const TX_QUEUE_DEPTH: usize = 8;
const USB_RX_QUEUE_DEPTH: usize = 4;

/// One USB OUT packet.
pub(super) type UsbPacket = Vec<u8, { usb::PACKET_LEN }>;
pub(super) type TxQueue = Channel<CriticalSectionRawMutex, OutboundLine, TX_QUEUE_DEPTH>;
pub(super) type UsbRxQueue = Channel<CriticalSectionRawMutex, UsbPacket, USB_RX_QUEUE_DEPTH>;

/// Complete inbound lines, filled by the link task and drained by the control loop.
pub(super) static LINE_MAILBOX: LineMailbox = LineMailbox::new();
pub(super) static USB_TX: TxQueue = Channel::new();
pub(super) static USB_RX: UsbRxQueue = Channel::new();

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let p = hal::init(hw::clock_config());

    // Gate low before anything else gets a chance to run.
    let pwm = SimplePwm::new(
        p.TIM1,
        Some(PwmPin::new(p.PA8, OutputType::PushPull)),
        None,
        None,
        None,
        Hertz(hw::PWM_FREQUENCY_HZ),
        Default::default(),
    );
    let mut gate = pwm.split().ch1;
    gate.enable();
    let output = PwmWeldOutput::new(gate);

    let mut led = Output::new(p.PC13, Level::High, Speed::Low);
    for _ in 0..hw::BOOT_BLINKS {
        led.set_low();
        Timer::after_millis(hw::BOOT_BLINK_MS).await;
        led.set_high();
        Timer::after_millis(hw::BOOT_BLINK_MS).await;
    }

    let mut pedal = ActiveLowPedal::new(Input::new(p.PB12, Pull::Up));
    let initial = pedal.level();
    let config = hw::controller_config();
    defmt::info!(
        "weld controller up: armed_at_boot={} boot_inhibit={}ms cooldown={}ms",
        config.interlock.armed_at_boot,
        config.interlock.boot_inhibit_ms,
        config.interlock.cooldown_ms
    );
    let controller = WeldController::new(config, output, EmbassyClock, initial);

    let (uart_tx, uart_rx) = link_task::open_uart(p.USART1, p.PA10, p.PA9);

    spawner
        .spawn(control_task::run(controller, pedal, uart_tx))
        .expect("failed to spawn control task");

    spawner
        .spawn(link_task::run(uart_rx))
        .expect("failed to spawn link task");

    spawner
        .spawn(usb_task::run(p.USB_OTG_FS, p.PA12, p.PA11))
        .expect("failed to spawn USB task");

    #[cfg(feature = "adc-telemetry")]
    {
        use embassy_stm32::spi::{self, Spi};
        use weld_core::telemetry::Ads1256;

        let mut spi_config = spi::Config::default();
        spi_config.mode = spi::MODE_1;
        spi_config.frequency = Hertz(hw::ADC_SPI_HZ);
        let bus = Spi::new_blocking(p.SPI1, p.PA5, p.PA7, p.PA6, spi_config);
        let adc = Ads1256::new(
            bus,
            Output::new(p.PA4, Level::High, Speed::VeryHigh),
            Input::new(p.PB0, Pull::Up),
            embassy_time::Delay,
        );
        spawner
            .spawn(telemetry_task::run(adc))
            .expect("failed to spawn telemetry task");
    }

    led.set_low();
    core::future::pending::<()>().await;
}
