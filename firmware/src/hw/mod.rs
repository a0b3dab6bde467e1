//! Board bindings for the STM32F411 "Black Pill".
//!
//! | Signal          | Pin  | Peripheral          |
//! |-----------------|------|---------------------|
//! | Weld gate PWM   | PA8  | TIM1 CH1, 10 kHz    |
//! | Pedal           | PB12 | input, pull-up      |
//! | Status LED      | PC13 | active low          |
//! | Host UART TX/RX | PA9/PA10 | USART1, 115200 8N1 |
//! | USB CDC         | PA12/PA11 | OTG FS          |
//! | ADS1256 SCK/MISO/MOSI | PA5/PA6/PA7 | SPI1, mode 1 |
//! | ADS1256 CS/DRDY | PA4/PB0 | GPIO            |

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use embassy_time::{Duration, Instant, block_for};
use weld_core::clock::{Clock, Millis};
use weld_core::controller::ControllerConfig;

pub const PWM_FREQUENCY_HZ: u32 = 10_000;
pub const UART_BAUD: u32 = 115_200;
pub const ADC_SPI_HZ: u32 = 1_000_000;

pub const BOOT_BLINKS: u32 = 10;
pub const BOOT_BLINK_MS: u64 = 100;

/// Millisecond time base driven by the embassy time driver.
///
/// Busy waits spin on the driver instead of yielding, so a weld cycle keeps
/// the executor for its full duration.
#[derive(Clone, Copy, Debug, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    #[allow(clippy::cast_possible_truncation)]
    fn now(&self) -> Millis {
        // Truncation gives the wrapping tick the interlock expects.
        Millis::from_ticks(Instant::now().as_millis() as u32)
    }

    fn busy_wait_ms(&mut self, ms: u32) {
        block_for(Duration::from_millis(u64::from(ms)));
    }
}

/// Interlock policy selected at build time.
pub const fn controller_config() -> ControllerConfig {
    if cfg!(feature = "armed-at-boot") {
        ControllerConfig::armed_at_boot()
    } else {
        ControllerConfig::disarmed_at_boot()
    }
}

#[cfg(target_os = "none")]
pub use board::*;

#[cfg(target_os = "none")]
mod board {
    use embassy_stm32::gpio::Input;
    use embassy_stm32::mode::Blocking;
    use embassy_stm32::peripherals::TIM1;
    use embassy_stm32::rcc::{
        AHBPrescaler, APBPrescaler, Hse, HseMode, Pll, PllMul, PllPDiv, PllPreDiv, PllQDiv,
        PllSource, Sysclk, mux,
    };
    use embassy_stm32::spi::Spi;
    use embassy_stm32::time::Hertz;
    use embassy_stm32::timer::simple_pwm::SimplePwmChannel;
    use embassy_stm32::{Config, gpio::Output};
    use weld_core::controller::WeldController;
    use weld_core::sequencer::PwmWeldOutput;
    use weld_core::telemetry::Ads1256;
    use weld_core::trigger::ActiveLowPedal;

    use super::EmbassyClock;

    pub type BoardOutput = PwmWeldOutput<SimplePwmChannel<'static, TIM1>>;
    pub type BoardPedal = ActiveLowPedal<Input<'static>>;
    pub type BoardController = WeldController<BoardOutput, EmbassyClock>;
    pub type BoardAdc =
        Ads1256<Spi<'static, Blocking>, Output<'static>, Input<'static>, embassy_time::Delay>;

    /// 25 MHz crystal, 84 MHz core, 48 MHz USB clock.
    pub fn clock_config() -> Config {
        let mut config = Config::default();
        config.rcc.hse = Some(Hse {
            freq: Hertz(25_000_000),
            mode: HseMode::Oscillator,
        });
        config.rcc.pll_src = PllSource::HSE;
        config.rcc.pll = Some(Pll {
            prediv: PllPreDiv::DIV25,
            mul: PllMul::MUL336,
            divp: Some(PllPDiv::DIV4),
            divq: Some(PllQDiv::DIV7),
            divr: None,
        });
        config.rcc.ahb_pre = AHBPrescaler::DIV1;
        config.rcc.apb1_pre = APBPrescaler::DIV2;
        config.rcc.apb2_pre = APBPrescaler::DIV1;
        config.rcc.sys = Sysclk::PLL1_P;
        config.rcc.mux.clk48sel = mux::Clk48sel::PLL1_Q;
        config
    }
}
