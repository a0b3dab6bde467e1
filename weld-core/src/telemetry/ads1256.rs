//! ADS1256 24-bit delta-sigma ADC over SPI.
//!
//! The bus is expected in SPI mode 1 at 1 MHz or slower. Chip select is
//! driven by the driver so command frames can hold it across several bytes.

use core::fmt;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin, OutputPin};
use embedded_hal::spi::{self, SpiBus};

use super::{bus_volts, shunt_amps, sign_extend_24};

pub const CMD_WAKEUP: u8 = 0x00;
pub const CMD_RDATA: u8 = 0x01;
pub const CMD_RDATAC: u8 = 0x03;
pub const CMD_SDATAC: u8 = 0x0F;
pub const CMD_RREG: u8 = 0x10;
pub const CMD_WREG: u8 = 0x50;
pub const CMD_SELFCAL: u8 = 0xF0;
pub const CMD_RESET: u8 = 0xFE;

pub const REG_STATUS: u8 = 0x00;
pub const REG_MUX: u8 = 0x01;
pub const REG_ADCON: u8 = 0x02;
pub const REG_DRATE: u8 = 0x03;

/// 30 kSPS.
pub const DRATE_30K: u8 = 0xF0;
/// PGA = 1, CLKOUT off.
pub const ADCON_DEFAULT: u8 = 0x00;

/// How long self-calibration may hold DRDY high.
pub const CALIBRATION_TIMEOUT_MS: u32 = 1_000;

const REGISTER_SETTLE_US: u32 = 5;

/// Differential input pair routed to the modulator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    /// AIN0-AIN1, pack voltage.
    Voltage,
    /// AIN2-AIN3, weld shunt.
    Current,
}

impl Channel {
    #[must_use]
    pub const fn mux(self) -> u8 {
        match self {
            Channel::Voltage => 0x01,
            Channel::Current => 0x23,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ads1256Error {
    Spi(spi::ErrorKind),
    Pin(digital::ErrorKind),
    /// DRDY stayed high after self-calibration.
    CalibrationTimeout,
}

impl fmt::Display for Ads1256Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ads1256Error::Spi(kind) => write!(f, "spi transfer failed: {kind}"),
            Ads1256Error::Pin(kind) => write!(f, "gpio access failed: {kind}"),
            Ads1256Error::CalibrationTimeout => write!(
                f,
                "DRDY not asserted within {CALIBRATION_TIMEOUT_MS} ms of self-calibration"
            ),
        }
    }
}

fn spi_error<E: spi::Error>(error: E) -> Ads1256Error {
    Ads1256Error::Spi(error.kind())
}

fn pin_error<E: digital::Error>(error: E) -> Ads1256Error {
    Ads1256Error::Pin(error.kind())
}

pub struct Ads1256<SPI, CS, DRDY, D> {
    spi: SPI,
    cs: CS,
    drdy: DRDY,
    delay: D,
    channel: Channel,
}

impl<SPI, CS, DRDY, D> Ads1256<SPI, CS, DRDY, D>
where
    SPI: SpiBus<u8>,
    CS: OutputPin,
    DRDY: InputPin,
    D: DelayNs,
{
    #[must_use]
    pub const fn new(spi: SPI, cs: CS, drdy: DRDY, delay: D) -> Self {
        Self {
            spi,
            cs,
            drdy,
            delay,
            channel: Channel::Current,
        }
    }

    /// Resets the converter, configures 30 kSPS at unity gain on the current
    /// channel, and waits for self-calibration.
    pub fn begin(&mut self) -> Result<(), Ads1256Error> {
        self.cs.set_high().map_err(pin_error)?;

        self.command(CMD_SDATAC)?;
        self.delay.delay_ms(2);
        self.command(CMD_RESET)?;
        self.delay.delay_ms(5);
        self.command(CMD_SDATAC)?;
        self.delay.delay_ms(5);

        self.write_register(REG_DRATE, DRATE_30K)?;
        self.write_register(REG_ADCON, ADCON_DEFAULT)?;
        self.write_register(REG_MUX, Channel::Current.mux())?;
        self.channel = Channel::Current;

        self.command(CMD_SELFCAL)?;
        for _ in 0..CALIBRATION_TIMEOUT_MS {
            if self.is_ready()? {
                return Ok(());
            }
            self.delay.delay_ms(1);
        }
        Err(Ads1256Error::CalibrationTimeout)
    }

    /// Enters continuous conversion on the current channel.
    pub fn start_continuous(&mut self) -> Result<(), Ads1256Error> {
        self.command(CMD_SDATAC)?;
        self.delay.delay_us(REGISTER_SETTLE_US);
        self.write_register(REG_MUX, Channel::Current.mux())?;
        self.delay.delay_us(2 * REGISTER_SETTLE_US);
        self.channel = Channel::Current;
        self.command(CMD_RDATAC)
    }

    pub fn stop_continuous(&mut self) -> Result<(), Ads1256Error> {
        self.command(CMD_SDATAC)
    }

    /// Re-routes the multiplexer and resumes continuous conversion.
    pub fn select_channel(&mut self, channel: Channel) -> Result<(), Ads1256Error> {
        self.command(CMD_SDATAC)?;
        self.delay.delay_us(REGISTER_SETTLE_US);
        self.write_register(REG_MUX, channel.mux())?;
        self.channel = channel;
        self.command(CMD_RDATAC)
    }

    pub fn select_voltage_channel(&mut self) -> Result<(), Ads1256Error> {
        self.select_channel(Channel::Voltage)
    }

    pub fn select_current_channel(&mut self) -> Result<(), Ads1256Error> {
        self.select_channel(Channel::Current)
    }

    #[must_use]
    pub const fn channel(&self) -> Channel {
        self.channel
    }

    /// DRDY is active low.
    pub fn is_ready(&mut self) -> Result<bool, Ads1256Error> {
        self.drdy.is_low().map_err(pin_error)
    }

    /// Pack voltage, or `None` while no conversion is pending.
    pub fn read_voltage_fast(&mut self) -> Result<Option<f32>, Ads1256Error> {
        Ok(self.read_pending()?.map(bus_volts))
    }

    /// Weld current, or `None` while no conversion is pending.
    pub fn read_current_fast(&mut self) -> Result<Option<f32>, Ads1256Error> {
        Ok(self.read_pending()?.map(shunt_amps))
    }

    fn read_pending(&mut self) -> Result<Option<i32>, Ads1256Error> {
        if !self.is_ready()? {
            return Ok(None);
        }
        self.read_raw().map(Some)
    }

    /// Clocks out one conversion result. Only valid in continuous mode.
    pub fn read_raw(&mut self) -> Result<i32, Ads1256Error> {
        let mut bytes = [0xFF; 3];
        self.select()?;
        let transfer = self.spi.transfer_in_place(&mut bytes);
        self.finish(transfer)?;
        Ok(sign_extend_24(bytes))
    }

    pub fn write_register(&mut self, register: u8, value: u8) -> Result<(), Ads1256Error> {
        self.select()?;
        let transfer = self
            .spi
            .write(&[CMD_WREG | (register & 0x0F), 0x00, value]);
        self.finish(transfer)?;
        self.delay.delay_us(REGISTER_SETTLE_US);
        Ok(())
    }

    pub fn read_register(&mut self, register: u8) -> Result<u8, Ads1256Error> {
        let mut value = [0xFF];
        self.select()?;
        let transfer = self
            .spi
            .write(&[CMD_RREG | (register & 0x0F), 0x00])
            .and_then(|()| self.spi.flush());
        if transfer.is_ok() {
            self.delay.delay_us(REGISTER_SETTLE_US);
        }
        let transfer = transfer.and_then(|()| self.spi.transfer_in_place(&mut value));
        self.finish(transfer)?;
        Ok(value[0])
    }

    pub fn command(&mut self, command: u8) -> Result<(), Ads1256Error> {
        self.select()?;
        let transfer = self.spi.write(&[command]);
        self.finish(transfer)
    }

    #[must_use]
    pub fn release(self) -> (SPI, CS, DRDY, D) {
        (self.spi, self.cs, self.drdy, self.delay)
    }

    fn select(&mut self) -> Result<(), Ads1256Error> {
        self.cs.set_low().map_err(pin_error)
    }

    /// Flushes the bus and releases chip select even when the transfer failed.
    fn finish(&mut self, transfer: Result<(), SPI::Error>) -> Result<(), Ads1256Error> {
        let transfer = transfer.and_then(|()| self.spi.flush());
        let released = self.cs.set_high().map_err(pin_error);
        transfer.map_err(spi_error)?;
        released
    }
}
