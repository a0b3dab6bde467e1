use embassy_time::{Duration, Instant, Timer};
use weld_core::telemetry::{Ads1256Error, Channel};

use crate::hw::BoardAdc;
use crate::status;

const SAMPLE_PERIOD: Duration = Duration::from_millis(100);
/// Longest wait for the first conversion after a multiplexer switch.
const SETTLE_TIMEOUT: Duration = Duration::from_millis(5);

#[embassy_executor::task]
pub async fn run(mut adc: BoardAdc) -> ! {
    match start(&mut adc) {
        Ok(()) => defmt::info!("ads1256: running at 30 kSPS"),
        Err(error) => {
            defmt::error!("ads1256: {}", defmt::Display2Format(&error));
            loop {
                core::future::pending::<()>().await;
            }
        }
    }

    loop {
        match sample(&mut adc).await {
            Ok((volts, amps)) => {
                if let Some(volts) = volts {
                    status::record_bus_volts(volts);
                }
                if let Some(amps) = amps {
                    status::record_weld_amps(amps);
                }
            }
            Err(error) => defmt::warn!("ads1256: {}", defmt::Display2Format(&error)),
        }
        Timer::after(SAMPLE_PERIOD).await;
    }
}

fn start(adc: &mut BoardAdc) -> Result<(), Ads1256Error> {
    adc.begin()?;
    adc.start_continuous()
}

/// Reads the current channel, then the voltage channel, and leaves the
/// converter on the current channel.
async fn sample(adc: &mut BoardAdc) -> Result<(Option<f32>, Option<f32>), Ads1256Error> {
    if adc.channel() != Channel::Current {
        adc.select_current_channel()?;
    }
    let amps = next_reading(adc, Channel::Current).await?;

    adc.select_voltage_channel()?;
    let volts = next_reading(adc, Channel::Voltage).await;
    adc.select_current_channel()?;

    Ok((volts?, amps))
}

async fn next_reading(adc: &mut BoardAdc, channel: Channel) -> Result<Option<f32>, Ads1256Error> {
    let deadline = Instant::now() + SETTLE_TIMEOUT;
    loop {
        let reading = match channel {
            Channel::Current => adc.read_current_fast()?,
            Channel::Voltage => adc.read_voltage_fast()?,
        };
        if reading.is_some() || Instant::now() >= deadline {
            return Ok(reading);
        }
        Timer::after_micros(50).await;
    }
}
