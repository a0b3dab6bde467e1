//! Pack voltage and weld current measurement.
//!
//! The front end is an ADS1256 sampling two AMC1311 isolated amplifiers: one
//! behind a resistive divider on the pack, one across the weld shunt. The
//! driver lives in [`ads1256`]; this module holds the scaling from raw codes
//! to engineering units.

pub mod ads1256;

pub use ads1256::{Ads1256, Ads1256Error, Channel};

/// ADC reference voltage.
pub const VREF_VOLTS: f32 = 2.5;

/// Positive full-scale code of the 24-bit converter.
pub const FULL_SCALE: f32 = 8_388_607.0;

/// AMC1311 output offset at zero differential input.
pub const AMC_OFFSET_VOLTS: f32 = 1.0;

/// AMC1311 gain.
pub const AMC_GAIN: f32 = 8.2;

/// Pack divider ratio, (68k + 10k) / 10k.
pub const DIVIDER_RATIO: f32 = 7.8;

/// Weld shunt resistance, 50 µΩ.
pub const SHUNT_OHMS: f32 = 0.000_05;

/// Converts a sign-extended 24-bit code to volts at the ADC input.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn adc_volts(raw: i32) -> f32 {
    raw as f32 * (VREF_VOLTS / FULL_SCALE)
}

/// Pack voltage seen through the divider and amplifier.
#[must_use]
pub fn bus_volts(raw: i32) -> f32 {
    (adc_volts(raw) - AMC_OFFSET_VOLTS) / AMC_GAIN * DIVIDER_RATIO
}

/// Weld current through the shunt.
#[must_use]
pub fn shunt_amps(raw: i32) -> f32 {
    (adc_volts(raw) - AMC_OFFSET_VOLTS) / (AMC_GAIN * SHUNT_OHMS)
}

/// Sign-extends a big-endian 24-bit conversion result.
#[must_use]
pub const fn sign_extend_24(bytes: [u8; 3]) -> i32 {
    i32::from_be_bytes([bytes[0], bytes[1], bytes[2], 0]) >> 8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn within(a: f32, b: f32, tolerance: f32) -> bool {
        a - b < tolerance && b - a < tolerance
    }

    #[test]
    fn sign_extension_covers_both_halves() {
        assert_eq!(sign_extend_24([0x00, 0x00, 0x01]), 1);
        assert_eq!(sign_extend_24([0x7F, 0xFF, 0xFF]), 8_388_607);
        assert_eq!(sign_extend_24([0xFF, 0xFF, 0xFF]), -1);
        assert_eq!(sign_extend_24([0x80, 0x00, 0x00]), -8_388_608);
    }

    #[test]
    fn full_scale_maps_to_reference() {
        assert!(within(adc_volts(8_388_607), VREF_VOLTS, 1e-3));
        assert!(within(adc_volts(0), 0.0, 1e-3));
    }

    #[test]
    fn amplifier_offset_reads_as_zero() {
        // 1.0 V at the ADC, the AMC1311 idle level.
        let idle = 3_355_443;
        assert!(within(bus_volts(idle), 0.0, 1e-2));
        assert!(within(shunt_amps(idle), 0.0, 5.0));
    }

    #[test]
    fn scaling_follows_gain_and_divider() {
        // 1.82 V at the ADC.
        let code = 6_106_906;
        // 0.82 V above offset / 8.2 = 0.1 V at the amplifier input.
        assert!(within(bus_volts(code), 0.78, 1e-2));
        assert!(within(shunt_amps(code), 2_000.0, 1.0));
    }
}
