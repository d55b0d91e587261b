//! Conversion between volts and Stabilizer machine units.

/// Stabilizer base tick rate in Hz.
pub const STABILIZER_TICK_RATE: f64 = 100e6;

/// Default number of ticks between two samples.
pub const DEFAULT_SAMPLE_TICKS: u32 = 128;

/// Default sample period in seconds.
pub const SAMPLE_PERIOD: f64 = DEFAULT_SAMPLE_TICKS as f64 / STABILIZER_TICK_RATE;

/// Maximum output scale of the Stabilizer DACs in volts.
pub const DAC_FULL_SCALE: f64 = 4.096 * 2.5;

/// Machine units corresponding to [`DAC_FULL_SCALE`].
pub const DAC_MACHINE_RANGE: f64 = 0x7FFF as f64;

/// Sample period for a number of ticks of the base clock.
pub fn sample_period(ticks: u32) -> f64 {
    ticks as f64 / STABILIZER_TICK_RATE
}

/// Linear map between a voltage range and an integer range.
///
/// `full_scale_volts` corresponds to `machine_range` machine units and the
/// map goes through zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageScale {
    pub full_scale_volts: f64,
    pub machine_range: f64,
}

impl VoltageScale {
    /// The Stabilizer DAC output scale.
    pub const STABILIZER: Self = Self {
        full_scale_volts: DAC_FULL_SCALE,
        machine_range: DAC_MACHINE_RANGE,
    };

    pub const fn new(full_scale_volts: f64, machine_range: f64) -> Self {
        Self {
            full_scale_volts,
            machine_range,
        }
    }

    /// Volts per machine unit.
    pub fn step(&self) -> f64 {
        self.full_scale_volts / self.machine_range
    }

    /// Convert a voltage to machine units.
    ///
    /// Truncates toward zero. Values beyond the `i32` range saturate and NaN
    /// maps to zero. Voltages outside the full scale are converted as given.
    pub fn to_machine_units(&self, volts: f64) -> i32 {
        (volts * self.machine_range / self.full_scale_volts) as i32
    }

    /// Convert machine units back to a voltage.
    pub fn from_machine_units(&self, units: i32) -> f64 {
        units as f64 * self.full_scale_volts / self.machine_range
    }
}

impl Default for VoltageScale {
    fn default() -> Self {
        Self::STABILIZER
    }
}

/// Convert a voltage to machine units on the Stabilizer DAC scale.
pub fn voltage_to_machine_units(volts: f64) -> i32 {
    VoltageScale::STABILIZER.to_machine_units(volts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_scale() {
        let scale = VoltageScale::STABILIZER;
        assert_eq!(scale.to_machine_units(DAC_FULL_SCALE), 0x7FFF);
        assert_eq!(scale.to_machine_units(-DAC_FULL_SCALE), -0x7FFF);
        assert_eq!(scale.to_machine_units(0.0), 0);
    }

    #[test]
    fn test_truncates_toward_zero() {
        let scale = VoltageScale::STABILIZER;
        // 1 V is 3199.9 machine units
        assert_eq!(scale.to_machine_units(1.0), 3199);
        assert_eq!(scale.to_machine_units(-1.0), -3199);
    }

    #[test]
    fn test_power_of_two_scale() {
        let scale = VoltageScale::new(10.0, 32768.0);
        assert_eq!(scale.to_machine_units(5.0), 16384);
        assert_eq!(scale.to_machine_units(-2.5), -8192);
        assert_eq!(scale.from_machine_units(16384), 5.0);
    }

    #[test]
    fn test_out_of_range_passes_through() {
        let scale = VoltageScale::STABILIZER;
        assert_eq!(scale.to_machine_units(2.0 * DAC_FULL_SCALE), 2 * 0x7FFF);
        assert_eq!(scale.to_machine_units(f64::INFINITY), i32::MAX);
        assert_eq!(scale.to_machine_units(f64::NAN), 0);
    }

    #[test]
    fn test_round_trip_within_one_step() {
        for scale in [VoltageScale::STABILIZER, VoltageScale::new(10.0, 32768.0)] {
            let steps = 10_000;
            for n in -steps..=steps {
                let volts = scale.full_scale_volts * n as f64 / steps as f64;
                let back = scale.from_machine_units(scale.to_machine_units(volts));
                assert!(
                    (back - volts).abs() <= scale.step(),
                    "{} V came back as {} V",
                    volts,
                    back
                );
            }
        }
    }

    #[test]
    fn test_sample_period() {
        assert_eq!(sample_period(DEFAULT_SAMPLE_TICKS), SAMPLE_PERIOD);
        assert!((SAMPLE_PERIOD - 1.28e-6).abs() < 1e-15);
    }
}
