//! Dual-IIR filter designs.
//!
//! Coefficients follow the bilinear designs of
//! <https://arxiv.org/pdf/1508.06319.pdf> (page 9) and are sent to the first
//! stage of a channel as `[b0, b1, b2, a1, a2]`.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use miniconf_client::{Ack, Broker, ResolvedAddress, Result, transact};

use crate::pid::Channel;
use crate::units::{DAC_FULL_SCALE, VoltageScale};

/// A single-stage filter design.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterDesign {
    /// Gain-limited low-pass filter.
    Lowpass { f0: f64, k: f64 },
    /// Gain-limited high-pass filter.
    Highpass { f0: f64, k: f64 },
    /// Gain-limited all-pass filter.
    Allpass { f0: f64, k: f64 },
    /// Notch filter.
    Notch { f0: f64, q: f64, k: f64 },
}

impl FilterDesign {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Lowpass { .. } => "lowpass",
            Self::Highpass { .. } => "highpass",
            Self::Allpass { .. } => "allpass",
            Self::Notch { .. } => "notch",
        }
    }

    /// Coefficients `[b0, b1, b2, a1, a2]` at the given sample period.
    pub fn coefficients(&self, sample_period: f64) -> [f64; 5] {
        let f0_bar = |f0: f64| PI * f0 * sample_period;

        match *self {
            Self::Lowpass { f0, k } => {
                let f0_bar = f0_bar(f0);
                let a1 = (1.0 - f0_bar) / (1.0 + f0_bar);
                let b0 = k * f0_bar / (1.0 + f0_bar);
                [b0, b0, 0.0, a1, 0.0]
            }
            Self::Highpass { f0, k } => {
                let f0_bar = f0_bar(f0);
                let a1 = (1.0 - f0_bar) / (1.0 + f0_bar);
                let b0 = k * f0_bar / (1.0 + f0_bar);
                let b1 = -k / (1.0 + f0_bar);
                [b0, b1, 0.0, a1, 0.0]
            }
            Self::Allpass { f0, k } => {
                let f0_bar = f0_bar(f0);
                let a1 = (1.0 - f0_bar) / (1.0 + f0_bar);
                let b0 = k * (1.0 - f0_bar) / (1.0 + f0_bar);
                [b0, -k, 0.0, a1, 0.0]
            }
            Self::Notch { f0, q, k } => {
                let f0_bar = f0_bar(f0);
                let f0_bar2 = f0_bar * f0_bar;
                let den = 1.0 + f0_bar / q + f0_bar2;

                let a1 = 2.0 * (1.0 - f0_bar2) / den;
                let a2 = -(1.0 - f0_bar / q + f0_bar2) / den;
                let b0 = k * (1.0 + f0_bar2) / den;
                let b1 = -(2.0 * k * (1.0 - f0_bar2)) / den;
                [b0, b1, b0, a1, a2]
            }
        }
    }
}

/// Output limits of an IIR stage in volts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IirOutput {
    pub y_min: f64,
    pub y_max: f64,
    pub y_offset: f64,
}

impl Default for IirOutput {
    fn default() -> Self {
        Self {
            y_min: -DAC_FULL_SCALE,
            y_max: DAC_FULL_SCALE,
            y_offset: 0.0,
        }
    }
}

/// IIR stage as stored on the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IirSettings {
    pub ba: [f64; 5],
    pub y_min: i32,
    pub y_max: i32,
    pub y_offset: i32,
}

impl IirSettings {
    pub fn new(ba: [f64; 5], output: &IirOutput, scale: &VoltageScale) -> Self {
        Self {
            ba,
            y_min: scale.to_machine_units(output.y_min),
            y_max: scale.to_machine_units(output.y_max),
            y_offset: scale.to_machine_units(output.y_offset),
        }
    }
}

/// Program the first IIR stage of a channel.
pub async fn configure<B: Broker>(
    broker: &B,
    device: &ResolvedAddress,
    channel: Channel,
    design: &FilterDesign,
    sample_period: f64,
    output: &IirOutput,
) -> Result<Ack> {
    let ba = design.coefficients(sample_period);
    let settings = IirSettings::new(ba, output, &VoltageScale::STABILIZER);
    tracing::debug!(channel = %channel, filter = design.name(), ?settings, "Computed IIR stage");

    transact(broker, device, &channel.iir_path(), &settings).await
}
