//! Dual-PID channel configuration.
//!
//! A PID channel is configured through a single settings path,
//! `pid_ch/<channel>`, holding the whole parameter record. Gains are sent as
//! given; offsets and limits are converted from volts to machine units.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use miniconf_client::{Ack, Broker, ResolvedAddress, Result, transact};

use crate::units::{DAC_FULL_SCALE, VoltageScale};

/// One of the two processing channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Channel(u8);

impl Channel {
    pub const COUNT: u8 = 2;

    pub fn index(self) -> u8 {
        self.0
    }

    /// Settings path of this channel's PID parameters.
    pub fn pid_path(self) -> String {
        format!("pid_ch/{}", self.0)
    }

    /// Settings path of the first IIR stage of this channel.
    pub fn iir_path(self) -> String {
        format!("iir_ch/{}/0", self.0)
    }
}

impl TryFrom<u8> for Channel {
    type Error = String;

    fn try_from(index: u8) -> std::result::Result<Self, Self::Error> {
        if index < Self::COUNT {
            Ok(Self(index))
        } else {
            Err(format!("channel must be 0 or 1, got {}", index))
        }
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let index: u8 = s
            .trim()
            .parse()
            .map_err(|_| format!("channel must be 0 or 1, got '{}'", s))?;
        Self::try_from(index)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// PID parameters in physical units.
///
/// No consistency checks are made (e.g. `y_min > y_max` is sent as-is); the
/// device decides what it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidParameters {
    /// Proportional gain.
    pub p: f64,
    /// Integral gain.
    pub i: f64,
    /// Derivative gain.
    pub d: f64,
    /// Integrator limit in volts.
    pub i_limit: f64,
    /// Input offset in volts.
    pub x_offset: f64,
    /// Output offset in volts.
    pub y_offset: f64,
    /// Minimum output in volts.
    pub y_min: f64,
    /// Maximum output in volts.
    pub y_max: f64,
}

impl Default for PidParameters {
    fn default() -> Self {
        Self {
            p: 0.0,
            i: 0.0,
            d: 0.0,
            i_limit: DAC_FULL_SCALE,
            x_offset: 0.0,
            y_offset: 0.0,
            y_min: -DAC_FULL_SCALE,
            y_max: DAC_FULL_SCALE,
        }
    }
}

impl PidParameters {
    /// Convert to the record stored on the device.
    pub fn to_device(&self, scale: &VoltageScale) -> PidDeviceSettings {
        PidDeviceSettings {
            p: self.p,
            i: self.i,
            d: self.d,
            x_offset: scale.to_machine_units(self.x_offset),
            y_offset: scale.to_machine_units(self.y_offset),
            y_min: scale.to_machine_units(self.y_min),
            y_max: scale.to_machine_units(self.y_max),
            i_limit: scale.to_machine_units(self.i_limit),
        }
    }
}

/// PID parameters as stored on the device.
///
/// Field names and order are the firmware's settings schema.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidDeviceSettings {
    pub p: f64,
    pub i: f64,
    pub d: f64,
    pub x_offset: i32,
    pub y_offset: i32,
    pub y_min: i32,
    pub y_max: i32,
    pub i_limit: i32,
}

/// Configure one PID channel using the Stabilizer DAC scale.
pub async fn configure<B: Broker>(
    broker: &B,
    device: &ResolvedAddress,
    channel: Channel,
    params: &PidParameters,
) -> Result<Ack> {
    configure_with_scale(broker, device, channel, params, &VoltageScale::STABILIZER).await
}

/// Configure one PID channel: convert, open a session, write once, await the
/// acknowledgment.
pub async fn configure_with_scale<B: Broker>(
    broker: &B,
    device: &ResolvedAddress,
    channel: Channel,
    params: &PidParameters,
    scale: &VoltageScale,
) -> Result<Ack> {
    let settings = params.to_device(scale);
    tracing::debug!(channel = %channel, ?settings, "Converted PID parameters");

    transact(broker, device, &channel.pid_path(), &settings).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_bounds() {
        assert_eq!(Channel::try_from(0).unwrap().index(), 0);
        assert_eq!(Channel::try_from(1).unwrap().index(), 1);
        assert!(Channel::try_from(2).is_err());
        assert!("1".parse::<Channel>().is_ok());
        assert!("-1".parse::<Channel>().is_err());
        assert!("two".parse::<Channel>().is_err());
    }

    #[test]
    fn test_paths() {
        let channel = Channel::try_from(1).unwrap();
        assert_eq!(channel.pid_path(), "pid_ch/1");
        assert_eq!(channel.iir_path(), "iir_ch/1/0");
    }

    #[test]
    fn test_conversion() {
        let params = PidParameters {
            p: 1.5,
            i: 0.2,
            d: 0.0,
            i_limit: 5.0,
            x_offset: 0.0,
            y_offset: -2.5,
            y_min: -10.0,
            y_max: 10.0,
        };

        let settings = params.to_device(&VoltageScale::new(10.0, 32768.0));

        assert_eq!(settings.p, 1.5);
        assert_eq!(settings.i, 0.2);
        assert_eq!(settings.d, 0.0);
        assert_eq!(settings.i_limit, 16384);
        assert_eq!(settings.x_offset, 0);
        assert_eq!(settings.y_offset, -8192);
        assert_eq!(settings.y_min, -32768);
        assert_eq!(settings.y_max, 32768);
    }

    #[test]
    fn test_defaults_span_full_scale() {
        let settings = PidParameters::default().to_device(&VoltageScale::STABILIZER);
        assert_eq!(settings.y_min, -0x7FFF);
        assert_eq!(settings.y_max, 0x7FFF);
        assert_eq!(settings.i_limit, 0x7FFF);
    }

    #[test]
    fn test_inverted_limits_are_sent_as_given() {
        let params = PidParameters {
            y_min: 1.0,
            y_max: -1.0,
            ..Default::default()
        };
        let settings = params.to_device(&VoltageScale::STABILIZER);
        assert!(settings.y_min > settings.y_max);
    }

    #[test]
    fn test_wire_schema() {
        let settings = PidParameters::default().to_device(&VoltageScale::STABILIZER);
        let json = serde_json::to_value(settings).unwrap();
        let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            ["d", "i", "i_limit", "p", "x_offset", "y_max", "y_min", "y_offset"]
        );
    }
}
