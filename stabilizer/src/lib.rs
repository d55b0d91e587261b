//! Stabilizer configuration tools.
//!
//! Converts PID gains and IIR filter designs given in physical units into the
//! settings records of a Stabilizer and writes them with
//! [`miniconf_client`].
//!
//! # Settings paths
//!
//! ```text
//! <prefix>/settings/pid_ch/<channel>      PID parameters of one channel
//! <prefix>/settings/iir_ch/<channel>/0    first IIR stage of one channel
//! ```

pub mod iir;
pub mod pid;
pub mod units;

pub use iir::{FilterDesign, IirOutput, IirSettings};
pub use pid::{Channel, PidDeviceSettings, PidParameters};
pub use units::{DAC_FULL_SCALE, SAMPLE_PERIOD, VoltageScale, voltage_to_machine_units};
