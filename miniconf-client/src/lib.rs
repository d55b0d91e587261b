//! Miniconf Client
//!
//! Discovery and configuration of Miniconf devices over Zenoh.
//!
//! # Overview
//!
//! This crate provides:
//! - [`Broker`] and [`DeviceSession`], the transport seam, with the Zenoh
//!   implementation [`ZenohBroker`]
//! - [`resolve`] to turn a [`DevicePattern`] into exactly one
//!   [`ResolvedAddress`]
//! - [`Miniconf`] and [`transact`] for set-and-acknowledge writes
//! - [`ConnectionArgs`] for common CLI argument parsing
//! - [`DeviceEmulator`], a device-side responder for end-to-end tests
//!
//! # Example
//!
//! ```ignore
//! use miniconf_client::{DevicePattern, ZenohBroker, resolve, transact};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let broker = ZenohBroker::from_address("mqtt");
//!     let pattern = DevicePattern::new("dt/sinara/dual-pid/+")?;
//!
//!     let device = resolve(&broker, &pattern).await?;
//!     transact(&broker, &device, "telemetry_period", &10).await?;
//!     Ok(())
//! }
//! ```

mod args;
mod broker;
mod config;
mod device;
mod discovery;
mod error;
mod interface;

pub use args::{ConnectionArgs, DEFAULT_BROKER};
pub use broker::{Broker, DeviceSession, ZenohBroker, ZenohDeviceSession};
pub use config::{load as load_config, validate as validate_config};
pub use device::{CODE_DESERIALIZATION, CODE_REJECTED, DeviceEmulator, Validator};
pub use discovery::{DevicePattern, ResolvedAddress, resolve, resolve_or_exact, select_unique};
pub use error::{MiniconfError, Result};
pub use interface::{Ack, Miniconf, Response, transact};

// Re-export commonly used types from miniconf-common
pub use miniconf_common::{BaseConfig, LoggingConfig, ProtocolConfig, ZenohConfig};
