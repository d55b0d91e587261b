//! Miniconf Common Library
//!
//! Shared plumbing for the Miniconf settings tools:
//!
//! - [`config`] - Configuration loading (JSON5 format) and broker addresses
//! - [`session`] - Zenoh session management
//! - [`keyexpr`] - Device key expressions and pattern translation
//! - [`error`] - Error types

pub mod config;
pub mod error;
pub mod keyexpr;
pub mod session;

// Re-export commonly used types at the crate root
pub use config::{
    BaseConfig, LogFormat, LoggingConfig, ProtocolConfig, ZenohConfig, broker_endpoint,
    default_config_path, load_config, parse_config,
};
pub use error::{Error, Result};
pub use keyexpr::{
    ALIVE_SEGMENT, KeyExprBuilder, SETTINGS_SEGMENT, discovery_key, is_wildcard,
    normalize_path, parse_alive_key, translate_pattern,
};
pub use session::connect;

/// Initialize tracing with the given configuration.
///
/// Supports two output formats:
/// - `LogFormat::Text` (default): Human-readable text format
/// - `LogFormat::Json`: Structured JSON format for log aggregation systems
///
/// `RUST_LOG` takes precedence over the configured level. Logs go to stderr so
/// that command output on stdout stays clean.
///
/// # Example
///
/// ```ignore
/// use miniconf_common::{LoggingConfig, LogFormat, init_tracing};
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: LogFormat::Json,
/// };
/// init_tracing(&config)?;
/// ```
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
    }

    Ok(())
}
