//! Error types for the settings client.

use std::collections::BTreeSet;

use thiserror::Error;

/// Result type alias using [`MiniconfError`].
pub type Result<T> = std::result::Result<T, MiniconfError>;

/// Errors that can occur while resolving or configuring a device.
#[derive(Error, Debug)]
pub enum MiniconfError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration parse error.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// A wildcard was given where a concrete device address is required.
    #[error("Invalid device address '{0}': an exact address without wildcards is required")]
    InvalidAddress(String),

    /// Discovery saw no live device matching the pattern.
    #[error("No device found matching '{pattern}'")]
    NoDeviceFound { pattern: String },

    /// Discovery saw more than one live device matching the pattern.
    #[error(
        "Multiple devices match '{pattern}' ({}); please use a more specific prefix",
        format_matches(matches)
    )]
    AmbiguousDeviceMatch {
        pattern: String,
        matches: BTreeSet<String>,
    },

    /// The broker or the device session could not be reached.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The device refused the value written to a path.
    #[error("Device rejected {value} at '{path}': {message}{}", format_code(*code))]
    WriteRejected {
        path: String,
        value: String,
        code: Option<i32>,
        message: String,
    },

    /// No acknowledgment arrived within the request timeout.
    #[error("Timed out waiting for acknowledgment of '{path}'")]
    Timeout { path: String },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_matches(matches: &BTreeSet<String>) -> String {
    matches.iter().cloned().collect::<Vec<_>>().join(", ")
}

fn format_code(code: Option<i32>) -> String {
    code.map(|code| format!(" (code {})", code))
        .unwrap_or_default()
}

impl MiniconfError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed(msg.into())
    }

    /// Whether the error came out of the discovery step.
    pub fn is_discovery(&self) -> bool {
        matches!(
            self,
            Self::NoDeviceFound { .. } | Self::AmbiguousDeviceMatch { .. }
        )
    }
}

impl From<miniconf_common::Error> for MiniconfError {
    fn from(err: miniconf_common::Error) -> Self {
        match err {
            miniconf_common::Error::Config(msg) => Self::Config(msg),
            miniconf_common::Error::KeyExpr(msg) => Self::Config(msg),
            miniconf_common::Error::Json(e) => Self::Serialization(e.to_string()),
            miniconf_common::Error::Io(e) => Self::Io(e),
            miniconf_common::Error::Zenoh(e) => Self::ConnectionFailed(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for MiniconfError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<json5::Error> for MiniconfError {
    fn from(err: json5::Error) -> Self {
        Self::ConfigParse(err.to_string())
    }
}
