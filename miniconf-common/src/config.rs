use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default zenoh port used when a broker is given without one.
pub const DEFAULT_BROKER_PORT: u16 = 7447;

/// Common Zenoh connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZenohConfig {
    /// Zenoh mode: "client", "peer", or "router".
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Endpoints to connect to (for client mode).
    #[serde(default)]
    pub connect: Vec<String>,

    /// Endpoints to listen on (for peer/router mode).
    #[serde(default)]
    pub listen: Vec<String>,
}

fn default_mode() -> String {
    "peer".to_string()
}

impl Default for ZenohConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            connect: Vec::new(),
            listen: Vec::new(),
        }
    }
}

impl ZenohConfig {
    /// Client-mode configuration connecting to a single broker.
    ///
    /// The broker string is translated with [`broker_endpoint`].
    pub fn for_broker(broker: &str) -> Self {
        Self {
            mode: "client".to_string(),
            connect: vec![broker_endpoint(broker)],
            listen: Vec::new(),
        }
    }

    /// Point this configuration at a broker, switching to client mode.
    pub fn with_broker(mut self, broker: &str) -> Self {
        self.mode = "client".to_string();
        self.connect = vec![broker_endpoint(broker)];
        self
    }
}

/// Turn a user-supplied broker address into a zenoh locator.
///
/// - `tcp/host:port`, `udp/...`, `quic/...` are used as-is
/// - `host:port` becomes `tcp/host:port`
/// - `host` becomes `tcp/host:7447`
///
/// # Example
/// ```
/// use miniconf_common::config::broker_endpoint;
///
/// assert_eq!(broker_endpoint("mqtt"), "tcp/mqtt:7447");
/// assert_eq!(broker_endpoint("10.0.0.1:7448"), "tcp/10.0.0.1:7448");
/// assert_eq!(broker_endpoint("udp/10.0.0.1:7447"), "udp/10.0.0.1:7447");
/// ```
pub fn broker_endpoint(broker: &str) -> String {
    let broker = broker.trim();
    if broker.contains('/') {
        broker.to_string()
    } else if broker.ends_with(']') || !broker.contains(':') {
        format!("tcp/{}:{}", broker, DEFAULT_BROKER_PORT)
    } else {
        format!("tcp/{}", broker)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Common logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl LoggingConfig {
    /// Raise the level by `verbosity` steps above `warn`.
    ///
    /// Mirrors the usual `-v`/`-vv`/`-vvv` convention. A verbosity of zero
    /// keeps the configured level.
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        let level = match verbosity {
            0 => return self,
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        self.level = level.to_string();
        self
    }
}

/// Timing of the settings protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// How long discovery collects presence replies.
    #[serde(default = "default_discovery_timeout_ms")]
    pub discovery_timeout_ms: u64,

    /// How long a settings write waits for the device acknowledgment.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_discovery_timeout_ms() -> u64 {
    1_000
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            discovery_timeout_ms: default_discovery_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl ProtocolConfig {
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Base configuration shared by all tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BaseConfig {
    /// Zenoh connection settings.
    #[serde(default)]
    pub zenoh: ZenohConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Settings protocol timing.
    #[serde(default)]
    pub miniconf: ProtocolConfig,
}

/// Default location of the configuration file.
///
/// `<config dir>/stabilizer/stabilizer.json5`, or `None` on platforms
/// without a configuration directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("stabilizer").join("stabilizer.json5"))
}

/// Load a configuration file in JSON5 format.
pub fn load_config<T: for<'de> Deserialize<'de>>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;

    json5::from_str(&content).map_err(|e| {
        Error::Config(format!(
            "Failed to parse config file '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Load a configuration from a JSON5 string.
pub fn parse_config<T: for<'de> Deserialize<'de>>(content: &str) -> Result<T> {
    json5::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_config() {
        let json5 = r#"
        {
            zenoh: {
                mode: "client",
                connect: ["tcp/localhost:7447"],
            },
            logging: {
                level: "debug",
            },
            miniconf: {
                discovery_timeout_ms: 250,
            },
        }
        "#;

        let config: BaseConfig = parse_config(json5).unwrap();

        assert_eq!(config.zenoh.mode, "client");
        assert_eq!(config.zenoh.connect, vec!["tcp/localhost:7447"]);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.miniconf.discovery_timeout(), Duration::from_millis(250));
        assert_eq!(config.miniconf.request_timeout_ms, 10_000);
    }

    #[test]
    fn test_default_config() {
        let config: BaseConfig = parse_config("{}").unwrap();

        assert_eq!(config.zenoh.mode, "peer");
        assert!(config.zenoh.connect.is_empty());
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert_eq!(config.miniconf, ProtocolConfig::default());
    }

    #[test]
    fn test_json_logging_format() {
        let json5 = r#"{ logging: { level: "debug", format: "json" } }"#;

        let config: BaseConfig = parse_config(json5).unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_broker_endpoint() {
        assert_eq!(broker_endpoint("mqtt"), "tcp/mqtt:7447");
        assert_eq!(broker_endpoint(" localhost "), "tcp/localhost:7447");
        assert_eq!(broker_endpoint("192.168.1.10:7500"), "tcp/192.168.1.10:7500");
        assert_eq!(broker_endpoint("[::1]"), "tcp/[::1]:7447");
        assert_eq!(broker_endpoint("[::1]:7500"), "tcp/[::1]:7500");
        assert_eq!(broker_endpoint("tcp/router:7447"), "tcp/router:7447");
    }

    #[test]
    fn test_with_broker_switches_to_client() {
        let config = ZenohConfig::default().with_broker("router");
        assert_eq!(config.mode, "client");
        assert_eq!(config.connect, vec!["tcp/router:7447"]);
        assert_eq!(config, ZenohConfig::for_broker("router"));
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(LoggingConfig::default().with_verbosity(0).level, "warn");
        assert_eq!(LoggingConfig::default().with_verbosity(1).level, "info");
        assert_eq!(LoggingConfig::default().with_verbosity(2).level, "debug");
        assert_eq!(LoggingConfig::default().with_verbosity(5).level, "trace");
    }

    #[test]
    fn test_missing_config_file() {
        let result: Result<BaseConfig> = load_config("/nonexistent/stabilizer.json5");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
