//! CLI arguments shared by all tools.

use std::path::PathBuf;

use clap::Args;

use miniconf_common::{BaseConfig, LoggingConfig, init_tracing};

use crate::broker::ZenohBroker;
use crate::config;
use crate::error::{MiniconfError, Result};

/// Broker used when neither the command line nor the configuration names one.
pub const DEFAULT_BROKER: &str = "localhost";

/// Connection and logging arguments common to every tool.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// The broker used to communicate with the device [default: localhost].
    #[arg(short, long)]
    pub broker: Option<String>,

    /// Path to a JSON5 configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Increase logging verbosity (repeatable).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl ConnectionArgs {
    /// Load the configuration file and apply command-line overrides.
    ///
    /// `--broker` replaces the configured endpoints; with no broker anywhere
    /// the tools connect to [`DEFAULT_BROKER`].
    pub fn load_config(&self) -> Result<BaseConfig> {
        let mut config = config::load(self.config.as_deref())?;

        match &self.broker {
            Some(broker) => config.zenoh = config.zenoh.with_broker(broker),
            None if config.zenoh.connect.is_empty() => {
                config.zenoh = config.zenoh.with_broker(DEFAULT_BROKER)
            }
            None => {}
        }

        config.logging = self.logging(config.logging);
        Ok(config)
    }

    /// Apply `--log-level` and `-v` to a logging configuration.
    pub fn logging(&self, logging: LoggingConfig) -> LoggingConfig {
        let logging = logging.with_verbosity(self.verbose);
        match &self.log_level {
            Some(level) => LoggingConfig {
                level: level.clone(),
                ..logging
            },
            None => logging,
        }
    }

    /// Load the configuration, initialize logging and build the broker.
    pub fn setup(&self) -> Result<(BaseConfig, ZenohBroker)> {
        let config = self.load_config()?;
        init_tracing(&config.logging).map_err(|e| MiniconfError::config(e.to_string()))?;

        let broker = ZenohBroker::new(config.zenoh.clone(), config.miniconf);
        Ok((config, broker))
    }
}
