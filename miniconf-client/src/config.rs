//! Tool configuration loading.

use std::path::Path;

use miniconf_common::{BaseConfig, default_config_path};

use crate::error::{MiniconfError, Result};

/// Load the tool configuration.
///
/// An explicitly given path must exist. Without one, the default location is
/// used when a file is present there; otherwise built-in defaults apply.
pub fn load(path: Option<&Path>) -> Result<BaseConfig> {
    let config = match path {
        Some(path) => load_file(path)?,
        None => match default_config_path().filter(|path| path.exists()) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Using default configuration file");
                load_file(&path)?
            }
            None => BaseConfig::default(),
        },
    };

    validate(&config)?;
    Ok(config)
}

fn load_file(path: &Path) -> Result<BaseConfig> {
    if !path.exists() {
        return Err(MiniconfError::ConfigNotFound {
            path: path.display().to_string(),
        });
    }

    let content = std::fs::read_to_string(path)?;
    Ok(json5::from_str(&content)?)
}

/// Check the settings that cannot be expressed by the types alone.
pub fn validate(config: &BaseConfig) -> Result<()> {
    if config.miniconf.discovery_timeout_ms == 0 {
        return Err(MiniconfError::config(
            "miniconf.discovery_timeout_ms must be greater than zero",
        ));
    }
    if config.miniconf.request_timeout_ms == 0 {
        return Err(MiniconfError::config(
            "miniconf.request_timeout_ms must be greater than zero",
        ));
    }
    Ok(())
}
