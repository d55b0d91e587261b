//! Miniconf command line interface.
//!
//! Writes JSON-encoded values to settings paths of one device and prints the
//! device response for each. Stops at the first non-zero response code and
//! exits with it.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;

use miniconf_client::{ConnectionArgs, DevicePattern, Miniconf, resolve_or_exact};

#[derive(Parser, Debug)]
#[command(
    about = "Miniconf command line interface",
    after_help = "Examples:\n  miniconf dt/sinara/dual-iir/01 afe/0='\"G2\"' \
                  iir_ch/0/0='{\"y_min\": -32767, \"y_max\": 32767, \"y_offset\": 0, \"ba\": [1.0, 0, 0, 0, 0]}'"
)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// The topic prefix of the target. Wildcards trigger discovery and must
    /// match a single device.
    prefix: String,

    /// JSON encoded values for settings path keys.
    #[arg(value_name = "KEY=VALUE", required = true, value_parser = parse_setting)]
    settings: Vec<(String, Value)>,
}

/// Parse a `path=json` pair.
fn parse_setting(arg: &str) -> std::result::Result<(String, Value), String> {
    let (path, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", arg))?;
    if path.is_empty() {
        return Err(format!("empty settings path in '{}'", arg));
    }
    let value = serde_json::from_str(value)
        .map_err(|e| format!("invalid JSON value for '{}': {}", path, e))?;
    Ok((path.to_string(), value))
}

/// Map a device response code onto a process exit code.
fn exit_code(code: i32) -> ExitCode {
    match u8::try_from(code) {
        Ok(0) | Err(_) => ExitCode::FAILURE,
        Ok(code) => ExitCode::from(code),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let (_config, broker) = cli.connection.setup()?;

    let pattern = DevicePattern::new(cli.prefix.as_str())?;
    let device = resolve_or_exact(&broker, &pattern, !pattern.is_exact()).await?;

    let mut interface = Miniconf::create(&broker, &device)
        .await
        .with_context(|| format!("Failed to open a session to {}", device))?;

    let mut status = ExitCode::SUCCESS;
    for (path, value) in &cli.settings {
        let response = match interface.set(path, value).await {
            Ok(response) => response,
            Err(e) => {
                interface.close().await;
                return Err(e).with_context(|| format!("Failed to set '{}'", path));
            }
        };

        println!("{}: {}", path, serde_json::to_string(&response)?);
        if !response.is_ok() {
            status = exit_code(response.code);
            break;
        }
    }

    interface.close().await;
    Ok(status)
}
