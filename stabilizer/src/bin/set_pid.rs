//! Configure the PID parameters of one Stabilizer dual-pid channel.
//!
//! Note: assumes an AFE input gain of 1.

use anyhow::{Context, Result};
use clap::{Args, Parser};

use miniconf_client::{ConnectionArgs, DevicePattern, resolve_or_exact};
use stabilizer::units::{DAC_FULL_SCALE, SAMPLE_PERIOD};
use stabilizer::{Channel, PidParameters, pid};

#[derive(Parser, Debug)]
#[command(about = "Configure Stabilizer dual-pid parameters. Note: this assumes an AFE input gain of 1.")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// The Stabilizer device prefix, wildcards allowed as long as the match is unique.
    #[arg(short, long, default_value = "dt/sinara/dual-pid/+")]
    prefix: DevicePattern,

    /// Do not discover the Stabilizer device prefix.
    #[arg(short = 'd', long)]
    no_discover: bool,

    /// The PID channel to configure (0 or 1).
    #[arg(short, long)]
    channel: Channel,

    /// Sample period in seconds.
    #[arg(long, default_value_t = SAMPLE_PERIOD)]
    sample_period: f64,

    #[command(flatten)]
    pid: PidArgs,
}

#[derive(Args, Debug)]
struct PidArgs {
    /// Proportional (P) gain.
    #[arg(long = "p", default_value_t = 0.0, allow_negative_numbers = true)]
    p: f64,

    /// Integrator (I) gain.
    #[arg(long = "i", default_value_t = 0.0, allow_negative_numbers = true)]
    i: f64,

    /// Derivative (D) gain.
    #[arg(long = "d", default_value_t = 0.0, allow_negative_numbers = true)]
    d: f64,

    /// Integrator limit (V).
    #[arg(long, alias = "i_limit", default_value_t = DAC_FULL_SCALE, allow_negative_numbers = true)]
    i_limit: f64,

    /// The channel input offset (V).
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    x_offset: f64,

    /// The channel output offset (V).
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    y_offset: f64,

    /// The channel minimum output (V).
    #[arg(long, default_value_t = -DAC_FULL_SCALE, allow_negative_numbers = true)]
    y_min: f64,

    /// The channel maximum output (V).
    #[arg(long, default_value_t = DAC_FULL_SCALE, allow_negative_numbers = true)]
    y_max: f64,
}

impl From<&PidArgs> for PidParameters {
    fn from(args: &PidArgs) -> Self {
        Self {
            p: args.p,
            i: args.i,
            d: args.d,
            i_limit: args.i_limit,
            x_offset: args.x_offset,
            y_offset: args.y_offset,
            y_min: args.y_min,
            y_max: args.y_max,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (_config, broker) = cli.connection.setup()?;

    let device = resolve_or_exact(&broker, &cli.prefix, !cli.no_discover)
        .await
        .context("Failed to determine the device prefix")?;

    let params = PidParameters::from(&cli.pid);
    tracing::debug!(sample_period = cli.sample_period, ?params, "PID parameters");

    let ack = pid::configure(&broker, &device, cli.channel, &params)
        .await
        .with_context(|| format!("Failed to configure PID channel {} of {}", cli.channel, device))?;

    tracing::info!(device = %ack.device, path = %ack.path, message = %ack.message, "PID configured");
    Ok(())
}
