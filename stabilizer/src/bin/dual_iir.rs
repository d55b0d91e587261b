//! Configure the first IIR stage of one Stabilizer dual-iir channel from a
//! high-level filter design.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use miniconf_client::{ConnectionArgs, DevicePattern, resolve_or_exact};
use stabilizer::units::{DAC_FULL_SCALE, DEFAULT_SAMPLE_TICKS, sample_period};
use stabilizer::{Channel, FilterDesign, IirOutput, iir};

#[derive(Parser, Debug)]
#[command(about = "Configure Stabilizer dual-iir filter parameters")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// The Stabilizer device prefix, wildcards allowed as long as the match is unique.
    #[arg(short, long, default_value = "dt/sinara/dual-iir/+")]
    prefix: DevicePattern,

    /// Do not discover the Stabilizer device prefix.
    #[arg(short = 'd', long)]
    no_discover: bool,

    /// The filter channel to configure (0 or 1).
    #[arg(short, long)]
    channel: Channel,

    /// The number of Stabilizer hardware ticks between each sample.
    #[arg(long, default_value_t = DEFAULT_SAMPLE_TICKS)]
    sample_ticks: u32,

    /// The channel minimum output level (V).
    #[arg(long, default_value_t = -DAC_FULL_SCALE, allow_negative_numbers = true)]
    y_min: f64,

    /// The channel maximum output level (V).
    #[arg(long, default_value_t = DAC_FULL_SCALE, allow_negative_numbers = true)]
    y_max: f64,

    /// The channel output offset level (V).
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    y_offset: f64,

    #[command(subcommand)]
    filter: Filter,
}

/// Filter-specific design parameters.
#[derive(Subcommand, Debug)]
enum Filter {
    /// Gain-limited low-pass filter.
    Lowpass(FirstOrder),
    /// Gain-limited high-pass filter.
    Highpass(FirstOrder),
    /// Gain-limited all-pass filter.
    Allpass(FirstOrder),
    /// Notch filter.
    Notch(SecondOrder),
}

#[derive(Args, Debug)]
struct FirstOrder {
    /// Corner frequency (Hz).
    #[arg(long)]
    f0: f64,

    /// Filter gain.
    #[arg(long = "k", alias = "K", allow_negative_numbers = true)]
    k: f64,
}

#[derive(Args, Debug)]
struct SecondOrder {
    /// Corner frequency (Hz).
    #[arg(long)]
    f0: f64,

    /// Filter quality factor.
    #[arg(long = "q", alias = "Q")]
    q: f64,

    /// Filter gain.
    #[arg(long = "k", alias = "K", allow_negative_numbers = true)]
    k: f64,
}

impl From<&Filter> for FilterDesign {
    fn from(filter: &Filter) -> Self {
        match filter {
            Filter::Lowpass(args) => FilterDesign::Lowpass {
                f0: args.f0,
                k: args.k,
            },
            Filter::Highpass(args) => FilterDesign::Highpass {
                f0: args.f0,
                k: args.k,
            },
            Filter::Allpass(args) => FilterDesign::Allpass {
                f0: args.f0,
                k: args.k,
            },
            Filter::Notch(args) => FilterDesign::Notch {
                f0: args.f0,
                q: args.q,
                k: args.k,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (_config, broker) = cli.connection.setup()?;

    let design = FilterDesign::from(&cli.filter);
    let output = IirOutput {
        y_min: cli.y_min,
        y_max: cli.y_max,
        y_offset: cli.y_offset,
    };
    let period = sample_period(cli.sample_ticks);

    let device = resolve_or_exact(&broker, &cli.prefix, !cli.no_discover)
        .await
        .context("Failed to determine the device prefix")?;

    let ack = iir::configure(&broker, &device, cli.channel, &design, period, &output)
        .await
        .with_context(|| {
            format!(
                "Failed to configure {} filter on channel {} of {}",
                design.name(),
                cli.channel,
                device
            )
        })?;

    tracing::info!(device = %ack.device, path = %ack.path, filter = design.name(), "IIR configured");
    Ok(())
}
