//! Spectrum fitting command.

use super::common::{load_config, read_spectrum};
use anyhow::Context;
use clap::Args;
use specfit_core::{ApMode, PeakShape, SpectralModel};
use std::path::PathBuf;

/// Arguments for `specfit fit`.
#[derive(Args)]
pub struct FitArgs {
    /// Two-column text file: frequency, linear power
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Frequency range to fit, in Hz
    #[arg(long, num_args = 2, value_names = ["LO", "HI"])]
    range: Option<Vec<f64>>,

    /// TOML configuration file
    #[arg(short, long, conflicts_with = "preset")]
    config: Option<PathBuf>,

    /// Built-in configuration name
    #[arg(short, long)]
    preset: Option<String>,

    /// Fit the aperiodic component with a knee
    #[arg(long)]
    knee: bool,

    /// Peak shape (gaussian or cauchy)
    #[arg(long)]
    shape: Option<PeakShape>,

    /// Maximum number of peaks
    #[arg(long)]
    max_peaks: Option<usize>,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,
}

/// Fit one spectrum file and print the result.
pub fn run(args: FitArgs) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_ref(), args.preset.as_deref())?;
    if args.knee {
        config.aperiodic.mode = ApMode::Knee;
    }
    if let Some(shape) = args.shape {
        config.peaks.shape = shape;
    }
    if let Some(n) = args.max_peaks {
        config.peaks.max_n_peaks = Some(n);
    }
    let config_name = config.name.clone();
    let (modes, settings) = config.into_settings()?;
    let model = SpectralModel::new(modes, settings)?;

    let (freqs, powers) = read_spectrum(&args.input)?;
    let freq_range = args.range.as_deref().map(|r| (r[0], r[1]));

    tracing::info!(
        "fitting {} ({} points, config '{}', {})",
        args.input.display(),
        freqs.len(),
        config_name,
        model.algorithm().name()
    );
    let result = model
        .fit(&freqs, &powers, freq_range)
        .with_context(|| format!("failed to fit '{}'", args.input.display()))?;

    if !result.is_success() {
        tracing::warn!("no valid model found for {}", args.input.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{result}");
    }
    Ok(())
}
