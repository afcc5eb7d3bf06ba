//! Synthetic spectrum generation command.

use super::common::{parse_peak, write_spectrum};
use clap::Args;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use specfit_core::sim;
use std::path::PathBuf;

/// Arguments for `specfit simulate`.
#[derive(Args)]
pub struct SimulateArgs {
    /// Frequency range, in Hz
    #[arg(long, num_args = 2, value_names = ["LO", "HI"], default_values_t = [1.0, 50.0])]
    range: Vec<f64>,

    /// Frequency resolution, in Hz
    #[arg(long, default_value = "0.5")]
    res: f64,

    /// Aperiodic parameters: OFFSET,EXP or OFFSET,KNEE,EXP
    #[arg(long, required = true, value_delimiter = ',', allow_hyphen_values = true)]
    aperiodic: Vec<f64>,

    /// Gaussian peak as CF,PW,STD (repeatable)
    #[arg(long = "peak", value_parser = parse_peak)]
    peaks: Vec<[f64; 3]>,

    /// Noise level (standard deviation in log10 power)
    #[arg(long, default_value = "0.005")]
    noise: f64,

    /// Random seed
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Output file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Generate a synthetic spectrum and write it out.
pub fn run(args: SimulateArgs) -> anyhow::Result<()> {
    let freq_range = (args.range[0], args.range[1]);
    let peak_params: Vec<f64> = args.peaks.iter().flatten().copied().collect();
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);

    let spectrum = sim::gen_power_spectrum(
        freq_range,
        &args.aperiodic,
        &peak_params,
        args.noise,
        args.res,
        &mut rng,
    )?;

    tracing::info!(
        "simulated {} points over {:.2}-{:.2} Hz with {} peaks",
        spectrum.freqs.len(),
        freq_range.0,
        freq_range.1,
        args.peaks.len()
    );
    write_spectrum(args.output.as_deref(), &spectrum.freqs, &spectrum.powers)
}
