//! specfit CLI - fit, simulate, and inspect power spectrum models.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "specfit")]
#[command(author, version, about = "Parameterize power spectra into aperiodic and periodic components", long_about = None)]
struct Cli {
    /// Log fit stages (equivalent to RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit a power spectrum from a two-column text file
    Fit(commands::fit::FitArgs),

    /// Generate a synthetic power spectrum
    Simulate(commands::simulate::SimulateArgs),

    /// Show the available settings and a resolved configuration
    Settings(commands::settings::SettingsArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Fit(args) => commands::fit::run(args),
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Settings(args) => commands::settings::run(args),
    }
}

/// Logs go to stderr so JSON and spectra on stdout stay clean.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
