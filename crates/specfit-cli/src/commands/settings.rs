//! Settings inspection command.

use super::common::load_config;
use clap::Args;
use specfit_config::{builtin_configs, validate_config};
use specfit_core::SETTINGS_DEFINITION;
use std::path::PathBuf;

/// Arguments for `specfit settings`.
#[derive(Args)]
pub struct SettingsArgs {
    /// List the built-in configurations
    #[arg(long)]
    list: bool,

    /// TOML configuration file to resolve
    #[arg(short, long, conflicts_with = "preset")]
    config: Option<PathBuf>,

    /// Built-in configuration to resolve
    #[arg(short, long)]
    preset: Option<String>,

    /// Write the resolved configuration to a TOML file
    #[arg(long, value_name = "FILE")]
    save: Option<PathBuf>,
}

/// Print the settings table and a resolved configuration.
pub fn run(args: SettingsArgs) -> anyhow::Result<()> {
    if args.list {
        println!("Built-in configurations:\n");
        for config in builtin_configs() {
            println!(
                "  {:<10} {}",
                config.name,
                config.description.as_deref().unwrap_or("")
            );
        }
        return Ok(());
    }

    println!("Settings:\n");
    for setting in SETTINGS_DEFINITION {
        println!("  {:<22} {}", setting.name, setting.type_desc);
        println!("  {:<22} {}", "", setting.description);
    }

    let config = load_config(args.config.as_ref(), args.preset.as_deref())?;
    validate_config(&config)?;

    println!("\nResolved configuration '{}':\n", config.name);
    println!("{}", config.to_toml()?);

    if let Some(path) = args.save {
        config.save(&path)?;
        println!("Saved to {}", path.display());
    }
    Ok(())
}
