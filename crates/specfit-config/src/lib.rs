//! Configuration files and built-in presets for specfit.
//!
//! A [`FitConfig`] is the on-disk form of the model modes and fit settings
//! used by [`specfit_core`]. It is stored as TOML, validated field by field,
//! and converted into [`specfit_core::FitSettings`] for fitting.
//!
//! # Features
//!
//! - **Config files**: Load and save fit configurations as TOML
//! - **Validation**: Range and consistency checks with TOML field paths
//! - **Built-in presets**: Named configurations for common cases
//!
//! # Example
//!
//! ```rust
//! use specfit_config::{FitConfig, get_builtin_config};
//! use specfit_core::SpectralModel;
//!
//! let config = get_builtin_config("strict").unwrap();
//! let (modes, settings) = config.into_settings().unwrap();
//! let model = SpectralModel::new(modes, settings).unwrap();
//! assert_eq!(model.settings().max_n_peaks, Some(4));
//!
//! let text = FitConfig::new("mine").with_max_n_peaks(3).to_toml().unwrap();
//! assert!(text.contains("max_n_peaks = 3"));
//! ```

mod config;
mod error;

/// Built-in configurations.
pub mod presets;

/// Configuration validation.
pub mod validation;

pub use config::{AperiodicConfig, FitConfig, MetricsConfig, PeakConfig, SolverConfig};
pub use error::ConfigError;
pub use presets::{BUILTIN_CONFIG_NAMES, builtin_configs, get_builtin_config, is_builtin_config};
pub use validation::{ValidationError, ValidationResult, validate_config};

/// Resolve a configuration from an optional file path or built-in preset name.
///
/// A file takes precedence over a preset; with neither, the `default` preset is used.
pub fn resolve_config(
    file: Option<&std::path::Path>,
    preset: Option<&str>,
) -> Result<FitConfig, ConfigError> {
    match (file, preset) {
        (Some(path), _) => FitConfig::load(path),
        (None, Some(name)) => {
            get_builtin_config(name).ok_or_else(|| ConfigError::PresetNotFound(name.to_string()))
        }
        (None, None) => Ok(FitConfig::default()),
    }
}
