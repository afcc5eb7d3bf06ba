//! Fit configuration file format and operations.

use serde::{Deserialize, Serialize};
use specfit_core::{
    ApMode, DataChecks, EdgeTolerance, ErrorMetric, FitSettings, Modes, PeakShape,
    PowerConverter, RobustThreshold, WidthConverter,
};
use std::path::Path;

use crate::error::ConfigError;
use crate::validation::validate_config;

/// Fit configuration, stored as TOML.
///
/// Every table and field is optional; missing values take the library defaults.
///
/// # TOML Format
///
/// ```toml
/// name = "eeg"
/// description = "Resting-state EEG, 1-40 Hz"
///
/// [aperiodic]
/// mode = "fixed"
/// exponent_bounds = [0.0, inf]
/// robust_threshold = { fraction_of_max = 0.025 }
///
/// [peaks]
/// shape = "gaussian"
/// max_n_peaks = 6
/// min_peak_height = 0.05
/// peak_threshold = 2.0
/// width_limits = [1.0, 8.0]
/// edge_tolerance = { absolute = 2.0 }
///
/// [solver]
/// max_nfev = 5000
/// tol = 1e-5
///
/// [metrics]
/// error = "mae"
/// peak_power = "log_subtract"
/// peak_width = "full_width"
///
/// [checks]
/// freqs = true
/// data = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    /// Name of the configuration.
    pub name: String,

    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Aperiodic component settings.
    #[serde(default)]
    pub aperiodic: AperiodicConfig,

    /// Peak search and validation settings.
    #[serde(default)]
    pub peaks: PeakConfig,

    /// Nonlinear solver settings.
    #[serde(default)]
    pub solver: SolverConfig,

    /// Reported metrics and peak conversions.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Input checks.
    #[serde(default)]
    pub checks: DataChecks,
}

/// `[aperiodic]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AperiodicConfig {
    /// Aperiodic form.
    pub mode: ApMode,
    /// Bounds on the exponent.
    pub exponent_bounds: (f64, f64),
    /// Background sample selection rule.
    pub robust_threshold: RobustThreshold,
}

/// `[peaks]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakConfig {
    /// Peak shape.
    pub shape: PeakShape,
    /// Maximum number of peaks; unbounded when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_n_peaks: Option<usize>,
    /// Absolute height threshold.
    pub min_peak_height: f64,
    /// Relative height threshold, in standard deviations.
    pub peak_threshold: f64,
    /// Width limits, FWHM in Hz.
    pub width_limits: (f64, f64),
    /// Fixed initial width, FWHM in Hz.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_width: Option<f64>,
    /// Guess edge distance, in widths.
    pub bw_std_edge: f64,
    /// Guess overlap threshold, in widths.
    pub overlap_thresh: f64,
    /// Centre-frequency bound, in widths.
    pub cf_bound: f64,
    /// Edge rejection rule.
    pub edge_tolerance: EdgeTolerance,
}

/// `[solver]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Function-evaluation budget per solve.
    pub max_nfev: usize,
    /// Convergence tolerance.
    pub tol: f64,
}

/// `[metrics]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Error metric.
    pub error: ErrorMetric,
    /// Peak power conversion.
    pub peak_power: PowerConverter,
    /// Peak width conversion.
    pub peak_width: WidthConverter,
}

impl Default for AperiodicConfig {
    fn default() -> Self {
        let settings = FitSettings::default();
        Self {
            mode: ApMode::default(),
            exponent_bounds: settings.exponent_bounds,
            robust_threshold: settings.robust_threshold,
        }
    }
}

impl Default for PeakConfig {
    fn default() -> Self {
        let settings = FitSettings::default();
        Self {
            shape: PeakShape::default(),
            max_n_peaks: settings.max_n_peaks,
            min_peak_height: settings.min_peak_height,
            peak_threshold: settings.peak_threshold,
            width_limits: settings.peak_width_limits,
            initial_width: settings.initial_peak_width,
            edge_tolerance: settings.edge_tolerance,
            bw_std_edge: settings.bw_std_edge,
            overlap_thresh: settings.gauss_overlap_thresh,
            cf_bound: settings.cf_bound,
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        let settings = FitSettings::default();
        Self {
            max_nfev: settings.max_nfev,
            tol: settings.tol,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            error: ErrorMetric::default(),
            peak_power: PowerConverter::default(),
            peak_width: WidthConverter::default(),
        }
    }
}

impl FitConfig {
    /// A configuration with library defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            aperiodic: AperiodicConfig::default(),
            peaks: PeakConfig::default(),
            solver: SolverConfig::default(),
            metrics: MetricsConfig::default(),
            checks: DataChecks::default(),
        }
    }

    /// Capture existing modes and settings.
    pub fn from_settings(name: impl Into<String>, modes: Modes, settings: &FitSettings) -> Self {
        Self {
            name: name.into(),
            description: None,
            aperiodic: AperiodicConfig {
                mode: modes.aperiodic,
                exponent_bounds: settings.exponent_bounds,
                robust_threshold: settings.robust_threshold,
            },
            peaks: PeakConfig {
                shape: modes.periodic,
                max_n_peaks: settings.max_n_peaks,
                min_peak_height: settings.min_peak_height,
                peak_threshold: settings.peak_threshold,
                width_limits: settings.peak_width_limits,
                initial_width: settings.initial_peak_width,
                edge_tolerance: settings.edge_tolerance,
                bw_std_edge: settings.bw_std_edge,
                overlap_thresh: settings.gauss_overlap_thresh,
                cf_bound: settings.cf_bound,
            },
            solver: SolverConfig {
                max_nfev: settings.max_nfev,
                tol: settings.tol,
            },
            metrics: MetricsConfig {
                error: settings.error_metric,
                peak_power: settings.peak_power,
                peak_width: settings.peak_width,
            },
            checks: settings.checks,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the aperiodic mode.
    pub fn with_aperiodic_mode(mut self, mode: ApMode) -> Self {
        self.aperiodic.mode = mode;
        self
    }

    /// Set the maximum number of peaks.
    pub fn with_max_n_peaks(mut self, n: usize) -> Self {
        self.peaks.max_n_peaks = Some(n);
        self
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load a configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validate all fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_config(self)?;
        Ok(())
    }

    /// Model forms selected by this configuration.
    pub fn modes(&self) -> Modes {
        Modes::new(self.aperiodic.mode, self.peaks.shape)
    }

    /// Validate and convert into core fit settings.
    pub fn into_settings(self) -> Result<(Modes, FitSettings), ConfigError> {
        self.validate()?;
        let modes = self.modes();
        let settings = FitSettings {
            max_n_peaks: self.peaks.max_n_peaks,
            min_peak_height: self.peaks.min_peak_height,
            peak_threshold: self.peaks.peak_threshold,
            peak_width_limits: self.peaks.width_limits,
            initial_peak_width: self.peaks.initial_width,
            exponent_bounds: self.aperiodic.exponent_bounds,
            robust_threshold: self.aperiodic.robust_threshold,
            edge_tolerance: self.peaks.edge_tolerance,
            bw_std_edge: self.peaks.bw_std_edge,
            gauss_overlap_thresh: self.peaks.overlap_thresh,
            cf_bound: self.peaks.cf_bound,
            error_metric: self.metrics.error,
            peak_power: self.metrics.peak_power,
            peak_width: self.metrics.peak_width,
            checks: self.checks,
            max_nfev: self.solver.max_nfev,
            tol: self.solver.tol,
        };
        Ok((modes, settings))
    }
}

impl Default for FitConfig {
    fn default() -> Self {
        Self::new("default")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tables_take_defaults() {
        let config = FitConfig::from_toml("name = \"bare\"").unwrap();
        assert_eq!(config.name, "bare");
        let (modes, settings) = config.into_settings().unwrap();
        assert_eq!(modes, Modes::default());
        assert_eq!(settings, FitSettings::default());
    }

    #[test]
    fn parses_full_document() {
        let toml = r#"
name = "eeg"
description = "Resting-state EEG"

[aperiodic]
mode = "knee"
exponent_bounds = [0.5, 4.0]
robust_threshold = { percentile = 2.5 }

[peaks]
shape = "cauchy"
max_n_peaks = 6
min_peak_height = 0.05
width_limits = [1.0, 8.0]
initial_width = 2.0
edge_tolerance = { width_multiple = 1.5 }

[solver]
max_nfev = 1000
tol = 1e-6

[metrics]
error = "rmse"
peak_power = "linear_subtract"
peak_width = "std_dev"

[checks]
freqs = false
"#;
        let config = FitConfig::from_toml(toml).unwrap();
        let (modes, settings) = config.into_settings().unwrap();
        assert_eq!(modes, Modes::new(ApMode::Knee, PeakShape::Cauchy));
        assert_eq!(settings.max_n_peaks, Some(6));
        assert_eq!(settings.robust_threshold, RobustThreshold::Percentile(2.5));
        assert_eq!(settings.edge_tolerance, EdgeTolerance::WidthMultiple(1.5));
        assert_eq!(settings.error_metric, ErrorMetric::RootMeanSquared);
        assert_eq!(settings.peak_power, PowerConverter::LinearSubtract);
        assert_eq!(settings.peak_width, WidthConverter::StdDev);
        assert!(!settings.checks.freqs);
        assert!(settings.checks.data);
        assert_eq!(settings.peak_threshold, 2.0);
    }

    #[test]
    fn error_metric_aliases() {
        let config = FitConfig::from_toml("name = \"x\"\n[metrics]\nerror = \"medae\"").unwrap();
        assert_eq!(config.metrics.error, ErrorMetric::MedianAbs);
    }

    #[test]
    fn unknown_mode_is_a_parse_error() {
        let err = FitConfig::from_toml("name = \"x\"\n[aperiodic]\nmode = \"lorentz\"").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }

    #[test]
    fn invalid_values_fail_conversion() {
        let config =
            FitConfig::from_toml("name = \"x\"\n[peaks]\nwidth_limits = [5.0, 1.0]").unwrap();
        assert!(matches!(config.into_settings(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn settings_round_trip_through_toml() {
        let settings = FitSettings::default()
            .with_max_n_peaks(3)
            .with_peak_threshold(1.5)
            .with_error_metric(ErrorMetric::MeanSquared);
        let modes = Modes::new(ApMode::Knee, PeakShape::Gaussian);
        let config = FitConfig::from_settings("rt", modes, &settings).with_description("round trip");

        let text = config.to_toml().unwrap();
        let parsed = FitConfig::from_toml(&text).unwrap();
        assert_eq!(parsed, config);
        assert_eq!(parsed.into_settings().unwrap(), (modes, settings));
    }
}
