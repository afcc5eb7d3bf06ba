//! Fit configuration validation.
//!
//! Checks every numeric field of a [`FitConfig`] against its allowed range and
//! reports all problems at once, naming fields by their TOML path.
//!
//! ```rust
//! use specfit_config::{FitConfig, validate_config};
//!
//! let config = FitConfig::default();
//! validate_config(&config).expect("defaults are valid");
//! ```

use crate::config::FitConfig;
use specfit_core::{EdgeTolerance, RobustThreshold};
use thiserror::Error;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Value outside its allowed range.
    #[error("'{field}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// TOML path of the field.
        field: String,
        /// The offending value.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// Fields that are individually valid but inconsistent together.
    #[error("invalid '{field}': {reason}")]
    Inconsistent {
        /// TOML path of the field.
        field: String,
        /// What is wrong.
        reason: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate a fit configuration.
pub fn validate_config(config: &FitConfig) -> ValidationResult<()> {
    let mut errors = Vec::new();

    let (lo, hi) = config.peaks.width_limits;
    check_range(&mut errors, "peaks.width_limits[0]", lo, f64::MIN_POSITIVE, f64::MAX);
    check_range(&mut errors, "peaks.width_limits[1]", hi, f64::MIN_POSITIVE, f64::MAX);
    if lo >= hi {
        errors.push(ValidationError::Inconsistent {
            field: "peaks.width_limits".to_string(),
            reason: format!("lower limit {lo} must be below upper limit {hi}"),
        });
    }
    if let Some(width) = config.peaks.initial_width {
        check_range(&mut errors, "peaks.initial_width", width, lo, hi);
    }
    check_range(&mut errors, "peaks.min_peak_height", config.peaks.min_peak_height, 0.0, f64::MAX);
    check_range(&mut errors, "peaks.peak_threshold", config.peaks.peak_threshold, 0.0, f64::INFINITY);
    check_range(&mut errors, "peaks.bw_std_edge", config.peaks.bw_std_edge, 0.0, f64::MAX);
    check_range(&mut errors, "peaks.overlap_thresh", config.peaks.overlap_thresh, 0.0, f64::MAX);
    check_range(&mut errors, "peaks.cf_bound", config.peaks.cf_bound, 0.0, f64::MAX);
    match config.peaks.edge_tolerance {
        EdgeTolerance::Absolute(v) | EdgeTolerance::WidthMultiple(v) => {
            check_range(&mut errors, "peaks.edge_tolerance", v, 0.0, f64::MAX);
        }
    }

    let (elo, ehi) = config.aperiodic.exponent_bounds;
    if elo.is_nan() || ehi.is_nan() || elo > ehi {
        errors.push(ValidationError::Inconsistent {
            field: "aperiodic.exponent_bounds".to_string(),
            reason: format!("lower bound {elo} must not exceed upper bound {ehi}"),
        });
    }
    match config.aperiodic.robust_threshold {
        RobustThreshold::FractionOfMax(f) => {
            check_range(&mut errors, "aperiodic.robust_threshold", f, 0.0, 1.0);
        }
        RobustThreshold::Percentile(p) => {
            check_range(&mut errors, "aperiodic.robust_threshold", p, 0.0, 100.0);
        }
    }

    if config.solver.max_nfev == 0 {
        errors.push(ValidationError::OutOfRange {
            field: "solver.max_nfev".to_string(),
            value: 0.0,
            min: 1.0,
            max: f64::INFINITY,
        });
    }
    check_range(&mut errors, "solver.tol", config.solver.tol, f64::MIN_POSITIVE, f64::MAX);

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}

fn check_range(errors: &mut Vec<ValidationError>, field: &str, value: f64, min: f64, max: f64) {
    if !(min..=max).contains(&value) {
        errors.push(ValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
}
