//! Fit modes and settings.
//!
//! [`Modes`] chooses the model forms; [`FitSettings`] holds every tunable of the
//! fitting procedure. Both serialize with serde so they can be embedded in
//! configuration files. [`SETTINGS_DEFINITION`] describes the public settings for
//! help output.

use crate::convert::{PowerConverter, WidthConverter};
use crate::data::DataChecks;
use crate::error::{Error, Result};
use crate::funcs::{
    aperiodic_fixed, aperiodic_knee, cauchy, compute_fwhm, compute_gauss_std, gaussian,
    jacobian_cauchy, jacobian_fixed, jacobian_gaussian, jacobian_knee,
};
use crate::metrics::ErrorMetric;
use crate::solver::SolverOptions;
use faer::Mat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A model function, `(freqs, params) -> values`.
pub type ModelFn = fn(&[f64], &[f64]) -> Vec<f64>;

/// A Jacobian function, `(freqs, params) -> [n_freqs, n_params]`.
pub type JacobianFn = fn(&[f64], &[f64]) -> Mat<f64>;

/// Aperiodic model form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApMode {
    /// Offset and exponent.
    #[default]
    Fixed,
    /// Offset, knee and exponent.
    Knee,
}

impl ApMode {
    /// Number of aperiodic parameters.
    pub fn n_params(self) -> usize {
        self.labels().len()
    }

    /// Parameter names, in storage order.
    pub fn labels(self) -> &'static [&'static str] {
        match self {
            Self::Fixed => &["offset", "exponent"],
            Self::Knee => &["offset", "knee", "exponent"],
        }
    }

    /// Index of the exponent parameter.
    pub fn exponent_index(self) -> usize {
        self.n_params() - 1
    }

    /// Model function for this mode.
    pub fn func(self) -> ModelFn {
        match self {
            Self::Fixed => aperiodic_fixed,
            Self::Knee => aperiodic_knee,
        }
    }

    /// Jacobian for this mode.
    pub fn jacobian(self) -> JacobianFn {
        match self {
            Self::Fixed => jacobian_fixed,
            Self::Knee => jacobian_knee,
        }
    }
}

impl fmt::Display for ApMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => f.write_str("fixed"),
            Self::Knee => f.write_str("knee"),
        }
    }
}

impl FromStr for ApMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "knee" => Ok(Self::Knee),
            other => Err(format!("unknown aperiodic mode '{other}' (expected fixed or knee)")),
        }
    }
}

/// Periodic peak shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeakShape {
    /// Gaussian; width parameter is the standard deviation.
    #[default]
    Gaussian,
    /// Cauchy (Lorentzian); width parameter is the half-width at half-maximum.
    Cauchy,
}

impl PeakShape {
    /// Model function for this shape.
    pub fn func(self) -> ModelFn {
        match self {
            Self::Gaussian => gaussian,
            Self::Cauchy => cauchy,
        }
    }

    /// Jacobian for this shape.
    pub fn jacobian(self) -> JacobianFn {
        match self {
            Self::Gaussian => jacobian_gaussian,
            Self::Cauchy => jacobian_cauchy,
        }
    }

    /// Convert a full width at half maximum into this shape's width parameter.
    pub fn width_from_fwhm(self, fwhm: f64) -> f64 {
        match self {
            Self::Gaussian => compute_gauss_std(fwhm),
            Self::Cauchy => fwhm / 2.0,
        }
    }

    /// Convert this shape's width parameter into a full width at half maximum.
    pub fn fwhm_from_width(self, width: f64) -> f64 {
        match self {
            Self::Gaussian => compute_fwhm(width),
            Self::Cauchy => 2.0 * width,
        }
    }
}

impl fmt::Display for PeakShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gaussian => f.write_str("gaussian"),
            Self::Cauchy => f.write_str("cauchy"),
        }
    }
}

impl FromStr for PeakShape {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gaussian" => Ok(Self::Gaussian),
            "cauchy" | "lorentzian" => Ok(Self::Cauchy),
            other => Err(format!(
                "unknown peak shape '{other}' (expected gaussian or cauchy)"
            )),
        }
    }
}

/// Model forms used for one fit session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Modes {
    /// Aperiodic form.
    pub aperiodic: ApMode,
    /// Periodic form.
    pub periodic: PeakShape,
}

impl Modes {
    /// Modes from explicit forms.
    pub fn new(aperiodic: ApMode, periodic: PeakShape) -> Self {
        Self {
            aperiodic,
            periodic,
        }
    }
}

/// How background-only samples are chosen for the robust aperiodic fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RobustThreshold {
    /// Keep samples whose flattened residual is at most this fraction of its maximum.
    FractionOfMax(f64),
    /// Keep samples whose flattened residual is at most this percentile (0–100).
    Percentile(f64),
}

impl Default for RobustThreshold {
    fn default() -> Self {
        Self::FractionOfMax(0.025)
    }
}

/// Minimum distance a fitted peak centre must keep from the frequency-range edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeTolerance {
    /// Fixed distance in Hz.
    Absolute(f64),
    /// Multiple of the fitted peak's width parameter.
    WidthMultiple(f64),
}

impl EdgeTolerance {
    /// Tolerance in Hz for a peak with the given width parameter.
    pub fn resolve(self, width: f64) -> f64 {
        match self {
            Self::Absolute(hz) => hz,
            Self::WidthMultiple(k) => k * width,
        }
    }
}

impl Default for EdgeTolerance {
    fn default() -> Self {
        Self::Absolute(2.0)
    }
}

/// Tunables of the fitting procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitSettings {
    /// Maximum number of peaks; `None` is unbounded.
    pub max_n_peaks: Option<usize>,
    /// Absolute minimum peak height above the aperiodic fit, in log10 power.
    pub min_peak_height: f64,
    /// Relative peak threshold, in standard deviations of the flattened spectrum.
    pub peak_threshold: f64,
    /// Lower and upper peak width limits, as full width at half maximum (Hz).
    pub peak_width_limits: (f64, f64),
    /// Fixed initial peak width (FWHM, Hz); `None` estimates it from the data.
    pub initial_peak_width: Option<f64>,
    /// Bounds on the aperiodic exponent.
    pub exponent_bounds: (f64, f64),
    /// Sample selection for the robust aperiodic fit.
    pub robust_threshold: RobustThreshold,
    /// Edge rejection rule for fitted peaks.
    pub edge_tolerance: EdgeTolerance,
    /// Guesses closer than this many widths to an edge are dropped before the joint fit.
    pub bw_std_edge: f64,
    /// Guesses overlapping by more than this many widths are thinned before the joint fit.
    pub gauss_overlap_thresh: f64,
    /// Centre-frequency bound, in widths either side of the guess.
    pub cf_bound: f64,
    /// Error metric reported with the fit.
    pub error_metric: ErrorMetric,
    /// Peak power conversion for reported peak parameters.
    pub peak_power: PowerConverter,
    /// Peak width conversion for reported peak parameters.
    pub peak_width: WidthConverter,
    /// Optional input checks.
    pub checks: DataChecks,
    /// Solver function-evaluation budget.
    pub max_nfev: usize,
    /// Solver tolerance.
    pub tol: f64,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            max_n_peaks: None,
            min_peak_height: 0.0,
            peak_threshold: 2.0,
            peak_width_limits: (0.5, 12.0),
            initial_peak_width: None,
            exponent_bounds: (0.0, f64::INFINITY),
            robust_threshold: RobustThreshold::default(),
            edge_tolerance: EdgeTolerance::default(),
            bw_std_edge: 1.0,
            gauss_overlap_thresh: 0.75,
            cf_bound: 1.5,
            error_metric: ErrorMetric::default(),
            peak_power: PowerConverter::default(),
            peak_width: WidthConverter::default(),
            checks: DataChecks::default(),
            max_nfev: 5000,
            tol: 1e-5,
        }
    }
}

impl FitSettings {
    /// Set the maximum number of peaks.
    pub fn with_max_n_peaks(mut self, n: usize) -> Self {
        self.max_n_peaks = Some(n);
        self
    }

    /// Set the absolute minimum peak height.
    pub fn with_min_peak_height(mut self, height: f64) -> Self {
        self.min_peak_height = height;
        self
    }

    /// Set the relative peak threshold.
    pub fn with_peak_threshold(mut self, threshold: f64) -> Self {
        self.peak_threshold = threshold;
        self
    }

    /// Set the peak width limits (FWHM, Hz).
    pub fn with_peak_width_limits(mut self, lo: f64, hi: f64) -> Self {
        self.peak_width_limits = (lo, hi);
        self
    }

    /// Set the error metric.
    pub fn with_error_metric(mut self, metric: ErrorMetric) -> Self {
        self.error_metric = metric;
        self
    }

    /// Set the edge tolerance.
    pub fn with_edge_tolerance(mut self, tolerance: EdgeTolerance) -> Self {
        self.edge_tolerance = tolerance;
        self
    }

    /// Solver options derived from the budget and tolerance.
    pub fn solver_options(&self) -> SolverOptions {
        SolverOptions::new(self.max_nfev, self.tol)
    }

    /// Peak width limits expressed in the shape's width parameter.
    pub fn width_limits(&self, shape: PeakShape) -> (f64, f64) {
        (
            shape.width_from_fwhm(self.peak_width_limits.0),
            shape.width_from_fwhm(self.peak_width_limits.1),
        )
    }

    /// Check ranges and consistency of every field.
    pub fn validate(&self) -> Result<()> {
        let (lo, hi) = self.peak_width_limits;
        if !(lo.is_finite() && hi.is_finite() && lo > 0.0 && lo < hi) {
            return Err(Error::Settings(format!(
                "peak_width_limits must satisfy 0 < lower < upper, got ({lo}, {hi})"
            )));
        }
        if let Some(width) = self.initial_peak_width
            && !(lo..=hi).contains(&width)
        {
            return Err(Error::Settings(format!(
                "initial_peak_width {width} is outside peak_width_limits ({lo}, {hi})"
            )));
        }
        if !(self.min_peak_height >= 0.0 && self.min_peak_height.is_finite()) {
            return Err(Error::Settings(format!(
                "min_peak_height must be finite and non-negative, got {}",
                self.min_peak_height
            )));
        }
        if !(self.peak_threshold >= 0.0) {
            return Err(Error::Settings(format!(
                "peak_threshold must be non-negative, got {}",
                self.peak_threshold
            )));
        }
        let (elo, ehi) = self.exponent_bounds;
        if elo.is_nan() || ehi.is_nan() || elo > ehi {
            return Err(Error::Settings(format!(
                "exponent_bounds must satisfy lower <= upper, got ({elo}, {ehi})"
            )));
        }
        match self.robust_threshold {
            RobustThreshold::FractionOfMax(f) if !(0.0..=1.0).contains(&f) => {
                return Err(Error::Settings(format!(
                    "robust threshold fraction must be within [0, 1], got {f}"
                )));
            }
            RobustThreshold::Percentile(p) if !(0.0..=100.0).contains(&p) => {
                return Err(Error::Settings(format!(
                    "robust threshold percentile must be within [0, 100], got {p}"
                )));
            }
            _ => {}
        }
        let edge = match self.edge_tolerance {
            EdgeTolerance::Absolute(v) | EdgeTolerance::WidthMultiple(v) => v,
        };
        if !(edge >= 0.0 && edge.is_finite()) {
            return Err(Error::Settings(format!(
                "edge tolerance must be finite and non-negative, got {edge}"
            )));
        }
        for (name, value) in [
            ("bw_std_edge", self.bw_std_edge),
            ("gauss_overlap_thresh", self.gauss_overlap_thresh),
            ("cf_bound", self.cf_bound),
        ] {
            if !(value >= 0.0 && value.is_finite()) {
                return Err(Error::Settings(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if self.max_nfev == 0 {
            return Err(Error::Settings("max_nfev must be positive".into()));
        }
        if !(self.tol > 0.0 && self.tol.is_finite()) {
            return Err(Error::Settings(format!(
                "tol must be finite and positive, got {}",
                self.tol
            )));
        }
        Ok(())
    }
}

/// Name, type and description of one public setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingDescriptor {
    /// Field name, as used in [`FitSettings`] and configuration files.
    pub name: &'static str,
    /// Human-readable type.
    pub type_desc: &'static str,
    /// What the setting controls.
    pub description: &'static str,
}

/// Descriptions of the public fit settings.
pub const SETTINGS_DEFINITION: &[SettingDescriptor] = &[
    SettingDescriptor {
        name: "aperiodic_mode",
        type_desc: "'fixed' or 'knee'",
        description: "Which form of aperiodic component to fit.",
    },
    SettingDescriptor {
        name: "peak_shape",
        type_desc: "'gaussian' or 'cauchy'",
        description: "Which shape to fit periodic peaks with.",
    },
    SettingDescriptor {
        name: "max_n_peaks",
        type_desc: "int >= 0, optional",
        description: "Maximum number of peaks to fit; unbounded when unset.",
    },
    SettingDescriptor {
        name: "min_peak_height",
        type_desc: "float >= 0",
        description: "Absolute threshold for detecting peaks, in log10 power above the aperiodic fit.",
    },
    SettingDescriptor {
        name: "peak_threshold",
        type_desc: "float >= 0",
        description: "Relative threshold for detecting peaks, in standard deviations of the flattened spectrum.",
    },
    SettingDescriptor {
        name: "peak_width_limits",
        type_desc: "(float, float)",
        description: "Limits on possible peak width, as full width at half maximum in Hz.",
    },
    SettingDescriptor {
        name: "initial_peak_width",
        type_desc: "float, optional",
        description: "Fixed starting width for peak guesses (FWHM, Hz); estimated from the data when unset.",
    },
    SettingDescriptor {
        name: "exponent_bounds",
        type_desc: "(float, float)",
        description: "Bounds on the aperiodic exponent.",
    },
    SettingDescriptor {
        name: "robust_threshold",
        type_desc: "fraction_of_max or percentile",
        description: "Rule for choosing background-only samples in the robust aperiodic fit.",
    },
    SettingDescriptor {
        name: "edge_tolerance",
        type_desc: "absolute (Hz) or width_multiple",
        description: "Fitted peaks closer than this to a frequency-range edge are dropped.",
    },
    SettingDescriptor {
        name: "bw_std_edge",
        type_desc: "float >= 0",
        description: "Peak guesses closer than this many widths to an edge are dropped before fitting.",
    },
    SettingDescriptor {
        name: "gauss_overlap_thresh",
        type_desc: "float >= 0",
        description: "Overlapping peak guesses closer than this many widths are thinned before fitting.",
    },
    SettingDescriptor {
        name: "cf_bound",
        type_desc: "float >= 0",
        description: "Centre frequency may move this many widths either side of its guess.",
    },
    SettingDescriptor {
        name: "error_metric",
        type_desc: "'mae', 'mse', 'rmse' or 'medae'",
        description: "Error measure reported between the model and the data.",
    },
    SettingDescriptor {
        name: "max_nfev",
        type_desc: "int > 0",
        description: "Function-evaluation budget for each nonlinear solve.",
    },
    SettingDescriptor {
        name: "tol",
        type_desc: "float > 0",
        description: "Convergence tolerance for each nonlinear solve.",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        FitSettings::default().validate().unwrap();
    }

    #[test]
    fn rejects_inverted_width_limits() {
        let settings = FitSettings::default().with_peak_width_limits(8.0, 2.0);
        assert!(matches!(settings.validate(), Err(Error::Settings(_))));
    }

    #[test]
    fn rejects_initial_width_outside_limits() {
        let settings = FitSettings {
            initial_peak_width: Some(20.0),
            ..FitSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_bad_percentile() {
        let settings = FitSettings {
            robust_threshold: RobustThreshold::Percentile(150.0),
            ..FitSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn rejects_zero_budget() {
        let settings = FitSettings {
            max_nfev: 0,
            ..FitSettings::default()
        };
        assert!(settings.validate().is_err());
    }

    #[test]
    fn mode_labels() {
        assert_eq!(ApMode::Fixed.labels(), &["offset", "exponent"]);
        assert_eq!(ApMode::Knee.n_params(), 3);
        assert_eq!(ApMode::Knee.exponent_index(), 2);
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("Knee".parse::<ApMode>(), Ok(ApMode::Knee));
        assert_eq!("lorentzian".parse::<PeakShape>(), Ok(PeakShape::Cauchy));
        assert!("lorentz".parse::<ApMode>().is_err());
    }

    #[test]
    fn width_conversion_matches_shape() {
        let fwhm = 4.0;
        for shape in [PeakShape::Gaussian, PeakShape::Cauchy] {
            let w = shape.width_from_fwhm(fwhm);
            assert!((shape.fwhm_from_width(w) - fwhm).abs() < 1e-12);
        }
        assert_eq!(PeakShape::Cauchy.width_from_fwhm(fwhm), 2.0);
    }

    #[test]
    fn edge_tolerance_resolves() {
        assert_eq!(EdgeTolerance::Absolute(2.0).resolve(5.0), 2.0);
        assert_eq!(EdgeTolerance::WidthMultiple(1.5).resolve(2.0), 3.0);
    }

    #[test]
    fn definitions_cover_names_once() {
        let mut names: Vec<_> = SETTINGS_DEFINITION.iter().map(|d| d.name).collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
        assert!(names.contains(&"peak_width_limits"));
    }
}
