//! Fit results.

use crate::settings::Modes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Immutable outcome of fitting one spectrum.
///
/// A failed fit is a result too: every numeric field is NaN and
/// [`is_success`](Self::is_success) returns false. A successful fit with no
/// peaks has finite aperiodic parameters, error and R².
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    /// Model forms used.
    pub modes: Modes,
    /// Frequencies of the fitted range, in Hz.
    pub freqs: Vec<f64>,
    /// Observed spectrum, log10 power.
    pub power_spectrum: Vec<f64>,
    /// Aperiodic parameters, in the mode's label order.
    pub aperiodic_params: Vec<f64>,
    /// Raw fitted peak triples `(centre, height, width parameter)`, ordered by centre.
    pub gaussian_params: Vec<[f64; 3]>,
    /// Reported peak triples `(centre, power, bandwidth)`, ordered by centre.
    pub peak_params: Vec<[f64; 3]>,
    /// Aperiodic component values.
    pub ap_fit: Vec<f64>,
    /// Periodic component values.
    pub peak_fit: Vec<f64>,
    /// Full model, `ap_fit + peak_fit`.
    pub modeled_spectrum: Vec<f64>,
    /// Error between model and data under the configured metric.
    pub error: f64,
    /// Squared correlation between model and data.
    pub r_squared: f64,
    /// R² adjusted for the number of fitted parameters.
    pub adj_r_squared: f64,
}

impl FitResult {
    /// The all-NaN result reported when a fit cannot be completed.
    pub fn failed(modes: Modes, freqs: Vec<f64>, power_spectrum: Vec<f64>) -> Self {
        let n = freqs.len();
        let nan_vec = vec![f64::NAN; n];
        Self {
            modes,
            freqs,
            power_spectrum,
            aperiodic_params: vec![f64::NAN; modes.aperiodic.n_params()],
            gaussian_params: vec![[f64::NAN; 3]],
            peak_params: vec![[f64::NAN; 3]],
            ap_fit: nan_vec.clone(),
            peak_fit: nan_vec.clone(),
            modeled_spectrum: nan_vec,
            error: f64::NAN,
            r_squared: f64::NAN,
            adj_r_squared: f64::NAN,
        }
    }

    /// Whether the fit completed with finite parameters.
    pub fn is_success(&self) -> bool {
        self.aperiodic_params.iter().all(|p| p.is_finite())
    }

    /// Number of finalized peaks; zero for a failed fit.
    pub fn n_peaks(&self) -> usize {
        if self.is_success() {
            self.peak_params.len()
        } else {
            0
        }
    }

    /// Aperiodic parameter by label (`"offset"`, `"knee"`, `"exponent"`).
    pub fn aperiodic(&self, label: &str) -> Option<f64> {
        self.modes
            .aperiodic
            .labels()
            .iter()
            .position(|&l| l == label)
            .map(|i| self.aperiodic_params[i])
    }

    /// The reported peak with the highest power, if any.
    pub fn strongest_peak(&self) -> Option<[f64; 3]> {
        if !self.is_success() {
            return None;
        }
        self.peak_params
            .iter()
            .copied()
            .max_by(|a, b| a[1].total_cmp(&b[1]))
    }

    /// Reported peaks whose centre lies within `[lo, hi]`.
    pub fn peaks_in_band(&self, lo: f64, hi: f64) -> Vec<[f64; 3]> {
        if !self.is_success() {
            return Vec::new();
        }
        self.peak_params
            .iter()
            .copied()
            .filter(|p| (lo..=hi).contains(&p[0]))
            .collect()
    }
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (lo, hi) = match (self.freqs.first(), self.freqs.last()) {
            (Some(lo), Some(hi)) => (*lo, *hi),
            _ => (f64::NAN, f64::NAN),
        };
        writeln!(f, "Spectral fit ({} aperiodic, {} peaks)", self.modes.aperiodic, self.modes.periodic)?;
        writeln!(f, "  range:      {lo:.2} - {hi:.2} Hz, {} bins", self.freqs.len())?;
        if !self.is_success() {
            return write!(f, "  fit failed: no valid model");
        }

        let labels = self.modes.aperiodic.labels();
        let params: Vec<String> = labels
            .iter()
            .zip(&self.aperiodic_params)
            .map(|(l, v)| format!("{l}={v:.4}"))
            .collect();
        writeln!(f, "  aperiodic:  {}", params.join(", "))?;

        writeln!(f, "  peaks:      {}", self.peak_params.len())?;
        for [cf, pw, bw] in &self.peak_params {
            writeln!(f, "    cf={cf:8.3} Hz  pw={pw:.4}  bw={bw:.3} Hz")?;
        }
        writeln!(f, "  r_squared:  {:.4}", self.r_squared)?;
        write!(f, "  error:      {:.4}", self.error)
    }
}
