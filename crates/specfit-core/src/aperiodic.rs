//! Aperiodic component fitting.
//!
//! The robust fit runs in two passes. A closed-form regression of log power on
//! log frequency gives a rough offset and exponent. Samples that rise above
//! that rough line are likely peaks, so only the samples selected by the
//! [`RobustThreshold`] rule are used to refine the full model with the bounded
//! solver. If the solve fails, the rough estimate is kept.

use crate::error::FitError;
use crate::settings::{ApMode, FitSettings, RobustThreshold};
use crate::solver::{Bounds, least_squares};

/// Aperiodic parameters and their values on the frequency axis.
#[derive(Debug, Clone, PartialEq)]
pub struct AperiodicFit {
    /// Parameters in [`ApMode::labels`] order.
    pub params: Vec<f64>,
    /// Model values at each frequency, log10 power.
    pub fit: Vec<f64>,
    /// Whether the refinement converged; `false` means the rough estimate was kept.
    pub converged: bool,
}

impl AperiodicFit {
    pub(crate) fn new(mode: ApMode, freqs: &[f64], params: Vec<f64>, converged: bool) -> Self {
        let fit = mode.func()(freqs, &params);
        Self {
            params,
            fit,
            converged,
        }
    }

    /// Converged fit, or `None` if the model is not finite on all of `freqs`.
    ///
    /// A knee fit on a subset of samples can land on a negative knee, which
    /// takes the log of a negative number at the lowest frequencies.
    pub(crate) fn refined(mode: ApMode, freqs: &[f64], params: Vec<f64>) -> Option<Self> {
        let fit = Self::new(mode, freqs, params, true);
        fit.is_finite().then_some(fit)
    }

    /// Whether every parameter and model value is finite.
    pub fn is_finite(&self) -> bool {
        self.params.iter().chain(&self.fit).all(|v| v.is_finite())
    }
}

/// Closed-form fit of a straight line in log-log space.
///
/// The knee, if present, is initialised to zero.
pub fn quick_fit(freqs: &[f64], power: &[f64], mode: ApMode) -> Vec<f64> {
    let xs: Vec<f64> = freqs.iter().map(|f| f.log10()).collect();
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = power.iter().sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (x, y) in xs.iter().zip(power) {
        sxy += (x - mean_x) * (y - mean_y);
        sxx += (x - mean_x) * (x - mean_x);
    }
    let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
    let offset = mean_y - slope * mean_x;
    let exponent = -slope;

    match mode {
        ApMode::Fixed => vec![offset, exponent],
        ApMode::Knee => vec![offset, 0.0, exponent],
    }
}

/// Bounds for the aperiodic parameters: only the exponent is constrained.
pub fn bounds(mode: ApMode, settings: &FitSettings) -> Bounds {
    let mut bounds = Bounds::unbounded(mode.n_params());
    let idx = mode.exponent_index();
    bounds.lower[idx] = settings.exponent_bounds.0;
    bounds.upper[idx] = settings.exponent_bounds.1;
    bounds
}

/// Bounded fit of the aperiodic model to every sample, starting from `guess`.
pub fn simple_fit(
    freqs: &[f64],
    power: &[f64],
    mode: ApMode,
    guess: &[f64],
    settings: &FitSettings,
) -> Result<Vec<f64>, FitError> {
    least_squares(
        mode.func(),
        mode.jacobian(),
        freqs,
        power,
        guess,
        &bounds(mode, settings),
        &settings.solver_options(),
    )
    .map(|solution| solution.params)
}

/// Two-pass robust aperiodic fit.
pub fn robust_fit(
    freqs: &[f64],
    power: &[f64],
    mode: ApMode,
    settings: &FitSettings,
) -> AperiodicFit {
    let mut rough = quick_fit(freqs, power, mode);
    bounds(mode, settings).clamp(&mut rough);
    let rough_fit = mode.func()(freqs, &rough);

    let flat: Vec<f64> = power
        .iter()
        .zip(&rough_fit)
        .map(|(p, f)| (p - f).max(0.0))
        .collect();
    let mask = background_mask(&flat, settings.robust_threshold);

    let (xs, ys): (Vec<f64>, Vec<f64>) = freqs
        .iter()
        .zip(power)
        .zip(&mask)
        .filter(|&(_, &keep)| keep)
        .map(|((&f, &p), _)| (f, p))
        .unzip();

    #[cfg(feature = "tracing")]
    tracing::debug!("ap_fit: {} of {} samples used for refinement", xs.len(), freqs.len());

    match simple_fit(&xs, &ys, mode, &rough, settings) {
        Ok(params) => {
            if let Some(fit) = AperiodicFit::refined(mode, freqs, params) {
                return fit;
            }
            #[cfg(feature = "tracing")]
            tracing::warn!("ap_fit: refinement not finite on all samples, keeping rough estimate");
        }
        Err(_err) => {
            #[cfg(feature = "tracing")]
            tracing::warn!("ap_fit: refinement failed ({_err}), keeping rough estimate");
        }
    }
    AperiodicFit::new(mode, freqs, rough, false)
}

/// Samples treated as background-only under `rule`.
pub fn background_mask(flat: &[f64], rule: RobustThreshold) -> Vec<bool> {
    let threshold = match rule {
        RobustThreshold::FractionOfMax(fraction) => {
            fraction * flat.iter().copied().fold(0.0, f64::max)
        }
        RobustThreshold::Percentile(pct) => percentile(flat, pct),
    };
    flat.iter().map(|&v| v <= threshold).collect()
}

/// Linearly interpolated percentile (0–100).
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = (pct / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
