//! Goodness-of-fit measures between an observed and a modeled spectrum.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Signature of a user-supplied error function, `(observed, modeled) -> error`.
pub type ErrorFn = fn(&[f64], &[f64]) -> f64;

/// Error measure reported alongside R².
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMetric {
    /// Mean absolute error.
    #[default]
    #[serde(alias = "mae")]
    MeanAbs,
    /// Mean squared error.
    #[serde(alias = "mse")]
    MeanSquared,
    /// Root mean squared error.
    #[serde(alias = "rmse")]
    RootMeanSquared,
    /// Median absolute error.
    #[serde(alias = "medae")]
    MedianAbs,
    /// Caller-supplied function.
    #[serde(skip)]
    Custom(ErrorFn),
}

impl ErrorMetric {
    /// Evaluate the metric.
    pub fn compute(&self, observed: &[f64], modeled: &[f64]) -> f64 {
        match self {
            Self::MeanAbs => mean_abs_error(observed, modeled),
            Self::MeanSquared => mean_squared_error(observed, modeled),
            Self::RootMeanSquared => root_mean_squared_error(observed, modeled),
            Self::MedianAbs => median_abs_error(observed, modeled),
            Self::Custom(f) => f(observed, modeled),
        }
    }

    /// Short label, as accepted by [`FromStr`].
    pub fn label(&self) -> &'static str {
        match self {
            Self::MeanAbs => "mae",
            Self::MeanSquared => "mse",
            Self::RootMeanSquared => "rmse",
            Self::MedianAbs => "medae",
            Self::Custom(_) => "custom",
        }
    }
}

impl PartialEq for ErrorMetric {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Custom(a), Self::Custom(b)) => std::ptr::fn_addr_eq(*a, *b),
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl fmt::Debug for ErrorMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for ErrorMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ErrorMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mae" | "mean_abs" => Ok(Self::MeanAbs),
            "mse" | "mean_squared" => Ok(Self::MeanSquared),
            "rmse" | "root_mean_squared" => Ok(Self::RootMeanSquared),
            "medae" | "median_abs" => Ok(Self::MedianAbs),
            other => Err(format!(
                "unknown error metric '{other}' (expected mae, mse, rmse or medae)"
            )),
        }
    }
}

fn abs_errors(observed: &[f64], modeled: &[f64]) -> impl Iterator<Item = f64> {
    observed.iter().zip(modeled).map(|(o, m)| (o - m).abs())
}

/// Mean absolute error.
pub fn mean_abs_error(observed: &[f64], modeled: &[f64]) -> f64 {
    let n = observed.len().min(modeled.len());
    if n == 0 {
        return f64::NAN;
    }
    abs_errors(observed, modeled).sum::<f64>() / n as f64
}

/// Mean squared error.
pub fn mean_squared_error(observed: &[f64], modeled: &[f64]) -> f64 {
    let n = observed.len().min(modeled.len());
    if n == 0 {
        return f64::NAN;
    }
    abs_errors(observed, modeled).map(|e| e * e).sum::<f64>() / n as f64
}

/// Root mean squared error.
pub fn root_mean_squared_error(observed: &[f64], modeled: &[f64]) -> f64 {
    mean_squared_error(observed, modeled).sqrt()
}

/// Median absolute error.
pub fn median_abs_error(observed: &[f64], modeled: &[f64]) -> f64 {
    let mut errors: Vec<f64> = abs_errors(observed, modeled).collect();
    if errors.is_empty() {
        return f64::NAN;
    }
    errors.sort_by(f64::total_cmp);
    let mid = errors.len() / 2;
    if errors.len() % 2 == 0 {
        0.5 * (errors[mid - 1] + errors[mid])
    } else {
        errors[mid]
    }
}

/// Squared Pearson correlation between observed and modeled values.
///
/// Returns NaN when either input has zero variance.
pub fn r_squared(observed: &[f64], modeled: &[f64]) -> f64 {
    let n = observed.len().min(modeled.len());
    if n < 2 {
        return f64::NAN;
    }
    let nf = n as f64;
    let mean_o = observed[..n].iter().sum::<f64>() / nf;
    let mean_m = modeled[..n].iter().sum::<f64>() / nf;

    let mut cov = 0.0;
    let mut var_o = 0.0;
    let mut var_m = 0.0;
    for (o, m) in observed.iter().zip(modeled) {
        let (dob, dm) = (o - mean_o, m - mean_m);
        cov += dob * dm;
        var_o += dob * dob;
        var_m += dm * dm;
    }

    let denom = (var_o * var_m).sqrt();
    if denom == 0.0 {
        return f64::NAN;
    }
    let r = cov / denom;
    r * r
}

/// R² adjusted for `n_params` fitted parameters over `n_points` samples.
pub fn adjusted_r_squared(r_squared: f64, n_points: usize, n_params: usize) -> f64 {
    if n_points <= n_params + 1 {
        return f64::NAN;
    }
    let n = n_points as f64;
    let k = n_params as f64;
    1.0 - (1.0 - r_squared) * (n - 1.0) / (n - k - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OBS: [f64; 4] = [1.0, 2.0, 3.0, 4.0];
    const MODEL: [f64; 4] = [1.5, 2.0, 2.0, 4.0];

    #[test]
    fn error_metrics() {
        assert!((mean_abs_error(&OBS, &MODEL) - 0.375).abs() < 1e-12);
        assert!((mean_squared_error(&OBS, &MODEL) - 0.3125).abs() < 1e-12);
        assert!((root_mean_squared_error(&OBS, &MODEL) - 0.3125f64.sqrt()).abs() < 1e-12);
        assert!((median_abs_error(&OBS, &MODEL) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn metric_dispatch() {
        assert_eq!(
            ErrorMetric::MeanSquared.compute(&OBS, &MODEL),
            mean_squared_error(&OBS, &MODEL)
        );
        fn max_err(o: &[f64], m: &[f64]) -> f64 {
            o.iter().zip(m).map(|(a, b)| (a - b).abs()).fold(0.0, f64::max)
        }
        assert_eq!(ErrorMetric::Custom(max_err).compute(&OBS, &MODEL), 1.0);
    }

    #[test]
    fn metric_parsing() {
        assert_eq!("mae".parse::<ErrorMetric>(), Ok(ErrorMetric::MeanAbs));
        assert_eq!("RMSE".parse::<ErrorMetric>(), Ok(ErrorMetric::RootMeanSquared));
        assert_eq!("median_abs".parse::<ErrorMetric>(), Ok(ErrorMetric::MedianAbs));
        assert!("r2".parse::<ErrorMetric>().is_err());
    }

    #[test]
    fn perfect_fit_has_unit_r_squared() {
        let r2 = r_squared(&OBS, &OBS.map(|x| 2.0 * x + 1.0));
        assert!((r2 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn constant_input_gives_nan_r_squared() {
        assert!(r_squared(&OBS, &[2.0; 4]).is_nan());
    }

    #[test]
    fn adjusted_r_squared_penalizes_params() {
        let adj = adjusted_r_squared(0.9, 100, 5);
        assert!(adj < 0.9);
        assert!(adjusted_r_squared(0.9, 3, 5).is_nan());
    }
}
