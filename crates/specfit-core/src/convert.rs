//! Conversion of fitted peak parameters into reported peak parameters.
//!
//! Fitted peaks carry the raw model height and width parameter. Reported peaks
//! measure power against the aperiodic fit at the centre frequency and width as
//! a chosen bandwidth measure. Converters are plain variants picked once at
//! configuration time; custom conversions are function pointers.

use crate::data::nearest_ind;
use crate::settings::PeakShape;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `(modeled, aperiodic) -> peak power`, both in log10 power.
pub type PowerFn = fn(f64, f64) -> f64;

/// How peak power is measured relative to the aperiodic component.
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerConverter {
    /// Difference in log10 power.
    #[default]
    LogSubtract,
    /// Ratio of log10 powers.
    LogDivide,
    /// Difference in linear power.
    LinearSubtract,
    /// Ratio of linear powers.
    LinearDivide,
    /// Caller-supplied conversion.
    #[serde(skip)]
    Custom(PowerFn),
}

impl PowerConverter {
    /// Peak power from the full model and the aperiodic fit at one frequency.
    pub fn apply(&self, modeled: f64, aperiodic: f64) -> f64 {
        match self {
            Self::LogSubtract => modeled - aperiodic,
            Self::LogDivide => modeled / aperiodic,
            Self::LinearSubtract => 10f64.powf(modeled) - 10f64.powf(aperiodic),
            Self::LinearDivide => 10f64.powf(modeled) / 10f64.powf(aperiodic),
            Self::Custom(f) => f(modeled, aperiodic),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::LogSubtract => "log_subtract",
            Self::LogDivide => "log_divide",
            Self::LinearSubtract => "linear_subtract",
            Self::LinearDivide => "linear_divide",
            Self::Custom(_) => "custom",
        }
    }
}

impl PartialEq for PowerConverter {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Custom(a), Self::Custom(b)) => std::ptr::fn_addr_eq(*a, *b),
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl fmt::Debug for PowerConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How peak width is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidthConverter {
    /// Full width at half maximum.
    #[default]
    FullWidth,
    /// The model's own width parameter (standard deviation for Gaussians).
    StdDev,
}

impl WidthConverter {
    /// Reported width for a fitted width parameter.
    pub fn apply(self, width: f64, shape: PeakShape) -> f64 {
        match self {
            Self::FullWidth => shape.fwhm_from_width(width),
            Self::StdDev => width,
        }
    }
}

/// Convert fitted `(centre, height, width)` triples into reported peak parameters.
///
/// Power is read at the bin nearest each centre frequency.
pub fn convert_peaks(
    fitted: &[[f64; 3]],
    freqs: &[f64],
    modeled: &[f64],
    ap_fit: &[f64],
    shape: PeakShape,
    power: PowerConverter,
    width: WidthConverter,
) -> Vec<[f64; 3]> {
    fitted
        .iter()
        .map(|&[ctr, _, wid]| {
            let ind = nearest_ind(freqs, ctr);
            [
                ctr,
                power.apply(modeled[ind], ap_fit[ind]),
                width.apply(wid, shape),
            ]
        })
        .collect()
}
