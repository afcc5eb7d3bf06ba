//! Synthetic power spectra.
//!
//! Spectra are built in log10 power as aperiodic + periodic + noise and
//! returned in linear power, so they can be fed straight back into a fit.
//! Randomness comes from a caller-supplied [`Rng`]; seed it for reproducible
//! output.

use crate::error::{Error, Result};
use crate::funcs::PEAK_STRIDE;
use crate::settings::{ApMode, PeakShape};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Evenly spaced frequencies covering `[lo, hi]` at resolution `res`.
///
/// The upper bound is included when it falls on the grid.
pub fn gen_freqs(freq_range: (f64, f64), res: f64) -> Result<Vec<f64>> {
    let (lo, hi) = freq_range;
    if !(res > 0.0 && res.is_finite()) {
        return Err(Error::Data(format!("frequency resolution must be positive, got {res}")));
    }
    if !(lo.is_finite() && hi.is_finite() && lo <= hi && lo >= 0.0) {
        return Err(Error::Data(format!("invalid frequency range [{lo}, {hi}]")));
    }
    let n = ((hi + 0.5 * res - lo) / res).ceil() as usize;
    Ok((0..n).map(|i| lo + res * i as f64).collect())
}

/// Aperiodic component in log10 power.
///
/// The mode is taken from the parameter count: 2 is fixed, 3 is knee.
pub fn gen_aperiodic(freqs: &[f64], params: &[f64]) -> Result<Vec<f64>> {
    let mode = match params.len() {
        2 => ApMode::Fixed,
        3 => ApMode::Knee,
        n => {
            return Err(Error::Data(format!(
                "aperiodic parameters must have 2 or 3 values, got {n}"
            )));
        }
    };
    Ok(mode.func()(freqs, params))
}

/// Periodic component in log10 power from `(centre, height, width)` triples.
pub fn gen_periodic(freqs: &[f64], params: &[f64], shape: PeakShape) -> Result<Vec<f64>> {
    if params.len() % PEAK_STRIDE != 0 {
        return Err(Error::Data(format!(
            "peak parameters must come in triples, got {} values",
            params.len()
        )));
    }
    Ok(shape.func()(freqs, params))
}

/// Normally distributed noise with standard deviation `level`.
pub fn gen_noise<R: Rng>(n: usize, level: f64, rng: &mut R) -> Result<Vec<f64>> {
    let normal = Normal::new(0.0, level)
        .map_err(|e| Error::Data(format!("invalid noise level {level}: {e}")))?;
    Ok(normal.sample_iter(rng).take(n).collect())
}

/// A simulated spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct SimSpectrum {
    /// Frequencies, in Hz.
    pub freqs: Vec<f64>,
    /// Linear power.
    pub powers: Vec<f64>,
}

/// Generate a linear power spectrum.
///
/// `peak_params` holds `(centre, height, width)` triples; an empty slice gives
/// an aperiodic-only spectrum. `noise` is the standard deviation of the normal
/// noise added in log10 power.
pub fn gen_power_spectrum<R: Rng>(
    freq_range: (f64, f64),
    ap_params: &[f64],
    peak_params: &[f64],
    noise: f64,
    res: f64,
    rng: &mut R,
) -> Result<SimSpectrum> {
    let freqs = gen_freqs(freq_range, res)?;
    let ap = gen_aperiodic(&freqs, ap_params)?;
    let pk = gen_periodic(&freqs, peak_params, PeakShape::Gaussian)?;
    let nz = gen_noise(freqs.len(), noise, rng)?;

    let powers = ap
        .iter()
        .zip(&pk)
        .zip(&nz)
        .map(|((a, p), n)| 10f64.powf(a + p + n))
        .collect();
    Ok(SimSpectrum { freqs, powers })
}
