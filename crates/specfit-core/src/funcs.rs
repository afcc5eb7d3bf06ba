//! Model functions and their analytic Jacobians.
//!
//! Aperiodic functions return log10 power for linear frequencies:
//!
//! - **fixed**: `L(f) = b - log10(f^χ)` with parameters `[offset, exponent]`
//! - **knee**: `L(f) = b - log10(k + f^χ)` with parameters `[offset, knee, exponent]`
//!
//! Periodic functions sum one shape per peak, with parameters packed as
//! consecutive `(center, height, width)` triples:
//!
//! - **gaussian**: `G(f) = a·exp(-(f-c)² / (2w²))`, `w` is the standard deviation
//! - **cauchy**: `C(f) = a·w² / ((f-c)² + w²)`, `w` is the half-width at half-maximum
//!
//! Jacobians have shape `[n_freqs, n_params]`. Peaks are additively independent,
//! so each triple's column block is computed on its own.

use faer::Mat;
use std::f64::consts::{LN_2, LN_10};

/// Number of parameters describing one peak.
pub const PEAK_STRIDE: usize = 3;

/// Ratio between a Gaussian's full width at half maximum and its standard deviation.
pub fn fwhm_factor() -> f64 {
    2.0 * (2.0 * LN_2).sqrt()
}

/// Convert a Gaussian standard deviation to full width at half maximum.
pub fn compute_fwhm(std: f64) -> f64 {
    std * fwhm_factor()
}

/// Convert a full width at half maximum to a Gaussian standard deviation.
pub fn compute_gauss_std(fwhm: f64) -> f64 {
    fwhm / fwhm_factor()
}

/// Aperiodic component without a knee.
pub fn aperiodic_fixed(freqs: &[f64], params: &[f64]) -> Vec<f64> {
    let (offset, exponent) = (params[0], params[1]);
    freqs.iter().map(|&f| offset - exponent * f.log10()).collect()
}

/// Aperiodic component with a knee.
pub fn aperiodic_knee(freqs: &[f64], params: &[f64]) -> Vec<f64> {
    let (offset, knee, exponent) = (params[0], params[1], params[2]);
    freqs
        .iter()
        .map(|&f| offset - (knee + f.powf(exponent)).log10())
        .collect()
}

/// Sum of Gaussian peaks.
pub fn gaussian(freqs: &[f64], params: &[f64]) -> Vec<f64> {
    debug_assert_eq!(params.len() % PEAK_STRIDE, 0);
    let mut ys = vec![0.0; freqs.len()];
    for peak in params.chunks_exact(PEAK_STRIDE) {
        let (ctr, hgt, wid) = (peak[0], peak[1], peak[2]);
        let denom = 2.0 * wid * wid;
        for (y, &f) in ys.iter_mut().zip(freqs) {
            let dx = f - ctr;
            *y += hgt * (-dx * dx / denom).exp();
        }
    }
    ys
}

/// Sum of Cauchy (Lorentzian) peaks.
pub fn cauchy(freqs: &[f64], params: &[f64]) -> Vec<f64> {
    debug_assert_eq!(params.len() % PEAK_STRIDE, 0);
    let mut ys = vec![0.0; freqs.len()];
    for peak in params.chunks_exact(PEAK_STRIDE) {
        let (ctr, hgt, wid) = (peak[0], peak[1], peak[2]);
        let wid2 = wid * wid;
        for (y, &f) in ys.iter_mut().zip(freqs) {
            let dx = f - ctr;
            *y += hgt * wid2 / (dx * dx + wid2);
        }
    }
    ys
}

/// Jacobian of [`aperiodic_fixed`].
pub fn jacobian_fixed(freqs: &[f64], _params: &[f64]) -> Mat<f64> {
    let mut jac = Mat::<f64>::zeros(freqs.len(), 2);
    for (i, &f) in freqs.iter().enumerate() {
        jac[(i, 0)] = 1.0;
        jac[(i, 1)] = -f.log10();
    }
    jac
}

/// Jacobian of [`aperiodic_knee`].
pub fn jacobian_knee(freqs: &[f64], params: &[f64]) -> Mat<f64> {
    let (knee, exponent) = (params[1], params[2]);
    let mut jac = Mat::<f64>::zeros(freqs.len(), 3);
    for (i, &f) in freqs.iter().enumerate() {
        let f_exp = f.powf(exponent);
        let denom = (knee + f_exp) * LN_10;
        jac[(i, 0)] = 1.0;
        jac[(i, 1)] = -1.0 / denom;
        jac[(i, 2)] = -(f_exp * f.ln()) / denom;
    }
    jac
}

/// Jacobian of [`gaussian`].
pub fn jacobian_gaussian(freqs: &[f64], params: &[f64]) -> Mat<f64> {
    let mut jac = Mat::<f64>::zeros(freqs.len(), params.len());
    for (k, peak) in params.chunks_exact(PEAK_STRIDE).enumerate() {
        let (ctr, hgt, wid) = (peak[0], peak[1], peak[2]);
        let wid2 = wid * wid;
        let wid3 = wid2 * wid;
        let col = k * PEAK_STRIDE;
        for (i, &f) in freqs.iter().enumerate() {
            let dx = f - ctr;
            let dx2 = dx * dx;
            let e = (-dx2 / (2.0 * wid2)).exp();
            jac[(i, col)] = hgt * e * dx / wid2;
            jac[(i, col + 1)] = e;
            jac[(i, col + 2)] = hgt * e * dx2 / wid3;
        }
    }
    jac
}

/// Jacobian of [`cauchy`].
pub fn jacobian_cauchy(freqs: &[f64], params: &[f64]) -> Mat<f64> {
    let mut jac = Mat::<f64>::zeros(freqs.len(), params.len());
    for (k, peak) in params.chunks_exact(PEAK_STRIDE).enumerate() {
        let (ctr, hgt, wid) = (peak[0], peak[1], peak[2]);
        let wid2 = wid * wid;
        let col = k * PEAK_STRIDE;
        for (i, &f) in freqs.iter().enumerate() {
            let dx = f - ctr;
            let denom = dx * dx + wid2;
            let denom2 = denom * denom;
            jac[(i, col)] = 2.0 * hgt * wid2 * dx / denom2;
            jac[(i, col + 1)] = wid2 / denom;
            jac[(i, col + 2)] = 2.0 * hgt * wid * dx * dx / denom2;
        }
    }
    jac
}
