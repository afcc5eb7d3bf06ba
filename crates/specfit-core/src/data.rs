//! Spectrum preparation: trimming, log conversion and shape checks.
//!
//! Input power is linear. After preparation the spectrum is stored as log10
//! power on a trimmed, evenly spaced frequency axis, ready for fitting.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

const SPACING_RTOL: f64 = 1e-5;
const SPACING_ATOL: f64 = 1e-8;

/// Toggles for the optional input checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataChecks {
    /// Require evenly spaced frequencies.
    pub freqs: bool,
    /// Reject NaN or infinite values after log conversion.
    pub data: bool,
}

impl Default for DataChecks {
    fn default() -> Self {
        Self {
            freqs: true,
            data: true,
        }
    }
}

/// A prepared power spectrum.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumData {
    freqs: Vec<f64>,
    power_spectrum: Vec<f64>,
    freq_range: (f64, f64),
    freq_res: f64,
}

impl SpectrumData {
    /// Prepare a single linear power spectrum with default checks.
    ///
    /// `freq_range` defaults to the full input range.
    pub fn new(freqs: &[f64], powers: &[f64], freq_range: Option<(f64, f64)>) -> Result<Self> {
        Self::with_checks(freqs, powers, freq_range, DataChecks::default())
    }

    /// Prepare a single linear power spectrum.
    pub fn with_checks(
        freqs: &[f64],
        powers: &[f64],
        freq_range: Option<(f64, f64)>,
        checks: DataChecks,
    ) -> Result<Self> {
        if freqs.len() != powers.len() {
            return Err(Error::InconsistentData {
                freqs: freqs.len(),
                powers: powers.len(),
            });
        }
        Self::prepare(freqs, powers.to_vec(), freq_range, checks)
    }

    /// Prepare the mean of several linear power spectra sharing one frequency axis.
    ///
    /// Replicates are averaged in linear power before log conversion.
    pub fn from_spectra(
        freqs: &[f64],
        spectra: &[Vec<f64>],
        freq_range: Option<(f64, f64)>,
        checks: DataChecks,
    ) -> Result<Self> {
        if spectra.is_empty() {
            return Err(Error::Data("no power spectra provided".into()));
        }
        if let Some(bad) = spectra.iter().find(|s| s.len() != freqs.len()) {
            return Err(Error::InconsistentData {
                freqs: freqs.len(),
                powers: bad.len(),
            });
        }

        let count = spectra.len() as f64;
        let mut mean = vec![0.0; freqs.len()];
        for spectrum in spectra {
            for (m, &p) in mean.iter_mut().zip(spectrum) {
                *m += p;
            }
        }
        for m in &mut mean {
            *m /= count;
        }

        Self::prepare(freqs, mean, freq_range, checks)
    }

    fn prepare(
        freqs: &[f64],
        powers: Vec<f64>,
        freq_range: Option<(f64, f64)>,
        checks: DataChecks,
    ) -> Result<Self> {
        if freqs.len() < 2 {
            return Err(Error::Data(format!(
                "need at least 2 frequency values, got {}",
                freqs.len()
            )));
        }
        if freqs.iter().any(|f| !f.is_finite()) {
            return Err(Error::Data("frequency values must be finite".into()));
        }
        if freqs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(Error::Data(
                "frequency values must be strictly increasing".into(),
            ));
        }

        let (mut freqs, mut powers) = match freq_range {
            Some(range) => {
                check_range(freqs, range)?;
                trim_spectrum(freqs, &powers, range)
            }
            None => (freqs.to_vec(), powers),
        };

        if freqs.first() == Some(&0.0) {
            freqs.remove(0);
            powers.remove(0);
        }
        if freqs.len() < 2 {
            return Err(Error::Data(format!(
                "frequency range leaves {} usable point(s), need at least 2",
                freqs.len()
            )));
        }

        let freq_res = freqs[1] - freqs[0];
        if checks.freqs && !evenly_spaced(&freqs, freq_res) {
            return Err(Error::Data(
                "frequency values are not evenly spaced".into(),
            ));
        }

        let power_spectrum: Vec<f64> = powers.iter().map(|p| p.log10()).collect();
        if checks.data && power_spectrum.iter().any(|p| !p.is_finite()) {
            return Err(Error::Data(
                "power spectrum contains NaN or infinite values after log conversion".into(),
            ));
        }

        let freq_range = (freqs[0], freqs[freqs.len() - 1]);
        Ok(Self {
            freqs,
            power_spectrum,
            freq_range,
            freq_res,
        })
    }

    /// Frequency values, in Hz.
    pub fn freqs(&self) -> &[f64] {
        &self.freqs
    }

    /// Power values, in log10 units.
    pub fn power_spectrum(&self) -> &[f64] {
        &self.power_spectrum
    }

    /// First and last frequency after trimming.
    pub fn freq_range(&self) -> (f64, f64) {
        self.freq_range
    }

    /// Frequency resolution (spacing between bins).
    pub fn freq_res(&self) -> f64 {
        self.freq_res
    }

    /// Number of frequency bins.
    pub fn len(&self) -> usize {
        self.freqs.len()
    }

    /// Whether there are no frequency bins.
    pub fn is_empty(&self) -> bool {
        self.freqs.is_empty()
    }
}

/// Index of the value closest to `target`; ties resolve to the first index.
pub fn nearest_ind(values: &[f64], target: f64) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, &v) in values.iter().enumerate() {
        let dist = (v - target).abs();
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }
    best
}

/// Keep the bins between the ones nearest to each end of `range`, inclusive.
pub fn trim_spectrum(freqs: &[f64], powers: &[f64], range: (f64, f64)) -> (Vec<f64>, Vec<f64>) {
    let lo = nearest_ind(freqs, range.0);
    let hi = nearest_ind(freqs, range.1);
    if hi < lo {
        return (Vec::new(), Vec::new());
    }
    (freqs[lo..=hi].to_vec(), powers[lo..=hi].to_vec())
}

fn check_range(freqs: &[f64], range: (f64, f64)) -> Result<()> {
    let available = (freqs[0], freqs[freqs.len() - 1]);
    let half_bin = 0.5 * (freqs[1] - freqs[0]);
    let (lo, hi) = range;
    let inside = lo.is_finite()
        && hi.is_finite()
        && lo <= hi
        && lo >= available.0 - half_bin
        && hi <= available.1 + half_bin;
    if inside {
        Ok(())
    } else {
        Err(Error::FreqRange {
            requested: range,
            available,
        })
    }
}

fn evenly_spaced(freqs: &[f64], freq_res: f64) -> bool {
    freqs
        .windows(2)
        .all(|w| ((w[1] - w[0]) - freq_res).abs() <= SPACING_ATOL + SPACING_RTOL * freq_res.abs())
}
