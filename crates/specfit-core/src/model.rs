//! Fitting algorithms and the user-facing model.
//!
//! [`Algorithm`] is the capability every fitting strategy provides.
//! [`SpectralFit`] is the search-and-validate strategy: robust aperiodic fit,
//! greedy peak search on the flattened spectrum, joint peak fit with
//! validation, aperiodic refit on the peak-removed spectrum, then assembly.
//! [`ModelState`] carries the intermediate values from stage to stage.
//!
//! [`SpectralModel`] bundles modes, settings and an algorithm, and takes raw
//! linear spectra through preparation and fitting.

use crate::aperiodic::{AperiodicFit, robust_fit, simple_fit};
use crate::convert::convert_peaks;
use crate::data::SpectrumData;
use crate::error::Result;
use crate::metrics::{adjusted_r_squared, r_squared};
use crate::peaks::{PeakSet, find_guesses, prune_guesses};
use crate::results::FitResult;
use crate::settings::{FitSettings, Modes};
use crate::validate::fit_and_validate;

/// A strategy for fitting a prepared spectrum.
pub trait Algorithm: Send + Sync {
    /// Short identifier.
    fn name(&self) -> &str;

    /// One-line description.
    fn description(&self) -> &str;

    /// Fit `data` under `modes` and `settings`.
    ///
    /// Only invalid settings are reported as errors. A fit that cannot be
    /// completed yields [`FitResult::failed`].
    fn fit(&self, data: &SpectrumData, modes: Modes, settings: &FitSettings) -> Result<FitResult>;
}

/// Working values of one fit, filled in stage by stage.
#[derive(Debug, Clone)]
pub struct ModelState<'a> {
    data: &'a SpectrumData,
    modes: Modes,
    settings: &'a FitSettings,
    /// Robust aperiodic fit of the full spectrum.
    pub aperiodic: Option<AperiodicFit>,
    /// Aperiodic-removed spectrum, negatives clipped to zero.
    pub flat: Vec<f64>,
    /// Peak guesses after pruning.
    pub guesses: PeakSet,
    /// Validated peaks, ordered by centre.
    pub peaks: PeakSet,
}

impl<'a> ModelState<'a> {
    /// Fresh state for one fit.
    pub fn new(data: &'a SpectrumData, modes: Modes, settings: &'a FitSettings) -> Self {
        Self {
            data,
            modes,
            settings,
            aperiodic: None,
            flat: Vec::new(),
            guesses: PeakSet::new(),
            peaks: PeakSet::new(),
        }
    }

    /// Robust aperiodic fit and flattening.
    pub fn fit_aperiodic(&mut self) {
        let (freqs, power) = (self.data.freqs(), self.data.power_spectrum());
        let ap = robust_fit(freqs, power, self.modes.aperiodic, self.settings);
        self.flat = power
            .iter()
            .zip(&ap.fit)
            .map(|(p, a)| (p - a).max(0.0))
            .collect();
        self.aperiodic = Some(ap);
    }

    /// Greedy peak search and pre-fit pruning.
    pub fn search_peaks(&mut self) {
        let guesses = find_guesses(
            self.data.freqs(),
            &self.flat,
            self.data.freq_res(),
            self.modes.periodic,
            self.settings,
        );
        self.guesses = prune_guesses(&guesses, &self.flat, self.data.freq_range(), self.settings);
    }

    /// Joint fit and validation of the guesses.
    pub fn validate_peaks(&mut self) {
        self.peaks = fit_and_validate(
            self.data.freqs(),
            &self.flat,
            &self.guesses,
            self.data.freq_range(),
            self.modes.periodic,
            self.settings,
        )
        .sorted_by_center();
    }

    /// Final aperiodic refit and assembly of the full model.
    pub fn assemble(self) -> FitResult {
        let freqs = self.data.freqs();
        let power = self.data.power_spectrum();
        let failed = || FitResult::failed(self.modes, freqs.to_vec(), power.to_vec());

        let Some(robust) = self.aperiodic.as_ref() else {
            return failed();
        };

        let peak_fit = self.modes.periodic.func()(freqs, self.peaks.as_params());
        let aperiodic = if self.peaks.is_empty() {
            robust.clone()
        } else {
            let peak_removed: Vec<f64> = power.iter().zip(&peak_fit).map(|(p, g)| p - g).collect();
            let refit = simple_fit(
                freqs,
                &peak_removed,
                self.modes.aperiodic,
                &robust.params,
                self.settings,
            );
            match refit {
                Ok(params) => AperiodicFit::refined(self.modes.aperiodic, freqs, params)
                    .unwrap_or_else(|| {
                        #[cfg(feature = "tracing")]
                        tracing::warn!("ap_refit: not finite on all samples, keeping robust estimate");
                        robust.clone()
                    }),
                Err(_err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("ap_refit: failed ({_err}), keeping robust estimate");
                    robust.clone()
                }
            }
        };

        let modeled: Vec<f64> = aperiodic.fit.iter().zip(&peak_fit).map(|(a, g)| a + g).collect();
        if aperiodic.params.iter().any(|p| !p.is_finite()) || modeled.iter().any(|m| !m.is_finite())
        {
            #[cfg(feature = "tracing")]
            tracing::warn!("assemble: non-finite model, reporting failed fit");
            return failed();
        }

        let gaussian_params = self.peaks.to_triples();
        let peak_params = convert_peaks(
            &gaussian_params,
            freqs,
            &modeled,
            &aperiodic.fit,
            self.modes.periodic,
            self.settings.peak_power,
            self.settings.peak_width,
        );

        let error = self.settings.error_metric.compute(power, &modeled);
        let r2 = r_squared(power, &modeled);
        let n_params = aperiodic.params.len() + self.peaks.as_params().len();
        let adj_r2 = adjusted_r_squared(r2, freqs.len(), n_params);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "assemble: {} peaks, r_squared {r2:.4}, error {error:.4}",
            gaussian_params.len()
        );

        FitResult {
            modes: self.modes,
            freqs: freqs.to_vec(),
            power_spectrum: power.to_vec(),
            aperiodic_params: aperiodic.params,
            gaussian_params,
            peak_params,
            ap_fit: aperiodic.fit,
            peak_fit,
            modeled_spectrum: modeled,
            error,
            r_squared: r2,
            adj_r_squared: adj_r2,
        }
    }
}

/// Search-and-validate spectral parameterization.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpectralFit;

impl Algorithm for SpectralFit {
    fn name(&self) -> &str {
        "spectral_fit"
    }

    fn description(&self) -> &str {
        "Iterative peak search on the flattened spectrum with a robust aperiodic fit."
    }

    fn fit(&self, data: &SpectrumData, modes: Modes, settings: &FitSettings) -> Result<FitResult> {
        settings.validate()?;

        let mut state = ModelState::new(data, modes, settings);
        state.fit_aperiodic();
        state.search_peaks();
        state.validate_peaks();
        Ok(state.assemble())
    }
}

/// Modes, settings and an algorithm, ready to fit spectra.
pub struct SpectralModel {
    modes: Modes,
    settings: FitSettings,
    algorithm: Box<dyn Algorithm>,
}

impl SpectralModel {
    /// Model using [`SpectralFit`]. Fails if `settings` are invalid.
    pub fn new(modes: Modes, settings: FitSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            modes,
            settings,
            algorithm: Box::new(SpectralFit),
        })
    }

    /// Replace the fitting algorithm.
    pub fn with_algorithm(mut self, algorithm: Box<dyn Algorithm>) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Model forms.
    pub fn modes(&self) -> Modes {
        self.modes
    }

    /// Fit settings.
    pub fn settings(&self) -> &FitSettings {
        &self.settings
    }

    /// Active algorithm.
    pub fn algorithm(&self) -> &dyn Algorithm {
        self.algorithm.as_ref()
    }

    /// Prepare and fit one linear power spectrum.
    pub fn fit(
        &self,
        freqs: &[f64],
        powers: &[f64],
        freq_range: Option<(f64, f64)>,
    ) -> Result<FitResult> {
        let data = SpectrumData::with_checks(freqs, powers, freq_range, self.settings.checks)?;
        self.fit_data(&data)
    }

    /// Prepare and fit the mean of several linear power spectra.
    pub fn fit_spectra(
        &self,
        freqs: &[f64],
        spectra: &[Vec<f64>],
        freq_range: Option<(f64, f64)>,
    ) -> Result<FitResult> {
        let data = SpectrumData::from_spectra(freqs, spectra, freq_range, self.settings.checks)?;
        self.fit_data(&data)
    }

    /// Fit an already-prepared spectrum.
    pub fn fit_data(&self, data: &SpectrumData) -> Result<FitResult> {
        self.algorithm.fit(data, self.modes, &self.settings)
    }
}

impl Default for SpectralModel {
    fn default() -> Self {
        Self {
            modes: Modes::default(),
            settings: FitSettings::default(),
            algorithm: Box::new(SpectralFit),
        }
    }
}

impl std::fmt::Debug for SpectralModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralModel")
            .field("modes", &self.modes)
            .field("settings", &self.settings)
            .field("algorithm", &self.algorithm.name())
            .finish()
    }
}
