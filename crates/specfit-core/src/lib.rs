//! Specfit Core - Parameterization of neural power spectra
//!
//! This crate separates a power spectrum into an aperiodic (1/f-like)
//! background and a set of periodic peaks:
//!
//! - [`funcs`] - Aperiodic and peak model functions with analytic Jacobians
//! - [`solver`] - Bounded Levenberg-Marquardt least squares
//! - [`data`] - Spectrum trimming, log conversion and input checks
//! - [`aperiodic`] - Robust two-pass aperiodic fit
//! - [`peaks`] - Greedy peak search, guess pruning and joint peak fit
//! - [`validate`] - Edge and width checks, refit to a fixed point
//! - [`model`] - The [`Algorithm`] interface, [`SpectralFit`] and [`SpectralModel`]
//! - [`results`] - [`FitResult`], including the all-NaN failed fit
//! - [`metrics`] - Error metrics and R²
//! - [`convert`] - Reported peak power and bandwidth conversions
//! - [`sim`] - Synthetic spectra with an explicit random source
//!
//! ## Example
//!
//! ```rust
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//! use specfit_core::{FitSettings, Modes, SpectralModel, sim};
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(0);
//! let spectrum = sim::gen_power_spectrum(
//!     (3.0, 50.0),
//!     &[1.0, 1.5],
//!     &[10.0, 0.5, 2.0],
//!     0.0,
//!     0.5,
//!     &mut rng,
//! )
//! .unwrap();
//!
//! let model = SpectralModel::new(Modes::default(), FitSettings::default()).unwrap();
//! let result = model.fit(&spectrum.freqs, &spectrum.powers, None).unwrap();
//! assert!(result.is_success());
//! println!("{result}");
//! ```
//!
//! Fits never fail because the solver did not converge: stages fall back to
//! simpler estimates, and an unusable model is reported as
//! [`FitResult::failed`]. Only malformed input and invalid settings are errors.
//!
//! Enable the `tracing` feature to log fallbacks and per-stage progress.

pub mod aperiodic;
pub mod convert;
pub mod data;
pub mod error;
pub mod funcs;
pub mod metrics;
pub mod model;
pub mod peaks;
pub mod results;
pub mod settings;
pub mod sim;
pub mod solver;
pub mod validate;

pub use convert::{PowerConverter, WidthConverter};
pub use data::{DataChecks, SpectrumData};
pub use error::{Error, FitError, Result};
pub use funcs::{compute_fwhm, compute_gauss_std};
pub use metrics::ErrorMetric;
pub use model::{Algorithm, ModelState, SpectralFit, SpectralModel};
pub use peaks::PeakSet;
pub use results::FitResult;
pub use settings::{
    ApMode, EdgeTolerance, FitSettings, Modes, PeakShape, RobustThreshold, SETTINGS_DEFINITION,
    SettingDescriptor,
};
