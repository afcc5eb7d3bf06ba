//! Property-based tests for specfit-core.
//!
//! Covers width conversions, model assembly, validator monotonicity and the
//! edge and zero-peak guarantees, using proptest for randomized spectra.

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use specfit_core::data::nearest_ind;
use specfit_core::funcs::gaussian;
use specfit_core::peaks::PeakSet;
use specfit_core::sim::gen_power_spectrum;
use specfit_core::validate::fit_and_validate;
use specfit_core::{
    FitSettings, Modes, PeakShape, SpectralModel, compute_fwhm, compute_gauss_std,
};

fn freqs() -> Vec<f64> {
    (0..95).map(|i| 3.0 + 0.5 * i as f64).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// FWHM and standard deviation convert into each other without loss.
    #[test]
    fn fwhm_round_trip(x in 1e-4f64..1e4) {
        let back = compute_gauss_std(compute_fwhm(x));
        prop_assert!((back - x).abs() <= 1e-12 * x, "{} -> {}", x, back);
    }

    /// The nearest index has minimal distance and is the first such index.
    #[test]
    fn nearest_ind_is_first_minimum(target in 0.0f64..60.0) {
        let xs = freqs();
        let ind = nearest_ind(&xs, target);
        let best = (xs[ind] - target).abs();
        for (i, &x) in xs.iter().enumerate() {
            prop_assert!((x - target).abs() >= best);
            if i < ind {
                prop_assert!((x - target).abs() > best);
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// The modeled spectrum is the aperiodic fit plus the fitted peaks.
    #[test]
    fn model_is_sum_of_components(
        offset in -2.0f64..2.0,
        exponent in 0.5f64..2.5,
        cf in 8.0f64..40.0,
        pw in 0.2f64..1.0,
        std in 0.75f64..3.0,
        seed in 0u64..1000,
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let spectrum = gen_power_spectrum(
            (3.0, 50.0), &[offset, exponent], &[cf, pw, std], 0.01, 0.5, &mut rng,
        ).unwrap();
        let result = SpectralModel::default()
            .fit(&spectrum.freqs, &spectrum.powers, None)
            .unwrap();

        if result.is_success() {
            let params: Vec<f64> = result.gaussian_params.iter().flatten().copied().collect();
            prop_assert_eq!(&result.peak_fit, &gaussian(&result.freqs, &params));
            for i in 0..result.freqs.len() {
                prop_assert_eq!(result.modeled_spectrum[i], result.ap_fit[i] + result.peak_fit[i]);
            }
            let centers: Vec<f64> = result.peak_params.iter().map(|p| p[0]).collect();
            prop_assert!(centers.windows(2).all(|w| w[0] <= w[1]));
        }
    }

    /// No finalized peak sits within the edge tolerance of the frequency range.
    #[test]
    fn no_peak_near_edges(
        cf in 3.0f64..8.0,
        pw in 0.2f64..1.0,
        std in 0.5f64..2.0,
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let spectrum = gen_power_spectrum(
            (3.0, 50.0), &[1.0, 1.0], &[cf, pw, std], 0.0, 0.5, &mut rng,
        ).unwrap();
        let result = SpectralModel::default()
            .fit(&spectrum.freqs, &spectrum.powers, None)
            .unwrap();
        for [c, _, _] in &result.peak_params {
            prop_assert!(c - 3.0 > 2.0 && 50.0 - c > 2.0, "peak at {}", c);
        }
    }

    /// A noiseless aperiodic spectrum yields a valid model with no peaks.
    #[test]
    fn aperiodic_only_has_no_peaks(offset in -3.0f64..3.0, exponent in 0.2f64..3.0) {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let spectrum = gen_power_spectrum(
            (3.0, 50.0), &[offset, exponent], &[], 0.0, 0.5, &mut rng,
        ).unwrap();
        let result = SpectralModel::default()
            .fit(&spectrum.freqs, &spectrum.powers, None)
            .unwrap();
        prop_assert!(result.is_success());
        prop_assert_eq!(result.n_peaks(), 0);
    }

    /// Validation never returns more peaks than it was given.
    #[test]
    fn validation_never_adds_peaks(
        guesses in prop::collection::vec((4.0f64..49.0, 0.05f64..1.0, 0.3f64..4.0), 0..5),
    ) {
        let xs = freqs();
        let flat = gaussian(&xs, &[15.0, 0.5, 2.0, 32.0, 0.3, 1.0]);
        let triples: Vec<[f64; 3]> = guesses.iter().map(|&(c, h, w)| [c, h, w]).collect();
        let set = PeakSet::from_triples(&triples);
        let fitted = fit_and_validate(
            &xs, &flat, &set, (3.0, 50.0), PeakShape::Gaussian, &FitSettings::default(),
        );
        prop_assert!(fitted.len() <= set.len());
    }
}

#[test]
fn default_model_uses_default_modes() {
    assert_eq!(SpectralModel::default().modes(), Modes::default());
}
