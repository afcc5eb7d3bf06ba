//! Integration tests for specfit-core.
//!
//! Each test simulates a spectrum with known parameters, fits it through the
//! public API and checks the recovered model.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use specfit_core::funcs::gaussian;
use specfit_core::sim::{SimSpectrum, gen_power_spectrum};
use specfit_core::{
    ApMode, EdgeTolerance, Error, ErrorMetric, FitResult, FitSettings, Modes, PeakShape,
    SpectralModel, WidthConverter, compute_fwhm,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn simulate(range: (f64, f64), ap: &[f64], peaks: &[f64], noise: f64, seed: u64) -> SimSpectrum {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    gen_power_spectrum(range, ap, peaks, noise, 0.5, &mut rng).unwrap()
}

fn fit(spectrum: &SimSpectrum, settings: FitSettings) -> FitResult {
    let model = SpectralModel::new(Modes::default(), settings).unwrap();
    model.fit(&spectrum.freqs, &spectrum.powers, None).unwrap()
}

/// Assert the defining identities of a finished fit.
fn assert_assembled(result: &FitResult) {
    let params: Vec<f64> = result.gaussian_params.iter().flatten().copied().collect();
    let peaks = gaussian(&result.freqs, &params);
    assert_eq!(result.peak_fit, peaks);
    for i in 0..result.freqs.len() {
        assert_eq!(result.modeled_spectrum[i], result.ap_fit[i] + result.peak_fit[i]);
    }
}

// ===========================================================================
// 1. Parameter recovery
// ===========================================================================

#[test]
fn recovers_single_peak_scenario() {
    let spectrum = simulate((3.0, 50.0), &[50.0, 2.0], &[10.0, 0.5, 2.0], 0.0, 0);
    let result = fit(&spectrum, FitSettings::default());

    assert!(result.is_success());
    let exponent = result.aperiodic("exponent").unwrap();
    assert!((exponent - 2.0).abs() < 0.05, "exponent {exponent}");
    assert_eq!(result.n_peaks(), 1, "{result}");
    assert!((result.peak_params[0][0] - 10.0).abs() < 0.5, "{result}");
    assert!(result.r_squared >= 0.99, "r_squared {}", result.r_squared);
    assert_assembled(&result);
}

#[test]
fn recovers_peak_parameters_closely() {
    let spectrum = simulate((3.0, 50.0), &[1.0, 1.5], &[12.0, 0.6, 1.5], 0.0, 0);
    let settings = FitSettings {
        peak_width: WidthConverter::StdDev,
        ..FitSettings::default()
    };
    let result = fit(&spectrum, settings);

    assert_eq!(result.n_peaks(), 1, "{result}");
    let [cf, pw, bw] = result.peak_params[0];
    assert!((cf - 12.0).abs() < 0.5, "cf {cf}");
    assert!((pw - 0.6).abs() < 0.05, "pw {pw}");
    assert!((bw - 1.5).abs() < 0.25, "bw {bw}");
    let [_, _, sigma] = result.gaussian_params[0];
    assert!((compute_fwhm(sigma) - compute_fwhm(1.5)).abs() < 0.5);
}

#[test]
fn recovers_two_peaks_in_order() {
    let spectrum = simulate(
        (3.0, 50.0),
        &[1.0, 1.0],
        &[10.0, 0.4, 1.5, 25.0, 0.3, 2.0],
        0.0,
        0,
    );
    let result = fit(&spectrum, FitSettings::default());

    assert_eq!(result.n_peaks(), 2, "{result}");
    assert!((result.peak_params[0][0] - 10.0).abs() < 0.5);
    assert!((result.peak_params[1][0] - 25.0).abs() < 0.5);
    assert_assembled(&result);
}

#[test]
fn knee_mode_recovers_exponent() {
    let spectrum = simulate((2.0, 60.0), &[2.0, 15.0, 2.0], &[], 0.0, 0);
    let model =
        SpectralModel::new(Modes::new(ApMode::Knee, PeakShape::Gaussian), FitSettings::default())
            .unwrap();
    let result = model.fit(&spectrum.freqs, &spectrum.powers, None).unwrap();

    assert!(result.is_success());
    assert_eq!(result.aperiodic_params.len(), 3);
    let exponent = result.aperiodic("exponent").unwrap();
    assert!((exponent - 2.0).abs() < 0.1, "exponent {exponent}");
}

#[test]
fn noisy_spectrum_still_finds_strong_peak() {
    let spectrum = simulate((3.0, 40.0), &[1.0, 1.0], &[11.0, 0.8, 1.5], 0.02, 11);
    let settings = FitSettings::default().with_max_n_peaks(4);
    let result = fit(&spectrum, settings);

    assert!(result.is_success());
    assert!(result.n_peaks() <= 4);
    assert!(
        result.peaks_in_band(10.0, 12.0).len() == 1,
        "expected a peak near 11 Hz: {result}"
    );
    assert!(result.r_squared > 0.9);
}

// ===========================================================================
// 2. Fallbacks and rejection
// ===========================================================================

#[test]
fn aperiodic_only_spectrum_has_no_peaks() {
    let spectrum = simulate((3.0, 50.0), &[1.0, 1.5], &[], 0.0, 0);
    let result = fit(&spectrum, FitSettings::default());

    assert!(result.is_success());
    assert_eq!(result.n_peaks(), 0);
    assert!(result.peak_fit.iter().all(|&v| v == 0.0));
    assert!(result.error.is_finite() && result.r_squared.is_finite());
    assert!((result.aperiodic("exponent").unwrap() - 1.5).abs() < 1e-6);
}

#[test]
fn peak_at_range_edge_is_excluded() {
    let spectrum = simulate((3.0, 50.0), &[1.0, 1.0], &[4.0, 0.6, 1.0, 25.0, 0.5, 2.0], 0.0, 0);
    let result = fit(&spectrum, FitSettings::default());

    assert!(result.is_success());
    for [cf, _, _] in &result.peak_params {
        assert!(cf - 3.0 > 2.0 && 50.0 - cf > 2.0, "edge peak kept: {result}");
    }
    assert_eq!(result.peaks_in_band(24.0, 26.0).len(), 1, "{result}");
}

#[test]
fn width_based_edge_tolerance() {
    let spectrum = simulate((3.0, 50.0), &[1.0, 1.0], &[8.0, 0.6, 2.0], 0.0, 0);
    let settings = FitSettings::default().with_edge_tolerance(EdgeTolerance::WidthMultiple(3.0));
    let result = fit(&spectrum, settings);

    assert!(result.is_success());
    assert_eq!(result.n_peaks(), 0, "{result}");
}

#[test]
fn narrow_noisy_range_returns_well_formed_result() {
    let spectrum = simulate((3.0, 6.0), &[1.0, 1.0], &[4.5, 0.1, 1.0], 1.0, 3);
    let result = fit(&spectrum, FitSettings::default());

    assert_eq!(result.freqs.len(), 7);
    assert_eq!(result.modeled_spectrum.len(), 7);
    if result.is_success() {
        assert!(result.aperiodic_params.iter().all(|p| p.is_finite()));
        assert_assembled(&result);
    } else {
        assert!(result.aperiodic_params.iter().all(|p| p.is_nan()));
        assert!(result.error.is_nan());
    }
}

#[test]
fn narrow_noisy_range_keeps_knee_fit_finite() {
    let model = SpectralModel::new(
        Modes::new(ApMode::Knee, PeakShape::Gaussian),
        FitSettings::default(),
    )
    .unwrap();

    for seed in 0..200 {
        let spectrum = simulate((3.0, 6.0), &[1.0, 1.0], &[4.5, 0.1, 0.5], 1.0, seed);
        let result = model.fit(&spectrum.freqs, &spectrum.powers, None).unwrap();

        assert!(result.is_success(), "seed {seed}: {result}");
        assert_eq!(result.aperiodic_params.len(), 3);
        assert!(result.ap_fit.iter().all(|v| v.is_finite()), "seed {seed}");
        assert_assembled(&result);
    }
}

// ===========================================================================
// 3. Settings and inputs
// ===========================================================================

#[test]
fn max_peaks_caps_result() {
    let spectrum = simulate(
        (3.0, 50.0),
        &[1.0, 1.0],
        &[10.0, 0.4, 1.5, 25.0, 0.6, 2.0, 38.0, 0.3, 1.5],
        0.0,
        0,
    );
    let result = fit(&spectrum, FitSettings::default().with_max_n_peaks(1));
    assert_eq!(result.n_peaks(), 1, "{result}");
    assert!((result.peak_params[0][0] - 25.0).abs() < 0.5);
}

#[test]
fn error_metric_is_configurable() {
    let spectrum = simulate((3.0, 50.0), &[1.0, 1.0], &[10.0, 0.4, 1.5], 0.05, 5);
    let mae = fit(&spectrum, FitSettings::default());
    let mse = fit(
        &spectrum,
        FitSettings::default().with_error_metric(ErrorMetric::MeanSquared),
    );
    assert!(mae.error > 0.0 && mse.error > 0.0);
    assert!(mse.error < mae.error);
}

#[test]
fn frequency_range_trims_input() {
    let spectrum = simulate((1.0, 100.0), &[1.0, 1.0], &[10.0, 0.4, 1.5], 0.0, 0);
    let model = SpectralModel::default();
    let result = model
        .fit(&spectrum.freqs, &spectrum.powers, Some((3.0, 40.0)))
        .unwrap();
    assert_eq!(result.freqs.first(), Some(&3.0));
    assert_eq!(result.freqs.last(), Some(&40.0));
}

#[test]
fn out_of_range_request_is_an_error() {
    let spectrum = simulate((3.0, 40.0), &[1.0, 1.0], &[], 0.0, 0);
    let err = SpectralModel::default()
        .fit(&spectrum.freqs, &spectrum.powers, Some((1.0, 80.0)))
        .unwrap_err();
    assert!(matches!(err, Error::FreqRange { .. }));
}

#[test]
fn replicate_spectra_are_averaged() {
    let a = simulate((3.0, 40.0), &[1.0, 1.0], &[10.0, 0.5, 1.5], 0.0, 0);
    let model = SpectralModel::default();
    let single = model.fit(&a.freqs, &a.powers, None).unwrap();
    let spectra = vec![a.powers.clone(), a.powers.clone()];
    let mean = model.fit_spectra(&a.freqs, &spectra, None).unwrap();
    assert_eq!(single.n_peaks(), mean.n_peaks());
    for (x, y) in single.power_spectrum.iter().zip(&mean.power_spectrum) {
        assert!((x - y).abs() < 1e-12);
    }
}

#[test]
fn result_serializes_to_json() {
    let spectrum = simulate((3.0, 30.0), &[1.0, 1.0], &[10.0, 0.4, 1.5], 0.0, 0);
    let result = fit(&spectrum, FitSettings::default());
    let json = serde_json::to_string(&result).unwrap();
    assert!(json.contains("\"aperiodic_params\""));
    assert!(json.contains("\"peak_params\""));
}
