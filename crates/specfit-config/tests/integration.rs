//! Integration tests for specfit-config.
//!
//! These tests verify end-to-end functionality across modules.

use specfit_config::{ConfigError, FitConfig, builtin_configs, resolve_config};
use specfit_core::{ApMode, SpectralModel, sim};
use tempfile::TempDir;

/// A saved configuration loads back unchanged.
#[test]
fn test_save_load_roundtrip() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("nested").join("eeg.toml");

    let config = FitConfig::new("eeg")
        .with_description("Resting-state EEG")
        .with_aperiodic_mode(ApMode::Knee)
        .with_max_n_peaks(6);
    config.save(&path).expect("should save config");

    let loaded = FitConfig::load(&path).expect("should load config");
    assert_eq!(loaded, config);
}

/// Missing files surface as read errors naming the path.
#[test]
fn test_load_missing_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("absent.toml");
    let err = FitConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
    assert!(err.to_string().contains("absent.toml"));
}

/// Resolution prefers files, then presets, then the default.
#[test]
fn test_resolve_config() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("custom.toml");
    std::fs::write(&path, "name = \"custom\"\n[peaks]\nmax_n_peaks = 2\n").unwrap();

    let from_file = resolve_config(Some(&path), Some("strict")).unwrap();
    assert_eq!(from_file.name, "custom");

    let from_preset = resolve_config(None, Some("strict")).unwrap();
    assert_eq!(from_preset.name, "strict");

    let fallback = resolve_config(None, None).unwrap();
    assert_eq!(fallback.name, "default");

    let missing = resolve_config(None, Some("nope")).unwrap_err();
    assert!(matches!(missing, ConfigError::PresetNotFound(_)));
}

/// Every built-in configuration drives a fit to a valid result.
#[test]
fn test_builtin_configs_fit() {
    let mut rng = <rand_chacha::ChaCha8Rng as rand::SeedableRng>::seed_from_u64(0);
    let spectrum =
        sim::gen_power_spectrum((2.0, 40.0), &[1.0, 1.2], &[10.0, 0.5, 1.5], 0.01, 0.5, &mut rng)
            .unwrap();

    for config in builtin_configs() {
        let name = config.name.clone();
        let (modes, settings) = config.into_settings().expect("built-in config should validate");
        let model = SpectralModel::new(modes, settings).expect("settings should be accepted");
        let result = model
            .fit(&spectrum.freqs, &spectrum.powers, None)
            .expect("fit should not error");
        assert!(result.is_success(), "config '{name}' failed to fit");
    }
}
