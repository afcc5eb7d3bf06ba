//! Built-in fit configurations.
//!
//! These are embedded at compile time and always available without external
//! files. Each is a starting point for a common kind of recording.

use crate::FitConfig;

/// Names of the built-in configurations.
pub static BUILTIN_CONFIG_NAMES: &[&str] = &["default", "knee", "strict", "liberal"];

static BUILTIN_CONFIGS_TOML: &[(&str, &str)] = &[
    ("default", DEFAULT_CONFIG),
    ("knee", KNEE_CONFIG),
    ("strict", STRICT_CONFIG),
    ("liberal", LIBERAL_CONFIG),
];

/// Library defaults.
const DEFAULT_CONFIG: &str = r#"
name = "default"
description = "Library defaults: fixed aperiodic, unbounded Gaussian peaks"
"#;

/// Broad-band recordings with a bend in the aperiodic component.
const KNEE_CONFIG: &str = r#"
name = "knee"
description = "Knee aperiodic model for wide frequency ranges (e.g. 1-150 Hz)"

[aperiodic]
mode = "knee"

[peaks]
max_n_peaks = 8
width_limits = [1.0, 12.0]
"#;

/// Few, clear peaks.
const STRICT_CONFIG: &str = r#"
name = "strict"
description = "Few well-defined peaks; high thresholds"

[peaks]
max_n_peaks = 4
min_peak_height = 0.15
peak_threshold = 2.5
width_limits = [1.0, 8.0]
"#;

/// Many peaks, including weak ones.
const LIBERAL_CONFIG: &str = r#"
name = "liberal"
description = "Many peaks, including weak and narrow ones"

[peaks]
min_peak_height = 0.0
peak_threshold = 1.5
width_limits = [0.5, 12.0]
"#;

/// All built-in configurations.
pub fn builtin_configs() -> Vec<FitConfig> {
    BUILTIN_CONFIGS_TOML
        .iter()
        .filter_map(|(_, toml)| FitConfig::from_toml(toml).ok())
        .collect()
}

/// A built-in configuration by name (case-insensitive).
pub fn get_builtin_config(name: &str) -> Option<FitConfig> {
    BUILTIN_CONFIGS_TOML
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .and_then(|(_, toml)| FitConfig::from_toml(toml).ok())
}

/// Whether `name` is a built-in configuration.
pub fn is_builtin_config(name: &str) -> bool {
    BUILTIN_CONFIG_NAMES
        .iter()
        .any(|n| n.eq_ignore_ascii_case(name))
}
