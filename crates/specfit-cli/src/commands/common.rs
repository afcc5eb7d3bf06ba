//! Shared CLI helpers used across multiple commands.

use anyhow::{Context, bail};
use specfit_config::{ConfigError, FitConfig, resolve_config};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Parse a comma separated list of numbers, e.g. `"10,0.5,2"`.
pub fn parse_f64_list(s: &str) -> Result<Vec<f64>, String> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<f64>()
                .map_err(|_| format!("Invalid number '{part}' in '{s}'"))
        })
        .collect()
}

/// Parse a `CF,PW,STD` peak definition for clap's `value_parser`.
pub fn parse_peak(s: &str) -> Result<[f64; 3], String> {
    match parse_f64_list(s)?.as_slice() {
        &[cf, pw, std] => Ok([cf, pw, std]),
        _ => Err(format!(
            "Invalid peak '{s}' (expected CF,PW,STD, e.g. 10,0.5,2)"
        )),
    }
}

/// Read a two-column spectrum: frequency and linear power per line.
///
/// Columns may be separated by whitespace or commas. Blank lines and lines
/// starting with `#` are skipped.
pub fn read_spectrum(path: &Path) -> anyhow::Result<(Vec<f64>, Vec<f64>)> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read spectrum '{}'", path.display()))?;
    parse_spectrum(&content).with_context(|| format!("in '{}'", path.display()))
}

/// Parse the two-column spectrum format.
pub fn parse_spectrum(content: &str) -> anyhow::Result<(Vec<f64>, Vec<f64>)> {
    let mut freqs = Vec::new();
    let mut powers = Vec::new();

    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .collect();
        let [freq, power] = fields.as_slice() else {
            bail!(
                "line {}: expected 2 columns (frequency, power), found {}",
                lineno + 1,
                fields.len()
            );
        };
        freqs.push(
            freq.parse::<f64>()
                .with_context(|| format!("line {}: invalid frequency '{freq}'", lineno + 1))?,
        );
        powers.push(
            power
                .parse::<f64>()
                .with_context(|| format!("line {}: invalid power '{power}'", lineno + 1))?,
        );
    }

    if freqs.is_empty() {
        bail!("no data rows found");
    }
    Ok((freqs, powers))
}

/// Write a two-column spectrum to `output`, or to stdout when `None`.
pub fn write_spectrum(output: Option<&Path>, freqs: &[f64], powers: &[f64]) -> anyhow::Result<()> {
    let mut text = String::from("# freq\tpower\n");
    for (f, p) in freqs.iter().zip(powers) {
        text.push_str(&format!("{f}\t{p:e}\n"));
    }

    match output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("failed to write '{}'", path.display())),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            Ok(())
        }
    }
}

/// Load a configuration from a file or a built-in name.
pub fn load_config(config: Option<&PathBuf>, preset: Option<&str>) -> anyhow::Result<FitConfig> {
    match resolve_config(config.map(PathBuf::as_path), preset) {
        Ok(config) => Ok(config),
        Err(ConfigError::PresetNotFound(name)) => bail!(
            "Configuration '{name}' not found. Use 'specfit settings --list' to see the built-in configurations."
        ),
        Err(e) => Err(e.into()),
    }
}
