//! Validation of fitted peaks.
//!
//! A fitted peak is kept only if its centre keeps the configured distance from
//! both frequency-range edges and its width did not end up pinned at a width
//! limit. Dropping any peak changes the joint solution of the rest, so the
//! survivors are refit and checked again until nothing more is dropped.

use crate::peaks::{PeakSet, fit_guesses};
use crate::settings::{EdgeTolerance, FitSettings, PeakShape};

/// Relative tolerance for treating a width as sitting on a limit.
const PINNED_RTOL: f64 = 1e-6;

/// Whether one fitted peak passes the edge and width checks.
pub fn keep_peak(
    peak: [f64; 3],
    freq_range: (f64, f64),
    width_limits: (f64, f64),
    edge_tolerance: EdgeTolerance,
) -> bool {
    let [ctr, _, wid] = peak;
    let tolerance = edge_tolerance.resolve(wid);
    let clear_of_edges = ctr - freq_range.0 > tolerance && freq_range.1 - ctr > tolerance;
    clear_of_edges && !is_pinned(wid, width_limits.0) && !is_pinned(wid, width_limits.1)
}

fn is_pinned(value: f64, limit: f64) -> bool {
    (value - limit).abs() <= PINNED_RTOL * limit.abs().max(1.0)
}

/// Fit `guesses` jointly, dropping and refitting until every peak passes [`keep_peak`].
///
/// Each round refits the surviving peaks from their original guesses, so the
/// peak count never grows and the loop ends after at most `guesses.len()`
/// rounds. A solver failure yields an empty set.
pub fn fit_and_validate(
    freqs: &[f64],
    flat: &[f64],
    guesses: &PeakSet,
    freq_range: (f64, f64),
    shape: PeakShape,
    settings: &FitSettings,
) -> PeakSet {
    let width_limits = settings.width_limits(shape);
    let mut current = guesses.clone();

    while !current.is_empty() {
        let fitted = match fit_guesses(freqs, flat, &current, freq_range, shape, settings) {
            Ok(fitted) => fitted,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "peak_fit: joint fit of {} peaks failed ({_err}), using no peaks",
                    current.len()
                );
                return PeakSet::new();
            }
        };

        let keep: Vec<bool> = fitted
            .iter()
            .map(|peak| keep_peak(peak, freq_range, width_limits, settings.edge_tolerance))
            .collect();
        if keep.iter().all(|&k| k) {
            return fitted;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "peak_validate: dropping {} of {} peaks",
            keep.iter().filter(|&&k| !k).count(),
            keep.len()
        );

        current = current.filtered(|i, _| keep[i]);
    }

    current
}
