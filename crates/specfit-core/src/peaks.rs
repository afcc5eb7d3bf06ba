//! Peak search on the flattened spectrum.
//!
//! Peaks are stored in a [`PeakSet`], a dense arena of `(centre, height, width)`
//! records. The set is rebuilt rather than edited in place whenever its size
//! changes, since every size change is followed by a fresh bounded solve.
//!
//! The search is greedy: take the largest residual, guess its width, record it
//! and subtract its shape, until the residual falls below threshold. Candidates
//! whose window runs off the frequency axis are not recorded; the region near
//! that edge is zeroed so the same sample cannot be selected again.
//!
//! Guesses are then thinned ([`prune_guesses`]) and fitted jointly against the
//! unmodified flattened spectrum ([`fit_guesses`]).

use crate::error::FitError;
use crate::funcs::PEAK_STRIDE;
use crate::settings::{FitSettings, PeakShape};
use crate::solver::{Bounds, least_squares};

/// Residual heights at or below this are round-off, not signal.
const HEIGHT_FLOOR: f64 = 1e-10;

/// A collection of peaks as consecutive `(centre, height, width)` triples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeakSet {
    params: Vec<f64>,
}

impl PeakSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a flat parameter vector. Trailing values short of a full triple are dropped.
    pub fn from_params(mut params: Vec<f64>) -> Self {
        params.truncate(params.len() - params.len() % PEAK_STRIDE);
        Self { params }
    }

    /// Build from triples.
    pub fn from_triples(peaks: &[[f64; 3]]) -> Self {
        Self {
            params: peaks.iter().flatten().copied().collect(),
        }
    }

    /// Append a peak.
    pub fn push(&mut self, center: f64, height: f64, width: f64) {
        self.params.extend_from_slice(&[center, height, width]);
    }

    /// Number of peaks.
    pub fn len(&self) -> usize {
        self.params.len() / PEAK_STRIDE
    }

    /// Whether the set holds no peaks.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Flat parameter vector, as consumed by the model functions.
    pub fn as_params(&self) -> &[f64] {
        &self.params
    }

    /// Iterate over peaks as triples.
    pub fn iter(&self) -> impl Iterator<Item = [f64; 3]> + '_ {
        self.params
            .chunks_exact(PEAK_STRIDE)
            .map(|p| [p[0], p[1], p[2]])
    }

    /// Peaks as a vector of triples.
    pub fn to_triples(&self) -> Vec<[f64; 3]> {
        self.iter().collect()
    }

    /// A new set holding the peaks for which `keep` returns true.
    pub fn filtered(&self, mut keep: impl FnMut(usize, [f64; 3]) -> bool) -> Self {
        Self {
            params: self
                .iter()
                .enumerate()
                .filter(|&(i, peak)| keep(i, peak))
                .flat_map(|(_, peak)| peak)
                .collect(),
        }
    }

    /// A new set ordered by centre frequency.
    pub fn sorted_by_center(&self) -> Self {
        let mut peaks = self.to_triples();
        peaks.sort_by(|a, b| a[0].total_cmp(&b[0]));
        Self::from_triples(&peaks)
    }
}

/// Greedy detection of peak guesses in a flattened spectrum.
///
/// `flat` is the aperiodic-removed log power with negative values clipped to zero.
pub fn find_guesses(
    freqs: &[f64],
    flat: &[f64],
    freq_res: f64,
    shape: PeakShape,
    settings: &FitSettings,
) -> PeakSet {
    let n = freqs.len();
    let mut guesses = PeakSet::new();
    if n == 0 {
        return guesses;
    }

    let width_limits = settings.width_limits(shape);
    let max_peaks = settings.max_n_peaks.unwrap_or(usize::MAX);
    let model = shape.func();
    let mut working = flat.to_vec();

    // Every pass records a peak or zeroes the current maximum, so n passes suffice.
    for _ in 0..n {
        if guesses.len() >= max_peaks {
            break;
        }

        let (idx, height) = argmax(&working);
        let noise = settings.peak_threshold * std_dev(&working);
        if height <= noise || height <= settings.min_peak_height || height <= HEIGHT_FLOOR {
            break;
        }

        let width = match settings.initial_peak_width {
            Some(fwhm) => shape.width_from_fwhm(fwhm),
            None => estimate_width(&working, idx, height, freq_res, shape)
                .unwrap_or(0.5 * (width_limits.0 + width_limits.1)),
        }
        .clamp(width_limits.0, width_limits.1);

        let half_window = (width / freq_res).ceil() as usize;
        if idx < half_window {
            working[..=(idx + half_window).min(n - 1)].fill(0.0);
            continue;
        }
        if idx + half_window >= n {
            working[idx - half_window..].fill(0.0);
            continue;
        }

        let center = freqs[idx];
        guesses.push(center, height, width);
        let fitted = model(freqs, &[center, height, width]);
        for (w, f) in working.iter_mut().zip(&fitted) {
            *w -= f;
        }
    }

    #[cfg(feature = "tracing")]
    tracing::debug!("peak_search: {} guesses", guesses.len());

    guesses
}

/// Width parameter from the shorter side of the half-height crossing around `idx`.
fn estimate_width(
    values: &[f64],
    idx: usize,
    height: f64,
    freq_res: f64,
    shape: PeakShape,
) -> Option<f64> {
    let half = 0.5 * height;
    let left = values[..idx].iter().rev().position(|&v| v <= half).map(|d| d + 1);
    let right = values[idx + 1..].iter().position(|&v| v <= half).map(|d| d + 1);
    let shortest = match (left, right) {
        (Some(l), Some(r)) => l.min(r),
        (Some(side), None) | (None, Some(side)) => side,
        (None, None) => return None,
    };
    let fwhm = 2.0 * shortest as f64 * freq_res;
    Some(shape.width_from_fwhm(fwhm))
}

/// Thin guesses before the joint fit.
///
/// Drops guesses lower than half the variance of `flat`, guesses within
/// `bw_std_edge` widths of an edge, and the lower of any two guesses whose
/// `gauss_overlap_thresh`-width extents overlap. The result is ordered by centre.
pub fn prune_guesses(
    guesses: &PeakSet,
    flat: &[f64],
    freq_range: (f64, f64),
    settings: &FitSettings,
) -> PeakSet {
    let min_height = 0.5 * variance(flat);
    let kept = guesses.filtered(|_, [ctr, hgt, wid]| {
        let edge = wid * settings.bw_std_edge;
        hgt >= min_height && (ctr - freq_range.0).abs() > edge && (ctr - freq_range.1).abs() > edge
    });
    drop_overlapping(&kept.sorted_by_center(), settings.gauss_overlap_thresh)
}

fn drop_overlapping(sorted: &PeakSet, thresh: f64) -> PeakSet {
    let peaks = sorted.to_triples();
    let mut drop = vec![false; peaks.len()];
    for (i, pair) in peaks.windows(2).enumerate() {
        let [a, b] = [pair[0], pair[1]];
        if a[0] + a[2] * thresh > b[0] - b[2] * thresh {
            let lower = if b[1] < a[1] { i + 1 } else { i };
            drop[lower] = true;
        }
    }
    sorted.filtered(|i, _| !drop[i])
}

/// Bounds for a joint fit seeded with `guesses`.
///
/// Centres may move `2 · cf_bound` widths either side of the guess, within
/// `freq_range`; heights are non-negative; widths lie within the width limits.
pub fn guess_bounds(
    guesses: &PeakSet,
    freq_range: (f64, f64),
    width_limits: (f64, f64),
    cf_bound: f64,
) -> Bounds {
    let mut lower = Vec::with_capacity(guesses.as_params().len());
    let mut upper = Vec::with_capacity(guesses.as_params().len());
    for [ctr, _, wid] in guesses.iter() {
        let span = 2.0 * cf_bound * wid;
        lower.extend_from_slice(&[(ctr - span).max(freq_range.0), 0.0, width_limits.0]);
        upper.extend_from_slice(&[(ctr + span).min(freq_range.1), f64::INFINITY, width_limits.1]);
    }
    Bounds::new(lower, upper)
}

/// Jointly fit `guesses` to the flattened spectrum.
pub fn fit_guesses(
    freqs: &[f64],
    flat: &[f64],
    guesses: &PeakSet,
    freq_range: (f64, f64),
    shape: PeakShape,
    settings: &FitSettings,
) -> Result<PeakSet, FitError> {
    let bounds = guess_bounds(
        guesses,
        freq_range,
        settings.width_limits(shape),
        settings.cf_bound,
    );
    let solution = least_squares(
        shape.func(),
        shape.jacobian(),
        freqs,
        flat,
        guesses.as_params(),
        &bounds,
        &settings.solver_options(),
    )?;
    Ok(PeakSet::from_params(solution.params))
}

fn argmax(values: &[f64]) -> (usize, f64) {
    values
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, v)| if v > best.1 { (i, v) } else { best })
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::funcs::{compute_gauss_std, gaussian};

    fn freqs() -> Vec<f64> {
        (0..95).map(|i| 3.0 + 0.5 * i as f64).collect()
    }

    fn settings() -> FitSettings {
        FitSettings::default()
    }

    #[test]
    fn peak_set_arena() {
        let mut set = PeakSet::new();
        set.push(20.0, 1.0, 2.0);
        set.push(10.0, 0.5, 1.0);
        assert_eq!(set.len(), 2);
        assert_eq!(set.as_params(), &[20.0, 1.0, 2.0, 10.0, 0.5, 1.0]);

        let sorted = set.sorted_by_center();
        assert_eq!(sorted.to_triples(), vec![[10.0, 0.5, 1.0], [20.0, 1.0, 2.0]]);

        let high = set.filtered(|_, [_, h, _]| h > 0.75);
        assert_eq!(high.to_triples(), vec![[20.0, 1.0, 2.0]]);
    }

    #[test]
    fn from_params_drops_partial_triple() {
        let set = PeakSet::from_params(vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn finds_single_peak() {
        let xs = freqs();
        let flat = gaussian(&xs, &[15.0, 0.6, 2.0]);
        let guesses = find_guesses(&xs, &flat, 0.5, PeakShape::Gaussian, &settings());
        assert_eq!(guesses.len(), 1);
        let [ctr, hgt, wid] = guesses.iter().next().unwrap();
        assert_eq!(ctr, 15.0);
        assert!((hgt - 0.6).abs() < 1e-12);
        assert!((wid - 2.0).abs() < 0.5, "width guess {wid}");
    }

    #[test]
    fn finds_two_separated_peaks_largest_first() {
        let xs = freqs();
        let flat = gaussian(&xs, &[12.0, 0.4, 1.5, 30.0, 0.8, 2.0]);
        let guesses = find_guesses(&xs, &flat, 0.5, PeakShape::Gaussian, &settings());
        let centers: Vec<f64> = guesses.iter().map(|p| p[0]).collect();
        assert_eq!(centers, vec![30.0, 12.0]);
    }

    #[test]
    fn respects_max_peaks() {
        let xs = freqs();
        let flat = gaussian(&xs, &[12.0, 0.4, 1.5, 30.0, 0.8, 2.0]);
        let s = settings().with_max_n_peaks(1);
        let guesses = find_guesses(&xs, &flat, 0.5, PeakShape::Gaussian, &s);
        assert_eq!(guesses.len(), 1);
    }

    #[test]
    fn respects_min_height() {
        let xs = freqs();
        let flat = gaussian(&xs, &[12.0, 0.4, 1.5, 30.0, 0.8, 2.0]);
        let s = settings().with_min_peak_height(0.5);
        let guesses = find_guesses(&xs, &flat, 0.5, PeakShape::Gaussian, &s);
        assert_eq!(guesses.len(), 1);
    }

    #[test]
    fn flat_spectrum_has_no_guesses() {
        let xs = freqs();
        let guesses = find_guesses(&xs, &vec![0.0; xs.len()], 0.5, PeakShape::Gaussian, &settings());
        assert!(guesses.is_empty());
    }

    #[test]
    fn edge_candidate_is_not_recorded() {
        let xs = freqs();
        let flat = gaussian(&xs, &[3.5, 1.0, 2.0, 25.0, 0.5, 2.0]);
        let guesses = find_guesses(&xs, &flat, 0.5, PeakShape::Gaussian, &settings());
        assert!(guesses.iter().all(|[c, _, _]| c > 6.0), "{guesses:?}");
        assert!(guesses.iter().any(|[c, _, _]| c == 25.0));
    }

    #[test]
    fn fixed_initial_width_is_used() {
        let xs = freqs();
        let flat = gaussian(&xs, &[20.0, 0.6, 2.0]);
        let s = FitSettings {
            initial_peak_width: Some(4.0),
            ..settings()
        };
        let guesses = find_guesses(&xs, &flat, 0.5, PeakShape::Gaussian, &s);
        let [_, _, wid] = guesses.iter().next().unwrap();
        assert!((wid - compute_gauss_std(4.0)).abs() < 1e-12);
    }

    #[test]
    fn prune_drops_edge_and_overlap() {
        let flat = vec![0.0; 10];
        let guesses = PeakSet::from_triples(&[
            [3.5, 1.0, 1.0],
            [20.0, 1.0, 2.0],
            [21.0, 0.5, 2.0],
            [40.0, 0.8, 1.0],
        ]);
        let pruned = prune_guesses(&guesses, &flat, (3.0, 50.0), &settings());
        assert_eq!(pruned.to_triples(), vec![[20.0, 1.0, 2.0], [40.0, 0.8, 1.0]]);
    }

    #[test]
    fn bounds_clip_to_range() {
        let guesses = PeakSet::from_triples(&[[5.0, 1.0, 1.0]]);
        let bounds = guess_bounds(&guesses, (3.0, 50.0), (0.2, 5.0), 1.5);
        assert_eq!(bounds.lower, vec![3.0, 0.0, 0.2]);
        assert_eq!(bounds.upper, vec![8.0, f64::INFINITY, 5.0]);
    }

    #[test]
    fn joint_fit_refines_overlapping_guesses() {
        let xs = freqs();
        let truth = [18.0, 0.5, 1.5, 22.0, 0.4, 1.5];
        let flat = gaussian(&xs, &truth);
        let guesses = PeakSet::from_triples(&[[18.5, 0.6, 1.2], [21.5, 0.5, 1.2]]);
        let fitted = fit_guesses(&xs, &flat, &guesses, (3.0, 50.0), PeakShape::Gaussian, &settings())
            .unwrap();
        for (got, want) in fitted.as_params().iter().zip(&truth) {
            assert!((got - want).abs() < 1e-2, "{fitted:?}");
        }
    }
}
