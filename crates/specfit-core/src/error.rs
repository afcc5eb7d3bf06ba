//! Error types for spectrum preparation and model fitting.

use thiserror::Error;

/// Errors surfaced to callers of the fitting API.
///
/// Only input problems are reported this way. Solver failures inside a fit are
/// recovered locally or reported through a failed [`FitResult`](crate::FitResult).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Input data is malformed.
    #[error("invalid data: {0}")]
    Data(String),

    /// Frequency and power inputs disagree in size.
    #[error("inconsistent data: {freqs} frequency values but {powers} power values")]
    InconsistentData {
        /// Number of frequency values.
        freqs: usize,
        /// Number of power values in the offending spectrum.
        powers: usize,
    },

    /// Requested frequency range does not lie within the available data.
    #[error(
        "frequency range [{}, {}] is outside the available data [{}, {}]",
        requested.0, requested.1, available.0, available.1
    )]
    FreqRange {
        /// Range asked for, in Hz.
        requested: (f64, f64),
        /// Range covered by the input frequency vector, in Hz.
        available: (f64, f64),
    },

    /// Fit settings are invalid or mutually incompatible.
    #[error("invalid settings: {0}")]
    Settings(String),

    /// A fitting stage failed and could not be recovered.
    #[error("fit failed: {0}")]
    Fit(#[from] FitError),
}

/// Result alias for fallible crate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure modes of the bounded least-squares solver and the stages built on it.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FitError {
    /// Model evaluation produced NaN or infinite residuals at the starting point.
    #[error("model produced non-finite residuals")]
    NonFiniteResidual,

    /// Evaluation budget exhausted before convergence.
    #[error("no convergence within {nfev} function evaluations")]
    MaxEvaluations {
        /// Number of model evaluations spent.
        nfev: usize,
    },

    /// Normal equations could not be solved at any damping level.
    #[error("normal equations are singular")]
    SingularSystem,

    /// Fewer samples than free parameters.
    #[error("insufficient data: need at least {needed} points, got {available}")]
    InsufficientData {
        /// Minimum number of points required.
        needed: usize,
        /// Number of points supplied.
        available: usize,
    },

    /// Nothing to fit.
    #[error("no parameters to fit")]
    EmptyParameters,

    /// Parameter vector and bounds disagree in length.
    #[error("expected {expected} parameters, got {actual}")]
    ParameterMismatch {
        /// Expected parameter count.
        expected: usize,
        /// Supplied parameter count.
        actual: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inconsistent_data_display() {
        let err = Error::InconsistentData {
            freqs: 10,
            powers: 9,
        };
        assert_eq!(
            err.to_string(),
            "inconsistent data: 10 frequency values but 9 power values"
        );
    }

    #[test]
    fn freq_range_display() {
        let err = Error::FreqRange {
            requested: (1.0, 100.0),
            available: (3.0, 50.0),
        };
        let msg = err.to_string();
        assert!(msg.contains("[1, 100]"), "got: {msg}");
        assert!(msg.contains("[3, 50]"), "got: {msg}");
    }

    #[test]
    fn fit_error_converts() {
        let err: Error = FitError::SingularSystem.into();
        assert!(matches!(err, Error::Fit(FitError::SingularSystem)));
        assert_eq!(err.to_string(), "fit failed: normal equations are singular");
    }

    #[test]
    fn max_evaluations_display() {
        let err = FitError::MaxEvaluations { nfev: 5000 };
        assert_eq!(
            err.to_string(),
            "no convergence within 5000 function evaluations"
        );
    }
}
