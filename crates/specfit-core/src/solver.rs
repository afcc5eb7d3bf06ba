//! Bounded nonlinear least squares.
//!
//! A projected Levenberg-Marquardt solver: each trial step solves the damped
//! normal equations `(JᵀJ + λ·diag(JᵀJ))·δ = Jᵀr` and is clipped back into the
//! box bounds before evaluation. A step is accepted only if it lowers the cost
//! `½·Σr²`. Damping shrinks after accepted steps and grows geometrically after
//! rejected ones.
//!
//! Termination mirrors the usual `ftol`/`xtol`/`gtol` triple. Running out of the
//! function-evaluation budget is an error, which callers treat as
//! non-convergence.

use crate::error::FitError;
use faer::Mat;

const INITIAL_DAMPING_SCALE: f64 = 1e-3;
const MAX_DAMPING: f64 = 1e16;
const MIN_DAMPING: f64 = 1e-15;
const DIAGONAL_FLOOR: f64 = 1e-12;
const SINGULAR_PIVOT_EPSILON: f64 = 1e-300;
const ZERO_COST: f64 = 1e-30;

/// Box constraints on a parameter vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    /// Per-parameter lower bounds (may be `-inf`).
    pub lower: Vec<f64>,
    /// Per-parameter upper bounds (may be `+inf`).
    pub upper: Vec<f64>,
}

impl Bounds {
    /// Bounds from explicit lower and upper vectors.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> Self {
        debug_assert_eq!(lower.len(), upper.len());
        Self { lower, upper }
    }

    /// No constraints on `n` parameters.
    pub fn unbounded(n: usize) -> Self {
        Self {
            lower: vec![f64::NEG_INFINITY; n],
            upper: vec![f64::INFINITY; n],
        }
    }

    /// Number of constrained parameters.
    pub fn len(&self) -> usize {
        self.lower.len()
    }

    /// Whether the bounds describe zero parameters.
    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    /// Project `params` into the box.
    pub fn clamp(&self, params: &mut [f64]) {
        for ((p, &lo), &hi) in params.iter_mut().zip(&self.lower).zip(&self.upper) {
            *p = p.max(lo).min(hi);
        }
    }

    fn at_lower(&self, i: usize, value: f64) -> bool {
        value <= self.lower[i]
    }

    fn at_upper(&self, i: usize, value: f64) -> bool {
        value >= self.upper[i]
    }
}

/// Solver budget and tolerances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverOptions {
    /// Maximum number of model evaluations.
    pub max_nfev: usize,
    /// Relative cost-reduction tolerance.
    pub ftol: f64,
    /// Relative step-size tolerance.
    pub xtol: f64,
    /// Projected-gradient tolerance.
    pub gtol: f64,
}

impl SolverOptions {
    /// Options with a shared tolerance for all three criteria.
    pub fn new(max_nfev: usize, tol: f64) -> Self {
        Self {
            max_nfev,
            ftol: tol,
            xtol: tol,
            gtol: tol,
        }
    }
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self::new(5000, 1e-5)
    }
}

/// Which criterion ended the solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Cost reduction fell below `ftol`.
    Ftol,
    /// Step size fell below `xtol`.
    Xtol,
    /// Projected gradient fell below `gtol`.
    Gtol,
    /// Residuals are zero to machine precision.
    ZeroResidual,
    /// No damping level produced a cost reduction.
    Stalled,
}

/// Converged parameters and solve statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Best parameters found, within bounds.
    pub params: Vec<f64>,
    /// Final cost, `½·Σr²`.
    pub cost: f64,
    /// Number of model evaluations used.
    pub nfev: usize,
    /// Criterion that ended the solve.
    pub termination: Termination,
}

/// Fit `model(xs, params)` to `ys` within `bounds`, starting from `p0`.
///
/// `jacobian(xs, params)` must return `∂model/∂params` with shape
/// `[xs.len(), params.len()]`. Starting values outside the bounds are clamped.
pub fn least_squares<F, J>(
    model: F,
    jacobian: J,
    xs: &[f64],
    ys: &[f64],
    p0: &[f64],
    bounds: &Bounds,
    options: &SolverOptions,
) -> Result<Solution, FitError>
where
    F: Fn(&[f64], &[f64]) -> Vec<f64>,
    J: Fn(&[f64], &[f64]) -> Mat<f64>,
{
    let n_params = p0.len();
    if n_params == 0 {
        return Err(FitError::EmptyParameters);
    }
    if bounds.len() != n_params {
        return Err(FitError::ParameterMismatch {
            expected: bounds.len(),
            actual: n_params,
        });
    }
    if xs.len() < n_params {
        return Err(FitError::InsufficientData {
            needed: n_params,
            available: xs.len(),
        });
    }

    let mut params = p0.to_vec();
    bounds.clamp(&mut params);

    let mut residuals = compute_residuals(&model, xs, ys, &params);
    let mut nfev = 1;
    let mut cost = half_sum_squares(&residuals);
    if !cost.is_finite() {
        return Err(FitError::NonFiniteResidual);
    }

    let mut damping: Option<f64> = None;
    let mut growth = 2.0;

    loop {
        if cost <= ZERO_COST {
            return Ok(Solution {
                params,
                cost,
                nfev,
                termination: Termination::ZeroResidual,
            });
        }

        let jac = jacobian(xs, &params);
        let (jtj, jtr) = normal_equations(&jac, &residuals);
        if jtr.iter().any(|v| !v.is_finite()) {
            return Err(FitError::NonFiniteResidual);
        }

        if projected_gradient_norm(&jtr, &params, bounds) <= options.gtol {
            return Ok(Solution {
                params,
                cost,
                nfev,
                termination: Termination::Gtol,
            });
        }

        let lambda = damping.get_or_insert_with(|| {
            let max_diag = (0..n_params).map(|i| jtj[(i, i)]).fold(0.0, f64::max);
            (INITIAL_DAMPING_SCALE * max_diag).max(MIN_DAMPING)
        });

        loop {
            if nfev >= options.max_nfev {
                return Err(FitError::MaxEvaluations { nfev });
            }

            let mut damped = jtj.clone();
            for i in 0..n_params {
                damped[(i, i)] += *lambda * jtj[(i, i)].max(DIAGONAL_FLOOR);
            }

            let Some(step) = solve_dense(damped, &jtr) else {
                *lambda *= growth;
                growth *= 2.0;
                if *lambda > MAX_DAMPING {
                    return Err(FitError::SingularSystem);
                }
                continue;
            };

            let mut trial: Vec<f64> = params.iter().zip(&step).map(|(p, s)| p + s).collect();
            bounds.clamp(&mut trial);

            let step_norm = trial
                .iter()
                .zip(&params)
                .map(|(t, p)| (t - p) * (t - p))
                .sum::<f64>()
                .sqrt();
            let small_step = step_norm <= options.xtol * (options.xtol + norm(&params));

            let trial_residuals = compute_residuals(&model, xs, ys, &trial);
            nfev += 1;
            let trial_cost = half_sum_squares(&trial_residuals);

            if trial_cost.is_finite() && trial_cost < cost {
                let reduction = cost - trial_cost;
                let previous = cost;
                params = trial;
                residuals = trial_residuals;
                cost = trial_cost;
                *lambda = (*lambda / 3.0).max(MIN_DAMPING);
                growth = 2.0;

                if reduction <= options.ftol * previous {
                    return Ok(Solution {
                        params,
                        cost,
                        nfev,
                        termination: Termination::Ftol,
                    });
                }
                if small_step {
                    return Ok(Solution {
                        params,
                        cost,
                        nfev,
                        termination: Termination::Xtol,
                    });
                }
                break;
            }

            if small_step {
                return Ok(Solution {
                    params,
                    cost,
                    nfev,
                    termination: Termination::Xtol,
                });
            }

            *lambda *= growth;
            growth *= 2.0;
            if *lambda > MAX_DAMPING {
                return Ok(Solution {
                    params,
                    cost,
                    nfev,
                    termination: Termination::Stalled,
                });
            }
        }
    }
}

fn compute_residuals<F>(model: &F, xs: &[f64], ys: &[f64], params: &[f64]) -> Vec<f64>
where
    F: Fn(&[f64], &[f64]) -> Vec<f64>,
{
    model(xs, params)
        .iter()
        .zip(ys)
        .map(|(fit, y)| y - fit)
        .collect()
}

fn half_sum_squares(values: &[f64]) -> f64 {
    0.5 * values.iter().map(|v| v * v).sum::<f64>()
}

fn norm(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>().sqrt()
}

/// `JᵀJ` and `Jᵀr`.
fn normal_equations(jac: &Mat<f64>, residuals: &[f64]) -> (Mat<f64>, Vec<f64>) {
    let (rows, cols) = (jac.nrows(), jac.ncols());
    let mut jtj = Mat::<f64>::zeros(cols, cols);
    let mut jtr = vec![0.0; cols];

    for a in 0..cols {
        for b in a..cols {
            let mut sum = 0.0;
            for i in 0..rows {
                sum += jac[(i, a)] * jac[(i, b)];
            }
            jtj[(a, b)] = sum;
            jtj[(b, a)] = sum;
        }
        let mut sum = 0.0;
        for i in 0..rows {
            sum += jac[(i, a)] * residuals[i];
        }
        jtr[a] = sum;
    }

    (jtj, jtr)
}

/// Infinity norm of the gradient, ignoring components that push into an active bound.
fn projected_gradient_norm(jtr: &[f64], params: &[f64], bounds: &Bounds) -> f64 {
    jtr.iter()
        .enumerate()
        .filter(|&(i, &g)| {
            !(g < 0.0 && bounds.at_lower(i, params[i]) || g > 0.0 && bounds.at_upper(i, params[i]))
        })
        .map(|(_, g)| g.abs())
        .fold(0.0, f64::max)
}

/// Solve a square system by LU decomposition with partial pivoting.
///
/// Returns `None` if a pivot vanishes.
pub(crate) fn solve_dense(mut matrix: Mat<f64>, rhs: &[f64]) -> Option<Vec<f64>> {
    let n = matrix.nrows();
    debug_assert_eq!(n, matrix.ncols());
    debug_assert_eq!(n, rhs.len());
    let mut b = rhs.to_vec();

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&a, &c| matrix[(a, col)].abs().total_cmp(&matrix[(c, col)].abs()))
            .unwrap_or(col);
        let pivot = matrix[(pivot_row, col)];
        if !pivot.is_finite() || pivot.abs() <= SINGULAR_PIVOT_EPSILON {
            return None;
        }

        if pivot_row != col {
            for k in 0..n {
                let tmp = matrix[(col, k)];
                matrix[(col, k)] = matrix[(pivot_row, k)];
                matrix[(pivot_row, k)] = tmp;
            }
            b.swap(col, pivot_row);
        }

        for row in (col + 1)..n {
            let factor = matrix[(row, col)] / pivot;
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                matrix[(row, k)] -= factor * matrix[(col, k)];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut value = b[row];
        for k in (row + 1)..n {
            value -= matrix[(row, k)] * x[k];
        }
        x[row] = value / matrix[(row, row)];
    }

    x.iter().all(|v| v.is_finite()).then_some(x)
}
