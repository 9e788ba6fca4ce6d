//! Newton-Raphson root finding
//!
//! The iteration stops early when successive estimates agree within
//! [`STEP_TOLERANCE`], or when the derivative vanishes (the last estimate is
//! kept). Either way the candidate is substituted back into `f` and rejected
//! with a convergence error unless the residual is within the caller's
//! tolerance. Running out of iterations is never taken as success on its own.

use lexee_core::{FormulaError, FormulaResult};

/// Iteration cap
pub const MAX_ITERATIONS: usize = 1000;

/// Convergence threshold on the step size
pub const STEP_TOLERANCE: f64 = 1e-12;

/// Derivatives smaller than this stop the iteration
const MIN_DERIVATIVE: f64 = 1e-14;

/// A validated root
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Root {
    pub value: f64,
    /// Newton steps taken
    pub iterations: usize,
}

/// Find a root of `f` starting at `guess`
///
/// `residual_tolerance` bounds `|f(root)|` for the result to be accepted.
pub fn find_root<F, D>(f: F, df: D, guess: f64, residual_tolerance: f64) -> FormulaResult<Root>
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    let mut x = guess;
    let mut iterations = 0;

    while iterations < MAX_ITERATIONS {
        let fx = f(x);
        let dfx = df(x);
        if !fx.is_finite() || !dfx.is_finite() || dfx.abs() < MIN_DERIVATIVE {
            break;
        }

        let next = x - fx / dfx;
        if !next.is_finite() {
            break;
        }
        iterations += 1;

        let step = (next - x).abs();
        x = next;
        log::trace!("newton iteration {}: step {:e}", iterations, step);
        if step < STEP_TOLERANCE {
            break;
        }
    }

    let residual = f(x);
    if residual.is_finite() && residual.abs() <= residual_tolerance {
        Ok(Root {
            value: x,
            iterations,
        })
    } else {
        log::warn!("newton solver did not converge after {} iterations", iterations);
        Err(FormulaError::Convergence(format!(
            "no root found after {} iterations",
            iterations
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_square_root_of_two() {
        let root = find_root(|x| x * x - 2.0, |x| 2.0 * x, 1.0, 1e-12).unwrap();
        assert!((root.value - std::f64::consts::SQRT_2).abs() < 1e-12);
        assert!(root.iterations > 0);
    }

    #[test]
    fn test_no_real_root_is_rejected() {
        let err = find_root(|x| x * x + 1.0, |x| 2.0 * x, 1.0, 1e-9).unwrap_err();
        assert!(matches!(err, FormulaError::Convergence(_)));
    }

    #[test]
    fn test_flat_derivative_keeps_last_estimate() {
        // Derivative is zero at the guess, which is already a root
        let root = find_root(|x| x * x * x, |x| 3.0 * x * x, 0.0, 1e-12).unwrap();
        assert_eq!(root.value, 0.0);
        assert_eq!(root.iterations, 0);
    }
}
