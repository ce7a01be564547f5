//! Linear solve strategies for the regularized nonrigid system.

use faer::{prelude::SpSolver, Mat, MatRef};

/// Strategy used to solve the square linear system `a * x = b`.
///
/// The strategy is fixed when the transform is constructed, so every
/// iteration of a registration run uses the same numeric policy.
pub trait LinearSolver {
    /// Human readable name of the strategy, used for logging.
    const NAME: &'static str;

    /// Solve `a * x = b` for `x`.
    ///
    /// # Arguments
    ///
    /// * `a` - Square system matrix with shape (n, n).
    /// * `b` - Right hand side with shape (n, k).
    ///
    /// # Returns
    ///
    /// The solution `x` with shape (n, k).
    fn solve(&self, a: MatRef<'_, f64>, b: MatRef<'_, f64>) -> Mat<f64>;
}

/// Column pivoted Householder QR.
///
/// Rank revealing and tolerant of near singular systems, at a higher cost.
#[derive(Debug, Clone, Copy, Default)]
pub struct Precision;

impl LinearSolver for Precision {
    const NAME: &'static str = "precision";

    fn solve(&self, a: MatRef<'_, f64>, b: MatRef<'_, f64>) -> Mat<f64> {
        a.col_piv_qr().solve(b)
    }
}

/// Householder QR without pivoting.
///
/// Faster, but assumes a well conditioned system. On near singular inputs the
/// solution silently loses accuracy instead of failing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Performance;

impl LinearSolver for Performance {
    const NAME: &'static str = "performance";

    fn solve(&self, a: MatRef<'_, f64>, b: MatRef<'_, f64>) -> Mat<f64> {
        a.qr().solve(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn spd_system() -> (Mat<f64>, Mat<f64>) {
        // diagonally dominant symmetric system
        let a = Mat::from_fn(4, 4, |i, j| if i == j { 4.0 } else { 1.0 / (1 + i + j) as f64 });
        let x = Mat::from_fn(4, 2, |i, j| (i as f64) - (j as f64) * 0.5);
        let b = &a * &x;
        (a, b)
    }

    fn check_solution<S: LinearSolver>(solver: S) {
        let (a, b) = spd_system();
        let x = solver.solve(a.as_ref(), b.as_ref());
        assert_eq!(x.nrows(), 4);
        assert_eq!(x.ncols(), 2);
        for i in 0..4 {
            for j in 0..2 {
                assert_relative_eq!(x.read(i, j), (i as f64) - (j as f64) * 0.5, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_precision_solve() {
        check_solution(Precision);
    }

    #[test]
    fn test_performance_solve() {
        check_solution(Performance);
    }
}
