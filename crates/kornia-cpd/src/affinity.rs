use faer::{Mat, MatRef};

use crate::error::CpdError;

/// Compute the Gaussian affinity (kernel) matrix between two point sets.
///
/// The entry `(i, j)` of the output is `exp(-||x_i - y_j||^2 / (2 * beta^2))`.
/// When `x` and `y` are the same point set the result is symmetric with ones
/// on the diagonal.
///
/// # Arguments
///
/// * `x` - Point set with one point per row (rows of the output).
/// * `y` - Point set with one point per row (columns of the output).
/// * `beta` - Kernel bandwidth. Must be strictly positive; `beta == 0` is an
///   invalid configuration and yields non-finite entries.
///
/// # Returns
///
/// The `x.nrows() x y.nrows()` affinity matrix, or
/// [`CpdError::AllocationFailed`] when its size overflows or the allocator
/// refuses the reservation. With memory overcommit the reservation may still
/// succeed and fail later on first write.
///
/// Example:
///
/// ```
/// use kornia_cpd::{affinity, matrix::points_to_mat};
///
/// let points = points_to_mat(&[[0.0, 0.0], [1.0, 0.0]]);
/// let g = affinity(points.as_ref(), points.as_ref(), 1.0).unwrap();
/// assert_eq!(g.read(0, 0), 1.0);
/// assert!((g.read(0, 1) - (-0.5f64).exp()).abs() < 1e-12);
/// ```
pub fn affinity(x: MatRef<'_, f64>, y: MatRef<'_, f64>, beta: f64) -> Result<Mat<f64>, CpdError> {
    if x.ncols() != y.ncols() {
        return Err(CpdError::DimensionMismatch {
            what: "affinity point dimension",
            expected: x.ncols(),
            actual: y.ncols(),
        });
    }

    let (rows, cols) = (x.nrows(), y.nrows());

    // a dense kernel over large point sets is the first thing to blow up
    rows.checked_mul(cols)
        .and_then(|n| n.checked_mul(std::mem::size_of::<f64>()))
        .filter(|&bytes| bytes <= isize::MAX as usize)
        .ok_or(CpdError::AllocationFailed { rows, cols })?;

    let mut g = Mat::<f64>::new();
    g.reserve_exact(rows, cols);

    let k = -2.0 * beta * beta;
    let dims = x.ncols();

    g.resize_with(rows, cols, |i, j| {
        let mut dist2 = 0.0;
        for d in 0..dims {
            let diff = x.read(i, d) - y.read(j, d);
            dist2 += diff * diff;
        }
        (dist2 / k).exp()
    });

    Ok(g)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::points_to_mat;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn create_random_points(num_points: usize, seed: u64) -> Mat<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let points = (0..num_points)
            .map(|_| {
                [
                    rng.random_range(-2.0..2.0),
                    rng.random_range(-2.0..2.0),
                    rng.random_range(-2.0..2.0),
                ]
            })
            .collect::<Vec<_>>();
        points_to_mat(&points)
    }

    #[test]
    fn test_affinity_symmetric_unit_diagonal() -> Result<(), CpdError> {
        let points = create_random_points(25, 0);
        let g = affinity(points.as_ref(), points.as_ref(), 1.5)?;

        assert_eq!(g.nrows(), 25);
        assert_eq!(g.ncols(), 25);
        for i in 0..25 {
            assert_eq!(g.read(i, i), 1.0);
            for j in 0..25 {
                assert_relative_eq!(g.read(i, j), g.read(j, i), epsilon = 1e-15);
                assert!(g.read(i, j) > 0.0 && g.read(i, j) <= 1.0);
            }
        }
        Ok(())
    }

    #[test]
    fn test_affinity_values() -> Result<(), CpdError> {
        let x = points_to_mat(&[[0.0, 0.0], [3.0, 4.0]]);
        let y = points_to_mat(&[[0.0, 0.0], [1.0, 0.0], [0.0, 2.0]]);
        let beta = 2.0;
        let g = affinity(x.as_ref(), y.as_ref(), beta)?;

        assert_eq!(g.nrows(), 2);
        assert_eq!(g.ncols(), 3);
        assert_relative_eq!(g.read(0, 0), 1.0);
        assert_relative_eq!(g.read(0, 1), (-1.0f64 / 8.0).exp(), epsilon = 1e-12);
        assert_relative_eq!(g.read(0, 2), (-4.0f64 / 8.0).exp(), epsilon = 1e-12);
        // ||(3, 4) - (0, 0)||^2 = 25
        assert_relative_eq!(g.read(1, 0), (-25.0f64 / 8.0).exp(), epsilon = 1e-12);
        Ok(())
    }

    #[test]
    fn test_affinity_bandwidth_smoothness() -> Result<(), CpdError> {
        let points = points_to_mat(&[[0.0, 0.0], [1.0, 1.0]]);
        let narrow = affinity(points.as_ref(), points.as_ref(), 0.5)?;
        let wide = affinity(points.as_ref(), points.as_ref(), 5.0)?;
        assert!(wide.read(0, 1) > narrow.read(0, 1));
        Ok(())
    }

    #[test]
    fn test_affinity_dimension_mismatch() {
        let x = Mat::<f64>::zeros(3, 2);
        let y = Mat::<f64>::zeros(3, 3);
        let res = affinity(x.as_ref(), y.as_ref(), 1.0);
        assert!(matches!(res, Err(CpdError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_affinity_size_overflow() {
        // no storage for zero columns, but the kernel would be 2^33 x 2^33
        let points = Mat::<f64>::zeros(1 << 33, 0);
        let res = affinity(points.as_ref(), points.as_ref(), 1.0);
        assert!(matches!(
            res,
            Err(CpdError::AllocationFailed {
                rows: 8589934592,
                cols: 8589934592
            })
        ));
    }
}
