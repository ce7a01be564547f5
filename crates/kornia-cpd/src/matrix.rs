use faer::{Col, Mat, MatRef};

use crate::error::CpdError;

/// Convert a slice of D-dimensional points into a dense N x D matrix.
///
/// Each point becomes one row of the output matrix.
///
/// Example:
///
/// ```
/// use kornia_cpd::matrix::points_to_mat;
///
/// let points = vec![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
/// let mat = points_to_mat(&points);
/// assert_eq!(mat.nrows(), 3);
/// assert_eq!(mat.ncols(), 2);
/// assert_eq!(mat.read(1, 0), 3.0);
/// ```
pub fn points_to_mat<const D: usize>(points: &[[f64; D]]) -> Mat<f64> {
    Mat::from_fn(points.len(), D, |i, j| points[i][j])
}

/// Convert a dense N x D matrix back into a vector of D-dimensional points.
///
/// # Arguments
///
/// * `mat` - A matrix with one point per row.
///
/// # Returns
///
/// The points, or an error if the number of columns is not `D`.
pub fn mat_to_points<const D: usize>(mat: MatRef<'_, f64>) -> Result<Vec<[f64; D]>, CpdError> {
    if mat.ncols() != D {
        return Err(CpdError::DimensionMismatch {
            what: "point dimension",
            expected: D,
            actual: mat.ncols(),
        });
    }

    let points = (0..mat.nrows())
        .map(|i| {
            let mut point = [0.0; D];
            for (j, val) in point.iter_mut().enumerate() {
                *val = mat.read(i, j);
            }
            point
        })
        .collect();

    Ok(points)
}

/// Computes trace(a^T * b), i.e. the sum of the elementwise product.
pub(crate) fn trace_product(a: MatRef<'_, f64>, b: MatRef<'_, f64>) -> f64 {
    debug_assert_eq!(a.nrows(), b.nrows());
    debug_assert_eq!(a.ncols(), b.ncols());
    let mut acc = 0.0;
    for j in 0..a.ncols() {
        for i in 0..a.nrows() {
            acc += a.read(i, j) * b.read(i, j);
        }
    }
    acc
}

/// Computes sum_i w_i * ||row_i||^2, the squared norm of each row weighted per row.
pub(crate) fn weighted_sum_squares(mat: MatRef<'_, f64>, weights: &Col<f64>) -> f64 {
    debug_assert_eq!(mat.nrows(), weights.nrows());
    let mut acc = 0.0;
    for i in 0..mat.nrows() {
        let w = weights.read(i);
        for j in 0..mat.ncols() {
            let v = mat.read(i, j);
            acc += v * v * w;
        }
    }
    acc
}

/// Per column mean of a matrix, one entry per dimension.
pub(crate) fn column_means(mat: MatRef<'_, f64>) -> Vec<f64> {
    let rows = mat.nrows() as f64;
    (0..mat.ncols()).map(|j| mat.col(j).sum() / rows).collect()
}
