use thiserror::Error;

/// Error types for the coherent point drift registration.
#[derive(Debug, Error)]
pub enum CpdError {
    /// A configuration value is outside of its valid range.
    #[error("Invalid parameter {name} = {value}: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter
        name: &'static str,
        /// Value that was supplied
        value: f64,
        /// Why the value is rejected
        reason: &'static str,
    },

    /// Two matrices have incompatible shapes.
    #[error("Dimension mismatch for {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Label of the checked quantity
        what: &'static str,
        /// Expected size
        expected: usize,
        /// Actual size
        actual: usize,
    },

    /// A point set without points was provided.
    #[error("The {0} point set is empty")]
    EmptyPointSet(&'static str),

    /// The transform was used before `init` was called.
    #[error("Transform is not initialized, call init before compute_one")]
    NotInitialized,

    /// The correspondence statistics carry no mass.
    #[error("Degenerate correspondence statistics: sum(p1) = {np}")]
    DegenerateCorrespondence {
        /// Total correspondence mass of the moving points
        np: f64,
    },

    /// The noise variance stopped being a finite number.
    #[error("Noise variance is not finite: {0}")]
    NonFiniteVariance(f64),

    /// The requested dense matrix does not fit in memory.
    #[error("Unable to allocate a {rows}x{cols} matrix")]
    AllocationFailed {
        /// Requested number of rows
        rows: usize,
        /// Requested number of columns
        cols: usize,
    },
}
