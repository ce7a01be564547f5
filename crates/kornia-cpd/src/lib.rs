#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Kornia CPD (Coherent Point Drift)
//!
//! Probabilistic point set registration that deforms a moving point set
//! toward a fixed one with a smooth displacement field.
//!
//! ## Example: one call registration
//!
//! ```rust
//! use kornia_cpd::{matrix::points_to_mat, nonrigid};
//!
//! let fixed = points_to_mat(&[
//!     [0.0, 0.0],
//!     [1.0, 0.0],
//!     [2.0, 0.5],
//!     [3.0, 0.0],
//!     [4.0, 0.0],
//! ]);
//! let moving = points_to_mat(&[
//!     [0.0, 0.1],
//!     [1.0, 0.2],
//!     [2.0, 0.4],
//!     [3.0, 0.2],
//!     [4.0, 0.1],
//! ]);
//!
//! let result = nonrigid(fixed.as_ref(), moving.as_ref())?;
//! println!("iterations: {}", result.num_iterations);
//! # Ok::<(), kornia_cpd::CpdError>(())
//! ```
//!
//! ## Example: custom parameters
//!
//! ```rust
//! use kornia_cpd::{matrix::points_to_mat, run, Nonrigid, Performance, RegistrationCriteria};
//!
//! # let fixed = points_to_mat(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]);
//! # let moving = points_to_mat(&[[0.1, 0.0], [1.1, 0.0], [0.1, 1.0], [1.1, 1.1]]);
//! let mut transform = Nonrigid::<Performance>::new().with_beta(2.0).with_lambda(1.0);
//! let criteria = RegistrationCriteria {
//!     max_iterations: 50,
//!     ..Default::default()
//! };
//! let result = run(&mut transform, fixed.as_ref(), moving.as_ref(), &criteria)?;
//! assert_eq!(result.points.nrows(), moving.nrows());
//! # Ok::<(), kornia_cpd::CpdError>(())
//! ```

mod affinity;
pub use affinity::affinity;

mod error;
pub use error::CpdError;

/// Expectation step of the coherent point drift.
pub mod gauss_transform;
pub use gauss_transform::{GaussTransform, GaussTransformDirect};

/// Conversions between point slices and dense matrices.
pub mod matrix;

/// Nonrigid transform with Gaussian regularized displacement field.
pub mod nonrigid;
pub use nonrigid::{Nonrigid, NonrigidParams, DEFAULT_BETA, DEFAULT_LAMBDA, DEFAULT_LINKED};

mod normalization;
pub use normalization::Normalization;

mod probabilities;
pub use probabilities::Probabilities;

mod registration;
pub use registration::*;

pub mod solver;
pub use solver::{LinearSolver, Performance, Precision};

mod transform;
pub use transform::{Transform, TransformStep};
