//! Geometric utility functions: norms, scalar conversions and random point
//! generation for d-dimensional geometry.

use thiserror::Error;

pub mod conversions;
pub mod norms;
pub mod point_generation;

pub use conversions::*;
pub use norms::*;
pub use point_generation::*;

/// Errors that can occur while generating random points.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RandomPointGenerationError {
    /// The coordinate range is empty or inverted.
    #[error("Invalid coordinate range: min {min} must be less than max {max}")]
    InvalidRange {
        /// Lower bound, as a string.
        min: String,
        /// Upper bound, as a string.
        max: String,
    },
    /// The requested box has an empty or inverted extent on some axis.
    #[error("Invalid bounding box on axis {axis}: min {min} must be less than max {max}")]
    InvalidBox {
        /// Offending axis.
        axis: usize,
        /// Lower bound on that axis, as a string.
        min: String,
        /// Upper bound on that axis, as a string.
        max: String,
    },
}
