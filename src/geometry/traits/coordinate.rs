//! Scalar and coordinate traits shared by every geometric type in the crate.
//!
//! The grid is generic over the floating-point scalar `T` and the dimension
//! `D`. Everything it needs from `T` is gathered in [`CoordinateScalar`]:
//!
//! - **`Float`**: arithmetic, `floor`, `sqrt`, `max`/`min`
//! - **`OrderedEq`**: NaN-aware equality so points can be hashed and deduplicated
//! - **`OrderedCmp`**: total ordering used for lexicographic comparison of points
//! - **`HashCoordinate`**: consistent hashing of floating-point values
//! - **`FiniteCheck`**: rejection of NaN/infinite coordinates at validation time
//!
//! # Examples
//!
//! ```rust
//! use cellgrid::geometry::point::Point;
//! use cellgrid::geometry::traits::coordinate::Coordinate;
//!
//! let p: Point<f64, 3> = Coordinate::new([1.0, 2.0, 3.0]);
//! assert_eq!(p.dim(), 3);
//! assert!(p.validate().is_ok());
//!
//! let bad: Point<f64, 2> = Coordinate::new([f64::NAN, 1.0]);
//! assert!(bad.validate().is_err());
//! // NaN coordinates still compare equal to themselves.
//! assert!(bad.ordered_equals(&Point::new([f64::NAN, 1.0])));
//! ```

use num_traits::{Float, Zero};
use ordered_float::OrderedFloat;
use serde::{Serialize, de::DeserializeOwned};
use std::{
    cmp::Ordering,
    fmt::Debug,
    hash::{Hash, Hasher},
};

/// Errors that can occur while converting between numeric scalar types.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum CoordinateConversionError {
    /// A value could not be represented exactly in the target type.
    #[error(
        "Failed to convert coordinate at index {coordinate_index} from {from_type} to {to_type}: {coordinate_value}"
    )]
    ConversionFailed {
        /// Index of the coordinate that failed to convert
        coordinate_index: usize,
        /// String representation of the problematic value
        coordinate_value: String,
        /// Source type name
        from_type: &'static str,
        /// Target type name
        to_type: &'static str,
    },
    /// The conversion produced NaN or infinity.
    #[error(
        "Non-finite value (NaN or infinity) at coordinate index {coordinate_index}: {coordinate_value}"
    )]
    NonFiniteValue {
        /// Index of the coordinate that contains the non-finite value
        coordinate_index: usize,
        /// String representation of the non-finite value
        coordinate_value: String,
    },
}

/// Errors that can occur during coordinate validation.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
pub enum CoordinateValidationError {
    /// A coordinate value is NaN or infinite.
    #[error(
        "Invalid coordinate at index {coordinate_index} in dimension {dimension}: {coordinate_value}"
    )]
    InvalidCoordinate {
        /// Index of the invalid coordinate.
        coordinate_index: usize,
        /// Value of the invalid coordinate, as a string.
        coordinate_value: String,
        /// The dimensionality of the coordinate system.
        dimension: usize,
    },
}

/// Default tolerance for f32 floating-point comparisons.
pub const DEFAULT_TOLERANCE_F32: f32 = 1e-6;

/// Default tolerance for f64 floating-point comparisons.
pub const DEFAULT_TOLERANCE_F64: f64 = 1e-15;

// =============================================================================
// SUPPORTING TRAITS
// =============================================================================

/// Helper trait for checking finiteness of coordinates.
///
/// # Examples
///
/// ```
/// use cellgrid::geometry::traits::coordinate::FiniteCheck;
///
/// assert!(3.5f64.is_finite_generic());
/// assert!(!f64::NAN.is_finite_generic());
/// assert!(!f32::INFINITY.is_finite_generic());
/// ```
pub trait FiniteCheck {
    /// Returns true if the value is neither NaN nor infinite.
    fn is_finite_generic(&self) -> bool;
}

/// NaN-aware equality: NaN equals NaN, and `0.0 == -0.0`.
///
/// # Examples
///
/// ```
/// use cellgrid::geometry::traits::coordinate::OrderedEq;
///
/// assert!(f64::NAN.ordered_eq(&f64::NAN));
/// assert!(0.0f64.ordered_eq(&(-0.0f64)));
/// assert!(!1.0f64.ordered_eq(&2.0f64));
/// ```
pub trait OrderedEq {
    /// Compares two values with ordered (NaN-aware) semantics.
    fn ordered_eq(&self, other: &Self) -> bool;
}

/// Total ordering over floating-point values (NaN sorts after everything).
pub trait OrderedCmp {
    /// Compares two values with the total order of [`OrderedFloat`].
    fn ordered_partial_cmp(&self, other: &Self) -> Option<Ordering>;
}

/// Consistent hashing of floating-point scalars, including NaN.
///
/// # Examples
///
/// ```
/// use cellgrid::geometry::traits::coordinate::HashCoordinate;
/// use std::collections::hash_map::DefaultHasher;
/// use std::hash::Hasher;
///
/// let mut h1 = DefaultHasher::new();
/// let mut h2 = DefaultHasher::new();
/// f64::NAN.hash_scalar(&mut h1);
/// f64::NAN.hash_scalar(&mut h2);
/// assert_eq!(h1.finish(), h2.finish());
/// ```
pub trait HashCoordinate {
    /// Hashes a single coordinate value into `state`.
    fn hash_scalar<H: Hasher>(&self, state: &mut H);
}

macro_rules! impl_scalar_traits {
    ($($t:ty),*) => {
        $(
            impl FiniteCheck for $t {
                #[inline(always)]
                fn is_finite_generic(&self) -> bool {
                    self.is_finite()
                }
            }

            impl OrderedEq for $t {
                #[inline(always)]
                fn ordered_eq(&self, other: &Self) -> bool {
                    OrderedFloat(*self) == OrderedFloat(*other)
                }
            }

            impl OrderedCmp for $t {
                #[inline(always)]
                fn ordered_partial_cmp(&self, other: &Self) -> Option<Ordering> {
                    Some(OrderedFloat(*self).cmp(&OrderedFloat(*other)))
                }
            }

            impl HashCoordinate for $t {
                #[inline(always)]
                fn hash_scalar<H: Hasher>(&self, state: &mut H) {
                    OrderedFloat(*self).hash(state);
                }
            }
        )*
    };
}

impl_scalar_traits!(f32, f64);

/// Trait alias for the scalar type requirements of the grid and its geometry.
///
/// ```rust
/// use cellgrid::geometry::traits::coordinate::CoordinateScalar;
///
/// fn close<T: CoordinateScalar>(a: T, b: T) -> bool {
///     (a - b).abs() < T::default_tolerance()
/// }
/// assert!(close(1.0f64, 1.0));
/// ```
pub trait CoordinateScalar:
    Float
    + OrderedEq
    + OrderedCmp
    + HashCoordinate
    + FiniteCheck
    + Default
    + Debug
    + Send
    + Sync
    + Serialize
    + DeserializeOwned
    + 'static
{
    /// Returns the default comparison tolerance for this scalar type
    /// (`1e-6` for `f32`, `1e-15` for `f64`).
    fn default_tolerance() -> Self;

    /// Number of significand bits, which bounds the integers this type
    /// represents exactly.
    fn mantissa_digits() -> u32;
}

impl CoordinateScalar for f32 {
    fn default_tolerance() -> Self {
        DEFAULT_TOLERANCE_F32
    }

    fn mantissa_digits() -> u32 {
        Self::MANTISSA_DIGITS
    }
}

impl CoordinateScalar for f64 {
    fn default_tolerance() -> Self {
        DEFAULT_TOLERANCE_F64
    }

    fn mantissa_digits() -> u32 {
        Self::MANTISSA_DIGITS
    }
}

/// Unified interface for fixed-size coordinate storage.
///
/// [`Point`](crate::geometry::point::Point) is the only implementor today; the
/// trait keeps construction, access and validation uniform across the crate.
pub trait Coordinate<T, const D: usize>
where
    T: CoordinateScalar,
    Self: Copy + Clone + Default + Debug + PartialEq + Eq + Hash + PartialOrd + Sized,
{
    /// Dimensionality of the coordinate system.
    #[must_use]
    fn dim(&self) -> usize {
        D
    }

    /// Creates a new coordinate from an array of scalar values.
    fn new(coords: [T; D]) -> Self;

    /// Copies the coordinates out as an array.
    #[must_use]
    fn to_array(&self) -> [T; D];

    /// Returns the coordinate at `index`, or `None` when out of bounds.
    ///
    /// ```
    /// use cellgrid::geometry::{point::Point, traits::coordinate::Coordinate};
    ///
    /// let p: Point<f64, 3> = Coordinate::new([1.0, 2.0, 3.0]);
    /// assert_eq!(p.get(0), Some(1.0));
    /// assert_eq!(p.get(3), None);
    /// ```
    #[must_use]
    fn get(&self, index: usize) -> Option<T>;

    /// Creates a coordinate with all values set to zero.
    #[must_use]
    fn origin() -> Self
    where
        T: Zero,
    {
        Self::new([T::zero(); D])
    }

    /// Validates that every coordinate is finite.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinateValidationError::InvalidCoordinate`] naming the
    /// first NaN or infinite coordinate.
    fn validate(&self) -> Result<(), CoordinateValidationError>;

    /// Equality using ordered (NaN-aware) comparison.
    #[must_use]
    fn ordered_equals(&self, other: &Self) -> bool;
}
