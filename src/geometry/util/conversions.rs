//! Conversions between grid integer indices and coordinate scalars.
//!
//! Cell arithmetic mixes `usize` cell counts with floating-point coordinates.
//! These helpers keep the casts in one place: conversions that can lose
//! information are fallible, and the cell-index conversion saturates.

use num_traits::cast::{NumCast, cast};

use crate::geometry::traits::coordinate::{CoordinateConversionError, CoordinateScalar};

/// Converts a `usize` to the scalar type `T` when it is exactly representable.
///
/// # Errors
///
/// Returns [`CoordinateConversionError::ConversionFailed`] if `value` exceeds
/// the range of integers `T` represents exactly (2^24 for `f32`, 2^53 for `f64`).
///
/// # Examples
///
/// ```
/// use cellgrid::geometry::util::safe_usize_to_scalar;
///
/// let x: f64 = safe_usize_to_scalar(42).unwrap();
/// assert_eq!(x, 42.0);
/// assert!(safe_usize_to_scalar::<f32>(1 << 25).is_err());
/// ```
pub fn safe_usize_to_scalar<T: CoordinateScalar>(
    value: usize,
) -> Result<T, CoordinateConversionError> {
    let max_precise_bits = T::mantissa_digits().min(u64::BITS);
    let fits = u64::try_from(value)
        .ok()
        .is_some_and(|v| <u128 as From<u64>>::from(v) < (1u128 << max_precise_bits));

    let failed = || CoordinateConversionError::ConversionFailed {
        coordinate_index: 0,
        coordinate_value: format!("{value}"),
        from_type: "usize",
        to_type: std::any::type_name::<T>(),
    };

    if !fits {
        return Err(failed());
    }
    cast(value).ok_or_else(failed)
}

/// Converts a non-negative scalar to a `usize` by flooring.
///
/// Negative values and NaN map to `0`; values beyond `usize::MAX` saturate.
///
/// # Examples
///
/// ```
/// use cellgrid::geometry::util::scalar_to_index;
///
/// assert_eq!(scalar_to_index(3.99f64), 3);
/// assert_eq!(scalar_to_index(-0.5f64), 0);
/// assert_eq!(scalar_to_index(f64::NAN), 0);
/// ```
pub fn scalar_to_index<T: CoordinateScalar>(value: T) -> usize {
    if value.is_nan() || value <= T::zero() {
        return 0;
    }
    <usize as NumCast>::from(value.floor()).unwrap_or(usize::MAX)
}

/// Lossy `usize` to scalar conversion used for cell counts and offsets.
///
/// Cell counts are far below the exact-integer range of `f32`/`f64` in any
/// grid that fits in memory, so this falls back to `T::max_value()` only for
/// absurd inputs.
#[inline]
pub fn index_to_scalar<T: CoordinateScalar>(value: usize) -> T {
    cast(value).unwrap_or_else(T::max_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_usize_to_scalar_limits() {
        assert_eq!(safe_usize_to_scalar::<f32>((1 << 24) - 1), Ok(16_777_215.0));
        assert!(safe_usize_to_scalar::<f32>(1 << 24).is_err());
        assert_eq!(safe_usize_to_scalar::<f64>(1 << 40), Ok(1_099_511_627_776.0));
        assert!(safe_usize_to_scalar::<f64>(usize::MAX).is_err());
    }

    #[test]
    fn test_scalar_to_index_saturates() {
        assert_eq!(scalar_to_index(0.0f64), 0);
        assert_eq!(scalar_to_index(9.999f32), 9);
        assert_eq!(scalar_to_index(f64::INFINITY), usize::MAX);
        assert_eq!(scalar_to_index(1e300f64), usize::MAX);
    }

    #[test]
    fn test_index_to_scalar() {
        assert!((index_to_scalar::<f64>(10) - 10.0).abs() < f64::EPSILON);
    }
}
