//! D-dimensional points.
//!
//! Points are the default value type indexed by the grid and the query type of
//! every proximity search. Equality follows the NaN-aware semantics of
//! [`OrderedEq`](crate::geometry::traits::coordinate::OrderedEq) so that points
//! can be stored in hash buckets and deduplicated.

#![forbid(unsafe_code)]

use crate::geometry::traits::coordinate::{
    Coordinate, CoordinateScalar, CoordinateValidationError,
};
use crate::geometry::util::{hypot, squared_norm};
use serde::de::{Error, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

// =============================================================================
// POINT STRUCT DEFINITION
// =============================================================================

/// A point in D-dimensional space with scalar coordinates of type `T`.
///
/// Points are immutable once created.
///
/// # Examples
///
/// ```rust
/// use cellgrid::geometry::point::Point;
/// use cellgrid::geometry::traits::coordinate::Coordinate;
///
/// let a = Point::new([0.0, 0.0]);
/// let b = Point::new([3.0, 4.0]);
/// assert_eq!(a.distance(&b), 5.0);
/// assert_eq!(b.coords(), &[3.0, 4.0]);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Point<T, const D: usize>
where
    T: CoordinateScalar,
{
    coords: [T; D],
}

// =============================================================================
// PUBLIC API
// =============================================================================

impl<T, const D: usize> Point<T, D>
where
    T: CoordinateScalar,
{
    /// Returns a reference to the coordinate array.
    #[inline]
    #[must_use]
    pub const fn coords(&self) -> &[T; D] {
        &self.coords
    }

    /// Squared Euclidean distance to `other`.
    #[inline]
    #[must_use]
    pub fn squared_distance(&self, other: &Self) -> T {
        squared_norm(&self.difference(other))
    }

    /// Euclidean distance to `other`, computed with a scaled `hypot`.
    #[inline]
    #[must_use]
    pub fn distance(&self, other: &Self) -> T {
        hypot(&self.difference(other))
    }

    /// Returns this point with `offset` added to every coordinate.
    ///
    /// ```rust
    /// use cellgrid::geometry::point::Point;
    /// use cellgrid::geometry::traits::coordinate::Coordinate;
    ///
    /// let p = Point::new([1.0, 2.0]).offset_all(0.5);
    /// assert_eq!(p.to_array(), [1.5, 2.5]);
    /// ```
    #[must_use]
    pub fn offset_all(&self, offset: T) -> Self {
        Self {
            coords: self.coords.map(|c| c + offset),
        }
    }

    /// Per-axis component-wise combination of two points.
    #[must_use]
    pub fn zip_with(&self, other: &Self, mut f: impl FnMut(T, T) -> T) -> Self {
        let mut coords = self.coords;
        for (c, &o) in coords.iter_mut().zip(other.coords.iter()) {
            *c = f(*c, o);
        }
        Self { coords }
    }

    fn difference(&self, other: &Self) -> [T; D] {
        self.zip_with(other, |a, b| a - b).coords
    }
}

// =============================================================================
// TRAIT IMPLEMENTATIONS
// =============================================================================

impl<T, const D: usize> Coordinate<T, D> for Point<T, D>
where
    T: CoordinateScalar,
{
    #[inline]
    fn new(coords: [T; D]) -> Self {
        Self { coords }
    }

    #[inline]
    fn to_array(&self) -> [T; D] {
        self.coords
    }

    #[inline]
    fn get(&self, index: usize) -> Option<T> {
        self.coords.get(index).copied()
    }

    fn validate(&self) -> Result<(), CoordinateValidationError> {
        for (index, &coord) in self.coords.iter().enumerate() {
            if !coord.is_finite_generic() {
                return Err(CoordinateValidationError::InvalidCoordinate {
                    coordinate_index: index,
                    coordinate_value: format!("{coord:?}"),
                    dimension: D,
                });
            }
        }
        Ok(())
    }

    fn ordered_equals(&self, other: &Self) -> bool {
        self.coords
            .iter()
            .zip(other.coords.iter())
            .all(|(a, b)| a.ordered_eq(b))
    }
}

impl<T, const D: usize> Hash for Point<T, D>
where
    T: CoordinateScalar,
{
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        for &coord in &self.coords {
            coord.hash_scalar(state);
        }
    }
}

impl<T, const D: usize> PartialEq for Point<T, D>
where
    T: CoordinateScalar,
{
    fn eq(&self, other: &Self) -> bool {
        self.ordered_equals(other)
    }
}

impl<T, const D: usize> Eq for Point<T, D> where T: CoordinateScalar {}

// Lexicographic, using the total order of each coordinate.
impl<T, const D: usize> PartialOrd for Point<T, D>
where
    T: CoordinateScalar,
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        for (a, b) in self.coords.iter().zip(other.coords.iter()) {
            match a.ordered_partial_cmp(b) {
                Some(Ordering::Equal) => {}
                other_ordering => return other_ordering,
            }
        }
        Some(Ordering::Equal)
    }
}

impl<T, const D: usize> Default for Point<T, D>
where
    T: CoordinateScalar,
{
    fn default() -> Self {
        Self {
            coords: [T::default(); D],
        }
    }
}

impl<T, const D: usize> From<[T; D]> for Point<T, D>
where
    T: CoordinateScalar,
{
    #[inline]
    fn from(coords: [T; D]) -> Self {
        Self { coords }
    }
}

impl<T, const D: usize> From<Point<T, D>> for [T; D]
where
    T: CoordinateScalar,
{
    #[inline]
    fn from(point: Point<T, D>) -> [T; D] {
        point.coords
    }
}

// =============================================================================
// SERDE
// =============================================================================

// Serialized as a fixed-length tuple; non-finite values become `null`.
impl<T, const D: usize> Serialize for Point<T, D>
where
    T: CoordinateScalar,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeTuple;
        let mut tuple = serializer.serialize_tuple(D)?;
        for coord in &self.coords {
            if coord.is_finite_generic() {
                tuple.serialize_element(coord)?;
            } else {
                tuple.serialize_element(&Option::<T>::None)?;
            }
        }
        tuple.end()
    }
}

impl<'de, T, const D: usize> Deserialize<'de> for Point<T, D>
where
    T: CoordinateScalar,
{
    fn deserialize<DE>(deserializer: DE) -> Result<Self, DE::Error>
    where
        DE: serde::Deserializer<'de>,
    {
        struct ArrayVisitor<T, const D: usize>(PhantomData<T>);

        impl<'de, T, const D: usize> Visitor<'de> for ArrayVisitor<T, D>
        where
            T: CoordinateScalar,
        {
            type Value = Point<T, D>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_fmt(format_args!("an array of {D} coordinates (numbers or null)"))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut coords = [T::zero(); D];
                for (i, slot) in coords.iter_mut().enumerate() {
                    let element: Option<T> = seq
                        .next_element()?
                        .ok_or_else(|| Error::invalid_length(i, &self))?;
                    *slot = element.unwrap_or_else(T::nan);
                }
                Ok(Point::new(coords))
            }
        }

        deserializer.deserialize_tuple(D, ArrayVisitor(PhantomData))
    }
}
