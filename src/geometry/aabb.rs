//! Axis-aligned bounding boxes.
//!
//! [`Aabb`] is the region type of the grid: the indexed volume, each cell, and
//! the broad-phase extent of every stored value are all boxes.
//!
//! A box is *null* when it has never had a point added to it (`min > max` on
//! every axis). Null boxes contain nothing and intersect nothing, and adding
//! the first point turns them into a degenerate box around that point.

use crate::geometry::point::Point;
use crate::geometry::traits::coordinate::{Coordinate, CoordinateScalar};
use crate::geometry::util::{hypot, squared_norm};
use serde::{Deserialize, Serialize};

/// An axis-aligned box in D-dimensional space.
///
/// # Examples
///
/// ```rust
/// use cellgrid::geometry::aabb::Aabb;
/// use cellgrid::geometry::point::Point;
/// use cellgrid::geometry::traits::coordinate::Coordinate;
///
/// let mut bb: Aabb<f64, 2> = Aabb::empty();
/// assert!(bb.is_null());
/// bb.add_point(&Point::new([1.0, 1.0]));
/// bb.add_point(&Point::new([3.0, 2.0]));
/// assert_eq!(bb.lengths(), [2.0, 1.0]);
/// assert!(bb.contains_point(&Point::new([2.0, 1.5])));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Aabb<T, const D: usize>
where
    T: CoordinateScalar,
{
    min: Point<T, D>,
    max: Point<T, D>,
}

impl<T, const D: usize> Aabb<T, D>
where
    T: CoordinateScalar,
{
    /// Creates a box from its minimum and maximum corners.
    ///
    /// The corners are taken as given; no reordering is performed.
    #[must_use]
    pub const fn new(min: Point<T, D>, max: Point<T, D>) -> Self {
        Self { min, max }
    }

    /// Creates a null box that contains nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min: Point::new([T::max_value(); D]),
            max: Point::new([T::min_value(); D]),
        }
    }

    /// Smallest box containing every point of `points`; null when `points` is empty.
    #[must_use]
    pub fn from_points<'a, I>(points: I) -> Self
    where
        I: IntoIterator<Item = &'a Point<T, D>>,
    {
        let mut bb = Self::empty();
        for p in points {
            bb.add_point(p);
        }
        bb
    }

    /// Returns true if no point has been added to the box.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.min
            .coords()
            .iter()
            .zip(self.max.coords())
            .any(|(lo, hi)| lo > hi)
    }

    /// Minimum corner.
    #[inline]
    #[must_use]
    pub const fn min(&self) -> &Point<T, D> {
        &self.min
    }

    /// Maximum corner.
    #[inline]
    #[must_use]
    pub const fn max(&self) -> &Point<T, D> {
        &self.max
    }

    /// Grows the box so it contains `p`.
    pub fn add_point(&mut self, p: &Point<T, D>) {
        self.min = self.min.zip_with(p, T::min);
        self.max = self.max.zip_with(p, T::max);
    }

    /// Grows the box so it contains `other`. Null boxes are ignored.
    pub fn add_box(&mut self, other: &Self) {
        if !other.is_null() {
            self.add_point(&other.min);
            self.add_point(&other.max);
        }
    }

    /// Center of the box.
    #[must_use]
    pub fn center(&self) -> Point<T, D> {
        let two = T::one() + T::one();
        self.min.zip_with(&self.max, |lo, hi| (lo + hi) / two)
    }

    /// Edge length on every axis.
    #[must_use]
    pub fn lengths(&self) -> [T; D] {
        self.max.zip_with(&self.min, |hi, lo| hi - lo).to_array()
    }

    /// Edge length on axis `axis`.
    ///
    /// # Panics
    ///
    /// Panics if `axis >= D`.
    #[must_use]
    pub fn length(&self, axis: usize) -> T {
        self.max.coords()[axis] - self.min.coords()[axis]
    }

    /// Length of the main diagonal; zero for a null box.
    #[must_use]
    pub fn diagonal(&self) -> T {
        if self.is_null() {
            return T::zero();
        }
        hypot(&self.lengths())
    }

    /// Returns true if `p` lies inside the box (boundary included).
    #[must_use]
    pub fn contains_point(&self, p: &Point<T, D>) -> bool {
        (0..D).all(|i| {
            let c = p.coords()[i];
            c >= self.min.coords()[i] && c <= self.max.coords()[i]
        })
    }

    /// Returns true if the two boxes overlap (touching counts as overlap).
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        (0..D).all(|i| {
            self.min.coords()[i] <= other.max.coords()[i]
                && other.min.coords()[i] <= self.max.coords()[i]
        })
    }

    /// Squared distance from `p` to the closest point of the box (zero inside).
    #[must_use]
    pub fn squared_distance_to_point(&self, p: &Point<T, D>) -> T {
        squared_norm(&self.gap_to(p))
    }

    /// Distance from `p` to the closest point of the box (zero inside).
    #[must_use]
    pub fn distance_to_point(&self, p: &Point<T, D>) -> T {
        hypot(&self.gap_to(p))
    }

    /// Distance between the closest points of two boxes (zero when they
    /// overlap).
    #[must_use]
    pub fn distance_to_box(&self, other: &Self) -> T {
        let mut gap = [T::zero(); D];
        for (i, g) in gap.iter_mut().enumerate() {
            let below = other.min.coords()[i] - self.max.coords()[i];
            let above = self.min.coords()[i] - other.max.coords()[i];
            if below > T::zero() {
                *g = below;
            } else if above > T::zero() {
                *g = above;
            }
        }
        hypot(&gap)
    }

    /// Returns the box grown by `amount` on every side.
    #[must_use]
    pub fn expanded_by(&self, amount: T) -> Self {
        Self {
            min: self.min.offset_all(-amount),
            max: self.max.offset_all(amount),
        }
    }

    fn gap_to(&self, p: &Point<T, D>) -> [T; D] {
        let mut gap = [T::zero(); D];
        for (i, g) in gap.iter_mut().enumerate() {
            let c = p.coords()[i];
            let lo = self.min.coords()[i];
            let hi = self.max.coords()[i];
            if c < lo {
                *g = lo - c;
            } else if c > hi {
                *g = c - hi;
            }
        }
        gap
    }
}

impl<T, const D: usize> Default for Aabb<T, D>
where
    T: CoordinateScalar,
{
    fn default() -> Self {
        Self::empty()
    }
}
