//! What the grid needs to know about the values it stores.
//!
//! A value is either *point-like*, stored in exactly the one cell containing
//! its [`anchor`](SpatialValue::anchor), or *extended*, stored in every cell its
//! bounding box overlaps (optionally filtered by a caller-supplied
//! intersection predicate).
//!
//! The grid never owns the elements of an external collection. To index
//! them, store a [`Keyed`] value: a stable key (a `slotmap` key carries a
//! generation, so a stale key never aliases a new element) together with a
//! snapshot of the element's geometry. If an element moves, the caller
//! erases and re-inserts it. Shared references (`&V`) also work, in which
//! case the borrow checker keeps the owner alive for the grid's lifetime.

use crate::geometry::aabb::Aabb;
use crate::geometry::point::Point;
use crate::geometry::sphere::Sphere;
use crate::geometry::traits::coordinate::CoordinateScalar;
use std::hash::{Hash, Hasher};

/// A value that can be stored in a grid.
pub trait SpatialValue<T, const D: usize>
where
    T: CoordinateScalar,
{
    /// Axis-aligned bounds of the value.
    fn bounding_box(&self) -> Aabb<T, D>;

    /// The single position of a point-like value, or `None` for an extended one.
    fn anchor(&self) -> Option<Point<T, D>> {
        None
    }

    /// Euclidean distance from `p` to the value.
    ///
    /// Extended values default to the distance to their bounding box, which
    /// never overestimates the distance to the value itself.
    fn distance_to(&self, p: &Point<T, D>) -> T {
        self.anchor().map_or_else(
            || self.bounding_box().distance_to_point(p),
            |a| a.distance(p),
        )
    }

    /// Whether the value touches the closed ball `sphere`.
    fn intersects_sphere(&self, sphere: &Sphere<T, D>) -> bool {
        self.anchor().map_or_else(
            || sphere.intersects_box(&self.bounding_box()),
            |a| sphere.contains_point(&a),
        )
    }
}

impl<T, const D: usize> SpatialValue<T, D> for Point<T, D>
where
    T: CoordinateScalar,
{
    fn bounding_box(&self) -> Aabb<T, D> {
        Aabb::new(*self, *self)
    }

    fn anchor(&self) -> Option<Point<T, D>> {
        Some(*self)
    }
}

impl<T, const D: usize> SpatialValue<T, D> for Aabb<T, D>
where
    T: CoordinateScalar,
{
    fn bounding_box(&self) -> Aabb<T, D> {
        *self
    }
}

impl<T, const D: usize> SpatialValue<T, D> for Sphere<T, D>
where
    T: CoordinateScalar,
{
    fn bounding_box(&self) -> Aabb<T, D> {
        Self::bounding_box(self)
    }

    fn distance_to(&self, p: &Point<T, D>) -> T {
        (self.center().distance(p) - self.radius()).max(T::zero())
    }

    fn intersects_sphere(&self, sphere: &Sphere<T, D>) -> bool {
        self.radius() >= T::zero()
            && sphere.radius() >= T::zero()
            && self.center().distance(sphere.center()) <= self.radius() + sphere.radius()
    }
}

impl<T, V, const D: usize> SpatialValue<T, D> for &V
where
    T: CoordinateScalar,
    V: SpatialValue<T, D> + ?Sized,
{
    fn bounding_box(&self) -> Aabb<T, D> {
        (**self).bounding_box()
    }

    fn anchor(&self) -> Option<Point<T, D>> {
        (**self).anchor()
    }

    fn distance_to(&self, p: &Point<T, D>) -> T {
        (**self).distance_to(p)
    }

    fn intersects_sphere(&self, sphere: &Sphere<T, D>) -> bool {
        (**self).intersects_sphere(sphere)
    }
}

/// Default distance between a query and a stored value.
///
/// A point-like side is measured with the other side's
/// [`distance_to`](SpatialValue::distance_to). Two extended values are
/// measured between their bounding boxes, which never overestimates.
///
/// # Examples
///
/// ```rust
/// use cellgrid::core::grid::value::distance_between;
/// use cellgrid::geometry::{aabb::Aabb, point::Point, traits::coordinate::Coordinate};
///
/// let face = Aabb::new(Point::new([0.0, 0.0]), Point::new([1.0, 1.0]));
/// let other = Aabb::new(Point::new([4.0, 0.5]), Point::new([5.0, 2.0]));
/// assert_eq!(distance_between(&face, &other), 3.0);
/// assert_eq!(distance_between(&Point::new([1.0, 3.0]), &face), 2.0);
/// ```
pub fn distance_between<T, Q, V, const D: usize>(query: &Q, value: &V) -> T
where
    T: CoordinateScalar,
    Q: SpatialValue<T, D> + ?Sized,
    V: SpatialValue<T, D> + ?Sized,
{
    if let Some(q) = query.anchor() {
        return value.distance_to(&q);
    }
    if let Some(v) = value.anchor() {
        return query.distance_to(&v);
    }
    query.bounding_box().distance_to_box(&value.bounding_box())
}

// =============================================================================
// KEYED VALUES
// =============================================================================

/// An element of an external collection, identified by `key`.
///
/// Equality and hashing use only the key, so deduplication and erasure
/// operate on element identity rather than on geometry.
///
/// # Examples
///
/// ```rust
/// use cellgrid::core::grid::value::{Keyed, SpatialValue};
/// use cellgrid::geometry::{point::Point, traits::coordinate::Coordinate};
///
/// let a = Keyed::new(7_u32, Point::new([0.0, 1.0]));
/// let moved = Keyed::new(7_u32, Point::new([5.0, 5.0]));
/// assert_eq!(a, moved);
/// assert_eq!(a.anchor(), Some(Point::new([0.0, 1.0])));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Keyed<K, V> {
    /// Stable identity of the element in its owning collection.
    pub key: K,
    /// Geometry of the element at insertion time.
    pub value: V,
}

impl<K, V> Keyed<K, V> {
    /// Pairs a key with its geometry.
    pub const fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}

impl<K: PartialEq, V> PartialEq for Keyed<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<K: Eq, V> Eq for Keyed<K, V> {}

impl<K: Hash, V> Hash for Keyed<K, V> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<T, K, V, const D: usize> SpatialValue<T, D> for Keyed<K, V>
where
    T: CoordinateScalar,
    V: SpatialValue<T, D>,
{
    fn bounding_box(&self) -> Aabb<T, D> {
        self.value.bounding_box()
    }

    fn anchor(&self) -> Option<Point<T, D>> {
        self.value.anchor()
    }

    fn distance_to(&self, p: &Point<T, D>) -> T {
        self.value.distance_to(p)
    }

    fn intersects_sphere(&self, sphere: &Sphere<T, D>) -> bool {
        self.value.intersects_sphere(sphere)
    }
}
