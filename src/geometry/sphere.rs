//! Closed D-dimensional balls used as range-query volumes.

use crate::geometry::aabb::Aabb;
use crate::geometry::point::Point;
use crate::geometry::traits::coordinate::CoordinateScalar;
use serde::{Deserialize, Serialize};

/// A closed ball: every point at distance `<= radius` from `center`.
///
/// # Examples
///
/// ```rust
/// use cellgrid::geometry::point::Point;
/// use cellgrid::geometry::sphere::Sphere;
/// use cellgrid::geometry::traits::coordinate::Coordinate;
///
/// let s = Sphere::new(Point::new([0.0, 0.0]), 1.0);
/// assert!(s.contains_point(&Point::new([1.0, 0.0])));
/// assert!(!s.contains_point(&Point::new([1.0, 0.1])));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Sphere<T, const D: usize>
where
    T: CoordinateScalar,
{
    center: Point<T, D>,
    radius: T,
}

impl<T, const D: usize> Sphere<T, D>
where
    T: CoordinateScalar,
{
    /// Creates a sphere. A negative radius yields a sphere that contains nothing.
    #[must_use]
    pub const fn new(center: Point<T, D>, radius: T) -> Self {
        Self { center, radius }
    }

    /// Center of the sphere.
    #[inline]
    #[must_use]
    pub const fn center(&self) -> &Point<T, D> {
        &self.center
    }

    /// Radius of the sphere.
    #[inline]
    #[must_use]
    pub const fn radius(&self) -> T {
        self.radius
    }

    /// Returns true if `p` is inside the sphere or on its surface.
    #[must_use]
    pub fn contains_point(&self, p: &Point<T, D>) -> bool {
        self.radius >= T::zero() && self.center.distance(p) <= self.radius
    }

    /// Returns true if the sphere overlaps `bb`.
    #[must_use]
    pub fn intersects_box(&self, bb: &Aabb<T, D>) -> bool {
        !bb.is_null()
            && self.radius >= T::zero()
            && bb.squared_distance_to_point(&self.center) <= self.radius * self.radius
    }

    /// Smallest axis-aligned box enclosing the sphere.
    #[must_use]
    pub fn bounding_box(&self) -> Aabb<T, D> {
        Aabb::new(
            self.center.offset_all(-self.radius),
            self.center.offset_all(self.radius),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::traits::coordinate::Coordinate;

    #[test]
    fn test_sphere_contains_boundary() {
        let s: Sphere<f64, 3> = Sphere::new(Point::new([0.0; 3]), 2.0);
        assert!(s.contains_point(&Point::new([2.0, 0.0, 0.0])));
        assert!(s.contains_point(&Point::new([1.0, 1.0, 1.0])));
        assert!(!s.contains_point(&Point::new([2.0, 0.1, 0.0])));
    }

    #[test]
    fn test_sphere_box_intersection() {
        let s: Sphere<f64, 2> = Sphere::new(Point::new([0.0, 0.0]), 1.0);
        let touching = Aabb::new(Point::new([1.0, -1.0]), Point::new([2.0, 1.0]));
        let corner_miss = Aabb::new(Point::new([0.8, 0.8]), Point::new([2.0, 2.0]));
        let containing = Aabb::new(Point::new([-5.0, -5.0]), Point::new([5.0, 5.0]));
        assert!(s.intersects_box(&touching));
        assert!(!s.intersects_box(&corner_miss));
        assert!(s.intersects_box(&containing));
        assert!(!s.intersects_box(&Aabb::empty()));
    }

    #[test]
    fn test_negative_radius_is_empty() {
        let s: Sphere<f32, 2> = Sphere::new(Point::new([0.0, 0.0]), -1.0);
        assert!(!s.contains_point(&Point::new([0.0, 0.0])));
    }

    #[test]
    fn test_bounding_box() {
        let s: Sphere<f64, 2> = Sphere::new(Point::new([1.0, 2.0]), 0.5);
        let bb = s.bounding_box();
        assert_eq!(bb.min().to_array(), [0.5, 1.5]);
        assert_eq!(bb.max().to_array(), [1.5, 2.5]);
    }

    #[test]
    fn test_serde_roundtrip() {
        let s: Sphere<f64, 3> = Sphere::new(Point::new([0.05, 0.15, 0.25]), 0.2);
        let json = serde_json::to_string(&s).unwrap();
        let back: Sphere<f64, 3> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
