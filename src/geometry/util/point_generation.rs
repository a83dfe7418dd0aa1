//! Seeded random point generation for tests, benchmarks and demos.

use rand::distr::uniform::SampleUniform;
use rand::{Rng, SeedableRng};

use crate::geometry::aabb::Aabb;
use crate::geometry::point::Point;
use crate::geometry::traits::coordinate::{Coordinate, CoordinateScalar};

use super::RandomPointGenerationError;

/// Generates `n_points` uniformly distributed points with every coordinate in
/// `[range.0, range.1)`, reproducibly from `seed`.
///
/// # Errors
///
/// Returns [`RandomPointGenerationError::InvalidRange`] if `range.0 >= range.1`.
///
/// # Examples
///
/// ```
/// use cellgrid::geometry::util::generate_random_points_seeded;
///
/// let a = generate_random_points_seeded::<f64, 3>(100, (0.0, 1.0), 42).unwrap();
/// let b = generate_random_points_seeded::<f64, 3>(100, (0.0, 1.0), 42).unwrap();
/// assert_eq!(a, b);
/// assert!(generate_random_points_seeded::<f64, 3>(10, (1.0, 1.0), 42).is_err());
/// ```
pub fn generate_random_points_seeded<T: CoordinateScalar + SampleUniform, const D: usize>(
    n_points: usize,
    range: (T, T),
    seed: u64,
) -> Result<Vec<Point<T, D>>, RandomPointGenerationError> {
    if range.0 >= range.1 {
        return Err(RandomPointGenerationError::InvalidRange {
            min: format!("{:?}", range.0),
            max: format!("{:?}", range.1),
        });
    }

    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    Ok((0..n_points)
        .map(|_| Point::new([T::zero(); D].map(|_| rng.random_range(range.0..range.1))))
        .collect())
}

/// Generates `n_points` uniformly distributed points inside `bbox`,
/// reproducibly from `seed`.
///
/// # Errors
///
/// Returns [`RandomPointGenerationError::InvalidBox`] if the box has a zero or
/// negative extent on some axis.
pub fn generate_random_points_in_box<T: CoordinateScalar + SampleUniform, const D: usize>(
    n_points: usize,
    bbox: &Aabb<T, D>,
    seed: u64,
) -> Result<Vec<Point<T, D>>, RandomPointGenerationError> {
    let lo = bbox.min().to_array();
    let hi = bbox.max().to_array();
    if let Some(axis) = (0..D).find(|&i| lo[i].partial_cmp(&hi[i]) != Some(std::cmp::Ordering::Less)) {
        return Err(RandomPointGenerationError::InvalidBox {
            axis,
            min: format!("{:?}", lo[axis]),
            max: format!("{:?}", hi[axis]),
        });
    }

    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    Ok((0..n_points)
        .map(|_| {
            let mut coords = [T::zero(); D];
            for (i, c) in coords.iter_mut().enumerate() {
                *c = rng.random_range(lo[i]..hi[i]);
            }
            Point::new(coords)
        })
        .collect())
}
