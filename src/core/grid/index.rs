//! The grid query engine.
//!
//! [`GridIndex`] implements insertion, erasure and every query once, on top of
//! the [`BucketStorage`] capability. The backend is a type parameter:
//!
//! - [`StaticGrid`]: bulk-built [`StaticBucketStore`]. Call
//!   [`build`](GridIndex::build) after inserting; there is no erase.
//! - [`HashTableGrid`]: [`HashBucketStore`], query-ready after every insert or
//!   erase, with set semantics per cell.
//! - [`HashMultiGrid`]: [`HashBucketStore`] that keeps duplicates.
//!
//! # Nearest-neighbour search
//!
//! Proximity queries accept any [`SpatialValue`] as the query. They start at
//! the cells covered by the query's bounding box and scan rings of cells at
//! growing Chebyshev distance from that range. After ring `r` every unscanned
//! cell is at least `r` whole cells away from the query, so no unscanned
//! value is closer than `r * min_cell_length`; the search stops as soon as
//! the current answer is within that bound, or when the rings cover the
//! whole lattice.
//!
//! # Example
//!
//! ```rust
//! use cellgrid::prelude::*;
//!
//! let points = vec![
//!     Point::new([0.05, 0.15, 0.25]),
//!     Point::new([0.02, 0.12, 0.29]),
//!     Point::new([0.12, 0.09, 0.32]),
//!     Point::new([0.24, 0.52, 0.29]),
//! ];
//! let grid: StaticGrid<f64, 3> =
//!     GridIndex::try_from_values(points, &GridSizingOptions::default()).unwrap();
//!
//! let nearest = grid.closest_value(&Point::new([0.2, 0.5, 0.3])).unwrap();
//! assert_eq!(nearest.value(), &Point::new([0.24, 0.52, 0.29]));
//!
//! let ball = Sphere::new(Point::new([0.05, 0.15, 0.25]), 0.2);
//! assert_eq!(grid.count_in_sphere(&ball), 3);
//! ```

use super::cell_enumerator::CellCoord;
use super::cell_geometry::{CellGeometry, GridError, chebyshev_distance_to_range};
use super::hash_store::HashBucketStore;
use super::iter::{GridEntry, GridIter, InCell, Neighbor, SphereQuery};
use super::sizing::GridSizingOptions;
use super::static_store::StaticBucketStore;
use super::storage::{BucketStorage, ErasableStorage};
use super::value::{SpatialValue, distance_between};
use crate::geometry::aabb::Aabb;
use crate::geometry::point::Point;
use crate::geometry::sphere::Sphere;
use crate::geometry::traits::coordinate::{Coordinate, CoordinateScalar};
use crate::geometry::util::index_to_scalar;
use std::cmp::Ordering;
use std::collections::{BTreeSet, BinaryHeap};
use std::fmt;
use std::sync::Arc;

/// Broad-phase test deciding whether an extended value is stored in a cell,
/// given the cell's box.
pub type IntersectsCellFn<T, V, const D: usize> =
    Arc<dyn Fn(&Aabb<T, D>, &V) -> bool + Send + Sync>;

/// A uniform grid over values of type `V`, stored in backend `S`.
pub struct GridIndex<T, const D: usize, V, S>
where
    T: CoordinateScalar,
{
    geometry: CellGeometry<T, D>,
    storage: S,
    intersects: Option<IntersectsCellFn<T, V, D>>,
}

/// Bulk-built grid: insert, [`build`](GridIndex::build), then query.
pub type StaticGrid<T, const D: usize, V = Point<T, D>> = GridIndex<T, D, V, StaticBucketStore<V>>;

/// Mutable grid that rejects duplicate values within a cell.
pub type HashTableGrid<T, const D: usize, V = Point<T, D>> =
    GridIndex<T, D, V, HashBucketStore<V>>;

/// Mutable grid that keeps duplicate values.
pub type HashMultiGrid<T, const D: usize, V = Point<T, D>> =
    GridIndex<T, D, V, HashBucketStore<V, true>>;

impl<T, const D: usize, V, S> Clone for GridIndex<T, D, V, S>
where
    T: CoordinateScalar,
    S: Clone,
{
    fn clone(&self) -> Self {
        Self {
            geometry: self.geometry.clone(),
            storage: self.storage.clone(),
            intersects: self.intersects.clone(),
        }
    }
}

impl<T, const D: usize, V, S> fmt::Debug for GridIndex<T, D, V, S>
where
    T: CoordinateScalar,
    S: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridIndex")
            .field("geometry", &self.geometry)
            .field("storage", &self.storage)
            .field("has_intersects_fn", &self.intersects.is_some())
            .finish()
    }
}

// =============================================================================
// CONSTRUCTION AND MUTATION
// =============================================================================

impl<T, const D: usize, V, S> GridIndex<T, D, V, S>
where
    T: CoordinateScalar,
    V: SpatialValue<T, D> + PartialEq,
    S: BucketStorage<V>,
{
    /// Creates an empty grid over `geometry`.
    #[must_use]
    pub fn new(geometry: CellGeometry<T, D>) -> Self {
        Self {
            geometry,
            storage: S::default(),
            intersects: None,
        }
    }

    /// Sets the broad-phase test used when inserting extended values.
    ///
    /// Without it an extended value is stored in every cell its bounding box
    /// overlaps. Point-like values ignore it.
    #[must_use]
    pub fn with_intersects<F>(mut self, intersects: F) -> Self
    where
        F: Fn(&Aabb<T, D>, &V) -> bool + Send + Sync + 'static,
    {
        self.intersects = Some(Arc::new(intersects));
        self
    }

    /// Builds a grid sized for `values` and inserts them.
    ///
    /// The box around all values is inflated and partitioned as described in
    /// [`CellGeometry::try_from_bbox`]. Static grids are built before
    /// returning.
    ///
    /// # Errors
    ///
    /// - [`GridError::EmptyInput`] if `values` is empty
    /// - [`GridError::InvalidCoordinate`] if a value has non-finite bounds
    pub fn try_from_values<I>(values: I, options: &GridSizingOptions) -> Result<Self, GridError>
    where
        I: IntoIterator<Item = V>,
        V: Clone,
    {
        let values: Vec<V> = values.into_iter().collect();
        if values.is_empty() {
            return Err(GridError::EmptyInput);
        }
        let mut bbox = Aabb::empty();
        for value in &values {
            let bb = value.bounding_box();
            bb.min().validate()?;
            bb.max().validate()?;
            bbox.add_box(&bb);
        }
        let n_values = values.len();
        let mut grid = Self::new(CellGeometry::try_from_bbox(&bbox, n_values, options)?);
        let stored = grid.insert_all(values);
        let total_cells = grid.geometry.total_cells();
        grid.storage.build(total_cells);
        tracing::debug!(
            values = n_values,
            stored,
            cells = total_cells,
            "populated auto-sized grid"
        );
        Ok(grid)
    }

    /// Inserts `value`.
    ///
    /// Point-like values go to the cell containing their anchor. Extended
    /// values go to every cell of their bounding-box range that passes the
    /// intersection test. Returns `true` if the value was stored in at least
    /// one cell.
    pub fn insert(&mut self, value: V) -> bool
    where
        V: Clone,
    {
        if let Some(anchor) = value.anchor() {
            let cell = self.geometry.index_of_point(&anchor);
            return self.storage.insert_in_cell(cell, value);
        }
        let Some((first, last)) = self.geometry.cells_overlapping_box(&value.bounding_box()) else {
            return false;
        };
        let mut stored = false;
        for cell in self.geometry.cells_between(first, last) {
            if let Some(intersects) = &self.intersects
                && !intersects(&self.geometry.cell_box(&cell), &value)
            {
                continue;
            }
            let index = self.geometry.index_of_cell(&cell);
            stored |= self.storage.insert_in_cell(index, value.clone());
        }
        stored
    }

    /// Inserts every value and returns how many were stored.
    pub fn insert_all<I>(&mut self, values: I) -> usize
    where
        I: IntoIterator<Item = V>,
        V: Clone,
    {
        let mut stored = 0;
        for value in values {
            if self.insert(value) {
                stored += 1;
            }
        }
        stored
    }

    /// Removes every value.
    pub fn clear(&mut self) {
        self.storage.clear();
    }
}

impl<T, const D: usize, V> GridIndex<T, D, V, StaticBucketStore<V>>
where
    T: CoordinateScalar,
{
    /// Sorts the entries and rebuilds the offset table, making every inserted
    /// value visible to queries.
    pub fn build(&mut self) {
        let total_cells = self.geometry.total_cells();
        self.storage.build(total_cells);
    }

    /// Whether every inserted value is visible to queries.
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.storage.is_built()
    }

    /// Number of values inserted since the last [`build`](Self::build).
    #[must_use]
    pub fn pending(&self) -> usize {
        self.storage.pending()
    }
}

impl<T, const D: usize, V, S> GridIndex<T, D, V, S>
where
    T: CoordinateScalar,
    V: SpatialValue<T, D> + PartialEq,
    S: ErasableStorage<V>,
{
    /// Removes `value` from every cell it is stored in.
    ///
    /// The value must carry the geometry it was inserted with, since that is
    /// what locates its cells. Returns `false` if it was not found.
    pub fn erase(&mut self, value: &V) -> bool {
        if let Some(anchor) = value.anchor() {
            let cell = self.geometry.index_of_point(&anchor);
            return self.storage.erase_in_cell(cell, value);
        }
        let Some((first, last)) = self.geometry.cells_overlapping_box(&value.bounding_box()) else {
            return false;
        };
        let mut erased = false;
        for cell in self.geometry.cells_between(first, last) {
            erased |= self
                .storage
                .erase_in_cell(self.geometry.index_of_cell(&cell), value);
        }
        erased
    }

    /// Removes every value of `cell` and returns how many there were.
    pub fn erase_all_in_cell(&mut self, cell: &CellCoord<D>) -> usize {
        let index = self.geometry.index_of_cell(cell);
        self.storage.erase_all_in_cell(index)
    }

    /// Removes every value touching `sphere` and returns how many were
    /// removed, counting each stored copy of a duplicated value.
    pub fn erase_in_sphere(&mut self, sphere: &Sphere<T, D>) -> usize
    where
        V: Clone,
    {
        let hits: Vec<V> = self
            .values_in_sphere(sphere)
            .map(|entry| entry.value().clone())
            .collect();
        // Erasing a value removes its equal copies too; later hits are no-ops.
        for value in &hits {
            self.erase(value);
        }
        hits.len()
    }

    /// Releases the slots of erased values.
    pub fn compact(&mut self) {
        self.storage.compact();
    }
}

// =============================================================================
// QUERIES
// =============================================================================

impl<T, const D: usize, V, S> GridIndex<T, D, V, S>
where
    T: CoordinateScalar,
    V: SpatialValue<T, D> + PartialEq,
    S: BucketStorage<V>,
{
    /// The cell layout.
    #[must_use]
    pub const fn geometry(&self) -> &CellGeometry<T, D> {
        &self.geometry
    }

    /// The backend.
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Number of stored `(cell, value)` entries. An extended value stored in
    /// several cells counts once per cell.
    #[must_use]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Whether the grid stores nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Whether `cell` stores no value.
    #[must_use]
    pub fn cell_empty(&self, cell: &CellCoord<D>) -> bool {
        self.storage.cell_empty(self.geometry.index_of_cell(cell))
    }

    /// Number of values stored in `cell`.
    #[must_use]
    pub fn count_in_cell(&self, cell: &CellCoord<D>) -> usize {
        self.storage.count_in_cell(self.geometry.index_of_cell(cell))
    }

    /// Values stored in `cell`.
    pub fn values_in_cell(&self, cell: &CellCoord<D>) -> GridIter<'_, T, D, InCell<S::CellValues<'_>>> {
        let index = self.geometry.index_of_cell(cell);
        GridIter::new(
            &self.geometry,
            InCell::new(index, self.storage.values_in_cell(index)),
        )
    }

    /// Every stored entry.
    pub fn iter(&self) -> GridIter<'_, T, D, S::Entries<'_>> {
        GridIter::new(&self.geometry, self.storage.entries())
    }

    /// Coordinates of the cells holding at least one value.
    #[must_use]
    pub fn non_empty_cells(&self) -> BTreeSet<CellCoord<D>> {
        self.storage
            .occupied_cells()
            .into_iter()
            .map(|index| self.geometry.cell_of_index(index))
            .collect()
    }

    /// Lazily yields every value touching `sphere`, each once.
    pub fn values_in_sphere(&self, sphere: &Sphere<T, D>) -> SphereQuery<'_, T, V, S, D> {
        SphereQuery::new(&self.geometry, &self.storage, *sphere)
    }

    /// Number of values touching `sphere`.
    #[must_use]
    pub fn count_in_sphere(&self, sphere: &Sphere<T, D>) -> usize {
        self.values_in_sphere(sphere).count()
    }

    /// The value closest to `query`, or `None` if the grid is empty.
    ///
    /// The query is any [`SpatialValue`]: a point, or an extended value such
    /// as a box, measured with [`distance_between`]. Ties may return any of
    /// the closest values.
    #[must_use]
    pub fn closest_value<Q>(&self, query: &Q) -> Option<Neighbor<'_, T, V, D>>
    where
        Q: SpatialValue<T, D> + ?Sized,
    {
        self.closest_by(query, None, |q, v| distance_between::<T, Q, V, D>(q, v))
    }

    /// The value closest to `query` among those at distance at most `max_dist`.
    #[must_use]
    pub fn closest_value_within<Q>(&self, query: &Q, max_dist: T) -> Option<Neighbor<'_, T, V, D>>
    where
        Q: SpatialValue<T, D> + ?Sized,
    {
        if max_dist < T::zero() {
            return None;
        }
        self.closest_by(query, Some(max_dist), |q, v| distance_between::<T, Q, V, D>(q, v))
    }

    /// The value minimising `distance(query, value)`.
    ///
    /// `distance` must never be smaller than the Euclidean distance between
    /// the bounding box of `query` and the cells the value is stored in,
    /// otherwise the search may stop before reaching the true minimum.
    pub fn closest_value_with<Q, F>(&self, query: &Q, distance: F) -> Option<Neighbor<'_, T, V, D>>
    where
        Q: SpatialValue<T, D> + ?Sized,
        F: Fn(&Q, &V) -> T,
    {
        self.closest_by(query, None, distance)
    }

    /// The `k` values closest to `query`, sorted by distance.
    ///
    /// Returns fewer than `k` values if the grid holds fewer. Equal distances
    /// are ordered by the order in which the search met the values.
    #[must_use]
    pub fn k_closest_values<Q>(&self, query: &Q, k: usize) -> Vec<Neighbor<'_, T, V, D>>
    where
        Q: SpatialValue<T, D> + ?Sized,
    {
        self.k_closest_values_with(query, k, |q, v| distance_between::<T, Q, V, D>(q, v))
    }

    /// [`k_closest_values`](Self::k_closest_values) with a custom distance,
    /// subject to the same lower-bound requirement as
    /// [`closest_value_with`](Self::closest_value_with).
    pub fn k_closest_values_with<Q, F>(
        &self,
        query: &Q,
        k: usize,
        distance: F,
    ) -> Vec<Neighbor<'_, T, V, D>>
    where
        Q: SpatialValue<T, D> + ?Sized,
        F: Fn(&Q, &V) -> T,
    {
        if k == 0 {
            return Vec::new();
        }
        let mut collector = KClosest {
            distance: |v: &V| distance(query, v),
            k,
            heap: BinaryHeap::with_capacity(k.min(self.len())),
            seen: 0,
        };
        self.scan_rings(&query.bounding_box(), &mut collector);
        collector
            .heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| Neighbor {
                entry: GridEntry::new(&self.geometry, c.cell, c.value),
                distance: c.distance,
            })
            .collect()
    }

    fn closest_by<Q, F>(
        &self,
        query: &Q,
        max_dist: Option<T>,
        distance: F,
    ) -> Option<Neighbor<'_, T, V, D>>
    where
        Q: SpatialValue<T, D> + ?Sized,
        F: Fn(&Q, &V) -> T,
    {
        let mut collector = Closest {
            distance: |v: &V| distance(query, v),
            max_dist,
            best: None,
        };
        self.scan_rings(&query.bounding_box(), &mut collector);
        collector.best.map(|(distance, cell, value)| Neighbor {
            entry: GridEntry::new(&self.geometry, cell, value),
            distance,
        })
    }

    /// Offers the values around `query` to `collector`, ring by ring, until
    /// it reports that nothing beyond the scanned rings can matter.
    ///
    /// Ring `0` is the cell range covered by `query`; ring `r` holds the
    /// cells at Chebyshev distance `r` from that range.
    fn scan_rings<'a, C>(&'a self, query: &Aabb<T, D>, collector: &mut C)
    where
        C: RingCollector<'a, T, V>,
    {
        if self.storage.is_empty() {
            return;
        }
        let Some((first, last)) = self.geometry.cells_overlapping_box(query) else {
            return;
        };
        let max_ring = self.geometry.max_ring_around_range(&first, &last);
        let min_cell_length = self.geometry.min_cell_length();

        for ring in 0..=max_ring {
            for cell in self.geometry.cells_around_range(&first, &last, ring) {
                if chebyshev_distance_to_range(&cell, &first, &last) != ring {
                    continue;
                }
                let index = self.geometry.index_of_cell(&cell);
                for value in self.storage.values_in_cell(index) {
                    collector.offer(index, value, value.anchor().is_none());
                }
            }
            let shell_bound = index_to_scalar::<T>(ring) * min_cell_length;
            if collector.is_complete(shell_bound) {
                tracing::trace!(rings = ring + 1, "ring search converged");
                return;
            }
        }
        tracing::trace!(rings = max_ring + 1, "ring search covered the whole grid");
    }
}

// =============================================================================
// RING COLLECTORS
// =============================================================================

trait RingCollector<'a, T, V> {
    /// `extended` values may be offered once per cell they are stored in.
    fn offer(&mut self, cell: usize, value: &'a V, extended: bool);

    /// Whether values at distance `>= bound` can no longer change the result.
    fn is_complete(&self, bound: T) -> bool;
}

struct Closest<'a, T, V, F> {
    distance: F,
    max_dist: Option<T>,
    best: Option<(T, usize, &'a V)>,
}

impl<'a, T, V, F> RingCollector<'a, T, V> for Closest<'a, T, V, F>
where
    T: CoordinateScalar,
    F: Fn(&V) -> T,
{
    fn offer(&mut self, cell: usize, value: &'a V, _extended: bool) {
        let d = (self.distance)(value);
        if d.is_nan() || self.max_dist.is_some_and(|m| d > m) {
            return;
        }
        if self.best.is_none_or(|(b, _, _)| d < b) {
            self.best = Some((d, cell, value));
        }
    }

    fn is_complete(&self, bound: T) -> bool {
        self.best.is_some_and(|(b, _, _)| b <= bound) || self.max_dist.is_some_and(|m| bound > m)
    }
}

struct Candidate<'a, T, V> {
    distance: T,
    seq: usize,
    cell: usize,
    value: &'a V,
}

impl<T: CoordinateScalar, V> PartialEq for Candidate<'_, T, V> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: CoordinateScalar, V> Eq for Candidate<'_, T, V> {}

impl<T: CoordinateScalar, V> PartialOrd for Candidate<'_, T, V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Farther first; among equal distances the later-met candidate is larger.
impl<T: CoordinateScalar, V> Ord for Candidate<'_, T, V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .ordered_partial_cmp(&other.distance)
            .unwrap_or(Ordering::Equal)
            .then(self.seq.cmp(&other.seq))
    }
}

struct KClosest<'a, T, V, F> {
    distance: F,
    k: usize,
    /// Max-heap of the best `k` candidates so far.
    heap: BinaryHeap<Candidate<'a, T, V>>,
    seen: usize,
}

impl<'a, T, V, F> RingCollector<'a, T, V> for KClosest<'a, T, V, F>
where
    T: CoordinateScalar,
    V: PartialEq,
    F: Fn(&V) -> T,
{
    fn offer(&mut self, cell: usize, value: &'a V, extended: bool) {
        let d = (self.distance)(value);
        if d.is_nan() {
            return;
        }
        let full = self.heap.len() >= self.k;
        if full && self.heap.peek().is_some_and(|worst| worst.distance <= d) {
            return;
        }
        // Copies of an extended value share their cells, so an equal value
        // already admitted from another cell is this one seen again.
        if extended
            && self
                .heap
                .iter()
                .any(|c| c.cell != cell && c.value == value)
        {
            return;
        }
        let candidate = Candidate {
            distance: d,
            seq: self.seen,
            cell,
            value,
        };
        self.seen += 1;
        if full {
            self.heap.pop();
        }
        self.heap.push(candidate);
    }

    fn is_complete(&self, bound: T) -> bool {
        self.heap.len() >= self.k && self.heap.peek().is_some_and(|worst| worst.distance <= bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grid::value::Keyed;
    use approx::assert_relative_eq;

    fn unit_geometry(n: usize) -> CellGeometry<f64, 3> {
        CellGeometry::try_new(Aabb::new(Point::new([0.0; 3]), Point::new([1.0; 3])), [n; 3]).unwrap()
    }

    fn sample_points() -> Vec<Point<f64, 3>> {
        vec![
            Point::new([0.05, 0.15, 0.25]),
            Point::new([0.05, 0.15, 0.25]),
            Point::new([0.02, 0.12, 0.29]),
            Point::new([0.12, 0.09, 0.32]),
            Point::new([0.24, 0.52, 0.29]),
        ]
    }

    fn brute_force_nearest(points: &[Point<f64, 3>], q: &Point<f64, 3>) -> f64 {
        points
            .iter()
            .map(|p| p.distance(q))
            .fold(f64::INFINITY, f64::min)
    }

    #[test]
    fn test_static_grid_requires_build() {
        let mut grid: StaticGrid<f64, 3> = GridIndex::new(unit_geometry(10));
        assert_eq!(grid.insert_all(sample_points()), 5);
        assert!(!grid.is_built());
        assert_eq!(grid.pending(), 5);
        assert!(grid.closest_value(&Point::new([0.5; 3])).is_none());

        grid.build();
        assert!(grid.is_built());
        assert_eq!(grid.len(), 5);
        assert_eq!(grid.count_in_cell(&[0, 1, 2]), 3);
        assert_eq!(grid.values_in_cell(&[0, 1, 2]).count(), 3);
        assert!(grid.values_in_cell(&[0, 1, 2]).all(|e| e.cell() == [0, 1, 2]));
    }

    #[test]
    fn test_hash_grid_rejects_duplicates() {
        let mut grid: HashTableGrid<f64, 3> = GridIndex::new(unit_geometry(10));
        assert_eq!(grid.insert_all(sample_points()), 4);
        assert_eq!(grid.len(), 4);
        assert_eq!(grid.count_in_cell(&[0, 1, 2]), 2);

        let mut multi: HashMultiGrid<f64, 3> = GridIndex::new(unit_geometry(10));
        assert_eq!(multi.insert_all(sample_points()), 5);
    }

    #[test]
    fn test_entries_report_their_cell() {
        let mut grid: HashTableGrid<f64, 3> = GridIndex::new(unit_geometry(10));
        grid.insert(Point::new([0.24, 0.52, 0.29]));
        let entry = grid.iter().next().unwrap();
        assert_eq!(entry.cell(), [2, 5, 2]);
        assert_eq!(entry.cell_index(), 252);
        assert_eq!(grid.non_empty_cells().into_iter().collect::<Vec<_>>(), vec![[2, 5, 2]]);
    }

    #[test]
    fn test_closest_value_matches_brute_force() {
        let points = sample_points();
        let mut grid: StaticGrid<f64, 3> = GridIndex::new(unit_geometry(10));
        grid.insert_all(points.clone());
        grid.build();
        for q in [
            Point::new([0.9, 0.9, 0.9]),
            Point::new([0.0, 0.0, 0.0]),
            Point::new([0.2, 0.5, 0.3]),
            Point::new([-4.0, 2.0, 0.3]),
        ] {
            let found = grid.closest_value(&q).unwrap();
            assert_relative_eq!(found.distance, brute_force_nearest(&points, &q), epsilon = 1e-12);
            assert_relative_eq!(found.value().distance(&q), found.distance, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_closest_value_within_respects_limit() {
        let mut grid: HashTableGrid<f64, 3> = GridIndex::new(unit_geometry(10));
        grid.insert_all(sample_points());
        let q = Point::new([0.9, 0.9, 0.9]);
        assert!(grid.closest_value_within(&q, 0.1).is_none());
        assert!(grid.closest_value_within(&q, -1.0).is_none());
        let hit = grid.closest_value_within(&q, 2.0).unwrap();
        assert_eq!(hit.value(), &Point::new([0.24, 0.52, 0.29]));
    }

    #[test]
    fn test_closest_value_with_custom_distance() {
        let mut grid: HashTableGrid<f64, 2> = GridIndex::new(
            CellGeometry::try_new(Aabb::new(Point::new([0.0; 2]), Point::new([1.0; 2])), [4, 4])
                .unwrap(),
        );
        grid.insert_all([Point::new([0.1, 0.1]), Point::new([0.3, 0.1])]);
        // Penalise the first point; still never below the Euclidean distance.
        let q = Point::new([0.15, 0.1]);
        let found = grid
            .closest_value_with(&q, |q, v| {
                let d = v.distance(q);
                if v.coords()[0] < 0.2 { d + 1.0 } else { d }
            })
            .unwrap();
        assert_eq!(found.value(), &Point::new([0.3, 0.1]));
    }

    #[test]
    fn test_k_closest_sorted_and_truncated() {
        let mut grid: HashMultiGrid<f64, 3> = GridIndex::new(unit_geometry(10));
        grid.insert_all(sample_points());
        let q = Point::new([0.05, 0.15, 0.25]);

        let three = grid.k_closest_values(&q, 3);
        assert_eq!(three.len(), 3);
        assert!(three.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert_relative_eq!(three[0].distance, 0.0);
        assert_relative_eq!(three[1].distance, 0.0);

        assert_eq!(grid.k_closest_values(&q, 50).len(), 5);
        assert!(grid.k_closest_values(&q, 0).is_empty());
    }

    #[test]
    fn test_sphere_query_and_erase_in_sphere() {
        let mut grid: HashTableGrid<f64, 3> = GridIndex::new(unit_geometry(10));
        grid.insert_all(sample_points());
        let ball = Sphere::new(Point::new([0.05, 0.15, 0.25]), 0.2);
        assert_eq!(grid.count_in_sphere(&ball), 3);
        assert!(grid.values_in_sphere(&ball).all(|e| e.value().distance(ball.center()) <= 0.2));

        assert_eq!(grid.erase_in_sphere(&ball), 3);
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.count_in_sphere(&ball), 0);
    }

    #[test]
    fn test_erase_in_sphere_counts_every_copy() {
        let mut grid: HashMultiGrid<f64, 2> = GridIndex::new(
            CellGeometry::try_new(Aabb::new(Point::new([0.0; 2]), Point::new([1.0; 2])), [4, 4])
                .unwrap(),
        );
        grid.insert_all([
            Point::new([0.1, 0.1]),
            Point::new([0.1, 0.1]),
            Point::new([0.9, 0.9]),
        ]);
        let ball = Sphere::new(Point::new([0.1, 0.1]), 0.05);
        assert_eq!(grid.count_in_sphere(&ball), 2);
        assert_eq!(grid.erase_in_sphere(&ball), 2);
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.erase_in_sphere(&ball), 0);
    }

    #[test]
    fn test_erase_and_erase_all_in_cell() {
        let mut grid: HashTableGrid<f64, 3> = GridIndex::new(unit_geometry(10));
        grid.insert_all(sample_points());
        assert!(grid.erase(&Point::new([0.02, 0.12, 0.29])));
        assert!(!grid.erase(&Point::new([0.02, 0.12, 0.29])));
        assert_eq!(grid.erase_all_in_cell(&[0, 1, 2]), 1);
        assert!(grid.cell_empty(&[0, 1, 2]));
        grid.compact();
        assert_eq!(grid.len(), 2);
        grid.clear();
        assert!(grid.is_empty());
    }

    #[test]
    fn test_extended_values_span_cells_and_are_reported_once() {
        let mut grid: HashTableGrid<f64, 2, Aabb<f64, 2>> = GridIndex::new(
            CellGeometry::try_new(Aabb::new(Point::new([0.0; 2]), Point::new([1.0; 2])), [4, 4])
                .unwrap(),
        );
        let wide = Aabb::new(Point::new([0.1, 0.1]), Point::new([0.6, 0.3]));
        assert!(grid.insert(wide));
        assert_eq!(grid.len(), 3 * 2);
        assert_eq!(grid.non_empty_cells().len(), 6);

        let ball = Sphere::new(Point::new([0.35, 0.2]), 0.5);
        assert_eq!(grid.count_in_sphere(&ball), 1);

        let near = grid.k_closest_values(&Point::new([0.9, 0.9]), 3);
        assert_eq!(near.len(), 1);
        assert_relative_eq!(near[0].distance, 0.3f64.hypot(0.6), epsilon = 1e-12);

        assert!(grid.erase(&wide));
        assert!(grid.is_empty());
    }

    #[test]
    fn test_static_grid_keeps_identical_extended_values() {
        let geometry =
            CellGeometry::try_new(Aabb::new(Point::new([0.0; 2]), Point::new([1.0; 2])), [4, 4])
                .unwrap();
        let wide = Aabb::new(Point::new([0.1, 0.1]), Point::new([0.6, 0.3]));
        let other = Aabb::new(Point::new([0.8, 0.8]), Point::new([0.9, 0.9]));

        let mut grid: StaticGrid<f64, 2, Aabb<f64, 2>> = GridIndex::new(geometry.clone());
        grid.insert_all([wide, other, wide]);
        grid.build();
        assert_eq!(grid.len(), 2 * 6 + 1);

        let ball = Sphere::new(Point::new([0.35, 0.2]), 0.5);
        assert_eq!(grid.count_in_sphere(&ball), 2);

        let q = Point::new([0.0, 0.0]);
        let near = grid.k_closest_values(&q, 2);
        assert_eq!(near.len(), 2);
        assert!(near.iter().all(|n| *n.value() == wide));
        let all = grid.k_closest_values(&q, 10);
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].value(), &other);

        // The set backend stores the box once.
        let mut set: HashTableGrid<f64, 2, Aabb<f64, 2>> = GridIndex::new(geometry);
        set.insert_all([wide, other, wide]);
        assert_eq!(set.count_in_sphere(&ball), 1);
        assert_eq!(set.k_closest_values(&q, 10).len(), 2);
    }

    #[test]
    fn test_closest_to_extended_query() {
        let geometry =
            CellGeometry::try_new(Aabb::new(Point::new([0.0; 2]), Point::new([1.0; 2])), [4, 4])
                .unwrap();
        let a = Aabb::new(Point::new([0.05, 0.05]), Point::new([0.15, 0.15]));
        let b = Aabb::new(Point::new([0.7, 0.7]), Point::new([0.9, 0.8]));
        let mut faces: HashTableGrid<f64, 2, Aabb<f64, 2>> = GridIndex::new(geometry.clone());
        faces.insert_all([a, b]);

        let query = Aabb::new(Point::new([0.6, 0.1]), Point::new([0.95, 0.3]));
        let found = faces.closest_value(&query).unwrap();
        assert_eq!(found.value(), &b);
        assert_relative_eq!(found.distance, 0.4, epsilon = 1e-12);

        let ranked = faces.k_closest_values(&query, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[1].value(), &a);
        assert_relative_eq!(ranked[1].distance, 0.45, epsilon = 1e-12);
        assert!(faces.closest_value_within(&query, 0.3).is_none());

        // Points against a box query: values inside the box are at distance 0.
        let mut points: StaticGrid<f64, 2> = GridIndex::new(geometry);
        points.insert_all([Point::new([0.05, 0.95]), Point::new([0.7, 0.2])]);
        points.build();
        let hit = points.closest_value(&query).unwrap();
        assert_eq!(hit.value(), &Point::new([0.7, 0.2]));
        assert_relative_eq!(hit.distance, 0.0);
    }

    #[test]
    fn test_intersects_fn_filters_cells() {
        let mut grid: HashTableGrid<f64, 2, Sphere<f64, 2>> = GridIndex::new(
            CellGeometry::try_new(Aabb::new(Point::new([0.0; 2]), Point::new([1.0; 2])), [4, 4])
                .unwrap(),
        )
        .with_intersects(|cell_box, s: &Sphere<f64, 2>| s.intersects_box(cell_box));
        // The bounding box covers 4x4 cells; the disc misses the four corners.
        assert!(grid.insert(Sphere::new(Point::new([0.5, 0.5]), 0.3)));
        assert_eq!(grid.len(), 12);
        assert!(grid.cell_empty(&[0, 0]));
    }

    #[test]
    fn test_keyed_values_erase_by_identity() {
        let mut grid: HashTableGrid<f64, 2, Keyed<u32, Point<f64, 2>>> = GridIndex::new(
            CellGeometry::try_new(Aabb::new(Point::new([0.0; 2]), Point::new([1.0; 2])), [2, 2])
                .unwrap(),
        );
        assert!(grid.insert(Keyed::new(1, Point::new([0.1, 0.1]))));
        assert!(!grid.insert(Keyed::new(1, Point::new([0.2, 0.2]))), "same key, same cell");
        assert!(grid.insert(Keyed::new(2, Point::new([0.1, 0.1]))));
        let nearest = grid.closest_value(&Point::new([0.9, 0.9])).unwrap();
        assert_eq!(nearest.value().key, 1);
        assert!(grid.erase(&Keyed::new(1, Point::new([0.1, 0.1]))));
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_try_from_values() {
        let grid: HashTableGrid<f64, 3> =
            GridIndex::try_from_values(sample_points(), &GridSizingOptions::default()).unwrap();
        assert_eq!(grid.len(), 4);
        assert!(grid.geometry().total_cells() >= 1);

        let empty: Result<StaticGrid<f64, 3>, _> =
            GridIndex::try_from_values(Vec::new(), &GridSizingOptions::default());
        assert!(matches!(empty, Err(GridError::EmptyInput)));

        let bad: Result<StaticGrid<f64, 2>, _> = GridIndex::try_from_values(
            [Point::new([0.0, 0.0]), Point::new([f64::INFINITY, 1.0])],
            &GridSizingOptions::default(),
        );
        assert!(matches!(bad, Err(GridError::InvalidCoordinate(_))));
    }

    #[test]
    fn test_empty_grid_queries() {
        let grid: HashTableGrid<f64, 3> = GridIndex::new(unit_geometry(4));
        let q = Point::new([0.5; 3]);
        assert!(grid.closest_value(&q).is_none());
        assert!(grid.k_closest_values(&q, 3).is_empty());
        assert_eq!(grid.count_in_sphere(&Sphere::new(q, 10.0)), 0);
        assert!(grid.non_empty_cells().is_empty());
    }
}
