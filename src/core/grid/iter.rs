//! Iterators and result types of grid queries.
//!
//! The backends only store flat cell indices. A [`GridEntry`] pairs a value
//! with its flat index and a reference to the grid geometry; its cell
//! coordinates are recomputed on demand by [`GridEntry::cell`]. Entries are
//! small `Copy` values and iterators return them by value.

use super::cell_enumerator::{CellCoord, CellEnumerator};
use super::cell_geometry::CellGeometry;
use super::storage::BucketStorage;
use super::value::SpatialValue;
use crate::core::collections::{QUERY_SCRATCH_CAPACITY, SmallBuffer};
use crate::geometry::sphere::Sphere;
use crate::geometry::traits::coordinate::CoordinateScalar;
use std::fmt;
use std::iter::FusedIterator;

// =============================================================================
// ENTRIES
// =============================================================================

/// A stored value together with the cell it is stored in.
pub struct GridEntry<'a, T, V, const D: usize>
where
    T: CoordinateScalar,
{
    geometry: &'a CellGeometry<T, D>,
    cell_index: usize,
    value: &'a V,
}

impl<'a, T, V, const D: usize> GridEntry<'a, T, V, D>
where
    T: CoordinateScalar,
{
    pub(crate) const fn new(
        geometry: &'a CellGeometry<T, D>,
        cell_index: usize,
        value: &'a V,
    ) -> Self {
        Self {
            geometry,
            cell_index,
            value,
        }
    }

    /// Cell coordinates, recomputed from the flat index.
    #[must_use]
    pub fn cell(&self) -> CellCoord<D> {
        self.geometry.cell_of_index(self.cell_index)
    }

    /// Flat index of the cell.
    #[must_use]
    pub const fn cell_index(&self) -> usize {
        self.cell_index
    }

    /// The stored value.
    #[must_use]
    pub const fn value(&self) -> &'a V {
        self.value
    }
}

impl<T, V, const D: usize> Clone for GridEntry<'_, T, V, D>
where
    T: CoordinateScalar,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, V, const D: usize> Copy for GridEntry<'_, T, V, D> where T: CoordinateScalar {}

impl<T, V, const D: usize> fmt::Debug for GridEntry<'_, T, V, D>
where
    T: CoordinateScalar,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridEntry")
            .field("cell", &self.cell())
            .field("value", self.value)
            .finish()
    }
}

/// A nearest-neighbour result.
pub struct Neighbor<'a, T, V, const D: usize>
where
    T: CoordinateScalar,
{
    /// The matching entry.
    pub entry: GridEntry<'a, T, V, D>,
    /// Distance from the query point to the value.
    pub distance: T,
}

impl<'a, T, V, const D: usize> Neighbor<'a, T, V, D>
where
    T: CoordinateScalar,
{
    /// The matching value.
    #[must_use]
    pub const fn value(&self) -> &'a V {
        self.entry.value()
    }
}

impl<T, V, const D: usize> Clone for Neighbor<'_, T, V, D>
where
    T: CoordinateScalar,
{
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, V, const D: usize> Copy for Neighbor<'_, T, V, D> where T: CoordinateScalar {}

impl<T, V, const D: usize> fmt::Debug for Neighbor<'_, T, V, D>
where
    T: CoordinateScalar,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Neighbor")
            .field("entry", &self.entry)
            .field("distance", &self.distance)
            .finish()
    }
}

// =============================================================================
// ENTRY ITERATORS
// =============================================================================

/// Tags every value of a single cell with that cell's flat index.
#[derive(Clone, Debug)]
pub struct InCell<I> {
    cell: usize,
    inner: I,
}

impl<I> InCell<I> {
    pub(crate) const fn new(cell: usize, inner: I) -> Self {
        Self { cell, inner }
    }
}

impl<'a, V: 'a, I> Iterator for InCell<I>
where
    I: Iterator<Item = &'a V>,
{
    type Item = (usize, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|v| (self.cell, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

/// Lazily turns `(flat index, value)` pairs into [`GridEntry`] values.
pub struct GridIter<'a, T, const D: usize, I>
where
    T: CoordinateScalar,
{
    geometry: &'a CellGeometry<T, D>,
    inner: I,
}

impl<'a, T, const D: usize, I> GridIter<'a, T, D, I>
where
    T: CoordinateScalar,
{
    pub(crate) const fn new(geometry: &'a CellGeometry<T, D>, inner: I) -> Self {
        Self { geometry, inner }
    }
}

impl<'a, T, V: 'a, const D: usize, I> Iterator for GridIter<'a, T, D, I>
where
    T: CoordinateScalar,
    I: Iterator<Item = (usize, &'a V)>,
{
    type Item = GridEntry<'a, T, V, D>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(cell, value)| GridEntry::new(self.geometry, cell, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, T, V: 'a, const D: usize, I> ExactSizeIterator for GridIter<'a, T, D, I>
where
    T: CoordinateScalar,
    I: ExactSizeIterator<Item = (usize, &'a V)>,
{
}

impl<'a, T, V: 'a, const D: usize, I> FusedIterator for GridIter<'a, T, D, I>
where
    T: CoordinateScalar,
    I: FusedIterator<Item = (usize, &'a V)>,
{
}

// =============================================================================
// SPHERE QUERY
// =============================================================================

/// Lazy result of a sphere query: every value touching the sphere, once.
///
/// Cells only bound the candidates; each value is tested exactly with
/// [`SpatialValue::intersects_sphere`]. Extended values stored in several
/// cells are reported from the first cell they are met in, once per stored
/// copy.
pub struct SphereQuery<'a, T, V, S, const D: usize>
where
    T: CoordinateScalar,
    S: BucketStorage<V> + 'a,
    V: 'a,
{
    geometry: &'a CellGeometry<T, D>,
    storage: &'a S,
    sphere: Sphere<T, D>,
    cells: CellEnumerator<D>,
    current: Option<(usize, S::CellValues<'a>)>,
    reported: SmallBuffer<(&'a V, usize), QUERY_SCRATCH_CAPACITY>,
}

impl<'a, T, V, S, const D: usize> SphereQuery<'a, T, V, S, D>
where
    T: CoordinateScalar,
    S: BucketStorage<V> + 'a,
    V: 'a,
{
    pub(crate) fn new(
        geometry: &'a CellGeometry<T, D>,
        storage: &'a S,
        sphere: Sphere<T, D>,
    ) -> Self {
        let cells = geometry
            .cells_overlapping_sphere(&sphere)
            .map_or_else(CellEnumerator::empty, |(first, last)| {
                geometry.cells_between(first, last)
            });
        Self {
            geometry,
            storage,
            sphere,
            cells,
            current: None,
            reported: SmallBuffer::new(),
        }
    }
}

impl<'a, T, V, S, const D: usize> Iterator for SphereQuery<'a, T, V, S, D>
where
    T: CoordinateScalar,
    S: BucketStorage<V> + 'a,
    V: SpatialValue<T, D> + PartialEq + 'a,
{
    type Item = GridEntry<'a, T, V, D>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((cell, values)) = &mut self.current {
                for value in values.by_ref() {
                    if !value.intersects_sphere(&self.sphere) {
                        continue;
                    }
                    // Copies of an extended value share their cells: an equal
                    // value first met in another cell is this one again.
                    if value.anchor().is_none() {
                        match self.reported.iter().find(|(r, _)| *r == value) {
                            Some(&(_, first_cell)) if first_cell != *cell => continue,
                            Some(_) => {}
                            None => self.reported.push((value, *cell)),
                        }
                    }
                    return Some(GridEntry::new(self.geometry, *cell, value));
                }
            }
            let cell = self.geometry.index_of_cell(&self.cells.next()?);
            self.current = Some((cell, self.storage.values_in_cell(cell)));
        }
    }
}
