//! Storage capabilities that the grid query engine is generic over.
//!
//! [`GridIndex`](super::index::GridIndex) implements every algorithm once on top
//! of [`BucketStorage`]. Removal is a separate capability,
//! [`ErasableStorage`]: the erase family of grid methods exists only for
//! backends that implement it, so calling `erase` on a grid backed by
//! [`StaticBucketStore`](super::static_store::StaticBucketStore) is a compile
//! error rather than a silent no-op.

/// A map from flat cell indices to the values stored in each cell.
pub trait BucketStorage<V>: Default {
    /// Iterator over the values of one cell.
    type CellValues<'a>: Iterator<Item = &'a V>
    where
        Self: 'a,
        V: 'a;

    /// Iterator over every `(flat cell index, value)` pair.
    type Entries<'a>: Iterator<Item = (usize, &'a V)>
    where
        Self: 'a,
        V: 'a;

    /// Stores `value` in `cell`.
    ///
    /// Returns `false` if the backend rejected the value (a duplicate in a
    /// set-semantics backend).
    fn insert_in_cell(&mut self, cell: usize, value: V) -> bool;

    /// Values stored in `cell`.
    fn values_in_cell(&self, cell: usize) -> Self::CellValues<'_>;

    /// Number of values stored in `cell`.
    fn count_in_cell(&self, cell: usize) -> usize;

    /// Whether `cell` holds no value.
    fn cell_empty(&self, cell: usize) -> bool {
        self.count_in_cell(cell) == 0
    }

    /// Every stored `(cell, value)` pair.
    fn entries(&self) -> Self::Entries<'_>;

    /// Flat indices of the cells holding at least one value, each once.
    fn occupied_cells(&self) -> Vec<usize>;

    /// Number of stored `(cell, value)` pairs.
    fn len(&self) -> usize;

    /// Whether nothing is stored.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every value.
    fn clear(&mut self);

    /// Makes every inserted value visible to queries on a lattice of
    /// `total_cells` cells.
    ///
    /// Backends that are query-ready after each insertion do nothing.
    fn build(&mut self, total_cells: usize) {
        let _ = total_cells;
    }
}

/// Backends that support removing values.
pub trait ErasableStorage<V>: BucketStorage<V> {
    /// Removes `value` from `cell`. Returns `false` if it was not there.
    fn erase_in_cell(&mut self, cell: usize, value: &V) -> bool;

    /// Removes every value of `cell` and returns how many there were.
    fn erase_all_in_cell(&mut self, cell: usize) -> usize;

    /// Releases the space held by erased values.
    fn compact(&mut self);
}
