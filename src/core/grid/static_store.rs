//! Bulk-built, read-only bucket storage.
//!
//! Values are appended to a flat buffer of `(cell, value)` entries. [`build`]
//! sorts the buffer by cell (stably, so values of one cell keep their
//! insertion order) and computes an offset table with one slot per cell plus
//! a sentinel:
//!
//! ```text
//! entries  [(0,a) (0,b) (3,c) (4,d) (4,e)]
//! offsets  [0 2 2 2 3 5]          cells = 5, offsets[5] == len
//! ```
//!
//! The values of cell `c` are `entries[offsets[c]..offsets[c + 1]]`, so an
//! empty cell is an empty range and the table is non-decreasing.
//!
//! The store has three states: empty, building (values inserted since the
//! last build are pending and invisible to queries) and built. Re-building
//! recomputes everything from scratch. There is no erase.
//!
//! [`build`]: BucketStorage::build

use super::storage::BucketStorage;
use std::iter::FusedIterator;
use std::slice;

/// Sorted `(cell, value)` buffer with a per-cell offset table.
///
/// Duplicate values are kept.
#[derive(Clone, Debug)]
pub struct StaticBucketStore<V> {
    entries: Vec<(usize, V)>,
    /// `offsets[c]..offsets[c + 1]` is the entry range of cell `c`.
    offsets: Vec<usize>,
    /// Length of the sorted, indexed prefix of `entries`.
    built_len: usize,
}

impl<V> Default for StaticBucketStore<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            offsets: Vec::new(),
            built_len: 0,
        }
    }
}

impl<V> StaticBucketStore<V> {
    /// Whether every inserted value is visible to queries.
    #[must_use]
    pub fn is_built(&self) -> bool {
        !self.offsets.is_empty() && self.built_len == self.entries.len()
    }

    /// Number of values inserted since the last build.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.entries.len() - self.built_len
    }

    /// Reserves room for `additional` more entries.
    pub fn reserve(&mut self, additional: usize) {
        self.entries.reserve(additional);
    }

    /// Offset table of the last build (`cells + 1` slots), empty before the first build.
    #[must_use]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    fn cell_range(&self, cell: usize) -> &[(usize, V)] {
        match (self.offsets.get(cell), self.offsets.get(cell + 1)) {
            (Some(&start), Some(&end)) => &self.entries[start..end],
            _ => &[],
        }
    }
}

impl<V> BucketStorage<V> for StaticBucketStore<V> {
    type CellValues<'a>
        = StaticCellValues<'a, V>
    where
        V: 'a;

    type Entries<'a>
        = StaticEntries<'a, V>
    where
        V: 'a;

    fn insert_in_cell(&mut self, cell: usize, value: V) -> bool {
        self.entries.push((cell, value));
        true
    }

    fn values_in_cell(&self, cell: usize) -> Self::CellValues<'_> {
        StaticCellValues {
            inner: self.cell_range(cell).iter(),
        }
    }

    fn count_in_cell(&self, cell: usize) -> usize {
        self.cell_range(cell).len()
    }

    fn entries(&self) -> Self::Entries<'_> {
        StaticEntries {
            inner: self.entries[..self.built_len].iter(),
        }
    }

    fn occupied_cells(&self) -> Vec<usize> {
        let mut cells: Vec<usize> = Vec::new();
        for &(cell, _) in &self.entries[..self.built_len] {
            if cells.last() != Some(&cell) {
                cells.push(cell);
            }
        }
        cells
    }

    fn len(&self) -> usize {
        self.built_len
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.offsets.clear();
        self.built_len = 0;
    }

    fn build(&mut self, total_cells: usize) {
        self.entries.sort_by_key(|&(cell, _)| cell);

        self.offsets.clear();
        self.offsets.resize(total_cells + 1, 0);
        for &(cell, _) in &self.entries {
            debug_assert!(cell < total_cells, "cell index {cell} out of range");
            if let Some(count) = self.offsets.get_mut(cell + 1) {
                *count += 1;
            }
        }
        for c in 0..total_cells {
            self.offsets[c + 1] += self.offsets[c];
        }
        self.built_len = self.entries.len();

        tracing::debug!(
            entries = self.built_len,
            cells = total_cells,
            "built static bucket store"
        );
    }
}

/// Values of one cell of a [`StaticBucketStore`].
#[derive(Clone, Debug)]
pub struct StaticCellValues<'a, V> {
    inner: slice::Iter<'a, (usize, V)>,
}

impl<'a, V> Iterator for StaticCellValues<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> ExactSizeIterator for StaticCellValues<'_, V> {}

impl<V> FusedIterator for StaticCellValues<'_, V> {}

/// All built entries of a [`StaticBucketStore`], in cell order.
#[derive(Clone, Debug)]
pub struct StaticEntries<'a, V> {
    inner: slice::Iter<'a, (usize, V)>,
}

impl<'a, V> Iterator for StaticEntries<'a, V> {
    type Item = (usize, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(c, v)| (*c, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> ExactSizeIterator for StaticEntries<'_, V> {}

impl<V> FusedIterator for StaticEntries<'_, V> {}
