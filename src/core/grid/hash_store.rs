//! Incrementally mutable bucket storage.
//!
//! Each occupied cell owns a [`CellBucket`] of values and a parallel buffer
//! of liveness marks. Erasing a value clears its mark instead of shifting
//! the bucket; a bucket is compacted once its dead slots outnumber its live
//! ones, and dropped from the map when nothing live is left. Only occupied
//! cells consume memory, and [`occupied_cells`](BucketStorage::occupied_cells)
//! costs O(occupied cells).
//!
//! With the default `DUPLICATES = false` a cell behaves like a set: inserting
//! a value equal to one already live in that cell is rejected.

use super::storage::{BucketStorage, ErasableStorage};
use crate::core::collections::{
    BUCKET_INLINE_CAPACITY, CellBucket, FastHashMap, SmallBuffer, fast_hash_map_with_capacity,
};
use std::collections::hash_map;
use std::iter::FusedIterator;

#[derive(Clone, Debug)]
struct Bucket<V> {
    values: CellBucket<V>,
    live: SmallBuffer<bool, BUCKET_INLINE_CAPACITY>,
    live_count: usize,
}

impl<V> Bucket<V> {
    fn new() -> Self {
        Self {
            values: CellBucket::new(),
            live: SmallBuffer::new(),
            live_count: 0,
        }
    }

    fn push(&mut self, value: V) {
        self.values.push(value);
        self.live.push(true);
        self.live_count += 1;
    }

    fn dead_count(&self) -> usize {
        self.values.len() - self.live_count
    }

    fn live_values(&self) -> LiveValues<'_, V> {
        LiveValues {
            values: &self.values,
            live: &self.live,
            pos: 0,
            remaining: self.live_count,
        }
    }

    fn compact(&mut self) {
        if self.dead_count() == 0 {
            return;
        }
        let mut marks = self.live.iter();
        self.values.retain(|_| marks.next().copied().unwrap_or(false));
        self.live.clear();
        self.live.resize(self.values.len(), true);
    }

    fn compact_if_sparse(&mut self) {
        if self.dead_count() > self.live_count {
            self.compact();
        }
    }
}

/// Hashed buckets keyed by flat cell index.
///
/// # Examples
///
/// ```rust
/// use cellgrid::core::grid::hash_store::HashBucketStore;
/// use cellgrid::core::grid::storage::{BucketStorage, ErasableStorage};
///
/// let mut store: HashBucketStore<u32> = HashBucketStore::default();
/// assert!(store.insert_in_cell(3, 10));
/// assert!(!store.insert_in_cell(3, 10), "duplicates are rejected");
/// assert!(store.erase_in_cell(3, &10));
/// assert!(store.cell_empty(3));
///
/// let mut multi: HashBucketStore<u32, true> = HashBucketStore::default();
/// assert!(multi.insert_in_cell(3, 10));
/// assert!(multi.insert_in_cell(3, 10));
/// assert_eq!(multi.count_in_cell(3), 2);
/// ```
#[derive(Clone, Debug)]
pub struct HashBucketStore<V, const DUPLICATES: bool = false> {
    buckets: FastHashMap<usize, Bucket<V>>,
    len: usize,
}

impl<V, const DUPLICATES: bool> Default for HashBucketStore<V, DUPLICATES> {
    fn default() -> Self {
        Self {
            buckets: FastHashMap::default(),
            len: 0,
        }
    }
}

impl<V, const DUPLICATES: bool> HashBucketStore<V, DUPLICATES> {
    /// Creates a store with room for `cells` occupied cells.
    #[must_use]
    pub fn with_capacity(cells: usize) -> Self {
        Self {
            buckets: fast_hash_map_with_capacity(cells),
            len: 0,
        }
    }

    /// Whether equal values may be stored more than once in a cell.
    #[must_use]
    pub const fn allows_duplicates(&self) -> bool {
        DUPLICATES
    }

    /// Number of erased values still occupying bucket slots.
    #[must_use]
    pub fn dead_slots(&self) -> usize {
        self.buckets.values().map(Bucket::dead_count).sum()
    }
}

impl<V, const DUPLICATES: bool> BucketStorage<V> for HashBucketStore<V, DUPLICATES>
where
    V: PartialEq,
{
    type CellValues<'a>
        = LiveValues<'a, V>
    where
        V: 'a;

    type Entries<'a>
        = HashEntries<'a, V>
    where
        V: 'a;

    fn insert_in_cell(&mut self, cell: usize, value: V) -> bool {
        let bucket = self.buckets.entry(cell).or_insert_with(Bucket::new);
        if !DUPLICATES && bucket.live_values().any(|v| *v == value) {
            return false;
        }
        bucket.push(value);
        self.len += 1;
        true
    }

    fn values_in_cell(&self, cell: usize) -> Self::CellValues<'_> {
        self.buckets
            .get(&cell)
            .map_or_else(LiveValues::empty, Bucket::live_values)
    }

    fn count_in_cell(&self, cell: usize) -> usize {
        self.buckets.get(&cell).map_or(0, |b| b.live_count)
    }

    fn entries(&self) -> Self::Entries<'_> {
        HashEntries {
            buckets: self.buckets.iter(),
            current: None,
            remaining: self.len,
        }
    }

    fn occupied_cells(&self) -> Vec<usize> {
        self.buckets.keys().copied().collect()
    }

    fn len(&self) -> usize {
        self.len
    }

    fn clear(&mut self) {
        self.buckets.clear();
        self.len = 0;
    }
}

impl<V, const DUPLICATES: bool> ErasableStorage<V> for HashBucketStore<V, DUPLICATES>
where
    V: PartialEq,
{
    /// With `DUPLICATES = true`, removes every live copy equal to `value`.
    fn erase_in_cell(&mut self, cell: usize, value: &V) -> bool {
        let hash_map::Entry::Occupied(mut slot) = self.buckets.entry(cell) else {
            return false;
        };
        let bucket = slot.get_mut();
        let mut removed = 0;
        for (v, live) in bucket.values.iter().zip(bucket.live.iter_mut()) {
            if *live && v == value {
                *live = false;
                removed += 1;
                if !DUPLICATES {
                    break;
                }
            }
        }
        bucket.live_count -= removed;
        self.len -= removed;
        if bucket.live_count == 0 {
            slot.remove();
        } else {
            bucket.compact_if_sparse();
        }
        removed > 0
    }

    fn erase_all_in_cell(&mut self, cell: usize) -> usize {
        let removed = self.buckets.remove(&cell).map_or(0, |b| b.live_count);
        self.len -= removed;
        removed
    }

    fn compact(&mut self) {
        for bucket in self.buckets.values_mut() {
            bucket.compact();
        }
    }
}

// =============================================================================
// ITERATORS
// =============================================================================

/// Live values of one bucket of a [`HashBucketStore`].
#[derive(Clone, Debug)]
pub struct LiveValues<'a, V> {
    values: &'a [V],
    live: &'a [bool],
    pos: usize,
    remaining: usize,
}

impl<V> LiveValues<'_, V> {
    const fn empty() -> Self {
        Self {
            values: &[],
            live: &[],
            pos: 0,
            remaining: 0,
        }
    }
}

impl<'a, V> Iterator for LiveValues<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.values.len() {
            let i = self.pos;
            self.pos += 1;
            if self.live[i] {
                self.remaining -= 1;
                return Some(&self.values[i]);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for LiveValues<'_, V> {}

impl<V> FusedIterator for LiveValues<'_, V> {}

/// Every live `(cell, value)` pair of a [`HashBucketStore`], in no particular order.
#[derive(Clone, Debug)]
pub struct HashEntries<'a, V> {
    buckets: hash_map::Iter<'a, usize, Bucket<V>>,
    current: Option<(usize, LiveValues<'a, V>)>,
    remaining: usize,
}

impl<'a, V> Iterator for HashEntries<'a, V> {
    type Item = (usize, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((cell, values)) = &mut self.current
                && let Some(v) = values.next()
            {
                self.remaining -= 1;
                return Some((*cell, v));
            }
            let (&cell, bucket) = self.buckets.next()?;
            self.current = Some((cell, bucket.live_values()));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for HashEntries<'_, V> {}

impl<V> FusedIterator for HashEntries<'_, V> {}
