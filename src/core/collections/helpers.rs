use super::{FastBuildHasher, FastHashMap, FastHashSet};

/// Creates a `FastHashMap` with pre-allocated capacity.
///
/// # Examples
///
/// ```rust
/// use cellgrid::core::collections::fast_hash_map_with_capacity;
///
/// let map = fast_hash_map_with_capacity::<usize, usize>(1000);
/// assert!(map.capacity() >= 1000);
/// ```
#[inline]
#[must_use]
pub fn fast_hash_map_with_capacity<K, V>(capacity: usize) -> FastHashMap<K, V> {
    FastHashMap::with_capacity_and_hasher(capacity, FastBuildHasher::default())
}

/// Creates a `FastHashSet` with pre-allocated capacity.
///
/// # Examples
///
/// ```rust
/// use cellgrid::core::collections::fast_hash_set_with_capacity;
///
/// let set = fast_hash_set_with_capacity::<usize>(500);
/// assert!(set.capacity() >= 500);
/// ```
#[inline]
#[must_use]
pub fn fast_hash_set_with_capacity<T>(capacity: usize) -> FastHashSet<T> {
    FastHashSet::with_capacity_and_hasher(capacity, FastBuildHasher::default())
}
