use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet, FxHasher};
use smallvec::SmallVec;

// =============================================================================
// CORE OPTIMIZED TYPES
// =============================================================================

/// Optimized `HashMap` type for performance-critical operations.
/// Uses `FastHasher` (`rustc_hash::FxHasher`) for faster hashing in non-cryptographic contexts.
///
/// # Security Warning
///
/// ⚠️ **Not DoS-resistant**: Do not use with attacker-controlled keys.
/// Cell indices are computed by the grid itself, so this is safe for bucket maps.
///
/// # Examples
///
/// ```rust
/// use cellgrid::core::collections::FastHashMap;
///
/// let mut map: FastHashMap<usize, usize> = FastHashMap::default();
/// map.insert(123, 456);
/// ```
pub type FastHashMap<K, V> = FxHashMap<K, V>;

/// Fast non-cryptographic hasher alias for internal collections.
pub type FastHasher = FxHasher;

/// Build hasher that instantiates [`FastHasher`].
pub type FastBuildHasher = FxBuildHasher;

/// Re-export the Entry enum for `FastHashMap`.
///
/// # Examples
///
/// ```rust
/// use cellgrid::core::collections::{Entry, FastHashMap};
///
/// let mut map: FastHashMap<usize, Vec<u32>> = FastHashMap::default();
/// match map.entry(7) {
///     Entry::Occupied(mut e) => e.get_mut().push(1),
///     Entry::Vacant(e) => {
///         e.insert(vec![1]);
///     }
/// }
/// assert_eq!(map[&7], vec![1]);
/// ```
pub use std::collections::hash_map::Entry;

/// Optimized `HashSet` type for membership tests on trusted keys.
///
/// # Examples
///
/// ```rust
/// use cellgrid::core::collections::FastHashSet;
///
/// let mut set: FastHashSet<usize> = FastHashSet::default();
/// set.insert(42);
/// assert!(set.contains(&42));
/// ```
pub type FastHashSet<T> = FxHashSet<T>;

/// Small-optimized Vec that uses stack allocation for small collections.
/// Provides heap fallback for larger collections.
///
/// # Size Guidelines
///
/// - **N=8**: per-cell buckets ([`BUCKET_INLINE_CAPACITY`])
/// - **N=16**: scratch buffers in queries
///
/// # Examples
///
/// ```rust
/// use cellgrid::core::collections::SmallBuffer;
///
/// let mut buffer: SmallBuffer<i32, 8> = SmallBuffer::new();
/// for i in 0..5 {
///     buffer.push(i);
/// }
/// assert!(!buffer.spilled());
/// ```
pub type SmallBuffer<T, const N: usize> = SmallVec<[T; N]>;

// =============================================================================
// SEMANTIC SIZE CONSTANTS
// =============================================================================

/// Number of values a hash-backend bucket holds inline before spilling to the heap.
///
/// Auto-sized grids aim at about one value per cell, so 8 covers the clustered
/// cases without wasting space on the empty ones.
pub const BUCKET_INLINE_CAPACITY: usize = 8;

/// Inline capacity of the scratch buffers used while answering a single query
/// (for example, the extended values already reported by a sphere query).
pub const QUERY_SCRATCH_CAPACITY: usize = 16;

/// Values stored in one cell of the hash backend.
pub type CellBucket<V> = SmallBuffer<V, BUCKET_INLINE_CAPACITY>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_collections_basic_operations() {
        let mut map: FastHashMap<usize, usize> = FastHashMap::default();
        assert!(map.is_empty());
        map.insert(123, 456);
        assert_eq!(map.get(&123), Some(&456));

        let mut set: FastHashSet<usize> = FastHashSet::default();
        set.insert(789);
        set.insert(789);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_cell_bucket_spills_past_inline_capacity() {
        let mut bucket: CellBucket<u32> = CellBucket::new();
        for i in 0..8 {
            bucket.push(i);
        }
        assert!(!bucket.spilled());
        bucket.push(8);
        assert!(bucket.spilled());
        assert_eq!(bucket.len(), BUCKET_INLINE_CAPACITY + 1);
    }
}
