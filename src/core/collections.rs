//! High-performance collection types used by the grid backends.
//!
//! The hash backend keys its buckets with [`FastHashMap`] and keeps each
//! bucket in a [`SmallBuffer`], so the common case of a handful of values per
//! cell never touches the heap beyond the map itself.

mod aliases;
mod helpers;

pub use aliases::*;
pub use helpers::*;
