//! # cellgrid
//!
//! A uniform spatial grid index over d-dimensional points and extended
//! objects. The indexed box is partitioned into a regular lattice of cells;
//! every value is bucketed into the cells it touches, and proximity queries
//! only visit the cells that can matter.
//!
//! # Features
//!
//! - Generic dimension `D` and floating-point scalar (`f32`, `f64`, or any
//!   type implementing [`CoordinateScalar`](geometry::traits::coordinate::CoordinateScalar))
//! - Point-like values (one cell) and extended values such as boxes and
//!   spheres (every overlapped cell, optionally filtered by a custom test)
//! - Two storage backends behind one query engine: a bulk-built static store
//!   and a mutable hash store with erase support
//! - Nearest value, k nearest values, per-cell and sphere queries
//! - Automatic grid sizing from the data, configurable through
//!   [`GridSizingOptions`](core::grid::sizing::GridSizingOptions)
//! - Serialization of geometry types with [serde](https://serde.rs)
//!
//! # Basic Usage
//!
//! ```rust
//! use cellgrid::prelude::*;
//!
//! // A 10 x 10 x 10 grid over the unit cube.
//! let geometry: CellGeometry<f64, 3> =
//!     CellGeometry::try_new(Aabb::new(Point::new([0.0; 3]), Point::new([1.0; 3])), [10; 3])
//!         .unwrap();
//!
//! let mut grid: HashTableGrid<f64, 3> = GridIndex::new(geometry);
//! grid.insert(Point::new([0.05, 0.15, 0.25]));
//! grid.insert(Point::new([0.05, 0.15, 0.25])); // rejected: already in the cell
//! grid.insert(Point::new([0.24, 0.52, 0.29]));
//! assert_eq!(grid.len(), 2);
//!
//! let nearest = grid.closest_value(&Point::new([0.9, 0.9, 0.9])).unwrap();
//! assert_eq!(nearest.value(), &Point::new([0.24, 0.52, 0.29]));
//! assert_eq!(nearest.entry.cell(), [2, 5, 2]);
//!
//! assert!(grid.erase(&Point::new([0.05, 0.15, 0.25])));
//! assert_eq!(grid.len(), 1);
//! ```
//!
//! # Static grids
//!
//! A [`StaticGrid`](core::grid::index::StaticGrid) collects values and sorts
//! them by cell in one pass. Values inserted after the last
//! [`build`](core::grid::index::GridIndex::build) are invisible to queries
//! until the next one. Static grids have no erase methods at all:
//!
//! ```compile_fail
//! use cellgrid::prelude::*;
//!
//! let mut grid: StaticGrid<f64, 2> =
//!     GridIndex::try_from_values([Point::new([0.0, 0.0])], &GridSizingOptions::default())
//!         .unwrap();
//! grid.erase(&Point::new([0.0, 0.0]));
//! ```
//!
//! # Indexing external elements
//!
//! The grid stores values by value. To index the elements of another
//! collection, store a [`Keyed`](core::grid::value::Keyed) pair of a stable
//! key and the element's geometry; keys compare equal regardless of the
//! geometry, so erasing by key works while the geometry snapshot locates the
//! cells.
//!
//! # Configuration
//!
//! The auto-sizing cap on the total number of cells defaults to
//! [`MAX_TOTAL_CELLS_DEFAULT`](core::grid::sizing::MAX_TOTAL_CELLS_DEFAULT)
//! and can be overridden with the `CELLGRID_MAX_TOTAL_CELLS` environment
//! variable.
//!
//! # Logging
//!
//! The crate emits [`tracing`] events: `debug` for grid construction and
//! static builds, `warn` when the cell cap shrinks a grid, `trace` for the
//! ring expansion of proximity queries. Install any `tracing` subscriber to
//! see them.

#![forbid(unsafe_code)]

#[macro_use]
extern crate derive_builder;

/// The grid itself: cell layout, storage backends and the query engine.
pub mod core {
    /// Collection aliases shared by the storage backends.
    pub mod collections;
    /// Uniform grid index.
    pub mod grid {
        pub mod cell_enumerator;
        pub mod cell_geometry;
        pub mod hash_store;
        pub mod index;
        pub mod iter;
        pub mod sizing;
        pub mod static_store;
        pub mod storage;
        pub mod value;

        pub use cell_enumerator::*;
        pub use cell_geometry::*;
        pub use hash_store::HashBucketStore;
        pub use index::*;
        pub use iter::*;
        pub use sizing::*;
        pub use static_store::StaticBucketStore;
        pub use storage::*;
        pub use value::*;
    }
    pub use grid::*;
}

/// Geometric types: points, boxes and spheres.
///
/// The geometry module provides a coordinate abstraction through the `Coordinate` trait.
/// The `Point` type implements it, providing generic floating-point coordinate support
/// (for `f32`, `f64`, and other types implementing `CoordinateScalar`) with proper NaN
/// handling, validation, and hashing.
pub mod geometry {
    pub mod aabb;
    pub mod point;
    pub mod sphere;
    /// Norms, scalar conversions and random point generation.
    pub mod util;
    /// Traits module containing coordinate abstractions.
    ///
    /// This module contains the core `Coordinate` trait that abstracts coordinate
    /// operations, along with supporting traits for validation (`FiniteCheck`),
    /// equality comparison (`OrderedEq`), and hashing (`HashCoordinate`) of
    /// floating-point coordinate values.
    pub mod traits {
        pub mod coordinate;
        pub use coordinate::*;
    }
    pub use aabb::*;
    pub use point::*;
    pub use sphere::*;
    pub use traits::*;
    pub use util::*;
}

/// A prelude module that re-exports commonly used types.
/// This makes it easier to import the most commonly used items from the crate.
pub mod prelude {
    pub use crate::core::grid::{
        cell_enumerator::*,
        cell_geometry::*,
        hash_store::HashBucketStore,
        index::*,
        iter::*,
        sizing::{GridSizingOptions, GridSizingOptionsBuilder},
        static_store::StaticBucketStore,
        storage::*,
        value::*,
    };

    pub use crate::core::collections::{FastHashMap, FastHashSet, SmallBuffer};

    pub use crate::geometry::{
        aabb::*, point::*, sphere::*, traits::coordinate::*, util::generate_random_points_seeded,
    };
}

/// The function `is_normal` checks that structs implement `auto` traits.
/// Traits are checked at compile time, so this function is only used for
/// testing.
#[must_use]
pub const fn is_normal<T: Sized + Send + Sync + Unpin>() -> bool {
    true
}

// =============================================================================
// TESTS
// =============================================================================
