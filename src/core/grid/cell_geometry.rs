//! Mapping between space, cell coordinates and flat cell indices.
//!
//! A [`CellGeometry`] partitions an axis-aligned box into `n₀ × … × n_{D-1}`
//! equal cells. Cells are addressed either by their integer coordinates
//! ([`CellCoord`]) or by a flat index obtained by row-major flattening, where
//! the last axis varies fastest.
//!
//! Points outside the box are never rejected: every axis is clamped, so they
//! map to the nearest boundary cell.

#![forbid(unsafe_code)]

use super::cell_enumerator::{CellCoord, CellEnumerator};
use super::sizing::{GridSizingOptions, best_grid_size, saturating_cell_product};
use crate::geometry::aabb::Aabb;
use crate::geometry::point::Point;
use crate::geometry::sphere::Sphere;
use crate::geometry::traits::coordinate::{
    Coordinate, CoordinateConversionError, CoordinateScalar, CoordinateValidationError,
};
use crate::geometry::util::{hypot, index_to_scalar, safe_usize_to_scalar, scalar_to_index};
use serde::{Deserialize, Serialize};

// =============================================================================
// ERRORS
// =============================================================================

/// Errors raised by the fallible grid constructors.
///
/// Queries never fail: empty results are reported with `None`, `false` or
/// an empty iterator.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum GridError {
    /// The bounding box has zero or negative extent on an axis.
    #[error("Degenerate grid extent on axis {axis}: min {min} must be less than max {max}")]
    DegenerateExtent {
        /// Offending axis.
        axis: usize,
        /// Lower bound on that axis, as a string.
        min: String,
        /// Upper bound on that axis, as a string.
        max: String,
    },
    /// An axis was given zero cells.
    #[error("Axis {axis} has zero cells")]
    ZeroCells {
        /// Offending axis.
        axis: usize,
    },
    /// A bounding-box corner is NaN or infinite.
    #[error("Invalid grid bounds: {0}")]
    InvalidCoordinate(#[from] CoordinateValidationError),
    /// A count could not be represented in the coordinate scalar type.
    #[error("Scalar conversion failed: {0}")]
    ScalarConversion(#[from] CoordinateConversionError),
    /// The requested resolution has more cells than allowed.
    #[error("Grid would have {requested} cells, exceeding the limit of {cap}")]
    TooManyCells {
        /// Requested number of cells (saturated at `usize::MAX`).
        requested: usize,
        /// Maximum number of cells.
        cap: usize,
    },
    /// An auto-sized grid was requested for an empty set of values.
    #[error("Cannot size a grid from an empty set of values")]
    EmptyInput,
}

// =============================================================================
// CELL GEOMETRY
// =============================================================================

/// A box of space partitioned into a regular lattice of cells.
///
/// Immutable once constructed.
///
/// # Examples
///
/// ```rust
/// use cellgrid::core::grid::cell_geometry::CellGeometry;
/// use cellgrid::geometry::{aabb::Aabb, point::Point, traits::coordinate::Coordinate};
///
/// let bbox = Aabb::new(Point::new([0.0, 0.0, 0.0]), Point::new([1.0, 1.0, 1.0]));
/// let geometry = CellGeometry::try_new(bbox, [10, 10, 10]).unwrap();
///
/// let cell = geometry.cell_of_point(&Point::new([0.05, 0.15, 0.25]));
/// assert_eq!(cell, [0, 1, 2]);
/// assert_eq!(geometry.index_of_cell(&cell), 12);
/// assert_eq!(geometry.cell_of_index(12), cell);
///
/// // Out-of-range points clamp to the boundary.
/// assert_eq!(geometry.cell_of_point(&Point::new([-3.0, 0.5, 7.0])), [0, 5, 9]);
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    bound = "",
    try_from = "CellGeometryRepr<T, D>",
    into = "CellGeometryRepr<T, D>"
)]
pub struct CellGeometry<T, const D: usize>
where
    T: CoordinateScalar,
{
    bbox: Aabb<T, D>,
    cells_per_axis: [usize; D],
    cell_lengths: [T; D],
    total_cells: usize,
}

/// Serialized form: the box and the per-axis cell counts.
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
struct CellGeometryRepr<T, const D: usize>
where
    T: CoordinateScalar,
{
    bbox: Aabb<T, D>,
    cells_per_axis: Vec<usize>,
}

impl<T, const D: usize> From<CellGeometry<T, D>> for CellGeometryRepr<T, D>
where
    T: CoordinateScalar,
{
    fn from(geometry: CellGeometry<T, D>) -> Self {
        Self {
            bbox: geometry.bbox,
            cells_per_axis: geometry.cells_per_axis.to_vec(),
        }
    }
}

impl<T, const D: usize> TryFrom<CellGeometryRepr<T, D>> for CellGeometry<T, D>
where
    T: CoordinateScalar,
{
    type Error = GridError;

    fn try_from(repr: CellGeometryRepr<T, D>) -> Result<Self, Self::Error> {
        let mut cells = [0usize; D];
        for (axis, slot) in cells.iter_mut().enumerate() {
            *slot = repr
                .cells_per_axis
                .get(axis)
                .copied()
                .ok_or(GridError::ZeroCells { axis })?;
        }
        Self::try_new(repr.bbox, cells)
    }
}

impl<T, const D: usize> CellGeometry<T, D>
where
    T: CoordinateScalar,
{
    /// Creates a geometry without validating its inputs.
    ///
    /// The caller guarantees `min < max` on every axis and at least one cell
    /// per axis; this is only checked in debug builds. Use
    /// [`try_new`](Self::try_new) for untrusted input.
    #[must_use]
    pub fn new(bbox: Aabb<T, D>, cells_per_axis: [usize; D]) -> Self {
        debug_assert!(
            (0..D).all(|i| bbox.min().coords()[i] < bbox.max().coords()[i]),
            "grid extent must be positive on every axis"
        );
        debug_assert!(cells_per_axis.iter().all(|&n| n > 0), "every axis needs a cell");
        let lengths = bbox.lengths();
        let mut cell_lengths = [T::zero(); D];
        for (i, l) in cell_lengths.iter_mut().enumerate() {
            *l = lengths[i] / index_to_scalar(cells_per_axis[i]);
        }
        Self {
            bbox,
            cells_per_axis,
            cell_lengths,
            total_cells: saturating_cell_product(&cells_per_axis),
        }
    }

    /// Creates a geometry after validating the box and the cell counts.
    ///
    /// # Errors
    ///
    /// - [`GridError::InvalidCoordinate`] if a corner is not finite
    /// - [`GridError::DegenerateExtent`] if `min >= max` on some axis
    /// - [`GridError::ZeroCells`] if an axis has no cells
    /// - [`GridError::TooManyCells`] if the total cell count overflows `usize`
    pub fn try_new(bbox: Aabb<T, D>, cells_per_axis: [usize; D]) -> Result<Self, GridError> {
        bbox.min().validate()?;
        bbox.max().validate()?;
        for axis in 0..D {
            let (min, max) = (bbox.min().coords()[axis], bbox.max().coords()[axis]);
            if min >= max {
                return Err(GridError::DegenerateExtent {
                    axis,
                    min: format!("{min:?}"),
                    max: format!("{max:?}"),
                });
            }
            if cells_per_axis[axis] == 0 {
                return Err(GridError::ZeroCells { axis });
            }
        }
        let requested = saturating_cell_product(&cells_per_axis);
        if requested == usize::MAX {
            return Err(GridError::TooManyCells {
                requested,
                cap: usize::MAX - 1,
            });
        }
        Ok(Self::new(bbox, cells_per_axis))
    }

    /// Sizes a geometry for `n_elements` values spread over `bbox`.
    ///
    /// With [`GridSizingOptions::inflate`] the box first grows by
    /// `diagonal / n_elements` on every side. Axes that are still flat are
    /// then widened so that the result always has positive extent, and
    /// [`best_grid_size`] picks the resolution.
    ///
    /// # Errors
    ///
    /// - [`GridError::EmptyInput`] if `bbox` is null
    /// - [`GridError::InvalidCoordinate`] if a corner is not finite
    /// - [`GridError::ScalarConversion`] if `n_elements` is not representable in `T`
    pub fn try_from_bbox(
        bbox: &Aabb<T, D>,
        n_elements: usize,
        options: &GridSizingOptions,
    ) -> Result<Self, GridError> {
        if bbox.is_null() {
            return Err(GridError::EmptyInput);
        }
        bbox.min().validate()?;
        bbox.max().validate()?;

        let n: T = safe_usize_to_scalar(n_elements.max(1))?;
        let diag = bbox.diagonal();
        let pad = if diag > T::zero() { diag / n } else { T::one() };
        let mut grown = if options.inflate { bbox.expanded_by(pad) } else { *bbox };

        let mut min = grown.min().to_array();
        let mut max = grown.max().to_array();
        for axis in 0..D {
            if min[axis] >= max[axis] {
                min[axis] = min[axis] - pad;
                max[axis] = max[axis] + pad;
            }
        }
        grown = Aabb::new(Point::new(min), Point::new(max));

        let sizes = best_grid_size(&grown.lengths(), n_elements, options);
        Self::try_new(grown, sizes)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    /// The partitioned box.
    #[inline]
    #[must_use]
    pub const fn bbox(&self) -> &Aabb<T, D> {
        &self.bbox
    }

    /// Number of cells on every axis.
    #[inline]
    #[must_use]
    pub const fn cells_per_axis(&self) -> &[usize; D] {
        &self.cells_per_axis
    }

    /// Total number of cells.
    #[inline]
    #[must_use]
    pub const fn total_cells(&self) -> usize {
        self.total_cells
    }

    /// Edge length of a cell on every axis.
    #[inline]
    #[must_use]
    pub const fn cell_lengths(&self) -> &[T; D] {
        &self.cell_lengths
    }

    /// Shortest cell edge. Each ring of cells around a query cell is at least
    /// this thick.
    #[must_use]
    pub fn min_cell_length(&self) -> T {
        self.cell_lengths
            .iter()
            .copied()
            .fold(T::infinity(), T::min)
    }

    /// Length of the diagonal of one cell.
    #[must_use]
    pub fn cell_diagonal(&self) -> T {
        hypot(&self.cell_lengths)
    }

    // -------------------------------------------------------------------------
    // Index mapping
    // -------------------------------------------------------------------------

    /// Row-major flat index of `cell`; coordinates past the last cell are
    /// clamped to it.
    #[must_use]
    pub fn index_of_cell(&self, cell: &CellCoord<D>) -> usize {
        let mut index = 0usize;
        for axis in 0..D {
            let c = cell[axis].min(self.cells_per_axis[axis] - 1);
            index = index * self.cells_per_axis[axis] + c;
        }
        index
    }

    /// Inverse of [`index_of_cell`](Self::index_of_cell).
    #[must_use]
    pub fn cell_of_index(&self, mut index: usize) -> CellCoord<D> {
        let mut cell = [0usize; D];
        for axis in (0..D).rev() {
            let n = self.cells_per_axis[axis];
            cell[axis] = index % n;
            index /= n;
        }
        cell
    }

    /// Cell coordinate of `value` on `axis`: `0` below the box, `n - 1` above.
    #[must_use]
    pub fn cell_on_axis(&self, axis: usize, value: T) -> usize {
        let lo = self.bbox.min().coords()[axis];
        let hi = self.bbox.max().coords()[axis];
        let last = self.cells_per_axis[axis] - 1;
        if value <= lo {
            0
        } else if value >= hi {
            last
        } else {
            scalar_to_index((value - lo) / self.cell_lengths[axis]).min(last)
        }
    }

    /// Cell containing `p`, clamped to the lattice.
    #[must_use]
    pub fn cell_of_point(&self, p: &Point<T, D>) -> CellCoord<D> {
        let mut cell = [0usize; D];
        for (axis, c) in cell.iter_mut().enumerate() {
            *c = self.cell_on_axis(axis, p.coords()[axis]);
        }
        cell
    }

    /// Flat index of the cell containing `p`.
    #[must_use]
    pub fn index_of_point(&self, p: &Point<T, D>) -> usize {
        self.index_of_cell(&self.cell_of_point(p))
    }

    // -------------------------------------------------------------------------
    // Cell regions
    // -------------------------------------------------------------------------

    /// Minimum corner of `cell`.
    #[must_use]
    pub fn cell_lower_corner(&self, cell: &CellCoord<D>) -> Point<T, D> {
        let mut corner = self.bbox.min().to_array();
        for (axis, c) in corner.iter_mut().enumerate() {
            *c = *c + index_to_scalar::<T>(cell[axis]) * self.cell_lengths[axis];
        }
        Point::new(corner)
    }

    /// The box covered by `cell`.
    #[must_use]
    pub fn cell_box(&self, cell: &CellCoord<D>) -> Aabb<T, D> {
        let lower = self.cell_lower_corner(cell);
        let upper = lower.zip_with(&Point::new(self.cell_lengths), |lo, len| lo + len);
        Aabb::new(lower, upper)
    }

    /// Inclusive range `(first, last)` of the cells that `bb` may touch, or
    /// `None` for a null box.
    ///
    /// Clamping applies, so a box outside the grid maps to boundary cells.
    #[must_use]
    pub fn cells_overlapping_box(&self, bb: &Aabb<T, D>) -> Option<(CellCoord<D>, CellCoord<D>)> {
        if bb.is_null() {
            return None;
        }
        Some((self.cell_of_point(bb.min()), self.cell_of_point(bb.max())))
    }

    /// Inclusive range of the cells that `sphere` may touch, or `None` when
    /// the radius is negative.
    #[must_use]
    pub fn cells_overlapping_sphere(
        &self,
        sphere: &Sphere<T, D>,
    ) -> Option<(CellCoord<D>, CellCoord<D>)> {
        if sphere.radius() < T::zero() {
            return None;
        }
        self.cells_overlapping_box(&sphere.bounding_box())
    }

    // -------------------------------------------------------------------------
    // Enumeration
    // -------------------------------------------------------------------------

    /// Every cell of the lattice, in flat-index order.
    #[must_use]
    pub fn cells(&self) -> CellEnumerator<D> {
        CellEnumerator::new([0; D], self.cells_per_axis)
    }

    /// Cells in the inclusive range `[first, last]`.
    #[must_use]
    pub fn cells_between(&self, first: CellCoord<D>, last: CellCoord<D>) -> CellEnumerator<D> {
        CellEnumerator::inclusive(first, last)
    }

    /// Cells at Chebyshev distance at most `ring` from `center`, clipped to
    /// the lattice.
    #[must_use]
    pub fn cells_within_ring(&self, center: &CellCoord<D>, ring: usize) -> CellEnumerator<D> {
        self.cells_around_range(center, center, ring)
    }

    /// Cells at Chebyshev distance at most `ring` from the inclusive range
    /// `[first, last]`, clipped to the lattice.
    #[must_use]
    pub fn cells_around_range(
        &self,
        first: &CellCoord<D>,
        last: &CellCoord<D>,
        ring: usize,
    ) -> CellEnumerator<D> {
        let mut lo = [0usize; D];
        let mut hi = [0usize; D];
        for axis in 0..D {
            lo[axis] = first[axis].saturating_sub(ring);
            hi[axis] = last[axis]
                .saturating_add(ring)
                .min(self.cells_per_axis[axis] - 1);
        }
        CellEnumerator::inclusive(lo, hi)
    }

    /// Largest Chebyshev distance from `center` to any cell of the lattice.
    #[must_use]
    pub fn max_ring(&self, center: &CellCoord<D>) -> usize {
        self.max_ring_around_range(center, center)
    }

    /// Largest Chebyshev distance from the range `[first, last]` to any cell
    /// of the lattice.
    #[must_use]
    pub fn max_ring_around_range(&self, first: &CellCoord<D>, last: &CellCoord<D>) -> usize {
        (0..D)
            .map(|axis| {
                first[axis].max((self.cells_per_axis[axis] - 1).saturating_sub(last[axis]))
            })
            .max()
            .unwrap_or(0)
    }
}

/// Chebyshev (L∞) distance between two cell coordinates.
#[must_use]
pub fn chebyshev_distance<const D: usize>(a: &CellCoord<D>, b: &CellCoord<D>) -> usize {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| x.abs_diff(*y))
        .max()
        .unwrap_or(0)
}

/// Chebyshev (L∞) distance from `cell` to the inclusive range `[first, last]`;
/// zero inside the range.
#[must_use]
pub fn chebyshev_distance_to_range<const D: usize>(
    cell: &CellCoord<D>,
    first: &CellCoord<D>,
    last: &CellCoord<D>,
) -> usize {
    (0..D)
        .map(|axis| {
            let c = cell[axis];
            if c < first[axis] {
                first[axis] - c
            } else {
                c.saturating_sub(last[axis])
            }
        })
        .max()
        .unwrap_or(0)
}
