//! Resolution selection for auto-sized grids.
//!
//! [`best_grid_size`] turns the extent of a point set and its cardinality into
//! per-axis cell counts so that the grid holds roughly
//! [`GridSizingOptions::cells_per_element`] cells per value. Axes that are
//! flat compared to the diagonal of the extent get a single cell.
//!
//! The total number of cells of an auto-sized grid is capped. The cap
//! defaults to 2^26 cells and can be overridden with the
//! `CELLGRID_MAX_TOTAL_CELLS` environment variable.

use crate::geometry::traits::coordinate::CoordinateScalar;
use crate::geometry::util::scalar_to_index;
use serde::{Deserialize, Serialize};

/// Default cap on the number of cells of an auto-sized grid.
///
/// 2^26 cells is 512 MiB of offsets for the static backend on 64-bit targets.
pub const MAX_TOTAL_CELLS_DEFAULT: usize = 1 << 26;

/// Relative length below which an axis is treated as flat.
const FLAT_AXIS_RELATIVE_EPSILON: f64 = 1e-4;

/// Relative slack added before truncating a fractional cell count, so that
/// `powf` rounding does not turn an exact root such as `10.0` into `9`.
const CELL_COUNT_SLACK: f64 = 1e-9;

/// Reads the `CELLGRID_MAX_TOTAL_CELLS` environment variable if set,
/// otherwise returns [`MAX_TOTAL_CELLS_DEFAULT`].
///
/// Unparseable values are ignored.
#[must_use]
pub fn max_total_cells_from_env() -> usize {
    if let Ok(v) = std::env::var("CELLGRID_MAX_TOTAL_CELLS")
        && let Ok(n) = v.trim().parse::<usize>()
        && n > 0
    {
        return n;
    }
    MAX_TOTAL_CELLS_DEFAULT
}

/// Options controlling how an auto-sized grid picks its resolution.
///
/// # Examples
///
/// ```rust
/// use cellgrid::core::grid::sizing::GridSizingOptionsBuilder;
///
/// let options = GridSizingOptionsBuilder::default()
///     .cells_per_element(2.0)
///     .max_total_cells(4096_usize)
///     .build()
///     .unwrap();
/// assert_eq!(options.min_cells_per_axis, 1);
/// assert!(options.inflate);
///
/// assert!(GridSizingOptionsBuilder::default().cells_per_element(0.0).build().is_err());
/// ```
#[derive(Builder, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[builder(build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct GridSizingOptions {
    /// Target number of cells per indexed value.
    #[builder(default = "1.0")]
    pub cells_per_element: f64,
    /// Lower bound on the cell count of every non-flat axis.
    #[builder(default = "1")]
    pub min_cells_per_axis: usize,
    /// Grow the bounding box by `diagonal / n` on every side before sizing,
    /// so values on the boundary do not all land in the outermost cells.
    #[builder(default = "true")]
    pub inflate: bool,
    /// Upper bound on the total number of cells.
    #[builder(default = "max_total_cells_from_env()")]
    pub max_total_cells: usize,
}

impl GridSizingOptionsBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(c) = self.cells_per_element
            && !(c.is_finite() && c > 0.0)
        {
            return Err(format!("cells_per_element must be positive and finite, got {c}"));
        }
        if self.max_total_cells == Some(0) {
            return Err("max_total_cells must be at least 1".to_string());
        }
        Ok(())
    }
}

impl Default for GridSizingOptions {
    fn default() -> Self {
        Self {
            cells_per_element: 1.0,
            min_cells_per_axis: 1,
            inflate: true,
            max_total_cells: max_total_cells_from_env(),
        }
    }
}

/// Product of the cell counts, saturating at `usize::MAX`.
#[must_use]
pub fn saturating_cell_product<const D: usize>(sizes: &[usize; D]) -> usize {
    sizes.iter().fold(1usize, |acc, &n| acc.saturating_mul(n))
}

/// Chooses per-axis cell counts for a box with edge `lengths` holding
/// `n_elements` values.
///
/// The counts are proportional to the edge lengths, scaled so that their
/// product is close to `n_elements * cells_per_element`. Axes shorter than
/// `1e-4` times the diagonal get one cell. Every other axis gets at least
/// `min_cells_per_axis` cells, and the total never exceeds
/// `max_total_cells`.
///
/// # Examples
///
/// ```rust
/// use cellgrid::core::grid::sizing::{GridSizingOptions, best_grid_size};
///
/// let sizes = best_grid_size(&[1.0f64, 1.0, 1.0], 1000, &GridSizingOptions::default());
/// assert_eq!(sizes, [10, 10, 10]);
///
/// // A flat axis collapses to a single cell.
/// let sizes = best_grid_size(&[4.0f64, 1.0, 0.0], 400, &GridSizingOptions::default());
/// assert_eq!(sizes, [40, 10, 1]);
/// ```
#[must_use]
pub fn best_grid_size<T, const D: usize>(
    lengths: &[T; D],
    n_elements: usize,
    options: &GridSizingOptions,
) -> [usize; D]
where
    T: CoordinateScalar,
{
    let lengths: [f64; D] = (*lengths).map(|l| {
        l.to_f64()
            .filter(|l| l.is_finite())
            .map_or(0.0, |l| l.max(0.0))
    });
    let diag = lengths.iter().map(|l| l * l).sum::<f64>().sqrt();
    let eps = diag * FLAT_AXIS_RELATIVE_EPSILON;
    let min_cells = options.min_cells_per_axis.max(1);

    let mut sizes = [1usize; D];
    let wide: Vec<usize> = (0..D).filter(|&i| lengths[i] > eps && lengths[i] > 0.0).collect();
    if wide.is_empty() {
        return sizes;
    }

    let target = (n_elements.max(1) as f64 * options.cells_per_element).max(1.0);
    let volume: f64 = wide.iter().map(|&i| lengths[i]).product();
    let k = (target / volume).powf(1.0 / wide.len() as f64);
    for &i in &wide {
        sizes[i] = scalar_to_index(lengths[i] * k * (1.0 + CELL_COUNT_SLACK)).max(min_cells);
    }

    let requested = saturating_cell_product(&sizes);
    let cap = options.max_total_cells.max(1);
    if requested > cap {
        tracing::warn!(
            requested,
            cap,
            "auto-sized grid exceeds the total cell cap; lowering resolution"
        );
        let shrink = (cap as f64 / requested as f64).powf(1.0 / wide.len() as f64);
        for &i in &wide {
            sizes[i] = scalar_to_index(sizes[i] as f64 * shrink).max(1);
        }
        while saturating_cell_product(&sizes) > cap {
            let Some(axis) = (0..D).filter(|&i| sizes[i] > 1).max_by_key(|&i| sizes[i]) else {
                break;
            };
            sizes[axis] -= 1;
        }
    }

    tracing::debug!(?sizes, n_elements, "selected grid resolution");
    sizes
}
