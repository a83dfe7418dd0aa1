//! Odometer enumeration of the cells of an N-dimensional lattice box.

use std::iter::FusedIterator;

/// Integer coordinates of one cell of the lattice.
pub type CellCoord<const D: usize> = [usize; D];

/// Enumerates every cell coordinate in the half-open box `[first, end)`.
///
/// The last axis varies fastest: the enumerator increments it, and on
/// reaching its end bound resets it to `first` and carries into the previous
/// axis. A carry out of axis 0 exhausts the enumerator. The sequence is the
/// row-major order used by [`CellGeometry::index_of_cell`], so it visits flat
/// indices in increasing order.
///
/// A box with `first[i] >= end[i]` on any axis is empty.
///
/// [`CellGeometry::index_of_cell`]: crate::core::grid::cell_geometry::CellGeometry::index_of_cell
///
/// # Examples
///
/// ```rust
/// use cellgrid::core::grid::cell_enumerator::CellEnumerator;
///
/// let cells: Vec<[usize; 2]> = CellEnumerator::new([0, 1], [2, 3]).collect();
/// assert_eq!(cells, vec![[0, 1], [0, 2], [1, 1], [1, 2]]);
///
/// assert_eq!(CellEnumerator::new([1, 0], [1, 5]).count(), 0);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellEnumerator<const D: usize> {
    first: CellCoord<D>,
    end: CellCoord<D>,
    /// `None` once exhausted.
    current: Option<CellCoord<D>>,
}

impl<const D: usize> CellEnumerator<D> {
    /// Creates an enumerator over the half-open box `[first, end)`.
    #[must_use]
    pub fn new(first: CellCoord<D>, end: CellCoord<D>) -> Self {
        let empty = first.iter().zip(end.iter()).any(|(f, e)| f >= e);
        Self {
            first,
            end,
            current: (!empty).then_some(first),
        }
    }

    /// Creates an enumerator over the closed box `[first, last]`.
    #[must_use]
    pub fn inclusive(first: CellCoord<D>, last: CellCoord<D>) -> Self {
        Self::new(first, last.map(|l| l.saturating_add(1)))
    }

    /// An enumerator that yields nothing.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            first: [0; D],
            end: [0; D],
            current: None,
        }
    }

    /// Lower corner of the enumerated box.
    #[must_use]
    pub const fn first(&self) -> &CellCoord<D> {
        &self.first
    }

    /// Exclusive upper corner of the enumerated box.
    #[must_use]
    pub const fn end(&self) -> &CellCoord<D> {
        &self.end
    }

    fn remaining(&self) -> usize {
        let Some(current) = &self.current else {
            return 0;
        };
        // Position of `current` in the row-major order of the box, counted from the end.
        let mut stride = 1usize;
        let mut left = 1usize;
        for axis in (0..D).rev() {
            let behind = self.end[axis] - 1 - current[axis];
            left = left.saturating_add(behind.saturating_mul(stride));
            stride = stride.saturating_mul(self.end[axis] - self.first[axis]);
        }
        left
    }
}

impl<const D: usize> Iterator for CellEnumerator<D> {
    type Item = CellCoord<D>;

    fn next(&mut self) -> Option<Self::Item> {
        let out = self.current?;
        let mut next = out;
        for axis in (0..D).rev() {
            next[axis] += 1;
            if next[axis] < self.end[axis] {
                self.current = Some(next);
                return Some(out);
            }
            next[axis] = self.first[axis];
        }
        self.current = None;
        Some(out)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

impl<const D: usize> ExactSizeIterator for CellEnumerator<D> {}

impl<const D: usize> FusedIterator for CellEnumerator<D> {}
