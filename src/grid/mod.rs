//! Three-per-row image grid binding.
//!
//! A flat image sequence is presented as rows of [`ROW_WIDTH`] cells. Row `r`
//! covers absolute indices `3r..3r+3`; slots past the end of the sequence are
//! empty. The binder only reports user intent through host callbacks and never
//! mutates the sequence.

pub mod binder;
pub mod presenter;

pub use binder::{GridBinder, GridCallbacks, IndexCallback};
pub use presenter::{FullImagePresenter, Presentation, PresentationOutcome};

/// Number of cells per row.
pub const ROW_WIDTH: usize = 3;

/// State of a single cell, independent of any rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    /// The cell shows the image at this absolute index.
    Populated(usize),
    Empty,
}

/// Rows needed for `len` images: `ceil(len / 3)`.
pub fn row_count(len: usize) -> usize {
    len.div_ceil(ROW_WIDTH)
}

/// Absolute image index of `column` in `row`.
pub fn absolute_index(row: usize, column: usize) -> usize {
    row * ROW_WIDTH + column
}

/// Resolves a cell for a sequence of `len` images.
pub fn cell_state(len: usize, row: usize, column: usize) -> CellState {
    debug_assert!(column < ROW_WIDTH);
    let index = absolute_index(row, column);
    if index < len {
        CellState::Populated(index)
    } else {
        CellState::Empty
    }
}

/// Populated cells in `row`: `min(3, len - 3 * row)`, zero past the end.
pub fn populated_in_row(len: usize, row: usize) -> usize {
    len.saturating_sub(row * ROW_WIDTH).min(ROW_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_count_table() {
        let cases = [(0, 0), (1, 1), (2, 1), (3, 1), (4, 2), (6, 2), (7, 3), (9, 3), (10, 4)];
        for (len, rows) in cases {
            assert_eq!(row_count(len), rows, "len {}", len);
        }
    }

    #[test]
    fn test_cell_state_matches_index_bound() {
        for len in 0..20 {
            for row in 0..row_count(len) {
                for column in 0..ROW_WIDTH {
                    let expected = absolute_index(row, column) < len;
                    let state = cell_state(len, row, column);
                    assert_eq!(
                        matches!(state, CellState::Populated(_)),
                        expected,
                        "len {} row {} column {}",
                        len,
                        row,
                        column
                    );
                }
            }
        }
    }

    #[test]
    fn test_every_bound_row_has_a_populated_cell() {
        for len in 1..30 {
            for row in 0..row_count(len) {
                let populated = populated_in_row(len, row);
                assert!(populated >= 1 && populated <= ROW_WIDTH);
                assert_eq!(populated, (len - row * ROW_WIDTH).min(ROW_WIDTH));
            }
            assert_eq!(populated_in_row(len, row_count(len)), 0);
        }
    }

    #[test]
    fn test_seven_images_last_row() {
        assert_eq!(cell_state(7, 2, 0), CellState::Populated(6));
        assert_eq!(cell_state(7, 2, 1), CellState::Empty);
        assert_eq!(cell_state(7, 2, 2), CellState::Empty);
    }
}
