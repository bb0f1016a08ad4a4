use std::fmt;
use std::rc::Rc;

use crate::grid::ROW_WIDTH;

/// One slot of a bound row.
///
/// `Populated` shares the host's `Rc`, so the image is the same allocation the
/// host stores at `index`.
pub enum CellView<T> {
    Populated { image: Rc<T>, index: usize },
    Empty,
}

impl<T> CellView<T> {
    pub fn is_populated(&self) -> bool {
        matches!(self, Self::Populated { .. })
    }

    /// Absolute image index, if the slot is populated.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Populated { index, .. } => Some(*index),
            Self::Empty => None,
        }
    }

    pub fn image(&self) -> Option<&Rc<T>> {
        match self {
            Self::Populated { image, .. } => Some(image),
            Self::Empty => None,
        }
    }
}

impl<T> Clone for CellView<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Populated { image, index } => Self::Populated {
                image: Rc::clone(image),
                index: *index,
            },
            Self::Empty => Self::Empty,
        }
    }
}

/// Cells compare by image identity, not image content.
impl<T> PartialEq for CellView<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Populated { image: a, index: i },
                Self::Populated { image: b, index: j },
            ) => i == j && Rc::ptr_eq(a, b),
            (Self::Empty, Self::Empty) => true,
            _ => false,
        }
    }
}

impl<T> fmt::Debug for CellView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Populated { index, .. } => f
                .debug_struct("Populated")
                .field("index", index)
                .field("image", &"<image>")
                .finish(),
            Self::Empty => f.write_str("Empty"),
        }
    }
}

/// A bound grid row: always [`ROW_WIDTH`] slots, trailing slots may be empty.
pub struct RowView<T> {
    pub row_index: usize,
    pub cells: [CellView<T>; ROW_WIDTH],
}

impl<T> RowView<T> {
    pub fn new(row_index: usize, cells: [CellView<T>; ROW_WIDTH]) -> Self {
        Self { row_index, cells }
    }

    pub fn populated_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_populated()).count()
    }
}

impl<T> Clone for RowView<T> {
    fn clone(&self) -> Self {
        Self {
            row_index: self.row_index,
            cells: self.cells.clone(),
        }
    }
}

impl<T> PartialEq for RowView<T> {
    fn eq(&self, other: &Self) -> bool {
        self.row_index == other.row_index && self.cells == other.cells
    }
}

impl<T> fmt::Debug for RowView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowView")
            .field("row_index", &self.row_index)
            .field("cells", &self.cells)
            .finish()
    }
}
