use std::fmt;
use std::rc::Rc;

use tracing::trace;

use super::presenter::{FullImagePresenter, Presentation};
use super::{cell_state, row_count, CellState, ROW_WIDTH};
use crate::error::GridError;
use crate::models::{CellView, RowView};

/// Host notification carrying an absolute image index.
pub type IndexCallback = Rc<dyn Fn(usize)>;

/// Callbacks through which the grid reports mutation intents to its host.
#[derive(Clone)]
pub struct GridCallbacks {
    on_remove: IndexCallback,
    on_replace: IndexCallback,
    on_reposition: Option<IndexCallback>,
}

impl GridCallbacks {
    pub fn new<R, P>(on_remove: R, on_replace: P) -> Self
    where
        R: Fn(usize) + 'static,
        P: Fn(usize) + 'static,
    {
        Self {
            on_remove: Rc::new(on_remove),
            on_replace: Rc::new(on_replace),
            on_reposition: None,
        }
    }

    /// Registers the callback fired when a presentation is dismissed without a choice.
    pub fn with_reposition<F>(mut self, on_reposition: F) -> Self
    where
        F: Fn(usize) + 'static,
    {
        self.on_reposition = Some(Rc::new(on_reposition));
        self
    }

    pub(crate) fn remove(&self, index: usize) {
        (self.on_remove)(index);
    }

    pub(crate) fn replace(&self, index: usize) {
        (self.on_replace)(index);
    }

    pub(crate) fn reposition(&self, index: usize) {
        if let Some(ref callback) = self.on_reposition {
            callback(index);
        }
    }
}

impl fmt::Debug for GridCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridCallbacks")
            .field("on_remove", &"<closure>")
            .field("on_replace", &"<closure>")
            .field(
                "on_reposition",
                &self.on_reposition.as_ref().map(|_| "<closure>"),
            )
            .finish()
    }
}

/// Binds a snapshot of the host's image sequence onto three-wide rows.
///
/// The binder holds `Rc` clones only. After mutating its sequence the host
/// passes a fresh snapshot to [`GridBinder::refresh`].
pub struct GridBinder<T> {
    images: Vec<Rc<T>>,
    callbacks: GridCallbacks,
    presenter: Rc<dyn FullImagePresenter<T>>,
}

impl<T> GridBinder<T> {
    pub fn new(
        images: Vec<Rc<T>>,
        callbacks: GridCallbacks,
        presenter: Rc<dyn FullImagePresenter<T>>,
    ) -> Self {
        Self {
            images,
            callbacks,
            presenter,
        }
    }

    /// Replaces the snapshot after the host changed its sequence.
    pub fn refresh(&mut self, images: Vec<Rc<T>>) {
        trace!(old_len = self.images.len(), new_len = images.len(), "Grid refreshed");
        self.images = images;
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn row_count(&self) -> usize {
        row_count(self.images.len())
    }

    /// Binds `row`.
    ///
    /// # Panics
    /// If `row >= self.row_count()`; that means the host's row accounting is
    /// out of sync with its snapshot.
    pub fn bind_row(&self, row: usize) -> RowView<T> {
        match self.try_bind_row(row) {
            Ok(view) => view,
            Err(err) => panic!("{}", err),
        }
    }

    pub fn try_bind_row(&self, row: usize) -> Result<RowView<T>, GridError> {
        let row_count = self.row_count();
        if row >= row_count {
            return Err(GridError::RowOutOfRange { row, row_count });
        }

        let cells: [CellView<T>; ROW_WIDTH] = std::array::from_fn(|column| {
            match cell_state(self.images.len(), row, column) {
                CellState::Populated(index) => CellView::Populated {
                    image: Rc::clone(&self.images[index]),
                    index,
                },
                CellState::Empty => CellView::Empty,
            }
        });
        Ok(RowView::new(row, cells))
    }

    /// Binds every row in order.
    pub fn rows(&self) -> impl Iterator<Item = RowView<T>> + '_ {
        (0..self.row_count()).map(|row| self.bind_row(row))
    }

    /// Tap on a populated cell: presents the image stored at `index`.
    pub fn activate(&self, index: usize) -> Result<(), GridError> {
        let image = self.image_at(index)?;
        trace!(index, "Presenting image");
        self.presenter
            .present(image, Presentation::new(index, self.callbacks.clone()));
        Ok(())
    }

    /// Long press on a populated cell: reports removal without confirmation.
    pub fn long_activate(&self, index: usize) -> Result<(), GridError> {
        self.image_at(index)?;
        self.callbacks.remove(index);
        Ok(())
    }

    fn image_at(&self, index: usize) -> Result<Rc<T>, GridError> {
        self.images
            .get(index)
            .cloned()
            .ok_or(GridError::ImageOutOfRange {
                index,
                len: self.images.len(),
            })
    }
}

impl<T> fmt::Debug for GridBinder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridBinder")
            .field("len", &self.images.len())
            .field("row_count", &self.row_count())
            .field("callbacks", &self.callbacks)
            .finish()
    }
}
