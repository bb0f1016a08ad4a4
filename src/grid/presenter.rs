//! Full-screen presentation of a single grid image.
//!
//! A presentation ends with exactly one [`PresentationOutcome`]. The
//! [`Presentation`] token is consumed by [`Presentation::resolve`], and a token
//! dropped unresolved counts as [`PresentationOutcome::Cancel`].

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use super::binder::GridCallbacks;

/// How the user left a presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationOutcome {
    /// Acknowledged; nothing is reported to the host.
    Confirm,
    /// Reports `on_remove(index)`.
    Delete,
    /// Reports `on_replace(index)`. The host picks the new image.
    Replace,
    /// Dismissed without a choice. Reports `on_reposition(index)` when the
    /// host registered one.
    Cancel,
}

/// Displays one image and resolves the presentation when the user acts.
pub trait FullImagePresenter<T> {
    fn present(&self, image: Rc<T>, presentation: Presentation);
}

/// Pending presentation of the image at `index`.
#[must_use = "dropping a presentation resolves it as Cancel"]
pub struct Presentation {
    index: usize,
    callbacks: Option<GridCallbacks>,
}

impl Presentation {
    pub(crate) fn new(index: usize, callbacks: GridCallbacks) -> Self {
        Self {
            index,
            callbacks: Some(callbacks),
        }
    }

    /// Absolute index of the presented image.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Ends the presentation, firing the callback that belongs to `outcome`.
    pub fn resolve(mut self, outcome: PresentationOutcome) {
        self.fire(outcome);
    }

    /// Resolves, then runs `teardown`. Host callbacks run while the
    /// presenting surface is still up.
    pub fn resolve_then<F>(self, outcome: PresentationOutcome, teardown: F)
    where
        F: FnOnce(),
    {
        self.resolve(outcome);
        teardown();
    }

    fn fire(&mut self, outcome: PresentationOutcome) {
        let Some(callbacks) = self.callbacks.take() else {
            return;
        };
        debug!(index = self.index, ?outcome, "Presentation resolved");
        match outcome {
            PresentationOutcome::Confirm => {}
            PresentationOutcome::Delete => callbacks.remove(self.index),
            PresentationOutcome::Replace => callbacks.replace(self.index),
            PresentationOutcome::Cancel => callbacks.reposition(self.index),
        }
    }
}

impl Drop for Presentation {
    fn drop(&mut self) {
        // Host callbacks must not run while a host panic unwinds.
        if std::thread::panicking() {
            return;
        }
        self.fire(PresentationOutcome::Cancel);
    }
}

impl fmt::Debug for Presentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Presentation")
            .field("index", &self.index)
            .field("resolved", &self.callbacks.is_none())
            .finish()
    }
}
