//! Error types for the grid core and the host session.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by [`GridBinder`](crate::grid::GridBinder).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    /// A row past the end of the grid was bound.
    #[error("row {row} out of range (row count {row_count})")]
    RowOutOfRange { row: usize, row_count: usize },

    /// An interaction referenced an image index the current snapshot does not hold.
    #[error("image index {index} out of range (len {len})")]
    ImageOutOfRange { index: usize, len: usize },
}

/// Errors raised by [`ImageSession`](crate::models::ImageSession) mutations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("image index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// The image is already part of the session.
    #[error("image already loaded{}", .path.as_ref().map(|p| format!(": {}", p.display())).unwrap_or_default())]
    Duplicate { path: Option<PathBuf> },

    #[error("session is full ({max} images)")]
    LimitReached { max: usize },

    #[error("no replacement was requested")]
    NoPendingReplace,

    /// The image targeted by a replace request was removed before the replacement arrived.
    #[error("image targeted for replacement is no longer in the session")]
    StaleReplace,

    #[error("every image already carries the watermark")]
    NothingToWatermark,
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
