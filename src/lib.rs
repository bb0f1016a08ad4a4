//! Three-per-row image grid with full-screen preview and watermark export.
//!
//! The [`grid`] module is toolkit independent: it maps a flat image sequence
//! onto rows and reports remove / replace / reposition intents to its host.
//! [`models::ImageSession`] is the host-side owner of the sequence. The GTK
//! front end lives in `ui` behind the `gui` feature.

pub mod config;
pub mod error;
pub mod export;
pub mod grid;
pub mod image_loader;
pub mod models;
pub mod scanner;
pub mod watermark;

#[cfg(feature = "gui")]
pub mod app;
#[cfg(feature = "gui")]
pub mod ui;

pub use error::{GridError, SessionError};
