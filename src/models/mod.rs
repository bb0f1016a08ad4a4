pub mod row_model;
pub mod session;
pub mod session_image;

pub use row_model::*;
pub use session::*;
pub use session_image::*;
