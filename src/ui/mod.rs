pub mod full_image_dialog;
pub mod grid_view;
pub mod position_dialog;
pub mod row_widget;
pub mod texture;
pub mod window;

pub use full_image_dialog::DialogPresenter;
pub use grid_view::ImageGridView;
pub use row_widget::RowWidget;
pub use window::MainWindow;
