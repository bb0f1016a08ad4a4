// 3x3 picker for the watermark anchor

use gtk4::prelude::*;
use gtk4::{ApplicationWindow, Box as GtkBox, Button, Grid, Label, Orientation, Window};
use std::rc::Rc;

use crate::watermark::MarkerPosition;

/// Opens a modal picker and calls `on_pick` once with the chosen position.
/// Closing the window picks nothing.
pub fn choose_position<F>(parent: &ApplicationWindow, current: MarkerPosition, on_pick: F)
where
    F: Fn(MarkerPosition) + 'static,
{
    let dialog = Window::builder()
        .title("Place watermark")
        .transient_for(parent)
        .modal(true)
        .resizable(false)
        .build();

    let content = GtkBox::new(Orientation::Vertical, 12);
    content.set_margin_top(12);
    content.set_margin_bottom(12);
    content.set_margin_start(12);
    content.set_margin_end(12);
    content.append(&Label::new(Some("Where should the watermark go?")));

    let grid = Grid::new();
    grid.set_row_spacing(6);
    grid.set_column_spacing(6);
    grid.set_row_homogeneous(true);
    grid.set_column_homogeneous(true);

    let on_pick = Rc::new(on_pick);
    for position in MarkerPosition::ALL {
        let button = Button::with_label(position.label());
        button.set_size_request(96, 48);
        if position == current {
            button.add_css_class("suggested-action");
        }

        let on_pick = on_pick.clone();
        let dialog_weak = dialog.downgrade();
        button.connect_clicked(move |_| {
            if let Some(dialog) = dialog_weak.upgrade() {
                dialog.close();
            }
            on_pick(position);
        });

        let (row, column) = position.grid_cell();
        grid.attach(&button, column as i32, row as i32, 1, 1);
    }
    content.append(&grid);

    dialog.set_child(Some(&content));
    dialog.present();
}
