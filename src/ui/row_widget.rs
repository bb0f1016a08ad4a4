// Row widget for one grid row of three image slots
// Tap opens the full-image dialog, long press removes the image

use glib::Object;
use gtk4::prelude::*;
use gtk4::subclass::prelude::*;
use gtk4::{
    glib, Align, Box as GtkBox, ContentFit, GestureClick, GestureLongPress, Orientation, Picture,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::texture::{placeholder_texture, TextureCache};
use crate::grid::ROW_WIDTH;
use crate::models::{CellView, RowView, SessionImage};

const CELL_SIZE: i32 = 200;

type IndexHandler = Rc<dyn Fn(usize)>;

mod imp {
    use super::*;

    pub struct CellSlot {
        pub picture: Picture,
        /// Absolute image index while the slot is bound to a populated cell.
        pub index: Rc<Cell<Option<usize>>>,
    }

    #[derive(Default)]
    pub struct RowWidgetInner {
        pub slots: RefCell<Vec<CellSlot>>,
        pub on_activate: RefCell<Option<IndexHandler>>,
        pub on_long_activate: RefCell<Option<IndexHandler>>,
    }

    #[glib::object_subclass]
    impl ObjectSubclass for RowWidgetInner {
        const NAME: &'static str = "WmarkRowWidget";
        type Type = super::RowWidget;
        type ParentType = GtkBox;
    }

    impl ObjectImpl for RowWidgetInner {
        fn constructed(&self) {
            self.parent_constructed();

            let obj = self.obj();
            obj.set_orientation(Orientation::Horizontal);
            obj.set_spacing(4);
            obj.set_homogeneous(false);
            obj.set_halign(Align::Start);
            obj.add_css_class("image-row");
        }
    }

    impl WidgetImpl for RowWidgetInner {}
    impl BoxImpl for RowWidgetInner {}
}

glib::wrapper! {
    pub struct RowWidget(ObjectSubclass<imp::RowWidgetInner>)
        @extends GtkBox, gtk4::Widget,
        @implements gtk4::Accessible, gtk4::Buildable, gtk4::ConstraintTarget, gtk4::Orientable;
}

impl RowWidget {
    pub fn new() -> Self {
        let widget: Self = Object::builder().build();
        for _ in 0..ROW_WIDTH {
            let slot = widget.create_slot();
            widget.append(&slot.picture);
            widget.imp().slots.borrow_mut().push(slot);
        }
        widget
    }

    /// Shows the row's populated cells and hides empty ones.
    pub fn bind(&self, row: &RowView<SessionImage>, textures: &TextureCache) {
        let slots = self.imp().slots.borrow();
        for (slot, cell) in slots.iter().zip(row.cells.iter()) {
            match cell {
                CellView::Populated { image, index } => {
                    slot.picture
                        .set_paintable(Some(&textures.cell_texture(image)));
                    slot.picture.set_tooltip_text(Some(&image.display_name()));
                    slot.index.set(Some(*index));
                    slot.picture.set_visible(true);
                }
                CellView::Empty => {
                    slot.index.set(None);
                    slot.picture.set_visible(false);
                }
            }
        }
    }

    /// Unbind the current row, preparing for reuse
    pub fn unbind(&self) {
        for slot in self.imp().slots.borrow().iter() {
            slot.picture.set_paintable(Some(placeholder_texture()));
            slot.picture.set_tooltip_text(None);
            slot.index.set(None);
            slot.picture.set_visible(false);
        }
    }

    pub fn connect_activate<F>(&self, callback: F)
    where
        F: Fn(usize) + 'static,
    {
        *self.imp().on_activate.borrow_mut() = Some(Rc::new(callback));
    }

    pub fn connect_long_activate<F>(&self, callback: F)
    where
        F: Fn(usize) + 'static,
    {
        *self.imp().on_long_activate.borrow_mut() = Some(Rc::new(callback));
    }

    fn create_slot(&self) -> imp::CellSlot {
        let picture = Picture::new();
        picture.set_can_shrink(true);
        picture.set_content_fit(ContentFit::Cover);
        picture.set_size_request(CELL_SIZE, CELL_SIZE);
        picture.add_css_class("image-cell");
        picture.set_visible(false);

        let index = Rc::new(Cell::new(None));
        // Set by the long press so the click that ends it does not also open the dialog.
        let long_pressed = Rc::new(Cell::new(false));

        let click = GestureClick::new();
        click.set_button(1);
        let long_pressed_for_press = long_pressed.clone();
        click.connect_pressed(move |_, _n, _x, _y| {
            long_pressed_for_press.set(false);
        });
        let row_weak = self.downgrade();
        let index_for_click = index.clone();
        let long_pressed_for_release = long_pressed.clone();
        click.connect_released(move |_, _n, _x, _y| {
            if long_pressed_for_release.get() {
                return;
            }
            if let (Some(row), Some(i)) = (row_weak.upgrade(), index_for_click.get()) {
                row.emit_activate(i);
            }
        });
        picture.add_controller(click);

        let long_press = GestureLongPress::new();
        let row_weak = self.downgrade();
        let index_for_long = index.clone();
        long_press.connect_pressed(move |_, _x, _y| {
            long_pressed.set(true);
            if let (Some(row), Some(i)) = (row_weak.upgrade(), index_for_long.get()) {
                row.emit_long_activate(i);
            }
        });
        picture.add_controller(long_press);

        imp::CellSlot { picture, index }
    }

    fn emit_activate(&self, index: usize) {
        let handler = self.imp().on_activate.borrow().clone();
        if let Some(handler) = handler {
            handler(index);
        }
    }

    fn emit_long_activate(&self, index: usize) {
        let handler = self.imp().on_long_activate.borrow().clone();
        if let Some(handler) = handler {
            handler(index);
        }
    }
}

impl Default for RowWidget {
    fn default() -> Self {
        Self::new()
    }
}
