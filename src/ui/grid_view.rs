// ListView of grid rows, three images per row
// Rows come from GridBinder; taps and long presses are forwarded to the host

use glib::Object;
use gtk4::prelude::*;
use gtk4::subclass::prelude::*;
use gtk4::{
    gio, glib, ListItem, ListScrollFlags, ListView, NoSelection, PolicyType, ScrolledWindow,
    SignalListItemFactory,
};
use std::cell::RefCell;
use std::rc::Rc;

use super::row_widget::RowWidget;
use super::texture::TextureCache;
use crate::grid::GridBinder;
use crate::models::{RowView, SessionImage};

// GObject wrapper so a RowView can live in a ListStore
mod row_object {
    use super::*;

    mod imp {
        use super::*;

        #[derive(Default)]
        pub struct RowObjectInner {
            pub row: RefCell<Option<RowView<SessionImage>>>,
        }

        #[glib::object_subclass]
        impl ObjectSubclass for RowObjectInner {
            const NAME: &'static str = "WmarkRowObject";
            type Type = super::RowObject;
            type ParentType = glib::Object;
        }

        impl ObjectImpl for RowObjectInner {}
    }

    glib::wrapper! {
        pub struct RowObject(ObjectSubclass<imp::RowObjectInner>);
    }

    impl RowObject {
        pub fn new(row: RowView<SessionImage>) -> Self {
            let obj: Self = Object::builder().build();
            obj.imp().row.replace(Some(row));
            obj
        }

        pub fn row(&self) -> Option<RowView<SessionImage>> {
            self.imp().row.borrow().clone()
        }
    }

    impl Default for RowObject {
        fn default() -> Self {
            Object::builder().build()
        }
    }
}

pub use row_object::RowObject;

type IndexHandler = Rc<RefCell<Option<Box<dyn Fn(usize)>>>>;

/// Scrollable image grid backed by a `GridBinder` snapshot.
pub struct ImageGridView {
    scrolled_window: ScrolledWindow,
    list_view: ListView,
    model: gio::ListStore,
    on_activate: IndexHandler,
    on_long_activate: IndexHandler,
}

impl ImageGridView {
    pub fn new(textures: Rc<TextureCache>) -> Self {
        let model = gio::ListStore::new::<RowObject>();
        let selection_model = NoSelection::new(Some(model.clone()));
        let factory = SignalListItemFactory::new();

        let on_activate: IndexHandler = Rc::new(RefCell::new(None));
        let on_long_activate: IndexHandler = Rc::new(RefCell::new(None));

        let activate_setup = on_activate.clone();
        let long_activate_setup = on_long_activate.clone();
        factory.connect_setup(move |_factory, list_item| {
            let Some(list_item) = list_item.downcast_ref::<ListItem>() else {
                return;
            };
            let row_widget = RowWidget::new();

            let on_activate = activate_setup.clone();
            row_widget.connect_activate(move |index| {
                if let Some(ref callback) = *on_activate.borrow() {
                    callback(index);
                }
            });
            let on_long_activate = long_activate_setup.clone();
            row_widget.connect_long_activate(move |index| {
                if let Some(ref callback) = *on_long_activate.borrow() {
                    callback(index);
                }
            });

            list_item.set_child(Some(&row_widget));
        });

        factory.connect_bind(move |_factory, list_item| {
            let Some(list_item) = list_item.downcast_ref::<ListItem>() else {
                return;
            };
            let Some(row_object) = list_item.item().and_downcast::<RowObject>() else {
                return;
            };
            let Some(row_widget) = list_item.child().and_downcast::<RowWidget>() else {
                return;
            };
            if let Some(row) = row_object.row() {
                row_widget.bind(&row, &textures);
            }
        });

        factory.connect_unbind(|_factory, list_item| {
            let Some(list_item) = list_item.downcast_ref::<ListItem>() else {
                return;
            };
            if let Some(row_widget) = list_item.child().and_downcast::<RowWidget>() {
                row_widget.unbind();
            }
        });

        factory.connect_teardown(|_factory, list_item| {
            if let Some(list_item) = list_item.downcast_ref::<ListItem>() {
                list_item.set_child(Option::<&gtk4::Widget>::None);
            }
        });

        let list_view = ListView::new(Some(selection_model), Some(factory));
        list_view.set_single_click_activate(false);
        list_view.add_css_class("image-grid");
        list_view.set_hexpand(true);
        list_view.set_vexpand(true);

        let scrolled_window = ScrolledWindow::builder()
            .hscrollbar_policy(PolicyType::Never)
            .vscrollbar_policy(PolicyType::Automatic)
            .kinetic_scrolling(true)
            .child(&list_view)
            .build();

        Self {
            scrolled_window,
            list_view,
            model,
            on_activate,
            on_long_activate,
        }
    }

    pub fn widget(&self) -> &ScrolledWindow {
        &self.scrolled_window
    }

    /// Rebuilds every row from the binder's current snapshot.
    pub fn set_rows(&self, binder: &GridBinder<SessionImage>) {
        let objects: Vec<RowObject> = binder.rows().map(RowObject::new).collect();
        self.model.splice(0, self.model.n_items(), &objects);
    }

    /// Brings `row` into view if the grid still has it.
    pub fn scroll_to_row(&self, row: usize) {
        let Ok(row) = u32::try_from(row) else {
            return;
        };
        if row < self.model.n_items() {
            self.list_view.scroll_to(row, ListScrollFlags::NONE, None);
        }
    }

    pub fn connect_activate<F>(&self, callback: F)
    where
        F: Fn(usize) + 'static,
    {
        *self.on_activate.borrow_mut() = Some(Box::new(callback));
    }

    pub fn connect_long_activate<F>(&self, callback: F)
    where
        F: Fn(usize) + 'static,
    {
        *self.on_long_activate.borrow_mut() = Some(Box::new(callback));
    }
}
