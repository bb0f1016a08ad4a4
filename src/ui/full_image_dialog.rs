// Modal full-image dialog
// OK confirms, Delete and Replace report back to the grid, closing the window cancels

use gtk4::prelude::*;
use gtk4::{
    glib, Align, ApplicationWindow, Box as GtkBox, Button, ContentFit, Label, Orientation, Picture,
    Window,
};
use std::cell::RefCell;
use std::rc::Rc;

use super::texture::{texture_from_image, FULL_PREVIEW_SIZE};
use crate::grid::{FullImagePresenter, Presentation, PresentationOutcome};
use crate::models::SessionImage;

const DIALOG_MARGIN: i32 = 12;

/// Presents session images in a modal window over the main window.
pub struct DialogPresenter {
    parent: ApplicationWindow,
}

impl DialogPresenter {
    pub fn new(parent: &ApplicationWindow) -> Self {
        Self {
            parent: parent.clone(),
        }
    }
}

impl FullImagePresenter<SessionImage> for DialogPresenter {
    fn present(&self, image: Rc<SessionImage>, presentation: Presentation) {
        let (width, height) = image.dimensions();
        let dialog = Window::builder()
            .title(image.display_name())
            .transient_for(&self.parent)
            .modal(true)
            .default_width(900)
            .default_height(700)
            .build();

        let content = GtkBox::new(Orientation::Vertical, 12);
        content.set_margin_top(DIALOG_MARGIN);
        content.set_margin_bottom(DIALOG_MARGIN);
        content.set_margin_start(DIALOG_MARGIN);
        content.set_margin_end(DIALOG_MARGIN);

        let picture = Picture::for_paintable(&texture_from_image(&image.pixels, FULL_PREVIEW_SIZE));
        picture.set_content_fit(ContentFit::Contain);
        picture.set_can_shrink(true);
        picture.set_hexpand(true);
        picture.set_vexpand(true);
        content.append(&picture);

        let mut caption = format!("{} x {}", width, height);
        if image.watermarked {
            caption.push_str(" · watermarked");
        }
        let info = Label::new(Some(&caption));
        info.add_css_class("dim-label");
        content.append(&info);

        let buttons = GtkBox::new(Orientation::Horizontal, 8);
        buttons.set_halign(Align::End);
        let delete_button = Button::with_label("Delete");
        delete_button.add_css_class("destructive-action");
        let replace_button = Button::with_label("Replace");
        let ok_button = Button::with_label("OK");
        ok_button.add_css_class("suggested-action");
        buttons.append(&delete_button);
        buttons.append(&replace_button);
        buttons.append(&ok_button);
        content.append(&buttons);

        dialog.set_child(Some(&content));

        // Taken by whichever handler ends the presentation first.
        let pending = Rc::new(RefCell::new(Some(presentation)));

        let finish = {
            let pending = pending.clone();
            let dialog_weak = dialog.downgrade();
            Rc::new(move |outcome: PresentationOutcome| {
                let taken = pending.borrow_mut().take();
                let close = || {
                    if let Some(dialog) = dialog_weak.upgrade() {
                        dialog.close();
                    }
                };
                match taken {
                    Some(presentation) => presentation.resolve_then(outcome, close),
                    None => close(),
                }
            })
        };

        let finish_ok = finish.clone();
        ok_button.connect_clicked(move |_| finish_ok(PresentationOutcome::Confirm));
        let finish_delete = finish.clone();
        delete_button.connect_clicked(move |_| finish_delete(PresentationOutcome::Delete));
        let finish_replace = finish.clone();
        replace_button.connect_clicked(move |_| finish_replace(PresentationOutcome::Replace));

        dialog.connect_close_request(move |_| {
            let taken = pending.borrow_mut().take();
            if let Some(presentation) = taken {
                presentation.resolve(PresentationOutcome::Cancel);
            }
            glib::Propagation::Proceed
        });

        dialog.set_default_widget(Some(&ok_button));
        dialog.present();
        ok_button.grab_focus();
    }
}
