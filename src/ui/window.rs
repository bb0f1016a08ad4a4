// Main window for wmark
// Owns the image session, binds it to the grid and drives add / watermark / export

use gtk4::prelude::*;
use gtk4::{
    glib, Align, Application, ApplicationWindow, Box as GtkBox, Button, ContentFit, CssProvider,
    Entry, Label, Orientation, Picture, PolicyType, ScrolledWindow, Window,
    STYLE_PROVIDER_PRIORITY_APPLICATION,
};
use image::DynamicImage;
use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::rc::{Rc, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::full_image_dialog::DialogPresenter;
use super::grid_view::ImageGridView;
use super::position_dialog::choose_position;
use super::texture::TextureCache;
use crate::config::Config;
use crate::export::{ExportEvent, ExportJob};
use crate::grid::{GridBinder, GridCallbacks, ROW_WIDTH};
use crate::image_loader::{load_image, open_image, LoadedImage};
use crate::models::{ImageId, ImageSession, SessionImage};
use crate::scanner::expand_inputs;
use crate::watermark::{default_mark, MarkerPosition};

const DIALOG_MARGIN: i32 = 12;
const STRIP_THUMB_SIZE: i32 = 72;
const POLL_INTERVAL: Duration = Duration::from_millis(16);

const CSS: &str = r#"
.image-grid { background-color: #111111; }
.image-row { padding: 2px; }
.image-cell { border-radius: 4px; }
.strip { background-color: #1a1a1a; padding: 6px; }
.strip button { padding: 0; }
.status-bar { padding: 4px 8px; font-family: monospace; }
"#;

fn load_css() {
    let provider = CssProvider::new();
    provider.load_from_string(CSS);
    if let Some(display) = gdk4::Display::default() {
        gtk4::style_context_add_provider_for_display(
            &display,
            &provider,
            STYLE_PROVIDER_PRIORITY_APPLICATION,
        );
    }
}

fn default_home_dir() -> Option<PathBuf> {
    directories::UserDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

fn expand_path_input(input: &str) -> PathBuf {
    if input == "~" || input.starts_with("~/") {
        if let Some(home) = default_home_dir() {
            if input == "~" {
                return home;
            }
            return home.join(input.trim_start_matches("~/"));
        }
    }
    PathBuf::from(input)
}

/// What a finished background load feeds into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadTarget {
    Append,
    Replace,
}

type LoadResults = Vec<(PathBuf, Result<LoadedImage, String>)>;

struct DialogShell {
    dialog: Window,
    content: GtkBox,
}

/// Main window: grid, thumbnail strip, action bar and status line.
pub struct MainWindow {
    self_weak: Weak<MainWindow>,
    window: ApplicationWindow,
    config: Config,
    mark: DynamicImage,
    session: RefCell<ImageSession>,
    binder: RefCell<GridBinder<SessionImage>>,
    grid_view: ImageGridView,
    textures: Rc<TextureCache>,
    strip: GtkBox,
    status_label: Label,
    add_button: Button,
    watermark_button: Button,
    save_button: Button,
    position: Cell<MarkerPosition>,
    busy: Cell<bool>,
    refresh_pending: Cell<bool>,
}

impl MainWindow {
    pub fn new(app: &Application, initial: &[PathBuf]) -> Rc<Self> {
        load_css();

        let config = Config::from_env();
        let mark = match config.mark_path.as_deref() {
            Some(path) => open_image(path).unwrap_or_else(|err| {
                warn!(error = ?err, "Failed to load logo, using built-in mark");
                default_mark()
            }),
            None => default_mark(),
        };

        let window = ApplicationWindow::builder()
            .application(app)
            .title("wmark")
            .default_width(900)
            .default_height(820)
            .build();

        let root = GtkBox::new(Orientation::Vertical, 0);

        let action_bar = GtkBox::new(Orientation::Horizontal, 8);
        action_bar.set_margin_start(8);
        action_bar.set_margin_end(8);
        action_bar.set_margin_top(6);
        action_bar.set_margin_bottom(6);
        let add_button = Button::with_label("Add images");
        let watermark_button = Button::with_label("Place watermark");
        let save_button = Button::with_label("Save all");
        save_button.add_css_class("suggested-action");
        action_bar.append(&add_button);
        action_bar.append(&watermark_button);
        let spacer = GtkBox::new(Orientation::Horizontal, 0);
        spacer.set_hexpand(true);
        action_bar.append(&spacer);
        action_bar.append(&save_button);
        root.append(&action_bar);

        let textures = Rc::new(TextureCache::new());
        let grid_view = ImageGridView::new(textures.clone());
        root.append(grid_view.widget());

        let strip = GtkBox::new(Orientation::Horizontal, 6);
        strip.add_css_class("strip");
        let strip_scroller = ScrolledWindow::builder()
            .hscrollbar_policy(PolicyType::Automatic)
            .vscrollbar_policy(PolicyType::Never)
            .min_content_height(STRIP_THUMB_SIZE + 12)
            .child(&strip)
            .build();
        root.append(&strip_scroller);

        let status_label = Label::new(None);
        status_label.set_halign(Align::Start);
        status_label.add_css_class("status-bar");
        root.append(&status_label);

        window.set_child(Some(&root));

        let session = ImageSession::new(config.max_images);
        let presenter = Rc::new(DialogPresenter::new(&window));

        let main_window = Rc::new_cyclic(|weak: &Weak<Self>| {
            let on_remove = weak.clone();
            let on_replace = weak.clone();
            let on_reposition = weak.clone();
            let callbacks = GridCallbacks::new(
                move |index| {
                    if let Some(window) = on_remove.upgrade() {
                        window.remove_image(index);
                    }
                },
                move |index| {
                    if let Some(window) = on_replace.upgrade() {
                        window.begin_replace(index);
                    }
                },
            )
            .with_reposition(move |index| {
                if let Some(window) = on_reposition.upgrade() {
                    window.reposition(index);
                }
            });

            Self {
                self_weak: weak.clone(),
                window,
                config,
                mark,
                binder: RefCell::new(GridBinder::new(session.snapshot(), callbacks, presenter)),
                session: RefCell::new(session),
                grid_view,
                textures,
                strip,
                status_label,
                add_button,
                watermark_button,
                save_button,
                position: Cell::new(MarkerPosition::default()),
                busy: Cell::new(false),
                refresh_pending: Cell::new(false),
            }
        });

        main_window.connect_signals();
        main_window.refresh();

        if !initial.is_empty() {
            main_window.load_paths(expand_inputs(initial), LoadTarget::Append);
        }

        main_window
    }

    pub fn present(&self) {
        self.window.present();
    }

    pub fn set_status(&self, status: &str) {
        self.status_label.set_text(status);
    }

    fn connect_signals(&self) {
        let window_weak = self.self_weak.clone();
        self.grid_view.connect_activate(move |index| {
            if let Some(window) = window_weak.upgrade() {
                let result = window.binder.borrow().activate(index);
                if let Err(err) = result {
                    warn!(error = %err, "Tap on stale cell");
                }
            }
        });

        let window_weak = self.self_weak.clone();
        self.grid_view.connect_long_activate(move |index| {
            if let Some(window) = window_weak.upgrade() {
                let result = window.binder.borrow().long_activate(index);
                if let Err(err) = result {
                    warn!(error = %err, "Long press on stale cell");
                }
            }
        });

        let window_weak = self.self_weak.clone();
        self.add_button.connect_clicked(move |_| {
            if let Some(window) = window_weak.upgrade() {
                window.prompt_paths(LoadTarget::Append);
            }
        });

        let window_weak = self.self_weak.clone();
        self.watermark_button.connect_clicked(move |_| {
            if let Some(window) = window_weak.upgrade() {
                window.prompt_watermark();
            }
        });

        let window_weak = self.self_weak.clone();
        self.save_button.connect_clicked(move |_| {
            if let Some(window) = window_weak.upgrade() {
                window.save_all();
            }
        });
    }

    /// Pushes the session's sequence into the binder and rebuilds the grid and strip.
    fn refresh(&self) {
        self.refresh_pending.set(false);
        let snapshot = self.session.borrow().snapshot();
        {
            let mut binder = self.binder.borrow_mut();
            binder.refresh(snapshot);
            self.grid_view.set_rows(&binder);
        }
        self.rebuild_strip();
        self.update_actions();
    }

    /// Grid callbacks can fire while the binder is borrowed, so the rebuild runs on idle.
    fn schedule_refresh(&self) {
        if self.refresh_pending.replace(true) {
            return;
        }
        let weak_self = self.self_weak.clone();
        glib::idle_add_local_once(move || {
            if let Some(window) = weak_self.upgrade() {
                window.refresh();
            }
        });
    }

    fn update_actions(&self) {
        let session = self.session.borrow();
        let busy = self.busy.get();
        self.add_button.set_sensitive(!busy && session.remaining() > 0);
        self.watermark_button
            .set_sensitive(!busy && session.images().iter().any(|img| !img.watermarked));
        self.save_button.set_sensitive(!busy && !session.is_empty());
    }

    fn rebuild_strip(&self) {
        while let Some(child) = self.strip.first_child() {
            self.strip.remove(&child);
        }

        let session = self.session.borrow();
        for image in session.images() {
            let picture = Picture::for_paintable(&self.textures.cell_texture(image));
            picture.set_content_fit(ContentFit::Cover);
            picture.set_size_request(STRIP_THUMB_SIZE, STRIP_THUMB_SIZE);

            let button = Button::new();
            button.set_child(Some(&picture));
            button.set_tooltip_text(Some(&format!("Remove {}", image.display_name())));

            let window_weak = self.self_weak.clone();
            let id = image.id;
            button.connect_clicked(move |_| {
                if let Some(window) = window_weak.upgrade() {
                    // The strip may be stale until the next refresh.
                    let index = window.session.borrow().position_of(id);
                    if let Some(index) = index {
                        window.remove_image(index);
                    }
                }
            });
            self.strip.append(&button);
        }
    }

    /// Session edits wait while a load or export is running.
    fn edits_blocked(&self) -> bool {
        if self.busy.get() {
            self.set_status("Wait for the current load or save to finish");
        }
        self.busy.get()
    }

    fn remove_image(&self, index: usize) {
        if self.edits_blocked() {
            return;
        }
        let result = self.session.borrow_mut().remove(index);
        match result {
            Ok(removed) => {
                self.set_status(&format!("Removed {}", removed.display_name()));
                self.schedule_refresh();
            }
            Err(err) => self.set_status(&format!("Cannot remove: {}", err)),
        }
    }

    fn begin_replace(&self, index: usize) {
        if self.edits_blocked() {
            return;
        }
        let result = self.session.borrow_mut().request_replace(index);
        match result {
            Ok(_) => self.prompt_paths(LoadTarget::Replace),
            Err(err) => self.set_status(&format!("Cannot replace: {}", err)),
        }
    }

    /// Dismissing the full-image dialog offers to move the watermark.
    fn reposition(&self, index: usize) {
        debug!(index, "Repositioning watermark");
        self.grid_view.scroll_to_row(index / ROW_WIDTH);
        if self.edits_blocked() {
            return;
        }
        self.prompt_watermark();
    }

    fn build_dialog_shell(&self, title: &str, width: i32) -> DialogShell {
        let dialog = Window::builder()
            .title(title)
            .transient_for(&self.window)
            .modal(true)
            .resizable(false)
            .default_width(width)
            .build();

        let content = GtkBox::new(Orientation::Vertical, 12);
        content.set_margin_top(DIALOG_MARGIN);
        content.set_margin_bottom(DIALOG_MARGIN);
        content.set_margin_start(DIALOG_MARGIN);
        content.set_margin_end(DIALOG_MARGIN);
        dialog.set_child(Some(&content));

        DialogShell { dialog, content }
    }

    /// Asks for image paths. Append accepts files and folders separated by `;`,
    /// Replace takes the first image found.
    fn prompt_paths(&self, target: LoadTarget) {
        let title = match target {
            LoadTarget::Append => "Add images",
            LoadTarget::Replace => "Replace image",
        };
        let DialogShell { dialog, content } = self.build_dialog_shell(title, 520);

        if target == LoadTarget::Append {
            let session = self.session.borrow();
            let hint = format!(
                "{} of {} slots free. Separate several paths with ';'.",
                session.remaining(),
                session.max_images()
            );
            content.append(&Label::new(Some(&hint)));
        }

        let entry = Entry::new();
        entry.set_hexpand(true);
        entry.set_placeholder_text(Some("/path/to/image.jpg"));
        content.append(&entry);

        let buttons = GtkBox::new(Orientation::Horizontal, 8);
        buttons.set_halign(Align::End);
        let cancel_button = Button::with_label("Cancel");
        let open_button = Button::with_label("Open");
        buttons.append(&cancel_button);
        buttons.append(&open_button);
        content.append(&buttons);

        // Set once the paths were handed to the loader, so closing does not cancel a replace.
        let accepted = Rc::new(Cell::new(false));

        let window_weak = self.self_weak.clone();
        let dialog_weak = dialog.downgrade();
        let entry_for_open = entry.clone();
        let accepted_for_open = accepted.clone();
        let open_action = Rc::new(move || {
            let inputs: Vec<PathBuf> = entry_for_open
                .text()
                .split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(expand_path_input)
                .collect();
            if inputs.is_empty() {
                return;
            }
            if let Some(window) = window_weak.upgrade() {
                let mut paths = expand_inputs(&inputs);
                if target == LoadTarget::Replace {
                    paths.truncate(1);
                }
                if paths.is_empty() {
                    window.set_status("No images found");
                    return;
                }
                accepted_for_open.set(true);
                window.load_paths(paths, target);
            }
            if let Some(dialog) = dialog_weak.upgrade() {
                dialog.close();
            }
        });

        let open_action_for_button = open_action.clone();
        open_button.connect_clicked(move |_| open_action_for_button());
        entry.connect_activate(move |_| open_action());

        let dialog_weak = dialog.downgrade();
        cancel_button.connect_clicked(move |_| {
            if let Some(dialog) = dialog_weak.upgrade() {
                dialog.close();
            }
        });

        let window_weak = self.self_weak.clone();
        dialog.connect_close_request(move |_| {
            if target == LoadTarget::Replace && !accepted.get() {
                if let Some(window) = window_weak.upgrade() {
                    window.session.borrow_mut().cancel_replace();
                    window.set_status("Replace cancelled");
                }
            }
            glib::Propagation::Proceed
        });

        dialog.set_default_widget(Some(&open_button));
        dialog.present();
        entry.grab_focus();
    }

    /// Decodes `paths` on a worker thread and applies the result on the main loop.
    fn load_paths(&self, paths: Vec<PathBuf>, target: LoadTarget) {
        self.busy.set(true);
        self.update_actions();
        self.set_status(&format!("Loading {} image(s)...", paths.len()));

        let (tx, rx) = flume::bounded::<LoadResults>(1);
        std::thread::spawn(move || {
            let results: LoadResults = paths
                .into_iter()
                .map(|path| {
                    let loaded = load_image(&path).map_err(|err| format!("{:#}", err));
                    (path, loaded)
                })
                .collect();
            let _ = tx.send(results);
        });

        let weak_self = self.self_weak.clone();
        glib::timeout_add_local(POLL_INTERVAL, move || match rx.try_recv() {
            Ok(results) => {
                if let Some(window) = weak_self.upgrade() {
                    window.busy.set(false);
                    window.apply_loaded(results, target);
                }
                glib::ControlFlow::Break
            }
            Err(flume::TryRecvError::Empty) => glib::ControlFlow::Continue,
            Err(flume::TryRecvError::Disconnected) => {
                if let Some(window) = weak_self.upgrade() {
                    window.busy.set(false);
                    window.set_status("Loading failed");
                    window.update_actions();
                }
                glib::ControlFlow::Break
            }
        });
    }

    fn apply_loaded(&self, results: LoadResults, target: LoadTarget) {
        let mut loaded = Vec::with_capacity(results.len());
        let mut unreadable = 0;
        for (path, result) in results {
            match result {
                Ok(image) => loaded.push(image),
                Err(error) => {
                    warn!(?path, %error, "Failed to load image");
                    unreadable += 1;
                }
            }
        }

        match target {
            LoadTarget::Append => {
                let summary = self.session.borrow_mut().add_batch(loaded);
                let mut status = format!("Added {}", summary.added);
                if summary.duplicates > 0 {
                    status.push_str(&format!(", {} already loaded", summary.duplicates));
                }
                if summary.over_limit > 0 {
                    let max = self.session.borrow().max_images();
                    status.push_str(&format!(", {} over the limit of {}", summary.over_limit, max));
                }
                if unreadable > 0 {
                    status.push_str(&format!(", {} unreadable", unreadable));
                }
                self.set_status(&status);
            }
            LoadTarget::Replace => {
                let status = {
                    let mut session = self.session.borrow_mut();
                    match loaded.into_iter().next() {
                        Some(image) => match session.complete_replace(image) {
                            Ok(index) => format!("Replaced image {}", index + 1),
                            Err(err) => {
                                session.cancel_replace();
                                format!("Cannot replace: {}", err)
                            }
                        },
                        None => {
                            session.cancel_replace();
                            "Replacement could not be read".to_string()
                        }
                    }
                };
                self.set_status(&status);
            }
        }
        self.refresh();
    }

    fn prompt_watermark(&self) {
        let window_weak = self.self_weak.clone();
        choose_position(&self.window, self.position.get(), move |position| {
            if let Some(window) = window_weak.upgrade() {
                window.position.set(position);
                window.stamp(position);
            }
        });
    }

    fn stamp(&self, position: MarkerPosition) {
        if self.edits_blocked() {
            return;
        }
        let settings = self.config.watermark_settings();
        let result = self
            .session
            .borrow_mut()
            .apply_watermark(&self.mark, position, &settings);
        match result {
            Ok(count) => self.set_status(&format!(
                "Watermarked {} image(s) at {}",
                count,
                position.label().to_lowercase()
            )),
            Err(err) => self.set_status(&err.to_string()),
        }
        self.refresh();
    }

    fn save_all(&self) {
        let (ids, images): (Vec<ImageId>, Vec<DynamicImage>) = {
            let session = self.session.borrow();
            if session.is_empty() {
                self.set_status("Nothing to save");
                return;
            }
            session
                .images()
                .iter()
                .map(|img| (img.id, img.pixels.clone()))
                .unzip()
        };

        let dir = self.config.export_dir.clone();
        let total = images.len();
        info!(total, ?dir, "Saving images");
        self.busy.set(true);
        self.update_actions();
        self.set_status(&format!("Saving 0/{} to {}", total, dir.display()));

        let job = ExportJob::spawn(images, dir.clone(), self.config.jpeg_quality);
        let weak_self = self.self_weak.clone();
        glib::timeout_add_local(POLL_INTERVAL, move || {
            let Some(window) = weak_self.upgrade() else {
                return glib::ControlFlow::Break;
            };
            loop {
                match job.events().try_recv() {
                    Ok(ExportEvent::Saved { index, .. }) => {
                        window.set_status(&format!(
                            "Saving {}/{} to {}",
                            index + 1,
                            total,
                            dir.display()
                        ));
                    }
                    Ok(ExportEvent::Failed { index, error }) => {
                        warn!(index, %error, "Image not saved");
                    }
                    Ok(ExportEvent::Finished { saved, failed }) => {
                        window.finish_export(&dir, &ids, saved, failed);
                        return glib::ControlFlow::Break;
                    }
                    Err(flume::TryRecvError::Empty) => return glib::ControlFlow::Continue,
                    Err(flume::TryRecvError::Disconnected) => {
                        window.finish_export(&dir, &ids, 0, total);
                        return glib::ControlFlow::Break;
                    }
                }
            }
        });
    }

    /// A fully successful export drops the exported images; otherwise they stay for a retry.
    fn finish_export(&self, dir: &Path, exported: &[ImageId], saved: usize, failed: usize) {
        self.busy.set(false);
        if failed == 0 {
            self.session.borrow_mut().remove_ids(exported);
            self.textures.clear();
            self.set_status(&format!("Saved {} image(s) to {}", saved, dir.display()));
        } else {
            self.set_status(&format!(
                "Saved {} to {}, {} failed; images kept for another try",
                saved,
                dir.display(),
                failed
            ));
        }
        self.refresh();
    }
}
