use gtk4::prelude::*;
use gtk4::{gio, Application};
use std::path::PathBuf;
use std::rc::Rc;

use crate::ui::MainWindow;

const APP_ID: &str = "com.wmark.Watermarker";

pub struct WmarkApp {
    app: Application,
}

impl WmarkApp {
    pub fn new() -> Self {
        let app = Application::builder()
            .application_id(APP_ID)
            .flags(gio::ApplicationFlags::HANDLES_OPEN)
            .build();

        app.connect_activate(|app| Self::show(app, &[]));
        app.connect_open(|app, files, _hint| {
            let paths: Vec<PathBuf> = files.iter().filter_map(|f| f.path()).collect();
            Self::show(app, &paths);
        });

        Self { app }
    }

    pub fn run(&self) -> i32 {
        self.app.run().into()
    }

    fn show(app: &Application, paths: &[PathBuf]) {
        let window: Rc<MainWindow> = MainWindow::new(app, paths);
        window.present();
        // Keep the window alive by storing it on the Application.
        unsafe {
            app.set_data("main-window", window);
        }
    }
}

impl Default for WmarkApp {
    fn default() -> Self {
        Self::new()
    }
}
