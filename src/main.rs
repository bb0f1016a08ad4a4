use tracing_subscriber::EnvFilter;
use wmark::app::WmarkApp;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wmark=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let app = WmarkApp::new();
    std::process::exit(app.run());
}
