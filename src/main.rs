mod access;
mod app;
mod color;
mod config;
mod coordinator;
mod data;
mod export;
mod query;
mod session;
mod state;
mod ui;

use app::SpectralDisplayApp;
use config::Settings;
use eframe::egui;
use query::RequestParameters;
use state::AppState;

fn main() -> eframe::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("trace")).init();
    let settings = Settings::load();
    // `RUST_LOG` wins over the configured level.
    if std::env::var_os("RUST_LOG").is_none() {
        log::set_max_level(settings.level_filter());
    }

    // The navigational query string, e.g. `sdssid=23326&release=IPL3`.
    let search = std::env::args().nth(1).unwrap_or_default();
    let params = RequestParameters::parse(&search).unwrap_or_else(|e| {
        log::error!("{e}; starting without a target");
        RequestParameters::default()
    });

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([640.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Spectral Display",
        options,
        Box::new(|_cc| {
            Ok(Box::new(SpectralDisplayApp::new(AppState::new(settings, params))))
        }),
    )
}
