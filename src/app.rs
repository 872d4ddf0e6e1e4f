use std::time::{Duration, Instant};

use eframe::egui;

use crate::query::Theme;
use crate::state::AppState;
use crate::ui::{panels, plot};

/// How often to re-check while a lookup is pending or being retried.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct SpectralDisplayApp {
    pub state: AppState,
}

impl SpectralDisplayApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for SpectralDisplayApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.state.poll(Instant::now());

        if let Some(theme) = self.state.pending_theme.take() {
            ctx.set_visuals(match theme {
                Theme::Dark => egui::Visuals::dark(),
                Theme::Light => egui::Visuals::light(),
            });
        }

        let waiting = self.state.selection.is_resolving()
            || (self.state.params.has_inputs() && self.state.selection.files().is_empty());
        if waiting {
            ctx.request_repaint_after(POLL_INTERVAL);
        }

        // ---- Top panel: data select, load, notebook ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: target and files ----
        egui::SidePanel::left("files_panel")
            .default_width(320.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: viewer ----
        let resolving = self.state.selection.is_resolving();
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::spectral_plot(ui, &mut self.state.session, resolving);
        });
    }
}
