use eframe::egui::Ui;
use egui_plot::{Line, Plot, PlotBounds, PlotPoints};

use crate::session::SpecvizSession;

// ---------------------------------------------------------------------------
// Spectral plot (central panel)
// ---------------------------------------------------------------------------

/// Render every loaded spectrum in the central panel.
pub fn spectral_plot(ui: &mut Ui, session: &mut SpecvizSession, resolving: bool) {
    if session.spectrum_count() == 0 {
        ui.centered_and_justified(|ui: &mut Ui| {
            if resolving {
                ui.heading("Resolving spectral files…");
            } else if session.items().is_empty() {
                ui.heading("Select data files and press Load Data");
            } else {
                ui.heading("Loaded files have no preview in this viewer");
            }
        });
        return;
    }

    let y_range = session.take_y_range();
    let x_range = wavelength_range(session);

    Plot::new("spectral_plot")
        .legend(egui_plot::Legend::default())
        .x_axis_label("Wavelength")
        .y_axis_label("Flux")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            if let (Some((y0, y1)), Some((x0, x1))) = (y_range, x_range) {
                plot_ui.set_plot_bounds(PlotBounds::from_min_max([x0, y0], [x1, y1]));
            }

            for item in session.items() {
                let Some(sp) = &item.spectrum else {
                    continue;
                };
                // Masked pixels (NaN) are left out of the trace.
                let points: PlotPoints = sp
                    .wavelength
                    .iter()
                    .zip(sp.flux.iter())
                    .filter(|(x, y)| x.is_finite() && y.is_finite())
                    .map(|(&x, &y)| [x, y])
                    .collect();

                plot_ui.line(
                    Line::new(points)
                        .name(&item.label)
                        .color(item.color)
                        .width(1.5),
                );
            }
        });
}

fn wavelength_range(session: &SpecvizSession) -> Option<(f64, f64)> {
    let (lo, hi) = session
        .items()
        .iter()
        .filter_map(|i| i.spectrum.as_ref())
        .flat_map(|sp| sp.wavelength.iter().copied())
        .filter(|x| x.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
            (lo.min(x), hi.max(x))
        });
    (lo <= hi).then_some((lo, hi))
}
