use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::format::{classify, is_multi_visit};
use crate::query::{join_file_list, RequestParameters};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Top bar – data select, load and notebook download
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open local files…").clicked() {
                open_files_dialog(state);
                ui.close_menu();
            }
            if ui.button("Download Jupyter notebook…").clicked() {
                save_notebook_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();
        data_select(ui, state);

        let has_selection = !state.selection.selected_labels().is_empty();
        if ui
            .add_enabled(has_selection, egui::Button::new("Load Data"))
            .clicked()
        {
            state.load_selected();
        }

        let has_files = !state.selection.files().is_empty();
        if ui
            .add_enabled(has_files, egui::Button::new("Download Jupyter notebook"))
            .on_hover_text("Download a Jdaviz Jupyter notebook for these data")
            .clicked()
        {
            save_notebook_dialog(state);
        }

        ui.separator();

        if state.selection.is_resolving() {
            ui.spinner();
            ui.label("Resolving files…");
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

/// Multi-select dropdown over the available labels.
fn data_select(ui: &mut Ui, state: &mut AppState) {
    let available = state.selection.available_labels().to_vec();
    let selected = state.selection.selected_labels();
    let text = match selected.len() {
        0 => "Select Data Files".to_string(),
        1 => selected[0].clone(),
        n => format!("{n} files selected"),
    };

    egui::ComboBox::from_id_salt("data_select")
        .selected_text(text)
        .width(260.0)
        .show_ui(ui, |ui: &mut Ui| {
            if available.is_empty() {
                ui.label("No files available");
            }
            for label in &available {
                let mut checked = state.selection.is_selected(label);
                if ui.checkbox(&mut checked, label).changed() {
                    state.selection.toggle(label);
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Left side panel – navigation form, resolved files, loaded data
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Target");
    ui.separator();

    egui::Grid::new("nav_form")
        .num_columns(2)
        .show(ui, |ui: &mut Ui| {
            ui.label("SDSS ID");
            ui.text_edit_singleline(&mut state.nav.target_id);
            ui.end_row();

            ui.label("Release");
            ui.text_edit_singleline(&mut state.nav.release);
            ui.end_row();
        });
    ui.label("Files (comma separated)");
    ui.add(
        egui::TextEdit::multiline(&mut state.nav.files)
            .desired_rows(2)
            .hint_text("optional; overrides the lookup"),
    );
    if ui.button("Go").clicked() {
        let params = state.nav.to_params();
        state.navigate(params);
    }

    ui.add_space(8.0);
    ui.heading("Files");
    ui.separator();

    if state.selection.files().is_empty() {
        ui.label("No spectral files resolved.");
    } else {
        files_table(ui, state);
    }

    ui.add_space(8.0);
    ui.heading("Loaded data");
    ui.separator();

    ScrollArea::vertical()
        .id_salt("loaded_data")
        .auto_shrink([false, true])
        .show(ui, |ui: &mut Ui| {
            for item in state.session.items() {
                let mut text = RichText::new(&item.label).color(item.color);
                if item.spectrum.is_none() {
                    text = text.italics();
                }
                let mut hover = format!(
                    "{}\n{}",
                    item.format.map_or("auto", |f| f.name()),
                    item.location
                );
                if let Some(sp) = &item.spectrum {
                    for (key, value) in &sp.meta {
                        hover.push_str(&format!("\n{key}: {value}"));
                    }
                }
                ui.label(text).on_hover_text(hover);
            }
        });
}

fn files_table(ui: &mut Ui, state: &AppState) {
    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .max_scroll_height(240.0)
        .column(Column::auto())
        .column(Column::auto())
        .column(Column::auto())
        .column(Column::remainder())
        .header(20.0, |mut header| {
            header.col(|ui: &mut Ui| {
                ui.strong("Label");
            });
            header.col(|ui: &mut Ui| {
                ui.strong("Format");
            });
            header.col(|ui: &mut Ui| {
                ui.strong("List");
            });
            header.col(|ui: &mut Ui| {
                ui.strong("Location");
            });
        })
        .body(|mut body| {
            for entry in state.selection.files().entries() {
                body.row(18.0, |mut row| {
                    row.col(|ui: &mut Ui| {
                        ui.label(&entry.label);
                    });
                    row.col(|ui: &mut Ui| {
                        ui.label(classify(&entry.location).map_or("auto", |f| f.name()));
                    });
                    row.col(|ui: &mut Ui| {
                        let multi = is_multi_visit(&entry.label);
                        ui.label(if multi { "yes" } else { "" });
                    });
                    row.col(|ui: &mut Ui| {
                        ui.label(&entry.location).on_hover_text(&entry.location);
                    });
                });
            }
        });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

/// Pick local files and navigate to them as an explicit file list.
pub fn open_files_dialog(state: &mut AppState) {
    let files = rfd::FileDialog::new()
        .set_title("Open spectral data")
        .add_filter("Spectral files", &["fits", "parquet", "pq", "json", "csv"])
        .add_filter("FITS", &["fits"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_files();

    let Some(paths) = files else {
        return;
    };
    let joined = join_file_list(&paths);
    if joined.is_empty() {
        state.status_message = Some("No usable files selected".to_string());
        return;
    }
    let params = RequestParameters::new(&state.params.target_id, &state.params.release, Some(&joined));
    state.navigate(params);
}

/// Save the reproduction notebook for the current files.
pub fn save_notebook_dialog(state: &mut AppState) {
    let Some(script) = state.notebook() else {
        state.status_message = Some("Notebook export unavailable: invalid archive URL".to_string());
        return;
    };

    let file = rfd::FileDialog::new()
        .set_title("Save Jupyter notebook")
        .set_file_name(&script.filename)
        .add_filter("Jupyter notebook", &["ipynb"])
        .save_file();

    if let Some(path) = file {
        match script.write_to(&path) {
            Ok(()) => state.status_message = None,
            Err(e) => {
                log::error!("Failed to write notebook: {e}");
                state.status_message = Some(format!("Error: {e}"));
            }
        }
    }
}
