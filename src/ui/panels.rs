use std::fmt::Display;

use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use rusty_charts::chart::ChartKind;
use rusty_charts::state::AppState;
use rusty_charts::summary::SummaryConfig;

const INPUT_HINT: &str = "A:10, B:20, C:15\n\nor JSON:\n{\"labels\": [\"A\", \"B\"], \"values\": [1, 2]}";

// ---------------------------------------------------------------------------
// Left side panel – input and chart options
// ---------------------------------------------------------------------------

/// Render the left input panel.
pub fn input_panel(ui: &mut Ui, state: &mut AppState) {
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading("Data");
            ui.separator();

            ui.add(
                egui::TextEdit::multiline(&mut state.input_text)
                    .hint_text(INPUT_HINT)
                    .code_editor()
                    .desired_rows(12)
                    .desired_width(f32::INFINITY),
            );
            ui.horizontal(|ui: &mut Ui| {
                if ui.button("Apply").clicked() {
                    if let Err(e) = state.ingest_text() {
                        report(state, "Failed to parse input", e);
                    }
                }
                if ui.button("Import…").clicked() {
                    open_file_dialog(state);
                }
            });
            ui.add_space(8.0);

            // ---- Chart options ----
            ui.heading("Chart");
            ui.separator();

            egui::ComboBox::from_id_salt("chart_kind")
                .selected_text(state.chart_kind.as_str())
                .show_ui(ui, |ui: &mut Ui| {
                    for kind in ChartKind::ALL {
                        ui.selectable_value(&mut state.chart_kind, kind, kind.as_str());
                    }
                });

            egui::Grid::new("chart_labels")
                .num_columns(2)
                .show(ui, |ui: &mut Ui| {
                    ui.label("Title");
                    ui.text_edit_singleline(&mut state.labels.title);
                    ui.end_row();
                    ui.label("X axis");
                    ui.text_edit_singleline(&mut state.labels.x_label);
                    ui.end_row();
                    ui.label("Y axis");
                    ui.text_edit_singleline(&mut state.labels.y_label);
                    ui.end_row();
                });

            ui.horizontal(|ui: &mut Ui| {
                if ui.button("Generate").clicked() {
                    if let Err(e) = state.render() {
                        report(state, "Failed to render chart", e);
                    }
                }
                if ui.button("Save…").clicked() {
                    save_file_dialog(state);
                }
                if ui.button("AI summary").clicked() {
                    request_summary(state);
                }
            });
            ui.add_space(8.0);

            // ---- Summary / preview ----
            if let Some(summary) = &state.summary {
                ui.strong("Summary");
                ui.label(summary);
                ui.add_space(8.0);
            }

            if let Some(preview) = state.preview() {
                egui::CollapsingHeader::new(RichText::new("Current data").strong())
                    .default_open(false)
                    .show(ui, |ui: &mut Ui| {
                        ui.monospace(preview);
                    });
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Import…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("Save chart…").clicked() {
                save_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(ds.describe());
            ui.separator();
        }

        if let Some(msg) = &state.status_message {
            let color = if msg.starts_with("Error") {
                Color32::RED
            } else {
                ui.visuals().text_color()
            };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

fn report(state: &mut AppState, context: &str, err: impl Display) {
    log::error!("{context}: {err:#}");
    state.status_message = Some(format!("Error: {err:#}"));
}

// ---------------------------------------------------------------------------
// Dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Import data")
        .add_filter("Supported files", &["json", "csv", "xlsx"])
        .add_filter("JSON", &["json"])
        .add_filter("CSV", &["csv"])
        .add_filter("Excel", &["xlsx"])
        .pick_file();

    if let Some(path) = file {
        if let Err(e) = state.import_file(&path) {
            report(state, "Failed to load file", e);
        }
    }
}

pub fn save_file_dialog(state: &mut AppState) {
    if state.figure.is_none() {
        report(state, "Failed to save chart", "nothing to save");
        return;
    }

    let file = rfd::FileDialog::new()
        .set_title("Save chart")
        .set_file_name("chart.png")
        .add_filter("PNG", &["png"])
        .add_filter("JPEG", &["jpg", "jpeg"])
        .add_filter("PDF", &["pdf"])
        .add_filter("SVG", &["svg"])
        .save_file();

    if let Some(path) = file {
        if let Err(e) = state.export(&path) {
            report(state, "Failed to save chart", e);
        }
    }
}

fn request_summary(state: &mut AppState) {
    if let Err(e) = state.request_summary(&SummaryConfig::default_path()) {
        report(state, "AI summary failed", e);
    }
}
