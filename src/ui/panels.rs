use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use rusty_lines::analysis::{AbsLine, MeasurementFlag};
use rusty_lines::config::Frame;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – line selection and results
// ---------------------------------------------------------------------------

/// Render the left panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Line");
    ui.separator();

    let names = state.line_list.names();
    let current = state.selected.clone().unwrap_or_default();
    egui::ComboBox::from_id_salt("transition")
        .selected_text(RichText::new(&current).color(state.color_map.color_for(&current)))
        .show_ui(ui, |ui: &mut Ui| {
            for name in &names {
                let text = RichText::new(name).color(state.color_map.color_for(name));
                if ui.selectable_label(current == *name, text).clicked() {
                    state.selected = Some(name.clone());
                }
            }
        });

    egui::Grid::new("line_params")
        .num_columns(2)
        .show(ui, |ui: &mut Ui| {
            ui.label("z");
            ui.add(
                egui::DragValue::new(&mut state.z)
                    .speed(1e-4)
                    .range(-0.999..=15.0)
                    .max_decimals(6),
            );
            ui.end_row();

            ui.label("v min [km/s]");
            ui.add(egui::DragValue::new(&mut state.vmin).speed(1.0));
            ui.end_row();

            ui.label("v max [km/s]");
            ui.add(egui::DragValue::new(&mut state.vmax).speed(1.0));
            ui.end_row();

            ui.label("nσ limit");
            ui.add(
                egui::DragValue::new(&mut state.config.aodm.detection_threshold)
                    .speed(0.1)
                    .range(0.1..=10.0),
            );
            ui.end_row();
        });

    ui.horizontal(|ui: &mut Ui| {
        ui.label("EW frame:");
        ui.radio_value(&mut state.frame, Frame::Rest, "rest");
        ui.radio_value(&mut state.frame, Frame::Observer, "observed");
    });

    let can_measure = state.spectrum.is_some() && state.selected.is_some();
    if ui
        .add_enabled(can_measure, egui::Button::new("Measure"))
        .clicked()
    {
        state.measure_selected();
    }

    if let Some(model) = &state.model {
        ui.separator();
        ui.strong(format!(
            "Model {}  logN={:.2} b={:.1}",
            model.line.transition().name(),
            model.log_n,
            model.b
        ));
        ui.label(model.line.measurement().to_string());
    }

    ui.separator();
    ui.heading("Measured");

    let threshold = state.config.aodm.detection_threshold;
    let mut remove = None;
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            if state.lines.is_empty() {
                ui.label("No lines measured.");
            }
            for (idx, line) in state.lines.iter().enumerate() {
                let color = state.color_map.color_for(line.transition().name());
                ui.horizontal(|ui: &mut Ui| {
                    ui.label(
                        RichText::new(format!("{}  z={:.5}", line.transition().name(), line.z()))
                            .color(color)
                            .strong(),
                    );
                    if ui.small_button("✖").clicked() {
                        remove = Some(idx);
                    }
                });
                line_summary(ui, line, threshold);
                ui.add_space(4.0);
            }
        });
    if let Some(idx) = remove {
        state.remove_line(idx);
    }
}

fn line_summary(ui: &mut Ui, line: &AbsLine, threshold: f64) {
    let m = line.measurement();
    if let (Some(ew), Some(sig)) = (m.ew(), m.sig_ew()) {
        ui.label(format!(
            "EW = {:.1} ± {:.1} mÅ",
            ew.angstrom() * 1e3,
            sig.angstrom() * 1e3
        ));
    }
    let flag = m.flag();
    let color = match flag {
        MeasurementFlag::Detection => Color32::LIGHT_GREEN,
        MeasurementFlag::Saturated => Color32::YELLOW,
        MeasurementFlag::UpperLimit => Color32::LIGHT_BLUE,
        MeasurementFlag::NotMeasured => Color32::GRAY,
    };
    match (m.log_column(), flag) {
        (Some(log), MeasurementFlag::Saturated) => {
            ui.label(RichText::new(format!("logN > {:.2}", log.log_n)).color(color));
        }
        (_, MeasurementFlag::UpperLimit) => {
            if let Some(aodm) = &m.aodm {
                let limit = threshold * aodm.sig_column.value();
                ui.label(RichText::new(format!("logN < {:.2}", limit.log10())).color(color));
            }
        }
        (Some(log), _) => {
            ui.label(
                RichText::new(format!("logN = {:.2} ± {:.2}", log.log_n, log.sig_log_n))
                    .color(color),
            );
        }
        (None, _) => {}
    }
    let mut tag = RichText::new(format!("flag {}: {flag}", flag.code())).small();
    if flag.is_limit() {
        tag = tag.italics();
    }
    ui.label(tag);
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open spectrum…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(name) = &state.spectrum_name {
            ui.label(format!("{name}, {} lines measured", state.lines.len()));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open spectrum")
        .add_filter("Supported files", &["parquet", "pq", "json", "csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("JSON", &["json"])
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        state.open_spectrum(&path);
    }
}
