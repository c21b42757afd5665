use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, plot};

pub struct RustyLinesApp {
    pub state: AppState,
}

impl RustyLinesApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Ctrl/Cmd+O opens a spectrum, M measures the selected line.
    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let (open, measure) = ctx.input(|i| {
            (
                i.modifiers.command && i.key_pressed(egui::Key::O),
                !i.modifiers.command && i.key_pressed(egui::Key::M),
            )
        });
        if open {
            panels::open_file_dialog(&mut self.state);
        }
        if measure && self.state.spectrum.is_some() {
            self.state.measure_selected();
        }
    }
}

impl eframe::App for RustyLinesApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_shortcuts(ctx);

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: line selection and results ----
        egui::SidePanel::left("line_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: plots ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::central_plots(ui, &self.state);
        });
    }
}
