use eframe::egui::{Color32, Ui};
use egui_plot::{HLine, Legend, Line, Plot, PlotPoints, Points, VLine};
use rusty_lines::analysis::AnalysisInterval;
use rusty_lines::data::model::SpectrumAccess;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Central panel layout
// ---------------------------------------------------------------------------

/// Full spectrum on top, velocity plots of the current line below.
pub fn central_plots(ui: &mut Ui, state: &AppState) {
    if state.spectrum.is_none() && state.model.is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a spectrum to measure lines  (File → Open spectrum…)");
        });
        return;
    }

    let height = ui.available_height();
    if state.spectrum.is_some() {
        spectrum_plot(ui, state, height * 0.4);
    }
    let rest = ui.available_height();
    let n_velocity = usize::from(state.cut.is_some()) + usize::from(state.model.is_some());
    if n_velocity > 0 {
        let h = rest / n_velocity as f32 - 4.0;
        if state.cut.is_some() {
            velocity_plot(ui, state, h);
        }
        if state.model.is_some() {
            model_plot(ui, state, h);
        }
    }
}

// ---------------------------------------------------------------------------
// Spectrum vs observed wavelength
// ---------------------------------------------------------------------------

fn spectrum_plot(ui: &mut Ui, state: &AppState, height: f32) {
    let Some(spec) = &state.spectrum else { return };

    let interval = state.interval().ok();

    Plot::new("spectrum_plot")
        .height(height)
        .legend(Legend::default())
        .x_axis_label("Observed wavelength [Å]")
        .y_axis_label("Flux")
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            let flux: PlotPoints = spec
                .wavelengths()
                .iter()
                .zip(spec.flux())
                .map(|(&w, &f)| [w, f])
                .collect();
            plot_ui.line(Line::new(flux).name("flux").color(Color32::LIGHT_GRAY).width(1.0));

            let sig: PlotPoints = spec
                .wavelengths()
                .iter()
                .zip(spec.flux_error())
                .map(|(&w, &s)| [w, s])
                .collect();
            plot_ui.line(Line::new(sig).name("σ").color(Color32::DARK_RED).width(1.0));

            if let Some(cont) = spec.continuum() {
                let cont: PlotPoints = spec
                    .wavelengths()
                    .iter()
                    .zip(cont)
                    .map(|(&w, &c)| [w, c])
                    .collect();
                plot_ui.line(Line::new(cont).name("continuum").color(Color32::GOLD).width(1.5));
            }

            for line in &state.lines {
                let name = line.transition().name();
                let color = state.color_map.color_for(name);
                plot_ui.vline(
                    VLine::new(line.observed_center().angstrom())
                        .name(name)
                        .color(color)
                        .width(1.5),
                );
                if let Some(interval) = &interval {
                    let (lo, hi) = interval.to_observed(line.wrest(), line.z());
                    for edge in [lo, hi] {
                        plot_ui.vline(
                            VLine::new(edge.angstrom())
                                .color(state.color_map.shade_for(name))
                                .width(1.0),
                        );
                    }
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Normalized flux and N_a(v) of the last measured line
// ---------------------------------------------------------------------------

fn velocity_plot(ui: &mut Ui, state: &AppState, height: f32) {
    let Some((name, cut)) = &state.cut else { return };
    let color = state.color_map.color_for(name);

    Plot::new("velocity_plot")
        .height(height)
        .legend(Legend::default())
        .x_axis_label("Velocity [km/s]")
        .y_axis_label("Normalized flux")
        .show(ui, |plot_ui| {
            let flux: PlotPoints = cut.velo.iter().zip(&cut.flux).map(|(&v, &f)| [v, f]).collect();
            plot_ui.line(Line::new(flux).name(name).color(color).width(1.5));

            let sig: PlotPoints = cut.velo.iter().zip(&cut.sig).map(|(&v, &s)| [v, s]).collect();
            plot_ui.line(Line::new(sig).name("σ").color(Color32::DARK_RED).width(1.0));

            // N_a(v) rescaled onto the flux axis.
            let peak = state.aod.iter().map(|p| p.na).fold(0.0_f64, f64::max);
            if peak > 0.0 {
                let na: PlotPoints = state
                    .aod
                    .iter()
                    .map(|p| [p.velocity, p.na / peak])
                    .collect();
                plot_ui.line(
                    Line::new(na)
                        .name(format!("N_a(v) / {peak:.2e}"))
                        .color(Color32::LIGHT_BLUE)
                        .width(1.0),
                );
                let saturated: PlotPoints = state
                    .aod
                    .iter()
                    .filter(|p| p.saturated)
                    .map(|p| [p.velocity, p.na / peak])
                    .collect();
                plot_ui.points(Points::new(saturated).name("saturated").color(Color32::RED).radius(3.0));
            }

            plot_ui.hline(HLine::new(1.0).color(Color32::GRAY));
            plot_ui.hline(HLine::new(0.0).color(Color32::GRAY));
            if let Ok(AnalysisInterval::Velocity { lo, hi }) = state.interval() {
                plot_ui.vline(VLine::new(lo.km_per_s()).color(Color32::GRAY));
                plot_ui.vline(VLine::new(hi.km_per_s()).color(Color32::GRAY));
            }
        });
}

// ---------------------------------------------------------------------------
// Synthetic Voigt profile
// ---------------------------------------------------------------------------

fn model_plot(ui: &mut Ui, state: &AppState, height: f32) {
    let Some(model) = &state.model else { return };
    let name = model.line.transition().name();

    Plot::new("model_plot")
        .height(height)
        .legend(Legend::default())
        .x_axis_label("Velocity [km/s]")
        .y_axis_label("Model flux")
        .show(ui, |plot_ui| {
            let points: PlotPoints = model
                .velo
                .iter()
                .zip(&model.flux)
                .map(|(&v, &f)| [v, f])
                .collect();
            plot_ui.line(
                Line::new(points)
                    .name(format!("{name} logN={:.2} b={:.1}", model.log_n, model.b))
                    .color(state.color_map.color_for(name))
                    .width(1.5),
            );
            plot_ui.hline(HLine::new(1.0).color(Color32::GRAY));
        });
}
