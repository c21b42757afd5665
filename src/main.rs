mod app;
mod color;
mod state;
mod ui;

use std::path::PathBuf;

use anyhow::{Context, Result};
use app::RustyLinesApp;
use clap::Parser;
use eframe::egui;
use rusty_lines::config::AnalysisConfig;
use rusty_lines::data::linelist::LineList;
use rusty_lines::data::loader::load_line_list;
use state::AppState;

/// Quick-look viewer for absorption line measurements.
///
/// With WREST LOGN B, a Voigt profile of the closest transition is
/// synthesised and measured alongside any loaded spectrum.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Rest wavelength of the transition to synthesise (Å)
    #[arg(requires_all = ["logn", "b"])]
    wrest: Option<f64>,

    /// log10 column density (cm^-2)
    logn: Option<f64>,

    /// Doppler parameter (km/s)
    b: Option<f64>,

    /// Spectrum to open (parquet, json or csv)
    #[arg(short, long)]
    spectrum: Option<PathBuf>,

    /// Line list replacing the built-in ISM list (json or csv)
    #[arg(short, long)]
    linelist: Option<PathBuf>,

    /// Analysis configuration (json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Absorber redshift
    #[arg(short, long, default_value_t = 0.0)]
    z: f64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AnalysisConfig::from_json_file(path)?,
        None => AnalysisConfig::default(),
    };
    let line_list = match &args.linelist {
        Some(path) => load_line_list(path)?,
        None => LineList::ism(),
    };
    log::info!("Using {} transitions", line_list.len());

    let mut state = AppState::new(config, line_list);
    state.z = args.z;
    if let Some(path) = &args.spectrum {
        state.open_spectrum(path);
    }
    if let (Some(wrest), Some(logn), Some(b)) = (args.wrest, args.logn, args.b) {
        state.set_model(wrest, logn, b);
    }

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Rusty Lines – Absorption Line Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(RustyLinesApp::new(state)))),
    )
    .map_err(|e| anyhow::anyhow!("{e}"))
    .context("running viewer")
}
