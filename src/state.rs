use std::path::Path;

use anyhow::{Context, Result};
use rusty_lines::analysis::aodm::{apparent_column_profile, AodPixel};
use rusty_lines::analysis::{AbsLine, AnalysisInterval, CutSpectrum, LineMatch};
use rusty_lines::config::{AnalysisConfig, Frame};
use rusty_lines::data::linelist::{LineList, TransitionKey};
use rusty_lines::data::loader::load_spectrum;
use rusty_lines::data::model::{Spectrum, SpectrumAccess};
use rusty_lines::units::{ColumnDensity, Velocity, Wavelength};

use crate::color::ColorMap;

// ---------------------------------------------------------------------------
// Synthetic profile
// ---------------------------------------------------------------------------

/// A Voigt profile synthesised from (wrest, logN, b), with the engine's
/// measurement of it.
pub struct ModelProfile {
    pub line: AbsLine,
    pub log_n: f64,
    pub b: f64,
    pub velo: Vec<f64>,
    pub flux: Vec<f64>,
}

impl ModelProfile {
    /// Synthesise the line closest to `wrest` in `line_list` at z = 0.
    pub fn synthesize(
        line_list: &LineList,
        wrest: f64,
        log_n: f64,
        b: f64,
        config: &AnalysisConfig,
    ) -> Result<Self> {
        let key = TransitionKey::Wavelength {
            wrest: Wavelength::from_angstrom(wrest),
            closest: true,
        };
        let mut line = AbsLine::new(line_list, &key, 0.0)?;

        // ±max(300, 10 b) km/s sampled at b/20, enough to resolve the core.
        let vmax = (10.0 * b).max(300.0);
        let dv = (b / 20.0).clamp(0.05, 2.0);
        let n = (2.0 * vmax / dv).ceil() as usize + 1;
        let center = line.wrest();
        let velo: Vec<f64> = (0..n).map(|i| -vmax + dv * i as f64).collect();
        let wave: Vec<f64> = velo
            .iter()
            .map(|&v| center.doppler_shifted(Velocity::from_km_per_s(v)).angstrom())
            .collect();

        let flux = line
            .generate_voigt(
                &wave,
                ColumnDensity::from_log10(log_n),
                Velocity::from_km_per_s(b),
            )
            .context("synthesising Voigt profile")?;

        // Noise-free spectrum; sigma only sets the error scale of the readout.
        let spec = Spectrum::new(wave, flux.clone(), vec![0.01; n], None)?;
        let interval = AnalysisInterval::velocity(
            Velocity::from_km_per_s(-vmax),
            Velocity::from_km_per_s(vmax),
        )?;
        line.measure(&spec, &interval, Frame::Rest, &config.aodm)?;
        log::info!(
            "Synthesised {} logN={log_n:.2} b={b:.1}: {}",
            line.transition().name(),
            line.measurement()
        );

        Ok(Self {
            line,
            log_n,
            b,
            velo,
            flux,
        })
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: AnalysisConfig,

    /// Atomic data used for every line created in the viewer.
    pub line_list: LineList,

    /// Loaded spectrum (None until user loads a file).
    pub spectrum: Option<Spectrum>,
    pub spectrum_name: Option<String>,

    /// Transition picked in the side panel.
    pub selected: Option<String>,
    pub z: f64,
    pub vmin: f64,
    pub vmax: f64,
    pub frame: Frame,

    /// Lines measured on the current spectrum.
    pub lines: Vec<AbsLine>,

    /// Normalized cut-out and N_a(v) of the last measured line, with its name.
    pub cut: Option<(String, CutSpectrum)>,
    pub aod: Vec<AodPixel>,

    /// Colour per transition name.
    pub color_map: ColorMap,

    pub model: Option<ModelProfile>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: AnalysisConfig, line_list: LineList) -> Self {
        let color_map = ColorMap::new(line_list.names());
        let (vmin, vmax) = config.default_vlim;
        Self {
            frame: config.frame,
            vmin: vmin.km_per_s(),
            vmax: vmax.km_per_s(),
            selected: line_list.names().first().cloned(),
            config,
            line_list,
            spectrum: None,
            spectrum_name: None,
            z: 0.0,
            lines: Vec::new(),
            cut: None,
            aod: Vec::new(),
            color_map,
            model: None,
            status_message: None,
        }
    }

    /// Load a spectrum file and drop measurements made on the previous one.
    pub fn open_spectrum(&mut self, path: &Path) {
        match load_spectrum(path) {
            Ok(spec) => {
                log::info!(
                    "Loaded {} pixels, {:.2}–{:.2} Å",
                    spec.len(),
                    spec.wvmin().angstrom(),
                    spec.wvmax().angstrom()
                );
                self.spectrum = Some(spec);
                self.spectrum_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
                self.lines.clear();
                self.cut = None;
                self.aod.clear();
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to load file: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    pub fn set_model(&mut self, wrest: f64, log_n: f64, b: f64) {
        match ModelProfile::synthesize(&self.line_list, wrest, log_n, b, &self.config) {
            Ok(model) => self.model = Some(model),
            Err(e) => {
                log::error!("Failed to synthesise profile: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    pub fn interval(&self) -> Result<AnalysisInterval> {
        Ok(AnalysisInterval::velocity(
            Velocity::from_km_per_s(self.vmin),
            Velocity::from_km_per_s(self.vmax),
        )?)
    }

    /// Measure the selected transition; replaces an earlier measurement of
    /// the same line at the same redshift.
    pub fn measure_selected(&mut self) {
        if let Err(e) = self.try_measure_selected() {
            log::error!("Measurement failed: {e:#}");
            self.status_message = Some(format!("Error: {e:#}"));
        }
    }

    fn try_measure_selected(&mut self) -> Result<()> {
        let spec = self.spectrum.as_ref().context("no spectrum loaded")?;
        let name = self.selected.clone().context("no transition selected")?;
        let interval = self.interval()?;

        let mut line = AbsLine::new(&self.line_list, &TransitionKey::Name(name), self.z)?;
        line.measure(spec, &interval, self.frame, &self.config.aodm)?;
        let window = line.window(spec, &interval)?;
        self.aod = apparent_column_profile(
            &window,
            line.transition(),
            line.z(),
            self.config.aodm.saturation_floor,
        )?;
        self.cut = Some((
            line.transition().name().to_string(),
            line.cut_spectrum(spec, &interval)?,
        ));

        let key = LineMatch::from(&line);
        match self.lines.iter_mut().find(|l| l.is_match(&key)) {
            Some(existing) => *existing = line,
            None => self.lines.push(line),
        }
        self.status_message = None;
        Ok(())
    }

    pub fn remove_line(&mut self, idx: usize) {
        if idx < self.lines.len() {
            self.lines.remove(idx);
        }
    }
}
