use std::fmt;

use serde::{Deserialize, Serialize};

use super::aodm::{apparent_column, AodmResult, LogColumn};
use super::ew::{equivalent_width, EwResult};
use super::voigt::voigt_flux;
use super::window::{select_window, velocity_grid, AnalysisInterval};
use crate::config::{AodmConfig, Frame};
use crate::data::linelist::{Transition, TransitionKey, TransitionLookup};
use crate::data::model::{SpectralWindow, SpectrumAccess};
use crate::error::{check_redshift, LineError};
use crate::units::{ColumnDensity, Velocity, Wavelength};

// ---------------------------------------------------------------------------
// MeasurementFlag
// ---------------------------------------------------------------------------

/// Quality of a column-density measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementFlag {
    /// No usable measurement.
    #[default]
    NotMeasured,
    /// Reliable value.
    Detection,
    /// Saturated; the value is a lower limit.
    Saturated,
    /// Consistent with zero; report `threshold · σN` as an upper limit.
    UpperLimit,
}

impl MeasurementFlag {
    /// Integer code used in line tables: 0 none, 1 value, 2 lower, 3 upper.
    pub fn code(self) -> u8 {
        match self {
            MeasurementFlag::NotMeasured => 0,
            MeasurementFlag::Detection => 1,
            MeasurementFlag::Saturated => 2,
            MeasurementFlag::UpperLimit => 3,
        }
    }

    pub fn is_limit(self) -> bool {
        matches!(self, MeasurementFlag::Saturated | MeasurementFlag::UpperLimit)
    }
}

impl fmt::Display for MeasurementFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MeasurementFlag::NotMeasured => "not measured",
            MeasurementFlag::Detection => "detection",
            MeasurementFlag::Saturated => "saturated (lower limit)",
            MeasurementFlag::UpperLimit => "non-detection (upper limit)",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// Measurement – the mutable result record of a line
// ---------------------------------------------------------------------------

/// Results attached to a line. Each estimator overwrites only its own part.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub ew: Option<EwResult>,
    pub aodm: Option<AodmResult>,
}

impl Measurement {
    /// Store fresh results; `None` leaves the existing value in place.
    pub fn attach(&mut self, ew: Option<EwResult>, aodm: Option<AodmResult>) {
        if let Some(ew) = ew {
            self.ew = Some(ew);
        }
        if let Some(aodm) = aodm {
            self.aodm = Some(aodm);
        }
    }

    pub fn ew(&self) -> Option<Wavelength> {
        self.ew.map(|r| r.ew)
    }

    pub fn sig_ew(&self) -> Option<Wavelength> {
        self.ew.map(|r| r.sig_ew)
    }

    pub fn column(&self) -> Option<ColumnDensity> {
        self.aodm.map(|r| r.column)
    }

    pub fn sig_column(&self) -> Option<ColumnDensity> {
        self.aodm.map(|r| r.sig_column)
    }

    pub fn log_column(&self) -> Option<LogColumn> {
        self.aodm.and_then(|r| r.log)
    }

    pub fn flag(&self) -> MeasurementFlag {
        self.aodm.map(|r| r.flag).unwrap_or_default()
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ew {
            Some(r) => {
                let frame = match r.frame {
                    Frame::Observer => "obs",
                    Frame::Rest => "rest",
                };
                write!(
                    f,
                    "EW({frame}) = {:.4} ± {:.4} Å",
                    r.ew.angstrom(),
                    r.sig_ew.angstrom()
                )?
            }
            None => write!(f, "EW = –")?,
        }
        match (&self.aodm, self.log_column()) {
            (Some(r), Some(l)) => write!(
                f,
                "; logN = {:.3} ± {:.3} [{}]",
                l.log_n, l.sig_log_n, r.flag
            ),
            (Some(r), None) => write!(
                f,
                "; N = {:.3e} ± {:.3e} [{}]",
                r.column.value(),
                r.sig_column.value(),
                r.flag
            ),
            (None, _) => write!(f, "; N = –"),
        }
    }
}

// ---------------------------------------------------------------------------
// AbsLine – a transition at a redshift, with its measurement
// ---------------------------------------------------------------------------

/// Normalized cut-out of a spectrum around a line.
#[derive(Debug, Clone, PartialEq)]
pub struct CutSpectrum {
    pub wave: Vec<f64>,
    /// Velocity relative to the line centre (km/s).
    pub velo: Vec<f64>,
    pub flux: Vec<f64>,
    pub sig: Vec<f64>,
}

/// Criteria for [`AbsLine::is_match`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMatch {
    pub z: f64,
    pub wrest: Wavelength,
    /// Atomic number and ionization stage, if they must match too.
    pub zion: Option<(u8, u8)>,
}

/// An absorption line: immutable atomic data, a redshift, and the
/// measurement record the estimators write into.
#[derive(Debug, Clone, PartialEq)]
pub struct AbsLine {
    transition: Transition,
    z: f64,
    measurement: Measurement,
}

impl AbsLine {
    /// Look the transition up in `lookup` and place it at redshift `z`.
    pub fn new<L: TransitionLookup + ?Sized>(
        lookup: &L,
        key: &TransitionKey,
        z: f64,
    ) -> Result<Self, LineError> {
        Self::from_transition(lookup.lookup(key)?, z)
    }

    pub fn from_transition(transition: Transition, z: f64) -> Result<Self, LineError> {
        Ok(Self {
            transition,
            z: check_redshift(z)?,
            measurement: Measurement::default(),
        })
    }

    pub fn transition(&self) -> &Transition {
        &self.transition
    }

    pub fn wrest(&self) -> Wavelength {
        self.transition.wrest()
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    pub fn measurement(&self) -> &Measurement {
        &self.measurement
    }

    /// Observed wavelength of the line centre.
    pub fn observed_center(&self) -> Wavelength {
        self.wrest().redshifted(self.z)
    }

    pub fn window<S: SpectrumAccess + ?Sized>(
        &self,
        spec: &S,
        interval: &AnalysisInterval,
    ) -> Result<SpectralWindow, LineError> {
        select_window(spec, interval, self.wrest(), self.z)
    }

    /// Normalized flux, sigma, wavelength and velocity over `interval`.
    pub fn cut_spectrum<S: SpectrumAccess + ?Sized>(
        &self,
        spec: &S,
        interval: &AnalysisInterval,
    ) -> Result<CutSpectrum, LineError> {
        let window = self.window(spec, interval)?;
        let (velo, _) = velocity_grid(&window, self.observed_center());
        let (flux, sig): (Vec<f64>, Vec<f64>) = (0..window.len())
            .map(|i| {
                let px = window.pixel(i);
                (px.normalized_flux(), px.normalized_sigma())
            })
            .unzip();
        Ok(CutSpectrum {
            wave: window.wavelength,
            velo,
            flux,
            sig,
        })
    }

    /// Boxcar equivalent width in the requested frame.
    pub fn measure_ew<S: SpectrumAccess + ?Sized>(
        &mut self,
        spec: &S,
        interval: &AnalysisInterval,
        frame: Frame,
    ) -> Result<EwResult, LineError> {
        let window = self.window(spec, interval)?;
        let res = equivalent_width(&window, self.z, frame)?;
        log::info!(
            "{} z={:.5}: EW = {:.4} ± {:.4} Å ({frame:?})",
            self.transition.name(),
            self.z,
            res.ew.angstrom(),
            res.sig_ew.angstrom()
        );
        self.measurement.attach(Some(res), None);
        Ok(res)
    }

    /// Rest-frame equivalent width.
    pub fn measure_restew<S: SpectrumAccess + ?Sized>(
        &mut self,
        spec: &S,
        interval: &AnalysisInterval,
    ) -> Result<EwResult, LineError> {
        self.measure_ew(spec, interval, Frame::Rest)
    }

    /// AODM column density.
    pub fn measure_aodm<S: SpectrumAccess + ?Sized>(
        &mut self,
        spec: &S,
        interval: &AnalysisInterval,
        config: &AodmConfig,
    ) -> Result<AodmResult, LineError> {
        let window = self.window(spec, interval)?;
        let res = apparent_column(&window, &self.transition, self.z, config)?;
        log::info!(
            "{} z={:.5}: N = {:.3e} ± {:.3e} cm^-2 [{}]",
            self.transition.name(),
            self.z,
            res.column.value(),
            res.sig_column.value(),
            res.flag
        );
        self.measurement.attach(None, Some(res));
        Ok(res)
    }

    /// Run both estimators on the same window. Nothing is written unless
    /// both succeed.
    pub fn measure<S: SpectrumAccess + ?Sized>(
        &mut self,
        spec: &S,
        interval: &AnalysisInterval,
        frame: Frame,
        config: &AodmConfig,
    ) -> Result<&Measurement, LineError> {
        let window = self.window(spec, interval)?;
        let ew = equivalent_width(&window, self.z, frame)?;
        let aodm = apparent_column(&window, &self.transition, self.z, config)?;
        self.measurement.attach(Some(ew), Some(aodm));
        log::info!("{}: {}", self.transition.name(), self.measurement);
        Ok(&self.measurement)
    }

    /// Same redshift (rtol 1e-6) and rest wavelength (rtol 1e-5), and
    /// optionally the same (Z, ion).
    pub fn is_match(&self, other: &LineMatch) -> bool {
        let same_wrest = (self.wrest().angstrom() - other.wrest.angstrom()).abs()
            <= 1e-8 + 1e-5 * other.wrest.angstrom().abs();
        let same_z = (self.z - other.z).abs() <= 1e-8 + 1e-6 * other.z.abs();
        let same_ion = other.zion.map_or(true, |(z, ion)| {
            self.transition.atomic_number() == z && self.transition.ion() == ion
        });
        same_wrest && same_z && same_ion
    }

    /// Normalized flux of a Voigt profile of this line on `wave` (Å).
    pub fn generate_voigt(
        &self,
        wave: &[f64],
        column: ColumnDensity,
        b: Velocity,
    ) -> Result<Vec<f64>, LineError> {
        voigt_flux(wave, &self.transition, self.z, column, b)
    }
}

impl From<&AbsLine> for LineMatch {
    fn from(line: &AbsLine) -> Self {
        LineMatch {
            z: line.z,
            wrest: line.wrest(),
            zion: Some((line.transition.atomic_number(), line.transition.ion())),
        }
    }
}

impl fmt::Display for AbsLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[AbsLine: {}, wrest={:.4}, f={}, z={:.5}]",
            self.transition.name(),
            self.wrest().angstrom(),
            self.transition.f(),
            self.z
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::linelist::LineList;
    use crate::data::model::Spectrum;
    use approx::assert_relative_eq;

    fn civ_spectrum(z: f64, depth: f64) -> (AbsLine, Spectrum) {
        let line = AbsLine::new(&LineList::ism(), &"CIV 1548".into(), z).unwrap();
        let center = line.observed_center().angstrom();
        let n = 200;
        let wave: Vec<f64> = (0..n).map(|i| center - 10.0 + 0.1 * i as f64).collect();
        let flux = wave
            .iter()
            .map(|&w| 1.0 - depth * (-((w - center) / 0.3).powi(2)).exp())
            .collect();
        let spec = Spectrum::new(wave, flux, vec![0.02; n], Some(vec![1.0; n])).unwrap();
        (line, spec)
    }

    fn vlim() -> AnalysisInterval {
        AnalysisInterval::velocity(Velocity::from_km_per_s(-300.0), Velocity::from_km_per_s(300.0))
            .unwrap()
    }

    #[test]
    fn test_fresh_record_is_not_measured() {
        let (line, _) = civ_spectrum(2.0, 0.5);
        assert_eq!(line.measurement().flag(), MeasurementFlag::NotMeasured);
        assert!(line.measurement().ew().is_none());
        assert!(line.measurement().column().is_none());
    }

    #[test]
    fn test_measure_both() {
        let (mut line, spec) = civ_spectrum(2.0, 0.5);
        let m = line
            .measure(&spec, &vlim(), Frame::Rest, &AodmConfig::default())
            .unwrap()
            .clone();
        assert!(m.ew().unwrap().angstrom() > 0.0);
        assert_eq!(m.flag(), MeasurementFlag::Detection);
        let l = m.log_column().unwrap();
        assert!(l.log_n > 12.0 && l.log_n < 16.0);
        assert!(l.sig_log_n > 0.0);
    }

    #[test]
    fn test_estimators_write_only_their_fields() {
        let (mut line, spec) = civ_spectrum(2.0, 0.5);
        let aodm = line
            .measure_aodm(&spec, &vlim(), &AodmConfig::default())
            .unwrap();
        line.measure_ew(&spec, &vlim(), Frame::Observer).unwrap();
        assert_eq!(line.measurement().aodm, Some(aodm));
        assert_eq!(line.measurement().ew.unwrap().frame, Frame::Observer);
    }

    #[test]
    fn test_failed_measurement_leaves_record_untouched() {
        let (mut line, spec) = civ_spectrum(2.0, 0.5);
        line.measure_restew(&spec, &vlim()).unwrap();
        let before = line.measurement().clone();

        let outside = AnalysisInterval::wavelength(
            Wavelength::from_angstrom(1000.0),
            Wavelength::from_angstrom(1001.0),
        )
        .unwrap();
        let err = line
            .measure(&spec, &outside, Frame::Rest, &AodmConfig::default())
            .unwrap_err();
        assert!(err.is_range_error());
        assert_eq!(line.measurement(), &before);
    }

    #[test]
    fn test_remeasure_is_idempotent() {
        let (mut line, spec) = civ_spectrum(2.0, 0.5);
        let a = line.measure_restew(&spec, &vlim()).unwrap();
        let b = line.measure_restew(&spec, &vlim()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_cut_spectrum_centre_velocity() {
        let (line, spec) = civ_spectrum(1.0, 0.5);
        let cut = line.cut_spectrum(&spec, &vlim()).unwrap();
        let imin = cut
            .flux
            .iter()
            .enumerate()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert!(cut.velo[imin].abs() < 10.0);
        assert_eq!(cut.wave.len(), cut.sig.len());
    }

    #[test]
    fn test_is_match() {
        let (line, _) = civ_spectrum(2.0, 0.5);
        let mut m = LineMatch::from(&line);
        assert!(line.is_match(&m));
        m.z = 2.0 * (1.0 + 5e-7);
        assert!(line.is_match(&m));
        m.z = 2.01;
        assert!(!line.is_match(&m));
        m.z = 2.0;
        m.zion = Some((14, 4));
        assert!(!line.is_match(&m));
        m.zion = None;
        m.wrest = Wavelength::from_angstrom(1548.20);
        assert!(line.is_match(&m));
        m.wrest = Wavelength::from_angstrom(1548.25);
        assert!(!line.is_match(&m));
        m.wrest = Wavelength::from_angstrom(1550.77);
        assert!(!line.is_match(&m));
    }

    #[test]
    fn test_flag_codes() {
        let flags = [
            MeasurementFlag::NotMeasured,
            MeasurementFlag::Detection,
            MeasurementFlag::Saturated,
            MeasurementFlag::UpperLimit,
        ];
        let codes: Vec<u8> = flags.iter().map(|f| f.code()).collect();
        assert_eq!(codes, vec![0, 1, 2, 3]);
        let limits: Vec<bool> = flags.iter().map(|f| f.is_limit()).collect();
        assert_eq!(limits, vec![false, false, true, true]);
    }

    #[test]
    fn test_invalid_redshift_rejected() {
        let t = LineList::ism().lookup(&"HI 1215".into()).unwrap();
        assert!(AbsLine::from_transition(t, -1.5).is_err());
    }

    #[test]
    fn test_unknown_transition() {
        let err = AbsLine::new(&LineList::ism(), &"FooI 9999".into(), 0.0).unwrap_err();
        assert!(matches!(err, LineError::UnknownTransition(_)));
    }

    #[test]
    fn test_display() {
        let (mut line, spec) = civ_spectrum(2.0, 0.5);
        assert!(line.to_string().starts_with("[AbsLine: CIV 1548"));
        line.measure(&spec, &vlim(), Frame::Rest, &AodmConfig::default())
            .unwrap();
        let text = line.measurement().to_string();
        assert!(text.contains("EW(rest)"));
        assert!(text.contains("logN"));
    }

    #[test]
    fn test_observed_center() {
        let (line, _) = civ_spectrum(2.0, 0.5);
        assert_relative_eq!(line.observed_center().angstrom(), 1548.195 * 3.0, epsilon = 1e-9);
    }
}
