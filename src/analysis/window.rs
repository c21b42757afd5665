use serde::{Deserialize, Serialize};

use crate::data::model::{SpectralWindow, SpectrumAccess};
use crate::error::{check_redshift, LineError};
use crate::units::{Velocity, Wavelength, C_KMS};

/// Region of the spectrum a line is measured over.
///
/// Velocities are relative to the line centre `λ_rest (1+z)` and converted
/// with the non-relativistic Doppler formula `λ = λ_rest (1+z) (1 + v/c)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum AnalysisInterval {
    /// Observed-frame wavelength limits.
    Wavelength { lo: Wavelength, hi: Wavelength },
    /// Rest-frame velocity limits about the line centre.
    Velocity { lo: Velocity, hi: Velocity },
}

impl AnalysisInterval {
    pub fn wavelength(lo: Wavelength, hi: Wavelength) -> Result<Self, LineError> {
        if !(lo.angstrom().is_finite() && hi.angstrom().is_finite()) {
            return Err(LineError::InvalidInterval(format!(
                "wavelength limits must be finite, got [{}, {}]",
                lo.angstrom(),
                hi.angstrom()
            )));
        }
        Ok(AnalysisInterval::Wavelength { lo, hi })
    }

    pub fn velocity(lo: Velocity, hi: Velocity) -> Result<Self, LineError> {
        if !(lo.km_per_s().is_finite() && hi.km_per_s().is_finite()) {
            return Err(LineError::InvalidInterval(format!(
                "velocity limits must be finite, got [{}, {}]",
                lo.km_per_s(),
                hi.km_per_s()
            )));
        }
        Ok(AnalysisInterval::Velocity { lo, hi })
    }

    /// Observed wavelength limits for a line of rest wavelength `wrest` at `z`.
    pub fn to_observed(&self, wrest: Wavelength, z: f64) -> (Wavelength, Wavelength) {
        match *self {
            AnalysisInterval::Wavelength { lo, hi } => (lo, hi),
            AnalysisInterval::Velocity { lo, hi } => {
                let center = wrest.redshifted(z);
                (center.doppler_shifted(lo), center.doppler_shifted(hi))
            }
        }
    }

    /// Velocity limits relative to the line centre.
    pub fn to_velocity(&self, wrest: Wavelength, z: f64) -> (Velocity, Velocity) {
        match *self {
            AnalysisInterval::Velocity { lo, hi } => (lo, hi),
            AnalysisInterval::Wavelength { lo, hi } => {
                let center = wrest.redshifted(z);
                (lo.velocity_relative_to(center), hi.velocity_relative_to(center))
            }
        }
    }
}

/// Cut the pixels of `spec` covered by `interval` for a line at `wrest`, `z`.
///
/// Every pixel whose centre lies in `[λ_lo, λ_hi]` is included whole. A
/// window that would hold fewer than two pixels comes back empty, which the
/// estimators report as [`LineError::NoValidPixels`].
pub fn select_window<S: SpectrumAccess + ?Sized>(
    spec: &S,
    interval: &AnalysisInterval,
    wrest: Wavelength,
    z: f64,
) -> Result<SpectralWindow, LineError> {
    let z = check_redshift(z)?;
    let (lo, hi) = interval.to_observed(wrest, z);
    if !(lo.angstrom() < hi.angstrom()) {
        return Err(LineError::DegenerateInterval {
            lo: lo.angstrom(),
            hi: hi.angstrom(),
        });
    }

    let wave = spec.wavelengths();
    let (Some(&min), Some(&max)) = (wave.first(), wave.last()) else {
        return Err(LineError::InvalidSpectrum("no pixels".into()));
    };
    if hi.angstrom() < min || lo.angstrom() > max {
        return Err(LineError::Range {
            lo: lo.angstrom(),
            hi: hi.angstrom(),
            min,
            max,
        });
    }

    let Some(range) = spec.pix_range(lo, hi) else {
        log::debug!("No pixel centre inside [{lo}, {hi}]");
        return Ok(SpectralWindow::empty());
    };
    if range.len() < 2 {
        log::debug!("Window [{lo}, {hi}] covers {} pixel(s), treating as empty", range.len());
        return Ok(SpectralWindow::empty());
    }

    log::debug!("Selected pixels {range:?} for [{lo}, {hi}]");
    Ok(spec.slice(range))
}

/// Velocity of each window pixel relative to `center`, and its velocity width.
pub fn velocity_grid(window: &SpectralWindow, center: Wavelength) -> (Vec<f64>, Vec<f64>) {
    let c = center.angstrom();
    let velo = window
        .wavelength
        .iter()
        .map(|&w| C_KMS * (w - c) / c)
        .collect();
    let dv = window.width.iter().map(|&dw| C_KMS * dw / c).collect();
    (velo, dv)
}
