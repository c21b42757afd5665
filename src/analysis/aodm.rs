//! Apparent optical depth method (Savage & Sembach 1991).
//!
//! Each pixel's normalized flux is turned into an optical depth
//! `τ = -ln(f/c)`, scaled to an apparent column density per unit velocity
//! `N_a(v) = C0 / (f λ) · τ(v)` and summed over the pixel velocity widths.

use std::f64::consts::LN_10;

use serde::{Deserialize, Serialize};

use super::measurement::MeasurementFlag;
use super::window::velocity_grid;
use crate::config::AodmConfig;
use crate::data::linelist::Transition;
use crate::data::model::SpectralWindow;
use crate::error::{check_redshift, LineError};
use crate::units::ColumnDensity;

/// `m_e c / (π e²)` expressed in cm⁻² (km/s)⁻¹ Å.
pub const AODM_CONSTANT: f64 = 3.767_885e14;

/// Column-density coefficient `C0 / (f λ_rest)` of a transition.
pub fn aodm_coefficient(transition: &Transition) -> Result<f64, LineError> {
    if transition.f() <= 0.0 {
        return Err(LineError::InvalidTransition(format!(
            "{}: AODM needs a positive oscillator strength",
            transition.name()
        )));
    }
    Ok(AODM_CONSTANT / (transition.f() * transition.wrest().angstrom()))
}

/// `log10 N` and its propagated error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogColumn {
    pub log_n: f64,
    pub sig_log_n: f64,
}

/// Column density in dex: `σlogN = σN / (N ln 10)`.
pub fn log_column(column: f64, sig_column: f64) -> Result<LogColumn, LineError> {
    if !(column > 0.0 && column.is_finite()) {
        return Err(LineError::UndefinedLogarithm { column });
    }
    Ok(LogColumn {
        log_n: column.log10(),
        sig_log_n: sig_column / (column * LN_10),
    })
}

/// Apparent column density of one pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AodPixel {
    /// Velocity relative to the line centre (km/s).
    pub velocity: f64,
    /// Pixel velocity width (km/s).
    pub dv: f64,
    /// Apparent optical depth after clipping.
    pub tau: f64,
    /// `N_a(v)` in cm⁻² (km/s)⁻¹.
    pub na: f64,
    pub sig_na: f64,
    /// Normalized flux was at or below the saturation floor.
    pub saturated: bool,
}

/// Per-pixel apparent column density for the valid pixels of `window`.
pub fn apparent_column_profile(
    window: &SpectralWindow,
    transition: &Transition,
    z: f64,
    saturation_floor: f64,
) -> Result<Vec<AodPixel>, LineError> {
    let z = check_redshift(z)?;
    let coeff = aodm_coefficient(transition)?;
    let (velo, dv) = velocity_grid(window, transition.wrest().redshifted(z));

    let profile = (0..window.len())
        .filter(|&i| !window.masked[i])
        .filter_map(|i| {
            let px = window.pixel(i);
            if !px.is_valid() {
                return None;
            }
            let fx = px.normalized_flux();
            let saturated = fx <= saturation_floor;
            let clipped = fx.max(saturation_floor);
            let tau = -clipped.ln();
            Some(AodPixel {
                velocity: velo[i],
                dv: dv[i],
                tau,
                na: coeff * tau,
                sig_na: coeff * px.normalized_sigma() / clipped,
                saturated,
            })
        })
        .collect();
    Ok(profile)
}

/// AODM column density with error, flag and log values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AodmResult {
    pub column: ColumnDensity,
    pub sig_column: ColumnDensity,
    pub flag: MeasurementFlag,
    /// `None` when `N <= 0`.
    pub log: Option<LogColumn>,
    pub n_pix: usize,
    pub n_saturated: usize,
}

/// Integrate the apparent column density over `window`.
///
/// Flags, in order of precedence: any pixel at or below the saturation
/// floor gives [`MeasurementFlag::Saturated`] (lower limit);
/// `|N| < threshold · σN` gives [`MeasurementFlag::UpperLimit`]; a remaining
/// non-positive column is [`MeasurementFlag::NotMeasured`].
pub fn apparent_column(
    window: &SpectralWindow,
    transition: &Transition,
    z: f64,
    config: &AodmConfig,
) -> Result<AodmResult, LineError> {
    config.validate()?;
    let profile = apparent_column_profile(window, transition, z, config.saturation_floor)?;
    if profile.is_empty() {
        return Err(LineError::NoValidPixels);
    }

    let mut column = 0.0;
    let mut var = 0.0;
    let mut n_saturated = 0;
    for px in &profile {
        column += px.na * px.dv;
        let s = px.sig_na * px.dv;
        var += s * s;
        if px.saturated {
            n_saturated += 1;
        }
    }
    let sig_column = var.sqrt();

    let flag = if n_saturated > 0 {
        log::warn!(
            "{}: {n_saturated} saturated pixel(s), column is a lower limit",
            transition.name()
        );
        MeasurementFlag::Saturated
    } else if column.abs() < config.detection_threshold * sig_column {
        MeasurementFlag::UpperLimit
    } else if column <= 0.0 {
        MeasurementFlag::NotMeasured
    } else {
        MeasurementFlag::Detection
    };

    let log = match log_column(column, sig_column) {
        Ok(l) => Some(l),
        Err(e) => {
            log::debug!("{}: {e}", transition.name());
            None
        }
    };

    Ok(AodmResult {
        column: ColumnDensity::per_cm2(column),
        sig_column: ColumnDensity::per_cm2(sig_column),
        flag,
        log,
        n_pix: profile.len(),
        n_saturated,
    })
}
