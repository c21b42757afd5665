//! Voigt line profiles for synthesising absorption.
//!
//! The Voigt function uses the Tepper-García (2006) approximation, accurate
//! to a few 1e-4 for the damping parameters of UV resonance lines.

use std::f64::consts::PI;

use super::aodm::AODM_CONSTANT;
use crate::data::linelist::Transition;
use crate::error::{check_redshift, LineError};
use crate::units::{ColumnDensity, Velocity, C_KMS};

const SQRT_PI: f64 = 1.772_453_850_905_516;

/// Voigt function `H(a, u)`, normalized so that `H(0, u) = exp(-u²)`.
pub fn voigt_h(a: f64, u: f64) -> f64 {
    let x2 = u * u;
    let h0 = (-x2).exp();
    if x2 < 1e-6 {
        // Series limit of the correction term as u → 0.
        return h0 - 2.0 * a / SQRT_PI;
    }
    let q = 1.5 / x2;
    h0 - a / SQRT_PI / x2 * (h0 * h0 * (4.0 * x2 * x2 + 7.0 * x2 + 4.0 + q) - q - 1.0)
}

/// Optical depth of `transition` at redshift `z` on the observed grid `wave` (Å).
///
/// `τ(λ) = τ0 H(a, u)` with `τ0 = N f λ / (C0 √π b)`, `a = Γ λ / (4π b)` and
/// `u = v / b`, where `v` is the velocity from the line centre.
pub fn voigt_tau(
    wave: &[f64],
    transition: &Transition,
    z: f64,
    column: ColumnDensity,
    b: Velocity,
) -> Result<Vec<f64>, LineError> {
    let z = check_redshift(z)?;
    let b_kms = b.km_per_s();
    if !(b_kms.is_finite() && b_kms > 0.0) {
        return Err(LineError::InvalidTransition(format!(
            "Doppler parameter must be positive, got {b_kms} km/s"
        )));
    }
    if !(column.value().is_finite() && column.value() >= 0.0) {
        return Err(LineError::InvalidTransition(format!(
            "column density must be finite and >= 0, got {}",
            column.value()
        )));
    }

    let wrest = transition.wrest().angstrom();
    let tau0 = column.value() * transition.f() * wrest / (AODM_CONSTANT * SQRT_PI * b_kms);
    // Γ [s⁻¹] λ [cm] / (4π b [cm/s])
    let a = transition.gamma() * wrest * 1e-8 / (4.0 * PI * b.cm_per_s());
    let center = wrest * (1.0 + z);

    Ok(wave
        .iter()
        .map(|&w| {
            let u = C_KMS * (w - center) / center / b_kms;
            tau0 * voigt_h(a, u)
        })
        .collect())
}

/// Normalized flux `exp(-τ)` of a Voigt profile.
pub fn voigt_flux(
    wave: &[f64],
    transition: &Transition,
    z: f64,
    column: ColumnDensity,
    b: Velocity,
) -> Result<Vec<f64>, LineError> {
    Ok(voigt_tau(wave, transition, z, column, b)?
        .into_iter()
        .map(|t| (-t).exp())
        .collect())
}
