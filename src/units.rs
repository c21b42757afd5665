//! Dimension-tagged scalars used at the public boundaries of the engine.
//!
//! Wavelengths are carried in Ångström, velocities in km/s and column
//! densities in cm⁻². Each dimension gets its own newtype so a velocity can
//! never be passed where a wavelength is expected; arithmetic inside the
//! estimators happens on the raw `f64` after the boundary check.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Speed of light in km/s.
pub const C_KMS: f64 = 299_792.458;

// ---------------------------------------------------------------------------
// Wavelength
// ---------------------------------------------------------------------------

/// A wavelength in Ångström.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wavelength(f64);

impl Wavelength {
    pub const fn from_angstrom(aa: f64) -> Self {
        Self(aa)
    }

    pub fn from_nanometers(nm: f64) -> Self {
        Self(nm * 10.0)
    }

    pub const fn angstrom(self) -> f64 {
        self.0
    }

    pub fn nanometers(self) -> f64 {
        self.0 / 10.0
    }

    /// Observed wavelength of a rest-frame wavelength at redshift `z`.
    pub fn redshifted(self, z: f64) -> Self {
        Self(self.0 * (1.0 + z))
    }

    /// Wavelength at velocity `v` relative to `self` (non-relativistic Doppler).
    pub fn doppler_shifted(self, v: Velocity) -> Self {
        Self(self.0 * (1.0 + v.km_per_s() / C_KMS))
    }

    /// Velocity of `self` relative to `center`, `c (λ - λc) / λc`.
    pub fn velocity_relative_to(self, center: Wavelength) -> Velocity {
        Velocity::from_km_per_s(C_KMS * (self.0 - center.0) / center.0)
    }
}

impl fmt::Display for Wavelength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4} Å", self.0)
    }
}

// ---------------------------------------------------------------------------
// Velocity
// ---------------------------------------------------------------------------

/// A line-of-sight velocity in km/s.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Velocity(f64);

impl Velocity {
    pub const fn from_km_per_s(v: f64) -> Self {
        Self(v)
    }

    pub const fn km_per_s(self) -> f64 {
        self.0
    }

    /// Velocity in cm/s, as needed by CGS line-profile formulae.
    pub fn cm_per_s(self) -> f64 {
        self.0 * 1.0e5
    }
}

impl fmt::Display for Velocity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} km/s", self.0)
    }
}

// ---------------------------------------------------------------------------
// ColumnDensity
// ---------------------------------------------------------------------------

/// A column density in cm⁻².
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnDensity(f64);

impl ColumnDensity {
    pub const fn per_cm2(n: f64) -> Self {
        Self(n)
    }

    /// Column density from `log10(N / cm⁻²)`.
    pub fn from_log10(log_n: f64) -> Self {
        Self(10f64.powf(log_n))
    }

    pub const fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for ColumnDensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4e} cm^-2", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_redshift_and_doppler() {
        let lya = Wavelength::from_angstrom(1215.67);
        assert_relative_eq!(lya.redshifted(2.0).angstrom(), 3647.01, epsilon = 1e-9);

        let shifted = lya.doppler_shifted(Velocity::from_km_per_s(C_KMS / 1000.0));
        assert_relative_eq!(shifted.angstrom(), 1215.67 * 1.001, epsilon = 1e-9);
    }

    #[test]
    fn test_velocity_inverts_doppler_shift() {
        let center = Wavelength::from_angstrom(5000.0);
        let v = Velocity::from_km_per_s(-150.0);
        let back = center.doppler_shifted(v).velocity_relative_to(center);
        assert_relative_eq!(back.km_per_s(), -150.0, epsilon = 1e-9);
    }

    #[test]
    fn test_column_density_log() {
        let n = ColumnDensity::from_log10(13.5);
        assert_relative_eq!(n.value().log10(), 13.5, epsilon = 1e-12);
    }

    #[test]
    fn test_nanometer_conversion() {
        let w = Wavelength::from_nanometers(500.0);
        assert_relative_eq!(w.angstrom(), 5000.0);
        assert_relative_eq!(w.nanometers(), 500.0);
    }
}
