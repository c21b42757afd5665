use serde::{Deserialize, Serialize};

use crate::config::Frame;
use crate::data::model::SpectralWindow;
use crate::error::{check_redshift, LineError};
use crate::units::Wavelength;

/// Boxcar equivalent width and its 1σ error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EwResult {
    pub ew: Wavelength,
    pub sig_ew: Wavelength,
    pub frame: Frame,
    /// Number of pixels that entered the sum.
    pub n_pix: usize,
}

/// Boxcar equivalent width over `window`.
///
/// Each valid pixel contributes `(1 - f/c) Δλ` with error `(σ/c) Δλ`; errors
/// are assumed uncorrelated and summed in quadrature. Sums run in pixel
/// order. In [`Frame::Rest`] both values are divided by `(1+z)`.
pub fn equivalent_width(
    window: &SpectralWindow,
    z: f64,
    frame: Frame,
) -> Result<EwResult, LineError> {
    let z = check_redshift(z)?;

    let mut ew = 0.0;
    let mut var = 0.0;
    let mut n_pix = 0;
    for px in window.valid_pixels() {
        ew += (1.0 - px.normalized_flux()) * px.width;
        let s = px.normalized_sigma() * px.width;
        var += s * s;
        n_pix += 1;
    }
    if n_pix == 0 {
        return Err(LineError::NoValidPixels);
    }
    if n_pix < window.len() {
        log::warn!(
            "EW: {} of {} pixels masked or invalid",
            window.len() - n_pix,
            window.len()
        );
    }

    let div = frame.divisor(z);
    Ok(EwResult {
        ew: Wavelength::from_angstrom(ew / div),
        sig_ew: Wavelength::from_angstrom(var.sqrt() / div),
        frame,
        n_pix,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Spectrum, SpectrumAccess};
    use approx::assert_relative_eq;

    fn window_with(flux: Vec<f64>, sig: f64) -> SpectralWindow {
        let n = flux.len();
        let wave: Vec<f64> = (0..n).map(|i| 5000.0 + 0.1 * i as f64).collect();
        Spectrum::new(wave, flux, vec![sig; n], Some(vec![1.0; n]))
            .unwrap()
            .slice(0..n)
    }

    #[test]
    fn test_single_pixel_deficit() {
        let mut flux = vec![1.0; 10];
        flux[5] = 0.5;
        let res = equivalent_width(&window_with(flux, 0.0), 0.0, Frame::Rest).unwrap();
        assert_relative_eq!(res.ew.angstrom(), 0.05, epsilon = 1e-9);
        assert_eq!(res.sig_ew.angstrom(), 0.0);
        assert_eq!(res.n_pix, 10);
    }

    #[test]
    fn test_flat_spectrum_has_zero_ew() {
        let res = equivalent_width(&window_with(vec![1.0; 20], 0.02), 0.0, Frame::Rest).unwrap();
        assert_relative_eq!(res.ew.angstrom(), 0.0, epsilon = 1e-12);
        assert!(res.sig_ew.angstrom() > 0.0);
    }

    #[test]
    fn test_observer_is_rest_times_one_plus_z() {
        let mut flux = vec![1.0; 10];
        flux[3] = 0.2;
        flux[4] = 0.4;
        let win = window_with(flux, 0.05);
        for z in [0.0, 0.5, 2.3] {
            let obs = equivalent_width(&win, z, Frame::Observer).unwrap();
            let rest = equivalent_width(&win, z, Frame::Rest).unwrap();
            assert_relative_eq!(obs.ew.angstrom(), rest.ew.angstrom() * (1.0 + z), epsilon = 1e-12);
            assert_relative_eq!(
                obs.sig_ew.angstrom(),
                rest.sig_ew.angstrom() * (1.0 + z),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_error_in_quadrature() {
        let win = window_with(vec![1.0; 4], 0.1);
        let res = equivalent_width(&win, 0.0, Frame::Observer).unwrap();
        // 4 pixels × (0.1 × 0.1 Å)² → sqrt(4e-4)
        assert_relative_eq!(res.sig_ew.angstrom(), 0.02, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_pixels_skipped() {
        let mut flux = vec![1.0; 10];
        flux[2] = f64::NAN;
        flux[5] = 0.5;
        let res = equivalent_width(&window_with(flux, 0.0), 0.0, Frame::Rest).unwrap();
        assert_eq!(res.n_pix, 9);
        assert_relative_eq!(res.ew.angstrom(), 0.05, epsilon = 1e-9);
    }

    #[test]
    fn test_all_invalid_is_error() {
        let win = window_with(vec![f64::NAN; 5], 0.1);
        assert_eq!(
            equivalent_width(&win, 0.0, Frame::Rest).unwrap_err(),
            LineError::NoValidPixels
        );
        assert_eq!(
            equivalent_width(&SpectralWindow::empty(), 0.0, Frame::Rest).unwrap_err(),
            LineError::NoValidPixels
        );
    }
}
