use std::ops::Range;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use crate::error::LineError;
use crate::units::{Velocity, Wavelength};

// ---------------------------------------------------------------------------
// SpectrumAccess – what the engine needs from a spectrum
// ---------------------------------------------------------------------------

/// Read access to an index-aligned 1-D spectrum.
///
/// Wavelengths are in Ångström and strictly increasing. All arrays have the
/// same length. A missing continuum means the flux is already normalized.
pub trait SpectrumAccess {
    fn wavelengths(&self) -> &[f64];
    fn flux(&self) -> &[f64];
    fn flux_error(&self) -> &[f64];
    fn continuum(&self) -> Option<&[f64]>;

    /// Pixels the caller wants excluded (`true` = masked).
    fn mask(&self) -> Option<&[bool]> {
        None
    }

    fn len(&self) -> usize {
        self.wavelengths().len()
    }

    fn is_empty(&self) -> bool {
        self.wavelengths().is_empty()
    }

    /// Inclusive pixel range whose centres fall inside `[lo, hi]`.
    ///
    /// Returns `None` when no pixel centre is in range.
    fn pix_range(&self, lo: Wavelength, hi: Wavelength) -> Option<Range<usize>> {
        let wave = self.wavelengths();
        let start = wave.partition_point(|&w| w < lo.angstrom());
        let end = wave.partition_point(|&w| w <= hi.angstrom());
        (start < end).then_some(start..end)
    }

    /// Copy out the pixels in `range` together with their widths.
    ///
    /// Widths come from the full grid, so pixels on the window edge still
    /// see their outer neighbour.
    fn slice(&self, range: Range<usize>) -> SpectralWindow {
        let wave = self.wavelengths();
        let range = range.start.min(wave.len())..range.end.min(wave.len());
        let width = range.clone().map(|i| pixel_width(wave, i)).collect();

        let continuum = match self.continuum() {
            Some(co) => co[range.clone()].to_vec(),
            None => vec![1.0; range.len()],
        };
        let masked = match self.mask() {
            Some(m) => m[range.clone()].to_vec(),
            None => vec![false; range.len()],
        };

        SpectralWindow {
            offset: range.start,
            wavelength: wave[range.clone()].to_vec(),
            flux: self.flux()[range.clone()].to_vec(),
            sigma: self.flux_error()[range].to_vec(),
            continuum,
            width,
            masked,
        }
    }
}

/// Width of pixel `i`: distance between the midpoints to its neighbours,
/// one-sided at the ends of the grid.
pub fn pixel_width(wave: &[f64], i: usize) -> f64 {
    let n = wave.len();
    match n {
        0 | 1 => 0.0,
        _ if i == 0 => wave[1] - wave[0],
        _ if i == n - 1 => wave[n - 1] - wave[n - 2],
        _ => 0.5 * (wave[i + 1] - wave[i - 1]),
    }
}

// ---------------------------------------------------------------------------
// Spectrum – owned implementation of SpectrumAccess
// ---------------------------------------------------------------------------

/// An observed spectrum with optional continuum and pixel mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrum {
    wavelength: Vec<f64>,
    flux: Vec<f64>,
    sigma: Vec<f64>,
    continuum: Option<Vec<f64>>,
    mask: Option<Vec<bool>>,
}

impl Spectrum {
    /// Build a spectrum from index-aligned arrays.
    ///
    /// A strictly decreasing wavelength grid is reversed (with every other
    /// array) so that storage is always increasing.
    pub fn new(
        wavelength: Vec<f64>,
        flux: Vec<f64>,
        sigma: Vec<f64>,
        continuum: Option<Vec<f64>>,
    ) -> Result<Self, LineError> {
        let n = wavelength.len();
        if n == 0 {
            return Err(LineError::InvalidSpectrum("no pixels".into()));
        }
        if flux.len() != n || sigma.len() != n {
            return Err(LineError::InvalidSpectrum(format!(
                "wavelength has {n} values but flux has {} and sigma {}",
                flux.len(),
                sigma.len()
            )));
        }
        if let Some(co) = &continuum {
            if co.len() != n {
                return Err(LineError::InvalidSpectrum(format!(
                    "wavelength has {n} values but continuum has {}",
                    co.len()
                )));
            }
        }
        if let Some(i) = wavelength.iter().position(|w| !w.is_finite()) {
            return Err(LineError::InvalidSpectrum(format!(
                "non-finite wavelength at pixel {i}"
            )));
        }

        let mut spec = Spectrum {
            wavelength,
            flux,
            sigma,
            continuum,
            mask: None,
        };

        let increasing = spec.wavelength.windows(2).all(|w| w[1] > w[0]);
        let decreasing = spec.wavelength.windows(2).all(|w| w[1] < w[0]);
        if !increasing {
            if !decreasing {
                return Err(LineError::InvalidSpectrum(
                    "wavelengths must be strictly monotonic".into(),
                ));
            }
            log::debug!("Reversing descending wavelength grid of {n} pixels");
            spec.wavelength.reverse();
            spec.flux.reverse();
            spec.sigma.reverse();
            if let Some(co) = spec.continuum.as_mut() {
                co.reverse();
            }
        }
        Ok(spec)
    }

    /// Attach a pixel mask (`true` = excluded), in storage order.
    pub fn with_mask(mut self, mask: Vec<bool>) -> Result<Self, LineError> {
        if mask.len() != self.wavelength.len() {
            return Err(LineError::InvalidSpectrum(format!(
                "mask has {} values for {} pixels",
                mask.len(),
                self.wavelength.len()
            )));
        }
        self.mask = Some(mask);
        Ok(self)
    }

    pub fn wvmin(&self) -> Wavelength {
        Wavelength::from_angstrom(self.wavelength[0])
    }

    pub fn wvmax(&self) -> Wavelength {
        Wavelength::from_angstrom(self.wavelength[self.wavelength.len() - 1])
    }

    /// Per-pixel widths over the full grid.
    pub fn pixel_widths(&self) -> Vec<f64> {
        (0..self.wavelength.len())
            .map(|i| pixel_width(&self.wavelength, i))
            .collect()
    }

    /// Velocity of every pixel relative to `center`.
    pub fn relative_velocity(&self, center: Wavelength) -> Vec<Velocity> {
        self.wavelength
            .iter()
            .map(|&w| Wavelength::from_angstrom(w).velocity_relative_to(center))
            .collect()
    }

    /// Continuum-normalized flux and sigma. Without a continuum the stored
    /// arrays are returned as they are.
    pub fn normalized(&self) -> (Vec<f64>, Vec<f64>) {
        match &self.continuum {
            Some(co) => (
                self.flux.iter().zip(co).map(|(f, c)| f / c).collect(),
                self.sigma.iter().zip(co).map(|(s, c)| s / c).collect(),
            ),
            None => (self.flux.clone(), self.sigma.clone()),
        }
    }

    /// Add Gaussian noise drawn from the per-pixel sigma.
    ///
    /// With `s2n` given, sigma is first reset to `continuum / s2n` (or
    /// `1 / s2n` without a continuum). Deterministic for a given `seed`.
    pub fn add_noise(&mut self, seed: u64, s2n: Option<f64>) -> Result<(), LineError> {
        if let Some(s2n) = s2n {
            if !(s2n.is_finite() && s2n > 0.0) {
                return Err(LineError::InvalidSpectrum(format!(
                    "signal-to-noise must be positive, got {s2n}"
                )));
            }
            self.sigma = match &self.continuum {
                Some(co) => co.iter().map(|c| c / s2n).collect(),
                None => vec![1.0 / s2n; self.flux.len()],
            };
        }

        let mut rng = StdRng::seed_from_u64(seed);
        for (f, s) in self.flux.iter_mut().zip(&self.sigma) {
            let z: f64 = StandardNormal.sample(&mut rng);
            if s.is_finite() {
                *f += z * s;
            }
        }
        Ok(())
    }
}

impl SpectrumAccess for Spectrum {
    fn wavelengths(&self) -> &[f64] {
        &self.wavelength
    }

    fn flux(&self) -> &[f64] {
        &self.flux
    }

    fn flux_error(&self) -> &[f64] {
        &self.sigma
    }

    fn continuum(&self) -> Option<&[f64]> {
        self.continuum.as_deref()
    }

    fn mask(&self) -> Option<&[bool]> {
        self.mask.as_deref()
    }
}

// ---------------------------------------------------------------------------
// SpectralWindow – the pixels handed to an estimator
// ---------------------------------------------------------------------------

/// A single pixel of a [`SpectralWindow`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pixel {
    pub wavelength: f64,
    pub flux: f64,
    pub sigma: f64,
    pub continuum: f64,
    pub width: f64,
}

impl Pixel {
    /// Whether the pixel may contribute to a measurement.
    pub fn is_valid(&self) -> bool {
        self.flux.is_finite()
            && self.sigma.is_finite()
            && self.sigma >= 0.0
            && self.continuum.is_finite()
            && self.continuum > 0.0
            && self.width.is_finite()
            && self.width > 0.0
    }

    pub fn normalized_flux(&self) -> f64 {
        self.flux / self.continuum
    }

    pub fn normalized_sigma(&self) -> f64 {
        self.sigma / self.continuum
    }
}

/// A contiguous, wavelength-increasing run of pixels cut from a spectrum.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpectralWindow {
    /// Index of the first pixel in the parent spectrum.
    pub offset: usize,
    pub wavelength: Vec<f64>,
    pub flux: Vec<f64>,
    pub sigma: Vec<f64>,
    pub continuum: Vec<f64>,
    pub width: Vec<f64>,
    pub masked: Vec<bool>,
}

impl SpectralWindow {
    /// A window with no pixels.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.wavelength.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }

    /// Pixel range in the parent spectrum.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len()
    }

    pub fn pixel(&self, i: usize) -> Pixel {
        Pixel {
            wavelength: self.wavelength[i],
            flux: self.flux[i],
            sigma: self.sigma[i],
            continuum: self.continuum[i],
            width: self.width[i],
        }
    }

    /// Unmasked, finite pixels in index order.
    pub fn valid_pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
        (0..self.len())
            .filter(|&i| !self.masked[i])
            .map(|i| self.pixel(i))
            .filter(Pixel::is_valid)
    }

    pub fn n_valid(&self) -> usize {
        self.valid_pixels().count()
    }
}
