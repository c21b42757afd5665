use thiserror::Error;

/// Errors raised by the measurement engine.
///
/// Saturation and non-detection are not errors: they are reported through
/// [`crate::analysis::MeasurementFlag`] next to a best-effort value.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LineError {
    /// The analysis interval does not overlap the spectrum.
    #[error("interval [{lo:.4}, {hi:.4}] Å lies outside spectrum coverage [{min:.4}, {max:.4}] Å")]
    Range { lo: f64, hi: f64, min: f64, max: f64 },

    /// The interval bounds are not ordered after conversion to wavelength.
    #[error("degenerate interval: lower bound {lo:.4} Å is not below upper bound {hi:.4} Å")]
    DegenerateInterval { lo: f64, hi: f64 },

    /// Every pixel in the window was masked or invalid.
    #[error("no valid pixels in the analysis window")]
    NoValidPixels,

    /// Transition lookup failed.
    #[error("unknown transition: {0}")]
    UnknownTransition(String),

    /// `log10(N)` requested for a non-positive column.
    #[error("logarithm undefined for column density {column:e}")]
    UndefinedLogarithm { column: f64 },

    #[error("invalid spectrum: {0}")]
    InvalidSpectrum(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("invalid interval: {0}")]
    InvalidInterval(String),

    #[error("invalid redshift {0}: must be finite and > -1")]
    InvalidRedshift(f64),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl LineError {
    /// Whether this is one of the interval range failures.
    pub fn is_range_error(&self) -> bool {
        matches!(
            self,
            LineError::Range { .. } | LineError::DegenerateInterval { .. }
        )
    }
}

/// Validate a redshift, returning it unchanged.
pub(crate) fn check_redshift(z: f64) -> Result<f64, LineError> {
    if z.is_finite() && z > -1.0 {
        Ok(z)
    } else {
        Err(LineError::InvalidRedshift(z))
    }
}
