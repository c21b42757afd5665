use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::LineError;
use crate::units::Velocity;

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// Frame in which an equivalent width is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frame {
    /// Observed-frame width, no `(1+z)` division.
    Observer,
    /// Rest-frame width, observed width divided by `(1+z)`.
    Rest,
}

impl Frame {
    /// Factor the observed width is divided by.
    pub fn divisor(self, z: f64) -> f64 {
        match self {
            Frame::Observer => 1.0,
            Frame::Rest => 1.0 + z,
        }
    }
}

// ---------------------------------------------------------------------------
// AODM settings
// ---------------------------------------------------------------------------

/// Detection and saturation policy of the AODM estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AodmConfig {
    /// A column is a non-detection when `|N| < detection_threshold · σN`.
    pub detection_threshold: f64,
    /// Normalized flux is clipped to this floor before taking `ln`; any
    /// pixel at or below it marks the column as saturated.
    pub saturation_floor: f64,
}

impl Default for AodmConfig {
    fn default() -> Self {
        Self {
            detection_threshold: 3.0,
            saturation_floor: f64::EPSILON,
        }
    }
}

impl AodmConfig {
    /// Default policy with a different nσ detection threshold.
    pub fn with_threshold(detection_threshold: f64) -> Self {
        Self {
            detection_threshold,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), LineError> {
        if !(self.detection_threshold.is_finite() && self.detection_threshold >= 0.0) {
            return Err(LineError::InvalidConfig(format!(
                "detection_threshold must be finite and >= 0, got {}",
                self.detection_threshold
            )));
        }
        if !(self.saturation_floor > 0.0 && self.saturation_floor < 1.0) {
            return Err(LineError::InvalidConfig(format!(
                "saturation_floor must lie in (0, 1), got {}",
                self.saturation_floor
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AnalysisConfig – top-level settings file
// ---------------------------------------------------------------------------

/// Settings shared by the viewer and batch measurements.
///
/// ```json
/// {
///   "aodm": { "detection_threshold": 3.0, "saturation_floor": 1e-3 },
///   "frame": "rest",
///   "default_vlim": [-150.0, 150.0]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub aodm: AodmConfig,
    pub frame: Frame,
    pub default_vlim: (Velocity, Velocity),
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            aodm: AodmConfig::default(),
            frame: Frame::Rest,
            default_vlim: (
                Velocity::from_km_per_s(-150.0),
                Velocity::from_km_per_s(150.0),
            ),
        }
    }
}

impl AnalysisConfig {
    /// Read and validate a JSON settings file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: AnalysisConfig = serde_json::from_str(&text).context("parsing config JSON")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), LineError> {
        self.aodm.validate()?;
        let (lo, hi) = self.default_vlim;
        if lo.km_per_s() >= hi.km_per_s() {
            return Err(LineError::InvalidConfig(format!(
                "default_vlim must be ordered, got [{lo}, {hi}]"
            )));
        }
        Ok(())
    }
}
