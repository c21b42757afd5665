//! Measurement engine.
//!
//! ```text
//!   Spectrum + AnalysisInterval + Transition
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  window   │  interval → contiguous pixel range → SpectralWindow
//!   └──────────┘
//!        │
//!        ├──────────────┐
//!        ▼              ▼
//!   ┌────────┐     ┌────────┐
//!   │   ew    │     │  aodm   │  independent estimators on the same window
//!   └────────┘     └────────┘
//!        │              │
//!        ▼              ▼
//!   ┌──────────────────────┐
//!   │ measurement (AbsLine) │  Measurement record, flags
//!   └──────────────────────┘
//! ```

pub mod aodm;
pub mod batch;
pub mod ew;
pub mod measurement;
pub mod voigt;
pub mod window;

pub use aodm::{apparent_column, log_column, AodmResult, LogColumn};
pub use batch::{abs_lines_from_wavelengths, measure_many};
pub use ew::{equivalent_width, EwResult};
pub use measurement::{AbsLine, CutSpectrum, LineMatch, Measurement, MeasurementFlag};
pub use window::{select_window, AnalysisInterval};
