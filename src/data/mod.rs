//! Data layer: spectra, atomic data and file loading.
//!
//! Architecture:
//! ```text
//!  .parquet / .json / .csv          line list .json / .csv
//!        │                                  │
//!        ▼                                  ▼
//!   ┌──────────┐                      ┌──────────┐
//!   │  loader   │  parse file →       │ linelist  │  Transition table
//!   └──────────┘                      └──────────┘
//!        │                                  │
//!        ▼                                  │
//!   ┌──────────────┐                        │
//!   │   Spectrum    │  SpectrumAccess       │
//!   └──────────────┘                        │
//!        │  slice(range)                    │ lookup(key)
//!        ▼                                  ▼
//!   ┌────────────────┐               ┌──────────┐
//!   │ SpectralWindow  │ ─────────────▶│ analysis  │
//!   └────────────────┘               └──────────┘
//! ```

pub mod linelist;
pub mod loader;
pub mod model;
