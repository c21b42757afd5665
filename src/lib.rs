//! Absorption-line measurement for 1-D spectra.
//!
//! Given a spectrum with a continuum estimate, a transition and an analysis
//! interval, the engine measures the equivalent width and the apparent
//! optical depth (AODM) column density, each with a propagated error and a
//! detection flag.
//!
//! ```no_run
//! use rusty_lines::analysis::{AbsLine, AnalysisInterval};
//! use rusty_lines::config::{AodmConfig, Frame};
//! use rusty_lines::data::linelist::LineList;
//! use rusty_lines::data::loader::load_spectrum;
//! use rusty_lines::units::Velocity;
//!
//! # fn main() -> anyhow::Result<()> {
//! let spec = load_spectrum("quasar.parquet".as_ref())?;
//! let mut line = AbsLine::new(&LineList::ism(), &"CIV 1548".into(), 2.1)?;
//! let vlim = AnalysisInterval::velocity(
//!     Velocity::from_km_per_s(-150.0),
//!     Velocity::from_km_per_s(150.0),
//! )?;
//! line.measure_ew(&spec, &vlim, Frame::Rest)?;
//! line.measure_aodm(&spec, &vlim, &AodmConfig::with_threshold(3.0))?;
//! println!("{}", line.measurement());
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod units;

pub use error::LineError;
