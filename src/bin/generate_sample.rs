use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;
use rusty_lines::analysis::AbsLine;
use rusty_lines::data::linelist::LineList;
use rusty_lines::data::model::{Spectrum, SpectrumAccess};
use rusty_lines::units::{ColumnDensity, Velocity};

/// Write a synthetic quasar absorption spectrum to parquet.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(short, long, default_value = "sample_spectrum.parquet")]
    output: PathBuf,

    /// Absorber redshift
    #[arg(short, long, default_value_t = 2.0)]
    z: f64,

    /// Signal-to-noise per pixel at the continuum
    #[arg(long, default_value_t = 30.0)]
    s2n: f64,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// (transition, logN, b km/s)
const ABSORBERS: &[(&str, f64, f64)] = &[
    ("HI 1215", 14.2, 25.0),
    ("SiIV 1393", 13.1, 12.0),
    ("SiIV 1402", 13.1, 12.0),
    ("CIV 1548", 13.8, 15.0),
    ("CIV 1550", 13.8, 15.0),
];

/// Slowly varying power-law continuum with a broad emission bump.
fn continuum(wave: f64) -> f64 {
    let bump = 0.6 * (-(wave - 4650.0).powi(2) / (2.0 * 40.0_f64.powi(2))).exp();
    (wave / 4000.0).powf(-1.2) + bump
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let ll = LineList::ism();
    let (wmin, wmax) = (3600.0 * (1.0 + args.z) / 3.0, 4800.0 * (1.0 + args.z) / 3.0);
    let npix = ((wmax - wmin) / 0.05).round() as usize + 1;
    let wave: Vec<f64> = (0..npix).map(|i| wmin + 0.05 * i as f64).collect();
    let cont: Vec<f64> = wave.iter().map(|&w| continuum(w)).collect();

    let mut trans = vec![1.0; npix];
    for &(name, log_n, b) in ABSORBERS {
        let line = AbsLine::new(&ll, &name.into(), args.z)?;
        let profile = line.generate_voigt(
            &wave,
            ColumnDensity::from_log10(log_n),
            Velocity::from_km_per_s(b),
        )?;
        for (t, p) in trans.iter_mut().zip(profile) {
            *t *= p;
        }
        log::info!(
            "{name} at {:.2} Å, logN={log_n} b={b}",
            line.observed_center().angstrom()
        );
    }

    let flux: Vec<f64> = trans.iter().zip(&cont).map(|(t, c)| t * c).collect();
    let mut spec = Spectrum::new(wave, flux, vec![0.0; npix], Some(cont))?;
    spec.add_noise(args.seed, Some(args.s2n))?;

    let schema = Arc::new(Schema::new(vec![
        Field::new("wave", DataType::Float64, false),
        Field::new("flux", DataType::Float64, false),
        Field::new("sig", DataType::Float64, false),
        Field::new("co", DataType::Float64, false),
    ]));

    let column = |values: &[f64]| -> ArrayRef { Arc::new(Float64Array::from(values.to_vec())) };
    let co = spec.continuum().context("continuum was set above")?;
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            column(spec.wavelengths()),
            column(spec.flux()),
            column(spec.flux_error()),
            column(co),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing parquet writer")?;

    println!(
        "Wrote {npix} pixels ({wmin:.1}–{wmax:.1} Å, z = {}) to {}",
        args.z,
        args.output.display()
    );
    Ok(())
}
