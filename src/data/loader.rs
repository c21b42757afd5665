use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, Float32Array, Float64Array, LargeListArray, ListArray};
use arrow::datatypes::{DataType, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::linelist::{LineList, Transition, TransitionRecord};
use super::model::Spectrum;

/// Accepted column names for each array, first match wins.
const WAVE_COLUMNS: &[&str] = &["wave", "wavelength", "x"];
const FLUX_COLUMNS: &[&str] = &["flux", "fx", "y"];
const SIG_COLUMNS: &[&str] = &["sig", "sigma", "error", "err"];
const CONT_COLUMNS: &[&str] = &["co", "conti", "continuum"];

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load one or more spectra from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – one row per pixel with `wave`, `flux`, `sig` [, `co`]
///   columns, or one row per spectrum with list columns of the same names
/// * `.json`    – `{ "wave": [...], "flux": [...], "sig": [...], "co": [...] }`
///   or an array of such objects
/// * `.csv`     – header row, one row per pixel
pub fn load_spectra(path: &Path) -> Result<Vec<Spectrum>> {
    let ext = extension(path);
    let spectra = match ext.as_str() {
        "parquet" | "pq" => load_parquet(path)?,
        "json" => load_json(path)?,
        "csv" => vec![load_csv(path)?],
        other => bail!("Unsupported file extension: .{other}"),
    };
    log::info!("Loaded {} spectra from {}", spectra.len(), path.display());
    Ok(spectra)
}

/// Load the first spectrum of a file.
pub fn load_spectrum(path: &Path) -> Result<Spectrum> {
    load_spectra(path)?
        .into_iter()
        .next()
        .with_context(|| format!("{} contains no spectra", path.display()))
}

/// Load a line list from JSON (array of records) or CSV
/// (`name,wrest,f,gamma,Z,ion`).
pub fn load_line_list(path: &Path) -> Result<LineList> {
    let records: Vec<TransitionRecord> = match extension(path).as_str() {
        "json" => {
            let text = std::fs::read_to_string(path).context("reading line list")?;
            serde_json::from_str(&text).context("parsing line list JSON")?
        }
        "csv" => {
            let mut reader = csv::Reader::from_path(path).context("opening line list CSV")?;
            reader
                .deserialize::<TransitionRecord>()
                .enumerate()
                .map(|(i, r)| r.with_context(|| format!("line list row {i}")))
                .collect::<Result<_>>()?
        }
        other => bail!("Unsupported line list extension: .{other}"),
    };

    let lines = records
        .into_iter()
        .map(|r| Transition::try_from(r).map_err(anyhow::Error::from))
        .collect::<Result<Vec<_>>>()?;
    log::info!("Loaded {} transitions from {}", lines.len(), path.display());
    Ok(LineList::new(lines))
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn build(
    wave: Vec<f64>,
    flux: Vec<f64>,
    sig: Option<Vec<f64>>,
    co: Option<Vec<f64>>,
) -> Result<Spectrum> {
    // No error array: zero sigma, so values are measured with zero error.
    let sig = match sig {
        Some(sig) => sig,
        None => {
            log::warn!("No error column, using sigma = 0");
            vec![0.0; wave.len()]
        }
    };
    Ok(Spectrum::new(wave, flux, sig, co)?)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

fn load_json(path: &Path) -> Result<Vec<Spectrum>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    match &root {
        JsonValue::Array(records) => records
            .iter()
            .enumerate()
            .map(|(i, rec)| json_spectrum(rec).with_context(|| format!("Spectrum {i}")))
            .collect(),
        JsonValue::Object(_) => Ok(vec![json_spectrum(&root)?]),
        _ => bail!("Expected a JSON object or array of objects"),
    }
}

fn json_spectrum(rec: &JsonValue) -> Result<Spectrum> {
    let obj = rec.as_object().context("not a JSON object")?;
    let column = |names: &[&str]| -> Result<Option<Vec<f64>>> {
        match names.iter().find_map(|n| obj.get(*n)) {
            Some(v) => json_array_to_f64(v).map(Some),
            None => Ok(None),
        }
    };

    let wave = column(WAVE_COLUMNS)?.context("missing wavelength array")?;
    let flux = column(FLUX_COLUMNS)?.context("missing flux array")?;
    build(wave, flux, column(SIG_COLUMNS)?, column(CONT_COLUMNS)?)
}

fn json_array_to_f64(val: &JsonValue) -> Result<Vec<f64>> {
    let arr = val.as_array().context("expected an array of numbers")?;
    arr.iter()
        .enumerate()
        .map(|(j, v)| match v {
            JsonValue::Null => Ok(f64::NAN),
            _ => v.as_f64().with_context(|| format!("[{j}]: not a number")),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one row per pixel.
/// Empty cells read as NaN.
fn load_csv(path: &Path) -> Result<Spectrum> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();

    let find = |names: &[&str]| headers.iter().position(|h| names.contains(&h.as_str()));
    let wave_idx = find(WAVE_COLUMNS).context("CSV missing 'wave' column")?;
    let flux_idx = find(FLUX_COLUMNS).context("CSV missing 'flux' column")?;
    let sig_idx = find(SIG_COLUMNS);
    let co_idx = find(CONT_COLUMNS);

    let mut wave = Vec::new();
    let mut flux = Vec::new();
    let mut sig = sig_idx.map(|_| Vec::new());
    let mut co = co_idx.map(|_| Vec::new());

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let cell = |idx: usize| -> Result<f64> {
            let tok = record.get(idx).unwrap_or("").trim();
            if tok.is_empty() {
                return Ok(f64::NAN);
            }
            tok.parse::<f64>()
                .with_context(|| format!("Row {row_no}, column {idx}: '{tok}' is not a number"))
        };

        wave.push(cell(wave_idx)?);
        flux.push(cell(flux_idx)?);
        if let (Some(idx), Some(v)) = (sig_idx, sig.as_mut()) {
            v.push(cell(idx)?);
        }
        if let (Some(idx), Some(v)) = (co_idx, co.as_mut()) {
            v.push(cell(idx)?);
        }
    }

    build(wave, flux, sig, co)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file containing spectral data.
///
/// Flat numeric columns are concatenated across record batches into a single
/// spectrum; list columns yield one spectrum per row.
fn load_parquet(path: &Path) -> Result<Vec<Spectrum>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut flat = FlatColumns::default();
    let mut spectra = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let wave_idx = column_index(&schema, WAVE_COLUMNS)
            .context("Parquet file missing 'wave' column")?;
        let flux_idx = column_index(&schema, FLUX_COLUMNS)
            .context("Parquet file missing 'flux' column")?;
        let sig_idx = column_index(&schema, SIG_COLUMNS);
        let co_idx = column_index(&schema, CONT_COLUMNS);

        match batch.column(wave_idx).data_type() {
            DataType::List(_) | DataType::LargeList(_) => {
                for row in 0..batch.num_rows() {
                    let list = |idx: Option<usize>| -> Result<Option<Vec<f64>>> {
                        idx.map(|i| extract_f64_list(batch.column(i), row)).transpose()
                    };
                    let wave = extract_f64_list(batch.column(wave_idx), row)
                        .with_context(|| format!("Row {row}: failed to read wavelengths"))?;
                    let flux = extract_f64_list(batch.column(flux_idx), row)
                        .with_context(|| format!("Row {row}: failed to read flux"))?;
                    spectra.push(build(wave, flux, list(sig_idx)?, list(co_idx)?)?);
                }
            }
            _ => flat.append(&batch, wave_idx, flux_idx, sig_idx, co_idx)?,
        }
    }

    if !flat.wave.is_empty() {
        spectra.push(build(flat.wave, flat.flux, flat.sig, flat.co)?);
    }
    Ok(spectra)
}

/// Per-pixel columns accumulated across batches.
#[derive(Default)]
struct FlatColumns {
    wave: Vec<f64>,
    flux: Vec<f64>,
    sig: Option<Vec<f64>>,
    co: Option<Vec<f64>>,
}

impl FlatColumns {
    fn append(
        &mut self,
        batch: &RecordBatch,
        wave_idx: usize,
        flux_idx: usize,
        sig_idx: Option<usize>,
        co_idx: Option<usize>,
    ) -> Result<()> {
        self.wave.extend(extract_f64_column(batch.column(wave_idx))?);
        self.flux.extend(extract_f64_column(batch.column(flux_idx))?);
        if let Some(i) = sig_idx {
            self.sig
                .get_or_insert_with(Vec::new)
                .extend(extract_f64_column(batch.column(i))?);
        }
        if let Some(i) = co_idx {
            self.co
                .get_or_insert_with(Vec::new)
                .extend(extract_f64_column(batch.column(i))?);
        }
        Ok(())
    }
}

// -- Parquet / Arrow helpers --

fn column_index(schema: &Schema, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|n| schema.index_of(n).ok())
}

/// Read a whole Float64 / Float32 column, nulls as NaN.
fn extract_f64_column(col: &Arc<dyn Array>) -> Result<Vec<f64>> {
    to_f64_vec(col.as_ref())
}

/// Extract a `Vec<f64>` from a List or LargeList column at the given row.
fn extract_f64_list(col: &Arc<dyn Array>, row: usize) -> Result<Vec<f64>> {
    if col.is_null(row) {
        bail!("null value in list column");
    }

    let values_array = match col.data_type() {
        DataType::List(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<ListArray>()
                .context("expected ListArray")?;
            list_arr.value(row)
        }
        DataType::LargeList(_) => {
            let list_arr = col
                .as_any()
                .downcast_ref::<LargeListArray>()
                .context("expected LargeListArray")?;
            list_arr.value(row)
        }
        other => bail!("Expected List or LargeList column, got {other:?}"),
    };

    to_f64_vec(values_array.as_ref())
}

fn to_f64_vec(values: &dyn Array) -> Result<Vec<f64>> {
    if let Some(f64_arr) = values.as_any().downcast_ref::<Float64Array>() {
        Ok(f64_arr.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    } else if let Some(f32_arr) = values.as_any().downcast_ref::<Float32Array>() {
        Ok(f32_arr.iter().map(|v| v.map_or(f64::NAN, f64::from)).collect())
    } else {
        bail!(
            "Column type is {:?}, expected Float64 or Float32",
            values.data_type()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::linelist::TransitionLookup;
    use crate::data::model::SpectrumAccess;
    use std::io::Write;

    fn temp_with(ext: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_csv() {
        let file = temp_with("csv", "wave,flux,sig,co\n1.0,0.9,0.1,1.0\n2.0,0.5,0.1,1.0\n3.0,,0.1,1.0\n");
        let spec = load_spectrum(file.path()).unwrap();
        assert_eq!(spec.wavelengths(), &[1.0, 2.0, 3.0]);
        assert!(spec.flux()[2].is_nan());
        assert_eq!(spec.continuum().unwrap(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_load_json_object_and_array() {
        let one = temp_with("json", r#"{"wave":[1,2,3],"flux":[1,1,1],"sig":[0.1,0.1,null]}"#);
        let spec = load_spectrum(one.path()).unwrap();
        assert!(spec.continuum().is_none());
        assert!(spec.flux_error()[2].is_nan());

        let many = temp_with(
            "json",
            r#"[{"wave":[1,2],"flux":[1,1],"sig":[0.1,0.1]},{"wave":[3,4],"flux":[1,1]}]"#,
        );
        let spectra = load_spectra(many.path()).unwrap();
        assert_eq!(spectra.len(), 2);
        assert!(spectra[1].flux_error().iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_csv_without_error_column_is_measurable() {
        use crate::analysis::window::select_window;
        use crate::analysis::{equivalent_width, AnalysisInterval};
        use crate::config::Frame;
        use crate::units::Wavelength;

        let mut csv = String::from("wave,flux,co\n");
        for i in 0..10 {
            let flux = if i == 5 { 0.5 } else { 1.0 };
            csv.push_str(&format!("{},{flux},1.0\n", 1000.0 + 0.1 * i as f64));
        }
        let file = temp_with("csv", &csv);
        let spec = load_spectrum(file.path()).unwrap();
        assert!(spec.flux_error().iter().all(|&s| s == 0.0));

        let interval = AnalysisInterval::wavelength(
            Wavelength::from_angstrom(999.95),
            Wavelength::from_angstrom(1000.95),
        )
        .unwrap();
        let window = select_window(&spec, &interval, Wavelength::from_angstrom(1000.45), 0.0).unwrap();
        let ew = equivalent_width(&window, 0.0, Frame::Rest).unwrap();
        assert!((ew.ew.angstrom() - 0.05).abs() < 1e-9);
        assert_eq!(ew.sig_ew.angstrom(), 0.0);
        assert_eq!(ew.n_pix, 10);
    }

    #[test]
    fn test_missing_column_is_error() {
        let file = temp_with("csv", "flux,sig\n1.0,0.1\n");
        assert!(load_spectrum(file.path()).is_err());
    }

    #[test]
    fn test_unsupported_extension() {
        let file = temp_with("fits", "");
        assert!(load_spectra(file.path()).is_err());
    }

    #[test]
    fn test_load_line_list_csv() {
        let file = temp_with(
            "csv",
            "name,wrest,f,gamma,Z,ion\nTest 1000,1000.0,0.5,1e8,6,4\nTest 2000,2000.0,0.25,0,6,4\n",
        );
        let ll = load_line_list(file.path()).unwrap();
        assert_eq!(ll.len(), 2);
        let t = ll.lookup(&"Test 2000".into()).unwrap();
        assert_eq!(t.f(), 0.25);
    }

    #[test]
    fn test_load_line_list_rejects_bad_record() {
        let file = temp_with("json", r#"[{"name":"Bad","wrest":-5.0,"f":0.1}]"#);
        assert!(load_line_list(file.path()).is_err());
    }
}
