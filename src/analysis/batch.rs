use std::collections::BTreeMap;

use rayon::prelude::*;

use super::measurement::AbsLine;
use super::window::AnalysisInterval;
use crate::config::{AodmConfig, Frame};
use crate::data::linelist::{TransitionKey, TransitionLookup};
use crate::data::model::SpectrumAccess;
use crate::error::LineError;
use crate::units::Wavelength;

/// Build one line per rest wavelength, looking each distinct wavelength up
/// only once.
pub fn abs_lines_from_wavelengths<L: TransitionLookup + ?Sized>(
    wrests: &[Wavelength],
    lookup: &L,
    z: f64,
) -> Result<Vec<AbsLine>, LineError> {
    let mut cache: BTreeMap<u64, AbsLine> = BTreeMap::new();
    let mut lines = Vec::with_capacity(wrests.len());
    for &wrest in wrests {
        let key = wrest.angstrom().to_bits();
        let line = match cache.get(&key) {
            Some(line) => line.clone(),
            None => {
                let line = AbsLine::new(lookup, &TransitionKey::from(wrest), z)?;
                cache.insert(key, line.clone());
                line
            }
        };
        lines.push(line);
    }
    log::debug!(
        "Built {} lines from {} distinct transitions",
        lines.len(),
        cache.len()
    );
    Ok(lines)
}

/// Measure EW and AODM for every line on the same spectrum, in parallel.
///
/// Each task owns exactly one line, so no record is written concurrently.
/// Results come back in input order.
pub fn measure_many<S: SpectrumAccess + Sync + ?Sized>(
    lines: &mut [AbsLine],
    spec: &S,
    interval: &AnalysisInterval,
    frame: Frame,
    config: &AodmConfig,
) -> Vec<Result<(), LineError>> {
    let results: Vec<Result<(), LineError>> = lines
        .par_iter_mut()
        .map(|line| {
            let res = line.measure(spec, interval, frame, config).map(|_| ());
            if let Err(e) = &res {
                log::warn!("{}: {e}", line.transition().name());
            }
            res
        })
        .collect();
    let failed = results.iter().filter(|r| r.is_err()).count();
    log::info!("Measured {} lines ({failed} failed)", results.len());
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::measurement::MeasurementFlag;
    use crate::analysis::voigt::voigt_flux;
    use crate::data::linelist::LineList;
    use crate::data::model::Spectrum;
    use crate::units::{ColumnDensity, Velocity};

    #[test]
    fn test_abs_lines_from_wavelengths() {
        let ll = LineList::ism();
        let w = [
            Wavelength::from_angstrom(1548.195),
            Wavelength::from_angstrom(1550.770),
            Wavelength::from_angstrom(1548.195),
        ];
        let lines = abs_lines_from_wavelengths(&w, &ll, 1.5).unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], lines[2]);
        assert_eq!(lines[1].transition().name(), "CIV 1550");

        let bad = [Wavelength::from_angstrom(1234.5)];
        assert!(abs_lines_from_wavelengths(&bad, &ll, 1.5).is_err());
    }

    #[test]
    fn test_measure_many_matches_serial() {
        let ll = LineList::ism();
        let z = 1.5;
        let mut lines = abs_lines_from_wavelengths(
            &[
                Wavelength::from_angstrom(1548.195),
                Wavelength::from_angstrom(1550.770),
            ],
            &ll,
            z,
        )
        .unwrap();

        let wave: Vec<f64> = (0..4000).map(|i| 3860.0 + 0.01 * i as f64).collect();
        let mut flux = vec![1.0; wave.len()];
        for line in &lines {
            let prof = line
                .generate_voigt(&wave, ColumnDensity::from_log10(13.5), Velocity::from_km_per_s(15.0))
                .unwrap();
            for (f, p) in flux.iter_mut().zip(prof) {
                *f *= p;
            }
        }
        let n = wave.len();
        let spec = Spectrum::new(wave, flux, vec![0.01; n], Some(vec![1.0; n])).unwrap();
        let vlim = AnalysisInterval::velocity(
            Velocity::from_km_per_s(-80.0),
            Velocity::from_km_per_s(80.0),
        )
        .unwrap();

        let mut serial = lines.clone();
        let results = measure_many(&mut lines, &spec, &vlim, Frame::Rest, &AodmConfig::default());
        assert!(results.iter().all(|r| r.is_ok()));
        for (par, ser) in lines.iter().zip(serial.iter_mut()) {
            ser.measure(&spec, &vlim, Frame::Rest, &AodmConfig::default())
                .unwrap();
            assert_eq!(par.measurement(), ser.measurement());
            assert_eq!(par.measurement().flag(), MeasurementFlag::Detection);
        }
    }
}
