use std::io::Write;

use approx::assert_relative_eq;
use rusty_lines::analysis::aodm::AODM_CONSTANT;
use rusty_lines::analysis::{AbsLine, AnalysisInterval, MeasurementFlag};
use rusty_lines::config::{AodmConfig, Frame};
use rusty_lines::data::linelist::{LineList, Transition};
use rusty_lines::data::loader::load_spectrum;
use rusty_lines::data::model::Spectrum;
use rusty_lines::units::{ColumnDensity, Velocity, Wavelength, C_KMS};
use rusty_lines::LineError;

const WREST: f64 = 1000.45;
const F: f64 = 0.5;

fn test_line(z: f64) -> AbsLine {
    let t = Transition::new("Test 1000", Wavelength::from_angstrom(WREST), F, 0.0, 6, 4).unwrap();
    AbsLine::from_transition(t, z).unwrap()
}

/// Ten 0.1 Å pixels from 1000.0 Å with one pixel at half the continuum.
fn dip_spectrum(dip_flux: f64) -> Spectrum {
    let wave: Vec<f64> = (0..10).map(|i| 1000.0 + 0.1 * i as f64).collect();
    let mut flux = vec![1.0; 10];
    flux[5] = dip_flux;
    Spectrum::new(wave, flux, vec![0.01; 10], Some(vec![1.0; 10])).unwrap()
}

fn full_window() -> AnalysisInterval {
    AnalysisInterval::wavelength(
        Wavelength::from_angstrom(999.95),
        Wavelength::from_angstrom(1000.95),
    )
    .unwrap()
}

#[test]
fn single_pixel_deficit_gives_half_pixel_ew() {
    let spec = dip_spectrum(0.5);
    let mut line = test_line(0.0);
    let res = line.measure_ew(&spec, &full_window(), Frame::Rest).unwrap();
    assert_relative_eq!(res.ew.angstrom(), 0.05, epsilon = 1e-9);
    assert_eq!(res.n_pix, 10);
    // σ = sqrt(9 (0.01·0.1)² + (0.01·0.1)²)
    assert_relative_eq!(res.sig_ew.angstrom(), (10.0_f64).sqrt() * 1e-3, epsilon = 1e-9);
}

#[test]
fn aodm_of_half_depth_pixel_matches_hand_value() {
    let spec = dip_spectrum(0.5);
    let mut line = test_line(0.0);
    let res = line
        .measure_aodm(&spec, &full_window(), &AodmConfig::default())
        .unwrap();

    let dv = C_KMS * 0.1 / WREST;
    let expected = AODM_CONSTANT / (F * WREST) * 2.0_f64.ln() * dv;
    assert_relative_eq!(res.column.value(), expected, max_relative = 1e-9);
    assert_eq!(res.flag, MeasurementFlag::Detection);
    assert_eq!(res.n_saturated, 0);

    let log = res.log.unwrap();
    assert_relative_eq!(log.log_n, expected.log10(), epsilon = 1e-9);
}

#[test]
fn zero_flux_pixel_is_saturated_not_infinite() {
    let spec = dip_spectrum(0.0);
    let mut line = test_line(0.0);
    let config = AodmConfig::default();
    let res = line.measure_aodm(&spec, &full_window(), &config).unwrap();

    assert_eq!(res.flag, MeasurementFlag::Saturated);
    assert_eq!(res.n_saturated, 1);
    assert!(res.column.value().is_finite());
    assert!(res.sig_column.value().is_finite());

    let dv = C_KMS * 0.1 / WREST;
    let tau_floor = -config.saturation_floor.ln();
    let expected = AODM_CONSTANT / (F * WREST) * tau_floor * dv;
    assert_relative_eq!(res.column.value(), expected, max_relative = 1e-9);
}

#[test]
fn interval_below_coverage_is_range_error() {
    let spec = dip_spectrum(0.5);
    let mut line = test_line(0.0);
    let below = AnalysisInterval::wavelength(
        Wavelength::from_angstrom(900.0),
        Wavelength::from_angstrom(950.0),
    )
    .unwrap();

    let err = line.measure_ew(&spec, &below, Frame::Rest).unwrap_err();
    assert!(err.is_range_error());
    let err = line
        .measure_aodm(&spec, &below, &AodmConfig::default())
        .unwrap_err();
    assert!(matches!(err, LineError::Range { .. }));
    assert!(line.measurement().ew.is_none());
    assert!(line.measurement().aodm.is_none());
}

#[test]
fn observer_ew_is_rest_ew_times_one_plus_z() {
    let spec = dip_spectrum(0.5);
    let z = 0.5;
    let mut line = test_line(z);
    let rest = line.measure_restew(&spec, &full_window()).unwrap();
    let obs = line.measure_ew(&spec, &full_window(), Frame::Observer).unwrap();
    assert_relative_eq!(obs.ew.angstrom(), rest.ew.angstrom() * (1.0 + z), epsilon = 1e-12);
    assert_relative_eq!(obs.sig_ew.angstrom(), rest.sig_ew.angstrom() * (1.0 + z), epsilon = 1e-12);
    // The latest call is the one kept on the line.
    assert_eq!(line.measurement().ew, Some(obs));
}

#[test]
fn continuum_padding_outside_window_changes_nothing() {
    let narrow = dip_spectrum(0.5);

    let wave: Vec<f64> = (0..30).map(|i| 999.0 + 0.1 * i as f64).collect();
    let mut flux = vec![1.0; 30];
    flux[15] = 0.5;
    let padded = Spectrum::new(wave, flux, vec![0.01; 30], Some(vec![1.0; 30])).unwrap();

    let config = AodmConfig::default();
    let mut a = test_line(0.0);
    let mut b = test_line(0.0);
    let ma = a.measure(&narrow, &full_window(), Frame::Rest, &config).unwrap().clone();
    let mb = b.measure(&padded, &full_window(), Frame::Rest, &config).unwrap().clone();

    assert_relative_eq!(
        ma.ew().unwrap().angstrom(),
        mb.ew().unwrap().angstrom(),
        epsilon = 1e-12
    );
    assert_relative_eq!(
        ma.column().unwrap().value(),
        mb.column().unwrap().value(),
        max_relative = 1e-12
    );
    assert_eq!(ma.flag(), mb.flag());
}

#[test]
fn failed_measure_keeps_previous_record() {
    let spec = dip_spectrum(0.5);
    let mut line = test_line(0.0);
    let config = AodmConfig::default();
    let before = line
        .measure(&spec, &full_window(), Frame::Rest, &config)
        .unwrap()
        .clone();

    let outside = AnalysisInterval::wavelength(
        Wavelength::from_angstrom(1100.0),
        Wavelength::from_angstrom(1110.0),
    )
    .unwrap();
    assert!(line.measure(&spec, &outside, Frame::Rest, &config).is_err());
    assert_eq!(line.measurement(), &before);
}

#[test]
fn weak_lyman_alpha_recovers_input_column() {
    let ll = LineList::ism();
    let mut line = AbsLine::new(&ll, &"HI 1215".into(), 0.0).unwrap();

    let wave: Vec<f64> = (0..801).map(|i| 1213.67 + 0.005 * i as f64).collect();
    let n = wave.len();
    let column = ColumnDensity::from_log10(12.0);
    let flux = line
        .generate_voigt(&wave, column, Velocity::from_km_per_s(20.0))
        .unwrap();
    let spec = Spectrum::new(wave, flux, vec![1e-4; n], None).unwrap();

    let vlim = AnalysisInterval::velocity(
        Velocity::from_km_per_s(-200.0),
        Velocity::from_km_per_s(200.0),
    )
    .unwrap();
    let f = line.transition().f();
    let wrest = line.wrest().angstrom();
    let m = line
        .measure(&spec, &vlim, Frame::Rest, &AodmConfig::default())
        .unwrap();

    assert_eq!(m.flag(), MeasurementFlag::Detection);
    assert_relative_eq!(m.log_column().unwrap().log_n, 12.0, epsilon = 0.01);

    // Linear part of the curve of growth: W = (π e² / m_e c²) N f λ².
    let linear = 8.85e-21 * column.value() * f * wrest * wrest;
    assert_relative_eq!(m.ew().unwrap().angstrom(), linear, max_relative = 0.03);
}

#[test]
fn csv_spectrum_measures_like_in_memory_one() {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "wave,flux,sig,co").unwrap();
    for i in 0..10 {
        let flux = if i == 5 { 0.5 } else { 1.0 };
        writeln!(file, "{},{flux},0.01,1.0", 1000.0 + 0.1 * i as f64).unwrap();
    }
    file.flush().unwrap();

    let loaded = load_spectrum(file.path()).unwrap();
    let mut line = test_line(0.0);
    let res = line.measure_restew(&loaded, &full_window()).unwrap();
    assert_relative_eq!(res.ew.angstrom(), 0.05, epsilon = 1e-9);
}
