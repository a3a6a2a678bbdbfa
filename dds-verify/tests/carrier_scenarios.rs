//! End-to-end checks of recorded DDS carrier pairs.

use dds_verify::config::{BenchConfig, ToleranceConfig};
use dds_verify::runner::{BenchRunner, RunnerConfig};
use dds_verify::samples::SampleFileError;
use dds_verify::verifier::{AnalysisSettings, CarrierVerifier, VerifyError, CARRIER_FILE};
use std::f64::consts::PI;
use std::path::Path;
use tempfile::TempDir;

const FS: f64 = 100e6;
const N: usize = 10_000;

/// Quantized cos/sin carrier pair with a -60 dBc third-harmonic spur.
fn write_carrier(dir: &Path, freq: f64, phase_offset: f64) {
    let word = |x: f64| (x * 32767.0).round() as i64;
    let mut contents = String::new();
    for k in 0..N {
        let w = 2.0 * PI * freq * k as f64 / FS;
        let cos = 0.99 * w.cos() + 1e-3 * (3.0 * w).cos();
        let sin = -0.99 * (w + phase_offset).sin() + 1e-3 * (3.0 * w).cos();
        contents.push_str(&format!("{} {}\n", word(cos), word(sin)));
    }
    std::fs::write(dir.join(CARRIER_FILE), contents).unwrap();
}

fn tolerances() -> ToleranceConfig {
    BenchConfig::default_config().carrier["dds_14_41mhz"].clone()
}

fn verifier(tolerances: ToleranceConfig) -> CarrierVerifier {
    let global = BenchConfig::default_config().global;
    CarrierVerifier::new(tolerances, AnalysisSettings::from(&global)).unwrap()
}

#[test]
fn clean_carrier_pair_passes() {
    let dir = TempDir::new().unwrap();
    write_carrier(dir.path(), 14.41e6, 0.0);

    let report = verifier(tolerances()).check(dir.path()).unwrap();
    assert!(report.passed, "{:#?}", report);

    let cos = &report.cos.spectrum;
    assert!((cos.center_frequency_hz - 14.41e6).abs() < 1000.0);
    assert!(cos.center_amplitude_db.abs() < 1.5);
    assert!(cos.sfdr_db >= 44.24);
    assert!((cos.harmonic_frequency_hz - 43.23e6).abs() < 1000.0);

    let phase = &report.relation.checks[0];
    assert!((phase.measured + 90.0).abs() < 1.0, "phase {}", phase.measured);

    for png in ["spectrum_cos.png", "spectrum_sin.png"] {
        let len = std::fs::metadata(dir.path().join(png)).map(|m| m.len()).unwrap_or(0);
        assert!(len > 0, "{png} missing or empty");
    }
}

#[test]
fn wrong_frequency_fails_only_the_frequency_check() {
    let dir = TempDir::new().unwrap();
    write_carrier(dir.path(), 15e6, 0.0);

    let report = verifier(tolerances()).check(dir.path()).unwrap();
    assert!(!report.passed);
    assert!(!report.cos.outcome.checks[0].passed);
    assert!(report.cos.outcome.checks[1].passed);
    assert!(report.cos.outcome.checks[2].passed);
    assert!(report.relation.passed);
}

#[test]
fn phase_error_fails_the_relation_check() {
    let dir = TempDir::new().unwrap();
    write_carrier(dir.path(), 14.41e6, 10f64.to_radians());

    let report = verifier(tolerances()).check(dir.path()).unwrap();
    assert!(report.cos.outcome.passed);
    assert!(report.sin.outcome.passed);
    assert!(!report.relation.passed);
    assert!((report.relation.checks[0].measured + 100.0).abs() < 1.0);
}

#[test]
fn tight_sfdr_requirement_fails() {
    let dir = TempDir::new().unwrap();
    write_carrier(dir.path(), 14.41e6, 0.0);

    let mut strict = tolerances();
    strict.sfdr_min = 70.0;
    let report = verifier(strict).check(dir.path()).unwrap();
    assert!(!report.cos.outcome.checks[2].passed);
    assert!(!report.passed);
}

#[test]
fn missing_capture_is_an_io_error() {
    let dir = TempDir::new().unwrap();
    let err = verifier(tolerances()).check(dir.path()).unwrap_err();
    assert!(matches!(err, VerifyError::Samples(SampleFileError::Io { .. })));
}

#[test]
fn single_column_capture_is_rejected() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(CARRIER_FILE), "1\n2\n3\n").unwrap();
    let err = verifier(tolerances()).check(dir.path()).unwrap_err();
    assert!(matches!(err, VerifyError::ColumnCount { found: 1, .. }));
}

#[test]
fn sweep_reports_each_bench_with_a_capture() {
    let dir = TempDir::new().unwrap();
    let bench_dir = dir.path().join("dds_14_41mhz");
    std::fs::create_dir_all(&bench_dir).unwrap();
    write_carrier(&bench_dir, 14.41e6, 0.0);

    let runner = BenchRunner::new(
        RunnerConfig { output_dir: dir.path().to_path_buf() },
        BenchConfig::default_config(),
    );
    let report = runner.run_carrier_sweep();
    assert_eq!(report.summary.total, 1);
    assert_eq!(report.summary.passed, 1);

    let json = dir.path().join("report.json");
    report.save_json(&json).unwrap();
    let text = std::fs::read_to_string(&json).unwrap();
    assert!(text.contains("dds_14_41mhz"));
}
