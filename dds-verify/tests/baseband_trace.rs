//! Baseband captures from the I/Q demodulator bench.

use dds_verify::baseband::{BasebandCharacterizer, BasebandError, BASEBAND_FILE, BASEBAND_PLOT};
use std::path::Path;
use tempfile::TempDir;

fn plot_len(dir: &Path) -> u64 {
    std::fs::metadata(dir.join(BASEBAND_PLOT)).map(|m| m.len()).unwrap_or(0)
}

fn write_capture(dir: &Path, rows: &[&[f64]]) {
    let contents: String = rows
        .iter()
        .map(|row| {
            let cols: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            cols.join(" ") + "\n"
        })
        .collect();
    std::fs::write(dir.join(BASEBAND_FILE), contents).unwrap();
}

/// I/Q of a constant-envelope signal rotating through the four quadrants.
fn rotating(n: usize) -> Vec<[f64; 2]> {
    (0..n)
        .map(|k| {
            let a = 2.0 * std::f64::consts::PI * k as f64 / n as f64;
            [0.5 * a.sin(), 0.5 * a.cos()]
        })
        .collect()
}

#[test]
fn two_column_capture_is_characterized() {
    let dir = TempDir::new().unwrap();
    let samples = rotating(64);
    let rows: Vec<&[f64]> = samples.iter().map(|r| r.as_slice()).collect();
    write_capture(dir.path(), &rows);

    let trajectory = BasebandCharacterizer::new(0.32).check(dir.path()).unwrap();
    assert_eq!(trajectory.amplitude.len(), 64);
    assert!(trajectory.amplitude.iter().all(|a| (a - 0.5).abs() < 1e-9));
    // atan2(I, Q) recovers the rotation angle
    assert!(trajectory.phase_deg[0].abs() < 1e-9);
    assert!((trajectory.phase_deg[16] - 90.0).abs() < 1e-9);
    assert!((trajectory.time_us[63] - 63.0 * 0.32).abs() < 1e-9);
    assert!(plot_len(dir.path()) > 0);
}

#[test]
fn three_column_capture_keeps_nco_adjustment() {
    let dir = TempDir::new().unwrap();
    let rows: Vec<Vec<f64>> = rotating(32)
        .into_iter()
        .enumerate()
        .map(|(k, [i, q])| vec![i, q, 0.01 * k as f64 - 0.1])
        .collect();
    let refs: Vec<&[f64]> = rows.iter().map(|r| r.as_slice()).collect();
    write_capture(dir.path(), &refs);

    let trajectory = BasebandCharacterizer::new(0.32).check(dir.path()).unwrap();
    assert_eq!(trajectory.phase_deg.len(), 32);
    assert_eq!(trajectory.summary().samples, 32);
    assert!(plot_len(dir.path()) > 0);
}

#[test]
fn four_columns_are_rejected() {
    let dir = TempDir::new().unwrap();
    write_capture(dir.path(), &[&[1.0, 2.0, 3.0, 4.0][..]]);
    let err = BasebandCharacterizer::new(0.32).check(dir.path()).unwrap_err();
    assert!(matches!(err, BasebandError::ColumnCount { found: 4, .. }));
}

#[test]
fn missing_capture_is_an_error() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(
        BasebandCharacterizer::new(0.32).check(dir.path()),
        Err(BasebandError::Samples(_))
    ));
}
