//! Amplitude and phase trajectories of the demodulated baseband.
//!
//! The I/Q demodulator bench records the in-phase and quadrature outputs and,
//! when carrier recovery is enabled, the NCO adjustment as a third column.
//! This is a diagnostic stage: it renders `baseband.png` for inspection and
//! never fails a run on the signal content.
//!
//! Phase is `atan2(I, Q)`, with I as the first argument. This is rotated by
//! 90 degrees against the usual `atan2(Q, I)`; expected phase values in the
//! bench files are calibrated against this convention.

use crate::plot;
use crate::samples::{self, SampleFileError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Capture written by the I/Q demodulator bench.
pub const BASEBAND_FILE: &str = "baseband.txt";
/// Diagnostic plot written next to the capture.
pub const BASEBAND_PLOT: &str = "baseband.png";

#[derive(Error, Debug)]
pub enum BasebandError {
    #[error(transparent)]
    Samples(#[from] SampleFileError),
    #[error("{path} must have 2 (I, Q) or 3 (I, Q, NCO) columns, found {found}")]
    ColumnCount { path: PathBuf, found: usize },
}

/// Demodulated channels, all of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct BasebandCapture {
    pub i: Vec<f64>,
    pub q: Vec<f64>,
    /// Carrier-recovery loop adjustment, relative to the ADC rate.
    pub nco_adjust: Option<Vec<f64>>,
}

impl BasebandCapture {
    /// Build a capture from the columns of a baseband file.
    pub fn from_columns(path: &Path, columns: Vec<Vec<f64>>) -> Result<Self, BasebandError> {
        let found = columns.len();
        let mut columns = columns.into_iter();
        match (columns.next(), columns.next(), columns.next(), columns.next()) {
            (Some(i), Some(q), nco_adjust, None) => Ok(Self { i, q, nco_adjust }),
            _ => Err(BasebandError::ColumnCount { path: path.to_path_buf(), found }),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, BasebandError> {
        let path = path.as_ref();
        Self::from_columns(path, samples::read_columns(path)?)
    }

    pub fn len(&self) -> usize {
        self.i.len()
    }

    pub fn is_empty(&self) -> bool {
        self.i.is_empty()
    }
}

/// Per-sample amplitude and phase of a baseband capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasebandTrajectory {
    pub time_us: Vec<f64>,
    pub amplitude: Vec<f64>,
    pub phase_deg: Vec<f64>,
}

/// Aggregate figures for the diagnostic log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySummary {
    pub samples: usize,
    pub duration_us: f64,
    pub mean_amplitude: f64,
    pub min_amplitude: f64,
    pub max_amplitude: f64,
}

impl BasebandTrajectory {
    pub fn summary(&self) -> TrajectorySummary {
        let n = self.amplitude.len();
        let (min, max, sum) = self.amplitude.iter().fold(
            (f64::INFINITY, f64::NEG_INFINITY, 0.0),
            |(lo, hi, sum), &a| (lo.min(a), hi.max(a), sum + a),
        );
        TrajectorySummary {
            samples: n,
            duration_us: self.time_us.last().copied().unwrap_or(0.0),
            mean_amplitude: if n > 0 { sum / n as f64 } else { 0.0 },
            min_amplitude: if n > 0 { min } else { 0.0 },
            max_amplitude: if n > 0 { max } else { 0.0 },
        }
    }
}

/// Compute amplitude `|(I, Q)|` and phase `atan2(I, Q)` per sample.
pub fn characterize(capture: &BasebandCapture, sample_period_us: f64) -> BasebandTrajectory {
    let time_us = (0..capture.len()).map(|k| k as f64 * sample_period_us).collect();
    let (amplitude, phase_deg) = capture
        .i
        .iter()
        .zip(&capture.q)
        .map(|(&i, &q)| (i.hypot(q), i.atan2(q).to_degrees()))
        .unzip();

    BasebandTrajectory {
        time_us,
        amplitude,
        phase_deg,
    }
}

/// Diagnostic stage of the I/Q demodulator bench.
#[derive(Debug, Clone, Copy)]
pub struct BasebandCharacterizer {
    sample_period_us: f64,
}

impl BasebandCharacterizer {
    pub fn new(sample_period_us: f64) -> Self {
        Self { sample_period_us }
    }

    /// Read `baseband.txt` from `output_path` and render `baseband.png`.
    ///
    /// Only I/O and format problems are errors; the trajectory itself is
    /// never judged.
    pub fn check(&self, output_path: impl AsRef<Path>) -> Result<BasebandTrajectory, BasebandError> {
        let output_path = output_path.as_ref();
        let capture = BasebandCapture::load(output_path.join(BASEBAND_FILE))?;
        let trajectory = characterize(&capture, self.sample_period_us);

        let png = output_path.join(BASEBAND_PLOT);
        if let Err(e) = plot::render_baseband(&png, &capture, &trajectory) {
            warn!(path = %png.display(), error = %e, "failed to render baseband");
        }

        let summary = trajectory.summary();
        info!(
            samples = summary.samples,
            duration_us = summary.duration_us,
            mean_amplitude = summary.mean_amplitude,
            nco = capture.nco_adjust.is_some(),
            "baseband characterized"
        );
        Ok(trajectory)
    }
}
