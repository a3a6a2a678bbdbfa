//! # DDS Waveform Verification Library
//!
//! Stimulus generation and result checking for the simulation benches of a
//! DDS carrier generator and an I/Q demodulator.
//!
//! The simulator itself is external. This crate provides the hooks it calls
//! around a run:
//!
//! - before the run, a QPSK-style stimulus vector is written as quantized
//!   integers to `input.txt`;
//! - after the run, the recorded cosine/sine carrier pair is checked for
//!   frequency, level, SFDR and quadrature phase;
//! - the demodulated I/Q baseband is turned into amplitude and phase
//!   trajectories and plotted for inspection.
//!
//! ## Library Usage
//!
//! ### Spectral Analysis
//!
//! ```rust
//! use dds_verify::samples::SampleSequence;
//! use dds_verify::spectrum;
//!
//! let fs = 100e6;
//! let tone: Vec<f64> = (0..1000)
//!     .map(|k| (2.0 * std::f64::consts::PI * 10e6 * k as f64 / fs).cos())
//!     .collect();
//! let sequence = SampleSequence::new(tone, 1.0 / fs).unwrap();
//!
//! let analysis = spectrum::analyse(&sequence, 0.3);
//! assert!((analysis.result.center.frequency - 10e6).abs() < 1e3);
//! ```
//!
//! ### Bench Hooks
//!
//! ```rust,ignore
//! use dds_verify::prelude::*;
//!
//! let runner = BenchRunner::new(RunnerConfig::default(), BenchConfig::load("bench.yaml")?);
//! runner.prepare("qpsk_snr3")?;
//! // ... run the simulator ...
//! let report = runner.check_carrier("dds_14_41mhz")?;
//! report.print_trace();
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # Write input.txt for a stimulus entry
//! dds-verify prepare qpsk_snr3
//!
//! # Check a recorded carrier pair
//! dds-verify check-carrier dds_14_41mhz
//!
//! # Plot a baseband capture
//! dds-verify check-baseband output/demod
//!
//! # Check every carrier entry with a capture on disk
//! dds-verify sweep --report report.json
//! ```
//!
//! ## Module Overview
//!
//! - [`config`] - YAML bench configuration
//! - [`samples`] - Text sample files and fixed-point quantization
//! - [`spectrum`] - Spectrum, peak detection, SFDR and THD
//! - [`stimulus`] - Modulated stimulus generator
//! - [`verifier`] - Carrier checks against tolerances
//! - [`baseband`] - Amplitude/phase characterization of I/Q captures
//! - [`plot`] - PNG rendering
//! - [`npy`] - NumPy .npy dumps
//! - [`runner`] - Bench hooks and sweeps
//! - [`report`] - JSON and terminal reporting
//! - [`logging`] - `tracing` subscriber setup

// ============================================================================
// Public modules
// ============================================================================

pub mod baseband;
pub mod config;
pub mod logging;
pub mod npy;
pub mod plot;
pub mod report;
pub mod runner;
pub mod samples;
pub mod spectrum;
pub mod stimulus;
pub mod verifier;

// ============================================================================
// Top-level re-exports for convenience
// ============================================================================

// Config types
pub use config::{BenchConfig, ConfigError, GlobalConfig, StimulusConfig, ToleranceConfig};

// Analysis types
pub use samples::{Quantizer, SampleFileError, SampleSequence};
pub use spectrum::{SpectralAnalysis, SpectralPeak, SpectralResult, Spectrum};

// Runner types
pub use runner::{BenchRunner, RunnerConfig, RunnerError};

// Report types
pub use report::{
    BenchResult, CarrierReport, MetricCheck, ReportSummary, SignalReport, SweepReport,
    VerificationOutcome,
};

/// Prelude module - import everything commonly needed
///
/// ```rust
/// use dds_verify::prelude::*;
/// ```
pub mod prelude {
    pub use crate::baseband::{characterize, BasebandCapture, BasebandCharacterizer, BasebandTrajectory};
    pub use crate::config::{BenchConfig, GlobalConfig, StimulusConfig, ToleranceConfig};
    pub use crate::report::{CarrierReport, MetricCheck, SweepReport, VerificationOutcome};
    pub use crate::runner::{BenchRunner, RunnerConfig};
    pub use crate::samples::{Quantizer, SampleSequence};
    pub use crate::spectrum::{analyse, find_peaks, SpectralResult, Spectrum};
    pub use crate::stimulus::{StimulusGenerator, StimulusSettings};
    pub use crate::verifier::{AnalysisSettings, CarrierVerifier};
}
