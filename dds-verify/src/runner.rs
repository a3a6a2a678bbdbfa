//! Bench hooks and sweep orchestration.
//!
//! The simulation harness gives every named configuration its own output
//! directory. Before a run it calls the stimulus hook, which writes
//! `input.txt` there; after the run it calls the check hooks, which read the
//! simulator's captures from the same directory.
//!
//! ```text
//! <output_dir>/<name>/input.txt      <- prepare
//! <output_dir>/<name>/carrier.txt    -> check_carrier
//! <output_dir>/<name>/baseband.txt   -> check_baseband
//! ```
//!
//! # Using BenchRunner
//!
//! ```rust,ignore
//! use dds_verify::{
//!     config::BenchConfig,
//!     runner::{BenchRunner, RunnerConfig},
//! };
//!
//! let runner = BenchRunner::new(RunnerConfig::default(), BenchConfig::default_config());
//! runner.prepare("qpsk_snr3")?;
//! // ... simulate ...
//! let report = runner.check_carrier("dds_14_41mhz")?;
//! println!("passed: {}", report.passed);
//! ```

use crate::baseband::{BasebandCharacterizer, BasebandError, BasebandTrajectory};
use crate::config::{BenchConfig, ConfigError};
use crate::report::{BenchResult, CarrierReport, SweepReport};
use crate::stimulus::{StimulusError, StimulusGenerator, StimulusSettings};
use crate::verifier::{AnalysisSettings, CarrierVerifier, VerifyError, CARRIER_FILE};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Stimulus(#[from] StimulusError),
    #[error(transparent)]
    Verify(#[from] VerifyError),
    #[error(transparent)]
    Baseband(#[from] BasebandError),
    #[error("Output directory not found: {0}")]
    MissingOutput(PathBuf),
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Runner configuration.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Root holding one directory per named configuration.
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Runs the bench hooks for named configurations.
pub struct BenchRunner {
    config: RunnerConfig,
    bench: BenchConfig,
}

impl BenchRunner {
    pub fn new(config: RunnerConfig, bench: BenchConfig) -> Self {
        Self { config, bench }
    }

    pub fn bench(&self) -> &BenchConfig {
        &self.bench
    }

    /// Output directory of a named configuration.
    pub fn output_path(&self, name: &str) -> PathBuf {
        self.config.output_dir.join(name)
    }

    /// Write the stimulus vector of `name`, creating its output directory.
    pub fn prepare(&self, name: &str) -> Result<PathBuf, RunnerError> {
        let stimulus = self.bench.stimulus_entry(name)?.clone();
        let generator = StimulusGenerator::new(stimulus, StimulusSettings::from(&self.bench.global))?;

        let dir = self.output_path(name);
        std::fs::create_dir_all(&dir).map_err(|source| RunnerError::CreateDir {
            path: dir.clone(),
            source,
        })?;
        Ok(generator.prepare(&dir)?)
    }

    /// Verify the carrier capture of `name`.
    pub fn check_carrier(&self, name: &str) -> Result<CarrierReport, RunnerError> {
        let tolerances = self.bench.carrier_entry(name)?.clone();
        let verifier = CarrierVerifier::new(tolerances, AnalysisSettings::from(&self.bench.global))?;

        let dir = self.output_path(name);
        if !dir.is_dir() {
            return Err(RunnerError::MissingOutput(dir));
        }
        Ok(verifier.check(&dir)?)
    }

    /// Characterize the baseband capture in `dir`.
    pub fn check_baseband(&self, dir: &Path) -> Result<BasebandTrajectory, RunnerError> {
        let characterizer = BasebandCharacterizer::new(self.bench.global.baseband_sample_period_us);
        Ok(characterizer.check(dir)?)
    }

    /// Check every carrier configuration that has a capture on disk.
    ///
    /// Failures of individual benches are recorded in the report.
    pub fn run_carrier_sweep(&self) -> SweepReport {
        let mut benches = BTreeMap::new();

        for name in self.bench.carrier.keys() {
            if !self.output_path(name).join(CARRIER_FILE).exists() {
                warn!(bench = %name, "no carrier capture, skipping");
                continue;
            }

            let result = match self.check_carrier(name) {
                Ok(report) => BenchResult::from_report(report),
                Err(e) => BenchResult::from_error(e.to_string()),
            };
            info!(bench = %name, passed = result.passed, "bench checked");
            benches.insert(name.clone(), result);
        }

        SweepReport::new(benches, self.bench.global.sampling_freq)
    }
}
