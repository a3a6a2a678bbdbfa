//! YAML-based bench configuration.
//!
//! This module defines the configuration schema for the carrier verifier and
//! the stimulus generator. Configuration can be loaded from YAML files or
//! constructed programmatically.
//!
//! # Configuration Structure
//!
//! ```yaml
//! global:
//!   sampling_freq: 100000000.0
//!   peak_threshold: 0.3
//!   full_scale_bits: 15
//!
//! carrier:
//!   dds_14_41mhz:
//!     target_frequency: 14410000.0
//!     target_frequency_tollerance: 1000.0
//!     amplitude_tollerance: 1.5
//!     SFDR_min: 44.24
//!     expected_phase: -90.0
//!     expected_phase_tollerance: 1.0
//!
//! stimulus:
//!   qpsk_snr3:
//!     samples: 100000
//!     freq: 100000.0
//!     ampl: 0.2
//!     offset: 0.0
//!     SNR: 3.0
//!     seed: 1
//!     data: [[1, 1], [-1, 1], [-1, -1], [1, -1]]
//! ```
//!
//! The tolerance keys keep the historical `tollerance` spelling used by the
//! existing bench files; `tolerance` is accepted as an alias.
//!
//! # Programmatic Usage
//!
//! ```rust
//! use dds_verify::config::{BenchConfig, ToleranceConfig};
//!
//! let config = BenchConfig::default_config();
//! let tolerances: &ToleranceConfig = config.carrier_entry("dds_14_41mhz").unwrap();
//! assert!(tolerances.validate().is_ok());
//! ```

use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),
    #[error("Invalid value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("{samples} samples cannot be split evenly across {symbols} symbols")]
    SymbolRepetition { samples: usize, symbols: usize },
    #[error("No {section} entry named '{name}'")]
    UnknownEntry { section: &'static str, name: String },
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub carrier: BTreeMap<String, ToleranceConfig>,
    #[serde(default)]
    pub stimulus: BTreeMap<String, StimulusConfig>,
}

/// System-wide settings shared by all benches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Design clock in Hz. The sample interval of every capture is its inverse.
    #[serde(default = "default_sampling_freq")]
    pub sampling_freq: f64,
    /// Relative height a spectral local maximum must exceed to count as a peak.
    #[serde(default = "default_peak_threshold")]
    pub peak_threshold: f64,
    /// Sample words are signed fixed point with this many fractional bits.
    #[serde(default = "default_full_scale_bits")]
    pub full_scale_bits: u32,
    /// Time between two demodulated baseband samples.
    #[serde(default = "default_baseband_sample_period_us")]
    pub baseband_sample_period_us: f64,
    /// Also persist every analysed spectrum as `.npy`.
    #[serde(default)]
    pub dump_spectra: bool,
}

fn default_sampling_freq() -> f64 { 100e6 }
fn default_peak_threshold() -> f64 { 0.3 }
fn default_full_scale_bits() -> u32 { 15 }
// 10 ns clock, 32 clocks per demodulated sample
fn default_baseband_sample_period_us() -> f64 { 0.32 }

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            sampling_freq: default_sampling_freq(),
            peak_threshold: default_peak_threshold(),
            full_scale_bits: default_full_scale_bits(),
            baseband_sample_period_us: default_baseband_sample_period_us(),
            dump_spectra: false,
        }
    }
}

impl GlobalConfig {
    /// Check that the shared settings describe a usable system.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.sampling_freq.is_finite() && self.sampling_freq > 0.0) {
            return Err(ConfigError::Invalid {
                key: "sampling_freq",
                reason: format!("must be a positive frequency, got {}", self.sampling_freq),
            });
        }
        if !(0.0..=1.0).contains(&self.peak_threshold) {
            return Err(ConfigError::Invalid {
                key: "peak_threshold",
                reason: format!("must lie in [0, 1], got {}", self.peak_threshold),
            });
        }
        if self.full_scale_bits == 0 || self.full_scale_bits > 30 {
            return Err(ConfigError::Invalid {
                key: "full_scale_bits",
                reason: format!("must lie in 1..=30, got {}", self.full_scale_bits),
            });
        }
        if !(self.baseband_sample_period_us.is_finite() && self.baseband_sample_period_us > 0.0) {
            return Err(ConfigError::Invalid {
                key: "baseband_sample_period_us",
                reason: format!("must be positive, got {}", self.baseband_sample_period_us),
            });
        }
        Ok(())
    }

    /// Interval between two carrier samples in seconds.
    pub fn sample_interval(&self) -> f64 {
        1.0 / self.sampling_freq
    }
}

/// Numeric bounds for one carrier verification run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToleranceConfig {
    /// Expected carrier frequency in Hz.
    pub target_frequency: f64,
    #[serde(rename = "target_frequency_tollerance", alias = "target_frequency_tolerance")]
    pub target_frequency_tolerance: f64,
    /// Allowed deviation of the carrier level from 0 dBFS.
    #[serde(rename = "amplitude_tollerance", alias = "amplitude_tolerance")]
    pub amplitude_tolerance: f64,
    #[serde(rename = "SFDR_min", alias = "sfdr_min")]
    pub sfdr_min: f64,
    /// Expected phase of the cosine path relative to the sine path, in degrees.
    pub expected_phase: f64,
    #[serde(rename = "expected_phase_tollerance", alias = "expected_phase_tolerance")]
    pub expected_phase_tolerance: f64,
}

impl ToleranceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        finite("target_frequency", self.target_frequency)?;
        finite("expected_phase", self.expected_phase)?;
        non_negative("target_frequency_tollerance", self.target_frequency_tolerance)?;
        non_negative("amplitude_tollerance", self.amplitude_tolerance)?;
        non_negative("SFDR_min", self.sfdr_min)?;
        non_negative("expected_phase_tollerance", self.expected_phase_tolerance)?;
        Ok(())
    }
}

/// Parameters of a generated modulated test vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StimulusConfig {
    /// Number of samples in the vector. Whole floats such as `2e3` are accepted.
    #[serde(deserialize_with = "whole_count::deserialize")]
    pub samples: usize,
    /// Carrier frequency in Hz.
    pub freq: f64,
    /// Scale applied to the noisy modulated signal, as a fraction of full scale.
    pub ampl: f64,
    #[serde(default)]
    pub offset: f64,
    #[serde(rename = "SNR", alias = "snr")]
    pub snr_db: f64,
    /// Constellation points, in order; each occupies `samples / data.len()` samples.
    #[serde(with = "symbol_list")]
    pub data: Vec<Complex<f64>>,
    /// RNG seed for the additive noise. Without one the noise differs per run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl StimulusConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.samples == 0 {
            return Err(ConfigError::Invalid {
                key: "samples",
                reason: "at least one sample is required".to_string(),
            });
        }
        if self.data.is_empty() {
            return Err(ConfigError::Invalid {
                key: "data",
                reason: "at least one symbol is required".to_string(),
            });
        }
        if self.samples % self.data.len() != 0 {
            return Err(ConfigError::SymbolRepetition {
                samples: self.samples,
                symbols: self.data.len(),
            });
        }
        finite("freq", self.freq)?;
        finite("offset", self.offset)?;
        finite("SNR", self.snr_db)?;
        if !(self.ampl.is_finite() && self.ampl.abs() <= 1.0) {
            return Err(ConfigError::Invalid {
                key: "ampl",
                reason: format!("must lie in [-1, 1], got {}", self.ampl),
            });
        }
        if let Some(bad) = self.data.iter().find(|s| !(s.re.is_finite() && s.im.is_finite())) {
            return Err(ConfigError::Invalid {
                key: "data",
                reason: format!("symbol {} is not finite", bad),
            });
        }
        Ok(())
    }

    /// Number of consecutive samples each symbol occupies.
    pub fn samples_per_symbol(&self) -> usize {
        self.samples / self.data.len().max(1)
    }
}

fn finite(key: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::Invalid { key, reason: format!("must be finite, got {}", value) })
    }
}

fn non_negative(key: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid { key, reason: format!("must be non-negative, got {}", value) })
    }
}

/// Counts given either as integers or as whole-valued floats.
mod whole_count {
    use serde::de::{self, Deserializer, Visitor};
    use std::fmt;

    struct WholeCount;

    impl<'de> Visitor<'de> for WholeCount {
        type Value = usize;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a non-negative whole number")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<usize, E> {
            usize::try_from(v).map_err(|_| E::custom(format!("{} is too large", v)))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<usize, E> {
            usize::try_from(v).map_err(|_| E::custom(format!("{} is not a valid count", v)))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<usize, E> {
            if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= usize::MAX as f64 {
                Ok(v as usize)
            } else {
                Err(E::custom(format!("{} is not a whole number", v)))
            }
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<usize, D::Error> {
        d.deserialize_any(WholeCount)
    }
}

/// Symbols are written as `[re, im]` pairs.
mod symbol_list {
    use rustfft::num_complex::Complex;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(data: &[Complex<f64>], s: S) -> Result<S::Ok, S::Error> {
        let pairs: Vec<[f64; 2]> = data.iter().map(|c| [c.re, c.im]).collect();
        pairs.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Complex<f64>>, D::Error> {
        let pairs = Vec::<[f64; 2]>::deserialize(d)?;
        Ok(pairs.into_iter().map(|[re, im]| Complex::new(re, im)).collect())
    }
}

impl BenchConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section so that bad entries fail at load time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.global.validate()?;
        for tolerances in self.carrier.values() {
            tolerances.validate()?;
        }
        for stimulus in self.stimulus.values() {
            stimulus.validate()?;
        }
        Ok(())
    }

    pub fn carrier_entry(&self, name: &str) -> Result<&ToleranceConfig, ConfigError> {
        self.carrier.get(name).ok_or_else(|| ConfigError::UnknownEntry {
            section: "carrier",
            name: name.to_string(),
        })
    }

    pub fn stimulus_entry(&self, name: &str) -> Result<&StimulusConfig, ConfigError> {
        self.stimulus.get(name).ok_or_else(|| ConfigError::UnknownEntry {
            section: "stimulus",
            name: name.to_string(),
        })
    }

    /// Create a default configuration with the standard benches.
    pub fn default_config() -> Self {
        let mut carrier = BTreeMap::new();
        // DDS generator at 14.41 MHz; cos leads -sin by -90 degrees
        carrier.insert(
            "dds_14_41mhz".to_string(),
            ToleranceConfig {
                target_frequency: 14.41e6,
                target_frequency_tolerance: 1000.0,
                amplitude_tolerance: 1.5,
                sfdr_min: 44.24,
                expected_phase: -90.0,
                expected_phase_tolerance: 1.0,
            },
        );

        let mut stimulus = BTreeMap::new();
        stimulus.insert(
            "qpsk_snr3".to_string(),
            StimulusConfig {
                samples: 100_000,
                freq: 100e3,
                ampl: 0.2,
                offset: 0.0,
                snr_db: 3.0,
                data: vec![
                    Complex::new(1.0, 1.0),
                    Complex::new(-1.0, 1.0),
                    Complex::new(-1.0, -1.0),
                    Complex::new(1.0, -1.0),
                ],
                seed: Some(1),
            },
        );

        Self {
            global: GlobalConfig::default(),
            carrier,
            stimulus,
        }
    }
}
