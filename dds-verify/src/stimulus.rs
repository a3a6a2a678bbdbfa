//! Modulated test vectors for the I/Q demodulator bench.
//!
//! The generator builds a quadrature carrier pair, modulates it with a
//! repeated symbol sequence, adds Gaussian noise and quantizes the result to
//! the simulator's fixed-point input format:
//!
//! ```text
//! out = clip(offset + ((cos * Re(s) + (-sin) * Im(s)) / sqrt(2) + noise) * ampl, -1, 1)
//! ```
//!
//! The sine carrier is negated. Demodulator phase expectations in the bench
//! configuration are calibrated against that sign, so it must not change.
//!
//! # Example
//!
//! ```rust
//! use dds_verify::config::BenchConfig;
//! use dds_verify::stimulus::{StimulusGenerator, StimulusSettings};
//!
//! let config = BenchConfig::default_config();
//! let settings = StimulusSettings::from(&config.global);
//! let generator = StimulusGenerator::new(config.stimulus["qpsk_snr3"].clone(), settings).unwrap();
//!
//! let vector = generator.quantized().unwrap();
//! assert_eq!(vector.len(), 100_000);
//! ```

use crate::config::{ConfigError, GlobalConfig, StimulusConfig};
use crate::samples::{self, Quantizer, SampleFileError};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal, NormalError};
use rustfft::num_complex::Complex;
use std::f64::consts::{FRAC_1_SQRT_2, PI};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// File the simulator reads its input vector from.
pub const INPUT_FILE: &str = "input.txt";

#[derive(Error, Debug)]
pub enum StimulusError {
    #[error("Invalid stimulus configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Write(#[from] SampleFileError),
    #[error("Cannot draw noise for SNR {snr_db} dB: {source}")]
    Noise {
        snr_db: f64,
        #[source]
        source: NormalError,
    },
}

/// System parameters the generator needs besides its own configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StimulusSettings {
    /// Hz.
    pub sampling_freq: f64,
    pub quantizer: Quantizer,
}

impl From<&GlobalConfig> for StimulusSettings {
    fn from(global: &GlobalConfig) -> Self {
        Self {
            sampling_freq: global.sampling_freq,
            quantizer: Quantizer::new(global.full_scale_bits),
        }
    }
}

/// Quadrature carrier pair `(cos, -sin)` of `n` samples.
pub fn carrier_pair(n: usize, freq: f64, sampling_freq: f64) -> (Vec<f64>, Vec<f64>) {
    let step = 2.0 * PI * freq / sampling_freq;
    (0..n)
        .map(|i| {
            let phase = i as f64 * step;
            (phase.cos(), -phase.sin())
        })
        .unzip()
}

/// Repeat every symbol `repeat` times, in order.
pub fn upsample_symbols(symbols: &[Complex<f64>], repeat: usize) -> Vec<Complex<f64>> {
    symbols
        .iter()
        .flat_map(|&s| std::iter::repeat(s).take(repeat))
        .collect()
}

/// Standard deviation of the additive noise for a given SNR setting.
///
/// The bench files use `10^(-SNR/10)`: the SNR in dB is converted as a power
/// ratio but applied as an amplitude.
pub fn noise_std(snr_db: f64) -> f64 {
    10.0_f64.powf(-snr_db / 10.0)
}

/// Deterministic builder of one modulated test vector.
#[derive(Debug, Clone)]
pub struct StimulusGenerator {
    config: StimulusConfig,
    settings: StimulusSettings,
}

impl StimulusGenerator {
    pub fn new(config: StimulusConfig, settings: StimulusSettings) -> Result<Self, StimulusError> {
        config.validate()?;
        Ok(Self { config, settings })
    }

    pub fn config(&self) -> &StimulusConfig {
        &self.config
    }

    /// Noise-free modulated carrier, before scaling and offset.
    pub fn modulated(&self) -> Vec<f64> {
        let n = self.config.samples;
        let (cos, sin) = carrier_pair(n, self.config.freq, self.settings.sampling_freq);
        let symbols = upsample_symbols(&self.config.data, self.config.samples_per_symbol());

        cos.iter()
            .zip(&sin)
            .zip(&symbols)
            .map(|((c, s), sym)| (c * sym.re + s * sym.im) * FRAC_1_SQRT_2)
            .collect()
    }

    /// Zero-mean Gaussian noise with `noise_std(SNR)` deviation.
    ///
    /// Fails when the deviation overflows, e.g. for an SNR below about -3080 dB.
    pub fn noise(&self, rng: &mut StdRng) -> Result<Vec<f64>, StimulusError> {
        let snr_db = self.config.snr_db;
        let dist = Normal::new(0.0, noise_std(snr_db))
            .map_err(|source| StimulusError::Noise { snr_db, source })?;
        Ok((0..self.config.samples).map(|_| dist.sample(rng)).collect())
    }

    /// Clipped analog vector in `[-1, 1]`.
    pub fn generate(&self) -> Result<Vec<f64>, StimulusError> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let noise = self.noise(&mut rng)?;
        let ampl = self.config.ampl;
        let offset = self.config.offset;

        Ok(self
            .modulated()
            .into_iter()
            .zip(noise)
            .map(|(m, n)| (offset + (m + n) * ampl).clamp(-1.0, 1.0))
            .collect())
    }

    /// Vector in the simulator's fixed-point format.
    pub fn quantized(&self) -> Result<Vec<i32>, StimulusError> {
        let q = self.settings.quantizer;
        Ok(self.generate()?.into_iter().map(|x| q.quantize(x)).collect())
    }

    /// Write `input.txt` into `output_path` and return the file path.
    pub fn prepare(&self, output_path: impl AsRef<Path>) -> Result<PathBuf, StimulusError> {
        let path = output_path.as_ref().join(INPUT_FILE);
        let vector = self.quantized()?;
        debug!(
            samples = vector.len(),
            freq = self.config.freq,
            snr_db = self.config.snr_db,
            "generated stimulus"
        );
        samples::write_integers(&path, &vector)?;
        info!(path = %path.display(), "wrote stimulus vector");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> StimulusSettings {
        StimulusSettings::from(&GlobalConfig::default())
    }

    fn config(samples: usize, data: Vec<Complex<f64>>) -> StimulusConfig {
        StimulusConfig {
            samples,
            freq: 1e6,
            ampl: 0.5,
            offset: 0.0,
            snr_db: 3.0,
            data,
            seed: Some(7),
        }
    }

    #[test]
    fn carriers_follow_the_negated_sine_convention() {
        // a quarter period in: cos = 0, -sin = -1
        let (cos, sin) = carrier_pair(2, 25e6, 100e6);
        assert_eq!((cos[0], sin[0]), (1.0, -0.0));
        assert!(cos[1].abs() < 1e-15);
        assert!((sin[1] + 1.0).abs() < 1e-15);
    }

    #[test]
    fn symbols_are_repeated_in_order() {
        let data = [Complex::new(1.0, 0.0), Complex::new(0.0, 1.0)];
        let up = upsample_symbols(&data, 3);
        assert_eq!(up.len(), 6);
        assert!(up[..3].iter().all(|&s| s == data[0]));
        assert!(up[3..].iter().all(|&s| s == data[1]));
    }

    #[test]
    fn constellation_points_have_unit_envelope() {
        let data = vec![Complex::new(1.0, 1.0), Complex::new(-1.0, 1.0)];
        let generator = StimulusGenerator::new(config(400, data), settings()).unwrap();
        let modulated = generator.modulated();
        assert_eq!(modulated.len(), 400);
        assert!(modulated.iter().all(|x| x.abs() <= 1.0 + 1e-12));
        let peak = modulated.iter().fold(0.0_f64, |a, x| a.max(x.abs()));
        assert!(peak > 0.99, "peak {peak}");
    }

    #[test]
    fn seeded_vectors_are_reproducible() {
        let data = vec![Complex::new(1.0, -1.0)];
        let a = StimulusGenerator::new(config(1000, data.clone()), settings()).unwrap();
        let b = StimulusGenerator::new(config(1000, data), settings()).unwrap();
        assert_eq!(a.quantized().unwrap(), b.quantized().unwrap());
    }

    #[test]
    fn noise_deviation_uses_power_ratio_exponent() {
        assert!((noise_std(3.0) - 0.501_187_233_627_272_2).abs() < 1e-12);
        assert_eq!(noise_std(0.0), 1.0);
        assert!((noise_std(20.0) - 0.01).abs() < 1e-15);
    }

    #[test]
    fn output_is_clipped_to_full_scale() {
        let mut cfg = config(2000, vec![Complex::new(1.0, 1.0)]);
        cfg.ampl = 1.0;
        cfg.offset = 0.9;
        cfg.snr_db = -10.0;
        let generator = StimulusGenerator::new(cfg, settings()).unwrap();
        let analog = generator.generate().unwrap();
        assert!(analog.iter().all(|x| (-1.0..=1.0).contains(x)));
        assert!(analog.iter().any(|&x| x == 1.0));
    }

    #[test]
    fn uneven_symbol_split_is_rejected() {
        let data = vec![Complex::new(1.0, 1.0); 3];
        let err = StimulusGenerator::new(config(1000, data), settings()).unwrap_err();
        assert!(matches!(
            err,
            StimulusError::Config(ConfigError::SymbolRepetition { samples: 1000, symbols: 3 })
        ));
    }

    #[test]
    fn overflowing_noise_deviation_is_an_error() {
        let mut cfg = config(100, vec![Complex::new(1.0, 0.0)]);
        cfg.snr_db = -4000.0;
        assert!(noise_std(cfg.snr_db).is_infinite());

        let generator = StimulusGenerator::new(cfg, settings()).unwrap();
        assert!(matches!(
            generator.generate(),
            Err(StimulusError::Noise { snr_db, .. }) if snr_db == -4000.0
        ));

        let dir = tempfile::TempDir::new().unwrap();
        assert!(generator.prepare(dir.path()).is_err());
        assert!(!dir.path().join(INPUT_FILE).exists());
    }
}
