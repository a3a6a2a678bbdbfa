//! Spectral verification of the DDS carrier pair.
//!
//! The DDS bench records a cosine and a sine carrier. Each path is analysed
//! on its own (frequency, level and SFDR against the configured tolerances)
//! and the two are then compared: the phase of the cosine path relative to
//! the sine path must match `expected_phase`.
//!
//! Analysis and rendering are separate steps. [`CarrierVerifier::check_analyses`]
//! is a pure function of the two spectra, while [`CarrierVerifier::check`]
//! reads the capture from disk and writes the spectrum plots as a side effect.
//! Plot or dump failures are logged and never change the verdict.

use crate::config::{ConfigError, GlobalConfig, ToleranceConfig};
use crate::npy;
use crate::plot;
use crate::report::{CarrierReport, MetricCheck, SignalReport, VerificationOutcome};
use crate::samples::{self, Quantizer, SampleFileError, SampleSequence};
use crate::spectrum::{self, SpectralAnalysis, SpectralResult, SpectrumSummary};
use std::f64::consts::TAU;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Capture written by the DDS bench: cosine and sine columns.
pub const CARRIER_FILE: &str = "carrier.txt";

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error(transparent)]
    Samples(#[from] SampleFileError),
    #[error("{path} must have 2 columns (cos, sin), found {found}")]
    ColumnCount { path: PathBuf, found: usize },
    #[error("Invalid tolerance configuration: {0}")]
    Config(#[from] ConfigError),
}

/// System parameters used while analysing a capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisSettings {
    /// Seconds between two samples.
    pub sample_interval: f64,
    pub peak_threshold: f64,
    pub quantizer: Quantizer,
    pub dump_spectra: bool,
}

impl From<&GlobalConfig> for AnalysisSettings {
    fn from(global: &GlobalConfig) -> Self {
        Self {
            sample_interval: global.sample_interval(),
            peak_threshold: global.peak_threshold,
            quantizer: Quantizer::new(global.full_scale_bits),
            dump_spectra: global.dump_spectra,
        }
    }
}

/// IEEE remainder of `angle` by a full turn, in `[-pi, pi]`.
///
/// Halfway cases round the turn count to even, so an exact `pi` stays `pi`.
pub fn wrap_phase(angle: f64) -> f64 {
    angle - TAU * (angle / TAU).round_ties_even()
}

/// Checks carrier captures against one tolerance configuration.
#[derive(Debug, Clone)]
pub struct CarrierVerifier {
    tolerances: ToleranceConfig,
    settings: AnalysisSettings,
}

impl CarrierVerifier {
    pub fn new(tolerances: ToleranceConfig, settings: AnalysisSettings) -> Result<Self, VerifyError> {
        tolerances.validate()?;
        Ok(Self { tolerances, settings })
    }

    pub fn tolerances(&self) -> &ToleranceConfig {
        &self.tolerances
    }

    /// Normalize raw fixed-point samples and analyse their spectrum.
    pub fn analyse(&self, raw: &[f64]) -> Result<SpectralAnalysis, VerifyError> {
        let sequence =
            SampleSequence::from_quantized(raw, self.settings.quantizer, self.settings.sample_interval)?;
        Ok(spectrum::analyse(&sequence, self.settings.peak_threshold))
    }

    /// Judge frequency, level and SFDR of one carrier.
    pub fn verify_spectrum(&self, name: &str, result: &SpectralResult) -> VerificationOutcome {
        let t = &self.tolerances;
        let checks = vec![
            MetricCheck::within(
                "frequency",
                "Hz",
                result.center.frequency,
                t.target_frequency,
                t.target_frequency_tolerance,
            ),
            // carriers are expected at full scale
            MetricCheck::within(
                "amplitude",
                "dBFS",
                result.center.amplitude_db,
                0.0,
                t.amplitude_tolerance,
            ),
            MetricCheck::at_least("SFDR", "dBc", result.sfdr_db, t.sfdr_min),
        ];
        VerificationOutcome::new(name, checks)
    }

    /// Judge the phase of the cosine carrier relative to the sine carrier.
    pub fn verify_carrier_relations(
        &self,
        cos: &SpectralResult,
        sin: &SpectralResult,
    ) -> VerificationOutcome {
        let difference = wrap_phase(cos.center.phase() - sin.center.phase()).to_degrees();
        let check = MetricCheck::within(
            "phase (cos-sin)",
            "deg",
            difference,
            self.tolerances.expected_phase,
            self.tolerances.expected_phase_tolerance,
        );
        VerificationOutcome::new("cos/sin", vec![check])
    }

    /// Verify two analysed carriers. Pure; performs no I/O.
    pub fn check_analyses(&self, cos: &SpectralAnalysis, sin: &SpectralAnalysis) -> CarrierReport {
        let cos_outcome = self.verify_spectrum("cos", &cos.result);
        let sin_outcome = self.verify_spectrum("sin", &sin.result);
        let relation = self.verify_carrier_relations(&cos.result, &sin.result);

        CarrierReport::new(
            SignalReport {
                spectrum: SpectrumSummary::from(&cos.result),
                outcome: cos_outcome,
            },
            SignalReport {
                spectrum: SpectrumSummary::from(&sin.result),
                outcome: sin_outcome,
            },
            relation,
        )
    }

    /// Analyse and verify the capture in `output_path/carrier.txt`.
    ///
    /// Writes `spectrum_cos.png` and `spectrum_sin.png` (and `.npy` dumps when
    /// enabled) into `output_path`.
    pub fn check(&self, output_path: impl AsRef<Path>) -> Result<CarrierReport, VerifyError> {
        let output_path = output_path.as_ref();
        let path = output_path.join(CARRIER_FILE);

        let columns = samples::read_columns(&path)?;
        let [cos_raw, sin_raw] = <[Vec<f64>; 2]>::try_from(columns).map_err(|columns| {
            VerifyError::ColumnCount {
                path: path.clone(),
                found: columns.len(),
            }
        })?;

        let cos = self.analyse(&cos_raw)?;
        let sin = self.analyse(&sin_raw)?;
        self.write_artifacts(output_path, "cos", &cos);
        self.write_artifacts(output_path, "sin", &sin);

        let report = self.check_analyses(&cos, &sin);
        for outcome in report.outcomes() {
            for check in &outcome.checks {
                debug!(signal = %outcome.label, "{}", check);
            }
            info!(signal = %outcome.label, passed = outcome.passed, "carrier check");
        }
        Ok(report)
    }

    fn write_artifacts(&self, output_path: &Path, name: &str, analysis: &SpectralAnalysis) {
        let png = output_path.join(format!("spectrum_{}.png", name));
        if let Err(e) = plot::render_spectrum(&png, &analysis.spectrum) {
            warn!(path = %png.display(), error = %e, "failed to render spectrum");
        }

        if self.settings.dump_spectra {
            let dump = output_path.join(format!("spectrum_{}.npy", name));
            if let Err(e) = npy::write_f64(&dump, &analysis.spectrum.magnitude_db) {
                warn!(path = %dump.display(), error = %e, "failed to dump spectrum");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::SpectralPeak;
    use crate::stimulus::carrier_pair;
    use rustfft::num_complex::Complex;
    use std::f64::consts::PI;

    fn tolerances() -> ToleranceConfig {
        ToleranceConfig {
            target_frequency: 14.41e6,
            target_frequency_tolerance: 1000.0,
            amplitude_tolerance: 1.5,
            sfdr_min: 44.24,
            expected_phase: -90.0,
            expected_phase_tolerance: 1.0,
        }
    }

    fn verifier() -> CarrierVerifier {
        CarrierVerifier::new(tolerances(), AnalysisSettings::from(&GlobalConfig::default())).unwrap()
    }

    fn result_with(center: SpectralPeak, harmonic_db: f64) -> SpectralResult {
        SpectralResult::from_peaks(vec![
            center,
            SpectralPeak { frequency: 28.82e6, amplitude_db: harmonic_db, value: Complex::new(1e-3, 0.0) },
        ])
    }

    #[test]
    fn wrap_phase_stays_in_range() {
        assert!((wrap_phase(1.5 * PI) + 0.5 * PI).abs() < 1e-12);
        assert!((wrap_phase(-1.5 * PI) - 0.5 * PI).abs() < 1e-12);
        assert!((wrap_phase(0.25) - 0.25).abs() < 1e-15);
        assert!((wrap_phase(0.25 + 4.0 * TAU) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn half_turn_keeps_its_sign() {
        assert_eq!(wrap_phase(PI), PI);
        assert_eq!(wrap_phase(-PI), -PI);
    }

    #[test]
    fn opposite_carriers_measure_plus_180() {
        let mut antiphase = tolerances();
        antiphase.expected_phase = 180.0;
        let verifier =
            CarrierVerifier::new(antiphase, AnalysisSettings::from(&GlobalConfig::default())).unwrap();

        let bin = |value| {
            SpectralResult::from_peaks(vec![SpectralPeak { frequency: 14.41e6, amplitude_db: 0.0, value }])
        };
        let outcome = verifier.verify_carrier_relations(&bin(Complex::new(-1.0, 0.0)), &bin(Complex::new(1.0, 0.0)));
        assert!((outcome.checks[0].measured - 180.0).abs() < 1e-9);
        assert!(outcome.passed);
    }

    #[test]
    fn generated_carrier_pair_is_in_quadrature() {
        // 1441 whole periods in 10000 samples
        let fs = 100e6;
        let (cos, sin) = carrier_pair(10_000, 14.41e6, fs);
        let cos = spectrum::analyse(&SampleSequence::new(cos, 1.0 / fs).unwrap(), 0.3);
        let sin = spectrum::analyse(&SampleSequence::new(sin, 1.0 / fs).unwrap(), 0.3);

        let verifier = verifier();
        let relation = verifier.verify_carrier_relations(&cos.result, &sin.result);
        assert!((relation.checks[0].measured + 90.0).abs() < 1e-6, "{}", relation.checks[0]);
        assert!(relation.passed);

        let report = verifier.check_analyses(&cos, &sin);
        assert!(report.cos.outcome.checks[0].passed);
        assert!(report.sin.outcome.checks[0].passed);
        assert!(report.cos.spectrum.center_amplitude_db.abs() < 1e-9);
    }

    #[test]
    fn each_sub_check_is_reported_even_after_a_failure() {
        let center = SpectralPeak {
            frequency: 14.42e6,
            amplitude_db: -0.2,
            value: Complex::new(1.0, 0.0),
        };
        let outcome = verifier().verify_spectrum("cos", &result_with(center, -60.0));

        assert!(!outcome.passed);
        assert_eq!(outcome.checks.len(), 3);
        assert!(!outcome.checks[0].passed, "10 kHz off must fail");
        assert!(outcome.checks[1].passed);
        assert!(outcome.checks[2].passed);
    }

    #[test]
    fn low_sfdr_fails() {
        let center = SpectralPeak {
            frequency: 14.41e6,
            amplitude_db: 0.0,
            value: Complex::new(1.0, 0.0),
        };
        let outcome = verifier().verify_spectrum("sin", &result_with(center, -40.0));
        assert!(!outcome.passed);
        assert!(!outcome.checks[2].passed);
    }

    #[test]
    fn quadrature_phase_relation() {
        let cos = SpectralResult::from_peaks(vec![SpectralPeak {
            frequency: 14.41e6,
            amplitude_db: 0.0,
            value: Complex::new(1.0, 0.0),
        }]);
        // -sin(x) = cos(x + 90 deg)
        let sin = SpectralResult::from_peaks(vec![SpectralPeak {
            frequency: 14.41e6,
            amplitude_db: 0.0,
            value: Complex::new(0.0, 1.0),
        }]);

        let outcome = verifier().verify_carrier_relations(&cos, &sin);
        assert!(outcome.passed);
        assert!((outcome.checks[0].measured + 90.0).abs() < 1e-9);

        let swapped = verifier().verify_carrier_relations(&sin, &cos);
        assert!(!swapped.passed);
        assert!((swapped.checks[0].measured - 90.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_spectrum_fails_without_error() {
        let empty = SpectralResult::from_peaks(vec![]);
        let outcome = verifier().verify_spectrum("cos", &empty);
        assert!(!outcome.passed);
        assert_eq!(outcome.checks.len(), 3);
    }

    #[test]
    fn negative_tolerance_is_rejected_at_construction() {
        let mut bad = tolerances();
        bad.sfdr_min = -1.0;
        let err = CarrierVerifier::new(bad, AnalysisSettings::from(&GlobalConfig::default()));
        assert!(matches!(err, Err(VerifyError::Config(_))));
    }
}
