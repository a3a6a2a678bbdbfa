//! Raw sample exchange with the simulator.
//!
//! The simulator reads stimulus vectors and writes captures as plain text:
//! one sample per line, with several whitespace-separated columns when more
//! than one channel is recorded. Samples are signed fixed-point words; the
//! [`Quantizer`] converts between those words and the normalized range
//! `[-1, 1]` used by the analysis code.
//!
//! # Example
//!
//! ```rust,ignore
//! use dds_verify::samples::{self, Quantizer, SampleSequence};
//!
//! let columns = samples::read_columns("output/carrier.txt")?;
//! let q = Quantizer::new(15);
//! let cos = SampleSequence::from_quantized(&columns[0], q, 10e-9)?;
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SampleFileError {
    #[error("Failed to access sample file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}:{line}: cannot parse '{token}' as a number")]
    Parse { path: PathBuf, line: usize, token: String },
    #[error("{path}:{line}: expected {expected} columns, found {found}")]
    Ragged { path: PathBuf, line: usize, expected: usize, found: usize },
    #[error("Sample file {0} contains no samples")]
    Empty(PathBuf),
    #[error("Sample sequence must not be empty")]
    EmptySequence,
    #[error("Sample interval must be positive and finite, got {0}")]
    InvalidInterval(f64),
}

/// An ordered, uniformly sampled, non-empty sequence of real samples.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSequence {
    samples: Vec<f64>,
    sample_interval: f64,
}

impl SampleSequence {
    pub fn new(samples: Vec<f64>, sample_interval: f64) -> Result<Self, SampleFileError> {
        if samples.is_empty() {
            return Err(SampleFileError::EmptySequence);
        }
        if !(sample_interval.is_finite() && sample_interval > 0.0) {
            return Err(SampleFileError::InvalidInterval(sample_interval));
        }
        Ok(Self { samples, sample_interval })
    }

    /// Build a sequence from raw fixed-point words, normalizing to full scale.
    pub fn from_quantized(
        raw: &[f64],
        quantizer: Quantizer,
        sample_interval: f64,
    ) -> Result<Self, SampleFileError> {
        let samples = raw.iter().map(|&x| quantizer.normalize(x)).collect();
        Self::new(samples, sample_interval)
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn sample_interval(&self) -> f64 {
        self.sample_interval
    }

    pub fn sample_rate(&self) -> f64 {
        1.0 / self.sample_interval
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// A validated sequence is never empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Conversion between normalized samples and signed fixed-point words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantizer {
    bits: u32,
}

impl Quantizer {
    pub fn new(bits: u32) -> Self {
        Self { bits }
    }

    /// Value of a normalized 1.0, i.e. `2^bits`.
    pub fn full_scale(&self) -> f64 {
        2.0_f64.powi(self.bits as i32)
    }

    /// Scale to full scale and truncate toward zero.
    pub fn quantize(&self, x: f64) -> i32 {
        (x * self.full_scale()).trunc() as i32
    }

    pub fn normalize(&self, raw: f64) -> f64 {
        raw / self.full_scale()
    }
}

/// Read a whitespace-delimited numeric table and return it column by column.
///
/// Blank lines and lines starting with `#` are skipped. Every data row must
/// have the same number of columns as the first one.
pub fn read_columns(path: impl AsRef<Path>) -> Result<Vec<Vec<f64>>, SampleFileError> {
    let path = path.as_ref();
    let io_err = |source| SampleFileError::Io { path: path.to_path_buf(), source };

    let file = File::open(path).map_err(io_err)?;
    let reader = BufReader::new(file);

    let mut columns: Vec<Vec<f64>> = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(io_err)?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut row = Vec::with_capacity(columns.len().max(1));
        for token in line.split_whitespace() {
            let value = token.parse::<f64>().map_err(|_| SampleFileError::Parse {
                path: path.to_path_buf(),
                line: index + 1,
                token: token.to_string(),
            })?;
            row.push(value);
        }

        if columns.is_empty() {
            columns = vec![Vec::new(); row.len()];
        } else if row.len() != columns.len() {
            return Err(SampleFileError::Ragged {
                path: path.to_path_buf(),
                line: index + 1,
                expected: columns.len(),
                found: row.len(),
            });
        }
        for (column, value) in columns.iter_mut().zip(row) {
            column.push(value);
        }
    }

    if columns.is_empty() {
        return Err(SampleFileError::Empty(path.to_path_buf()));
    }
    Ok(columns)
}

/// Write one integer per line.
pub fn write_integers(path: impl AsRef<Path>, values: &[i32]) -> Result<(), SampleFileError> {
    let path = path.as_ref();
    let io_err = |source| SampleFileError::Io { path: path.to_path_buf(), source };

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    for value in values {
        writeln!(writer, "{}", value).map_err(io_err)?;
    }
    writer.flush().map_err(io_err)
}
