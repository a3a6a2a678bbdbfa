//! NumPy `.npy` dumps of analysed spectra.
//!
//! When `dump_spectra` is enabled the verifier stores each dB spectrum next to
//! its plot so that a failing run can be inspected offline:
//!
//! ```python
//! import numpy as np
//! spectrum = np.load("output/dds_14_41mhz/spectrum_cos.npy")
//! ```

use ndarray::Array1;
use ndarray_npy::{ReadNpyError, WriteNpyError};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NpyError {
    #[error("Failed to read NPY file: {0}")]
    ReadError(#[from] ReadNpyError),
    #[error("Failed to write NPY file: {0}")]
    WriteError(#[from] WriteNpyError),
}

/// Read a 1D float64 array from an NPY file.
pub fn read_f64(path: impl AsRef<Path>) -> Result<Vec<f64>, NpyError> {
    let arr: Array1<f64> = ndarray_npy::read_npy(path)?;
    Ok(arr.to_vec())
}

/// Write a 1D float64 array to an NPY file.
pub fn write_f64(path: impl AsRef<Path>, data: &[f64]) -> Result<(), NpyError> {
    let arr = Array1::from_vec(data.to_vec());
    ndarray_npy::write_npy(path, &arr)?;
    Ok(())
}
