//! PNG rendering of spectra and baseband trajectories.
//!
//! Rendering consumes finished analysis results and never feeds back into a
//! verdict. `plotters` is built without a font backend, so charts carry no
//! text: axes are implied by a fixed grid drawn as plain line series.
//!
//! | Chart | x | y |
//! |-------|---|---|
//! | spectrum | 0 .. f_s/2 in MHz | -120 dBFS .. peak, grid every 10 dB |
//! | baseband I/Q | time | padded I/Q range |
//! | baseband amplitude/phase | time | amplitude (left), phase -180..180 deg (right, orange) |
//! | NCO adjustment | time | -0.3 .. 0.3 |

use crate::baseband::{BasebandCapture, BasebandTrajectory};
use crate::spectrum::Spectrum;
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Failed to draw {what}: {message}")]
    Draw { what: &'static str, message: String },
}

const SPECTRUM_FLOOR_DB: f64 = -120.0;
const GRID_DIVISIONS: usize = 10;
const TAB_ORANGE: RGBColor = RGBColor(255, 127, 14);
const TAB_BLUE: RGBColor = RGBColor(31, 119, 180);
const GRID_GRAY: RGBColor = RGBColor(220, 220, 220);

trait DrawResultExt<T> {
    fn drawing(self, what: &'static str) -> Result<T, PlotError>;
}

impl<T, E: std::fmt::Display> DrawResultExt<T> for Result<T, E> {
    fn drawing(self, what: &'static str) -> Result<T, PlotError> {
        self.map_err(|e| PlotError::Draw { what, message: e.to_string() })
    }
}

/// Padded range covering all finite `values`.
fn value_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo > hi {
        return -1.0..1.0;
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 1.0 };
    (lo - pad)..(hi + pad)
}

/// Evenly spaced vertical and horizontal lines spanning `x` by `y`, frame included.
fn grid_lines(x: &Range<f64>, y: &Range<f64>, divisions: usize) -> Vec<Vec<(f64, f64)>> {
    let divisions = divisions.max(1);
    let step = |r: &Range<f64>, k: usize| r.start + (r.end - r.start) * k as f64 / divisions as f64;

    let mut lines = Vec::with_capacity(2 * (divisions + 1));
    for k in 0..=divisions {
        let xk = step(x, k);
        lines.push(vec![(xk, y.start), (xk, y.end)]);
        let yk = step(y, k);
        lines.push(vec![(x.start, yk), (x.end, yk)]);
    }
    lines
}

fn grid_series(
    x: &Range<f64>,
    y: &Range<f64>,
    divisions: usize,
) -> impl Iterator<Item = PathElement<(f64, f64)>> {
    grid_lines(x, y, divisions)
        .into_iter()
        .map(|points| PathElement::new(points, ShapeStyle::from(&GRID_GRAY)))
}

/// Plot a dB spectrum over frequency in MHz, clipped to -120 dBFS.
pub fn render_spectrum(path: &Path, spectrum: &Spectrum) -> Result<(), PlotError> {
    let root = BitMapBackend::new(path, (1000, 1000)).into_drawing_area();
    root.fill(&WHITE).drawing("background")?;

    let f_max = spectrum
        .frequencies
        .last()
        .map(|f| f / 1e6)
        .unwrap_or(0.0)
        .max(1e-9);
    let db_max = spectrum
        .magnitude_db
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(0.0_f64, f64::max)
        .ceil();

    let x_range = 0.0..f_max;
    let y_range = SPECTRUM_FLOOR_DB..db_max;
    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .build_cartesian_2d(x_range.clone(), y_range.clone())
        .drawing("spectrum axes")?;

    // 10 dB steps from the floor
    let db_divisions = ((db_max - SPECTRUM_FLOOR_DB) / 10.0).round().max(1.0) as usize;
    chart
        .draw_series(grid_series(&x_range, &y_range, GRID_DIVISIONS.max(db_divisions)))
        .drawing("spectrum grid")?;

    chart
        .draw_series(LineSeries::new(
            spectrum
                .frequencies
                .iter()
                .zip(&spectrum.magnitude_db)
                .map(|(&f, &db)| (f / 1e6, db.max(SPECTRUM_FLOOR_DB))),
            &TAB_BLUE,
        ))
        .drawing("spectrum")?;

    root.present().drawing("spectrum image")?;
    Ok(())
}

/// Plot I/Q, amplitude/phase and, when recorded, the NCO adjustment.
pub fn render_baseband(
    path: &Path,
    capture: &BasebandCapture,
    trajectory: &BasebandTrajectory,
) -> Result<(), PlotError> {
    let rows = if capture.nco_adjust.is_some() { 3 } else { 2 };
    let root = BitMapBackend::new(path, (1000, 500 * rows as u32)).into_drawing_area();
    root.fill(&WHITE).drawing("background")?;
    let panels = root.split_evenly((rows, 1));

    let time = &trajectory.time_us;
    let t_range = 0.0..time.last().copied().unwrap_or(0.0).max(1e-9);

    // I/Q
    {
        let y_range = value_range(capture.i.iter().chain(&capture.q).copied());
        let mut chart = ChartBuilder::on(&panels[0])
            .margin(15)
            .build_cartesian_2d(t_range.clone(), y_range.clone())
            .drawing("I/Q axes")?;
        chart
            .draw_series(grid_series(&t_range, &y_range, GRID_DIVISIONS))
            .drawing("I/Q grid")?;
        chart
            .draw_series(LineSeries::new(time.iter().copied().zip(capture.i.iter().copied()), &TAB_BLUE))
            .drawing("I")?;
        chart
            .draw_series(LineSeries::new(time.iter().copied().zip(capture.q.iter().copied()), &TAB_ORANGE))
            .drawing("Q")?;
    }

    // amplitude on the primary axis, phase on the secondary
    {
        let y_range = value_range(trajectory.amplitude.iter().copied());
        let mut chart = ChartBuilder::on(&panels[1])
            .margin(15)
            .build_cartesian_2d(t_range.clone(), y_range.clone())
            .drawing("amplitude axes")?
            .set_secondary_coord(t_range.clone(), -180.0..180.0);
        chart
            .draw_series(grid_series(&t_range, &y_range, GRID_DIVISIONS))
            .drawing("amplitude grid")?;
        chart
            .draw_series(LineSeries::new(
                time.iter().copied().zip(trajectory.amplitude.iter().copied()),
                &TAB_BLUE,
            ))
            .drawing("amplitude")?;
        chart
            .draw_secondary_series(LineSeries::new(
                time.iter().copied().zip(trajectory.phase_deg.iter().copied()),
                &TAB_ORANGE,
            ))
            .drawing("phase")?;
    }

    if let Some(ref nco) = capture.nco_adjust {
        let y_range = -0.3..0.3;
        let mut chart = ChartBuilder::on(&panels[2])
            .margin(15)
            .build_cartesian_2d(t_range.clone(), y_range.clone())
            .drawing("NCO axes")?;
        chart
            .draw_series(grid_series(&t_range, &y_range, 6))
            .drawing("NCO grid")?;
        chart
            .draw_series(LineSeries::new(
                time.iter().copied().zip(nco.iter().map(|v| v.clamp(-0.3, 0.3))),
                &TAB_BLUE,
            ))
            .drawing("NCO adjustment")?;
    }

    root.present().drawing("baseband image")?;
    Ok(())
}
