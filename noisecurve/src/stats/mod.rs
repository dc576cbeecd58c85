//! Per-pixel statistics over a frame stack.
//!
//! For every pixel position the N stacked values are reduced to their median
//! and population standard deviation (divisor N). The stack is processed in
//! horizontal row chunks; within a chunk rows are reduced in parallel, each
//! worker owning a disjoint slice of the output grids.

#[cfg(test)]
mod tests;

use rayon::prelude::*;

use common::CancelFlag;

use crate::error::{Error, Result};
use crate::frame::FrameShape;
use crate::grid::Grid;
use crate::stack::FrameStack;

/// Median and standard deviation grids of one stack, same shape as a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelStatGrid {
    median: Grid<f64>,
    std_dev: Grid<f64>,
}

impl PixelStatGrid {
    pub fn new(median: Grid<f64>, std_dev: Grid<f64>) -> Result<Self> {
        if median.shape() != std_dev.shape() {
            return Err(Error::ShapeMismatch {
                context: "std-dev grid".to_string(),
                expected: median.shape(),
                actual: std_dev.shape(),
            });
        }
        Ok(Self { median, std_dev })
    }

    pub fn shape(&self) -> FrameShape {
        self.median.shape()
    }

    pub fn median(&self) -> &Grid<f64> {
        &self.median
    }

    pub fn std_dev(&self) -> &Grid<f64> {
        &self.std_dev
    }

    pub fn into_parts(self) -> (Grid<f64>, Grid<f64>) {
        (self.median, self.std_dev)
    }
}

/// Compute per-pixel median and population standard deviation of `stack`.
///
/// Cancellation is checked between rows; a cancelled run returns
/// [`Error::Cancelled`] and no partial grids.
pub fn compute(stack: &FrameStack, cancel: &CancelFlag) -> Result<PixelStatGrid> {
    let frame_count = stack.frame_count();
    if frame_count == 0 {
        return Err(Error::EmptyStack);
    }

    let shape = stack.shape();
    let width = shape.width;
    let height = shape.height;
    let chunk_rows = stack.chunk_rows();

    tracing::info!(
        frame_count,
        shape = %shape,
        chunk_rows,
        "Computing per-pixel statistics"
    );

    let mut median = vec![0.0f64; shape.pixel_count()];
    let mut std_dev = vec![0.0f64; shape.pixel_count()];

    if width > 0 {
        let mut chunk_start = 0;
        while chunk_start < height {
            let chunk_end = chunk_start.saturating_add(chunk_rows).min(height);
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let frame_chunks: Vec<&[f32]> = (0..frame_count)
                .map(|frame_idx| stack.read_rows(frame_idx, chunk_start, chunk_end))
                .collect();
            let out_start = chunk_start * width;
            let out_end = chunk_end * width;

            median[out_start..out_end]
                .par_chunks_mut(width)
                .zip(std_dev[out_start..out_end].par_chunks_mut(width))
                .enumerate()
                .for_each_init(
                    || vec![0.0f64; frame_count],
                    |values, (row_in_chunk, (median_row, std_dev_row))| {
                        if cancel.is_cancelled() {
                            return;
                        }
                        let row_offset = row_in_chunk * width;
                        for x in 0..width {
                            let pixel_idx = row_offset + x;
                            for (value, chunk) in values.iter_mut().zip(&frame_chunks) {
                                *value = f64::from(chunk[pixel_idx]);
                            }
                            let (m, s) = median_and_std_dev(values);
                            median_row[x] = m;
                            std_dev_row[x] = s;
                        }
                    },
                );

            chunk_start = chunk_end;
        }
    }

    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }

    PixelStatGrid::new(Grid::new(shape, median), Grid::new(shape, std_dev))
}

/// Median and population standard deviation of one pixel's samples.
///
/// Any NaN sample makes both results NaN. Reorders `values`.
///
/// # Panics
///
/// Panics if `values` is empty.
pub fn median_and_std_dev(values: &mut [f64]) -> (f64, f64) {
    assert!(!values.is_empty(), "cannot reduce an empty sample");
    if values.iter().any(|v| v.is_nan()) {
        return (f64::NAN, f64::NAN);
    }
    // Std-dev is order independent, so it goes first.
    let std_dev = population_std_dev(values);
    (median_mut(values), std_dev)
}

/// Median of `values`: the middle element for odd lengths, the mean of the two
/// middle elements for even lengths. Returns NaN for empty input or when any
/// value is NaN. Reorders `values`.
pub fn median_mut(values: &mut [f64]) -> f64 {
    let len = values.len();
    if len == 0 || values.iter().any(|v| v.is_nan()) {
        return f64::NAN;
    }

    let mid = len / 2;
    let (lower, upper, _) = values.select_nth_unstable_by(mid, f64::total_cmp);
    let upper = *upper;
    if len % 2 == 1 {
        upper
    } else {
        // The largest of the lower half is the other middle element.
        let lower = lower.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        (lower + upper) / 2.0
    }
}

/// Population standard deviation (divisor N) of `values`.
///
/// Two passes over data shifted by the first sample, so identical samples give
/// exactly 0 regardless of their magnitude. Returns NaN for empty input.
pub fn population_std_dev(values: &[f64]) -> f64 {
    let Some(&shift) = values.first() else {
        return f64::NAN;
    };
    let n = values.len() as f64;

    let mean = values.iter().map(|v| v - shift).sum::<f64>() / n;
    let sum_sq = values
        .iter()
        .map(|v| {
            let d = v - shift - mean;
            d * d
        })
        .sum::<f64>();

    (sum_sq / n).sqrt()
}
