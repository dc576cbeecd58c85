//! Flattening statistic grids into (median, std-dev) sample pairs.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::frame::FrameShape;
use crate::grid::Grid;
use crate::stats::{PixelStatGrid, median_mut};

/// One pixel's statistics. Sample `i` belongs to the pixel at row-major
/// index `i`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplePair {
    pub median: f64,
    pub std_dev: f64,
}

impl SamplePair {
    pub fn new(median: f64, std_dev: f64) -> Self {
        Self { median, std_dev }
    }

    pub fn is_finite(&self) -> bool {
        self.median.is_finite() && self.std_dev.is_finite()
    }
}

/// Flatten a statistic grid into W*H samples in row-major order.
pub fn project(grid: &PixelStatGrid) -> Vec<SamplePair> {
    zip_pairs(grid.median(), grid.std_dev())
}

/// Flatten two separately computed grids; their shapes must agree.
pub fn project_grids(median: &Grid<f64>, std_dev: &Grid<f64>) -> Result<Vec<SamplePair>> {
    if median.shape() != std_dev.shape() {
        return Err(Error::ShapeMismatch {
            context: "std-dev grid".to_string(),
            expected: median.shape(),
            actual: std_dev.shape(),
        });
    }
    Ok(zip_pairs(median, std_dev))
}

fn zip_pairs(median: &Grid<f64>, std_dev: &Grid<f64>) -> Vec<SamplePair> {
    median
        .pixels()
        .iter()
        .zip(std_dev.pixels())
        .map(|(&m, &s)| SamplePair::new(m, s))
        .collect()
}

/// Rebuild the statistic grids from row-major samples.
pub fn unproject(samples: &[SamplePair], shape: FrameShape) -> Result<PixelStatGrid> {
    if samples.len() != shape.pixel_count() {
        return Err(Error::ShapeMismatch {
            context: format!("{} samples", samples.len()),
            expected: shape,
            actual: FrameShape::new(samples.len(), 1),
        });
    }
    let median = samples.iter().map(|s| s.median).collect();
    let std_dev = samples.iter().map(|s| s.std_dev).collect();
    PixelStatGrid::new(Grid::new(shape, median), Grid::new(shape, std_dev))
}

/// Aggregate view of a run's samples, for logging and reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleSummary {
    pub count: usize,
    /// Samples where both values are finite.
    pub finite_count: usize,
    /// Median over finite samples of the per-pixel medians, NaN if none.
    pub median_of_medians: f64,
    /// Median over finite samples of the per-pixel std-devs, NaN if none.
    pub median_of_std_devs: f64,
}

impl SampleSummary {
    pub fn from_samples(samples: &[SamplePair]) -> Self {
        let (mut medians, mut std_devs): (Vec<f64>, Vec<f64>) = samples
            .iter()
            .filter(|s| s.is_finite())
            .map(|s| (s.median, s.std_dev))
            .unzip();

        Self {
            count: samples.len(),
            finite_count: medians.len(),
            median_of_medians: median_mut(&mut medians),
            median_of_std_devs: median_mut(&mut std_devs),
        }
    }
}
