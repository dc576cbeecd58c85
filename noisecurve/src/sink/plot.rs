use std::ops::Range;
use std::path::{Path, PathBuf};

use plotters::prelude::*;

use super::{ResultSink, staging_path};
use crate::error::{Error, Result};
use crate::samples::SamplePair;

const DEFAULT_SIZE: (u32, u32) = (1024, 768);

/// Log-log axis ranges in ADU.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotAxes {
    pub median: Range<f64>,
    pub std_dev: Range<f64>,
}

impl Default for PlotAxes {
    fn default() -> Self {
        Self {
            median: 100.0..100_000.0,
            std_dev: 10.0..100_000.0,
        }
    }
}

impl PlotAxes {
    fn contains(&self, sample: &SamplePair) -> bool {
        (self.median.start..=self.median.end).contains(&sample.median)
            && (self.std_dev.start..=self.std_dev.end).contains(&sample.std_dev)
    }
}

/// How many samples made it onto the plot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlotStats {
    pub plotted: usize,
    /// NaN or infinite in either coordinate.
    pub non_finite: usize,
    /// Zero or negative in either coordinate; no position on a log axis.
    pub non_positive: usize,
    /// Finite and positive, but outside the axis ranges.
    pub out_of_range: usize,
}

/// Split samples into drawable points and counts of skipped ones.
pub fn plottable_points(samples: &[SamplePair], axes: &PlotAxes) -> (Vec<(f64, f64)>, PlotStats) {
    let mut stats = PlotStats::default();
    let mut points = Vec::with_capacity(samples.len());
    for sample in samples {
        if !sample.is_finite() {
            stats.non_finite += 1;
        } else if sample.median <= 0.0 || sample.std_dev <= 0.0 {
            stats.non_positive += 1;
        } else if !axes.contains(sample) {
            stats.out_of_range += 1;
        } else {
            points.push((sample.median, sample.std_dev));
        }
    }
    stats.plotted = points.len();
    (points, stats)
}

/// Renders a log-log scatter of std-dev against median as a PNG.
#[derive(Debug, Clone)]
pub struct PlotSink {
    path: PathBuf,
    title: String,
    size: (u32, u32),
    axes: PlotAxes,
}

impl PlotSink {
    pub fn new(path: impl Into<PathBuf>, title: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: title.into(),
            size: DEFAULT_SIZE,
            axes: PlotAxes::default(),
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    fn render(
        &self,
        target: &Path,
        points: &[(f64, f64)],
    ) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let root = BitMapBackend::new(target, self.size).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(&self.title, ("sans-serif", 30).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(
                self.axes.median.clone().log_scale(),
                self.axes.std_dev.clone().log_scale(),
            )?;

        chart
            .configure_mesh()
            .x_desc("Median")
            .y_desc("Std.dev.")
            .x_label_formatter(&|x| format!("{x:.0}"))
            .y_label_formatter(&|y| format!("{y:.0}"))
            .axis_desc_style(("sans-serif", 18))
            .draw()?;

        chart.draw_series(
            points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 1, BLUE.filled())),
        )?;

        root.present()?;
        Ok(())
    }
}

impl ResultSink for PlotSink {
    fn name(&self) -> &'static str {
        "plot"
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, samples: &[SamplePair]) -> Result<()> {
        let (points, stats) = plottable_points(samples, &self.axes);
        if stats.plotted < samples.len() {
            tracing::warn!(
                non_finite = stats.non_finite,
                non_positive = stats.non_positive,
                out_of_range = stats.out_of_range,
                "Skipped samples that cannot be placed on the log-log plot"
            );
        }

        let staging = staging_path(&self.path);
        let rendered = self
            .render(&staging, &points)
            .and_then(|()| std::fs::rename(&staging, &self.path).map_err(Into::into));
        if let Err(e) = rendered {
            let _ = std::fs::remove_file(&staging);
            return Err(Error::Plot {
                path: self.path.clone(),
                reason: e.to_string(),
            });
        }

        tracing::info!(
            path = %self.path.display(),
            points = stats.plotted,
            "Saved noise plot"
        );
        Ok(())
    }
}
