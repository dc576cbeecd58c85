//! End-to-end run: discover, stack, reduce, project, write.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use common::CancelFlag;

use crate::config::RunConfig;
use crate::error::{Error, Result};
use crate::frame::FrameShape;
use crate::samples::{self, SamplePair, SampleSummary};
use crate::sink::{CsvSink, PlotSink, ResultSink};
use crate::source::FrameSource;
use crate::stack::StackBuilder;
use crate::stats;

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub frame_count: usize,
    pub shape: FrameShape,
    pub samples: Vec<SamplePair>,
    pub summary: SampleSummary,
    pub csv_path: Option<PathBuf>,
    pub plot_path: Option<PathBuf>,
    pub elapsed: Duration,
}

/// Compute the samples of `config.frames` without writing anything.
pub fn analyze(
    config: &RunConfig,
    cancel: &CancelFlag,
) -> Result<(usize, FrameShape, Vec<SamplePair>)> {
    let source = FrameSource::open(&config.frames)?;
    let stack = StackBuilder::new(config.stack.clone()).build(&source, cancel)?;
    let frame_count = stack.frame_count();

    let grid = stats::compute(&stack, cancel)?;
    // Releases cache files before the sinks run.
    drop(stack);

    Ok((frame_count, grid.shape(), samples::project(&grid)))
}

/// Run the whole pipeline. Outputs are written only after the statistics of
/// every pixel are complete.
pub fn run(config: &RunConfig, cancel: &CancelFlag) -> Result<RunReport> {
    let start = Instant::now();

    let (frame_count, shape, samples) = analyze(config, cancel)?;
    let summary = SampleSummary::from_samples(&samples);

    let csv_path = config.csv_path();
    let plot_path = config.plot_path();
    let mut sinks: Vec<Box<dyn ResultSink>> = Vec::new();
    if let Some(path) = &csv_path {
        sinks.push(Box::new(CsvSink::new(path)));
    }
    if let Some(path) = &plot_path {
        sinks.push(Box::new(PlotSink::new(path, &config.output.title)));
    }

    write_outputs(&sinks, &samples, cancel)?;

    let elapsed = start.elapsed();
    tracing::info!(
        frame_count,
        shape = %shape,
        finite_samples = summary.finite_count,
        median_of_medians = summary.median_of_medians,
        median_of_std_devs = summary.median_of_std_devs,
        "Elapsed time: {:.3}s",
        elapsed.as_secs_f64()
    );

    Ok(RunReport {
        frame_count,
        shape,
        samples,
        summary,
        csv_path,
        plot_path,
        elapsed,
    })
}

/// Cancellation is honoured before the first sink only; once writing starts
/// every sink runs, so a run never leaves a subset of its outputs.
fn write_outputs(
    sinks: &[Box<dyn ResultSink>],
    samples: &[SamplePair],
    cancel: &CancelFlag,
) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    for sink in sinks {
        tracing::debug!(sink = sink.name(), path = %sink.path().display(), "Writing output");
        sink.write(samples)?;
    }
    Ok(())
}
