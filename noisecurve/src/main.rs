use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use common::log_setup::setup_logging;
use noisecurve::config::{DEFAULT_FRAME_DIR, DEFAULT_MAX_FRAMES, DEFAULT_PLOT_NAME, DEFAULT_TITLE};
use noisecurve::stack::DEFAULT_READ_CONCURRENCY;
use noisecurve::{
    CacheConfig, CancelFlag, FileSetSpec, OutputConfig, RunConfig, RunReport, StackConfig,
    StorageMode,
};

const LOG_DIR: &str = "logs";

const PRECISION_NOTE: &str = "Pixel values are held as f32, which is exact for 8 and 16-bit data. \
Frames with 32 or 64-bit pixels are rounded to 24 bits of precision before the statistics.";

/// Per-pixel median and std-dev of a stack of bias or dark frames
#[derive(Parser, Debug)]
#[command(name = "noisecurve", version, long_about = None, after_help = PRECISION_NOTE)]
struct Args {
    /// Frame directory or glob pattern, e.g. ./fits or './fits/dark_*.fits'
    #[arg(default_value = DEFAULT_FRAME_DIR)]
    frames: String,

    /// Plot title
    #[arg(default_value = DEFAULT_TITLE)]
    title: String,

    /// Write the (median, std-dev) samples as CSV
    #[arg(long, required_unless_present = "config")]
    export_csv: Option<bool>,

    /// CSV location [default: <FRAMES>/result.csv]
    #[arg(long)]
    csv_path: Option<PathBuf>,

    /// Plot location [default: <FRAMES>/result.png]
    #[arg(long, conflicts_with = "no_plot")]
    plot_path: Option<PathBuf>,

    /// Skip the plot
    #[arg(long)]
    no_plot: bool,

    /// Use only the first N frames in sorted order
    #[arg(long, default_value_t = DEFAULT_MAX_FRAMES, conflicts_with = "all_frames")]
    max_frames: usize,

    /// Use every matching frame
    #[arg(long)]
    all_frames: bool,

    /// Frames decoded at once
    #[arg(long, default_value_t = DEFAULT_READ_CONCURRENCY)]
    read_concurrency: usize,

    /// Where stacked frames are kept
    #[arg(long, value_enum, default_value_t = StorageMode::Auto)]
    storage: StorageMode,

    /// Directory for disk-backed frame cache files
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Keep cache files after the run
    #[arg(long)]
    keep_cache: bool,

    /// Load the whole run from a YAML or JSON file instead
    #[arg(
        long,
        conflicts_with_all = [
            "frames",
            "title",
            "export_csv",
            "csv_path",
            "plot_path",
            "no_plot",
            "max_frames",
            "all_frames",
            "read_concurrency",
            "storage",
            "cache_dir",
            "keep_cache",
        ]
    )]
    config: Option<PathBuf>,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn run_config(&self) -> Result<RunConfig> {
        if let Some(path) = &self.config {
            return RunConfig::load(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()));
        }

        let frames = FileSetSpec::parse(&self.frames);
        let plot_path = if self.no_plot {
            None
        } else {
            Some(
                self.plot_path
                    .clone()
                    .unwrap_or_else(|| frames.base_dir().join(DEFAULT_PLOT_NAME)),
            )
        };

        let mut cache = match &self.cache_dir {
            Some(dir) => CacheConfig::with_cache_dir(dir.clone()),
            None => CacheConfig::default(),
        };
        cache.storage = self.storage;
        cache.keep_cache = self.keep_cache;

        Ok(RunConfig {
            frames,
            stack: StackConfig {
                max_frames: (!self.all_frames).then_some(self.max_frames),
                read_concurrency: self.read_concurrency,
                cache,
            },
            output: OutputConfig {
                title: self.title.clone(),
                // Required by clap unless --config is given.
                export_csv: self.export_csv.unwrap_or(false),
                csv_path: self.csv_path.clone(),
                plot_path,
            },
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(&args.log_level, Path::new(LOG_DIR), "noisecurve")
        .context("Failed to initialize logging")?;

    let config = args.run_config()?;
    tracing::info!(frames = %config.frames, "Starting noise analysis");

    let report = run_until_interrupted(config, CancelFlag::new()).await?;

    tracing::info!(
        frames = report.frame_count,
        shape = %report.shape,
        samples = report.samples.len(),
        read_noise = report.summary.median_of_std_devs,
        "Done"
    );
    if let Some(path) = &report.csv_path {
        tracing::info!("Samples: {}", path.display());
    }
    if let Some(path) = &report.plot_path {
        tracing::info!("Plot: {}", path.display());
    }
    Ok(())
}

/// Runs the pipeline on the blocking pool; Ctrl-C raises the cancel flag and
/// waits for the pipeline to stop.
async fn run_until_interrupted(config: RunConfig, cancel: CancelFlag) -> Result<RunReport> {
    let worker_cancel = cancel.clone();
    let mut task = tokio::task::spawn_blocking(move || noisecurve::run(&config, &worker_cancel));

    let result = tokio::select! {
        joined = &mut task => joined,
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, cancelling run");
            cancel.cancel();
            task.await
        }
    };

    let report = result.context("Pipeline task panicked")??;
    Ok(report)
}
