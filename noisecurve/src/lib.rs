//! Noisecurve - per-pixel noise characterization of CMOS sensors.
//!
//! A stack of bias or dark frames is reduced to a per-pixel median and
//! population standard deviation. The resulting (median, std-dev) pairs feed
//! a log-log scatter plot in the style of a photon transfer curve and an
//! optional CSV export.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use noisecurve::{CancelFlag, FileSetSpec, OutputConfig, RunConfig, run};
//!
//! let mut config = RunConfig::new(FileSetSpec::parse("./fits"), OutputConfig::new(true));
//! config.output.plot_path = Some("./fits/result.png".into());
//!
//! let report = run(&config, &CancelFlag::new())?;
//! println!("{} frames, {} samples", report.frame_count, report.samples.len());
//! ```

pub mod config;
mod error;
pub mod frame;
mod grid;
pub mod pipeline;
pub mod samples;
pub mod sink;
pub mod source;
pub mod stack;
pub mod stats;

#[cfg(test)]
mod test_utils;

// ============================================================================
// Frames and discovery
// ============================================================================

pub use error::{Error, Result};
pub use frame::{BitPix, Frame, FrameInfo, FrameShape, load_frame, probe_frame};
pub use grid::Grid;
pub use source::{FileSetSpec, FrameSource, Frames};

// ============================================================================
// Stacking and statistics
// ============================================================================

pub use stack::{CacheConfig, FrameStack, StackBuilder, StackConfig, StorageMode};
pub use stats::{PixelStatGrid, compute};

// ============================================================================
// Samples and outputs
// ============================================================================

pub use samples::{SamplePair, SampleSummary, project, project_grids, unproject};
pub use sink::{CsvSink, PlotSink, ResultSink};

// ============================================================================
// Runs
// ============================================================================

pub use common::CancelFlag;
pub use config::{OutputConfig, RunConfig};
pub use pipeline::{RunReport, analyze, run};
