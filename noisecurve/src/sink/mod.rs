//! Output sinks for projected samples.
//!
//! Sinks only run after statistics completed. Each sink renders into a
//! staging file next to its target and renames it into place, so an aborted
//! write never leaves a truncated output behind.

mod csv;
mod plot;

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::samples::SamplePair;

pub use csv::CsvSink;
pub use plot::{PlotAxes, PlotSink, PlotStats, plottable_points};

/// Destination for the (median, std-dev) samples of a run.
pub trait ResultSink {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// File the sink produces.
    fn path(&self) -> &Path;

    fn write(&self, samples: &[SamplePair]) -> Result<()>;
}

/// Hidden sibling of `path` that keeps its extension, e.g.
/// `out/result.csv` -> `out/.result.partial.csv`.
pub(crate) fn staging_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!(".{stem}.partial.{}", ext.to_string_lossy()),
        None => format!(".{stem}.partial"),
    };
    path.with_file_name(name)
}
