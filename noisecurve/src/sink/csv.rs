use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{ResultSink, staging_path};
use crate::error::{Error, Result};
use crate::samples::SamplePair;

/// Writes one `median,std_dev` line per sample, no header.
///
/// Values use the shortest representation that parses back to the same
/// `f64`; non-finite values are written as `NaN`, `inf` or `-inf`.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ResultSink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, samples: &[SamplePair]) -> Result<()> {
        let staging = staging_path(&self.path);
        let written =
            write_rows(&staging, samples).and_then(|()| std::fs::rename(&staging, &self.path));
        if let Err(e) = written {
            let _ = std::fs::remove_file(&staging);
            return Err(Error::Export {
                path: self.path.clone(),
                source: e,
            });
        }

        tracing::info!(
            path = %self.path.display(),
            rows = samples.len(),
            "Exported samples to CSV"
        );
        Ok(())
    }
}

fn write_rows(path: &Path, samples: &[SamplePair]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for sample in samples {
        writeln!(writer, "{},{}", sample.median, sample.std_dev)?;
    }
    writer.into_inner().map_err(|e| e.into_error())?.sync_all()
}
