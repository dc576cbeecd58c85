//! Run configuration, loadable from YAML or JSON.

use std::path::{Path, PathBuf};

use common::FileFormat;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::source::FileSetSpec;
use crate::stack::StackConfig;

pub const DEFAULT_FRAME_DIR: &str = "./fits";
pub const DEFAULT_TITLE: &str = "Bias";
pub const DEFAULT_CSV_NAME: &str = "result.csv";
pub const DEFAULT_PLOT_NAME: &str = "result.png";
/// Load limit applied by the command line unless all frames are requested.
pub const DEFAULT_MAX_FRAMES: usize = 32;

/// Everything a pipeline run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Written as `directory: <path>` or `pattern: <glob>`.
    #[serde(with = "serde_yml::with::singleton_map")]
    pub frames: FileSetSpec,
    #[serde(default)]
    pub stack: StackConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Plot caption.
    #[serde(default = "default_title")]
    pub title: String,
    /// Write the CSV export. No default: every run states it.
    pub export_csv: bool,
    /// CSV location; `<frame dir>/result.csv` when unset.
    #[serde(default)]
    pub csv_path: Option<PathBuf>,
    /// Plot location; no plot when unset.
    #[serde(default)]
    pub plot_path: Option<PathBuf>,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

impl OutputConfig {
    pub fn new(export_csv: bool) -> Self {
        Self {
            title: default_title(),
            export_csv,
            csv_path: None,
            plot_path: None,
        }
    }
}

impl RunConfig {
    pub fn new(frames: FileSetSpec, output: OutputConfig) -> Self {
        Self {
            frames,
            stack: StackConfig::default(),
            output,
        }
    }

    /// Load a configuration file; the format follows the extension.
    pub fn load(path: &Path) -> Result<Self> {
        let config_error = |reason: String| Error::Config {
            path: path.to_path_buf(),
            reason,
        };

        let format = FileFormat::from_path(path).map_err(|e| config_error(e.to_string()))?;
        let text = std::fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        let config: Self =
            common::deserialize(&text, format).map_err(|e| config_error(e.to_string()))?;

        tracing::debug!(path = %path.display(), ?format, "Loaded run configuration");
        Ok(config)
    }

    /// Write this configuration; the format follows the extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        let config_error = |reason: String| Error::Config {
            path: path.to_path_buf(),
            reason,
        };

        let format = FileFormat::from_path(path).map_err(|e| config_error(e.to_string()))?;
        let text = common::serialize(self, format).map_err(|e| config_error(e.to_string()))?;
        std::fs::write(path, text).map_err(|e| config_error(e.to_string()))
    }

    /// Where the CSV goes, or `None` when export is off.
    pub fn csv_path(&self) -> Option<PathBuf> {
        if !self.output.export_csv {
            return None;
        }
        Some(
            self.output
                .csv_path
                .clone()
                .unwrap_or_else(|| self.frames.base_dir().join(DEFAULT_CSV_NAME)),
        )
    }

    pub fn plot_path(&self) -> Option<PathBuf> {
        self.output.plot_path.clone()
    }
}
