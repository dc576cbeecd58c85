//! Error types for the noise analysis pipeline.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::frame::FrameShape;

/// Errors that abort a pipeline run. None of them are retried.
#[derive(Debug, Error)]
pub enum Error {
    #[error("No frames matched '{spec}'")]
    EmptySource { spec: String },

    #[error("Failed to read frame '{path}': {reason}")]
    UnreadableFrame { path: PathBuf, reason: String },

    #[error("Shape mismatch for {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: FrameShape,
        actual: FrameShape,
    },

    #[error("Cannot compute statistics of an empty frame stack")]
    EmptyStack,

    #[error("Invalid frame pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Failed to create cache directory '{path}': {source}")]
    CreateCacheDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to create cache file '{path}': {source}")]
    CreateCacheFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write cache file '{path}': {source}")]
    WriteCacheFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to open cache file '{path}': {source}")]
    OpenCacheFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to memory-map cache file '{path}': {source}")]
    MmapCacheFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Run cancelled")]
    Cancelled,

    #[error("Failed to export samples to '{path}': {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to render plot '{path}': {reason}")]
    Plot { path: PathBuf, reason: String },

    #[error("Invalid configuration '{path}': {reason}")]
    Config { path: PathBuf, reason: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::UnreadableFrame {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
