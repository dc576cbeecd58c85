//! File discovery helpers: extension filtering and glob resolution.
//!
//! Every function here returns paths sorted lexicographically so callers get
//! the same order on every filesystem.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Supported FITS file extensions.
pub const FITS_EXTENSIONS: &[&str] = &["fit", "fits"];

#[derive(Debug, thiserror::Error)]
pub enum FileDiscoveryError {
    #[error("Invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },
    #[error("Failed to read '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Returns sorted paths of all files in `dir` matching the given extensions.
///
/// Extensions are matched case-insensitively. A missing directory yields an
/// empty list.
pub fn files_with_extensions(
    dir: &Path,
    extensions: &[&str],
) -> Result<Vec<PathBuf>, FileDiscoveryError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|source| FileDiscoveryError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|path| path.is_file() && has_extension(path, extensions))
        .collect();
    paths.sort();
    Ok(paths)
}

/// Returns sorted paths of all FITS files in the given directory.
pub fn fits_files(dir: &Path) -> Result<Vec<PathBuf>, FileDiscoveryError> {
    files_with_extensions(dir, FITS_EXTENSIONS)
}

/// Resolves a glob pattern to the sorted list of regular files it matches.
///
/// Entries that cannot be accessed while walking are skipped with a warning.
pub fn glob_files(pattern: &str) -> Result<Vec<PathBuf>, FileDiscoveryError> {
    let entries = glob::glob(pattern).map_err(|source| FileDiscoveryError::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => paths.push(path),
            Ok(_) => {}
            Err(e) => tracing::warn!("Error accessing {}: {e}", e.path().display()),
        }
    }
    paths.sort();
    Ok(paths)
}
