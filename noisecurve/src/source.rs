//! Frame discovery: resolves a file-set specification to an ordered list of
//! frame files and reads them lazily.

use std::fmt;
use std::path::{Path, PathBuf};

use common::file_utils::{self, FileDiscoveryError};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::frame::{Frame, FrameInfo, FrameShape, load_frame, probe_frame};

/// Which files make up a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileSetSpec {
    /// Every `*.fit` / `*.fits` file directly inside a directory.
    Directory(PathBuf),
    /// A glob pattern, e.g. `captures/dark/*.fits`.
    Pattern(String),
}

impl FileSetSpec {
    /// Interpret a user-supplied string: glob metacharacters make it a
    /// pattern, anything else is a directory.
    pub fn parse(spec: &str) -> Self {
        if spec.contains(['*', '?', '[']) {
            Self::Pattern(spec.to_string())
        } else {
            Self::Directory(PathBuf::from(spec))
        }
    }

    /// Resolve to the matching files, sorted lexicographically.
    pub fn resolve(&self) -> Result<Vec<PathBuf>> {
        let resolved = match self {
            Self::Directory(dir) => file_utils::fits_files(dir),
            Self::Pattern(pattern) => file_utils::glob_files(pattern),
        };
        resolved.map_err(|e| match e {
            FileDiscoveryError::Pattern { pattern, source } => Error::InvalidPattern {
                pattern,
                reason: source.to_string(),
            },
            FileDiscoveryError::Io { path, source } => Error::InvalidPattern {
                pattern: path.display().to_string(),
                reason: source.to_string(),
            },
        })
    }

    /// Directory the frames live in, used for default output locations.
    pub fn base_dir(&self) -> PathBuf {
        match self {
            Self::Directory(dir) => dir.clone(),
            Self::Pattern(pattern) => Path::new(pattern)
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

impl fmt::Display for FileSetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory(dir) => write!(f, "{}/*.fits", dir.display()),
            Self::Pattern(pattern) => f.write_str(pattern),
        }
    }
}

/// A resolved, ordered set of frames sharing one shape.
///
/// The file list is a snapshot taken by [`FrameSource::open`]; the shape comes
/// from the first file's header. Pixel data is only read on demand.
#[derive(Debug, Clone)]
pub struct FrameSource {
    spec: FileSetSpec,
    paths: Vec<PathBuf>,
    info: FrameInfo,
}

impl FrameSource {
    pub fn open(spec: &FileSetSpec) -> Result<Self> {
        let paths = spec.resolve()?;
        let Some(first) = paths.first() else {
            return Err(Error::EmptySource {
                spec: spec.to_string(),
            });
        };
        let info = probe_frame(first)?;

        tracing::info!(
            spec = %spec,
            frame_count = paths.len(),
            shape = %info.shape,
            bitpix = %info.bitpix,
            "Resolved frame source"
        );
        if !info.bitpix.fits_f32_exactly() {
            tracing::warn!(
                bitpix = %info.bitpix,
                "Pixel type wider than 24 bits of precision, values are rounded to f32"
            );
        }

        Ok(Self {
            spec: spec.clone(),
            paths,
            info,
        })
    }

    pub fn spec(&self) -> &FileSetSpec {
        &self.spec
    }

    /// Common frame shape, taken from the first frame.
    pub fn shape(&self) -> FrameShape {
        self.info.shape
    }

    /// Frame files in discovery order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Load frame `index` and check it against the common shape.
    pub fn read_frame(&self, index: usize) -> Result<Frame> {
        let path = &self.paths[index];
        let frame = load_frame(path)?;
        if frame.shape() != self.info.shape {
            return Err(Error::ShapeMismatch {
                context: format!("frame '{}'", path.display()),
                expected: self.info.shape,
                actual: frame.shape(),
            });
        }
        Ok(frame)
    }

    /// Lazily read frames in discovery order.
    ///
    /// Iterates the file list snapshotted by [`FrameSource::open`]; files
    /// added or removed since then are not picked up. Open a new source to
    /// re-resolve the file set.
    pub fn frames(&self) -> Frames<'_> {
        Frames {
            source: self,
            next: 0,
        }
    }
}

/// Iterator returned by [`FrameSource::frames`].
#[derive(Debug)]
pub struct Frames<'a> {
    source: &'a FrameSource,
    next: usize,
}

impl Iterator for Frames<'_> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.source.len() {
            return None;
        }
        let frame = self.source.read_frame(self.next);
        self.next += 1;
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.source.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Frames<'_> {}
