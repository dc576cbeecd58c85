//! Frame stack storage.
//!
//! Two modes:
//! - In-memory: frames are kept as decoded grids
//! - Disk-backed: each frame is written to a raw f32 file in a per-run cache
//!   directory and memory-mapped
//!
//! Cache file format: `frame_{index:05}.bin`, raw native-endian f32 pixels in
//! row-major order (width * height * 4 bytes), no header. The shape is tracked
//! by the owning [`FrameStack`].

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;

use crate::error::{Error, Result};
use crate::frame::{Frame, FrameShape};
use crate::grid::Grid;

/// One frame stored in a memory-mapped cache file.
#[derive(Debug)]
pub(crate) struct CachedFrame {
    mmap: Mmap,
    path: PathBuf,
}

#[derive(Debug)]
enum Storage {
    InMemory(Vec<Grid<f32>>),
    DiskBacked {
        frames: Vec<CachedFrame>,
        run_dir: PathBuf,
        keep_cache: bool,
    },
}

/// An ordered stack of N >= 1 frames of one shape.
///
/// Frame order is discovery order. Pixel data is read by row ranges, so
/// disk-backed stacks only page in the rows being reduced.
#[derive(Debug)]
pub struct FrameStack {
    storage: Storage,
    shape: FrameShape,
    paths: Vec<PathBuf>,
    chunk_rows: usize,
}

impl FrameStack {
    /// Build an in-memory stack from already loaded frames.
    pub fn from_frames(frames: Vec<Frame>) -> Result<Self> {
        let Some(first) = frames.first() else {
            return Err(Error::EmptyStack);
        };
        let shape = first.shape();
        for frame in &frames[1..] {
            if frame.shape() != shape {
                return Err(Error::ShapeMismatch {
                    context: format!("frame '{}'", frame.path().display()),
                    expected: shape,
                    actual: frame.shape(),
                });
            }
        }
        Ok(Self::in_memory(shape, frames))
    }

    /// Frames must already be validated against `shape`.
    pub(crate) fn in_memory(shape: FrameShape, frames: Vec<Frame>) -> Self {
        debug_assert!(frames.iter().all(|f| f.shape() == shape));
        let paths = frames.iter().map(|f| f.path().to_path_buf()).collect();
        let grids = frames.into_iter().map(Frame::into_pixels).collect();
        Self {
            storage: Storage::InMemory(grids),
            shape,
            paths,
            chunk_rows: shape.height.max(1),
        }
    }

    pub(crate) fn disk_backed(
        shape: FrameShape,
        frames: Vec<CachedFrame>,
        paths: Vec<PathBuf>,
        run_dir: PathBuf,
        keep_cache: bool,
        chunk_rows: usize,
    ) -> Self {
        debug_assert_eq!(frames.len(), paths.len());
        Self {
            storage: Storage::DiskBacked {
                frames,
                run_dir,
                keep_cache,
            },
            shape,
            paths,
            chunk_rows: chunk_rows.max(1),
        }
    }

    /// Override the number of rows reduced per chunk.
    pub fn with_chunk_rows(mut self, chunk_rows: usize) -> Self {
        self.chunk_rows = chunk_rows.max(1);
        self
    }

    pub fn frame_count(&self) -> usize {
        match &self.storage {
            Storage::InMemory(grids) => grids.len(),
            Storage::DiskBacked { frames, .. } => frames.len(),
        }
    }

    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    /// Source files in stack order.
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn chunk_rows(&self) -> usize {
        self.chunk_rows
    }

    pub fn is_disk_backed(&self) -> bool {
        matches!(self.storage, Storage::DiskBacked { .. })
    }

    /// Pixels of rows `start_row..end_row` of frame `frame_idx`.
    /// Zero-copy for both storage modes.
    pub fn read_rows(&self, frame_idx: usize, start_row: usize, end_row: usize) -> &[f32] {
        debug_assert!(start_row <= end_row && end_row <= self.shape.height);
        match &self.storage {
            Storage::InMemory(grids) => grids[frame_idx].rows(start_row, end_row),
            Storage::DiskBacked { frames, .. } => {
                let width = self.shape.width;
                let start_offset = start_row * width * size_of::<f32>();
                let end_offset = end_row * width * size_of::<f32>();
                bytemuck::cast_slice(&frames[frame_idx].mmap[start_offset..end_offset])
            }
        }
    }
}

impl Drop for FrameStack {
    fn drop(&mut self) {
        if let Storage::DiskBacked {
            frames,
            run_dir,
            keep_cache: false,
        } = &mut self.storage
        {
            // Unmap before deleting.
            let paths: Vec<PathBuf> = frames.drain(..).map(|f| f.path).collect();
            remove_run_dir(run_dir, &paths);
        }
    }
}

/// Remove the cache files of one run and, if empty, its directory.
pub(crate) fn remove_run_dir(run_dir: &Path, paths: &[PathBuf]) {
    for path in paths {
        let _ = std::fs::remove_file(path);
    }
    match std::fs::remove_dir(run_dir) {
        Ok(()) => tracing::debug!(dir = %run_dir.display(), "Removed frame cache"),
        Err(e) => tracing::debug!(dir = %run_dir.display(), "Frame cache not removed: {e}"),
    }
}

/// Cache file path for frame `index` of a run.
pub(crate) fn cache_file_path(run_dir: &Path, index: usize) -> PathBuf {
    run_dir.join(format!("frame_{index:05}.bin"))
}

/// Write a frame to its cache file and memory-map it.
pub(crate) fn cache_frame(run_dir: &Path, index: usize, frame: &Frame) -> Result<CachedFrame> {
    let path = cache_file_path(run_dir, index);
    write_cache_file(&path, frame.pixels().pixels())?;

    let file = File::open(&path).map_err(|e| Error::OpenCacheFile {
        path: path.clone(),
        source: e,
    })?;
    // SAFETY: the file lives in a per-run directory nothing else writes to.
    let mmap = unsafe {
        Mmap::map(&file).map_err(|e| Error::MmapCacheFile {
            path: path.clone(),
            source: e,
        })?
    };

    tracing::debug!(
        source = %frame.path().display(),
        cache = %path.display(),
        "Cached frame"
    );
    Ok(CachedFrame { mmap, path })
}

fn write_cache_file(path: &Path, pixels: &[f32]) -> Result<()> {
    let file = File::create(path).map_err(|e| Error::CreateCacheFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);

    let bytes: &[u8] = bytemuck::cast_slice(pixels);
    writer.write_all(bytes).map_err(|e| Error::WriteCacheFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    writer.flush().map_err(|e| Error::WriteCacheFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}
