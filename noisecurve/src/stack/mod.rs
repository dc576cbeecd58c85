//! Loading a frame source into a [`FrameStack`].

mod cache;
mod cache_config;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use common::CancelFlag;
use common::parallel::{BatchError, try_par_map_batched};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::source::FrameSource;

pub use cache::FrameStack;
pub use cache_config::{
    CacheConfig, MEMORY_PERCENT, MIN_CHUNK_ROWS, StorageMode, compute_chunk_rows, fits_in_memory,
};

/// Frames read in parallel when no limit is configured.
pub const DEFAULT_READ_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Use only the first `max_frames` frames in discovery order.
    /// `None` uses every frame.
    pub max_frames: Option<usize>,
    /// Maximum number of frames decoded at once.
    pub read_concurrency: usize,
    pub cache: CacheConfig,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            max_frames: None,
            read_concurrency: DEFAULT_READ_CONCURRENCY,
            cache: CacheConfig::default(),
        }
    }
}

/// Reads frames from a source into a stack.
#[derive(Debug, Clone, Default)]
pub struct StackBuilder {
    config: StackConfig,
}

impl StackBuilder {
    pub fn new(config: StackConfig) -> Self {
        Self { config }
    }

    /// Load the first `max_frames` frames of `source`.
    ///
    /// Every frame must match the source shape. The first failing frame
    /// aborts the build; no partial stack is returned.
    pub fn build(&self, source: &FrameSource, cancel: &CancelFlag) -> Result<FrameStack> {
        let available = source.len();
        let frame_count = self
            .config
            .max_frames
            .map_or(available, |max| max.min(available));
        if frame_count == 0 {
            return Err(Error::EmptySource {
                spec: source.spec().to_string(),
            });
        }
        if frame_count < available {
            tracing::info!(
                limit = frame_count,
                available,
                "Frame limit reached, ignoring remaining frames"
            );
        }

        let shape = source.shape();
        let use_disk = self.config.cache.use_disk(shape.pixel_count(), frame_count);
        tracing::info!(
            frame_count,
            shape = %shape,
            storage = if use_disk { "disk" } else { "memory" },
            "Building frame stack"
        );

        let start = Instant::now();
        let indices: Vec<usize> = (0..frame_count).collect();
        let stack = if use_disk {
            self.build_disk_backed(source, &indices, cancel)?
        } else {
            self.build_in_memory(source, &indices, cancel)?
        };

        tracing::info!(
            frame_count,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "{frame_count} files loaded"
        );
        Ok(stack)
    }

    fn build_in_memory(
        &self,
        source: &FrameSource,
        indices: &[usize],
        cancel: &CancelFlag,
    ) -> Result<FrameStack> {
        let progress = LoadProgress::new(indices.len());
        let load = |_: usize, &index: &usize| -> Result<_> {
            let frame = source.read_frame(index)?;
            progress.frame_loaded(frame.path());
            Ok(frame)
        };
        let frames =
            try_par_map_batched(indices, self.concurrency(), cancel, load).map_err(batch_error)?;

        Ok(FrameStack::in_memory(source.shape(), frames))
    }

    fn build_disk_backed(
        &self,
        source: &FrameSource,
        indices: &[usize],
        cancel: &CancelFlag,
    ) -> Result<FrameStack> {
        let run_dir = create_run_dir(&self.config.cache.cache_dir)?;
        let progress = LoadProgress::new(indices.len());

        let load = |_: usize, &index: &usize| -> Result<_> {
            let frame = source.read_frame(index)?;
            let cached = cache::cache_frame(&run_dir, index, &frame)?;
            progress.frame_loaded(frame.path());
            Ok(cached)
        };
        let cached = match try_par_map_batched(indices, self.concurrency(), cancel, load) {
            Ok(cached) => cached,
            Err(e) => {
                // Files of a failed run are never reused.
                let written: Vec<PathBuf> = indices
                    .iter()
                    .map(|&i| cache::cache_file_path(&run_dir, i))
                    .collect();
                cache::remove_run_dir(&run_dir, &written);
                return Err(batch_error(e));
            }
        };

        let shape = source.shape();
        let chunk_rows = compute_chunk_rows(
            shape.width,
            indices.len(),
            self.config.cache.get_available_memory(),
        );
        let paths = indices.iter().map(|&i| source.paths()[i].clone()).collect();

        Ok(FrameStack::disk_backed(
            shape,
            cached,
            paths,
            run_dir,
            self.config.cache.keep_cache,
            chunk_rows,
        ))
    }

    fn concurrency(&self) -> usize {
        self.config.read_concurrency.max(1)
    }
}

fn batch_error(e: BatchError<Error>) -> Error {
    match e {
        BatchError::Failed(e) => e,
        BatchError::Cancelled => Error::Cancelled,
    }
}

/// Each run gets its own directory under the cache root, so concurrent runs
/// sharing a root never see each other's files.
fn create_run_dir(cache_dir: &Path) -> Result<PathBuf> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let run_dir = cache_dir.join(format!("run_{}_{nanos}", std::process::id()));
    std::fs::create_dir_all(&run_dir).map_err(|e| Error::CreateCacheDir {
        path: run_dir.clone(),
        source: e,
    })?;
    Ok(run_dir)
}

struct LoadProgress {
    loaded: AtomicUsize,
    total: usize,
}

impl LoadProgress {
    fn new(total: usize) -> Self {
        Self {
            loaded: AtomicUsize::new(0),
            total,
        }
    }

    fn frame_loaded(&self, path: &Path) {
        let loaded = self.loaded.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(path = %path.display(), "Loaded frame {loaded}/{}", self.total);
    }
}
