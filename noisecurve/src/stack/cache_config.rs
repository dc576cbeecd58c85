//! Storage configuration for frame stacks.
//!
//! A stack either lives in RAM or in per-frame memory-mapped cache files.
//! Disk-backed stacks are reduced in horizontal row chunks sized so that one
//! chunk of every frame fits in the memory budget.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Minimum chunk rows to avoid excessive I/O overhead.
pub const MIN_CHUNK_ROWS: usize = 64;

/// Percentage of available memory a stack may use.
pub const MEMORY_PERCENT: u64 = 75;

/// Where stacked frames are kept.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum StorageMode {
    /// In memory when the stack fits the memory budget, on disk otherwise.
    #[default]
    Auto,
    /// Always in memory.
    InMemory,
    /// Always in memory-mapped cache files.
    DiskBacked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub storage: StorageMode,
    /// Directory for disk-backed frame files.
    pub cache_dir: PathBuf,
    /// Keep cache files after the stack is dropped.
    pub keep_cache: bool,
    /// Available memory override in bytes. If None, queries the system.
    pub available_memory: Option<u64>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            storage: StorageMode::Auto,
            cache_dir: std::env::temp_dir().join("noisecurve_cache"),
            keep_cache: false,
            available_memory: None,
        }
    }
}

impl CacheConfig {
    pub fn with_cache_dir(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            ..Default::default()
        }
    }

    /// Available memory: the override if set, otherwise the system's.
    pub fn get_available_memory(&self) -> u64 {
        self.available_memory.unwrap_or_else(get_available_memory)
    }

    /// Decide whether a stack of `frame_count` frames of `pixel_count` pixels
    /// goes to disk.
    pub fn use_disk(&self, pixel_count: usize, frame_count: usize) -> bool {
        match self.storage {
            StorageMode::InMemory => false,
            StorageMode::DiskBacked => true,
            StorageMode::Auto => {
                !fits_in_memory(pixel_count, frame_count, self.get_available_memory())
            }
        }
    }
}

fn get_available_memory() -> u64 {
    use sysinfo::System;

    let mut sys = System::new();
    sys.refresh_memory();
    sys.available_memory()
}

/// True if `frame_count` f32 frames of `pixel_count` pixels fit in
/// [`MEMORY_PERCENT`] of `available_memory`.
pub fn fits_in_memory(pixel_count: usize, frame_count: usize, available_memory: u64) -> bool {
    let Some(bytes_per_frame) = pixel_count.checked_mul(size_of::<f32>()) else {
        return false;
    };
    let Some(total_bytes_needed) = bytes_per_frame.checked_mul(frame_count) else {
        return false;
    };
    (total_bytes_needed as u64) <= usable_memory(available_memory)
}

/// [`MEMORY_PERCENT`] of `available_memory`, without overflowing for any input.
fn usable_memory(available_memory: u64) -> u64 {
    (u128::from(available_memory) * u128::from(MEMORY_PERCENT) / 100) as u64
}

/// Rows per chunk so that `chunk_rows * width * frame_count` f32 samples fit
/// in the memory budget. Never below [`MIN_CHUNK_ROWS`].
pub fn compute_chunk_rows(width: usize, frame_count: usize, available_memory: u64) -> usize {
    let usable_memory = usable_memory(available_memory);

    let bytes_per_row = width
        .checked_mul(size_of::<f32>())
        .and_then(|v| v.checked_mul(frame_count))
        .map(|v| v as u64)
        .unwrap_or(u64::MAX);

    if bytes_per_row == 0 {
        return MIN_CHUNK_ROWS;
    }

    let chunk_rows = usize::try_from(usable_memory / bytes_per_row)
        .unwrap_or(usize::MAX)
        .max(MIN_CHUNK_ROWS);

    tracing::debug!(
        available_memory_mb = available_memory / (1024 * 1024),
        width,
        frame_count,
        bytes_per_row,
        chunk_rows,
        "Chunk sizing computed"
    );

    chunk_rows
}

#[cfg(test)]
mod tests {
    use super::*;

    const GB: u64 = 1024 * 1024 * 1024;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert!(config.cache_dir.ends_with("noisecurve_cache"));
        assert_eq!(config.storage, StorageMode::Auto);
        assert!(!config.keep_cache);
    }

    #[test]
    fn test_fits_in_memory() {
        // 32 frames of 1936x1096 = ~272MB, 1GB available (768MB usable)
        assert!(fits_in_memory(1936 * 1096, 32, GB));

        // 300 frames of 6248x4176 = ~31GB, 16GB available
        assert!(!fits_in_memory(6248 * 4176, 300, 16 * GB));

        // Exactly at the 75% boundary
        let pixel_count = 1000 * 1000;
        let frame_count = 10;
        let bytes_needed = (pixel_count * frame_count * 4) as u64;
        let available_at_boundary = (bytes_needed * 100).div_ceil(75);
        assert!(fits_in_memory(pixel_count, frame_count, available_at_boundary));
        assert!(!fits_in_memory(pixel_count, frame_count, available_at_boundary - 2));
    }

    #[test]
    fn test_fits_in_memory_overflow() {
        assert!(!fits_in_memory(usize::MAX, 2, u64::MAX / 2));
    }

    #[test]
    fn test_huge_available_memory() {
        assert!(fits_in_memory(10, 1, u64::MAX));
        assert!(compute_chunk_rows(10, 1, u64::MAX) >= MIN_CHUNK_ROWS);

        let config = CacheConfig {
            available_memory: Some(u64::MAX),
            ..Default::default()
        };
        assert!(!config.use_disk(6248 * 4176, 300));
    }

    #[test]
    fn test_use_disk_respects_mode() {
        let mut config = CacheConfig {
            available_memory: Some(GB),
            ..Default::default()
        };
        assert!(!config.use_disk(1000 * 1000, 10));
        assert!(config.use_disk(6248 * 4176, 300));

        config.storage = StorageMode::InMemory;
        assert!(!config.use_disk(6248 * 4176, 300));

        config.storage = StorageMode::DiskBacked;
        assert!(config.use_disk(1, 1));
    }

    #[test]
    fn test_compute_chunk_rows_typical() {
        // 6248 wide, 64 frames, 8GB available
        let rows = compute_chunk_rows(6248, 64, 8 * GB);
        let bytes_per_row = 6248u64 * 4 * 64;
        let expected = (8 * GB * MEMORY_PERCENT / 100 / bytes_per_row) as usize;
        assert_eq!(rows, expected.max(MIN_CHUNK_ROWS));
    }

    #[test]
    fn test_compute_chunk_rows_respects_minimum() {
        let cases = [
            (100, 2, 0u64),
            (6248, 300, 256 * 1024 * 1024),
            (12000, 1000, GB),
        ];
        for (width, frames, available) in cases {
            let rows = compute_chunk_rows(width, frames, available);
            assert!(rows >= MIN_CHUNK_ROWS, "{rows} rows for {width} x {frames}");
        }
    }

    #[test]
    fn test_compute_chunk_rows_degenerate() {
        assert_eq!(compute_chunk_rows(0, 10, GB), MIN_CHUNK_ROWS);
    }

    #[test]
    fn test_storage_mode_serde_names() {
        let json = common::serialize(&StorageMode::DiskBacked, common::FileFormat::Json).unwrap();
        assert_eq!(json, "\"disk-backed\"");
    }
}
