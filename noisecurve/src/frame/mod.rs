mod fits;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::grid::Grid;

pub use fits::{load_frame, probe_frame};

/// FITS BITPIX values, with cfitsio's unsigned variants (BZERO convention).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum BitPix {
    UInt8,
    Int8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    Float32,
    Float64,
}

impl BitPix {
    /// True when every value of this type is stored exactly in an f32 sample.
    pub fn fits_f32_exactly(self) -> bool {
        matches!(
            self,
            BitPix::UInt8 | BitPix::Int8 | BitPix::Int16 | BitPix::UInt16 | BitPix::Float32
        )
    }
}

/// Frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FrameShape {
    pub width: usize,
    pub height: usize,
}

impl FrameShape {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

impl fmt::Display for FrameShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Header-level description of a frame file, read without touching pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInfo {
    pub shape: FrameShape,
    pub bitpix: BitPix,
    /// Index of the HDU holding the image (0 = primary).
    pub hdu_index: usize,
}

/// One exposure: raw sensor intensities in ADU, row-major.
#[derive(Debug, Clone)]
pub struct Frame {
    path: PathBuf,
    pixels: Grid<f32>,
}

impl Frame {
    pub fn new(path: impl Into<PathBuf>, pixels: Grid<f32>) -> Self {
        Self {
            path: path.into(),
            pixels,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn shape(&self) -> FrameShape {
        self.pixels.shape()
    }

    pub fn pixels(&self) -> &Grid<f32> {
        &self.pixels
    }

    pub fn into_pixels(self) -> Grid<f32> {
        self.pixels
    }
}
