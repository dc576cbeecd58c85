//! Helpers for building synthetic frames and FITS files in tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use fitsio::FitsFile;
use fitsio::images::{ImageDescription, ImageType};

use crate::frame::{Frame, FrameShape};
use crate::grid::Grid;

/// Write a single-HDU unsigned 16-bit FITS image (row-major `pixels`).
pub fn write_fits_u16(path: &Path, shape: FrameShape, pixels: &[u16]) {
    let description = ImageDescription {
        data_type: ImageType::UnsignedShort,
        dimensions: &[shape.height, shape.width],
    };
    let mut fptr = FitsFile::create(path)
        .with_custom_primary(&description)
        .open()
        .unwrap();
    let hdu = fptr.primary_hdu().unwrap();
    hdu.write_image(&mut fptr, pixels).unwrap();
}

/// Write a FITS file whose primary HDU is empty and whose image lives in
/// the first extension.
pub fn write_fits_with_empty_primary(path: &Path, shape: FrameShape, pixels: &[u16]) {
    let description = ImageDescription {
        data_type: ImageType::UnsignedShort,
        dimensions: &[shape.height, shape.width],
    };
    let mut fptr = FitsFile::create(path).open().unwrap();
    let hdu = fptr.create_image("SCI", &description).unwrap();
    hdu.write_image(&mut fptr, pixels).unwrap();
}

/// Write one constant-valued u16 frame per entry of `values` into `dir`,
/// named `frame_000.fits`, `frame_001.fits`, ...
pub fn write_constant_frames(dir: &Path, shape: FrameShape, values: &[u16]) -> Vec<PathBuf> {
    values
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let path = dir.join(format!("frame_{i:03}.fits"));
            write_fits_u16(&path, shape, &vec![value; shape.pixel_count()]);
            path
        })
        .collect()
}

/// In-memory frame from row-major values.
pub fn frame_from_values(shape: FrameShape, values: Vec<f32>) -> Frame {
    Frame::new("synthetic.fits", Grid::new(shape, values))
}

/// In-memory frame with every pixel set to `value`.
pub fn constant_frame(shape: FrameShape, value: f32) -> Frame {
    Frame::new("synthetic.fits", Grid::new_filled(shape, value))
}
