#![allow(dead_code)]

use std::path::{Path, PathBuf};

use fitsio::FitsFile;
use fitsio::images::{ImageDescription, ImageType};
use noisecurve::{FileSetSpec, FrameShape, OutputConfig, RunConfig, SamplePair};

/// Write an unsigned 16-bit FITS frame, row-major pixels.
pub fn write_frame(path: &Path, shape: FrameShape, pixels: &[u16]) {
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

/// One constant frame per value, named `bias_000.fits`, `bias_001.fits`, ...
pub fn write_constant_frames(dir: &Path, shape: FrameShape, values: &[u16]) -> Vec<PathBuf> {
    values
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let path = dir.join(format!("bias_{i:03}.fits"));
            write_frame(&path, shape, &vec![value; shape.pixel_count()]);
            path
        })
        .collect()
}

/// CSV export into `dir`, no plot.
pub fn csv_only_config(dir: &Path) -> RunConfig {
    RunConfig::new(
        FileSetSpec::Directory(dir.to_path_buf()),
        OutputConfig::new(true),
    )
}

pub fn read_csv(path: &Path) -> Vec<SamplePair> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| {
            let (median, std_dev) = line.split_once(',').unwrap();
            SamplePair::new(median.parse().unwrap(), std_dev.parse().unwrap())
        })
        .collect()
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}
