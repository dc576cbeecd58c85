use std::path::Path;

use fitsio::FitsFile;
use fitsio::hdu::{FitsHdu, HduInfo};
use fitsio::images::ImageType;

use super::{BitPix, Frame, FrameInfo, FrameShape};
use crate::error::{Error, Result};
use crate::grid::Grid;

/// Read the shape and pixel type of a FITS frame without loading its pixels.
pub fn probe_frame(path: &Path) -> Result<FrameInfo> {
    let mut fptr = open(path)?;
    let (_, info) = locate_image_hdu(path, &mut fptr)?;
    Ok(info)
}

/// Load the 2-D image of a FITS file as raw intensities.
///
/// Uses the primary HDU, or the first image extension when the primary HDU
/// carries no data (tile-compressed files). Values are not rescaled: cfitsio
/// applies BZERO/BSCALE, so unsigned 16-bit data arrives as 0..=65535.
pub fn load_frame(path: &Path) -> Result<Frame> {
    let mut fptr = open(path)?;
    let (hdu, info) = locate_image_hdu(path, &mut fptr)?;

    let pixels: Vec<f32> = hdu
        .read_image(&mut fptr)
        .map_err(|e| Error::unreadable(path, format!("failed to read image data: {e}")))?;

    if pixels.len() != info.shape.pixel_count() {
        return Err(Error::unreadable(
            path,
            format!(
                "pixel count {} does not match image shape {}",
                pixels.len(),
                info.shape
            ),
        ));
    }

    tracing::debug!(
        path = %path.display(),
        shape = %info.shape,
        bitpix = %info.bitpix,
        hdu = info.hdu_index,
        "Loaded frame"
    );

    Ok(Frame::new(path, Grid::new(info.shape, pixels)))
}

fn open(path: &Path) -> Result<FitsFile> {
    FitsFile::open(path)
        .map_err(|e| Error::unreadable(path, format!("failed to open FITS file: {e}")))
}

fn locate_image_hdu(path: &Path, fptr: &mut FitsFile) -> Result<(FitsHdu, FrameInfo)> {
    let hdu_count = fptr
        .num_hdus()
        .map_err(|e| Error::unreadable(path, format!("failed to count HDUs: {e}")))?;

    for index in 0..hdu_count {
        let hdu = fptr
            .hdu(index)
            .map_err(|e| Error::unreadable(path, format!("failed to access HDU {index}: {e}")))?;

        let HduInfo::ImageInfo { shape, image_type } = &hdu.info else {
            continue;
        };
        if shape.is_empty() {
            continue;
        }

        let shape = image_shape(shape).ok_or_else(|| {
            Error::unreadable(
                path,
                format!("HDU {index} is not a 2-D image (dimensions {shape:?})"),
            )
        })?;
        let info = FrameInfo {
            shape,
            bitpix: image_type_to_bitpix(image_type),
            hdu_index: index,
        };
        return Ok((hdu, info));
    }

    Err(Error::unreadable(path, "no image HDU with pixel data"))
}

/// Convert a cfitsio shape (slowest axis first) to a frame shape.
///
/// `[height, width]` is a plain 2-D frame; a leading axis of length 1
/// (`[1, height, width]`) is accepted as the same thing.
fn image_shape(dimensions: &[usize]) -> Option<FrameShape> {
    let (height, width) = match dimensions {
        [height, width] => (*height, *width),
        [1, height, width] => (*height, *width),
        _ => return None,
    };
    (width > 0 && height > 0).then(|| FrameShape::new(width, height))
}

fn image_type_to_bitpix(image_type: &ImageType) -> BitPix {
    match image_type {
        ImageType::UnsignedByte => BitPix::UInt8,
        ImageType::Byte => BitPix::Int8,
        ImageType::Short => BitPix::Int16,
        ImageType::UnsignedShort => BitPix::UInt16,
        ImageType::Long => BitPix::Int32,
        ImageType::UnsignedLong => BitPix::UInt32,
        ImageType::LongLong => BitPix::Int64,
        ImageType::Float => BitPix::Float32,
        ImageType::Double => BitPix::Float64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{write_fits_u16, write_fits_with_empty_primary};

    #[test]
    fn test_image_shape_2d() {
        assert_eq!(image_shape(&[3, 4]), Some(FrameShape::new(4, 3)));
    }

    #[test]
    fn test_image_shape_degenerate_cube() {
        assert_eq!(image_shape(&[1, 3, 4]), Some(FrameShape::new(4, 3)));
    }

    #[test]
    fn test_image_shape_rejects_others() {
        assert_eq!(image_shape(&[5]), None);
        assert_eq!(image_shape(&[3, 3, 4]), None);
        assert_eq!(image_shape(&[0, 4]), None);
    }

    #[test]
    fn test_load_u16_frame_keeps_adu_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bias.fits");
        // 3 wide, 2 tall
        write_fits_u16(&path, FrameShape::new(3, 2), &[0, 1000, 65535, 7, 8, 9]);

        let frame = load_frame(&path).unwrap();
        assert_eq!(frame.shape(), FrameShape::new(3, 2));
        assert_eq!(frame.pixels().pixels(), &[0.0, 1000.0, 65535.0, 7.0, 8.0, 9.0]);
        assert_eq!(*frame.pixels().get(2, 0), 65535.0);
        assert_eq!(*frame.pixels().get(0, 1), 7.0);
    }

    #[test]
    fn test_probe_reports_shape_and_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dark.fits");
        write_fits_u16(&path, FrameShape::new(5, 4), &[1; 20]);

        let info = probe_frame(&path).unwrap();
        assert_eq!(info.shape, FrameShape::new(5, 4));
        // cfitsio may report the raw BITPIX 16 or its BZERO-adjusted type.
        assert!(matches!(info.bitpix, BitPix::UInt16 | BitPix::Int16));
        assert!(info.bitpix.fits_f32_exactly());
        assert_eq!(info.hdu_index, 0);
    }

    #[test]
    fn test_load_from_extension_when_primary_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ext.fits");
        write_fits_with_empty_primary(&path, FrameShape::new(2, 2), &[10, 20, 30, 40]);

        let info = probe_frame(&path).unwrap();
        assert_eq!(info.hdu_index, 1);
        let frame = load_frame(&path).unwrap();
        assert_eq!(frame.pixels().pixels(), &[10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_garbage_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.fits");
        std::fs::write(&path, b"definitely not a FITS header").unwrap();

        let err = load_frame(&path).unwrap_err();
        assert!(matches!(err, Error::UnreadableFrame { .. }));
        assert!(err.to_string().contains("broken.fits"));
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let err = probe_frame(&dir.path().join("absent.fits")).unwrap_err();
        assert!(matches!(err, Error::UnreadableFrame { .. }));
    }
}
