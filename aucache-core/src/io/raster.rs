// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::io::Cursor;
use std::path::Path;

use image::{ImageFormat, RgbImage};

use crate::error::AuError;
use crate::ut;

/// Encode an RGB image by extension and write it atomically
///
/// # Arguments
///
/// * `path` - Output path with an image extension (e.g. .jpg, .png)
/// * `image` - RGB image to write
pub fn write_image<P: AsRef<Path>>(path: P, image: &RgbImage) -> Result<(), AuError> {
    let path = path.as_ref();

    let format = ImageFormat::from_path(path)
        .map_err(|err| AuError::ImageWriteError(format!("{}: {}", path.display(), err)))?;

    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, format)
        .map_err(|err| AuError::ImageWriteError(format!("{}: {}", path.display(), err)))?;

    ut::path::write_atomic(path, buffer.get_ref())
        .map_err(|err| AuError::ImageWriteError(format!("{}: {}", path.display(), err)))
}

/// Read any supported image as RGB
pub fn read_image<P: AsRef<Path>>(path: P) -> Result<RgbImage, AuError> {
    let path = path.as_ref();

    image::open(path)
        .map(|image| image.to_rgb8())
        .map_err(|err| AuError::ImageReadError(format!("{}: {}", path.display(), err)))
}

/// Write an empty marker file
pub fn write_marker<P: AsRef<Path>>(path: P) -> Result<(), AuError> {
    let path = path.as_ref();

    ut::path::write_atomic(path, &[])
        .map_err(|err| AuError::MeshWriteError(format!("{}: {}", path.display(), err)))
}

#[cfg(test)]
mod test {

    use super::*;
    use image::Rgb;

    #[test]
    fn test_png_roundtrip_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let image = RgbImage::from_fn(3, 2, |x, y| Rgb([x as u8, y as u8, 7]));

        write_image(&path, &image).unwrap();
        assert_eq!(read_image(&path).unwrap(), image);
    }

    #[test]
    fn test_jpeg_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.jpg");

        write_image(&path, &RgbImage::from_pixel(8, 8, Rgb([120, 60, 30]))).unwrap();
        assert_eq!(read_image(&path).unwrap().dimensions(), (8, 8));
    }

    #[test]
    fn test_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let result = write_image(dir.path().join("frame.unknown"), &RgbImage::new(2, 2));
        assert!(matches!(result, Err(AuError::ImageWriteError(_))));
    }

    #[test]
    fn test_read_missing_image() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            read_image(dir.path().join("missing.jpg")),
            Err(AuError::ImageReadError(_))
        ));
    }
}
