// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use fast_image_resize::{FilterType, PixelType, images::Image};
use image::{DynamicImage, RgbImage};

use crate::cv::FaceBox;
use crate::error::AuError;

/// Resize a 2D u8 image using the SIMD-accelerated fast-image-resize crate
///
/// # Arguments
///
/// * `source` - A DynamicImage with u8 subpixel type
/// * `new_width` - New width following resizing
/// * `new_height` - New height following resizing
/// * `pixel_type` - RGB or Luma pixel type
pub fn resize_bilinear_fast(
    source: &DynamicImage,
    new_width: u32,
    new_height: u32,
    pixel_type: PixelType,
) -> Result<Vec<u8>, AuError> {
    let mut destination = Image::new(new_width, new_height, pixel_type);

    let mut resizer = fast_image_resize::Resizer::new();
    let option = fast_image_resize::ResizeOptions {
        algorithm: fast_image_resize::ResizeAlg::Convolution(FilterType::Bilinear),
        cropping: fast_image_resize::SrcCropping::None,
        mul_div_alpha: false,
    };

    resizer
        .resize(source, &mut destination, &option)
        .map_err(|err| AuError::ImageWriteError(format!("Failed to resize image: {}", err)))?;

    Ok(destination.into_vec())
}

/// Stretch pixel values so the brightest subpixel becomes 255
///
/// An all-black buffer is left untouched.
pub fn normalize_range(buffer: &mut [u8]) {
    let max = buffer.iter().copied().max().unwrap_or(0);
    if max == 0 || max == u8::MAX {
        return;
    }

    for value in buffer.iter_mut() {
        *value = (*value as u32 * u8::MAX as u32 / max as u32) as u8;
    }
}

/// Crop a face region, resize it to a square and normalize its range
///
/// # Arguments
///
/// * `frame` - Full RGB frame
/// * `face_box` - Face region clipped to the frame
/// * `size` - Side length of the square output
pub fn crop_face(frame: &RgbImage, face_box: &FaceBox, size: u32) -> Result<RgbImage, AuError> {
    if size == 0 {
        return Err(AuError::ConfigError("Crop size must be positive".to_string()));
    }

    let [x, y, w, h] = face_box.as_xywh();
    if x + w > frame.width() || y + h > frame.height() {
        return Err(AuError::CropError);
    }

    let crop = image::imageops::crop_imm(frame, x, y, w, h).to_image();

    let mut buffer = resize_bilinear_fast(
        &DynamicImage::ImageRgb8(crop),
        size,
        size,
        PixelType::U8x3,
    )?;

    normalize_range(&mut buffer);

    RgbImage::from_raw(size, size, buffer)
        .ok_or_else(|| AuError::ImageWriteError("Resized buffer has the wrong size".to_string()))
}
