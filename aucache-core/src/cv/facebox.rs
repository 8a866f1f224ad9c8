// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use crate::error::AuError;
use crate::source::Landmarks;

/// A pixel-space face region in xyxy format
///
/// The box is half-open: columns `min_x..max_x` and rows `min_y..max_y`
/// are inside the face region. A face box always has a positive area.
///
/// # Examples
///
/// ```
/// use aucache_core::cv::FaceBox;
///
/// assert!(FaceBox::new(10, 20, 30, 60).is_ok());
/// assert!(FaceBox::new(10, 20, 10, 60).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBox {
    min_x: u32,
    min_y: u32,
    max_x: u32,
    max_y: u32,
}

impl FaceBox {
    /// Initialize a new face box
    ///
    /// # Arguments
    ///
    /// * `min_x` - Left column (inclusive)
    /// * `min_y` - Top row (inclusive)
    /// * `max_x` - Right column (exclusive)
    /// * `max_y` - Bottom row (exclusive)
    pub fn new(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Result<Self, AuError> {
        if max_x <= min_x || max_y <= min_y {
            return Err(AuError::CropError);
        }

        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    /// Face box around normalized landmarks with a relative margin
    ///
    /// The landmark extent along each axis is grown by `margin` times the
    /// extent on both sides, scaled by the image dimension of that axis,
    /// truncated to whole pixels and clipped to the image. Returns `None`
    /// when nothing of the face remains inside the image.
    ///
    /// # Arguments
    ///
    /// * `landmarks` - Landmarks with x and y normalized to [0, 1]
    /// * `width` - Image width in pixels
    /// * `height` - Image height in pixels
    /// * `margin` - Fraction of the extent added on each side
    ///
    /// # Examples
    ///
    /// ```
    /// use aucache_core::cv::FaceBox;
    /// use aucache_core::source::Landmarks;
    ///
    /// let landmarks = Landmarks::new(vec![[0.25, 0.25, 0.0], [0.75, 0.75, 0.0]]).unwrap();
    /// let face_box = FaceBox::from_landmarks(&landmarks, 128, 128, 0.5).unwrap();
    /// assert_eq!(face_box.as_xyxy(), [0, 0, 128, 128]);
    /// ```
    pub fn from_landmarks(
        landmarks: &Landmarks,
        width: u32,
        height: u32,
        margin: f64,
    ) -> Option<Self> {
        let ([min_x, min_y], [max_x, max_y]) = landmarks.extents();

        let extent_x = max_x - min_x;
        let extent_y = max_y - min_y;

        let scale = |value: f64, dimension: u32| -> u32 {
            ((value * dimension as f64) as i64).clamp(0, dimension as i64) as u32
        };

        Self::new(
            scale(min_x - margin * extent_x, width),
            scale(min_y - margin * extent_y, height),
            scale(max_x + margin * extent_x, width),
            scale(max_y + margin * extent_y, height),
        )
        .ok()
    }
}

// >>> PROPERTY METHODS

impl FaceBox {
    pub fn min_x(&self) -> u32 {
        self.min_x
    }

    pub fn min_y(&self) -> u32 {
        self.min_y
    }

    pub fn width(&self) -> u32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y
    }

    pub fn as_xyxy(&self) -> [u32; 4] {
        [self.min_x, self.min_y, self.max_x, self.max_y]
    }

    pub fn as_xywh(&self) -> [u32; 4] {
        [self.min_x, self.min_y, self.width(), self.height()]
    }
}

// <<< PROPERTY METHODS
