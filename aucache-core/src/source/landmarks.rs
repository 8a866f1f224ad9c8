// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::collections::VecDeque;
use std::path::Path;

use image::RgbImage;

use crate::error::AuError;

/// A set of 3D facial keypoints detected in one frame
///
/// The x and y coordinates are normalized to the frame width and height
/// respectively; z is a relative depth with the same scale as x.
///
/// # Examples
///
/// ```
/// use aucache_core::source::Landmarks;
///
/// let landmarks = Landmarks::new(vec![[0.2, 0.3, 0.0], [0.8, 0.7, -0.1]]).unwrap();
/// assert_eq!(landmarks.len(), 2);
/// assert_eq!(landmarks.extents(), ([0.2, 0.3], [0.8, 0.7]));
///
/// assert!(Landmarks::new(vec![]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Landmarks {
    points: Vec<[f64; 3]>,
}

impl Landmarks {
    /// Initialize landmarks from (x, y, z) triples
    ///
    /// # Arguments
    ///
    /// * `points` - At least one finite keypoint
    pub fn new(points: Vec<[f64; 3]>) -> Result<Self, AuError> {
        if points.is_empty() {
            return Err(AuError::LandmarksReadError(
                "A landmark set must contain at least one point".to_string(),
            ));
        }

        if points.iter().flatten().any(|v| !v.is_finite()) {
            return Err(AuError::LandmarksReadError(
                "Landmark coordinates must be finite".to_string(),
            ));
        }

        Ok(Self { points })
    }

    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    pub fn into_points(self) -> Vec<[f64; 3]> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Minimum and maximum of the x and y coordinates
    pub fn extents(&self) -> ([f64; 2], [f64; 2]) {
        self.points.iter().fold(
            ([f64::INFINITY; 2], [f64::NEG_INFINITY; 2]),
            |([min_x, min_y], [max_x, max_y]), [x, y, _]| {
                (
                    [min_x.min(*x), min_y.min(*y)],
                    [max_x.max(*x), max_y.max(*y)],
                )
            },
        )
    }

    /// Row-major (n, 3) buffer
    pub fn to_flat(&self) -> Vec<f64> {
        self.points.iter().flatten().copied().collect()
    }
}

/// A face landmark detector applied to consecutive frames of one stream
///
/// Detectors may track the face across calls, so each frame of a video
/// is passed exactly once and in decode order. Returns `None` when no
/// face is found.
pub trait LandmarkDetector {
    fn detect(&mut self, frame: &RgbImage) -> Option<Landmarks>;

    /// Advance past a frame persisted by an earlier run without detecting
    fn skip(&mut self) {}
}

impl<F> LandmarkDetector for F
where
    F: FnMut(&RgbImage) -> Option<Landmarks>,
{
    fn detect(&mut self, frame: &RgbImage) -> Option<Landmarks> {
        self(frame)
    }
}

/// Replays landmarks precomputed by an external detector
///
/// The source is a JSON-lines file with one line per frame: either `null`
/// (no face) or an array of `[x, y, z]` points. Frames past the end of the
/// file are reported as having no face.
///
/// # Examples
///
/// ```no_run
/// use aucache_core::source::LandmarkStream;
/// let stream = LandmarkStream::open("landmarks/SN001.jsonl").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct LandmarkStream {
    frames: VecDeque<Option<Landmarks>>,
}

impl LandmarkStream {
    /// Open and validate a landmark stream
    ///
    /// # Arguments
    ///
    /// * `path` - Path to a .jsonl landmark file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AuError> {
        let path = path.as_ref();

        let contents = std::fs::read_to_string(path).map_err(|err| {
            AuError::LandmarksReadError(format!("{}: {}", path.display(), err))
        })?;

        Self::parse(&contents)
            .map_err(|err| AuError::LandmarksReadError(format!("{}: {}", path.display(), err)))
    }

    /// Parse JSON-lines landmark contents
    ///
    /// Every line is one frame, so a blank line before the end of the
    /// contents is rejected instead of shifting later frames.
    pub fn parse(contents: &str) -> Result<Self, String> {
        let frames = contents
            .trim_end()
            .lines()
            .enumerate()
            .map(|(idx, line)| {
                if line.trim().is_empty() {
                    return Err(format!(
                        "line {}: blank line, use null for a frame without a face",
                        idx + 1
                    ));
                }

                let points: Option<Vec<[f64; 3]>> = serde_json::from_str(line)
                    .map_err(|err| format!("line {}: {}", idx + 1, err))?;

                points
                    .map(|points| {
                        Landmarks::new(points).map_err(|err| format!("line {}: {}", idx + 1, err))
                    })
                    .transpose()
            })
            .collect::<Result<VecDeque<_>, String>>()?;

        Ok(Self { frames })
    }

    /// Number of frames left to replay
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl LandmarkDetector for LandmarkStream {
    fn detect(&mut self, _frame: &RgbImage) -> Option<Landmarks> {
        self.frames.pop_front().flatten()
    }

    fn skip(&mut self) {
        self.frames.pop_front();
    }
}
