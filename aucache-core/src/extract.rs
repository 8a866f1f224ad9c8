// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use crate::constant;
use crate::cv::{FaceBox, crop_face};
use crate::error::AuError;
use crate::io;
use crate::source::{LandmarkDetector, VideoSource};
use crate::store::{ArtifactKind, ArtifactStore};

/// Face crop geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropConfig {
    /// Fraction of the landmark extent added on each side of the face box
    pub margin: f64,
    /// Side length of the square crops
    pub size: u32,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            margin: constant::CROP_MARGIN,
            size: constant::CROP_SIZE,
        }
    }
}

impl CropConfig {
    pub fn validate(&self) -> Result<(), AuError> {
        if !self.margin.is_finite() || self.margin < 0.0 {
            return Err(AuError::ConfigError(format!(
                "Crop margin must be a non-negative number, found {}",
                self.margin
            )));
        }

        if self.size == 0 {
            return Err(AuError::ConfigError("Crop size must be positive".to_string()));
        }

        Ok(())
    }
}

/// Frame counts of one extraction pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    /// Frames decoded from the video
    pub frames: usize,
    /// Frames newly written with a mesh and crop
    pub detected: usize,
    /// Frames newly written without a face
    pub missed: usize,
    /// Frames already persisted by an earlier run
    pub skipped: usize,
}

/// Decodes a subject's video into frame, mesh and crop artifacts
///
/// Frames are handled strictly in decode order because landmark detectors
/// may track the face between calls. Frames persisted by an earlier run
/// are skipped without detection (the detector is only advanced), which
/// makes an interrupted extraction resumable.
pub struct FrameExtractor<'a> {
    store: &'a ArtifactStore,
    crop: CropConfig,
}

impl<'a> FrameExtractor<'a> {
    pub fn new(store: &'a ArtifactStore, crop: CropConfig) -> Self {
        Self { store, crop }
    }

    /// Extract every frame of a video
    ///
    /// # Arguments
    ///
    /// * `subject` - Subject identifier whose artifact directories exist
    /// * `video` - Video source positioned at the first frame
    /// * `detector` - Fresh landmark detector for this video
    pub fn extract<V, D>(
        &self,
        subject: &str,
        video: &mut V,
        detector: &mut D,
    ) -> Result<ExtractionSummary, AuError>
    where
        V: VideoSource + ?Sized,
        D: LandmarkDetector + ?Sized,
    {
        let mut summary = ExtractionSummary::default();

        while let Some(frame) = video.next_frame()? {
            let index = summary.frames;
            summary.frames += 1;

            if self.store.frame_is_persisted(subject, index) {
                detector.skip();
                summary.skipped += 1;
                continue;
            }

            io::write_image(
                self.store.path_for(subject, ArtifactKind::Frame, index),
                &frame,
            )?;

            let face = detector.detect(&frame).and_then(|landmarks| {
                FaceBox::from_landmarks(&landmarks, frame.width(), frame.height(), self.crop.margin)
                    .map(|face_box| (landmarks, face_box))
            });

            match face {
                Some((landmarks, face_box)) => {
                    let crop = crop_face(&frame, &face_box, self.crop.size)?;
                    io::write_mesh(
                        self.store.path_for(subject, ArtifactKind::Mesh, index),
                        &landmarks,
                    )?;
                    io::write_image(self.store.path_for(subject, ArtifactKind::Crop, index), &crop)?;
                    summary.detected += 1;
                }
                None => {
                    io::write_marker(self.store.no_face_marker(subject, index))?;
                    summary.missed += 1;
                }
            }
        }

        if summary.frames == 0 {
            return Err(AuError::VideoReadError(format!(
                "No frames could be decoded for subject {}",
                subject
            )));
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod test {

    use super::*;
    use crate::source::{Landmarks, MemoryVideo};
    use image::{Rgb, RgbImage};

    fn frames(n: usize) -> Vec<RgbImage> {
        (0..n)
            .map(|i| RgbImage::from_pixel(64, 48, Rgb([10 * i as u8 + 5, 40, 80])))
            .collect()
    }

    fn face() -> Landmarks {
        Landmarks::new(vec![[0.3, 0.3, 0.0], [0.7, 0.7, 0.05]]).unwrap()
    }

    fn setup() -> (tempfile::TempDir, ArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path().join("cache")).unwrap();
        store.ensure_layout("SN001").unwrap();
        (dir, store)
    }

    #[test]
    fn test_extract_all_artifacts() {
        let (_dir, store) = setup();
        let extractor = FrameExtractor::new(&store, CropConfig { margin: 0.3, size: 32 });

        let mut calls = 0;
        let mut detector = |_: &RgbImage| -> Option<Landmarks> {
            calls += 1;
            (calls != 3).then(face)
        };

        let summary = extractor
            .extract("SN001", &mut MemoryVideo::new(frames(4)), &mut detector)
            .unwrap();

        assert_eq!(
            summary,
            ExtractionSummary {
                frames: 4,
                detected: 3,
                missed: 1,
                skipped: 0
            }
        );

        for index in 0..4 {
            assert!(store.path_for("SN001", ArtifactKind::Frame, index).exists());
        }

        for index in [0, 1, 3] {
            assert!(store.path_for("SN001", ArtifactKind::Mesh, index).exists());
            let crop = io::read_image(store.path_for("SN001", ArtifactKind::Crop, index)).unwrap();
            assert_eq!(crop.dimensions(), (32, 32));
            assert_eq!(
                io::read_mesh(store.path_for("SN001", ArtifactKind::Mesh, index)).unwrap(),
                face()
            );
        }

        assert!(!store.path_for("SN001", ArtifactKind::Mesh, 2).exists());
        assert!(!store.path_for("SN001", ArtifactKind::Crop, 2).exists());
        assert!(store.no_face_marker("SN001", 2).exists());
    }

    #[test]
    fn test_extract_resumes_without_detection() {
        let (_dir, store) = setup();
        let extractor = FrameExtractor::new(&store, CropConfig { margin: 0.3, size: 16 });

        // First pass is interrupted after two frames
        let mut detector = |_: &RgbImage| Some(face());
        extractor
            .extract("SN001", &mut MemoryVideo::new(frames(2)), &mut detector)
            .unwrap();

        let mut calls = 0;
        let mut detector = |_: &RgbImage| -> Option<Landmarks> {
            calls += 1;
            Some(face())
        };
        let summary = extractor
            .extract("SN001", &mut MemoryVideo::new(frames(5)), &mut detector)
            .unwrap();

        assert_eq!(summary.frames, 5);
        assert_eq!(summary.skipped, 2);
        assert_eq!(summary.detected, 3);
        assert_eq!(calls, 3);

        for index in 0..5 {
            assert!(store.frame_is_persisted("SN001", index));
        }
    }

    #[test]
    fn test_extract_reprocesses_partial_frame() {
        let (_dir, store) = setup();
        let extractor = FrameExtractor::new(&store, CropConfig { margin: 0.3, size: 16 });

        // A frame image without its mesh and crop is not complete
        io::write_image(
            store.path_for("SN001", ArtifactKind::Frame, 0),
            &RgbImage::new(64, 48),
        )
        .unwrap();

        let mut detector = |_: &RgbImage| Some(face());
        let summary = extractor
            .extract("SN001", &mut MemoryVideo::new(frames(1)), &mut detector)
            .unwrap();

        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.detected, 1);
        assert!(store.frame_is_persisted("SN001", 0));
    }

    #[test]
    fn test_extract_face_outside_frame() {
        let (_dir, store) = setup();
        let extractor = FrameExtractor::new(&store, CropConfig::default());

        let mut detector =
            |_: &RgbImage| Some(Landmarks::new(vec![[1.5, 1.5, 0.0], [1.8, 1.9, 0.0]]).unwrap());
        let summary = extractor
            .extract("SN001", &mut MemoryVideo::new(frames(1)), &mut detector)
            .unwrap();

        assert_eq!(summary.missed, 1);
        assert!(!store.path_for("SN001", ArtifactKind::Mesh, 0).exists());
        assert!(store.no_face_marker("SN001", 0).exists());
    }

    #[test]
    fn test_extract_empty_video() {
        let (_dir, store) = setup();
        let extractor = FrameExtractor::new(&store, CropConfig::default());

        let mut detector = |_: &RgbImage| Some(face());
        let result = extractor.extract("SN001", &mut MemoryVideo::default(), &mut detector);

        assert!(matches!(result, Err(AuError::VideoReadError(_))));
    }

    struct CorruptAfter(usize);

    impl VideoSource for CorruptAfter {
        fn next_frame(&mut self) -> Result<Option<RgbImage>, AuError> {
            if self.0 == 0 {
                return Err(AuError::VideoReadError("corrupt packet".to_string()));
            }
            self.0 -= 1;
            Ok(Some(RgbImage::new(64, 48)))
        }
    }

    #[test]
    fn test_extract_corrupt_video() {
        let (_dir, store) = setup();
        let extractor = FrameExtractor::new(&store, CropConfig::default());

        let mut detector = |_: &RgbImage| Some(face());
        let result = extractor.extract("SN001", &mut CorruptAfter(2), &mut detector);

        assert!(matches!(result, Err(AuError::VideoReadError(_))));
        assert!(store.frame_is_persisted("SN001", 1));
    }

    #[test]
    fn test_crop_config_validate() {
        assert!(CropConfig::default().validate().is_ok());
        assert!(CropConfig { margin: -0.1, size: 256 }.validate().is_err());
        assert!(CropConfig { margin: 0.3, size: 0 }.validate().is_err());
    }
}
