// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::path::{Path, PathBuf};

use image::RgbImage;

use aucache_core::error::AuError;
use aucache_core::pipeline::Backend;
use aucache_core::source::{FfmpegVideo, FrameDirVideo, LandmarkStream, VideoSource};

/// A video file decoded with ffmpeg or a directory of frame images
pub enum AnyVideo {
    Ffmpeg(FfmpegVideo),
    Frames(FrameDirVideo),
}

impl VideoSource for AnyVideo {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, AuError> {
        match self {
            AnyVideo::Ffmpeg(video) => video.next_frame(),
            AnyVideo::Frames(video) => video.next_frame(),
        }
    }
}

/// Backend replaying precomputed `<subject>.jsonl` landmark files
pub struct CliBackend {
    landmarks: PathBuf,
}

impl CliBackend {
    pub fn new<P: AsRef<Path>>(landmarks: P) -> Self {
        Self {
            landmarks: landmarks.as_ref().to_path_buf(),
        }
    }
}

impl Backend for CliBackend {
    type Video = AnyVideo;
    type Detector = LandmarkStream;

    fn open_video(&self, _subject: &str, path: &Path) -> Result<AnyVideo, AuError> {
        if path.is_dir() {
            FrameDirVideo::open(path).map(AnyVideo::Frames)
        } else {
            FfmpegVideo::open(path).map(AnyVideo::Ffmpeg)
        }
    }

    fn detector(&self, subject: &str) -> Result<LandmarkStream, AuError> {
        LandmarkStream::open(self.landmarks.join(format!("{}.jsonl", subject)))
    }
}
