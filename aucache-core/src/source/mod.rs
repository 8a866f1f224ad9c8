// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

mod landmarks;
mod video;

pub use landmarks::LandmarkDetector;
pub use landmarks::LandmarkStream;
pub use landmarks::Landmarks;

pub use video::FfmpegVideo;
pub use video::FrameDirVideo;
pub use video::MemoryVideo;
pub use video::VideoSource;
