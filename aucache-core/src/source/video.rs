// Copyright (c) 2025, Tom Ouellette
// Licensed under the MIT License

use std::collections::VecDeque;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use image::RgbImage;

use crate::constant;
use crate::error::AuError;
use crate::ut;

/// A sequential decoder of RGB frames
///
/// `Ok(None)` marks the end of the stream and is the only way a stream
/// terminates normally; an `Err` means the video is corrupt or unreadable.
pub trait VideoSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, AuError>;
}

impl<V: VideoSource + ?Sized> VideoSource for Box<V> {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, AuError> {
        (**self).next_frame()
    }
}

/// Frames already decoded into memory
#[derive(Debug, Clone, Default)]
pub struct MemoryVideo {
    frames: VecDeque<RgbImage>,
}

impl MemoryVideo {
    pub fn new(frames: Vec<RgbImage>) -> Self {
        Self {
            frames: frames.into(),
        }
    }
}

impl VideoSource for MemoryVideo {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, AuError> {
        Ok(self.frames.pop_front())
    }
}

/// A video stored as a directory of frame images in file name order
///
/// # Examples
///
/// ```no_run
/// use aucache_core::source::{FrameDirVideo, VideoSource};
///
/// let mut video = FrameDirVideo::open("frames/SN001").unwrap();
/// while let Some(frame) = video.next_frame().unwrap() {
///     println!("{}x{}", frame.width(), frame.height());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FrameDirVideo {
    frames: VecDeque<PathBuf>,
}

impl FrameDirVideo {
    /// Open a frame directory
    ///
    /// # Arguments
    ///
    /// * `directory` - Directory of frame images with sortable names
    pub fn open<P: AsRef<Path>>(directory: P) -> Result<Self, AuError> {
        let directory = directory.as_ref();

        if !directory.is_dir() {
            return Err(AuError::NoFileError(directory.display().to_string()));
        }

        let frames =
            ut::path::collect_sorted_files(directory, constant::SUPPORTED_FRAME_FORMATS.as_slice())?;

        Ok(Self {
            frames: frames.into(),
        })
    }
}

impl VideoSource for FrameDirVideo {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, AuError> {
        let Some(path) = self.frames.pop_front() else {
            return Ok(None);
        };

        image::open(&path)
            .map(|image| Some(image.to_rgb8()))
            .map_err(|err| AuError::VideoReadError(format!("{}: {}", path.display(), err)))
    }
}

/// A video decoded by an `ffmpeg` subprocess into raw RGB24 frames
///
/// Frame dimensions are probed with `ffprobe` before decoding starts. Both
/// binaries must be available on `PATH`.
///
/// # Examples
///
/// ```no_run
/// use aucache_core::source::{FfmpegVideo, VideoSource};
///
/// let mut video = FfmpegVideo::open("RightVideoSN001_comp.avi").unwrap();
/// let first = video.next_frame().unwrap();
/// ```
#[derive(Debug)]
pub struct FfmpegVideo {
    path: PathBuf,
    child: Child,
    stdout: BufReader<ChildStdout>,
    width: u32,
    height: u32,
    finished: bool,
}

impl FfmpegVideo {
    /// Start decoding a video file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to a video in any container ffmpeg can read
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AuError> {
        let path = path.as_ref().to_path_buf();

        if !path.is_file() {
            return Err(AuError::NoFileError(path.display().to_string()));
        }

        let (width, height) = probe_dimensions(&path)?;

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(&path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|err| AuError::VideoOpenError(format!("Could not start ffmpeg: {}", err)))?;

        let stdout = child.stdout.take().ok_or_else(|| {
            AuError::VideoOpenError("ffmpeg did not expose an output pipe".to_string())
        })?;

        Ok(Self {
            path,
            child,
            stdout: BufReader::new(stdout),
            width,
            height,
            finished: false,
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn finish(&mut self) -> Result<(), AuError> {
        self.finished = true;

        let status = self
            .child
            .wait()
            .map_err(|err| AuError::VideoReadError(format!("{}: {}", self.path.display(), err)))?;

        if !status.success() {
            return Err(AuError::VideoReadError(format!(
                "{}: ffmpeg exited with {}",
                self.path.display(),
                status
            )));
        }

        Ok(())
    }
}

impl VideoSource for FfmpegVideo {
    fn next_frame(&mut self) -> Result<Option<RgbImage>, AuError> {
        if self.finished {
            return Ok(None);
        }

        let frame_len = self.width as usize * self.height as usize * 3;
        let mut buffer = vec![0u8; frame_len];
        let mut filled = 0;

        while filled < frame_len {
            match self.stdout.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    let _ = self.child.kill();
                    let _ = self.finish();
                    return Err(AuError::VideoReadError(format!(
                        "{}: {}",
                        self.path.display(),
                        err
                    )));
                }
            }
        }

        if filled == 0 {
            self.finish()?;
            return Ok(None);
        }

        if filled < frame_len {
            let _ = self.child.kill();
            let _ = self.finish();
            return Err(AuError::VideoReadError(format!(
                "{}: truncated frame ({} of {} bytes)",
                self.path.display(),
                filled,
                frame_len
            )));
        }

        RgbImage::from_raw(self.width, self.height, buffer)
            .map(Some)
            .ok_or_else(|| AuError::VideoReadError(self.path.display().to_string()))
    }
}

impl Drop for FfmpegVideo {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Width and height of the first video stream
fn probe_dimensions(path: &Path) -> Result<(u32, u32), AuError> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=p=0:s=x",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|err| AuError::VideoOpenError(format!("Could not start ffprobe: {}", err)))?;

    if !output.status.success() {
        return Err(AuError::VideoOpenError(format!(
            "{}: ffprobe exited with {}",
            path.display(),
            output.status
        )));
    }

    parse_dimensions(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        AuError::VideoOpenError(format!("{}: no video stream detected", path.display()))
    })
}

fn parse_dimensions(probe: &str) -> Option<(u32, u32)> {
    let line = probe.lines().map(str::trim).find(|line| !line.is_empty())?;
    let (width, height) = line.split_once('x')?;
    let width: u32 = width.trim().parse().ok()?;
    let height: u32 = height.trim().trim_end_matches('x').parse().ok()?;

    (width > 0 && height > 0).then_some((width, height))
}
