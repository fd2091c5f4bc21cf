//! Video sources
//!
//! The pipeline and the trackers only need four things from a video: its size,
//! its playback time, whether it is paused or ready, and a copy of the current
//! frame. Acquisition (decoding, webcams) sits behind `VideoSource`.
//!
//! `FrameSequence` is the built-in source: a list of frames played back at a
//! fixed rate against a `Clock`, loaded from memory or from an image directory.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::frame::Frame;
use crate::pipeline::Clock;

/// Errors from video sources
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VideoError {
    #[error("Video has no frames")]
    Empty,

    #[error("Video is not ready")]
    NotReady,

    #[error("Frame {index} is {actual:?}, expected {expected:?}")]
    MismatchedFrame {
        index: usize,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Target frame is {actual:?}, video is {expected:?}")]
    TargetSize {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Invalid frame rate: {0}")]
    InvalidFps(f64),

    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },
}

/// A playable video
pub trait VideoSource: Send {
    /// Current frame size; `(0, 0)` before metadata is known
    fn dimensions(&self) -> (u32, u32);

    /// Playback position in seconds
    fn current_time(&self) -> f64;

    fn is_paused(&self) -> bool;

    /// Whether a frame can be copied right now
    fn is_ready(&self) -> bool;

    /// Copy the current frame into `target`, which must match `dimensions()`
    fn copy_frame(&self, target: &mut Frame) -> Result<(), VideoError>;
}

/// A video shared by the trackers and the stack
pub type SharedVideo = Arc<Mutex<dyn VideoSource>>;

/// Frames played back at a fixed rate
pub struct FrameSequence {
    frames: Vec<Frame>,
    fps: f64,
    looping: bool,
    clock: Arc<dyn Clock>,
    /// Playback position when last paused or seeked
    position: f64,
    /// Clock time playback (re)started, if playing
    playing_since: Option<f64>,
}

impl FrameSequence {
    /// Build from in-memory frames; all frames must share one size
    pub fn from_frames(frames: Vec<Frame>, fps: f64, clock: Arc<dyn Clock>) -> Result<Self, VideoError> {
        if !(fps > 0.0) {
            return Err(VideoError::InvalidFps(fps));
        }
        let first = frames.first().ok_or(VideoError::Empty)?.dimensions();
        if first.0 == 0 || first.1 == 0 {
            return Err(VideoError::Empty);
        }
        if let Some((index, frame)) = frames.iter().enumerate().find(|(_, f)| f.dimensions() != first) {
            return Err(VideoError::MismatchedFrame {
                index,
                expected: first,
                actual: frame.dimensions(),
            });
        }

        Ok(Self {
            frames,
            fps,
            looping: true,
            clock,
            position: 0.0,
            playing_since: None,
        })
    }

    /// Load every PNG/JPEG in `dir`, sorted by file name
    pub fn load_dir(dir: &Path, fps: f64, clock: Arc<dyn Clock>) -> Result<Self, VideoError> {
        let io_err = |path: &Path, e: &dyn std::fmt::Display| VideoError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        let mut paths: Vec<_> = std::fs::read_dir(dir)
            .map_err(|e| io_err(dir, &e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
            })
            .collect();
        paths.sort();

        let mut frames = Vec::with_capacity(paths.len());
        for path in &paths {
            let image = image::open(path).map_err(|e| io_err(path, &e))?.to_rgba8();
            frames.push(Frame::from_rgba8(&image));
        }

        tracing::info!(dir = %dir.display(), frames = frames.len(), fps, "Loaded frame sequence");
        Self::from_frames(frames, fps, clock)
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Length in seconds
    pub fn duration(&self) -> f64 {
        self.frames.len() as f64 / self.fps
    }

    pub fn play(&mut self) {
        if self.playing_since.is_none() {
            self.playing_since = Some(self.clock.now());
        }
    }

    pub fn pause(&mut self) {
        self.position = self.current_time();
        self.playing_since = None;
    }

    pub fn seek(&mut self, seconds: f64) {
        self.position = seconds.max(0.0);
        if self.playing_since.is_some() {
            self.playing_since = Some(self.clock.now());
        }
    }

    /// Index of the frame shown at the current time
    pub fn frame_index(&self) -> usize {
        let index = (self.current_time() * self.fps).floor() as usize;
        index.min(self.frames.len().saturating_sub(1))
    }

    /// Replace the frames (e.g. a new clip at a different resolution)
    pub fn replace_frames(&mut self, frames: Vec<Frame>) -> Result<(), VideoError> {
        let replacement = Self::from_frames(frames, self.fps, self.clock.clone())?;
        self.frames = replacement.frames;
        self.position = 0.0;
        if self.playing_since.is_some() {
            self.playing_since = Some(self.clock.now());
        }
        Ok(())
    }
}

impl VideoSource for FrameSequence {
    fn dimensions(&self) -> (u32, u32) {
        self.frames.first().map(|f| f.dimensions()).unwrap_or((0, 0))
    }

    fn current_time(&self) -> f64 {
        let raw = match self.playing_since {
            Some(since) => self.position + (self.clock.now() - since),
            None => self.position,
        };
        let duration = self.duration();
        if duration <= 0.0 {
            return 0.0;
        }
        if self.looping {
            raw.rem_euclid(duration)
        } else {
            raw.min(duration)
        }
    }

    fn is_paused(&self) -> bool {
        self.playing_since.is_none()
    }

    fn is_ready(&self) -> bool {
        !self.frames.is_empty()
    }

    fn copy_frame(&self, target: &mut Frame) -> Result<(), VideoError> {
        let frame = self.frames.get(self.frame_index()).ok_or(VideoError::NotReady)?;
        if !target.copy_from(frame) {
            return Err(VideoError::TargetSize {
                expected: frame.dimensions(),
                actual: target.dimensions(),
            });
        }
        Ok(())
    }
}
