//! Presentation targets for finished frames

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::frame::Frame;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OutputError {
    #[error("Failed to create output directory {path}: {message}")]
    CreateDir { path: String, message: String },

    #[error("Failed to write {path}: {message}")]
    Write { path: String, message: String },
}

/// Receives the final frame of every rendered tick
pub trait OutputSurface: Send {
    /// `index` counts rendered ticks from zero
    fn present(&mut self, frame: &Frame, index: u64) -> Result<(), OutputError>;
}

/// Discards frames
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutput;

impl OutputSurface for NullOutput {
    fn present(&mut self, _frame: &Frame, _index: u64) -> Result<(), OutputError> {
        Ok(())
    }
}

/// Writes every `every_n`-th frame as `frame_000123.png`
#[derive(Debug)]
pub struct PngSequenceOutput {
    dir: PathBuf,
    every_n: u64,
    written: u64,
}

impl PngSequenceOutput {
    pub fn new(dir: &Path, every_n: u64) -> Result<Self, OutputError> {
        std::fs::create_dir_all(dir).map_err(|e| OutputError::CreateDir {
            path: dir.display().to_string(),
            message: e.to_string(),
        })?;
        tracing::info!(dir = %dir.display(), every_n, "Writing PNG frames");
        Ok(Self {
            dir: dir.to_path_buf(),
            every_n: every_n.max(1),
            written: 0,
        })
    }

    /// Frames written so far
    pub fn written(&self) -> u64 {
        self.written
    }

    fn path_for(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame_{index:06}.png"))
    }
}

impl OutputSurface for PngSequenceOutput {
    fn present(&mut self, frame: &Frame, index: u64) -> Result<(), OutputError> {
        if index % self.every_n != 0 || frame.is_empty() {
            return Ok(());
        }
        let path = self.path_for(index);
        frame.to_rgba8().save(&path).map_err(|e| OutputError::Write {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        self.written += 1;
        Ok(())
    }
}
