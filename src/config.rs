//! Playground configuration
//!
//! A JSON file describing the source video, the tracker, the texture and
//! filter lists, output and logging. Every field has a default, so `{}` is a
//! valid (if empty) configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::params::ParamValue;
use crate::pipeline::{FilterStack, StackError, StackOptions, VolumeTrack};
use crate::telemetry::LogConfig;
use crate::tracking::{Smoothing, TrackerKind, TrackerOptions, DEFAULT_MIN_HAND_SCORE, DEFAULT_MIN_VISIBILITY};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Failed to build stack: {0}")]
    Stack(#[from] StackError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Directory of PNG/JPEG frames, played in file name order
    #[serde(default)]
    pub frames_dir: PathBuf,

    #[serde(default = "default_video_fps")]
    pub fps: f64,

    #[serde(default = "default_true")]
    pub looping: bool,

    /// Name recorded tracks are stored under
    #[serde(default)]
    pub source_name: Option<String>,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            frames_dir: PathBuf::new(),
            fps: default_video_fps(),
            looping: true,
            source_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_tracker_kind")]
    pub kind: TrackerKind,

    /// Recorded dataset: `.json` flat array or timed CSV
    #[serde(default)]
    pub recorded: Option<PathBuf>,

    #[serde(default = "default_sample_rate")]
    pub sample_rate_hz: f64,

    #[serde(default)]
    pub offset_seconds: f64,

    #[serde(default)]
    pub smoothing: Smoothing,

    #[serde(default = "default_min_visibility")]
    pub min_visibility: f32,

    #[serde(default = "default_min_hand_score")]
    pub min_hand_score: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            kind: default_tracker_kind(),
            recorded: None,
            sample_rate_hz: default_sample_rate(),
            offset_seconds: 0.0,
            smoothing: Smoothing::None,
            min_visibility: default_min_visibility(),
            min_hand_score: default_min_hand_score(),
        }
    }
}

impl TrackerConfig {
    pub fn options(&self) -> TrackerOptions {
        TrackerOptions {
            sample_rate_hz: self.sample_rate_hz,
            smoothing: self.smoothing,
            min_hand_score: self.min_hand_score,
            min_visibility: self.min_visibility,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextureConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
    #[serde(default)]
    pub bypassed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub dir: PathBuf,
    #[serde(default = "default_every_n")]
    pub every_n: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaygroundConfig {
    #[serde(default)]
    pub video: VideoConfig,

    #[serde(default)]
    pub tracker: TrackerConfig,

    #[serde(default)]
    pub textures: Vec<TextureConfig>,

    #[serde(default)]
    pub filters: Vec<FilterConfig>,

    /// PNG frame output; frames are discarded when absent
    #[serde(default)]
    pub output: Option<OutputConfig>,

    #[serde(default = "default_target_fps")]
    pub target_fps: f64,

    #[serde(default)]
    pub max_frames: Option<u64>,

    #[serde(default)]
    pub skip_unused_textures: bool,

    #[serde(default = "default_stats_interval")]
    pub stats_interval: u64,

    /// Recorded loudness published as `volume`
    #[serde(default)]
    pub volume: Option<VolumeConfig>,

    #[serde(default)]
    pub logging: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeConfig {
    /// JSON array of byte FFT frames
    pub recorded: PathBuf,

    #[serde(default = "default_volume_rate")]
    pub sample_rate_hz: f64,

    #[serde(default = "default_true")]
    pub looping: bool,
}

impl VolumeConfig {
    pub fn load_track(&self) -> Result<VolumeTrack, ConfigError> {
        let text = std::fs::read_to_string(&self.recorded).map_err(|source| ConfigError::Io {
            path: self.recorded.display().to_string(),
            source,
        })?;
        let frames: Vec<Vec<u8>> = serde_json::from_str(&text)?;
        Ok(VolumeTrack::from_bins(&frames, self.sample_rate_hz, self.looping))
    }
}

fn default_true() -> bool {
    true
}

fn default_video_fps() -> f64 {
    30.0
}

fn default_tracker_kind() -> TrackerKind {
    TrackerKind::Hands
}

fn default_sample_rate() -> f64 {
    10.0
}

fn default_min_visibility() -> f32 {
    DEFAULT_MIN_VISIBILITY
}

fn default_min_hand_score() -> f32 {
    DEFAULT_MIN_HAND_SCORE
}

fn default_volume_rate() -> f64 {
    30.0
}

fn default_every_n() -> u64 {
    1
}

fn default_target_fps() -> f64 {
    60.0
}

fn default_stats_interval() -> u64 {
    120
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            video: VideoConfig::default(),
            tracker: TrackerConfig::default(),
            textures: Vec::new(),
            filters: Vec::new(),
            output: None,
            target_fps: default_target_fps(),
            max_frames: None,
            skip_unused_textures: false,
            stats_interval: default_stats_interval(),
            volume: None,
            logging: LogConfig::default(),
        }
    }
}

impl PlaygroundConfig {
    /// Read, parse and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |value: f64, what: &str| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!("{what} must be positive, got {value}")))
            }
        };
        positive(self.video.fps, "video.fps")?;
        positive(self.tracker.sample_rate_hz, "tracker.sample_rate_hz")?;
        positive(self.target_fps, "target_fps")?;
        if let Some(volume) = &self.volume {
            positive(volume.sample_rate_hz, "volume.sample_rate_hz")?;
        }

        if let Some(output) = &self.output {
            if output.every_n == 0 {
                return Err(ConfigError::Invalid("output.every_n must be at least 1".into()));
            }
        }
        for (i, texture) in self.textures.iter().enumerate() {
            if texture.name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("textures[{i}] has an empty name")));
            }
        }
        Ok(())
    }

    pub fn stack_options(&self) -> StackOptions {
        StackOptions {
            skip_unused_textures: self.skip_unused_textures,
            stats_interval: self.stats_interval,
        }
    }

    /// Add the configured textures, then the configured filters, to `stack`
    pub fn populate(&self, stack: &mut FilterStack) -> Result<(), ConfigError> {
        for texture in &self.textures {
            stack.add_texture_generator(&texture.name, &texture.type_name)?;
            for (param, value) in &texture.params {
                stack.set_texture_param(&texture.name, param, value.clone())?;
            }
        }
        for filter in &self.filters {
            let id = stack.add_filter(&filter.type_name)?;
            for (param, value) in &filter.params {
                stack.set_filter_param(id, param, value.clone())?;
            }
            if filter.bypassed {
                stack.set_bypass(id, true)?;
            }
        }
        tracing::info!(
            textures = self.textures.len(),
            filters = self.filters.len(),
            "Stack populated from config"
        );
        Ok(())
    }
}
