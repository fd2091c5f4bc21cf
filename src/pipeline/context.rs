//! Pipeline context
//!
//! `ExternalData` is the per-pipeline name → value store that textures and
//! filters read each tick. Only the stack writes it, once per tick, from the
//! clock and the registered live feeds. Instances get it by shared reference.

use std::collections::HashMap;
use std::sync::Arc;

use crate::tracking::{Marker, MarkerSet, SharedMarkers};

use super::clock::Clock;

/// Well-known external data keys
pub mod keys {
    /// Seconds since the pipeline was created
    pub const TIME: &str = "Time";
    /// Current markers (sentinel array)
    pub const POSE_DATA: &str = "poseData";
    /// Markers of the previous tick (sentinel array)
    pub const LAST_POSE_DATA: &str = "lastPoseData";
    /// Microphone level in `[0, 1]`
    pub const VOLUME: &str = "volume";
}

/// One external data entry
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalValue {
    Number(f32),
    /// Boundary-form markers, `(-1, -1, -1)` for missing
    Markers(Arc<[Marker]>),
}

/// Name → value store read by instances
#[derive(Debug, Clone, Default)]
pub struct ExternalData {
    values: HashMap<String, ExternalValue>,
}

impl ExternalData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: ExternalValue) {
        self.values.insert(key.to_string(), value);
    }

    pub fn set_number(&mut self, key: &str, value: f32) {
        self.set(key, ExternalValue::Number(value));
    }

    pub fn set_markers(&mut self, key: &str, markers: &MarkerSet) {
        self.set(key, ExternalValue::Markers(markers.to_sentinel_array().into()));
    }

    pub fn get(&self, key: &str) -> Option<&ExternalValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn number(&self, key: &str) -> Option<f32> {
        match self.values.get(key) {
            Some(ExternalValue::Number(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn markers(&self, key: &str) -> Option<&[Marker]> {
        match self.values.get(key) {
            Some(ExternalValue::Markers(m)) => Some(&m[..]),
            _ => None,
        }
    }

    /// Pairs of (previous, current) markers where both are valid
    pub fn marker_segments(&self) -> Vec<(Marker, Marker)> {
        let (Some(last), Some(current)) = (self.markers(keys::LAST_POSE_DATA), self.markers(keys::POSE_DATA))
        else {
            return Vec::new();
        };
        last.iter()
            .zip(current)
            .filter(|(a, b)| a.is_valid() && b.is_valid())
            .map(|(a, b)| (*a, *b))
            .collect()
    }

    /// Currently valid markers
    pub fn valid_markers(&self) -> Vec<(usize, Marker)> {
        self.markers(keys::POSE_DATA)
            .map(|m| {
                m.iter()
                    .enumerate()
                    .filter(|(_, m)| m.is_valid())
                    .map(|(i, m)| (i, *m))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A source of external data refreshed once per tick
pub trait LiveFeed: Send {
    fn update(&mut self, data: &mut ExternalData);
}

/// Publishes `poseData` and `lastPoseData` from a tracker's shared markers
pub struct MarkerFeed {
    markers: SharedMarkers,
    previous: Option<MarkerSet>,
}

impl MarkerFeed {
    pub fn new(markers: SharedMarkers) -> Self {
        Self {
            markers,
            previous: None,
        }
    }
}

impl LiveFeed for MarkerFeed {
    fn update(&mut self, data: &mut ExternalData) {
        let current = self.markers.snapshot();
        let previous = self.previous.replace(current.clone()).unwrap_or_else(|| current.clone());
        data.set_markers(keys::LAST_POSE_DATA, &previous);
        data.set_markers(keys::POSE_DATA, &current);
    }
}

/// Publishes one number from a closure
pub struct FnFeed<F> {
    key: String,
    f: F,
}

impl<F: FnMut() -> f32 + Send> FnFeed<F> {
    pub fn new(key: &str, f: F) -> Self {
        Self {
            key: key.to_string(),
            f,
        }
    }
}

impl<F: FnMut() -> f32 + Send> LiveFeed for FnFeed<F> {
    fn update(&mut self, data: &mut ExternalData) {
        let value = (self.f)();
        data.set_number(&self.key, value);
    }
}

/// Loudness from byte FFT magnitudes: mean bin value / 127, capped at 1
pub fn volume_level(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u64 = bins.iter().map(|b| *b as u64).sum();
    let mean = sum as f32 / bins.len() as f32;
    (mean / 127.0).min(1.0)
}

/// Recorded loudness, one level per FFT frame at a fixed rate
///
/// As a feed it publishes `volume` for the elapsed pipeline `time`.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeTrack {
    levels: Vec<f32>,
    sample_rate_hz: f64,
    looping: bool,
}

impl VolumeTrack {
    /// Levels from byte FFT frames via `volume_level`
    pub fn from_bins(frames: &[Vec<u8>], sample_rate_hz: f64, looping: bool) -> Self {
        Self {
            levels: frames.iter().map(|bins| volume_level(bins)).collect(),
            sample_rate_hz,
            looping,
        }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Level at `time` seconds; silent before the start, and past the end
    /// unless looping
    pub fn level_at(&self, time: f64) -> f32 {
        if self.levels.is_empty() || !(time >= 0.0) {
            return 0.0;
        }
        let index = (time * self.sample_rate_hz).floor() as usize;
        let index = if self.looping { index % self.levels.len() } else { index };
        self.levels.get(index).copied().unwrap_or(0.0)
    }
}

impl LiveFeed for VolumeTrack {
    fn update(&mut self, data: &mut ExternalData) {
        let time = data.number(keys::TIME).unwrap_or(0.0);
        data.set_number(keys::VOLUME, self.level_at(time as f64));
    }
}

/// External data plus the clock and feeds that refresh it
pub struct PipelineContext {
    data: ExternalData,
    clock: Arc<dyn Clock>,
    start: f64,
    feeds: Vec<Box<dyn LiveFeed>>,
}

impl PipelineContext {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let start = clock.now();
        let mut data = ExternalData::new();
        data.set_number(keys::TIME, 0.0);
        Self {
            data,
            clock,
            start,
            feeds: Vec::new(),
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn add_feed(&mut self, feed: impl LiveFeed + 'static) {
        self.feeds.push(Box::new(feed));
    }

    /// Set a value directly (host-provided data outside any feed)
    pub fn register(&mut self, key: &str, value: ExternalValue) {
        self.data.set(key, value);
    }

    pub fn data(&self) -> &ExternalData {
        &self.data
    }

    /// Seconds since the context was created
    pub fn elapsed(&self) -> f64 {
        self.clock.now() - self.start
    }

    /// Refresh time and every live feed
    pub fn refresh(&mut self) {
        let elapsed = self.elapsed() as f32;
        self.data.set_number(keys::TIME, elapsed);
        for feed in &mut self.feeds {
            feed.update(&mut self.data);
        }
    }
}
