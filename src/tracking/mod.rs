//! Motion tracking
//!
//! Normalizes hand and body pose estimators into one fixed-size marker array
//! per tracker kind:
//! - `Hands`: 42 markers, left hand `[0, 21)`, right hand `[21, 42)`
//! - `Body`: 33 markers in limb order (see `BODY_PERMUTATION`)
//!
//! Markers come either from live inference (one request in flight per tracker)
//! or from a recorded track indexed by the video's playback time.

mod body;
mod hands;
mod inference;
mod marker;
mod recorded;
mod smoothing;
mod tracker;

pub use body::{normalize_body, BodyLandmark, BODY_PERMUTATION, DEFAULT_MIN_VISIBILITY};
pub use hands::{normalize_hands, HandDetection, Handedness, DEFAULT_MIN_HAND_SCORE};
pub use inference::{
    Detections, InferenceOutcome, InferenceSubmitter, InlineInference, PoseBackend, ThreadedInference,
};
pub use marker::{Marker, MarkerSet, TrackerKind, HAND_MARKERS};
pub use recorded::{RecordedTrack, TrackRecorder, DEFAULT_GRANULARITY};
pub use smoothing::{MarkerSmoother, Smoothing};
pub use tracker::{MarkerCallback, MotionTracker, TrackerOptions, TrackerState, TrackerTick};

use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

/// Errors from tracking
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackingError {
    #[error("Recorded buffer of {len} values is not a whole number of {width}-value records")]
    BadRecordLength { len: usize, width: usize },

    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f64),

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("Expected {expected} data, got {actual}")]
    KindMismatch {
        expected: TrackerKind,
        actual: TrackerKind,
    },

    #[error("Inference backend error: {0}")]
    Backend(String),

    #[error("Failed to spawn inference thread: {0}")]
    WorkerSpawn(String),

    #[error("Inference thread is not running")]
    WorkerGone,

    #[error("An inference request is already pending")]
    Busy,
}

/// Latest published markers, shared between a tracker callback and readers
#[derive(Debug, Clone)]
pub struct SharedMarkers {
    inner: Arc<Mutex<MarkerSet>>,
}

impl SharedMarkers {
    pub fn new(kind: TrackerKind) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MarkerSet::empty(kind))),
        }
    }

    pub fn kind(&self) -> TrackerKind {
        self.inner.lock().kind()
    }

    pub fn store(&self, markers: &MarkerSet) {
        *self.inner.lock() = markers.clone();
    }

    pub fn snapshot(&self) -> MarkerSet {
        self.inner.lock().clone()
    }

    /// A tracker callback that stores every published set here
    pub fn publisher(&self) -> impl FnMut(&MarkerSet) + Send + 'static {
        let shared = self.clone();
        move |markers| shared.store(markers)
    }
}
