//! Motion tracker
//!
//! Drives one pose backend (or a recorded track) from a video and publishes a
//! fixed-size marker set through a callback. The host calls `tick` once per
//! scheduled frame; everything else is configuration.

use std::collections::HashMap;

use super::inference::{InferenceOutcome, InferenceSubmitter};
use super::marker::{MarkerSet, TrackerKind};
use super::recorded::RecordedTrack;
use super::smoothing::{MarkerSmoother, Smoothing};
use super::{TrackingError, DEFAULT_MIN_HAND_SCORE, DEFAULT_MIN_VISIBILITY};
use crate::frame::Frame;
use crate::video::SharedVideo;

/// Called with every newly published marker set
pub type MarkerCallback = Box<dyn FnMut(&MarkerSet) + Send>;

/// Tracker tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerOptions {
    /// Rate of recorded tracks stored through `store_data`
    pub sample_rate_hz: f64,
    pub smoothing: Smoothing,
    pub min_hand_score: f32,
    pub min_visibility: f32,
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            sample_rate_hz: 10.0,
            smoothing: Smoothing::None,
            min_hand_score: DEFAULT_MIN_HAND_SCORE,
            min_visibility: DEFAULT_MIN_VISIBILITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Running,
    /// Stop requested; waits for an in-flight inference to come back
    StopRequested,
}

/// What a tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerTick {
    /// Not tracking, no video, or video not ready
    Idle,
    /// Published a recorded sample
    Recorded { index: i64 },
    /// Handed a frame to the backend
    Submitted,
    /// Waiting on the in-flight inference or an unchanged timestamp
    Waiting,
    /// The stop request took effect
    Stopped,
}

pub struct MotionTracker {
    kind: TrackerKind,
    options: TrackerOptions,
    state: TrackerState,
    video: Option<SharedVideo>,
    source_name: Option<String>,
    recorded: HashMap<String, RecordedTrack>,
    offset_seconds: f64,
    inference: Option<Box<dyn InferenceSubmitter>>,
    in_flight: bool,
    last_submitted: Option<f64>,
    current: MarkerSet,
    last: MarkerSet,
    smoother: MarkerSmoother,
    callback: Option<MarkerCallback>,
    submissions: u64,
}

impl MotionTracker {
    pub fn new(kind: TrackerKind, options: TrackerOptions) -> Self {
        Self {
            kind,
            options,
            state: TrackerState::Idle,
            video: None,
            source_name: None,
            recorded: HashMap::new(),
            offset_seconds: 0.0,
            inference: None,
            in_flight: false,
            last_submitted: None,
            current: MarkerSet::empty(kind),
            last: MarkerSet::empty(kind),
            smoother: MarkerSmoother::new(kind, options.smoothing),
            callback: None,
            submissions: 0,
        }
    }

    /// Attach the live inference path
    pub fn with_inference(mut self, inference: Box<dyn InferenceSubmitter>) -> Self {
        self.inference = Some(inference);
        self
    }

    pub fn kind(&self) -> TrackerKind {
        self.kind
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Rebind to a video and optionally a recorded-data source name
    pub fn set_source_video(&mut self, video: SharedVideo, source_name: Option<&str>) {
        self.video = Some(video);
        self.source_name = source_name.map(str::to_string);
        self.last_submitted = None;
        self.smoother.reset();
        tracing::debug!(kind = %self.kind, source = ?self.source_name, "Tracker source bound");
    }

    pub fn set_callback(&mut self, callback: impl FnMut(&MarkerSet) + Send + 'static) {
        self.callback = Some(Box::new(callback));
    }

    /// Start (or keep) tracking; cancels a pending stop request
    pub fn start_tracking(&mut self) {
        if self.state != TrackerState::Running {
            tracing::info!(kind = %self.kind, "Tracking started");
        }
        self.state = TrackerState::Running;
    }

    /// Request a stop, honoured at the next tick once no inference is in flight
    pub fn stop_tracking(&mut self) {
        if self.state == TrackerState::Running {
            self.state = TrackerState::StopRequested;
        }
    }

    /// True until a stop request has taken effect
    pub fn is_tracking(&self) -> bool {
        self.state != TrackerState::Idle
    }

    /// Shift recorded playback by `seconds` (may be negative)
    pub fn set_store_offset(&mut self, seconds: f64) {
        self.offset_seconds = seconds;
    }

    pub fn store_offset(&self) -> f64 {
        self.offset_seconds
    }

    /// Store a flat recorded buffer at the configured sample rate
    pub fn store_data(&mut self, source_name: &str, samples: Vec<f32>) -> Result<(), TrackingError> {
        let track = RecordedTrack::from_flat(self.kind, self.options.sample_rate_hz, samples)?;
        self.store_track(source_name, track)
    }

    /// Store a prepared track
    pub fn store_track(&mut self, source_name: &str, track: RecordedTrack) -> Result<(), TrackingError> {
        if track.kind() != self.kind {
            return Err(TrackingError::KindMismatch {
                expected: self.kind,
                actual: track.kind(),
            });
        }
        tracing::info!(
            kind = %self.kind,
            source = source_name,
            samples = track.len(),
            "Stored recorded track"
        );
        self.recorded.insert(source_name.to_string(), track);
        Ok(())
    }

    pub fn current_markers(&self) -> &MarkerSet {
        &self.current
    }

    /// Markers published before the current ones
    pub fn last_markers(&self) -> &MarkerSet {
        &self.last
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Frames handed to the backend so far
    pub fn submissions(&self) -> u64 {
        self.submissions
    }

    /// One scheduled step
    pub fn tick(&mut self) -> TrackerTick {
        self.collect_inference();

        match self.state {
            TrackerState::Idle => return TrackerTick::Idle,
            TrackerState::StopRequested => {
                if self.in_flight {
                    return TrackerTick::Waiting;
                }
                self.state = TrackerState::Idle;
                tracing::info!(kind = %self.kind, "Tracking stopped");
                return TrackerTick::Stopped;
            }
            TrackerState::Running => {}
        }

        let Some(video) = self.video.clone() else {
            return TrackerTick::Idle;
        };
        let video = video.lock();
        if !video.is_ready() {
            return TrackerTick::Idle;
        }
        let time = video.current_time();

        let recorded = self
            .source_name
            .as_ref()
            .and_then(|name| self.recorded.get(name));
        if let Some(track) = recorded {
            let index = track.sample_index(time, self.offset_seconds);
            let raw = track.sample(index);
            drop(video);
            self.publish(&raw);
            return TrackerTick::Recorded { index };
        }

        if self.in_flight || self.inference.is_none() || self.last_submitted == Some(time) {
            return TrackerTick::Waiting;
        }

        let (width, height) = video.dimensions();
        let mut frame = Frame::new(width, height);
        if let Err(e) = video.copy_frame(&mut frame) {
            tracing::warn!(kind = %self.kind, error = %e, "Failed to copy frame for inference");
            return TrackerTick::Waiting;
        }
        drop(video);

        let Some(inference) = self.inference.as_mut() else {
            return TrackerTick::Waiting;
        };
        match inference.submit(frame, time) {
            Ok(()) => {
                self.in_flight = true;
                self.last_submitted = Some(time);
                self.submissions += 1;
                TrackerTick::Submitted
            }
            Err(e) => {
                tracing::warn!(kind = %self.kind, error = %e, "Inference submission rejected");
                TrackerTick::Waiting
            }
        }
    }

    fn collect_inference(&mut self) {
        if !self.in_flight {
            return;
        }
        let Some(outcome) = self.inference.as_mut().and_then(|i| i.try_take()) else {
            return;
        };
        self.in_flight = false;
        self.handle_outcome(outcome);
    }

    fn handle_outcome(&mut self, outcome: InferenceOutcome) {
        let normalized = outcome.result.and_then(|detections| {
            detections.normalize(self.kind, self.options.min_hand_score, self.options.min_visibility)
        });
        match normalized {
            Ok(raw) => self.publish(&raw),
            Err(e) => {
                // Keep publishing the last good markers
                tracing::warn!(
                    kind = %self.kind,
                    timestamp = outcome.timestamp,
                    error = %e,
                    "Inference failed, keeping last markers"
                );
            }
        }
    }

    fn publish(&mut self, raw: &MarkerSet) {
        let smoothed = self.smoother.apply(raw);
        self.last = std::mem::replace(&mut self.current, smoothed);
        if let Some(callback) = self.callback.as_mut() {
            callback(&self.current);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::{Detections, HandDetection, Handedness, Marker, PoseBackend, ThreadedInference};
    use crate::video::VideoError;
    use crate::video::VideoSource;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    struct TestVideo {
        time: f64,
        paused: bool,
        ready: bool,
    }

    impl VideoSource for TestVideo {
        fn dimensions(&self) -> (u32, u32) {
            (8, 6)
        }
        fn current_time(&self) -> f64 {
            self.time
        }
        fn is_paused(&self) -> bool {
            self.paused
        }
        fn is_ready(&self) -> bool {
            self.ready
        }
        fn copy_frame(&self, target: &mut Frame) -> Result<(), VideoError> {
            target.fill([0.5; 4]);
            Ok(())
        }
    }

    fn test_video(time: f64, paused: bool) -> Arc<Mutex<TestVideo>> {
        Arc::new(Mutex::new(TestVideo {
            time,
            paused,
            ready: true,
        }))
    }

    /// Submitter that only completes when the test says so
    #[derive(Clone, Default)]
    struct ManualSubmitter {
        submitted: Arc<Mutex<Vec<f64>>>,
        pending: Arc<Mutex<VecDeque<InferenceOutcome>>>,
    }

    impl ManualSubmitter {
        fn complete(&self, result: Result<Detections, TrackingError>) {
            let timestamp = self.submitted.lock().last().copied().unwrap_or_default();
            self.pending.lock().push_back(InferenceOutcome { timestamp, result });
        }
    }

    impl InferenceSubmitter for ManualSubmitter {
        fn submit(&mut self, _frame: Frame, timestamp: f64) -> Result<(), TrackingError> {
            self.submitted.lock().push(timestamp);
            Ok(())
        }
        fn try_take(&mut self) -> Option<InferenceOutcome> {
            self.pending.lock().pop_front()
        }
    }

    fn left_hand(x: f32) -> Detections {
        Detections::Hands(vec![HandDetection {
            handedness: Handedness::Left,
            score: 0.9,
            landmarks: vec![Marker::new(x, 0.5, 0.0); 21],
        }])
    }

    fn live_tracker(submitter: &ManualSubmitter) -> MotionTracker {
        MotionTracker::new(TrackerKind::Hands, TrackerOptions::default())
            .with_inference(Box::new(submitter.clone()))
    }

    #[test]
    fn test_paused_video_submitted_once() {
        let submitter = ManualSubmitter::default();
        let mut tracker = live_tracker(&submitter);
        tracker.set_source_video(test_video(2.0, true), None);
        tracker.start_tracking();

        assert_eq!(tracker.tick(), TrackerTick::Submitted);
        submitter.complete(Ok(left_hand(0.2)));
        assert_eq!(tracker.tick(), TrackerTick::Waiting);
        assert_eq!(tracker.tick(), TrackerTick::Waiting);

        assert_eq!(*submitter.submitted.lock(), vec![2.0]);
        assert_eq!(tracker.current_markers().valid_count(), 21);
    }

    #[test]
    fn test_single_in_flight() {
        let submitter = ManualSubmitter::default();
        let mut tracker = live_tracker(&submitter);
        let video = test_video(0.0, false);
        tracker.set_source_video(video.clone(), None);
        tracker.start_tracking();

        tracker.tick();
        for step in 1..5 {
            video.lock().time = step as f64 * 0.1;
            assert_eq!(tracker.tick(), TrackerTick::Waiting);
        }
        assert_eq!(submitter.submitted.lock().len(), 1);
        assert!(tracker.in_flight());

        submitter.complete(Ok(left_hand(0.3)));
        assert_eq!(tracker.tick(), TrackerTick::Submitted);
        assert_eq!(submitter.submitted.lock().len(), 2);
    }

    #[test]
    fn test_recorded_playback_reads_sample_index() {
        let mut tracker = MotionTracker::new(TrackerKind::Body, TrackerOptions::default());
        let width = TrackerKind::Body.record_width();
        let samples: Vec<f32> = (0..20)
            .flat_map(|i| std::iter::repeat(i as f32 / 100.0).take(width))
            .collect();
        tracker.store_data("Left Video", samples).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        tracker.set_callback(move |markers| sink.lock().push(markers.get(0).map(|m| m.x)));
        tracker.set_source_video(test_video(1.03, false), Some("Left Video"));
        tracker.start_tracking();

        assert_eq!(tracker.tick(), TrackerTick::Recorded { index: 10 });
        assert_eq!(*seen.lock(), vec![Some(0.1)]);
    }

    #[test]
    fn test_recorded_out_of_range_is_sentinel() {
        let mut tracker = MotionTracker::new(TrackerKind::Body, TrackerOptions::default());
        tracker
            .store_data("clip", vec![0.5; TrackerKind::Body.record_width()])
            .unwrap();
        tracker.set_store_offset(-3.0);
        tracker.set_source_video(test_video(1.0, false), Some("clip"));
        tracker.start_tracking();

        assert_eq!(tracker.tick(), TrackerTick::Recorded { index: -20 });
        let markers = tracker.current_markers();
        assert_eq!(markers.len(), 33);
        assert_eq!(markers.valid_count(), 0);
    }

    #[test]
    fn test_stop_waits_for_in_flight() {
        let submitter = ManualSubmitter::default();
        let mut tracker = live_tracker(&submitter);
        tracker.set_source_video(test_video(0.5, false), None);
        tracker.start_tracking();
        tracker.start_tracking();
        assert_eq!(tracker.tick(), TrackerTick::Submitted);

        tracker.stop_tracking();
        assert!(tracker.is_tracking());
        assert_eq!(tracker.tick(), TrackerTick::Waiting);

        submitter.complete(Ok(left_hand(0.4)));
        assert_eq!(tracker.tick(), TrackerTick::Stopped);
        assert!(!tracker.is_tracking());
        // The in-flight result still landed
        assert_eq!(tracker.current_markers().get(0).map(|m| m.x), Some(0.4));
        assert_eq!(tracker.tick(), TrackerTick::Idle);
    }

    struct CrashingBackend;

    impl PoseBackend for CrashingBackend {
        fn infer(&mut self, _frame: &Frame) -> Result<Detections, TrackingError> {
            panic!("model crashed");
        }
    }

    #[test]
    fn test_stop_completes_after_worker_dies() {
        let worker = ThreadedInference::spawn(Box::new(CrashingBackend)).unwrap();
        let mut tracker = MotionTracker::new(TrackerKind::Hands, TrackerOptions::default())
            .with_inference(Box::new(worker));
        tracker.set_source_video(test_video(0.5, false), None);
        tracker.start_tracking();
        assert_eq!(tracker.tick(), TrackerTick::Submitted);

        tracker.stop_tracking();
        let mut outcome = tracker.tick();
        for _ in 0..500 {
            if outcome == TrackerTick::Stopped {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
            outcome = tracker.tick();
        }

        assert_eq!(outcome, TrackerTick::Stopped);
        assert!(!tracker.in_flight());
        assert!(!tracker.is_tracking());
        assert_eq!(tracker.current_markers().valid_count(), 0);
    }

    #[test]
    fn test_failure_keeps_last_markers() {
        let submitter = ManualSubmitter::default();
        let mut tracker = live_tracker(&submitter);
        let video = test_video(0.0, false);
        tracker.set_source_video(video.clone(), None);
        tracker.start_tracking();

        tracker.tick();
        submitter.complete(Ok(left_hand(0.6)));
        video.lock().time = 0.1;
        tracker.tick();
        submitter.complete(Err(TrackingError::Backend("boom".into())));
        tracker.tick();

        assert_eq!(tracker.current_markers().get(0).map(|m| m.x), Some(0.6));
    }

    #[test]
    fn test_markers_are_whole_or_sentinel() {
        let submitter = ManualSubmitter::default();
        let mut tracker = live_tracker(&submitter);
        tracker.set_source_video(test_video(0.0, false), None);
        tracker.start_tracking();
        tracker.tick();
        submitter.complete(Ok(left_hand(0.25)));
        tracker.tick();

        let array = tracker.current_markers().to_sentinel_array();
        assert_eq!(array.len(), 42);
        for m in array {
            let sentinel = m == Marker::SENTINEL;
            let whole = m.x != -1.0 && m.y != -1.0 && m.z != -1.0;
            assert!(sentinel || whole);
        }
    }

    #[test]
    fn test_store_track_rejects_other_kind() {
        let mut tracker = MotionTracker::new(TrackerKind::Hands, TrackerOptions::default());
        let body = RecordedTrack::from_flat(TrackerKind::Body, 10.0, vec![]).unwrap();
        assert!(tracker.store_track("x", body).is_err());
        assert!(tracker.store_data("x", vec![0.0; 5]).is_err());
    }
}
