//! Pose inference plumbing
//!
//! A `PoseBackend` turns one frame into raw detections. Trackers never call a
//! backend directly; they go through an `InferenceSubmitter`, which either runs
//! the backend inline or hands frames to a dedicated worker thread and returns
//! results over a channel.

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};

use super::body::{normalize_body, BodyLandmark};
use super::hands::{normalize_hands, HandDetection};
use super::marker::{MarkerSet, TrackerKind};
use super::TrackingError;
use crate::frame::Frame;

/// Raw backend output
#[derive(Debug, Clone, PartialEq)]
pub enum Detections {
    Hands(Vec<HandDetection>),
    /// Landmarks of the single detected body, in backend order
    Body(Vec<BodyLandmark>),
}

impl Detections {
    pub fn kind(&self) -> TrackerKind {
        match self {
            Detections::Hands(_) => TrackerKind::Hands,
            Detections::Body(_) => TrackerKind::Body,
        }
    }

    /// Normalize into the fixed marker layout of `kind`
    pub fn normalize(
        &self,
        kind: TrackerKind,
        min_hand_score: f32,
        min_visibility: f32,
    ) -> Result<MarkerSet, TrackingError> {
        match (self, kind) {
            (Detections::Hands(hands), TrackerKind::Hands) => Ok(normalize_hands(hands, min_hand_score)),
            (Detections::Body(landmarks), TrackerKind::Body) => Ok(normalize_body(landmarks, min_visibility)),
            _ => Err(TrackingError::KindMismatch {
                expected: kind,
                actual: self.kind(),
            }),
        }
    }
}

/// A pose-estimation model
pub trait PoseBackend: Send {
    fn infer(&mut self, frame: &Frame) -> Result<Detections, TrackingError>;
}

/// A finished inference
#[derive(Debug, Clone)]
pub struct InferenceOutcome {
    /// Playback time of the submitted frame
    pub timestamp: f64,
    pub result: Result<Detections, TrackingError>,
}

/// Request/response channel to a backend
pub trait InferenceSubmitter: Send {
    /// Hand one frame over for inference
    fn submit(&mut self, frame: Frame, timestamp: f64) -> Result<(), TrackingError>;

    /// Take a finished result, if one is ready
    fn try_take(&mut self) -> Option<InferenceOutcome>;
}

/// Runs the backend on the caller's thread during `submit`
pub struct InlineInference {
    backend: Box<dyn PoseBackend>,
    ready: Option<InferenceOutcome>,
}

impl InlineInference {
    pub fn new(backend: Box<dyn PoseBackend>) -> Self {
        Self { backend, ready: None }
    }
}

impl InferenceSubmitter for InlineInference {
    fn submit(&mut self, frame: Frame, timestamp: f64) -> Result<(), TrackingError> {
        if self.ready.is_some() {
            return Err(TrackingError::Busy);
        }
        let result = self.backend.infer(&frame);
        self.ready = Some(InferenceOutcome { timestamp, result });
        Ok(())
    }

    fn try_take(&mut self) -> Option<InferenceOutcome> {
        self.ready.take()
    }
}

struct InferenceRequest {
    frame: Frame,
    timestamp: f64,
}

/// Runs the backend on a dedicated thread
pub struct ThreadedInference {
    request_tx: Option<Sender<InferenceRequest>>,
    result_rx: Receiver<InferenceOutcome>,
    /// Timestamp of the request whose result has not been taken yet
    pending: Option<f64>,
    thread_handle: Option<JoinHandle<()>>,
}

impl ThreadedInference {
    /// Start the worker thread
    pub fn spawn(backend: Box<dyn PoseBackend>) -> Result<Self, TrackingError> {
        let (request_tx, request_rx) = crossbeam_channel::bounded::<InferenceRequest>(1);
        let (result_tx, result_rx) = crossbeam_channel::bounded::<InferenceOutcome>(1);
        let thread_handle = std::thread::Builder::new()
            .name("pose-inference".to_string())
            .spawn(move || Self::inference_thread(backend, request_rx, result_tx))
            .map_err(|e| TrackingError::WorkerSpawn(e.to_string()))?;

        Ok(Self {
            request_tx: Some(request_tx),
            result_rx,
            pending: None,
            thread_handle: Some(thread_handle),
        })
    }

    fn inference_thread(
        mut backend: Box<dyn PoseBackend>,
        request_rx: Receiver<InferenceRequest>,
        result_tx: Sender<InferenceOutcome>,
    ) {
        tracing::info!("Pose inference thread started");

        while let Ok(request) = request_rx.recv() {
            let result = backend.infer(&request.frame);
            if let Err(e) = &result {
                tracing::warn!(error = %e, timestamp = request.timestamp, "Inference error");
            }
            let outcome = InferenceOutcome {
                timestamp: request.timestamp,
                result,
            };
            if result_tx.send(outcome).is_err() {
                break;
            }
        }

        tracing::info!("Pose inference thread stopped");
    }

    /// Whether the worker thread is alive
    pub fn is_running(&self) -> bool {
        self.thread_handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Block up to `timeout` for a result
    pub fn take_timeout(&mut self, timeout: Duration) -> Option<InferenceOutcome> {
        match self.result_rx.recv_timeout(timeout) {
            Ok(outcome) => Some(self.delivered(outcome)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => self.abandoned(),
        }
    }

    fn delivered(&mut self, outcome: InferenceOutcome) -> InferenceOutcome {
        self.pending = None;
        outcome
    }

    /// A pending request the worker can no longer answer fails with `WorkerGone`
    fn abandoned(&mut self) -> Option<InferenceOutcome> {
        let timestamp = self.pending.take()?;
        tracing::warn!(timestamp, "Inference worker exited with a request pending");
        Some(InferenceOutcome {
            timestamp,
            result: Err(TrackingError::WorkerGone),
        })
    }

    /// Stop the worker; a request already being processed finishes first
    pub fn stop(&mut self) {
        // Dropping the sender ends the worker's receive loop
        self.request_tx = None;

        // Unblock a worker waiting to deliver its last result
        while self.result_rx.try_recv().is_ok() {}

        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ThreadedInference {
    fn drop(&mut self) {
        self.stop();
    }
}

impl InferenceSubmitter for ThreadedInference {
    fn submit(&mut self, frame: Frame, timestamp: f64) -> Result<(), TrackingError> {
        let sender = self.request_tx.as_ref().ok_or(TrackingError::WorkerGone)?;
        match sender.try_send(InferenceRequest { frame, timestamp }) {
            Ok(()) => {
                self.pending = Some(timestamp);
                Ok(())
            }
            Err(TrySendError::Full(_)) => Err(TrackingError::Busy),
            Err(TrySendError::Disconnected(_)) => Err(TrackingError::WorkerGone),
        }
    }

    fn try_take(&mut self) -> Option<InferenceOutcome> {
        match self.result_rx.try_recv() {
            Ok(outcome) => Some(self.delivered(outcome)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => self.abandoned(),
        }
    }
}
