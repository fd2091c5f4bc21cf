//! Frame scheduling
//!
//! The tracker and the filter stack each advance one step per display frame.
//! A `FrameScheduler` decides when the next frame is due; `FrameLoop` drives
//! every task once per frame until they all finish, a frame limit is hit, or
//! a stop is requested.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use super::stack::{FilterStack, TickOutcome};
use crate::tracking::{MotionTracker, TrackerTick};

/// Whether a task wants more frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Continue,
    Finished,
}

/// Something stepped once per frame
pub trait FrameTask {
    fn step(&mut self) -> TaskStatus;
}

impl FrameTask for MotionTracker {
    fn step(&mut self) -> TaskStatus {
        match self.tick() {
            TrackerTick::Stopped => TaskStatus::Finished,
            TrackerTick::Idle if !self.is_tracking() => TaskStatus::Finished,
            _ => TaskStatus::Continue,
        }
    }
}

impl FrameTask for FilterStack {
    fn step(&mut self) -> TaskStatus {
        match self.tick() {
            Ok(TickOutcome::Stopped) => TaskStatus::Finished,
            Ok(TickOutcome::Idle) if !self.is_running() => TaskStatus::Finished,
            Ok(_) => TaskStatus::Continue,
            Err(e) => {
                tracing::warn!(error = %e, "Pipeline tick failed");
                TaskStatus::Continue
            }
        }
    }
}

/// Decides when the next frame starts
pub trait FrameScheduler {
    /// Block until the next frame is due; false ends the loop
    fn wait_next(&mut self) -> bool;
}

/// Paces frames at a fixed rate.
///
/// Sleeps until shortly before the deadline, then spins for the rest. Falls
/// back to "now" when more than two frames behind instead of bursting to
/// catch up.
#[derive(Debug)]
pub struct FixedRateScheduler {
    frame_duration: Duration,
    wake_early: Duration,
    next_frame_at: Option<Instant>,
    resyncs: u64,
}

impl FixedRateScheduler {
    pub fn new(fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 60.0 };
        Self {
            frame_duration: Duration::from_secs_f64(1.0 / fps),
            wake_early: Duration::from_micros(1000),
            next_frame_at: None,
            resyncs: 0,
        }
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    /// Times the schedule fell too far behind and was reset
    pub fn resyncs(&self) -> u64 {
        self.resyncs
    }
}

impl FrameScheduler for FixedRateScheduler {
    fn wait_next(&mut self) -> bool {
        let Some(deadline) = self.next_frame_at else {
            self.next_frame_at = Some(Instant::now() + self.frame_duration);
            return true;
        };

        let wake_at = deadline.checked_sub(self.wake_early).unwrap_or(deadline);
        let now = Instant::now();
        if now < wake_at {
            std::thread::sleep(wake_at - now);
        }
        while Instant::now() < deadline {
            std::hint::spin_loop();
        }

        let mut next = deadline + self.frame_duration;
        let max_behind = self.frame_duration * 2;
        let now_after = Instant::now();
        if now_after > next + max_behind {
            next = now_after + self.frame_duration;
            self.resyncs += 1;
            tracing::debug!(resyncs = self.resyncs, "Frame schedule fell behind, resetting");
        }
        self.next_frame_at = Some(next);
        true
    }
}

/// Runs frames back to back, for offline rendering and tests
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualScheduler;

impl FrameScheduler for ManualScheduler {
    fn wait_next(&mut self) -> bool {
        true
    }
}

/// Requests a running `FrameLoop` to stop after its current frame
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Sender<()>,
}

impl StopHandle {
    pub fn stop(&self) {
        let _ = self.tx.try_send(());
    }
}

/// How a `FrameLoop::run` ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Every task finished
    Finished,
    FrameLimit,
    StopRequested,
    /// The scheduler ended the loop
    SchedulerDone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSummary {
    pub frames: u64,
    pub exit: LoopExit,
}

pub struct FrameLoop {
    max_frames: Option<u64>,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameLoop {
    pub fn new() -> Self {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        Self {
            max_frames: None,
            stop_tx,
            stop_rx,
        }
    }

    pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: self.stop_tx.clone(),
        }
    }

    /// Step every unfinished task once per frame, in the given order
    pub fn run(&mut self, scheduler: &mut dyn FrameScheduler, tasks: &mut [&mut dyn FrameTask]) -> LoopSummary {
        let mut finished = vec![false; tasks.len()];
        let mut frames = 0u64;

        let exit = loop {
            if self.stop_rx.try_recv().is_ok() {
                break LoopExit::StopRequested;
            }
            if self.max_frames.is_some_and(|max| frames >= max) {
                break LoopExit::FrameLimit;
            }
            if !scheduler.wait_next() {
                break LoopExit::SchedulerDone;
            }

            for (task, done) in tasks.iter_mut().zip(finished.iter_mut()) {
                if !*done && task.step() == TaskStatus::Finished {
                    *done = true;
                }
            }
            frames += 1;

            if finished.iter().all(|d| *d) {
                break LoopExit::Finished;
            }
        };

        tracing::info!(frames, exit = ?exit, "Frame loop ended");
        LoopSummary { frames, exit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Finishes after `remaining` steps
    struct Countdown {
        remaining: u32,
        steps: u32,
    }

    impl FrameTask for Countdown {
        fn step(&mut self) -> TaskStatus {
            self.steps += 1;
            if self.remaining == 0 {
                return TaskStatus::Finished;
            }
            self.remaining -= 1;
            TaskStatus::Continue
        }
    }

    struct LimitedScheduler(u32);

    impl FrameScheduler for LimitedScheduler {
        fn wait_next(&mut self) -> bool {
            if self.0 == 0 {
                return false;
            }
            self.0 -= 1;
            true
        }
    }

    #[test]
    fn test_loop_ends_when_all_tasks_finish() {
        let mut a = Countdown { remaining: 2, steps: 0 };
        let mut b = Countdown { remaining: 5, steps: 0 };
        let summary = FrameLoop::new().run(&mut ManualScheduler, &mut [&mut a, &mut b]);
        assert_eq!(summary, LoopSummary { frames: 6, exit: LoopExit::Finished });
        // A finished task is not stepped again
        assert_eq!(a.steps, 3);
        assert_eq!(b.steps, 6);
    }

    #[test]
    fn test_frame_limit() {
        let mut a = Countdown { remaining: 100, steps: 0 };
        let summary = FrameLoop::new()
            .with_max_frames(Some(10))
            .run(&mut ManualScheduler, &mut [&mut a]);
        assert_eq!(summary.exit, LoopExit::FrameLimit);
        assert_eq!(a.steps, 10);
    }

    #[test]
    fn test_scheduler_can_end_loop() {
        let mut a = Countdown { remaining: 100, steps: 0 };
        let summary = FrameLoop::new().run(&mut LimitedScheduler(3), &mut [&mut a]);
        assert_eq!(summary, LoopSummary { frames: 3, exit: LoopExit::SchedulerDone });
    }

    #[test]
    fn test_stop_handle() {
        let mut frame_loop = FrameLoop::new();
        frame_loop.stop_handle().stop();
        let mut a = Countdown { remaining: 100, steps: 0 };
        let summary = frame_loop.run(&mut ManualScheduler, &mut [&mut a]);
        assert_eq!(summary, LoopSummary { frames: 0, exit: LoopExit::StopRequested });
    }

    #[test]
    fn test_fixed_rate_paces_frames() {
        let mut scheduler = FixedRateScheduler::new(200.0);
        assert_eq!(scheduler.frame_duration(), Duration::from_millis(5));
        let start = Instant::now();
        for _ in 0..5 {
            assert!(scheduler.wait_next());
        }
        // First frame is immediate, the next four wait one frame each
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_fixed_rate_resyncs_when_behind() {
        let mut scheduler = FixedRateScheduler::new(1000.0);
        scheduler.wait_next();
        std::thread::sleep(Duration::from_millis(20));
        scheduler.wait_next();
        assert_eq!(scheduler.resyncs(), 1);
    }

    #[test]
    fn test_invalid_rate_falls_back() {
        let scheduler = FixedRateScheduler::new(0.0);
        assert_eq!(scheduler.frame_duration(), Duration::from_secs_f64(1.0 / 60.0));
    }
}
