//! Tick timing statistics

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Ticks retained for statistics (five seconds at 60 fps)
pub const TICK_WINDOW: usize = 300;

/// Summary of the retained tick durations, in milliseconds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickStats {
    pub samples: usize,
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

impl TickStats {
    fn from_durations(durations: &VecDeque<Duration>) -> Self {
        let mut ms: Vec<f64> = durations.iter().map(|d| d.as_secs_f64() * 1e3).collect();
        if ms.is_empty() {
            return Self::default();
        }
        ms.sort_by(f64::total_cmp);

        // Nearest rank below, over the sorted window
        let rank = |q: f64| ms[((ms.len() - 1) as f64 * q) as usize];
        Self {
            samples: ms.len(),
            avg_ms: ms.iter().sum::<f64>() / ms.len() as f64,
            min_ms: ms[0],
            max_ms: ms[ms.len() - 1],
            p50_ms: rank(0.50),
            p95_ms: rank(0.95),
            p99_ms: rank(0.99),
        }
    }
}

/// Records how long each rendered tick took and when ticks started
#[derive(Debug, Default)]
pub struct FrameProfiler {
    durations: VecDeque<Duration>,
    starts: VecDeque<Instant>,
    open: Option<Instant>,
    total: u64,
}

fn push_bounded<T>(ring: &mut VecDeque<T>, value: T) {
    if ring.len() == TICK_WINDOW {
        ring.pop_front();
    }
    ring.push_back(value);
}

impl FrameProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_tick(&mut self) {
        let started = Instant::now();
        self.open = Some(started);
        push_bounded(&mut self.starts, started);
    }

    /// Close the tick opened by `begin_tick`; a no-op without one
    pub fn end_tick(&mut self) {
        if let Some(started) = self.open.take() {
            self.record(started.elapsed());
        }
    }

    pub fn record(&mut self, duration: Duration) {
        push_bounded(&mut self.durations, duration);
        self.total += 1;
    }

    /// Ticks recorded since creation
    pub fn total_ticks(&self) -> u64 {
        self.total
    }

    pub fn stats(&self) -> TickStats {
        TickStats::from_durations(&self.durations)
    }

    /// Tick start rate over the retained window
    pub fn fps(&self) -> f64 {
        match (self.starts.front(), self.starts.back()) {
            (Some(first), Some(last)) if self.starts.len() > 1 => {
                let span = last.duration_since(*first).as_secs_f64();
                if span > 0.0 {
                    (self.starts.len() - 1) as f64 / span
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }
}
