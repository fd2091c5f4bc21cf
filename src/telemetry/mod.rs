//! Telemetry: logging setup and tick profiling

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogConfig, LOG_ENV, LOG_FORMAT_ENV};
pub use metrics::{FrameProfiler, TickStats, TICK_WINDOW};

/// Keeps the file logger flushing; hold until exit
pub use tracing_appender::non_blocking::WorkerGuard as LogGuard;
