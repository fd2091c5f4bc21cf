//! Frame pipeline: time, external data, the filter/texture stack, scheduling
//! and presentation.

mod clock;
mod context;
mod output;
mod scheduler;
mod stack;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{
    keys, volume_level, ExternalData, ExternalValue, FnFeed, LiveFeed, MarkerFeed, PipelineContext, VolumeTrack,
};
pub use output::{NullOutput, OutputError, OutputSurface, PngSequenceOutput};
pub use scheduler::{
    FixedRateScheduler, FrameLoop, FrameScheduler, FrameTask, LoopExit, LoopSummary, ManualScheduler, StopHandle,
    TaskStatus,
};
pub use stack::{FilterStack, StackError, StackOptions, StackState, TickOutcome};
