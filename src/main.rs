//! Pose FX - headless playground host
//!
//! Usage: `pose-fx <config.json>`
//!
//! Plays a frame sequence from disk through the configured tracker and
//! filter/texture stack at the target frame rate, writing PNG frames when an
//! output directory is configured.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use parking_lot::Mutex;

use pose_fx::config::PlaygroundConfig;
use pose_fx::filters::{register_builtin_filters, FilterRegistry};
use pose_fx::pipeline::{
    Clock, FilterStack, FixedRateScheduler, FrameLoop, MarkerFeed, PipelineContext, PngSequenceOutput, SystemClock,
};
use pose_fx::telemetry::init_logging;
use pose_fx::textures::{register_builtin_textures, TextureRegistry};
use pose_fx::tracking::{MotionTracker, RecordedTrack, SharedMarkers};
use pose_fx::video::{FrameSequence, SharedVideo};

const DEFAULT_SOURCE_NAME: &str = "video";

fn main() -> Result<()> {
    let Some(config_path) = std::env::args().nth(1).map(PathBuf::from) else {
        bail!("usage: pose-fx <config.json>");
    };
    let config = PlaygroundConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let _log_guard = init_logging(&config.logging).map_err(|e| anyhow::anyhow!("failed to init logging: {e}"))?;
    tracing::info!(config = %config_path.display(), "Starting pose-fx");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());

    // Video
    let mut sequence = FrameSequence::load_dir(&config.video.frames_dir, config.video.fps, clock.clone())
        .with_context(|| format!("loading frames from {}", config.video.frames_dir.display()))?;
    sequence.set_looping(config.video.looping);
    sequence.play();
    let video: SharedVideo = Arc::new(Mutex::new(sequence));
    let source_name = config
        .video
        .source_name
        .clone()
        .unwrap_or_else(|| DEFAULT_SOURCE_NAME.to_string());

    // Tracker
    let kind = config.tracker.kind;
    let markers = SharedMarkers::new(kind);
    let mut tracker = MotionTracker::new(kind, config.tracker.options());
    if let Some(path) = &config.tracker.recorded {
        let track = RecordedTrack::load(path, kind, config.tracker.sample_rate_hz)
            .with_context(|| format!("loading recorded track {}", path.display()))?;
        tracker.store_track(&source_name, track)?;
        tracker.set_store_offset(config.tracker.offset_seconds);
    } else {
        tracing::warn!("No recorded tracking data configured and no live backend available; markers stay empty");
    }
    tracker.set_source_video(video.clone(), Some(&source_name));
    tracker.set_callback(markers.publisher());
    tracker.start_tracking();

    // Stack
    let mut filter_types = FilterRegistry::new();
    register_builtin_filters(&mut filter_types);
    let mut texture_types = TextureRegistry::new();
    register_builtin_textures(&mut texture_types);

    let mut context = PipelineContext::new(clock);
    context.add_feed(MarkerFeed::new(markers));
    match &config.volume {
        Some(volume) => {
            let track = volume
                .load_track()
                .with_context(|| format!("loading volume track {}", volume.recorded.display()))?;
            tracing::info!(frames = track.len(), "Volume track loaded");
            context.add_feed(track);
        }
        None => tracing::debug!("No volume source configured; volume-driven textures use their default"),
    }

    let mut stack = FilterStack::new(context, Arc::new(filter_types), Arc::new(texture_types))
        .with_options(config.stack_options());
    if let Some(output) = &config.output {
        stack = stack.with_output(Box::new(PngSequenceOutput::new(&output.dir, output.every_n)?));
    }
    config.populate(&mut stack)?;
    stack.set_source_video(video)?;
    stack.start()?;

    // Run
    let mut scheduler = FixedRateScheduler::new(config.target_fps);
    let mut frame_loop = FrameLoop::new().with_max_frames(config.max_frames);
    let summary = frame_loop.run(&mut scheduler, &mut [&mut tracker, &mut stack]);

    let stats = stack.profiler().stats();
    tracing::info!(
        frames = summary.frames,
        rendered = stack.rendered(),
        avg_ms = stats.avg_ms,
        p99_ms = stats.p99_ms,
        resyncs = scheduler.resyncs(),
        "Done"
    );
    Ok(())
}
