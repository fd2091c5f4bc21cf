//! Pose FX - pose-tracked video effects playground
//!
//! Tracks hand/body landmarks from a video, turns them into mask textures and
//! folds every frame through a reorderable stack of per-pixel filters.
//!
//! # Architecture
//!
//! - **Tracking** (`tracking/`): normalizes hand and body estimators into a
//!   fixed-size marker array, with live inference or recorded playback
//! - **Textures** (`textures/`): stateful mask generators driven by markers
//! - **Filters** (`filters/`): per-pixel kernels over the running frame
//! - **Pipeline** (`pipeline/`): the `FilterStack` orchestrator and its tick loop
//! - **Params** (`params/`): parameter schemas and the panel/menu contract

pub mod config;
pub mod filters;
pub mod frame;
pub mod geometry;
pub mod kernel;
pub mod params;
pub mod pipeline;
pub mod registry;
pub mod telemetry;
pub mod textures;
pub mod tracking;
pub mod video;

pub use frame::Frame;
pub use pipeline::{FilterStack, PipelineContext};
