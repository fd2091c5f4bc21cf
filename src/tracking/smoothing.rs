//! Temporal smoothing of marker positions

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::marker::{Marker, MarkerSet, TrackerKind};
use crate::geometry::{lerp_step, spring_step};

/// How published markers follow raw detections
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Smoothing {
    #[default]
    None,
    /// Move a fraction `smooth` toward the target each update
    Lerp { smooth: f32 },
    /// Damped spring toward the target
    Spring { drag: f32, strength: f32 },
}

impl Smoothing {
    pub fn default_spring() -> Self {
        Smoothing::Spring {
            drag: 0.55,
            strength: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct MarkerState {
    position: Vec2,
    velocity: Vec2,
}

/// Per-marker smoothing state for one tracker.
///
/// A marker that disappears drops its state; when it reappears it snaps to
/// the new detection instead of sliding in from its old position.
#[derive(Debug, Clone)]
pub struct MarkerSmoother {
    mode: Smoothing,
    states: Vec<Option<MarkerState>>,
}

impl MarkerSmoother {
    pub fn new(kind: TrackerKind, mode: Smoothing) -> Self {
        Self {
            mode,
            states: vec![None; kind.marker_count()],
        }
    }

    pub fn mode(&self) -> Smoothing {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Smoothing) {
        self.mode = mode;
    }

    pub fn reset(&mut self) {
        self.states.iter_mut().for_each(|s| *s = None);
    }

    /// Advance every marker one step toward `raw`
    pub fn apply(&mut self, raw: &MarkerSet) -> MarkerSet {
        if self.mode == Smoothing::None {
            return raw.clone();
        }

        let mut out = MarkerSet::empty(raw.kind());
        for (i, target) in raw.iter().enumerate() {
            let Some(state_slot) = self.states.get_mut(i) else {
                break;
            };
            let Some(target) = target else {
                *state_slot = None;
                continue;
            };

            let state = match (*state_slot, self.mode) {
                (None, _) | (_, Smoothing::None) => MarkerState {
                    position: target.xy(),
                    velocity: Vec2::ZERO,
                },
                (Some(s), Smoothing::Lerp { smooth }) => MarkerState {
                    position: lerp_step(s.position, target.xy(), smooth),
                    velocity: Vec2::ZERO,
                },
                (Some(s), Smoothing::Spring { drag, strength }) => {
                    let (position, velocity) =
                        spring_step(s.position, s.velocity, target.xy(), drag, strength);
                    MarkerState { position, velocity }
                }
            };

            *state_slot = Some(state);
            out.set(i, Some(Marker::new(state.position.x, state.position.y, target.z)));
        }
        out
    }
}
