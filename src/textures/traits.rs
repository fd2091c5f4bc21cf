//! Texture generator traits
//!
//! - `TextureDefinition` - immutable descriptor and generator factory
//! - `TextureGenerator` - per-instance drawing state

use crate::frame::Frame;
use crate::params::{ParamSpec, ParamValue};
use crate::pipeline::ExternalData;
use crate::registry::Descriptor;

/// A registrable texture generator type
pub trait TextureDefinition: Descriptor + Send + Sync {
    /// Ordered parameter schema
    fn params(&self) -> Vec<ParamSpec> {
        Vec::new()
    }

    /// Fresh generator with its own scratch state
    fn create(&self) -> Box<dyn TextureGenerator>;
}

/// Inputs available while drawing
pub struct DrawContext<'a> {
    /// The pre-pipeline frame of this tick
    pub source: &'a Frame,
    pub data: &'a ExternalData,
    /// Parameter values in schema order
    pub params: &'a [ParamValue],
}

impl<'a> DrawContext<'a> {
    pub fn new(source: &'a Frame, data: &'a ExternalData, params: &'a [ParamValue]) -> Self {
        Self { source, data, params }
    }

    /// Number parameter at `index`, or `default` when absent
    pub fn number(&self, index: usize, default: f32) -> f32 {
        self.params.get(index).and_then(ParamValue::as_f32).unwrap_or(default)
    }
}

/// Stateful mask drawing
///
/// The buffer is owned by the instance and keeps its content between ticks,
/// so generators can fade or accumulate.
pub trait TextureGenerator: Send {
    /// One-time setup after (re)allocation, before the first draw
    fn init(&mut self, buffer: &mut Frame, _ctx: &DrawContext) {
        buffer.fill(crate::frame::TRANSPARENT);
    }

    /// Redraw for the current tick
    fn draw(&mut self, buffer: &mut Frame, ctx: &DrawContext);
}
