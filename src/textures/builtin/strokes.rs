//! Marker movement strokes
//!
//! Each generator strokes a line from every marker's previous position to its
//! current one, skipping pairs where either end is missing.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::frame::{Frame, WHITE};
use crate::params::ParamSpec;
use crate::pipeline::keys;
use crate::registry::Descriptor;
use crate::textures::raster::{self, LineCap};
use crate::textures::traits::{DrawContext, TextureDefinition, TextureGenerator};

/// Line width as `floor(min(width, height) / divisor)`
fn line_width(buffer: &Frame, divisor: u32) -> f32 {
    (buffer.width().min(buffer.height()) / divisor).max(1) as f32
}

fn stroke_segments(buffer: &mut Frame, ctx: &DrawContext, width: f32, cap: LineCap) {
    let (w, h) = buffer.dimensions();
    for (last, current) in ctx.data.marker_segments() {
        let from = raster::to_pixels(last.x, last.y, w, h);
        let to = raster::to_pixels(current.x, current.y, w, h);
        raster::stroke_line(buffer, from, to, width, cap, WHITE);
    }
}

/// Short strokes of the current movement only
pub struct DotsDefinition;

impl Descriptor for DotsDefinition {
    fn name(&self) -> &str {
        "Dots"
    }
}

impl TextureDefinition for DotsDefinition {
    fn create(&self) -> Box<dyn TextureGenerator> {
        Box::new(Dots)
    }
}

struct Dots;

impl TextureGenerator for Dots {
    fn draw(&mut self, buffer: &mut Frame, ctx: &DrawContext) {
        buffer.fill(crate::frame::TRANSPARENT);
        let width = line_width(buffer, 25);
        stroke_segments(buffer, ctx, width, LineCap::Round);
    }
}

/// Default fade per tick for trails
pub const DEFAULT_TRAIL_FADE: f32 = 0.02;

/// Strokes that fade out over time
pub struct TrailsDefinition;

impl Descriptor for TrailsDefinition {
    fn name(&self) -> &str {
        "Trails"
    }
}

impl TextureDefinition for TrailsDefinition {
    fn params(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::number("Fade", 0.0, 1.0, DEFAULT_TRAIL_FADE).with_step(0.005)]
    }

    fn create(&self) -> Box<dyn TextureGenerator> {
        Box::new(Trails)
    }
}

struct Trails;

impl TextureGenerator for Trails {
    fn draw(&mut self, buffer: &mut Frame, ctx: &DrawContext) {
        raster::fade(buffer, ctx.number(0, DEFAULT_TRAIL_FADE));
        let width = line_width(buffer, 20);
        stroke_segments(buffer, ctx, width, LineCap::Round);
    }
}

/// Jitter used when no volume feed is registered
const DEFAULT_CHAOS: f32 = 0.1;

/// Thick square strokes with endpoints scattered by the audio level
pub struct CrazyShapesDefinition;

impl Descriptor for CrazyShapesDefinition {
    fn name(&self) -> &str {
        "Crazy Shapes"
    }
}

impl TextureDefinition for CrazyShapesDefinition {
    fn create(&self) -> Box<dyn TextureGenerator> {
        Box::new(CrazyShapes::new(StdRng::from_rng(&mut rand::rng())))
    }
}

pub(crate) struct CrazyShapes {
    rng: StdRng,
}

impl CrazyShapes {
    /// Alpha of the black wash applied every tick
    const FADE: f32 = 16.0 / 255.0;

    pub(crate) fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    #[cfg(test)]
    pub(crate) fn with_seed(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Uniform in `[-range, range)`
    fn jitter(&mut self, range: f32) -> f32 {
        (self.rng.random::<f32>() * 2.0 - 1.0) * range
    }
}

impl TextureGenerator for CrazyShapes {
    fn draw(&mut self, buffer: &mut Frame, ctx: &DrawContext) {
        raster::fade(buffer, Self::FADE);

        let (w, h) = buffer.dimensions();
        let width = line_width(buffer, 5);
        let chaos = ctx.data.number(keys::VOLUME).unwrap_or(DEFAULT_CHAOS);

        for (last, current) in ctx.data.marker_segments() {
            let from = raster::to_pixels(last.x + self.jitter(chaos), last.y + self.jitter(chaos), w, h);
            let to = raster::to_pixels(current.x + self.jitter(chaos), current.y + self.jitter(chaos), w, h);
            raster::stroke_line(buffer, from, to, width, LineCap::Square, WHITE);
        }
    }
}
