//! Luma key of the input frame

use crate::frame::{luminance, Frame, TRANSPARENT, WHITE};
use crate::params::ParamSpec;
use crate::registry::Descriptor;
use crate::textures::traits::{DrawContext, TextureDefinition, TextureGenerator};

pub struct BrightnessDefinition;

impl Descriptor for BrightnessDefinition {
    fn name(&self) -> &str {
        "Brightness"
    }
}

impl TextureDefinition for BrightnessDefinition {
    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::number("Threshold", 0.0, 1.0, 0.5),
            ParamSpec::boolean("Invert", false),
        ]
    }

    fn create(&self) -> Box<dyn TextureGenerator> {
        Box::new(Brightness)
    }
}

struct Brightness;

impl TextureGenerator for Brightness {
    fn draw(&mut self, buffer: &mut Frame, ctx: &DrawContext) {
        let threshold = ctx.number(0, 0.5);
        let invert = ctx.params.get(1).and_then(|v| v.as_bool()).unwrap_or(false);

        if buffer.dimensions() != ctx.source.dimensions() {
            buffer.fill(TRANSPARENT);
            return;
        }
        for (out, src) in buffer.pixels_mut().iter_mut().zip(ctx.source.pixels()) {
            let bright = luminance(src) >= threshold;
            *out = if bright != invert { WHITE } else { TRANSPARENT };
        }
    }
}
