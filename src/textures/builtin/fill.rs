//! Constant masks

use crate::frame::{Frame, TRANSPARENT, WHITE};
use crate::registry::Descriptor;
use crate::textures::traits::{DrawContext, TextureDefinition, TextureGenerator};

/// Fully opaque white mask, applies a filter everywhere
pub struct EverythingDefinition;

impl Descriptor for EverythingDefinition {
    fn name(&self) -> &str {
        "Everything"
    }
}

impl TextureDefinition for EverythingDefinition {
    fn create(&self) -> Box<dyn TextureGenerator> {
        Box::new(Solid(WHITE))
    }
}

/// Empty mask, disables a filter without removing it
pub struct NothingDefinition;

impl Descriptor for NothingDefinition {
    fn name(&self) -> &str {
        "Nothing"
    }
}

impl TextureDefinition for NothingDefinition {
    fn create(&self) -> Box<dyn TextureGenerator> {
        Box::new(Solid(TRANSPARENT))
    }
}

struct Solid([f32; 4]);

impl TextureGenerator for Solid {
    fn draw(&mut self, buffer: &mut Frame, _ctx: &DrawContext) {
        buffer.fill(self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ExternalData;

    #[test]
    fn test_constant_masks() {
        let source = Frame::new(3, 3);
        let data = ExternalData::new();
        let ctx = DrawContext::new(&source, &data, &[]);

        let mut buffer = Frame::new(3, 3);
        EverythingDefinition.create().draw(&mut buffer, &ctx);
        assert!(buffer.pixels().iter().all(|p| *p == WHITE));

        NothingDefinition.create().draw(&mut buffer, &ctx);
        assert!(buffer.pixels().iter().all(|p| *p == TRANSPARENT));
    }
}
