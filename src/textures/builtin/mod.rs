//! Built-in texture generators

mod brightness;
mod fill;
mod polygons;
mod sprinkles;
mod strokes;

pub use brightness::BrightnessDefinition;
pub use fill::{EverythingDefinition, NothingDefinition};
pub use polygons::PolygonsDefinition;
pub use sprinkles::SprinklesDefinition;
pub use strokes::{CrazyShapesDefinition, DotsDefinition, TrailsDefinition, DEFAULT_TRAIL_FADE};

use std::sync::Arc;

use super::TextureRegistry;

/// Register all built-in texture generators with the registry
pub fn register_builtin_textures(registry: &mut TextureRegistry) {
    registry.register(Arc::new(EverythingDefinition));
    registry.register(Arc::new(NothingDefinition));
    registry.register(Arc::new(DotsDefinition));
    registry.register(Arc::new(TrailsDefinition));
    registry.register(Arc::new(CrazyShapesDefinition));
    registry.register(Arc::new(SprinklesDefinition));
    registry.register(Arc::new(PolygonsDefinition));
    registry.register(Arc::new(BrightnessDefinition));
}
