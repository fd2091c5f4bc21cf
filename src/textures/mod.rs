//! Texture generators
//!
//! Textures are named mask buffers redrawn every tick from the source frame
//! and the pipeline's external data. Filters read them through parameters
//! sourced from the `Textures` feed.

pub mod builtin;
pub mod raster;
mod instance;
mod traits;

pub use builtin::register_builtin_textures;
pub use instance::{TextureId, TextureInstance};
pub use traits::{DrawContext, TextureDefinition, TextureGenerator};

use crate::registry::TypeRegistry;

/// Registry of texture generator types
pub type TextureRegistry = TypeRegistry<dyn TextureDefinition>;

/// Name of the sourcing feed listing texture slots
pub const TEXTURES_SOURCING: &str = "Textures";

/// Stack-owned slot holding the previous tick's output
pub const LAST_OUTPUT_FRAME: &str = "Last Output Frame";
