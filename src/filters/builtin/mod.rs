//! Built-in filters
//!
//! Every built-in takes its mask from a `Shape` parameter sourced from the
//! texture list, as argument 0.

mod color;
mod feedback;
mod wobble;

pub use color::{ColorDefinition, RgbLevelsDefinition};
pub use feedback::{FeedbackDefinition, InvertDefinition};
pub use wobble::WobbleDefinition;

use std::sync::Arc;

use super::FilterRegistry;
use crate::kernel::KernelArgs;

/// Linear blend, exact at both ends
pub(crate) fn mix(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

/// Per-channel mask from the texture argument at `index`; no texture masks nothing
pub(crate) fn mask_rgb(args: &KernelArgs<'_>, index: usize, x: u32, y: u32) -> [f32; 3] {
    match args.texture(index) {
        Some(t) => {
            let p = t.get(x, y);
            [p[0], p[1], p[2]]
        }
        None => [0.0; 3],
    }
}

/// Register all built-in filters with the registry
pub fn register_builtin_filters(registry: &mut FilterRegistry) {
    registry.register(Arc::new(ColorDefinition));
    registry.register(Arc::new(RgbLevelsDefinition));
    registry.register(Arc::new(WobbleDefinition));
    registry.register(Arc::new(FeedbackDefinition));
    registry.register(Arc::new(InvertDefinition));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mix_endpoints() {
        assert_eq!(mix(0.3, 0.7, 0.0), 0.3);
        assert_eq!(mix(0.3, 0.7, 1.0), 0.7);
    }

    #[test]
    fn test_builtins_registered() {
        let mut registry = FilterRegistry::new();
        register_builtin_filters(&mut registry);
        assert_eq!(registry.len(), 5);
        assert!(registry.contains("RGB Levels"));
        assert!(registry.contains("Invert"));
        let wobble = registry.get("Wobble").unwrap();
        let time = &wobble.params()[1];
        assert!(time.hidden);
        assert_eq!(time.source.as_deref(), Some("Time"));
    }
}
