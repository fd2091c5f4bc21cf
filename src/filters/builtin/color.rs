//! Color tint and RGB levels

use std::sync::Arc;

use super::{mask_rgb, mix};
use crate::filters::FilterDefinition;
use crate::kernel::{KernelArgs, PixelKernel};
use crate::params::ParamSpec;
use crate::registry::Descriptor;
use crate::textures::TEXTURES_SOURCING;

/// Paints a flat color through the mask
pub struct ColorDefinition;

impl Descriptor for ColorDefinition {
    fn name(&self) -> &str {
        "Color"
    }
}

impl FilterDefinition for ColorDefinition {
    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::sourced_choice("Shape", TEXTURES_SOURCING, "Trails"),
            ParamSpec::number("Red", 0.0, 1.0, 1.0),
            ParamSpec::number("Green", 0.0, 1.0, 0.0),
            ParamSpec::number("Blue", 0.0, 1.0, 0.0),
            ParamSpec::number("Opacity", 0.0, 1.0, 0.5),
        ]
    }

    fn kernel(&self) -> Arc<dyn PixelKernel> {
        Arc::new(|x: u32, y: u32, args: &KernelArgs<'_>| {
            let p = args.pixel(x, y);
            let m = mask_rgb(args, 0, x, y);
            let opacity = args.number(4);
            [
                mix(p[0], args.number(1), m[0] * opacity),
                mix(p[1], args.number(2), m[1] * opacity),
                mix(p[2], args.number(3), m[2] * opacity),
                1.0,
            ]
        })
    }
}

/// Scales channels, optionally inverting the result, through the mask
pub struct RgbLevelsDefinition;

impl Descriptor for RgbLevelsDefinition {
    fn name(&self) -> &str {
        "RGB Levels"
    }
}

impl FilterDefinition for RgbLevelsDefinition {
    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::sourced_choice("Shape", TEXTURES_SOURCING, "Everything"),
            ParamSpec::number("Red", 0.0, 2.0, 1.0),
            ParamSpec::number("Green", 0.0, 2.0, 1.0),
            ParamSpec::number("Blue", 0.0, 2.0, 1.0),
            ParamSpec::boolean("Invert", false),
        ]
    }

    fn kernel(&self) -> Arc<dyn PixelKernel> {
        Arc::new(|x: u32, y: u32, args: &KernelArgs<'_>| {
            let p = args.pixel(x, y);
            let m = mask_rgb(args, 0, x, y);
            let invert = args.number(4);
            let mut out = [0.0, 0.0, 0.0, 1.0];
            for c in 0..3 {
                let scaled = p[c] * args.number(1 + c);
                let target = mix(scaled, 1.0 - scaled, invert);
                out[c] = mix(p[c], target, m[c]);
            }
            out
        })
    }
}
