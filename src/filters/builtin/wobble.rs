//! Time-driven sine displacement

use std::sync::Arc;

use super::{mask_rgb, mix};
use crate::filters::FilterDefinition;
use crate::kernel::{KernelArgs, PixelKernel};
use crate::params::ParamSpec;
use crate::pipeline::keys;
use crate::registry::Descriptor;
use crate::textures::TEXTURES_SOURCING;

pub struct WobbleDefinition;

impl Descriptor for WobbleDefinition {
    fn name(&self) -> &str {
        "Wobble"
    }
}

impl FilterDefinition for WobbleDefinition {
    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::sourced_choice("Shape", TEXTURES_SOURCING, "Everything"),
            ParamSpec::number("Time", 0.0, f32::MAX, 0.0).hidden().sourced_from(keys::TIME),
            ParamSpec::number("Speed", -10.0, 10.0, 1.0),
            ParamSpec::number("Frequency", 0.0, 0.2, 0.05).with_step(0.001),
            ParamSpec::number("Intensity", 0.0, 0.2, 0.02).with_step(0.001),
        ]
    }

    fn kernel(&self) -> Arc<dyn PixelKernel> {
        Arc::new(|x: u32, y: u32, args: &KernelArgs<'_>| {
            let (w, h) = args.frame.dimensions();
            let time = args.number(1);
            let speed = args.number(2);
            let frequency = args.number(3);
            let intensity = args.number(4);

            let phase = time * speed;
            let dx = (phase + y as f32 * frequency).sin() * w as f32;
            let dy = (phase + x as f32 * frequency).cos() * h as f32;
            let xw = (x as f32 + dx.round() * intensity).clamp(0.0, w as f32) as i64;
            let yw = (y as f32 + dy.round() * intensity).clamp(0.0, h as f32) as i64;

            let here = args.pixel(x, y);
            let there = args.frame.get_clamped(xw, yw);
            let (mx, my) = (xw.min(w as i64 - 1) as u32, yw.min(h as i64 - 1) as u32);
            let m = mask_rgb(args, 0, mx, my);
            [mix(here[0], there[0], m[0]), mix(here[1], there[1], m[1]), mix(here[2], there[2], m[2]), 1.0]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, WHITE};
    use crate::kernel::KernelArg;

    fn gradient() -> Frame {
        Frame::from_fn(16, 16, |x, _| [x as f32 / 15.0, 0.0, 0.0, 1.0])
    }

    #[test]
    fn test_zero_intensity_is_identity() {
        let kernel = WobbleDefinition.kernel();
        let frame = gradient();
        let mask = Frame::filled(16, 16, WHITE);
        let args = KernelArgs::new(
            &frame,
            vec![
                KernelArg::Texture(&mask),
                KernelArg::Number(3.0),
                KernelArg::Number(1.0),
                KernelArg::Number(0.05),
                KernelArg::Number(0.0),
            ],
        );
        for x in 0..16 {
            assert_eq!(kernel.shade(x, 4, &args), frame.get(x, 4));
        }
    }

    #[test]
    fn test_displaces_inside_mask() {
        let kernel = WobbleDefinition.kernel();
        let frame = gradient();
        let mask = Frame::filled(16, 16, WHITE);
        // sin(pi/2) = 1: horizontal shift of round(16) * 0.125 = 2 pixels
        let args = KernelArgs::new(
            &frame,
            vec![
                KernelArg::Texture(&mask),
                KernelArg::Number(std::f32::consts::FRAC_PI_2),
                KernelArg::Number(1.0),
                KernelArg::Number(0.0),
                KernelArg::Number(0.125),
            ],
        );
        let out = kernel.shade(3, 0, &args);
        assert_eq!(out, frame.get(5, 0));

        // No mask, no displacement
        let empty = Frame::new(16, 16);
        let mut params = args.params.clone();
        params[0] = KernelArg::Texture(&empty);
        assert_eq!(kernel.shade(3, 0, &KernelArgs::new(&frame, params)), frame.get(3, 0));
    }
}
