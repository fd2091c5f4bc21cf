//! Feedback and inversion
//!
//! `Feedback` reads the stack's last output frame, which is only written after
//! a full tick, so a frame never sees its own partial result.

use std::sync::Arc;

use super::{mask_rgb, mix};
use crate::filters::FilterDefinition;
use crate::kernel::{KernelArgs, PixelKernel};
use crate::params::ParamSpec;
use crate::registry::Descriptor;
use crate::textures::{LAST_OUTPUT_FRAME, TEXTURES_SOURCING};

/// Blends a zoomed, tinted copy of the previous output over the frame
pub struct FeedbackDefinition;

impl Descriptor for FeedbackDefinition {
    fn name(&self) -> &str {
        "Feedback"
    }
}

impl FilterDefinition for FeedbackDefinition {
    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::sourced_choice("Shape", TEXTURES_SOURCING, "Everything"),
            ParamSpec::sourced_choice("Feedback", TEXTURES_SOURCING, LAST_OUTPUT_FRAME).hidden(),
            ParamSpec::number("Amount", 0.0, 1.0, 0.9),
            ParamSpec::number("Zoom", 0.0, 2.0, 0.98),
            ParamSpec::color("Tint", "#ffffff"),
        ]
    }

    fn kernel(&self) -> Arc<dyn PixelKernel> {
        Arc::new(|x: u32, y: u32, args: &KernelArgs<'_>| {
            let p = args.pixel(x, y);
            let Some(previous) = args.texture(1) else {
                return p;
            };
            let (w, h) = args.frame.dimensions();
            let zoom = args.number(3);
            let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);
            let sx = cx + (x as f32 + 0.5 - cx) * zoom;
            let sy = cy + (y as f32 + 0.5 - cy) * zoom;
            let back = previous.get_clamped(sx.floor() as i64, sy.floor() as i64);

            let m = mask_rgb(args, 0, x, y);
            let amount = args.number(2);
            let tint = args.color(4);
            [
                mix(p[0], back[0] * tint[0], m[0] * amount),
                mix(p[1], back[1] * tint[1], m[1] * amount),
                mix(p[2], back[2] * tint[2], m[2] * amount),
                1.0,
            ]
        })
    }
}

/// Inverts colors through the mask
pub struct InvertDefinition;

impl Descriptor for InvertDefinition {
    fn name(&self) -> &str {
        "Invert"
    }
}

impl FilterDefinition for InvertDefinition {
    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::sourced_choice("Shape", TEXTURES_SOURCING, "Everything"),
            ParamSpec::number("Amount", 0.0, 1.0, 1.0),
        ]
    }

    fn kernel(&self) -> Arc<dyn PixelKernel> {
        Arc::new(|x: u32, y: u32, args: &KernelArgs<'_>| {
            let p = args.pixel(x, y);
            let m = mask_rgb(args, 0, x, y);
            let amount = args.number(1);
            [
                mix(p[0], 1.0 - p[0], m[0] * amount),
                mix(p[1], 1.0 - p[1], m[1] * amount),
                mix(p[2], 1.0 - p[2], m[2] * amount),
                p[3],
            ]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, BLACK, WHITE};
    use crate::kernel::KernelArg;

    #[test]
    fn test_feedback_full_amount_copies_previous() {
        let kernel = FeedbackDefinition.kernel();
        let frame = Frame::filled(4, 4, BLACK);
        let previous = Frame::from_fn(4, 4, |x, y| [x as f32 / 4.0, y as f32 / 4.0, 0.5, 1.0]);
        let mask = Frame::filled(4, 4, WHITE);
        let args = KernelArgs::new(
            &frame,
            vec![
                KernelArg::Texture(&mask),
                KernelArg::Texture(&previous),
                KernelArg::Number(1.0),
                KernelArg::Number(1.0),
                KernelArg::Color([1.0, 1.0, 1.0, 1.0]),
            ],
        );
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(kernel.shade(x, y, &args), previous.get(x, y));
            }
        }
    }

    #[test]
    fn test_feedback_zoom_pulls_toward_center() {
        let kernel = FeedbackDefinition.kernel();
        let frame = Frame::filled(8, 8, BLACK);
        let previous = Frame::from_fn(8, 8, |x, _| [x as f32, 0.0, 0.0, 1.0]);
        let mask = Frame::filled(8, 8, WHITE);
        let args = KernelArgs::new(
            &frame,
            vec![
                KernelArg::Texture(&mask),
                KernelArg::Texture(&previous),
                KernelArg::Number(1.0),
                KernelArg::Number(0.5),
                KernelArg::Color([1.0, 1.0, 1.0, 1.0]),
            ],
        );
        // Pixel 0 samples 4 + (0.5 - 4) * 0.5 = 2.25
        assert_eq!(kernel.shade(0, 0, &args)[0], 2.0);
    }

    #[test]
    fn test_invert_through_mask() {
        let kernel = InvertDefinition.kernel();
        let frame = Frame::filled(2, 1, [0.25, 0.5, 1.0, 1.0]);
        let mask = Frame::from_fn(2, 1, |x, _| if x == 0 { WHITE } else { [0.0; 4] });
        let args = KernelArgs::new(&frame, vec![KernelArg::Texture(&mask), KernelArg::Number(1.0)]);
        assert_eq!(kernel.shade(0, 0, &args), [0.75, 0.5, 0.0, 1.0]);
        assert_eq!(kernel.shade(1, 0, &args), [0.25, 0.5, 1.0, 1.0]);
    }
}
