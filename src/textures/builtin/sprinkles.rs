//! Scattered dots around every tracked marker

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::frame::{Frame, WHITE};
use crate::params::ParamSpec;
use crate::registry::Descriptor;
use crate::textures::raster;
use crate::textures::traits::{DrawContext, TextureDefinition, TextureGenerator};

pub struct SprinklesDefinition;

impl Descriptor for SprinklesDefinition {
    fn name(&self) -> &str {
        "Sprinkles"
    }
}

impl TextureDefinition for SprinklesDefinition {
    fn params(&self) -> Vec<ParamSpec> {
        vec![
            // Fraction of the shorter side
            ParamSpec::number("Radius", 0.0, 0.1, 0.02).with_step(0.001),
            // Normalized offset range
            ParamSpec::number("Jitter", 0.0, 0.2, 0.03).with_step(0.001),
            ParamSpec::number("Fade", 0.0, 1.0, 0.1),
        ]
    }

    fn create(&self) -> Box<dyn TextureGenerator> {
        Box::new(Sprinkles::new(StdRng::from_rng(&mut rand::rng())))
    }
}

pub(crate) struct Sprinkles {
    rng: StdRng,
}

impl Sprinkles {
    pub(crate) fn new(rng: StdRng) -> Self {
        Self { rng }
    }

    #[cfg(test)]
    pub(crate) fn with_seed(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl TextureGenerator for Sprinkles {
    fn draw(&mut self, buffer: &mut Frame, ctx: &DrawContext) {
        let radius_fraction = ctx.number(0, 0.02);
        let jitter = ctx.number(1, 0.03);
        raster::fade(buffer, ctx.number(2, 0.1));

        let (w, h) = buffer.dimensions();
        let radius = radius_fraction * w.min(h) as f32;
        for (_, marker) in ctx.data.valid_markers() {
            let dx = (self.rng.random::<f32>() * 2.0 - 1.0) * jitter;
            let dy = (self.rng.random::<f32>() * 2.0 - 1.0) * jitter;
            let center = raster::to_pixels(marker.x + dx, marker.y + dy, w, h);
            raster::fill_circle(buffer, center, radius, WHITE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;
    use crate::pipeline::{keys, ExternalData};
    use crate::tracking::{Marker, MarkerSet, TrackerKind};

    #[test]
    fn test_circle_at_each_valid_marker() {
        let mut set = MarkerSet::empty(TrackerKind::Body);
        set.set(0, Some(Marker::new(0.25, 0.25, 0.0)));
        set.set(10, Some(Marker::new(0.75, 0.75, 0.0)));
        let mut data = ExternalData::new();
        data.set_markers(keys::POSE_DATA, &set);

        let source = Frame::new(100, 100);
        let params = [ParamValue::Number(0.05), ParamValue::Number(0.0), ParamValue::Number(1.0)];
        let ctx = DrawContext::new(&source, &data, &params);

        let mut buffer = Frame::filled(100, 100, WHITE);
        Sprinkles::with_seed(3).draw(&mut buffer, &ctx);

        assert_eq!(buffer.get(25, 25), WHITE);
        assert_eq!(buffer.get(75, 75), WHITE);
        // Full fade wiped the old content
        assert_eq!(buffer.get(50, 50)[0], 0.0);
    }

    #[test]
    fn test_no_markers_only_fades() {
        let source = Frame::new(10, 10);
        let data = ExternalData::new();
        let ctx = DrawContext::new(&source, &data, &[]);
        let mut buffer = Frame::filled(10, 10, WHITE);
        Sprinkles::with_seed(3).draw(&mut buffer, &ctx);
        assert!(buffer.pixels().iter().all(|p| (p[0] - 0.9).abs() < 1e-6));
    }
}
