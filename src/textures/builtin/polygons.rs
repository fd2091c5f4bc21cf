//! Spring particles joined into filled triangles
//!
//! One particle follows each marker with a damped spring. Only every
//! `Stride`-th particle moves on a given tick, which makes the shapes lag and
//! wobble behind fast movement.

use glam::Vec2;

use crate::frame::{Frame, WHITE};
use crate::geometry::spring_step;
use crate::params::ParamSpec;
use crate::registry::Descriptor;
use crate::textures::raster;
use crate::textures::traits::{DrawContext, TextureDefinition, TextureGenerator};

pub struct PolygonsDefinition;

impl Descriptor for PolygonsDefinition {
    fn name(&self) -> &str {
        "Polygons"
    }
}

impl TextureDefinition for PolygonsDefinition {
    fn params(&self) -> Vec<ParamSpec> {
        vec![
            ParamSpec::number("Drag", 0.0, 1.0, 0.55),
            ParamSpec::number("Strength", 0.0, 1.0, 0.1),
            ParamSpec::number("Stride", 1.0, 8.0, 3.0).with_step(1.0),
            ParamSpec::number("Fade", 0.0, 1.0, 0.05),
        ]
    }

    fn create(&self) -> Box<dyn TextureGenerator> {
        Box::new(Polygons::default())
    }
}

#[derive(Debug, Clone, Copy)]
struct Particle {
    pos: Vec2,
    vel: Vec2,
}

#[derive(Default)]
struct Polygons {
    particles: Vec<Option<Particle>>,
    tick: u64,
}

impl Polygons {
    fn step(&mut self, targets: &[Option<Vec2>], drag: f32, strength: f32, stride: u64) {
        if self.particles.len() != targets.len() {
            self.particles = vec![None; targets.len()];
        }
        let phase = self.tick % stride;

        for (i, (particle, target)) in self.particles.iter_mut().zip(targets).enumerate() {
            match (particle.as_mut(), target) {
                (_, None) => *particle = None,
                (None, Some(t)) => {
                    *particle = Some(Particle {
                        pos: *t,
                        vel: Vec2::ZERO,
                    })
                }
                (Some(p), Some(t)) => {
                    if i as u64 % stride == phase {
                        let (pos, vel) = spring_step(p.pos, p.vel, *t, drag, strength);
                        p.pos = pos;
                        p.vel = vel;
                    }
                }
            }
        }
        self.tick += 1;
    }
}

impl TextureGenerator for Polygons {
    fn init(&mut self, buffer: &mut Frame, _ctx: &DrawContext) {
        buffer.fill(crate::frame::TRANSPARENT);
        self.particles.clear();
        self.tick = 0;
    }

    fn draw(&mut self, buffer: &mut Frame, ctx: &DrawContext) {
        let drag = ctx.number(0, 0.55);
        let strength = ctx.number(1, 0.1);
        let stride = ctx.number(2, 3.0).round().max(1.0) as u64;
        raster::fade(buffer, ctx.number(3, 0.05));

        let targets: Vec<Option<Vec2>> = ctx
            .data
            .markers(crate::pipeline::keys::POSE_DATA)
            .map(|m| m.iter().map(|m| m.is_valid().then(|| m.xy())).collect())
            .unwrap_or_default();
        self.step(&targets, drag, strength, stride);

        let (w, h) = buffer.dimensions();
        let points: Vec<Vec2> = self
            .particles
            .iter()
            .flatten()
            .map(|p| raster::to_pixels(p.pos.x, p.pos.y, w, h))
            .collect();
        for triangle in points.windows(3) {
            raster::fill_polygon(buffer, triangle, WHITE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_particles_snap_to_target() {
        let mut poly = Polygons::default();
        poly.step(&[Some(Vec2::new(0.5, 0.5)), None], 0.55, 0.1, 1);
        let p = poly.particles[0].unwrap();
        assert_eq!(p.pos, Vec2::new(0.5, 0.5));
        assert!(poly.particles[1].is_none());
    }

    #[test]
    fn test_only_stride_subset_moves() {
        let mut poly = Polygons::default();
        let start = vec![Some(Vec2::ZERO); 3];
        poly.step(&start, 0.5, 0.5, 3);

        // Tick 1: only index 1 advances
        let target = vec![Some(Vec2::ONE); 3];
        poly.step(&target, 0.5, 0.5, 3);
        assert_eq!(poly.particles[0].unwrap().pos, Vec2::ZERO);
        assert_eq!(poly.particles[1].unwrap().pos, Vec2::splat(0.5));
        assert_eq!(poly.particles[2].unwrap().pos, Vec2::ZERO);
    }

    #[test]
    fn test_lost_marker_drops_particle() {
        let mut poly = Polygons::default();
        poly.step(&[Some(Vec2::ONE)], 0.5, 0.5, 1);
        poly.step(&[None], 0.5, 0.5, 1);
        assert!(poly.particles[0].is_none());
    }

    #[test]
    fn test_draws_triangles_between_particles() {
        use crate::pipeline::{keys, ExternalData};
        use crate::tracking::{Marker, MarkerSet, TrackerKind};

        let mut set = MarkerSet::empty(TrackerKind::Body);
        set.set(0, Some(Marker::new(0.1, 0.1, 0.0)));
        set.set(1, Some(Marker::new(0.9, 0.1, 0.0)));
        set.set(2, Some(Marker::new(0.5, 0.9, 0.0)));
        let mut data = ExternalData::new();
        data.set_markers(keys::POSE_DATA, &set);

        let source = Frame::new(40, 40);
        let ctx = DrawContext::new(&source, &data, &[]);
        let mut buffer = Frame::new(40, 40);
        let mut poly = Polygons::default();
        poly.init(&mut buffer, &ctx);
        poly.draw(&mut buffer, &ctx);

        assert_eq!(buffer.get(20, 15), WHITE);
        assert_eq!(buffer.get(1, 38)[0], 0.0);
    }
}
