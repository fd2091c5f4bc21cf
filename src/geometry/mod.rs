//! 2D vector helpers
//!
//! Thin layer over `glam::Vec2` adding indexed component access and the
//! smoothing steps used by marker tracking and particle-style generators.

pub use glam::Vec2;

/// Indexed component access where 0 = x and 1 = y.
///
/// Any other index is a programmer error and panics.
pub trait Components {
    fn component(&self, index: usize) -> f32;
    fn set_component(&mut self, index: usize, value: f32);
}

impl Components for Vec2 {
    fn component(&self, index: usize) -> f32 {
        match index {
            0 => self.x,
            1 => self.y,
            _ => panic!("Vec2::component: index is out of range: {}", index),
        }
    }

    fn set_component(&mut self, index: usize, value: f32) {
        match index {
            0 => self.x = value,
            1 => self.y = value,
            _ => panic!("Vec2::set_component: index is out of range: {}", index),
        }
    }
}

/// Move `current` a fraction `smooth` of the way toward `target`.
pub fn lerp_step(current: Vec2, target: Vec2, smooth: f32) -> Vec2 {
    current.lerp(target, smooth)
}

/// One damped spring step toward `target`.
///
/// `force = (target - current) * strength`, `velocity = velocity * drag + force`.
/// Returns the new `(position, velocity)`.
pub fn spring_step(current: Vec2, velocity: Vec2, target: Vec2, drag: f32, strength: f32) -> (Vec2, Vec2) {
    let force = (target - current) * strength;
    let velocity = velocity * drag + force;
    (current + velocity, velocity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_access() {
        let mut v = Vec2::new(1.0, 2.0);
        assert_eq!(v.component(0), 1.0);
        assert_eq!(v.component(1), 2.0);
        v.set_component(1, 5.0);
        assert_eq!(v.y, 5.0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_component_out_of_range_panics() {
        let v = Vec2::ZERO;
        let _ = v.component(2);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_set_component_out_of_range_panics() {
        let mut v = Vec2::ZERO;
        v.set_component(3, 1.0);
    }

    #[test]
    fn test_vector_math() {
        let a = Vec2::new(3.0, 4.0);
        let b = Vec2::new(1.0, 1.0);
        assert_eq!(a + b, Vec2::new(4.0, 5.0));
        assert_eq!(a - b, Vec2::new(2.0, 3.0));
        assert_eq!(a * 2.0, Vec2::new(6.0, 8.0));
        assert_eq!(a.length(), 5.0);
        assert!((a.normalize().length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_lerp_step() {
        let p = lerp_step(Vec2::ZERO, Vec2::new(2.0, 4.0), 0.5);
        assert_eq!(p, Vec2::new(1.0, 2.0));
    }

    #[test]
    fn test_spring_pulls_toward_target() {
        let target = Vec2::new(1.0, 0.0);
        let (pos, vel) = spring_step(Vec2::ZERO, Vec2::ZERO, target, 0.55, 0.1);
        assert!((pos.x - 0.1).abs() < 1e-6);
        assert!((vel.x - 0.1).abs() < 1e-6);

        // A spring at rest on its target stays there
        let (pos, vel) = spring_step(target, Vec2::ZERO, target, 0.55, 0.1);
        assert_eq!(pos, target);
        assert_eq!(vel, Vec2::ZERO);
    }

    #[test]
    fn test_spring_converges() {
        let target = Vec2::new(0.5, 0.25);
        let mut pos = Vec2::ZERO;
        let mut vel = Vec2::ZERO;
        for _ in 0..200 {
            (pos, vel) = spring_step(pos, vel, target, 0.55, 0.1);
        }
        assert!(pos.distance(target) < 1e-3);
    }
}
