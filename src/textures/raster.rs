//! Minimal rasterizer for mask drawing
//!
//! Coverage is decided per pixel center. Shapes are drawn opaque; there is no
//! anti-aliasing.

use glam::Vec2;

use crate::frame::{Frame, Pixel};

/// Line end style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineCap {
    Round,
    Square,
}

/// Composite black with alpha `amount` over the buffer.
///
/// RGB is scaled by `1 - amount`, so a fade of 0.02 keeps 98% of the
/// previous luminance.
pub fn fade(buffer: &mut Frame, amount: f32) {
    let amount = amount.clamp(0.0, 1.0);
    let keep = 1.0 - amount;
    for p in buffer.pixels_mut() {
        p[0] *= keep;
        p[1] *= keep;
        p[2] *= keep;
        p[3] = p[3] * keep + amount;
    }
}

/// Pixel-space bounding box clipped to the buffer, as `(x0, y0, x1, y1)` inclusive
fn clip_box(buffer: &Frame, min: Vec2, max: Vec2) -> Option<(u32, u32, u32, u32)> {
    let (w, h) = buffer.dimensions();
    if w == 0 || h == 0 {
        return None;
    }
    let x0 = min.x.floor().max(0.0);
    let y0 = min.y.floor().max(0.0);
    let x1 = max.x.ceil().min(w as f32 - 1.0);
    let y1 = max.y.ceil().min(h as f32 - 1.0);
    if x0 > x1 || y0 > y1 {
        return None;
    }
    Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
}

fn fill_where(buffer: &mut Frame, min: Vec2, max: Vec2, color: Pixel, inside: impl Fn(Vec2) -> bool) {
    let Some((x0, y0, x1, y1)) = clip_box(buffer, min, max) else {
        return;
    };
    for y in y0..=y1 {
        for x in x0..=x1 {
            let center = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            if inside(center) {
                buffer.put(x as i64, y as i64, color);
            }
        }
    }
}

/// Stroke a segment of the given width in pixel space
pub fn stroke_line(buffer: &mut Frame, from: Vec2, to: Vec2, width: f32, cap: LineCap, color: Pixel) {
    let half = (width / 2.0).max(0.5);
    let pad = Vec2::splat(half * std::f32::consts::SQRT_2);
    let min = from.min(to) - pad;
    let max = from.max(to) + pad;

    let delta = to - from;
    let length = delta.length();
    let dir = if length > 0.0 { delta / length } else { Vec2::X };
    let normal = dir.perp();

    match cap {
        LineCap::Round => fill_where(buffer, min, max, color, |p| {
            let t = if length > 0.0 {
                ((p - from).dot(delta) / (length * length)).clamp(0.0, 1.0)
            } else {
                0.0
            };
            p.distance(from + delta * t) <= half
        }),
        LineCap::Square => fill_where(buffer, min, max, color, |p| {
            let rel = p - from;
            let along = rel.dot(dir);
            let across = rel.dot(normal).abs();
            across <= half && along >= -half && along <= length + half
        }),
    }
}

/// Fill a circle of radius `radius` centered at `center`
pub fn fill_circle(buffer: &mut Frame, center: Vec2, radius: f32, color: Pixel) {
    let r = radius.max(0.5);
    let pad = Vec2::splat(r);
    fill_where(buffer, center - pad, center + pad, color, |p| p.distance(center) <= r);
}

/// Fill a polygon (even-odd rule)
pub fn fill_polygon(buffer: &mut Frame, points: &[Vec2], color: Pixel) {
    if points.len() < 3 {
        return;
    }
    let min = points.iter().fold(Vec2::splat(f32::MAX), |acc, p| acc.min(*p));
    let max = points.iter().fold(Vec2::splat(f32::MIN), |acc, p| acc.max(*p));
    fill_where(buffer, min, max, color, |p| point_in_polygon(p, points));
}

fn point_in_polygon(p: Vec2, points: &[Vec2]) -> bool {
    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (a, b) = (points[i], points[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Normalized marker coordinates to pixel space, truncated like canvas drawing code
pub fn to_pixels(x: f32, y: f32, width: u32, height: u32) -> Vec2 {
    Vec2::new((x * width as f32).floor(), (y * height as f32).floor())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{TRANSPARENT, WHITE};

    fn lit(frame: &Frame) -> usize {
        frame.pixels().iter().filter(|p| p[0] > 0.5).count()
    }

    #[test]
    fn test_fade_keeps_fraction() {
        let mut frame = Frame::filled(2, 2, WHITE);
        fade(&mut frame, 0.02);
        assert!(frame.pixels().iter().all(|p| (p[0] - 0.98).abs() < 1e-6));
        assert!(frame.pixels().iter().all(|p| (p[3] - 1.0).abs() < 1e-6));

        let mut clear = Frame::new(1, 1);
        fade(&mut clear, 0.5);
        assert_eq!(clear.get(0, 0), [0.0, 0.0, 0.0, 0.5]);
    }

    #[test]
    fn test_round_line_covers_segment() {
        let mut frame = Frame::new(20, 20);
        stroke_line(&mut frame, Vec2::new(2.0, 10.0), Vec2::new(17.0, 10.0), 3.0, LineCap::Round, WHITE);
        assert_eq!(frame.get(10, 10), WHITE);
        assert_eq!(frame.get(10, 2), TRANSPARENT);
        // Round cap reaches past the end point along the axis
        assert_eq!(frame.get(17, 10), WHITE);
        assert_eq!(frame.get(19, 10), TRANSPARENT);
    }

    #[test]
    fn test_square_cap_covers_corners() {
        let mut round = Frame::new(20, 20);
        let mut square = Frame::new(20, 20);
        let (a, b) = (Vec2::new(5.0, 10.0), Vec2::new(14.0, 10.0));
        stroke_line(&mut round, a, b, 6.0, LineCap::Round, WHITE);
        stroke_line(&mut square, a, b, 6.0, LineCap::Square, WHITE);
        assert!(lit(&square) > lit(&round));
        assert_eq!(square.get(2, 7), WHITE);
        assert_eq!(round.get(2, 7), TRANSPARENT);
    }

    #[test]
    fn test_zero_length_round_line_is_a_dot() {
        let mut frame = Frame::new(10, 10);
        stroke_line(&mut frame, Vec2::new(5.0, 5.0), Vec2::new(5.0, 5.0), 4.0, LineCap::Round, WHITE);
        assert!(lit(&frame) > 0);
        assert_eq!(frame.get(0, 0), TRANSPARENT);
    }

    #[test]
    fn test_fill_circle_and_clipping() {
        let mut frame = Frame::new(10, 10);
        fill_circle(&mut frame, Vec2::new(0.0, 0.0), 3.0, WHITE);
        assert_eq!(frame.get(0, 0), WHITE);
        assert_eq!(frame.get(5, 5), TRANSPARENT);
        fill_circle(&mut frame, Vec2::new(-50.0, -50.0), 3.0, WHITE);
    }

    #[test]
    fn test_fill_polygon() {
        let mut frame = Frame::new(10, 10);
        let square = [
            Vec2::new(2.0, 2.0),
            Vec2::new(8.0, 2.0),
            Vec2::new(8.0, 8.0),
            Vec2::new(2.0, 8.0),
        ];
        fill_polygon(&mut frame, &square, WHITE);
        assert_eq!(lit(&frame), 36);
        fill_polygon(&mut frame, &square[..2], WHITE);
        assert_eq!(lit(&frame), 36);
    }
}
