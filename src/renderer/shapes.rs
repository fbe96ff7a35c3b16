//! Shape generation for 2D primitives

use glam::Vec2;
use std::f32::consts::PI;

use super::vertex::Vertex;

/// Generate vertices for a filled ellipse (`radii.x` horizontal, `radii.y` vertical)
pub fn ellipse(center: Vec2, radii: Vec2, color: [f32; 4], segments: u32) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity((segments * 3) as usize);

    for i in 0..segments {
        let theta1 = (i as f32 / segments as f32) * 2.0 * PI;
        let theta2 = ((i + 1) as f32 / segments as f32) * 2.0 * PI;

        // Triangle from center to edge
        vertices.push(Vertex::new(center.x, center.y, color));
        vertices.push(Vertex::new(
            center.x + radii.x * theta1.cos(),
            center.y + radii.y * theta1.sin(),
            color,
        ));
        vertices.push(Vertex::new(
            center.x + radii.x * theta2.cos(),
            center.y + radii.y * theta2.sin(),
            color,
        ));
    }

    vertices
}

/// Generate vertices for a filled circle
pub fn circle(center: Vec2, radius: f32, color: [f32; 4], segments: u32) -> Vec<Vertex> {
    ellipse(center, Vec2::splat(radius), color, segments)
}

/// Square of side `size` rotated by `rotation` around its center
pub fn rotated_quad(center: Vec2, size: f32, rotation: f32, color: [f32; 4]) -> Vec<Vertex> {
    let half = size * 0.5;
    let (sin, cos) = rotation.sin_cos();
    let corner = |x: f32, y: f32| {
        let p = center + Vec2::new(x * cos - y * sin, x * sin + y * cos);
        Vertex::new(p.x, p.y, color)
    };
    let a = corner(-half, -half);
    let b = corner(half, -half);
    let c = corner(half, half);
    let d = corner(-half, half);
    vec![a, b, c, a, c, d]
}

/// Triangle pointing down from `tip_top` (balloon knot)
pub fn knot(tip_top: Vec2, size: f32, color: [f32; 4]) -> Vec<Vertex> {
    vec![
        Vertex::new(tip_top.x, tip_top.y, color),
        Vertex::new(tip_top.x - size, tip_top.y + size, color),
        Vertex::new(tip_top.x + size, tip_top.y + size, color),
    ]
}

/// Thick line strip through `points`
pub fn polyline(points: &[Vec2], width: f32, color: [f32; 4]) -> Vec<Vertex> {
    if points.len() < 2 {
        return Vec::new();
    }

    let half = width * 0.5;
    let mut vertices = Vec::with_capacity((points.len() - 1) * 6);
    for pair in points.windows(2) {
        let (p1, p2) = (pair[0], pair[1]);
        let dir = (p2 - p1).normalize_or_zero();
        // Perpendicular for width
        let perp = Vec2::new(-dir.y, dir.x) * half;

        let v1a = p1 + perp;
        let v1b = p1 - perp;
        let v2a = p2 + perp;
        let v2b = p2 - perp;

        vertices.push(Vertex::new(v1a.x, v1a.y, color));
        vertices.push(Vertex::new(v1b.x, v1b.y, color));
        vertices.push(Vertex::new(v2a.x, v2a.y, color));

        vertices.push(Vertex::new(v2a.x, v2a.y, color));
        vertices.push(Vertex::new(v1b.x, v1b.y, color));
        vertices.push(Vertex::new(v2b.x, v2b.y, color));
    }
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_vertex_count_and_extent() {
        let verts = circle(Vec2::new(10.0, 10.0), 5.0, [1.0; 4], 16);
        assert_eq!(verts.len(), 48);
        for v in &verts {
            let d = Vec2::from(v.position).distance(Vec2::new(10.0, 10.0));
            assert!(d <= 5.0 + 1e-4);
        }
    }

    #[test]
    fn test_rotated_quad_keeps_size() {
        let verts = rotated_quad(Vec2::ZERO, 2.0, 0.7, [1.0; 4]);
        assert_eq!(verts.len(), 6);
        for v in &verts {
            let d = Vec2::from(v.position).length();
            assert!((d - 2.0f32.sqrt()).abs() < 1e-4);
        }
    }

    #[test]
    fn test_polyline_needs_two_points() {
        assert!(polyline(&[Vec2::ZERO], 1.0, [1.0; 4]).is_empty());
        let pts = [Vec2::ZERO, Vec2::X, Vec2::new(2.0, 1.0)];
        assert_eq!(polyline(&pts, 1.0, [1.0; 4]).len(), 12);
    }
}
