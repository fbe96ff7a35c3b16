//! Point-to-balloon hit testing
//!
//! Hit regions are circles around the balloon's drawn position. They grow on
//! touch/small screens and near the edges, where fingers are least precise.

use glam::Vec2;

use super::state::{Balloon, Surface};
use crate::consts::*;

/// Hit radius of `balloon` for a pointer at `point`
pub fn hit_radius(balloon: &Balloon, point: Vec2, surface: &Surface) -> f32 {
    let mut radius = balloon.radius();
    if surface.touch || surface.is_small() {
        radius *= TOUCH_HIT_BOOST;
    }
    let near_edge = point.x < EDGE_MARGIN
        || point.y < EDGE_MARGIN
        || point.x > surface.width - EDGE_MARGIN
        || point.y > surface.height - EDGE_MARGIN;
    if near_edge {
        radius *= EDGE_HIT_BOOST;
    }
    radius
}

/// Whether `point` falls inside the balloon's hit region
pub fn contains(balloon: &Balloon, point: Vec2, surface: &Surface) -> bool {
    let r = hit_radius(balloon, point, surface);
    balloon.display_pos().distance_squared(point) <= r * r
}

/// Topmost non-popped balloon under `point` (highest z, then highest id)
pub fn pick<'a>(balloons: &'a [Balloon], point: Vec2, surface: &Surface) -> Option<&'a Balloon> {
    balloons
        .iter()
        .filter(|b| !b.is_popped() && contains(b, point, surface))
        .max_by_key(|b| (b.z_order, b.id))
}

/// Ids of every non-popped balloon under `point`, in id order
pub fn pick_all(balloons: &[Balloon], point: Vec2, surface: &Surface) -> Vec<u32> {
    balloons
        .iter()
        .filter(|b| !b.is_popped() && contains(b, point, surface))
        .map(|b| b.id)
        .collect()
}
