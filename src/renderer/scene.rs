//! Per-frame geometry for the balloon field
//!
//! Draw order: tethers, anchors, balloons by ascending z, then fragments.
//! Labels are not rasterized here; they are handed to the host's text layer.

use glam::Vec2;

use super::shapes;
use super::vertex::{Vertex, colors};
use crate::sim::{AnchorGroup, Balloon, FieldState, Fragment};
use crate::{quadratic_bezier, shade};

/// Hovered balloons are drawn this much larger
const HOVER_GROW: f32 = 1.05;
/// Balloon bodies are slightly taller than wide
const BODY_STRETCH: f32 = 1.15;
const BODY_SEGMENTS: u32 = 32;
const TETHER_SEGMENTS: usize = 12;
const TETHER_WIDTH: f32 = 1.5;
/// Horizontal sag of the tether control point at full sway
const TETHER_SAG: f32 = 14.0;
const ANCHOR_RADIUS: f32 = 4.0;
const ANCHOR_SEGMENTS: u32 = 12;

/// Text to draw over a balloon
#[derive(Debug, Clone, PartialEq)]
pub struct LabelSprite {
    pub text: String,
    /// Center, surface pixels
    pub position: Vec2,
    /// Font size in surface pixels
    pub size: f32,
    pub color: [f32; 4],
}

/// Everything needed to draw one frame
#[derive(Debug, Clone, Default)]
pub struct FrameGeometry {
    /// Triangle list in surface pixels
    pub vertices: Vec<Vertex>,
    /// Labels in draw order
    pub labels: Vec<LabelSprite>,
}

fn drawn_radius(balloon: &Balloon) -> f32 {
    let r = balloon.radius();
    if balloon.hovering { r * HOVER_GROW } else { r }
}

/// Tether curve from the anchor to the bottom of the balloon
fn tether_points(balloon: &Balloon, anchor: Vec2) -> Vec<Vec2> {
    let center = balloon.display_pos();
    let bottom = center + Vec2::new(0.0, drawn_radius(balloon) * BODY_STRETCH);
    let mid = (anchor + bottom) * 0.5;
    let control = mid + Vec2::new(balloon.sway_phase.sin() * TETHER_SAG, 0.0);
    (0..=TETHER_SEGMENTS)
        .map(|i| quadratic_bezier(anchor, control, bottom, i as f32 / TETHER_SEGMENTS as f32))
        .collect()
}

fn push_balloon(out: &mut FrameGeometry, balloon: &Balloon) {
    let center = balloon.display_pos();
    let r = drawn_radius(balloon);
    let base = balloon.color.rgba();
    let body = if balloon.pressed { shade(base, 0.85) } else { base };

    out.vertices.extend(shapes::ellipse(
        center,
        Vec2::new(r, r * BODY_STRETCH),
        body,
        BODY_SEGMENTS,
    ));
    out.vertices.extend(shapes::ellipse(
        center + Vec2::new(-r * 0.35, -r * 0.45),
        Vec2::new(r * 0.22, r * 0.3),
        colors::HIGHLIGHT,
        12,
    ));
    out.vertices.extend(shapes::knot(
        center + Vec2::new(0.0, r * BODY_STRETCH - 1.0),
        r * 0.15,
        shade(base, 0.8),
    ));
    out.labels.push(LabelSprite {
        text: balloon.label.clone(),
        position: center,
        size: r * 0.8,
        color: colors::LABEL,
    });
}

fn push_fragment(out: &mut FrameGeometry, fragment: &Fragment) {
    let mut color = fragment.color;
    color[3] *= fragment.opacity.clamp(0.0, 1.0);
    out.vertices.extend(shapes::rotated_quad(
        fragment.pos(),
        fragment.size,
        fragment.rotation,
        color,
    ));
}

/// Build the frame for the current field
///
/// Only the newest `max_fragments` fragments are drawn.
pub fn build_frame(state: &FieldState, max_fragments: usize) -> FrameGeometry {
    let mut out = FrameGeometry::default();

    let mut visible: Vec<&Balloon> = state
        .balloons
        .iter()
        .filter(|b| !b.is_popped() && !b.culled)
        .collect();
    visible.sort_by_key(|b| (b.z_order, b.id));

    for balloon in &visible {
        let anchor = balloon.group.anchor_point(&state.surface);
        out.vertices.extend(shapes::polyline(
            &tether_points(balloon, anchor),
            TETHER_WIDTH,
            colors::TETHER,
        ));
    }
    for group in [AnchorGroup::Left, AnchorGroup::Right] {
        if visible.iter().any(|b| b.group == group) {
            out.vertices.extend(shapes::circle(
                group.anchor_point(&state.surface),
                ANCHOR_RADIUS,
                colors::ANCHOR,
                ANCHOR_SEGMENTS,
            ));
        }
    }
    for balloon in &visible {
        push_balloon(&mut out, balloon);
    }
    let skip = state.fragments.len().saturating_sub(max_fragments);
    for fragment in state.fragments.iter().skip(skip) {
        push_fragment(&mut out, fragment);
    }

    out
}
