//! Initial balloon placement
//!
//! Balloons are split into two anchor groups. Each group's vertical extent is
//! cut into bands, and every balloon gets a handful of random draws inside its
//! band's region. The first draw that keeps clear of already placed balloons
//! wins; if none does, the last draw is kept anyway. Some overlap (up to ~35%)
//! is allowed so the bunches look full.

use glam::Vec2;
use std::f32::consts::TAU;
use thiserror::Error;

use super::state::{AnchorGroup, Balloon, BalloonColor, BalloonState, FieldState, Surface};
use super::uniform;
use crate::consts::*;

/// Reasons a field cannot be laid out right now
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    /// Host has not measured the surface yet; retry shortly
    #[error("surface is not measured yet ({width}x{height})")]
    Unmeasured { width: f32, height: f32 },
    #[error("label list is empty")]
    NoLabels,
}

/// Outcome of a placement pass
#[derive(Debug, Clone, Default)]
pub struct PlacementReport {
    /// Balloons whose attempt budget ran out (placed at their last draw)
    pub exhausted: Vec<u32>,
    /// Total random draws made
    pub draws: u32,
}

/// Horizontal/vertical region a balloon may be drawn in
#[derive(Debug, Clone, Copy)]
pub struct PlacementRegion {
    pub min: Vec2,
    pub max: Vec2,
}

impl PlacementRegion {
    /// Region for `band` (0 = top, farthest from the anchor) of `group`
    pub fn for_band(group: AnchorGroup, band: usize, surface: &Surface) -> Self {
        let top = BALLOON_RADIUS * MAX_SCALE;
        let bottom = (surface.height * FIELD_BOTTOM).max(top + 1.0);
        let band_height = (bottom - top) / PLACEMENT_BANDS as f32;
        let y0 = top + band as f32 * band_height;

        // Bands closer to the anchor hug the column
        let widen = 1.0 - 0.15 * band as f32;
        let half_width = (surface.width * 0.22 * widen).max(BALLOON_RADIUS);
        let column = group.column_x(surface);
        let (gx0, gx1) = group.x_range(surface);

        Self {
            min: Vec2::new((column - half_width).max(gx0), y0),
            max: Vec2::new((column + half_width).min(gx1), y0 + band_height),
        }
    }

    fn draw(&self, rng: &mut impl rand::Rng) -> Vec2 {
        Vec2::new(
            uniform(rng, self.min.x, self.max.x),
            uniform(rng, self.min.y, self.max.y),
        )
    }
}

/// True if `candidate` keeps clear of every placed, non-popped balloon
pub fn is_clear(candidate: Vec2, radius: f32, placed: &[Balloon]) -> bool {
    placed.iter().filter(|b| !b.is_popped()).all(|b| {
        let min_dist = OVERLAP_FACTOR * (radius + b.radius());
        candidate.distance(b.pos) >= min_dist
    })
}

/// Replace the field's balloons with a freshly placed set of `count`
///
/// Ids run from 0 in placement order (left group first). Labels and colors are
/// assigned by id, so a given index always carries the same phoneme.
pub fn generate_field(
    state: &mut FieldState,
    count: usize,
    labels: &[String],
) -> Result<PlacementReport, LayoutError> {
    let surface = state.surface;
    if surface.is_unmeasured() {
        return Err(LayoutError::Unmeasured {
            width: surface.width,
            height: surface.height,
        });
    }
    if labels.is_empty() {
        return Err(LayoutError::NoLabels);
    }

    let left_count = count.div_ceil(2);
    let mut report = PlacementReport::default();
    let mut placed: Vec<Balloon> = Vec::with_capacity(count);

    for index in 0..count {
        let (group, local) = if index < left_count {
            (AnchorGroup::Left, index)
        } else {
            (AnchorGroup::Right, index - left_count)
        };
        let band = local % PLACEMENT_BANDS;
        let region = PlacementRegion::for_band(group, band, &surface);

        let scale = uniform(&mut state.rng, MIN_SCALE, MAX_SCALE);
        let radius = BALLOON_RADIUS * scale;

        let mut pos = Vec2::ZERO;
        let mut settled = false;
        for _ in 0..PLACEMENT_ATTEMPTS {
            pos = surface.clamp_center(region.draw(&mut state.rng), radius);
            report.draws += 1;
            if is_clear(pos, radius, &placed) {
                settled = true;
                break;
            }
        }

        let id = index as u32;
        if !settled {
            report.exhausted.push(id);
        }

        let anchor = group.anchor_point(&surface);
        placed.push(Balloon {
            id,
            pos,
            scale,
            color: BalloonColor::for_index(index),
            label: labels[index % labels.len()].clone(),
            group,
            z_order: id as i32,
            resting_z: id as i32,
            state: BalloonState::Active,
            hovering: false,
            pressed: false,
            float_phase: uniform(&mut state.rng, 0.0, TAU),
            sway_phase: uniform(&mut state.rng, 0.0, TAU),
            float_speed: uniform(&mut state.rng, FLOAT_SPEED_MIN, FLOAT_SPEED_MAX),
            sway_speed: uniform(&mut state.rng, SWAY_SPEED_MIN, SWAY_SPEED_MAX),
            tether_length: pos.distance(anchor),
            culled: false,
        });
    }

    if !report.exhausted.is_empty() {
        log::debug!(
            "Placement budget exhausted for {} of {} balloons",
            report.exhausted.len(),
            count
        );
    }
    log::info!(
        "Placed {} balloons on {}x{} surface ({} draws)",
        count,
        surface.width,
        surface.height,
        report.draws
    );

    state.balloons = placed;
    state.fragments.clear();
    state.intents.clear();
    state.particle_cursor = 0;
    state.normalize_order();
    Ok(report)
}
