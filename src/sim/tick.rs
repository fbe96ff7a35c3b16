//! Frame-clocked simulation tick
//!
//! One tick per animation frame: apply queued intents, advance idle motion,
//! cull, then integrate fragments.

use glam::Vec2;

use super::particles::{self, IntegrateReport};
use super::state::{BalloonState, FieldState, Intent};
use crate::consts::*;

/// Per-tick parameters
#[derive(Debug, Clone, Copy)]
pub struct TickInput {
    /// Elapsed time in nominal frames (from `FrameClock`)
    pub delta: f32,
    /// Max fragments integrated this tick
    pub particle_budget: usize,
}

impl Default for TickInput {
    fn default() -> Self {
        Self {
            delta: 1.0,
            particle_budget: usize::MAX,
        }
    }
}

/// What happened during a tick
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub pops: usize,
    pub culled: usize,
    pub particles: IntegrateReport,
    pub swept: usize,
}

/// Advance the field by one frame
///
/// `on_pop` receives every pop intent in queue order, with the field already
/// updated by the intents queued before it.
pub fn tick<F>(state: &mut FieldState, input: &TickInput, mut on_pop: F) -> TickReport
where
    F: FnMut(&mut FieldState, u32),
{
    let mut report = TickReport {
        pops: apply_intents(state, &mut on_pop),
        ..Default::default()
    };

    let delta = input.delta.max(0.0);
    state.tick_count += 1;
    state.time_ms += delta as f64 * NOMINAL_FRAME_MS;

    let surface = state.surface;
    for balloon in &mut state.balloons {
        if balloon.is_popped() {
            balloon.culled = true;
            continue;
        }

        balloon.float_phase += balloon.float_speed * delta;
        balloon.sway_phase += balloon.sway_speed * delta;

        if !balloon.float_phase.is_finite() || !balloon.sway_phase.is_finite() {
            log::warn!("Balloon {} phase went non-finite, resetting", balloon.id);
            balloon.float_phase = 0.0;
            balloon.sway_phase = 0.0;
        }
        if !balloon.pos.is_finite() {
            log::warn!("Balloon {} position went non-finite, recentering", balloon.id);
            balloon.pos = Vec2::new(surface.width * 0.5, surface.height * 0.5);
        }

        // Draw-only cull: phases above still advance
        let p = balloon.display_pos();
        let margin = balloon.radius() * 2.0;
        balloon.culled = p.x < -margin
            || p.y < -margin
            || p.x > surface.width + margin
            || p.y > surface.height + margin;
        if balloon.culled {
            report.culled += 1;
        }
    }

    report.particles = particles::integrate(state, delta, input.particle_budget);
    report.swept = particles::sweep(state);
    report
}

/// Apply and clear the intent queue; returns the number of pops forwarded
fn apply_intents<F>(state: &mut FieldState, on_pop: &mut F) -> usize
where
    F: FnMut(&mut FieldState, u32),
{
    let mut pops = 0;
    let intents = std::mem::take(&mut state.intents);
    for intent in intents {
        match intent {
            Intent::BeginDrag { id } => begin_drag(state, id),
            Intent::MoveTo { id, pos } => {
                let surface = state.surface;
                if let Some(b) = state.balloon_mut(id) {
                    if b.state == BalloonState::Dragging {
                        b.pos = Vec2::new(
                            pos.x.clamp(0.0, surface.width),
                            pos.y.clamp(0.0, surface.height),
                        );
                        b.z_order = DRAG_Z;
                    }
                }
            }
            Intent::Hover { ids } => {
                for b in state.balloons.iter_mut().filter(|b| !b.is_popped()) {
                    b.hovering = ids.contains(&b.id);
                    b.z_order = match b.state {
                        BalloonState::Dragging => DRAG_Z,
                        _ if b.hovering => HOVER_Z,
                        _ => b.resting_z,
                    };
                }
            }
            Intent::Release => release(state),
            Intent::Pop { id } => {
                if state.balloon(id).is_some_and(|b| !b.is_popped()) {
                    on_pop(state, id);
                    pops += 1;
                }
            }
        }
    }
    pops
}

fn begin_drag(state: &mut FieldState, id: u32) {
    if !state.balloon(id).is_some_and(|b| !b.is_popped()) {
        return;
    }
    // Only one balloon can be held
    if state.dragging_id().is_some_and(|held| held != id) {
        release(state);
    }
    if let Some(b) = state.balloon_mut(id) {
        b.state = BalloonState::Dragging;
        b.pressed = true;
        b.z_order = DRAG_Z;
    }
}

fn release(state: &mut FieldState) {
    let mut released = None;
    for b in &mut state.balloons {
        if b.state == BalloonState::Dragging {
            b.state = BalloonState::Active;
            released = Some(b.id);
        }
        b.pressed = false;
    }
    if let Some(id) = released {
        restack(state, id);
    }
    for b in state.balloons.iter_mut().filter(|b| !b.is_popped()) {
        b.z_order = if b.hovering { HOVER_Z } else { b.resting_z };
    }
}

/// Renumber resting z to `0..n` in current stacking order with `front` on top
///
/// Keeps resting z below `HOVER_Z` no matter how many drags have happened.
fn restack(state: &mut FieldState, front: u32) {
    let mut order: Vec<(i32, u32)> = state
        .balloons
        .iter()
        .filter(|b| b.id != front)
        .map(|b| (b.resting_z, b.id))
        .collect();
    order.sort_unstable();
    order.push((0, front));
    for (z, (_, id)) in order.into_iter().enumerate() {
        if let Some(b) = state.balloon_mut(id) {
            b.resting_z = z as i32;
        }
    }
}
