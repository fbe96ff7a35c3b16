//! Pop fragments
//!
//! A burst is three layers: a few heavy chunks, a medium layer and a cloud of
//! fast dust. Fragments drift under air resistance and gravity while fading
//! out. Integration is budgeted per tick; fragments past the budget carry their
//! time forward and catch up on a later tick.

use glam::Vec2;
use std::f32::consts::TAU;

use super::state::{FieldState, Fragment, FragmentTier};
use super::uniform;
use crate::consts::*;
use crate::settings::PerformanceTier;
use crate::{direction, shade};

/// Per-tier spawn parameters
struct TierSpec {
    tier: FragmentTier,
    speed: (f32, f32),
    /// Size as a fraction of the parent radius
    size: (f32, f32),
    fade: (f32, f32),
    spin: f32,
}

const CHUNK: TierSpec = TierSpec {
    tier: FragmentTier::Chunk,
    speed: (1.5, 3.5),
    size: (0.28, 0.4),
    fade: (0.012, 0.016),
    spin: 0.08,
};

const MEDIUM: TierSpec = TierSpec {
    tier: FragmentTier::Medium,
    speed: (2.5, 5.5),
    size: (0.14, 0.22),
    fade: (0.018, 0.024),
    spin: 0.15,
};

const DUST: TierSpec = TierSpec {
    tier: FragmentTier::Dust,
    speed: (4.0, 8.0),
    size: (0.04, 0.08),
    fade: (0.026, 0.034),
    spin: 0.3,
};

/// Fragments per layer for a burst at the given performance tier
pub fn burst_counts(tier: PerformanceTier) -> (usize, usize, usize) {
    let chunks = ((CHUNK_COUNT as f32 * tier.chunk_scale()).round() as usize).max(1);
    (chunks, MEDIUM_COUNT, DUST_COUNT)
}

/// Spawn a burst at `origin`; returns the number of fragments added
///
/// Every spawned fragment lives until it fades or falls away. The tier cap
/// only limits how many are drawn.
pub fn spawn_burst(
    state: &mut FieldState,
    origin: Vec2,
    color: [f32; 4],
    radius: f32,
    tier: PerformanceTier,
) -> usize {
    let (chunks, mediums, dust) = burst_counts(tier);
    let before = state.fragments.len();
    for (spec, count) in [(&CHUNK, chunks), (&MEDIUM, mediums), (&DUST, dust)] {
        for _ in 0..count {
            let fragment = spawn_fragment(state, spec, origin, color, radius);
            state.fragments.push(fragment);
        }
    }
    state.fragments.len() - before
}

fn spawn_fragment(
    state: &mut FieldState,
    spec: &TierSpec,
    origin: Vec2,
    color: [f32; 4],
    radius: f32,
) -> Fragment {
    let rng = &mut state.rng;
    let heading = direction(uniform(rng, 0.0, TAU));
    let speed = uniform(rng, spec.speed.0, spec.speed.1);
    // Start somewhere on the balloon skin, not all from the center
    let start = heading * uniform(rng, 0.0, radius * 0.3);

    Fragment {
        origin,
        offset: start,
        vel: heading * speed,
        rotation: uniform(rng, 0.0, TAU),
        rotation_speed: uniform(rng, -spec.spin, spec.spin),
        opacity: 1.0,
        fade: uniform(rng, spec.fade.0, spec.fade.1),
        size: radius * uniform(rng, spec.size.0, spec.size.1),
        color: shade(color, uniform(rng, 0.75, 1.15)),
        tier: spec.tier,
        pending: 0.0,
    }
}

impl Fragment {
    /// Advance by `delta` nominal frames
    pub fn integrate(&mut self, delta: f32) {
        if delta <= 0.0 {
            return;
        }
        self.vel *= AIR_RESISTANCE.powf(delta);
        self.vel.y += GRAVITY * delta;
        self.offset += self.vel * delta;
        self.rotation += self.rotation_speed * delta;
        self.opacity = (self.opacity - self.fade * delta).max(0.0);
    }

    /// Faded out or fallen well below the surface
    pub fn is_spent(&self, surface_height: f32) -> bool {
        self.opacity <= OPACITY_EPSILON || self.pos().y > surface_height + OFFSCREEN_MARGIN
    }
}

/// Counts from one integration pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IntegrateReport {
    pub integrated: usize,
    pub deferred: usize,
    pub removed: usize,
}

/// Integrate up to `budget` fragments (round-robin) and drop spent ones
pub fn integrate(state: &mut FieldState, delta: f32, budget: usize) -> IntegrateReport {
    let mut report = IntegrateReport::default();
    let n = state.fragments.len();
    if n == 0 {
        state.particle_cursor = 0;
        return report;
    }

    let budget = budget.clamp(1, n);
    let start = state.particle_cursor % n;
    for (i, fragment) in state.fragments.iter_mut().enumerate() {
        let slot = (i + n - start) % n;
        if slot < budget {
            let dt = fragment.pending + delta;
            fragment.pending = 0.0;
            fragment.integrate(dt);
            report.integrated += 1;
        } else {
            fragment.pending += delta;
            report.deferred += 1;
        }
    }
    state.particle_cursor = (start + budget) % n;

    let height = state.surface.height;
    state.fragments.retain(|f| !f.is_spent(height));
    report.removed = n - state.fragments.len();
    if state.fragments.is_empty() {
        state.particle_cursor = 0;
    }
    report
}

/// Periodic trim of nearly invisible fragments; returns how many were dropped
pub fn sweep(state: &mut FieldState) -> usize {
    if state.time_ms - state.last_sweep_ms < SWEEP_INTERVAL_MS {
        return 0;
    }
    state.last_sweep_ms = state.time_ms;
    let before = state.fragments.len();
    state.fragments.retain(|f| f.opacity >= SWEEP_OPACITY);
    let dropped = before - state.fragments.len();
    if dropped > 0 {
        log::debug!("Sweep dropped {} faded fragments", dropped);
    }
    dropped
}
