//! Pop and restore transitions
//!
//! A pop marks the balloon popped, bursts it into fragments, and schedules the
//! detail reveal. The balloon comes back only when the detail view is observed
//! going from visible to hidden.

use std::f32::consts::TAU;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::particles;
use super::state::{BalloonColor, BalloonState, FieldState};
use super::uniform;
use crate::consts::{REVEAL_DELAY_MS, RESTORE_JITTER};
use crate::content::LookupQuery;
use crate::settings::{PerformanceTier, Settings};

/// Which labels may be popped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    /// The one label open to everyone; `None` leaves every label open
    pub free_sample_label: Option<String>,
    /// Entitled users may pop anything
    pub entitled: bool,
}

impl Entitlement {
    /// No gate at all
    pub fn open() -> Self {
        Self::default()
    }

    pub fn allows(&self, label: &str) -> bool {
        match &self.free_sample_label {
            _ if self.entitled => true,
            None => true,
            Some(free) => free == label,
        }
    }
}

/// Detail view request for a popped balloon
#[derive(Debug, Clone, PartialEq)]
pub struct Reveal {
    pub id: u32,
    pub label: String,
    pub color: BalloonColor,
}

/// Result of a pop request
#[derive(Debug, Clone, PartialEq)]
pub enum PopOutcome {
    /// Unknown or already popped
    Ignored,
    /// The entitlement gate refused the label
    Gated { label: String },
    Popped {
        query: LookupQuery,
        fragments: usize,
    },
}

/// Transition reported by `VisibilityEdge::observe`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    None,
    Shown,
    Hidden,
}

/// Two-state edge detector for the host-owned detail flag
#[derive(Debug, Clone, Copy, Default)]
pub struct VisibilityEdge {
    previous: bool,
    current: bool,
    primed: bool,
}

impl VisibilityEdge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the flag; the first observation only primes the detector
    pub fn observe(&mut self, visible: bool) -> Edge {
        if !self.primed {
            self.primed = true;
            self.previous = visible;
            self.current = visible;
            return Edge::None;
        }
        self.previous = self.current;
        self.current = visible;
        match (self.previous, self.current) {
            (false, true) => Edge::Shown,
            (true, false) => Edge::Hidden,
            _ => Edge::None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.current
    }
}

/// Owns the pop side of the balloon lifecycle
#[derive(Debug, Clone)]
pub struct PopManager {
    tier: PerformanceTier,
    particles: bool,
    entitlement: Entitlement,
    /// (due time ms, request)
    pending_reveal: Option<(f64, Reveal)>,
    /// Popped balloons to bring back on the next hide edge
    awaiting_restore: Vec<u32>,
    detail: VisibilityEdge,
}

impl PopManager {
    pub fn new(settings: &Settings) -> Self {
        Self {
            tier: settings.tier,
            particles: settings.particles,
            entitlement: settings.entitlement(),
            pending_reveal: None,
            awaiting_restore: Vec::new(),
            detail: VisibilityEdge::new(),
        }
    }

    /// Pop balloon `id` at host time `now_ms`
    pub fn pop(&mut self, state: &mut FieldState, id: u32, now_ms: f64) -> PopOutcome {
        let Some(balloon) = state.balloon_mut(id) else {
            return PopOutcome::Ignored;
        };
        if balloon.is_popped() {
            return PopOutcome::Ignored;
        }
        if !self.entitlement.allows(&balloon.label) {
            log::info!("Pop of '{}' gated", balloon.label);
            return PopOutcome::Gated {
                label: balloon.label.clone(),
            };
        }

        // Burst where the balloon was last drawn
        let origin = balloon.display_pos();
        let radius = balloon.radius();
        let color = balloon.color;
        let label = balloon.label.clone();

        balloon.state = BalloonState::Popped;
        balloon.hovering = false;
        balloon.pressed = false;
        balloon.z_order = balloon.resting_z;

        let fragments = if self.particles {
            particles::spawn_burst(state, origin, color.rgba(), radius, self.tier)
        } else {
            0
        };

        log::info!("Popped balloon {} ('{}'), {} fragments", id, label, fragments);

        self.pending_reveal = Some((
            now_ms + REVEAL_DELAY_MS,
            Reveal {
                id,
                label: label.clone(),
                color,
            },
        ));
        if !self.awaiting_restore.contains(&id) {
            self.awaiting_restore.push(id);
        }

        PopOutcome::Popped {
            query: LookupQuery::for_label(&label),
            fragments,
        }
    }

    /// The scheduled reveal, once its delay has passed
    pub fn poll_reveal(&mut self, now_ms: f64) -> Option<Reveal> {
        match &self.pending_reveal {
            Some((due, _)) if now_ms >= *due => self.pending_reveal.take().map(|(_, r)| r),
            _ => None,
        }
    }

    pub fn has_pending_reveal(&self) -> bool {
        self.pending_reveal.is_some()
    }

    /// Feed the host's detail flag; returns the ids restored on a hide edge
    pub fn observe_detail(&mut self, visible: bool, state: &mut FieldState) -> Vec<u32> {
        if self.detail.observe(visible) != Edge::Hidden {
            return Vec::new();
        }
        std::mem::take(&mut self.awaiting_restore)
            .into_iter()
            .filter(|&id| restore(state, id))
            .collect()
    }

    pub fn awaiting_restore(&self) -> &[u32] {
        &self.awaiting_restore
    }

    /// Forget popped ids after the field is laid out again
    ///
    /// A scheduled reveal survives: its lookup has already gone out.
    pub fn relayout(&mut self) {
        self.awaiting_restore.clear();
    }

    /// Drop scheduled work at teardown
    pub fn cancel(&mut self) {
        self.pending_reveal = None;
        self.awaiting_restore.clear();
    }
}

/// Bring a popped balloon back near where it was; returns false if it was not popped
pub fn restore(state: &mut FieldState, id: u32) -> bool {
    if !state.balloon(id).is_some_and(|b| b.is_popped()) {
        return false;
    }

    let surface = state.surface;
    let rng = &mut state.rng;
    let float_phase = uniform(rng, 0.0, TAU);
    let sway_phase = uniform(rng, 0.0, TAU);
    let jitter = Vec2::new(
        uniform(rng, -RESTORE_JITTER, RESTORE_JITTER),
        uniform(rng, -RESTORE_JITTER, RESTORE_JITTER),
    );

    let Some(balloon) = state.balloon_mut(id) else {
        return false;
    };
    let nudged = balloon.pos + jitter;
    balloon.pos = Vec2::new(
        nudged.x.clamp(0.0, surface.width.max(0.0)),
        nudged.y.clamp(0.0, surface.height.max(0.0)),
    );
    balloon.float_phase = float_phase;
    balloon.sway_phase = sway_phase;
    balloon.state = BalloonState::Active;
    balloon.culled = false;
    log::info!("Restored balloon {}", id);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{CHUNK_COUNT, DUST_COUNT, MEDIUM_COUNT};
    use crate::sim::state::{Intent, Surface};
    use crate::sim::test_support::balloon_at;
    use crate::sim::tick::{TickInput, tick};
    use proptest::prelude::*;

    fn high_settings() -> Settings {
        Settings {
            tier: PerformanceTier::High,
            ..Settings::default()
        }
    }

    fn field() -> FieldState {
        let mut state = FieldState::new(7, Surface::new(1280.0, 720.0));
        state.balloons = (0..10)
            .map(|i| balloon_at(i, 100.0 + i as f32 * 100.0, 300.0, i as i32))
            .collect();
        state
    }

    #[test]
    fn test_pop_spawns_burst_and_schedules_reveal() {
        let mut state = field();
        let mut manager = PopManager::new(&high_settings());
        let outcome = manager.pop(&mut state, 7, 1000.0);

        let PopOutcome::Popped { query, fragments } = outcome else {
            panic!("expected pop, got {:?}", outcome);
        };
        assert_eq!(query, LookupQuery::for_label("s"));
        assert_eq!(fragments, CHUNK_COUNT + MEDIUM_COUNT + DUST_COUNT);
        assert_eq!(state.fragments.len(), fragments);
        assert!(state.balloon(7).unwrap().is_popped());

        assert_eq!(manager.poll_reveal(1000.0 + REVEAL_DELAY_MS - 1.0), None);
        let reveal = manager.poll_reveal(1000.0 + REVEAL_DELAY_MS).unwrap();
        assert_eq!(reveal.id, 7);
        assert_eq!(manager.poll_reveal(5000.0), None);
    }

    #[test]
    fn test_pop_is_idempotent() {
        let mut state = field();
        let mut manager = PopManager::new(&high_settings());
        manager.pop(&mut state, 2, 0.0);
        let count = state.fragments.len();

        assert_eq!(manager.pop(&mut state, 2, 10.0), PopOutcome::Ignored);
        assert_eq!(state.fragments.len(), count);
        assert_eq!(manager.pop(&mut state, 99, 10.0), PopOutcome::Ignored);
    }

    #[test]
    fn test_pop_clears_drag_flags() {
        let mut state = field();
        {
            let b = state.balloon_mut(4).unwrap();
            b.state = BalloonState::Dragging;
            b.pressed = true;
            b.hovering = true;
            b.z_order = crate::consts::DRAG_Z;
        }
        let mut manager = PopManager::new(&high_settings());
        manager.pop(&mut state, 4, 0.0);
        let b = state.balloon(4).unwrap();
        assert!(!b.pressed && !b.hovering);
        assert_eq!(b.z_order, b.resting_z);
        assert_eq!(state.dragging_id(), None);
    }

    #[test]
    fn test_reveal_then_hide_restores_once() {
        let mut state = field();
        let before = state.balloon(7).unwrap().pos;
        let mut manager = PopManager::new(&high_settings());
        manager.pop(&mut state, 7, 0.0);
        assert!(manager.poll_reveal(REVEAL_DELAY_MS).is_some());

        assert!(manager.observe_detail(true, &mut state).is_empty());
        assert_eq!(manager.observe_detail(false, &mut state), vec![7]);
        // Redundant notifications do nothing
        assert!(manager.observe_detail(false, &mut state).is_empty());

        let b = state.balloon(7).unwrap();
        assert_eq!(b.state, BalloonState::Active);
        assert!(b.pos.distance(before) <= 20.0);
    }

    #[test]
    fn test_first_observation_never_restores() {
        let mut state = field();
        let mut manager = PopManager::new(&high_settings());
        manager.pop(&mut state, 1, 0.0);
        assert!(manager.observe_detail(false, &mut state).is_empty());
        assert!(state.balloon(1).unwrap().is_popped());
    }

    #[test]
    fn test_hide_restores_every_balloon_popped_while_open() {
        let mut state = field();
        let mut manager = PopManager::new(&high_settings());
        manager.observe_detail(false, &mut state);
        manager.pop(&mut state, 1, 0.0);
        manager.observe_detail(true, &mut state);
        manager.pop(&mut state, 2, 100.0);
        assert_eq!(manager.observe_detail(false, &mut state), vec![1, 2]);
        assert_eq!(state.active_count(), 10);
    }

    #[test]
    fn test_gate_refuses_all_but_free_sample() {
        let mut state = field();
        state.balloon_mut(3).unwrap().label = "r".to_string();
        let settings = Settings {
            free_sample_label: Some("r".to_string()),
            entitled: false,
            ..high_settings()
        };
        let mut manager = PopManager::new(&settings);

        assert_eq!(
            manager.pop(&mut state, 0, 0.0),
            PopOutcome::Gated {
                label: "s".to_string()
            }
        );
        assert!(!state.balloon(0).unwrap().is_popped());
        assert!(state.fragments.is_empty());
        assert!(!manager.has_pending_reveal());

        assert!(matches!(manager.pop(&mut state, 3, 0.0), PopOutcome::Popped { .. }));
    }

    #[test]
    fn test_entitlement_allows() {
        let gate = Entitlement {
            free_sample_label: Some("m".into()),
            entitled: false,
        };
        assert!(gate.allows("m"));
        assert!(!gate.allows("p"));
        assert!(Entitlement { entitled: true, ..gate }.allows("p"));
        assert!(Entitlement::open().allows("anything"));
    }

    #[test]
    fn test_particles_disabled_still_pops() {
        let mut state = field();
        let settings = Settings {
            particles: false,
            ..high_settings()
        };
        let mut manager = PopManager::new(&settings);
        let outcome = manager.pop(&mut state, 0, 0.0);
        assert!(matches!(outcome, PopOutcome::Popped { fragments: 0, .. }));
        assert!(state.fragments.is_empty());
    }

    #[test]
    fn test_burst_starts_where_balloon_was_drawn() {
        let mut state = field();
        {
            let b = state.balloon_mut(5).unwrap();
            b.float_phase = 1.2;
            b.sway_phase = 0.4;
        }
        let drawn = state.balloon(5).unwrap().display_pos();
        assert_ne!(drawn, state.balloon(5).unwrap().pos);

        let mut manager = PopManager::new(&high_settings());
        manager.pop(&mut state, 5, 0.0);
        assert!(!state.fragments.is_empty());
        assert!(state.fragments.iter().all(|f| f.origin == drawn));
    }

    #[test]
    fn test_burst_of_dragged_balloon_starts_at_pointer() {
        let mut state = field();
        state.balloon_mut(3).unwrap().float_phase = 0.9;
        let target = Vec2::new(640.0, 120.0);
        state.push_intent(Intent::BeginDrag { id: 3 });
        state.push_intent(Intent::MoveTo {
            id: 3,
            pos: Vec2::new(500.0, 200.0),
        });
        state.push_intent(Intent::MoveTo { id: 3, pos: target });
        tick(&mut state, &TickInput::default(), |_, _| {});

        let mut manager = PopManager::new(&high_settings());
        manager.pop(&mut state, 3, 0.0);
        assert!(!state.fragments.is_empty());
        assert!(state.fragments.iter().all(|f| f.origin == target));
    }

    #[test]
    fn test_restore_requires_popped() {
        let mut state = field();
        assert!(!restore(&mut state, 0));
        assert!(!restore(&mut state, 500));
    }

    proptest! {
        #[test]
        fn prop_restore_stays_within_jitter_bound(
            seed in any::<u64>(),
            x in 0.0f32..800.0,
            y in 0.0f32..600.0,
        ) {
            let mut state = FieldState::new(seed, Surface::new(800.0, 600.0));
            let mut b = balloon_at(0, x, y, 0);
            b.state = BalloonState::Popped;
            state.balloons = vec![b];

            prop_assert!(restore(&mut state, 0));
            let b = state.balloon(0).unwrap();
            prop_assert_eq!(b.state, BalloonState::Active);
            prop_assert!(b.pos.distance(Vec2::new(x, y)) <= 20.0);
            prop_assert!(b.pos.x >= 0.0 && b.pos.x <= 800.0);
            prop_assert!(b.pos.y >= 0.0 && b.pos.y <= 600.0);
        }
    }
}
