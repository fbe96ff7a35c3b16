//! Pointer gesture state machine
//!
//! Mouse and touch arrive as one `PointerEvent` vocabulary. A press on a
//! balloon starts a drag; a second press on the same balloon within
//! `DOUBLE_ACTIVATION_MS` pops it instead. Moves drag the held balloon or
//! update the hover set. Nothing here mutates balloons: every decision is
//! queued as an `Intent` for the next tick.

use glam::Vec2;

use super::picker;
use super::state::{FieldState, Intent};
use crate::consts::DOUBLE_ACTIVATION_MS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Mouse,
    Touch,
    Pen,
}

impl PointerKind {
    /// Map a DOM `pointerType` string
    pub fn from_dom(pointer_type: &str) -> Self {
        match pointer_type {
            "touch" => PointerKind::Touch,
            "pen" => PointerKind::Pen,
            _ => PointerKind::Mouse,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    /// Pointer left the surface or the gesture was cancelled
    Leave,
}

/// A unified mouse/touch event in surface-local CSS pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub phase: PointerPhase,
    pub pos: Vec2,
    /// Event timestamp (ms)
    pub time_ms: f64,
}

impl PointerEvent {
    pub fn new(kind: PointerKind, phase: PointerPhase, pos: Vec2, time_ms: f64) -> Self {
        Self {
            kind,
            phase,
            pos,
            time_ms,
        }
    }

    pub fn down(pos: Vec2, time_ms: f64) -> Self {
        Self::new(PointerKind::Mouse, PointerPhase::Down, pos, time_ms)
    }

    pub fn moved(pos: Vec2, time_ms: f64) -> Self {
        Self::new(PointerKind::Mouse, PointerPhase::Move, pos, time_ms)
    }

    pub fn up(pos: Vec2, time_ms: f64) -> Self {
        Self::new(PointerKind::Mouse, PointerPhase::Up, pos, time_ms)
    }
}

/// Current gesture
#[derive(Debug, Clone, PartialEq, Default)]
pub enum InteractionPhase {
    #[default]
    Idle,
    /// Pointer over these balloons (overlaps allowed)
    Hovering(Vec<u32>),
    /// Holding this balloon
    Dragging(u32),
}

/// Tracks the last press to recognise a double activation
#[derive(Debug, Clone, Default)]
pub struct ActivationDetector {
    last: Option<(f64, u32)>,
    window_ms: f64,
}

impl ActivationDetector {
    pub fn new(window_ms: f64) -> Self {
        Self {
            last: None,
            window_ms,
        }
    }

    /// Record a press on `id`; returns true if it completes a double activation
    pub fn press(&mut self, id: u32, time_ms: f64) -> bool {
        if let Some((last_time, last_id)) = self.last {
            let dt = time_ms - last_time;
            if last_id == id && (0.0..self.window_ms).contains(&dt) {
                self.last = None;
                return true;
            }
        }
        self.last = Some((time_ms, id));
        false
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Pointer handling for one field
#[derive(Debug, Clone)]
pub struct InteractionMachine {
    phase: InteractionPhase,
    detector: ActivationDetector,
}

impl Default for InteractionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionMachine {
    pub fn new() -> Self {
        Self {
            phase: InteractionPhase::Idle,
            detector: ActivationDetector::new(DOUBLE_ACTIVATION_MS),
        }
    }

    pub fn phase(&self) -> &InteractionPhase {
        &self.phase
    }

    /// Forget any gesture in progress (field was rebuilt)
    pub fn reset(&mut self) {
        self.phase = InteractionPhase::Idle;
        self.detector.reset();
    }

    /// Handle one pointer event, queueing intents on `state`
    pub fn handle(&mut self, event: &PointerEvent, state: &mut FieldState) {
        match event.phase {
            PointerPhase::Down => self.pointer_down(event, state),
            PointerPhase::Move => self.pointer_move(event, state),
            PointerPhase::Up | PointerPhase::Leave => {
                state.push_intent(Intent::Release);
                self.phase = InteractionPhase::Idle;
            }
        }
    }

    fn pointer_down(&mut self, event: &PointerEvent, state: &mut FieldState) {
        let Some(id) = picker::pick(&state.balloons, event.pos, &state.surface).map(|b| b.id)
        else {
            self.phase = InteractionPhase::Idle;
            return;
        };

        if self.detector.press(id, event.time_ms) {
            log::debug!("Double activation on balloon {}", id);
            state.push_intent(Intent::Pop { id });
            self.phase = InteractionPhase::Idle;
        } else {
            state.push_intent(Intent::BeginDrag { id });
            self.phase = InteractionPhase::Dragging(id);
        }
    }

    fn pointer_move(&mut self, event: &PointerEvent, state: &mut FieldState) {
        if let InteractionPhase::Dragging(id) = self.phase {
            state.push_intent(Intent::MoveTo { id, pos: event.pos });
            return;
        }

        let ids = picker::pick_all(&state.balloons, event.pos, &state.surface);
        let previous: &[u32] = match &self.phase {
            InteractionPhase::Hovering(prev) => prev,
            _ => &[],
        };
        if ids.as_slice() == previous {
            return;
        }
        state.push_intent(Intent::Hover { ids: ids.clone() });
        self.phase = if ids.is_empty() {
            InteractionPhase::Idle
        } else {
            InteractionPhase::Hovering(ids)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::Surface;
    use crate::sim::test_support::balloon_at;

    fn state_with(balloons: Vec<crate::sim::state::Balloon>) -> FieldState {
        let mut state = FieldState::new(1, Surface::new(1280.0, 720.0));
        state.balloons = balloons;
        state
    }

    #[test]
    fn test_press_on_empty_space_stays_idle() {
        let mut state = state_with(vec![balloon_at(0, 400.0, 300.0, 0)]);
        let mut machine = InteractionMachine::new();
        machine.handle(&PointerEvent::down(Vec2::new(900.0, 500.0), 0.0), &mut state);
        assert_eq!(machine.phase(), &InteractionPhase::Idle);
        assert!(state.intents.is_empty());
    }

    #[test]
    fn test_press_starts_drag() {
        let mut state = state_with(vec![balloon_at(3, 400.0, 300.0, 0)]);
        let mut machine = InteractionMachine::new();
        machine.handle(&PointerEvent::down(Vec2::new(400.0, 300.0), 0.0), &mut state);
        assert_eq!(machine.phase(), &InteractionPhase::Dragging(3));
        assert_eq!(state.intents, vec![Intent::BeginDrag { id: 3 }]);
    }

    #[test]
    fn test_double_press_within_window_pops_once() {
        let mut state = state_with(vec![balloon_at(5, 400.0, 300.0, 0)]);
        let mut machine = InteractionMachine::new();
        let p = Vec2::new(400.0, 300.0);
        machine.handle(&PointerEvent::down(p, 0.0), &mut state);
        machine.handle(&PointerEvent::down(p, 150.0), &mut state);
        let pops = state
            .intents
            .iter()
            .filter(|i| matches!(i, Intent::Pop { id: 5 }))
            .count();
        assert_eq!(pops, 1);
        assert_eq!(machine.phase(), &InteractionPhase::Idle);

        // Detector was reset: a third quick press drags again
        machine.handle(&PointerEvent::down(p, 200.0), &mut state);
        assert_eq!(state.intents.last(), Some(&Intent::BeginDrag { id: 5 }));
    }

    #[test]
    fn test_double_press_outside_window_drags() {
        let mut state = state_with(vec![balloon_at(5, 400.0, 300.0, 0)]);
        let mut machine = InteractionMachine::new();
        let p = Vec2::new(400.0, 300.0);
        machine.handle(&PointerEvent::down(p, 0.0), &mut state);
        machine.handle(&PointerEvent::up(p, 50.0), &mut state);
        machine.handle(&PointerEvent::down(p, 300.0), &mut state);
        assert!(!state.intents.iter().any(|i| matches!(i, Intent::Pop { .. })));
        assert_eq!(state.intents.last(), Some(&Intent::BeginDrag { id: 5 }));
    }

    #[test]
    fn test_quick_presses_on_different_balloons_do_not_pop() {
        let mut state = state_with(vec![
            balloon_at(1, 300.0, 300.0, 0),
            balloon_at(2, 600.0, 300.0, 0),
        ]);
        let mut machine = InteractionMachine::new();
        machine.handle(&PointerEvent::down(Vec2::new(300.0, 300.0), 0.0), &mut state);
        machine.handle(&PointerEvent::down(Vec2::new(600.0, 300.0), 100.0), &mut state);
        assert!(!state.intents.iter().any(|i| matches!(i, Intent::Pop { .. })));
    }

    #[test]
    fn test_drag_moves_follow_pointer() {
        let mut state = state_with(vec![balloon_at(3, 400.0, 300.0, 0)]);
        let mut machine = InteractionMachine::new();
        machine.handle(&PointerEvent::down(Vec2::new(400.0, 300.0), 0.0), &mut state);
        machine.handle(&PointerEvent::moved(Vec2::new(700.0, 100.0), 20.0), &mut state);
        assert_eq!(
            state.intents.last(),
            Some(&Intent::MoveTo {
                id: 3,
                pos: Vec2::new(700.0, 100.0)
            })
        );
        machine.handle(&PointerEvent::up(Vec2::new(700.0, 100.0), 40.0), &mut state);
        assert_eq!(state.intents.last(), Some(&Intent::Release));
        assert_eq!(machine.phase(), &InteractionPhase::Idle);
    }

    #[test]
    fn test_hover_reports_all_overlapping_balloons() {
        let mut state = state_with(vec![
            balloon_at(1, 400.0, 300.0, 0),
            balloon_at(2, 420.0, 300.0, 1),
            balloon_at(3, 900.0, 300.0, 2),
        ]);
        let mut machine = InteractionMachine::new();
        machine.handle(&PointerEvent::moved(Vec2::new(410.0, 300.0), 0.0), &mut state);
        assert_eq!(state.intents, vec![Intent::Hover { ids: vec![1, 2] }]);

        // Same hover set: nothing new queued
        machine.handle(&PointerEvent::moved(Vec2::new(411.0, 300.0), 5.0), &mut state);
        assert_eq!(state.intents.len(), 1);

        machine.handle(&PointerEvent::moved(Vec2::new(650.0, 600.0), 10.0), &mut state);
        assert_eq!(state.intents.last(), Some(&Intent::Hover { ids: vec![] }));
        assert_eq!(machine.phase(), &InteractionPhase::Idle);
    }

    #[test]
    fn test_leave_releases() {
        let mut state = state_with(vec![balloon_at(3, 400.0, 300.0, 0)]);
        let mut machine = InteractionMachine::new();
        machine.handle(&PointerEvent::down(Vec2::new(400.0, 300.0), 0.0), &mut state);
        let leave = PointerEvent::new(
            PointerKind::Touch,
            PointerPhase::Leave,
            Vec2::new(-5.0, 300.0),
            10.0,
        );
        machine.handle(&leave, &mut state);
        assert_eq!(state.intents.last(), Some(&Intent::Release));
    }

    #[test]
    fn test_pointer_kind_from_dom() {
        assert_eq!(PointerKind::from_dom("touch"), PointerKind::Touch);
        assert_eq!(PointerKind::from_dom("pen"), PointerKind::Pen);
        assert_eq!(PointerKind::from_dom("mouse"), PointerKind::Mouse);
    }
}
