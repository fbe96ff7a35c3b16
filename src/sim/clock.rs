//! Frame clock
//!
//! Turns animation-frame timestamps into deltas measured in nominal 60 Hz
//! frames, so motion speed doesn't depend on the display's refresh rate.

use crate::consts::{MAX_FRAME_DELTA, NOMINAL_FRAME_MS};

#[derive(Debug, Clone, Default)]
pub struct FrameClock {
    last_ms: Option<f64>,
    paused: bool,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delta for the frame at `now_ms`, or `None` while paused
    ///
    /// The first frame after construction or resume counts as exactly one
    /// nominal frame. A huge gap (backgrounded tab, debugger) also counts as one
    /// frame instead of fast-forwarding the field.
    pub fn advance(&mut self, now_ms: f64) -> Option<f32> {
        if self.paused {
            return None;
        }
        let delta = match self.last_ms {
            None => 1.0,
            Some(last) => {
                let elapsed = now_ms - last;
                if elapsed <= 0.0 || !elapsed.is_finite() {
                    0.0
                } else {
                    let frames = (elapsed / NOMINAL_FRAME_MS) as f32;
                    if frames > MAX_FRAME_DELTA { 1.0 } else { frames }
                }
            }
        };
        self.last_ms = Some(now_ms);
        Some(delta)
    }

    /// Stop producing deltas (surface hidden)
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume; the next frame starts fresh so hidden time is never replayed
    pub fn resume(&mut self) {
        self.paused = false;
        self.last_ms = None;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_frame_is_one_nominal_frame() {
        let mut clock = FrameClock::new();
        assert_eq!(clock.advance(12345.0), Some(1.0));
    }

    #[test]
    fn test_delta_normalized_to_nominal_frame() {
        let mut clock = FrameClock::new();
        clock.advance(0.0);
        let d = clock.advance(NOMINAL_FRAME_MS * 2.0).unwrap();
        assert!((d - 2.0).abs() < 1e-4);

        // 120 Hz display: half a nominal frame per callback
        let d = clock.advance(NOMINAL_FRAME_MS * 2.5).unwrap();
        assert!((d - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_large_gap_collapses_to_single_frame() {
        let mut clock = FrameClock::new();
        clock.advance(0.0);
        assert_eq!(clock.advance(5000.0), Some(1.0));
    }

    #[test]
    fn test_backwards_time_yields_zero() {
        let mut clock = FrameClock::new();
        clock.advance(100.0);
        assert_eq!(clock.advance(90.0), Some(0.0));
    }

    #[test]
    fn test_pause_and_resume_without_time_jump() {
        let mut clock = FrameClock::new();
        clock.advance(0.0);
        clock.pause();
        assert_eq!(clock.advance(16.0), None);
        assert_eq!(clock.advance(60_000.0), None);
        clock.resume();
        assert_eq!(clock.advance(60_016.0), Some(1.0));
        let d = clock.advance(60_016.0 + NOMINAL_FRAME_MS).unwrap();
        assert!((d - 1.0).abs() < 1e-4);
    }
}
