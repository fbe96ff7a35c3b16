//! Phoneme Balloons - an interactive balloon field for speech practice
//!
//! Core modules:
//! - `sim`: Frame-clocked simulation (placement, motion, gestures, pops, particles)
//! - `renderer`: Scene geometry and the WebGPU pipeline that draws it
//! - `content`: Activity lookup / file download bookkeeping for popped labels
//! - `session`: The single object a host drives each frame
//! - `settings`: Persisted preferences (performance tier, labels)

pub mod content;
pub mod renderer;
pub mod session;
pub mod settings;
pub mod sim;

pub use session::{FieldSession, SessionEvent};
pub use settings::{PerformanceTier, Settings};

use glam::Vec2;

/// Simulation configuration constants
pub mod consts {
    /// Nominal frame duration (60 Hz); deltas are expressed in these units
    pub const NOMINAL_FRAME_MS: f64 = 1000.0 / 60.0;
    /// Deltas above this many nominal frames count as a single frame (tab was backgrounded)
    pub const MAX_FRAME_DELTA: f32 = 4.0;

    /// Balloons per field (split evenly between the two anchor groups)
    pub const DEFAULT_BALLOON_COUNT: usize = 20;
    /// Nominal balloon radius at scale 1.0 (CSS pixels)
    pub const BALLOON_RADIUS: f32 = 32.0;
    /// Balloon scale range
    pub const MIN_SCALE: f32 = 0.85;
    pub const MAX_SCALE: f32 = 1.15;

    /// Placement: vertical bands per group
    pub const PLACEMENT_BANDS: usize = 4;
    /// Placement: random draws per balloon before settling for the last one
    pub const PLACEMENT_ATTEMPTS: u32 = 50;
    /// Placement: minimum center distance as a fraction of the summed radii
    pub const OVERLAP_FACTOR: f32 = 0.65;
    /// Anchor columns as a fraction of surface width (left group; right is mirrored)
    pub const ANCHOR_COLUMN: f32 = 0.2;
    /// Anchor point distance above the bottom edge
    pub const ANCHOR_INSET: f32 = 24.0;
    /// Lower edge of the balloon region as a fraction of surface height
    pub const FIELD_BOTTOM: f32 = 0.72;

    /// Idle motion amplitudes (pixels)
    pub const FLOAT_AMPLITUDE: f32 = 6.0;
    pub const SWAY_AMPLITUDE: f32 = 4.0;
    /// Idle motion phase speeds (radians per nominal frame)
    pub const FLOAT_SPEED_MIN: f32 = 0.02;
    pub const FLOAT_SPEED_MAX: f32 = 0.04;
    pub const SWAY_SPEED_MIN: f32 = 0.012;
    pub const SWAY_SPEED_MAX: f32 = 0.024;

    /// Z order while dragged (always on top)
    pub const DRAG_Z: i32 = 10_000;
    /// Z order while hovered (below a dragged balloon)
    pub const HOVER_Z: i32 = 5_000;

    /// Hit radius boost on touch devices / small viewports
    pub const TOUCH_HIT_BOOST: f32 = 1.3;
    /// Hit radius boost near the surface edges
    pub const EDGE_HIT_BOOST: f32 = 1.2;
    pub const EDGE_MARGIN: f32 = 60.0;
    pub const SMALL_VIEWPORT: f32 = 768.0;

    /// Two presses on the same balloon closer than this pop it
    pub const DOUBLE_ACTIVATION_MS: f64 = 300.0;
    /// Delay between a pop and the detail view reveal
    pub const REVEAL_DELAY_MS: f64 = 400.0;
    /// Max per-axis nudge applied when a balloon is restored
    pub const RESTORE_JITTER: f32 = 10.0;
    /// Retry interval while the surface has no measured size
    pub const INIT_RETRY_MS: f64 = 100.0;
    /// Activity records requested per lookup
    pub const LOOKUP_LIMIT: u32 = 10;
    /// How long a failed download keeps its error badge
    pub const DOWNLOAD_ERROR_MS: f64 = 3000.0;

    /// Burst sizes per tier (chunks are scaled by the performance tier)
    pub const CHUNK_COUNT: usize = 6;
    pub const MEDIUM_COUNT: usize = 8;
    pub const DUST_COUNT: usize = 15;
    /// Velocity retained per nominal frame
    pub const AIR_RESISTANCE: f32 = 0.97;
    /// Downward acceleration (pixels per frame²)
    pub const GRAVITY: f32 = 0.12;
    pub const OPACITY_EPSILON: f32 = 0.01;
    /// Fragments this far below the surface are gone
    pub const OFFSCREEN_MARGIN: f32 = 100.0;
    pub const SWEEP_INTERVAL_MS: f64 = 1000.0;
    pub const SWEEP_OPACITY: f32 = 0.05;
}

/// Scale the RGB channels of a color, keeping alpha
#[inline]
pub fn shade(color: [f32; 4], factor: f32) -> [f32; 4] {
    [
        (color[0] * factor).clamp(0.0, 1.0),
        (color[1] * factor).clamp(0.0, 1.0),
        (color[2] * factor).clamp(0.0, 1.0),
        color[3],
    ]
}

/// Unit vector for an angle in radians
#[inline]
pub fn direction(theta: f32) -> Vec2 {
    Vec2::new(theta.cos(), theta.sin())
}

/// Point on a quadratic Bezier curve
#[inline]
pub fn quadratic_bezier(p0: Vec2, control: Vec2, p1: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    p0 * (u * u) + control * (2.0 * u * t) + p1 * (t * t)
}
