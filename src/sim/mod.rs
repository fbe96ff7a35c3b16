//! Balloon field simulation
//!
//! All field logic lives here. It must stay free of rendering and platform
//! dependencies:
//! - Frame-normalized deltas only (see `clock`)
//! - Seeded RNG only
//! - Stable iteration order (by balloon ID)
//! - Pointer input becomes queued intents, applied at tick start

pub mod clock;
pub mod interaction;
pub mod layout;
pub mod lifecycle;
pub mod particles;
pub mod picker;
pub mod state;
pub mod tick;

pub use clock::FrameClock;
pub use interaction::{InteractionMachine, InteractionPhase, PointerEvent, PointerKind, PointerPhase};
pub use layout::{LayoutError, PlacementReport, generate_field};
pub use lifecycle::{Edge, Entitlement, PopManager, PopOutcome, Reveal, VisibilityEdge, restore};
pub use picker::{hit_radius, pick, pick_all};
pub use state::{
    AnchorGroup, Balloon, BalloonColor, BalloonState, FieldState, Fragment, FragmentTier, Intent,
    Surface,
};
pub use tick::{TickInput, TickReport, tick};

/// Uniform sample in `[lo, hi)`; collapses to `lo` for an empty range
pub(crate) fn uniform(rng: &mut impl rand::Rng, lo: f32, hi: f32) -> f32 {
    if hi > lo { rng.random_range(lo..hi) } else { lo }
}
