//! Field state and core simulation types
//!
//! Everything the tick and the pointer handlers touch lives in one owned
//! `FieldState`. Pointer handling never mutates balloons directly; it queues
//! `Intent`s that the next tick applies.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Which anchor a balloon is tethered to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnchorGroup {
    Left,
    Right,
}

impl AnchorGroup {
    /// Horizontal center of the group's column
    pub fn column_x(self, surface: &Surface) -> f32 {
        match self {
            AnchorGroup::Left => surface.width * ANCHOR_COLUMN,
            AnchorGroup::Right => surface.width * (1.0 - ANCHOR_COLUMN),
        }
    }

    /// Fixed point the tethers of this group converge on
    pub fn anchor_point(self, surface: &Surface) -> Vec2 {
        Vec2::new(
            self.column_x(surface),
            (surface.height - ANCHOR_INSET).max(0.0),
        )
    }

    /// Horizontal extent available to the group (its half of the surface)
    pub fn x_range(self, surface: &Surface) -> (f32, f32) {
        match self {
            AnchorGroup::Left => (0.0, surface.width * 0.5),
            AnchorGroup::Right => (surface.width * 0.5, surface.width),
        }
    }
}

/// Balloon palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalloonColor {
    Red,
    Orange,
    Yellow,
    Green,
    Teal,
    Blue,
    Purple,
    Pink,
}

impl BalloonColor {
    pub const PALETTE: [BalloonColor; 8] = [
        BalloonColor::Red,
        BalloonColor::Orange,
        BalloonColor::Yellow,
        BalloonColor::Green,
        BalloonColor::Teal,
        BalloonColor::Blue,
        BalloonColor::Purple,
        BalloonColor::Pink,
    ];

    /// Palette entry for a balloon index (cycles)
    pub fn for_index(index: usize) -> Self {
        Self::PALETTE[index % Self::PALETTE.len()]
    }

    pub fn rgba(self) -> [f32; 4] {
        match self {
            BalloonColor::Red => [0.94, 0.27, 0.27, 1.0],
            BalloonColor::Orange => [0.98, 0.57, 0.24, 1.0],
            BalloonColor::Yellow => [0.98, 0.80, 0.08, 1.0],
            BalloonColor::Green => [0.29, 0.78, 0.42, 1.0],
            BalloonColor::Teal => [0.18, 0.75, 0.75, 1.0],
            BalloonColor::Blue => [0.23, 0.51, 0.96, 1.0],
            BalloonColor::Purple => [0.55, 0.36, 0.96, 1.0],
            BalloonColor::Pink => [0.93, 0.38, 0.69, 1.0],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BalloonColor::Red => "red",
            BalloonColor::Orange => "orange",
            BalloonColor::Yellow => "yellow",
            BalloonColor::Green => "green",
            BalloonColor::Teal => "teal",
            BalloonColor::Blue => "blue",
            BalloonColor::Purple => "purple",
            BalloonColor::Pink => "pink",
        }
    }
}

/// Balloon lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BalloonState {
    /// Floating in place
    Active,
    /// Held by the pointer, follows it exactly
    Dragging,
    /// Popped; invisible to hit testing until restored
    Popped,
}

/// A balloon entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balloon {
    pub id: u32,
    /// Rest position (surface pixels); idle motion is applied on top
    pub pos: Vec2,
    /// Nominal size multiplier
    pub scale: f32,
    pub color: BalloonColor,
    /// Phoneme shown on the balloon
    pub label: String,
    pub group: AnchorGroup,
    /// Current draw/hit priority
    pub z_order: i32,
    /// Z order to fall back to when neither hovered nor dragged
    pub resting_z: i32,
    pub state: BalloonState,
    pub hovering: bool,
    pub pressed: bool,
    /// Vertical bob phase (radians, only ever grows)
    pub float_phase: f32,
    /// Horizontal sway phase (radians, only ever grows)
    pub sway_phase: f32,
    pub float_speed: f32,
    pub sway_speed: f32,
    /// Tether length at creation
    pub tether_length: f32,
    /// Outside the visible area this frame (draw skip only)
    #[serde(skip)]
    pub culled: bool,
}

impl Balloon {
    /// Nominal radius in pixels
    #[inline]
    pub fn radius(&self) -> f32 {
        BALLOON_RADIUS * self.scale
    }

    #[inline]
    pub fn is_popped(&self) -> bool {
        self.state == BalloonState::Popped
    }

    /// Idle motion offset derived from the phases
    pub fn motion_offset(&self) -> Vec2 {
        if self.state == BalloonState::Dragging {
            return Vec2::ZERO;
        }
        Vec2::new(
            self.sway_phase.sin() * SWAY_AMPLITUDE,
            self.float_phase.sin() * FLOAT_AMPLITUDE,
        )
    }

    /// Where the balloon is drawn and hit-tested
    #[inline]
    pub fn display_pos(&self) -> Vec2 {
        self.pos + self.motion_offset()
    }
}

/// Fragment size classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FragmentTier {
    /// Few, large, slow pieces of skin
    Chunk,
    Medium,
    /// Many small fast specks
    Dust,
}

/// A pop fragment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fragment {
    /// Spawn point (never changes)
    pub origin: Vec2,
    /// Displacement from the origin
    pub offset: Vec2,
    pub vel: Vec2,
    pub rotation: f32,
    pub rotation_speed: f32,
    /// 1.0 at spawn, only decreases
    pub opacity: f32,
    /// Opacity lost per nominal frame
    pub fade: f32,
    pub size: f32,
    pub color: [f32; 4],
    pub tier: FragmentTier,
    /// Time (nominal frames) not yet integrated because of the per-tick budget
    #[serde(default)]
    pub pending: f32,
}

impl Fragment {
    #[inline]
    pub fn pos(&self) -> Vec2 {
        self.origin + self.offset
    }
}

/// The drawable surface as measured by the host
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    /// CSS pixels
    pub width: f32,
    pub height: f32,
    /// Device pixel ratio
    pub dpr: f32,
    /// Primary input is touch
    pub touch: bool,
}

impl Surface {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            dpr: 1.0,
            touch: false,
        }
    }

    /// Not yet laid out by the host
    pub fn is_unmeasured(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn is_small(&self) -> bool {
        self.width < SMALL_VIEWPORT
    }

    /// Physical pixel size for the render target
    pub fn physical_size(&self) -> (u32, u32) {
        (
            (self.width * self.dpr).round().max(1.0) as u32,
            (self.height * self.dpr).round().max(1.0) as u32,
        )
    }

    /// Clamp a balloon center so the whole balloon stays on the surface
    pub fn clamp_center(&self, pos: Vec2, radius: f32) -> Vec2 {
        let max_x = (self.width - radius).max(radius);
        let max_y = (self.height - radius).max(radius);
        Vec2::new(pos.x.clamp(radius, max_x), pos.y.clamp(radius, max_y))
    }
}

impl Default for Surface {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Queued state change produced by pointer handling
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    BeginDrag { id: u32 },
    MoveTo { id: u32, pos: Vec2 },
    /// Exactly these balloons are hovered now
    Hover { ids: Vec<u32> },
    /// Pointer released or left the surface
    Release,
    Pop { id: u32 },
}

/// Complete field state
#[derive(Debug, Clone)]
pub struct FieldState {
    /// Seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    pub surface: Surface,
    /// Balloons (sorted by id)
    pub balloons: Vec<Balloon>,
    pub fragments: Vec<Fragment>,
    /// Intents waiting for the next tick
    pub intents: Vec<Intent>,
    /// Simulation time (ms), advances by normalized deltas only
    pub time_ms: f64,
    pub tick_count: u64,
    /// Simulation time of the last fragment sweep
    pub last_sweep_ms: f64,
    /// Round-robin start for budgeted fragment integration
    pub particle_cursor: usize,
}

impl FieldState {
    pub fn new(seed: u64, surface: Surface) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            surface,
            balloons: Vec::new(),
            fragments: Vec::new(),
            intents: Vec::new(),
            time_ms: 0.0,
            tick_count: 0,
            last_sweep_ms: 0.0,
            particle_cursor: 0,
        }
    }

    pub fn balloon(&self, id: u32) -> Option<&Balloon> {
        self.balloons.iter().find(|b| b.id == id)
    }

    pub fn balloon_mut(&mut self, id: u32) -> Option<&mut Balloon> {
        self.balloons.iter_mut().find(|b| b.id == id)
    }

    pub fn push_intent(&mut self, intent: Intent) {
        self.intents.push(intent);
    }

    /// Id of the balloon currently held by the pointer
    pub fn dragging_id(&self) -> Option<u32> {
        self.balloons
            .iter()
            .find(|b| b.state == BalloonState::Dragging)
            .map(|b| b.id)
    }

    pub fn active_count(&self) -> usize {
        self.balloons.iter().filter(|b| !b.is_popped()).count()
    }

    /// Ensure balloons are sorted by ID for deterministic iteration
    pub fn normalize_order(&mut self) {
        self.balloons.sort_by_key(|b| b.id);
    }
}
