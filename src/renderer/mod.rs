//! WebGPU rendering module
//!
//! `scene` turns the field into a triangle list in surface pixels; `pipeline`
//! maps it to NDC and draws it.

pub mod pipeline;
pub mod scene;
pub mod shapes;
pub mod vertex;

pub use pipeline::{RenderError, RenderState};
pub use scene::{FrameGeometry, LabelSprite, build_frame};
pub use vertex::Vertex;
