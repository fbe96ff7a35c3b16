//! Vertex types for 2D rendering

use bytemuck::{Pod, Zeroable};

/// 2D vertex with position (surface pixels until uploaded) and color
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    pub const fn new(x: f32, y: f32, color: [f32; 4]) -> Self {
        Self {
            position: [x, y],
            color,
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

/// Colors for field elements
pub mod colors {
    pub const BACKGROUND: [f32; 4] = [0.96, 0.97, 1.0, 1.0];
    pub const TETHER: [f32; 4] = [0.45, 0.45, 0.52, 0.8];
    pub const ANCHOR: [f32; 4] = [0.35, 0.35, 0.42, 1.0];
    pub const HIGHLIGHT: [f32; 4] = [1.0, 1.0, 1.0, 0.35];
    pub const LABEL: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
}
