//! GPU-resident mesh geometry.
//!
//! A [`Mesh`] keeps each vertex attribute in its own buffer, bound to its own
//! slot:
//!
//! | Attribute | Format    | Slot | Shader Location |
//! |-----------|-----------|------|-----------------|
//! | position  | Float32x3 | 0    | 0               |
//! | texcoord  | Float32x2 | 1    | 1               |
//! | normal    | Float32x3 | 2    | 2               |
//!
//! Every shading program reads the same three buffers, so switching programs
//! never re-uploads geometry.

use crate::geometry::MeshData;
use crate::gpu::GpuContext;

/// Vertex buffer layouts for the three attribute slots, in slot order.
pub const VERTEX_LAYOUTS: [wgpu::VertexBufferLayout<'static>; 3] = [
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 3]>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 0,
            format: wgpu::VertexFormat::Float32x3,
        }],
    },
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 2]>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 1,
            format: wgpu::VertexFormat::Float32x2,
        }],
    },
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 3]>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: 2,
            format: wgpu::VertexFormat::Float32x3,
        }],
    },
];

/// Geometry uploaded to the GPU, drawn as a non-indexed triangle list.
#[derive(Debug)]
pub struct Mesh {
    pub(crate) positions: wgpu::Buffer,
    pub(crate) texcoords: wgpu::Buffer,
    pub(crate) normals: wgpu::Buffer,
    pub(crate) vertex_count: u32,
}

impl Mesh {
    /// Uploads the three attribute arrays. The CPU copy can be dropped afterwards.
    pub fn new(gpu: &GpuContext, data: &MeshData) -> Self {
        use wgpu::util::DeviceExt;

        let upload = |label: &str, contents: &[u8]| {
            gpu.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(label),
                    contents,
                    usage: wgpu::BufferUsages::VERTEX,
                })
        };

        Self {
            positions: upload(
                "Mesh Position Buffer",
                bytemuck::cast_slice(data.positions()),
            ),
            texcoords: upload(
                "Mesh Texcoord Buffer",
                bytemuck::cast_slice(data.texcoords()),
            ),
            normals: upload("Mesh Normal Buffer", bytemuck::cast_slice(data.normals())),
            vertex_count: data.vertex_count() as u32,
        }
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
}
