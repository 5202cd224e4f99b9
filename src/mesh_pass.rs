//! wgpu rendering of the mesh with either shading program.
//!
//! [`MeshPass`] compiles one render pipeline per [`ShadingVariant`] at
//! construction and keeps them for the life of the viewer. Each program owns
//! a 192-byte uniform block holding three column-major matrices:
//!
//! | Uniform    | Offset |
//! |------------|--------|
//! | model      | 0      |
//! | view       | 64     |
//! | projection | 128    |
//!
//! A [`ProgramHandle`] is the program's index in the pass and a
//! [`UniformLocation`] is a byte offset into its block. [`PassRecorder`]
//! turns the selector's commands into wgpu calls on an open render pass.
//!
//! # Bind groups
//!
//! - **Group 0**: matrix uniforms (both programs)
//! - **Group 1**: diffuse texture and sampler (primary program only)

use glam::Mat4;

use crate::assets::ShaderSources;
use crate::gpu::GpuContext;
use crate::mesh::{Mesh, VERTEX_LAYOUTS};
use crate::shading::{
    MatrixUniforms, ProgramHandle, ShadingBackend, ShadingProgram, ShadingVariant,
    UniformLocation,
};
use crate::texture::Texture;

/// Size in bytes of one `mat4x4<f32>`.
const MATRIX_SIZE: u32 = std::mem::size_of::<[[f32; 4]; 4]>() as u32;

/// Uniform locations shared by both programs' matrix blocks.
pub const MATRIX_UNIFORMS: MatrixUniforms = MatrixUniforms {
    model: UniformLocation(0),
    view: UniformLocation(MATRIX_SIZE),
    projection: UniformLocation(2 * MATRIX_SIZE),
};

/// Format of the depth attachment.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// One compiled shading program.
struct GpuProgram {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    textured: bool,
}

/// Owns both shading pipelines and the depth buffer.
pub struct MeshPass {
    programs: Vec<GpuProgram>,
    texture_bind_group: wgpu::BindGroup,
    /// View into the depth texture; keeps the texture alive.
    depth_view: wgpu::TextureView,
    depth_size: (u32, u32),
}

impl MeshPass {
    /// Compiles both programs and binds `texture` to the primary one.
    pub fn new(gpu: &GpuContext, shaders: &ShaderSources, texture: &Texture) -> Self {
        let device = &gpu.device;

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Matrix Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Texture Bind Group Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let texture_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Mesh Texture Bind Group"),
            layout: &texture_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        });

        // Indexed by `ProgramHandle`, in `program_index` order.
        let programs = [ShadingVariant::Primary, ShadingVariant::DebugNormals]
            .into_iter()
            .map(|variant| {
                let textured = variant == ShadingVariant::Primary;
                let mut layouts = vec![&uniform_bind_group_layout];
                if textured {
                    layouts.push(&texture_bind_group_layout);
                }

                let (uniform_buffer, uniform_bind_group) =
                    Self::create_uniforms(gpu, &uniform_bind_group_layout, variant);

                GpuProgram {
                    pipeline: Self::create_pipeline(gpu, shaders.get(variant), &layouts, variant),
                    uniform_buffer,
                    uniform_bind_group,
                    textured,
                }
            })
            .collect();

        Self {
            programs,
            texture_bind_group,
            depth_view: Self::create_depth_view(gpu),
            depth_size: (gpu.width(), gpu.height()),
        }
    }

    fn program_index(variant: ShadingVariant) -> u32 {
        match variant {
            ShadingVariant::Primary => 0,
            ShadingVariant::DebugNormals => 1,
        }
    }

    /// Handle and uniform locations of a compiled program.
    pub fn program(&self, variant: ShadingVariant) -> ShadingProgram {
        ShadingProgram {
            program: ProgramHandle(Self::program_index(variant)),
            uniforms: MATRIX_UNIFORMS,
        }
    }

    fn create_uniforms(
        gpu: &GpuContext,
        layout: &wgpu::BindGroupLayout,
        variant: ShadingVariant,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{} Matrix Uniforms", variant.label())),
            size: 3 * MATRIX_SIZE as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} Matrix Bind Group", variant.label())),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });

        (buffer, bind_group)
    }

    fn create_pipeline(
        gpu: &GpuContext,
        source: &str,
        bind_group_layouts: &[&wgpu::BindGroupLayout],
        variant: ShadingVariant,
    ) -> wgpu::RenderPipeline {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{} Shader", variant.label())),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Pipeline Layout", variant.label())),
            bind_group_layouts,
            push_constant_ranges: &[],
        });

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{} Pipeline", variant.label())),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs"),
                buffers: &VERTEX_LAYOUTS,
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: gpu.config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        })
    }

    fn create_depth_view(gpu: &GpuContext) -> wgpu::TextureView {
        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: gpu.width(),
                height: gpu.height(),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Ensures the depth buffer matches the current surface size.
    pub fn ensure_depth_size(&mut self, gpu: &GpuContext) {
        if self.depth_size != (gpu.width(), gpu.height()) {
            self.depth_view = Self::create_depth_view(gpu);
            self.depth_size = (gpu.width(), gpu.height());
        }
    }

    /// Depth attachment cleared to the far plane at the start of the pass.
    pub fn depth_attachment(&self) -> wgpu::RenderPassDepthStencilAttachment<'_> {
        wgpu::RenderPassDepthStencilAttachment {
            view: &self.depth_view,
            depth_ops: Some(wgpu::Operations {
                load: wgpu::LoadOp::Clear(1.0),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        }
    }

    /// Opens a backend that records into `render_pass`.
    pub fn recorder<'a, 'p>(
        &'a self,
        gpu: &'a GpuContext,
        render_pass: &'a mut wgpu::RenderPass<'p>,
    ) -> PassRecorder<'a, 'p> {
        PassRecorder {
            queue: &gpu.queue,
            programs: &self.programs,
            texture_bind_group: &self.texture_bind_group,
            render_pass,
            bound: None,
        }
    }
}

/// [`ShadingBackend`] over an open wgpu render pass.
///
/// Matrix uploads go through the queue, so they land before the pass's
/// command buffer runs.
pub struct PassRecorder<'a, 'p> {
    queue: &'a wgpu::Queue,
    programs: &'a [GpuProgram],
    texture_bind_group: &'a wgpu::BindGroup,
    render_pass: &'a mut wgpu::RenderPass<'p>,
    bound: Option<usize>,
}

impl ShadingBackend for PassRecorder<'_, '_> {
    type Geometry = Mesh;

    fn use_program(&mut self, program: ProgramHandle) {
        let index = program.0 as usize;
        let Some(gpu_program) = self.programs.get(index) else {
            tracing::error!(program = program.0, "unknown shading program");
            return;
        };

        self.render_pass.set_pipeline(&gpu_program.pipeline);
        self.render_pass
            .set_bind_group(0, &gpu_program.uniform_bind_group, &[]);
        if gpu_program.textured {
            self.render_pass
                .set_bind_group(1, self.texture_bind_group, &[]);
        }
        self.bound = Some(index);
    }

    fn upload_matrix(&mut self, location: UniformLocation, matrix: &Mat4) {
        let Some(gpu_program) = self.bound.and_then(|i| self.programs.get(i)) else {
            tracing::error!("matrix upload with no program bound");
            return;
        };

        self.queue.write_buffer(
            &gpu_program.uniform_buffer,
            location.0 as u64,
            bytemuck::bytes_of(&matrix.to_cols_array_2d()),
        );
    }

    fn bind_geometry(&mut self, mesh: &Mesh) {
        self.render_pass.set_vertex_buffer(0, mesh.positions.slice(..));
        self.render_pass.set_vertex_buffer(1, mesh.texcoords.slice(..));
        self.render_pass.set_vertex_buffer(2, mesh.normals.slice(..));
    }

    fn draw_triangles(&mut self, vertex_count: u32) {
        self.render_pass.draw(0..vertex_count, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_locations_follow_block_layout() {
        assert_eq!(MATRIX_UNIFORMS.model, UniformLocation(0));
        assert_eq!(MATRIX_UNIFORMS.view, UniformLocation(64));
        assert_eq!(MATRIX_UNIFORMS.projection, UniformLocation(128));
    }

    #[test]
    fn program_indices_are_distinct() {
        assert_ne!(
            MeshPass::program_index(ShadingVariant::Primary),
            MeshPass::program_index(ShadingVariant::DebugNormals)
        );
    }

    /// Parses and validates a WGSL module with naga.
    fn validate_shader(name: &str, source: &str) {
        let module = naga::front::wgsl::parse_str(source)
            .unwrap_or_else(|e| panic!("shader '{name}' parse failed: {e:?}"));
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .unwrap_or_else(|e| panic!("shader '{name}' validation failed: {e:?}"));
    }

    #[test]
    fn bundled_shaders_validate() {
        let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders");
        let sources = ShaderSources::load(&dir).unwrap();
        validate_shader("primary", &sources.primary);
        validate_shader("normals", &sources.debug_normals);
    }
}
