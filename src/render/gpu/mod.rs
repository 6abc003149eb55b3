//! wgpu backend.
//!
//! One forward pass, one pipeline: hemisphere-lit base colour with depth
//! testing. Each uploaded mesh owns its vertex, index and uniform buffers.

pub mod context;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use slotmap::SlotMap;
use wgpu::util::DeviceExt;

pub use context::{GpuSettings, WgpuContext};

use crate::errors::{Error, Result};
use crate::render::GpuMeshId;
use crate::render::surface::{RenderSurface, RenderView};
use crate::scene::geometry::{Geometry, Material};
use crate::scene::scene::DrawItem;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct GlobalUniforms {
    view_proj: [[f32; 4]; 4],
    camera_position: [f32; 4],
    sky_color: [f32; 4],
    ground_color: [f32; 4],
}

impl GlobalUniforms {
    fn from_view(view: &RenderView) -> Self {
        Self {
            view_proj: view.view_projection.to_cols_array_2d(),
            camera_position: view.camera_position.extend(1.0).to_array(),
            sky_color: view.light.sky_color.extend(view.light.intensity).to_array(),
            ground_color: view.light.ground_color.extend(1.0).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct MeshUniforms {
    model: [[f32; 4]; 4],
    normal_matrix: [[f32; 4]; 4],
    base_color: [f32; 4],
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    base_color: [f32; 4],
}

struct Pipeline {
    pipeline: wgpu::RenderPipeline,
    mesh_layout: wgpu::BindGroupLayout,
    global_buffer: wgpu::Buffer,
    global_bind_group: wgpu::BindGroup,
}

/// Window surface rendered with wgpu.
pub struct WgpuSurface {
    context: Option<WgpuContext>,
    pipeline: Option<Pipeline>,
    meshes: SlotMap<GpuMeshId, GpuMesh>,
}

impl WgpuSurface {
    /// Creates the device and surface for `window`.
    pub async fn new<W>(window: W, settings: &GpuSettings, width: u32, height: u32) -> Result<Self>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let context = WgpuContext::new(window, settings, width, height).await?;
        let pipeline = Self::create_pipeline(&context);
        Ok(Self {
            context: Some(context),
            pipeline: Some(pipeline),
            meshes: SlotMap::with_key(),
        })
    }

    #[must_use]
    pub fn context(&self) -> Option<&WgpuContext> {
        self.context.as_ref()
    }

    fn uniform_layout(device: &wgpu::Device, label: &str) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        })
    }

    fn create_pipeline(ctx: &WgpuContext) -> Pipeline {
        let device = &ctx.device;
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Viewer Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let global_layout = Self::uniform_layout(device, "Globals Layout");
        let mesh_layout = Self::uniform_layout(device, "Mesh Layout");

        let global_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Globals"),
            size: std::mem::size_of::<GlobalUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let global_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Globals Bind Group"),
            layout: &global_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: global_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Viewer Pipeline Layout"),
            bind_group_layouts: &[Some(&global_layout), Some(&mesh_layout)],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Viewer Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: ctx.color_format(),
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: ctx.depth_format,
                depth_write_enabled: Some(true),
                depth_compare: Some(wgpu::CompareFunction::Less),
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        Pipeline {
            pipeline,
            mesh_layout,
            global_buffer,
            global_bind_group,
        }
    }
}

impl RenderSurface for WgpuSurface {
    fn size(&self) -> (u32, u32) {
        self.context.as_ref().map_or((0, 0), WgpuContext::size)
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let Some(ctx) = &mut self.context {
            ctx.resize(width, height);
        }
    }

    fn upload_mesh(&mut self, geometry: &Geometry, material: &Material) -> Result<GpuMeshId> {
        let (Some(ctx), Some(pipeline)) = (&self.context, &self.pipeline) else {
            return Err(Error::Gpu("surface has been released".into()));
        };
        let device = &ctx.device;

        let vertices: Vec<Vertex> = geometry
            .positions
            .iter()
            .zip(&geometry.normals)
            .map(|(&position, &normal)| Vertex { position, normal })
            .collect();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertices"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Indices"),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let base_color = material.base_color.to_array();
        let uniforms = MeshUniforms {
            model: Mat4::IDENTITY.to_cols_array_2d(),
            normal_matrix: Mat4::IDENTITY.to_cols_array_2d(),
            base_color,
        };
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Uniforms"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Mesh Bind Group"),
            layout: &pipeline.mesh_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        Ok(self.meshes.insert(GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: geometry.indices.len() as u32,
            uniform_buffer,
            bind_group,
            base_color,
        }))
    }

    fn release_mesh(&mut self, id: GpuMeshId) {
        if let Some(mesh) = self.meshes.remove(id) {
            mesh.vertex_buffer.destroy();
            mesh.index_buffer.destroy();
            mesh.uniform_buffer.destroy();
        }
    }

    fn live_resources(&self) -> usize {
        self.meshes.len()
    }

    fn render(&mut self, view: &RenderView, draws: &[DrawItem]) -> Result<()> {
        let (Some(ctx), Some(pipeline)) = (&self.context, &self.pipeline) else {
            return Err(Error::Gpu("surface has been released".into()));
        };

        let output = match ctx.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(output)
            | wgpu::CurrentSurfaceTexture::Suboptimal(output) => output,
            wgpu::CurrentSurfaceTexture::Outdated => {
                ctx.surface.configure(&ctx.device, &ctx.config);
                return Ok(());
            }
            wgpu::CurrentSurfaceTexture::Timeout | wgpu::CurrentSurfaceTexture::Occluded => {
                return Ok(());
            }
            wgpu::CurrentSurfaceTexture::Lost => {
                return Err(Error::Gpu("surface lost".into()));
            }
            wgpu::CurrentSurfaceTexture::Validation => {
                return Err(Error::Gpu("surface texture validation failed".into()));
            }
        };
        let target = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        ctx.queue.write_buffer(
            &pipeline.global_buffer,
            0,
            bytemuck::bytes_of(&GlobalUniforms::from_view(view)),
        );

        for draw in draws {
            let Some(mesh) = self.meshes.get(draw.gpu) else {
                continue;
            };
            let model = Mat4::from(draw.world);
            let uniforms = MeshUniforms {
                model: model.to_cols_array_2d(),
                normal_matrix: model.inverse().transpose().to_cols_array_2d(),
                base_color: mesh.base_color,
            };
            ctx.queue
                .write_buffer(&mesh.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
        }

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Viewer Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(ctx.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &ctx.depth_texture_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            pass.set_pipeline(&pipeline.pipeline);
            pass.set_bind_group(0, &pipeline.global_bind_group, &[]);

            for draw in draws {
                let Some(mesh) = self.meshes.get(draw.gpu) else {
                    continue;
                };
                pass.set_bind_group(1, &mesh.bind_group, &[]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn release(&mut self) {
        let ids: Vec<GpuMeshId> = self.meshes.keys().collect();
        for id in ids {
            self.release_mesh(id);
        }
        self.pipeline = None;
        if self.context.take().is_some() {
            log::info!("GPU surface released");
        }
    }
}
