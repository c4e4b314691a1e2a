use anyhow::Result;
use glam::Mat4;
use std::sync::Arc;

use super::passes::{PassKey, PassRegistry, RenderPassDesc, Technique, UniformPool};
use super::states::{self, RenderStates};
use crate::scene::{MeshDraw, MeshVertex};
use crate::settings::ShadowMode;

const SHADOW_SHADER: &str = include_str!("../../assets/shaders/shadow.wgsl");
const SHADOW_DEBUG_SHADER: &str = include_str!("../../assets/shaders/shadow_debug.wgsl");

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ShadowFrameUniform {
    view_proj: [[f32; 4]; 4],
    exponent: f32,
    _padding: [f32; 3],
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ShadowDrawUniform {
    model: [[f32; 4]; 4],
}

/// Renders scene depth (or depth moments) into the cascade map slices, one
/// cascade at a time. State set through the setters is flushed when a
/// cascade is rendered, not before.
pub struct ShadowEffect {
    frame_pool: UniformPool<ShadowFrameUniform>,
    draw_pool: UniformPool<ShadowDrawUniform>,
    debug_bgl: wgpu::BindGroupLayout,
    debug_sampler: wgpu::Sampler,
    view: Mat4,
    mode: ShadowMode,
    exponent: f32,
}

impl ShadowEffect {
    pub fn init(device: &wgpu::Device, states: &RenderStates, registry: &mut PassRegistry) -> Result<Self> {
        registry.add_shader(device, "shadow", SHADOW_SHADER, &[])?;
        registry.add_shader(device, "shadow_debug", SHADOW_DEBUG_SHADER, &[])?;

        let uniform_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let frame_bgl = Arc::new(device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shadow Frame BGL"),
            entries: &[uniform_entry(0)],
        }));
        let draw_bgl = Arc::new(device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shadow Draw BGL"),
            entries: &[uniform_entry(0)],
        }));

        let single_target = |format| {
            [Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })]
        };
        for (technique, entry, format) in [
            (Technique::ShadowStandard, "fs_depth", wgpu::TextureFormat::R32Float),
            (Technique::ShadowVariance, "fs_variance", wgpu::TextureFormat::Rg32Float),
            (Technique::ShadowExponential, "fs_depth", wgpu::TextureFormat::R32Float),
        ] {
            registry.add_render_pass(
                device,
                PassKey::single(technique),
                RenderPassDesc {
                    vs: "shadow",
                    fs: Some(("shadow", entry)),
                    vertex_layouts: &[MeshVertex::layout()],
                    targets: &single_target(format),
                    depth_stencil: Some(states::depth_less_equal_shadow()),
                    bind_layouts: &[frame_bgl.as_ref(), draw_bgl.as_ref()],
                    ..Default::default()
                },
            )?;
        }

        let debug_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Shadow Debug BGL"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::NonFiltering),
                    count: None,
                },
            ],
        });
        registry.add_render_pass(
            device,
            PassKey::single(Technique::ShadowDebugView),
            RenderPassDesc {
                vs: "shadow_debug",
                vs_entry: "vs_fullscreen",
                fs: Some(("shadow_debug", "fs_grayscale")),
                targets: &single_target(wgpu::TextureFormat::Rgba8Unorm),
                bind_layouts: &[&debug_bgl],
                cull_mode: None,
                ..Default::default()
            },
        )?;

        Ok(Self {
            frame_pool: UniformPool::new(frame_bgl, "Shadow Frame Uniform"),
            draw_pool: UniformPool::new(draw_bgl, "Shadow Draw Uniform"),
            debug_bgl,
            debug_sampler: states.point_clamp.clone(),
            view: Mat4::IDENTITY,
            mode: ShadowMode::Standard,
            exponent: 80.0,
        })
    }

    pub fn set_view(&mut self, view: Mat4) {
        self.view = view;
    }

    /// Chooses the render pass flavor; the exponent only matters for
    /// exponential maps.
    pub fn select_mode(&mut self, mode: ShadowMode, exponent: f32) {
        self.mode = mode;
        self.exponent = exponent;
    }

    pub fn begin_frame(&mut self) {
        self.frame_pool.reset();
        self.draw_pool.reset();
    }

    pub fn end_frame(&mut self) {
        self.frame_pool.trim(2);
        self.draw_pool.trim(16);
    }

    fn technique(&self) -> Technique {
        match self.mode {
            ShadowMode::Standard => Technique::ShadowStandard,
            ShadowMode::Variance => Technique::ShadowVariance,
            ShadowMode::Exponential => Technique::ShadowExponential,
        }
    }

    /// Clears one cascade slice and renders the given casters into it with
    /// the cascade's projection.
    #[allow(clippy::too_many_arguments)]
    pub fn render_cascade(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        registry: &PassRegistry,
        target: &wgpu::TextureView,
        depth: &wgpu::TextureView,
        viewport: (f32, f32),
        proj: Mat4,
        draws: &[&MeshDraw<'_>],
    ) -> Result<()> {
        let pass = registry.pass(PassKey::single(self.technique()))?;
        let frame = ShadowFrameUniform {
            view_proj: (proj * self.view).to_cols_array_2d(),
            exponent: self.exponent,
            _padding: [0.0; 3],
        };
        let frame_bind = self.frame_pool.next(device, queue, &frame);
        let draw_binds: Vec<wgpu::BindGroup> = draws
            .iter()
            .map(|draw| {
                let uniform = ShadowDrawUniform { model: draw.model.to_cols_array_2d() };
                self.draw_pool.next(device, queue, &uniform)
            })
            .collect();

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(pass.label()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    // depth 1 everywhere; moments clear to (1, 1)
                    load: wgpu::LoadOp::Clear(wgpu::Color { r: 1.0, g: 1.0, b: 0.0, a: 0.0 }),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.bind(&mut rpass)?;
        rpass.set_viewport(0.0, 0.0, viewport.0, viewport.1, 0.0, 1.0);
        rpass.set_bind_group(0, &frame_bind, &[]);
        for (draw, bind) in draws.iter().zip(&draw_binds) {
            rpass.set_bind_group(1, bind, &[]);
            rpass.set_vertex_buffer(0, draw.mesh.vertex_buffer.slice(..));
            rpass.set_index_buffer(draw.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..draw.mesh.index_count, 0, 0..1);
        }
        Ok(())
    }

    /// Renders one cascade slice into an inspectable grayscale texture for
    /// the debug overlay.
    pub fn render_depth_to_texture(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        registry: &PassRegistry,
        cascade_view: &wgpu::TextureView,
        dst: &wgpu::TextureView,
        viewport: (f32, f32),
    ) -> Result<()> {
        let pass = registry.pass(PassKey::single(Technique::ShadowDebugView))?;
        let bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shadow Debug BG"),
            layout: &self.debug_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(cascade_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.debug_sampler),
                },
            ],
        });
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(pass.label()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: dst,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.bind(&mut rpass)?;
        rpass.set_viewport(0.0, 0.0, viewport.0, viewport.1, 0.0, 1.0);
        rpass.set_bind_group(0, &bind, &[]);
        rpass.draw(0..3, 0..1);
        Ok(())
    }
}
