use anyhow::Result;
use bytemuck::Zeroable;
use glam::{Mat4, Vec3};
use std::sync::Arc;

use super::cascades::{cascade_scale_offset, CascadeShadowManager};
use super::passes::{MsaaSamples, PassKey, PassRegistry, RenderPassDesc, Technique, UniformPool};
use super::states::{self, RenderStates};
use super::{LIT_FORMAT, MAX_CASCADES};
use crate::scene::{MeshDraw, MeshVertex};
use crate::settings::{CascadeSelection, FrameSettings, ShadowMode};

const FORWARD_SHADER: &str = include_str!("../../assets/shaders/forward.wgsl");

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ForwardFrameUniform {
    view_proj: [[f32; 4]; 4],
    shadow_view: [[f32; 4]; 4],
    cascade_scales: [[f32; 4]; MAX_CASCADES],
    cascade_offsets: [[f32; 4]; MAX_CASCADES],
    cascade_depths: [[f32; 4]; 2],
    light_dir: [f32; 4],
    // bias, blend area, esm exponent, pcf kernel size
    shadow_params: [f32; 4],
    // cascade count, interval-based selection, blend enabled, visualize cascades
    control: [u32; 4],
    texel: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct ForwardDrawUniform {
    model: [[f32; 4]; 4],
    color: [f32; 4],
}

/// Forward lighting with cascaded shadows. Setter state is batched into the
/// frame uniform and pushed when `render` runs the pass.
pub struct ForwardEffect {
    frame_buffer: wgpu::Buffer,
    frame_bind: wgpu::BindGroup,
    cascade_bgl: wgpu::BindGroupLayout,
    draw_pool: UniformPool<ForwardDrawUniform>,

    view: Mat4,
    proj: Mat4,
    uniform: ForwardFrameUniform,
    pass_key: PassKey,
}

impl ForwardEffect {
    pub fn init(device: &wgpu::Device, _states: &RenderStates, registry: &mut PassRegistry) -> Result<Self> {
        let shader_names: [(&'static str, ShadowMode, u32); 3] = [
            ("forward_csm", ShadowMode::Standard, 0),
            ("forward_vsm", ShadowMode::Variance, 1),
            ("forward_esm", ShadowMode::Exponential, 2),
        ];
        for (name, _, mode_value) in shader_names {
            let defines = [("SHADOW_MODE", format!("{mode_value}u"))];
            registry.add_shader(device, name, FORWARD_SHADER, &defines)?;
        }

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
        let frame_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Forward Frame BGL"),
            entries: &[uniform_entry(0)],
        });
        let cascade_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Forward Cascade BGL"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2Array,
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                },
                count: None,
            }],
        });
        let draw_bgl = Arc::new(device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Forward Draw BGL"),
            entries: &[uniform_entry(0)],
        }));

        let targets = [Some(wgpu::ColorTargetState {
            format: LIT_FORMAT,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        })];
        for (name, mode, _) in shader_names {
            for samples in MsaaSamples::ALL {
                registry.add_render_pass(
                    device,
                    PassKey::new(Self::technique(mode), samples),
                    RenderPassDesc {
                        vs: name,
                        fs: Some((name, "fs_main")),
                        vertex_layouts: &[MeshVertex::layout()],
                        targets: &targets,
                        depth_stencil: Some(states::depth_greater_equal()),
                        bind_layouts: &[&frame_bgl, &cascade_bgl, draw_bgl.as_ref()],
                        sample_count: samples.count(),
                        ..Default::default()
                    },
                )?;
            }
        }

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Forward Frame Uniform"),
            size: std::mem::size_of::<ForwardFrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Forward Frame BG"),
            layout: &frame_bgl,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: frame_buffer.as_entire_binding() }],
        });

        Ok(Self {
            frame_buffer,
            frame_bind,
            cascade_bgl,
            draw_pool: UniformPool::new(draw_bgl, "Forward Draw Uniform"),
            view: Mat4::IDENTITY,
            proj: Mat4::IDENTITY,
            uniform: ForwardFrameUniform::zeroed(),
            pass_key: PassKey::new(Technique::ForwardStandard, MsaaSamples::X1),
        })
    }

    fn technique(mode: ShadowMode) -> Technique {
        match mode {
            ShadowMode::Standard => Technique::ForwardStandard,
            ShadowMode::Variance => Technique::ForwardVariance,
            ShadowMode::Exponential => Technique::ForwardExponential,
        }
    }

    pub fn set_view_matrix(&mut self, view: Mat4) {
        self.view = view;
    }

    pub fn set_proj_matrix(&mut self, proj: Mat4) {
        self.proj = proj;
    }

    pub fn set_light_dir(&mut self, dir: Vec3) {
        self.uniform.light_dir = [dir.x, dir.y, dir.z, 0.0];
    }

    /// Copies per-cascade texture transforms, partition depths and the
    /// light view matrix out of the cascade manager.
    pub fn set_cascades(&mut self, cascades: &CascadeShadowManager) {
        self.uniform.shadow_view = cascades.shadow_view().to_cols_array_2d();
        let depths = cascades.cascade_partitions();
        for i in 0..MAX_CASCADES {
            let (scale, offset) = cascade_scale_offset(cascades.shadow_projection_raw(i));
            self.uniform.cascade_scales[i] = scale.to_array();
            self.uniform.cascade_offsets[i] = offset.to_array();
            self.uniform.cascade_depths[i / 4][i % 4] = depths[i];
        }
        self.uniform.control[0] = cascades.cascade_count() as u32;
        let size = cascades.shadow_size().max(1);
        self.uniform.texel = [1.0 / size as f32, size as f32, 0.0, 0.0];
    }

    /// Scalar shadow settings from the UI.
    pub fn set_shadow_settings(&mut self, settings: &FrameSettings) {
        self.uniform.shadow_params = [
            settings.pcf_depth_bias,
            settings.blend_area,
            settings.magic_power,
            settings.blur_kernel_size as f32,
        ];
        self.uniform.control[1] =
            u32::from(settings.cascade_selection == CascadeSelection::IntervalBased);
        self.uniform.control[2] = u32::from(settings.blend_between_cascades);
        self.uniform.control[3] = u32::from(settings.visualize_cascades);
    }

    /// Chooses the pass permutation for this frame.
    pub fn select_pass(&mut self, mode: ShadowMode, samples: MsaaSamples) {
        self.pass_key = PassKey::new(Self::technique(mode), samples);
    }

    /// Flushes the batched frame state and draws the scene into the lit
    /// buffer. The caller owns the cascade-array read hazard; see
    /// `ResourceBindings`.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        registry: &PassRegistry,
        lit_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        cascade_array: &wgpu::TextureView,
        viewport: (f32, f32),
        draws: &[MeshDraw<'_>],
    ) -> Result<()> {
        let pass = registry.pass(self.pass_key)?;
        self.uniform.view_proj = (self.proj * self.view).to_cols_array_2d();
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&self.uniform));

        let cascade_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Forward Cascade BG"),
            layout: &self.cascade_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(cascade_array),
            }],
        });
        self.draw_pool.reset();
        let draw_binds: Vec<wgpu::BindGroup> = draws
            .iter()
            .map(|draw| {
                let uniform = ForwardDrawUniform {
                    model: draw.model.to_cols_array_2d(),
                    color: [draw.color.x, draw.color.y, draw.color.z, 1.0],
                };
                self.draw_pool.next(device, queue, &uniform)
            })
            .collect();

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(pass.label()),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: lit_view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    // reversed depth clears to 0
                    load: wgpu::LoadOp::Clear(0.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(0),
                    store: wgpu::StoreOp::Store,
                }),
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.bind(&mut rpass)?;
        rpass.set_viewport(0.0, 0.0, viewport.0, viewport.1, 0.0, 1.0);
        rpass.set_bind_group(0, &self.frame_bind, &[]);
        rpass.set_bind_group(1, &cascade_bind, &[]);
        for (draw, bind) in draws.iter().zip(&draw_binds) {
            rpass.set_bind_group(2, bind, &[]);
            rpass.set_vertex_buffer(0, draw.mesh.vertex_buffer.slice(..));
            rpass.set_index_buffer(draw.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..draw.mesh.index_count, 0, 0..1);
        }
        drop(rpass);
        self.draw_pool.trim(16);
        Ok(())
    }

    /// Derived-matrix products for the current view/projection; exposed for
    /// verification against direct multiplication.
    pub fn derived_matrices(&self, world: Mat4) -> super::DerivedMatrices {
        super::DerivedMatrices::compute(world, self.view, self.proj)
    }
}
