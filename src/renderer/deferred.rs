use anyhow::Result;
use bytemuck::Zeroable;
use glam::Mat4;
use std::sync::Arc;
use winit::dpi::PhysicalSize;

use super::gbuffer::GBuffer;
use super::passes::{
    color_texture_type, depth_texture_type, msaa_defines, MsaaSamples, PassKey, PassRegistry,
    RenderPassDesc, Technique, UniformPool,
};
use super::states::{self, RenderStates};
use super::{
    COMPUTE_SHADER_TILE_GROUP_DIM, GBUFFER_ALBEDO_FORMAT, GBUFFER_NORMAL_FORMAT, GBUFFER_POSZ_FORMAT,
    LIT_FORMAT, MAX_POINT_LIGHTS,
};
use crate::scene::{MeshDraw, MeshVertex, PointLight};
use crate::settings::FrameSettings;

const GBUFFER_SHADER: &str = include_str!("../../assets/shaders/gbuffer.wgsl");
const LIGHTING_SHADER: &str = include_str!("../../assets/shaders/deferred_lighting.wgsl");
const CULLING_SHADER: &str = include_str!("../../assets/shaders/tile_culling.wgsl");

const LIGHTING_SHADER_NAMES: [&str; 4] =
    ["deferred_lighting_1x", "deferred_lighting_2x", "deferred_lighting_4x", "deferred_lighting_8x"];
const CULLING_SHADER_NAMES: [&str; 4] =
    ["tile_culling_1x", "tile_culling_2x", "tile_culling_4x", "tile_culling_8x"];

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointLightGpu {
    pub position_radius: [f32; 4],
    pub color_intensity: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct DeferredFrameUniform {
    view: [[f32; 4]; 4],
    proj: [[f32; 4]; 4],
    view_proj: [[f32; 4]; 4],
    // near, far
    camera_near_far: [f32; 4],
    // width, height, light count
    framebuffer_dims: [u32; 4],
    // lighting only, face normals, visualize light count, visualize shading frequency
    flags: [u32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct GBufferDrawUniform {
    model: [[f32; 4]; 4],
    color: [f32; 4],
}

/// Ceiling-division dispatch grid: full coverage even when the framebuffer
/// is not a multiple of the tile size.
pub fn dispatch_extent(width: u32, height: u32) -> (u32, u32) {
    (width.div_ceil(COMPUTE_SHADER_TILE_GROUP_DIM), height.div_ceil(COMPUTE_SHADER_TILE_GROUP_DIM))
}

/// GBuffer laydown, stencil-classified full-screen deferred lighting, the
/// tile-based compute culling path and the GBuffer debug views.
pub struct DeferredEffect {
    frame_buffer: wgpu::Buffer,
    frame_bind: wgpu::BindGroup,
    light_buffer: wgpu::Buffer,
    light_bind: wgpu::BindGroup,
    gbuffer_read_bgls: [wgpu::BindGroupLayout; 4],
    culling_io_bgl: wgpu::BindGroupLayout,
    draw_pool: UniformPool<GBufferDrawUniform>,

    uniform: DeferredFrameUniform,
    samples: MsaaSamples,
}

impl DeferredEffect {
    pub fn init(
        device: &wgpu::Device,
        _states: &RenderStates,
        registry: &mut PassRegistry,
        surface_format: wgpu::TextureFormat,
    ) -> Result<Self> {
        registry.add_shader(device, "gbuffer", GBUFFER_SHADER, &[])?;
        for samples in MsaaSamples::ALL {
            let mut defines = msaa_defines(samples);
            defines.push(("GBufferTexture", color_texture_type(samples)));
            defines.push(("SceneDepthTexture", depth_texture_type(samples)));
            registry.add_shader(device, LIGHTING_SHADER_NAMES[samples.index()], LIGHTING_SHADER, &defines)?;
            registry.add_shader(device, CULLING_SHADER_NAMES[samples.index()], CULLING_SHADER, &defines)?;
        }

        let uniform_entry = |binding, visibility| wgpu::BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let frame_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Deferred Frame BGL"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX_FRAGMENT.union(wgpu::ShaderStages::COMPUTE),
            )],
        });
        let draw_bgl = Arc::new(device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("GBuffer Draw BGL"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT)],
        }));

        let gbuffer_read_bgls = MsaaSamples::ALL.map(|samples| {
            let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
                binding,
                visibility: wgpu::ShaderStages::FRAGMENT.union(wgpu::ShaderStages::COMPUTE),
                ty: wgpu::BindingType::Texture {
                    multisampled: samples.count() > 1,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                },
                count: None,
            };
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("GBuffer Read BGL"),
                entries: &[
                    texture_entry(0),
                    texture_entry(1),
                    texture_entry(2),
                    wgpu::BindGroupLayoutEntry {
                        binding: 3,
                        visibility: wgpu::ShaderStages::FRAGMENT.union(wgpu::ShaderStages::COMPUTE),
                        ty: wgpu::BindingType::Texture {
                            multisampled: samples.count() > 1,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            sample_type: wgpu::TextureSampleType::Depth,
                        },
                        count: None,
                    },
                ],
            })
        });

        let lights_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Light Buffer BGL"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT.union(wgpu::ShaderStages::COMPUTE),
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: true },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let culling_io_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Tile Culling IO BGL"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let gbuffer_targets = [
            Some(wgpu::ColorTargetState {
                format: GBUFFER_NORMAL_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            }),
            Some(wgpu::ColorTargetState {
                format: GBUFFER_ALBEDO_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            }),
            Some(wgpu::ColorTargetState {
                format: GBUFFER_POSZ_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            }),
        ];
        let lit_additive = [Some(wgpu::ColorTargetState {
            format: LIT_FORMAT,
            blend: Some(states::additive_blend()),
            write_mask: wgpu::ColorWrites::ALL,
        })];
        let surface_target = [Some(wgpu::ColorTargetState {
            format: surface_format,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        })];

        for samples in MsaaSamples::ALL {
            let lighting = LIGHTING_SHADER_NAMES[samples.index()];
            let gbuffer_read = &gbuffer_read_bgls[samples.index()];

            registry.add_render_pass(
                device,
                PassKey::new(Technique::GBuffer, samples),
                RenderPassDesc {
                    vs: "gbuffer",
                    fs: Some(("gbuffer", "fs_gbuffer")),
                    vertex_layouts: &[MeshVertex::layout()],
                    targets: &gbuffer_targets,
                    depth_stencil: Some(states::depth_greater_equal()),
                    bind_layouts: &[&frame_bgl, draw_bgl.as_ref()],
                    sample_count: samples.count(),
                    ..Default::default()
                },
            )?;

            // Marks pixels whose samples disagree; later passes stencil-test
            // against the mark to split per-pixel and per-sample shading.
            registry.add_render_pass(
                device,
                PassKey::new(Technique::LightingMask, samples),
                RenderPassDesc {
                    vs: lighting,
                    vs_entry: "vs_fullscreen",
                    fs: Some((lighting, "fs_per_sample_mask")),
                    targets: &[],
                    depth_stencil: Some(states::stencil_write()),
                    bind_layouts: &[&frame_bgl, gbuffer_read, &lights_bgl],
                    sample_count: samples.count(),
                    cull_mode: None,
                    stencil_reference: 1,
                    ..Default::default()
                },
            )?;
            registry.add_render_pass(
                device,
                PassKey::new(Technique::LightingPerPixel, samples),
                RenderPassDesc {
                    vs: lighting,
                    vs_entry: "vs_fullscreen",
                    fs: Some((lighting, "fs_lighting_per_pixel")),
                    targets: &lit_additive,
                    depth_stencil: Some(states::stencil_equal()),
                    bind_layouts: &[&frame_bgl, gbuffer_read, &lights_bgl],
                    sample_count: samples.count(),
                    cull_mode: None,
                    stencil_reference: 0,
                    ..Default::default()
                },
            )?;
            registry.add_render_pass(
                device,
                PassKey::new(Technique::LightingPerSample, samples),
                RenderPassDesc {
                    vs: lighting,
                    vs_entry: "vs_fullscreen",
                    fs: Some((lighting, "fs_lighting_per_sample")),
                    targets: &lit_additive,
                    depth_stencil: Some(states::stencil_equal()),
                    bind_layouts: &[&frame_bgl, gbuffer_read, &lights_bgl],
                    sample_count: samples.count(),
                    cull_mode: None,
                    stencil_reference: 1,
                    ..Default::default()
                },
            )?;

            for (technique, entry) in [
                (Technique::DebugNormals, "fs_debug_normal"),
                (Technique::DebugDepthGradient, "fs_debug_posz_grad"),
            ] {
                registry.add_render_pass(
                    device,
                    PassKey::new(technique, samples),
                    RenderPassDesc {
                        vs: lighting,
                        vs_entry: "vs_fullscreen",
                        fs: Some((lighting, entry)),
                        targets: &surface_target,
                        bind_layouts: &[&frame_bgl, gbuffer_read, &lights_bgl],
                        cull_mode: None,
                        ..Default::default()
                    },
                )?;
            }

            registry.add_compute_pass(
                device,
                PassKey::new(Technique::TileCulling, samples),
                CULLING_SHADER_NAMES[samples.index()],
                "cs_tile_culling",
                &[&frame_bgl, gbuffer_read, &culling_io_bgl],
            )?;
        }

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Deferred Frame Uniform"),
            size: std::mem::size_of::<DeferredFrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Deferred Frame BG"),
            layout: &frame_bgl,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: frame_buffer.as_entire_binding() }],
        });
        let light_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Point Light Buffer"),
            size: (MAX_POINT_LIGHTS * std::mem::size_of::<PointLightGpu>()) as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let light_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Point Light BG"),
            layout: &lights_bgl,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: light_buffer.as_entire_binding() }],
        });

        Ok(Self {
            frame_buffer,
            frame_bind,
            light_buffer,
            light_bind,
            gbuffer_read_bgls,
            culling_io_bgl,
            draw_pool: UniformPool::new(draw_bgl, "GBuffer Draw Uniform"),
            uniform: DeferredFrameUniform::zeroed(),
            samples: MsaaSamples::X1,
        })
    }

    pub fn set_msaa_samples(&mut self, samples: MsaaSamples) {
        self.samples = samples;
    }

    pub fn set_camera(&mut self, view: Mat4, proj: Mat4, near: f32, far: f32) {
        self.uniform.view = view.to_cols_array_2d();
        self.uniform.proj = proj.to_cols_array_2d();
        self.uniform.view_proj = (proj * view).to_cols_array_2d();
        self.uniform.camera_near_far = [near, far, 0.0, 0.0];
    }

    pub fn set_flags(&mut self, settings: &FrameSettings) {
        self.uniform.flags = [
            u32::from(settings.lighting_only),
            u32::from(settings.face_normals),
            u32::from(settings.visualize_light_count),
            u32::from(settings.visualize_shading_freq),
        ];
    }

    /// Uploads the clamped light list; extra lights are dropped.
    pub fn set_lights(&mut self, queue: &wgpu::Queue, lights: &[PointLight]) {
        let count = lights.len().min(MAX_POINT_LIGHTS);
        if lights.len() > MAX_POINT_LIGHTS {
            log::warn!("[deferred] {} lights exceed the buffer capacity {MAX_POINT_LIGHTS}", lights.len());
        }
        let gpu_lights: Vec<PointLightGpu> = lights[..count]
            .iter()
            .map(|light| PointLightGpu {
                position_radius: [light.position.x, light.position.y, light.position.z, light.radius],
                color_intensity: [light.color.x, light.color.y, light.color.z, 1.0],
            })
            .collect();
        if !gpu_lights.is_empty() {
            queue.write_buffer(&self.light_buffer, 0, bytemuck::cast_slice(&gpu_lights));
        }
        self.uniform.framebuffer_dims[2] = count as u32;
    }

    fn flush_frame_uniform(&mut self, queue: &wgpu::Queue, dims: PhysicalSize<u32>) {
        self.uniform.framebuffer_dims[0] = dims.width;
        self.uniform.framebuffer_dims[1] = dims.height;
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&self.uniform));
    }

    fn gbuffer_read_bind(&self, device: &wgpu::Device, gbuffer: &GBuffer, depth: &wgpu::TextureView) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("GBuffer Read BG"),
            layout: &self.gbuffer_read_bgls[self.samples.index()],
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.normal_specular_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.albedo_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(&gbuffer.posz_grad_view),
                },
                wgpu::BindGroupEntry { binding: 3, resource: wgpu::BindingResource::TextureView(depth) },
            ],
        })
    }

    /// Geometry pass: fills the GBuffer and the scene depth/stencil buffer.
    #[allow(clippy::too_many_arguments)]
    pub fn render_gbuffer(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        registry: &PassRegistry,
        gbuffer: &GBuffer,
        depth_view: &wgpu::TextureView,
        draws: &[MeshDraw<'_>],
    ) -> Result<()> {
        let pass = registry.pass(PassKey::new(Technique::GBuffer, self.samples))?;
        self.flush_frame_uniform(queue, gbuffer.size());
        self.draw_pool.reset();
        let draw_binds: Vec<wgpu::BindGroup> = draws
            .iter()
            .map(|draw| {
                let uniform = GBufferDrawUniform {
                    model: draw.model.to_cols_array_2d(),
                    color: [draw.color.x, draw.color.y, draw.color.z, 1.0],
                };
                self.draw_pool.next(device, queue, &uniform)
            })
            .collect();

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(pass.label()),
            color_attachments: &gbuffer.color_attachments(),
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
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
        rpass.set_bind_group(0, &self.frame_bind, &[]);
        for (draw, bind) in draws.iter().zip(&draw_binds) {
            rpass.set_bind_group(1, bind, &[]);
            rpass.set_vertex_buffer(0, draw.mesh.vertex_buffer.slice(..));
            rpass.set_index_buffer(draw.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..draw.mesh.index_count, 0, 0..1);
        }
        drop(rpass);
        self.draw_pool.trim(16);
        Ok(())
    }

    /// Stencil-classified full-screen lighting: mark pixels needing
    /// per-sample shading, light the rest per pixel, then light the marked
    /// ones per sample. Single-sample buffers skip the classification.
    #[allow(clippy::too_many_arguments)]
    pub fn compute_lighting(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        registry: &PassRegistry,
        lit_view: &wgpu::TextureView,
        depth_stencil_view: &wgpu::TextureView,
        gbuffer: &GBuffer,
        gbuffer_depth: &wgpu::TextureView,
    ) -> Result<()> {
        let gbuffer_bind = self.gbuffer_read_bind(device, gbuffer, gbuffer_depth);
        let multisampled = self.samples.count() > 1;

        if multisampled {
            let mask = registry.pass(PassKey::new(Technique::LightingMask, self.samples))?;
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(mask.label()),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_stencil_view,
                    depth_ops: None,
                    stencil_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            mask.bind(&mut rpass)?;
            rpass.set_bind_group(0, &self.frame_bind, &[]);
            rpass.set_bind_group(1, &gbuffer_bind, &[]);
            rpass.set_bind_group(2, &self.light_bind, &[]);
            rpass.draw(0..3, 0..1);
        }

        let mut passes = vec![Technique::LightingPerPixel];
        if multisampled {
            passes.push(Technique::LightingPerSample);
        }
        for technique in passes {
            let pass = registry.pass(PassKey::new(technique, self.samples))?;
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(pass.label()),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: lit_view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: if technique == Technique::LightingPerPixel {
                            wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT)
                        } else {
                            wgpu::LoadOp::Load
                        },
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_stencil_view,
                    depth_ops: None,
                    stencil_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    }),
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.bind(&mut rpass)?;
            rpass.set_bind_group(0, &self.frame_bind, &[]);
            rpass.set_bind_group(1, &gbuffer_bind, &[]);
            rpass.set_bind_group(2, &self.light_bind, &[]);
            rpass.draw(0..3, 0..1);
        }
        Ok(())
    }

    /// Tile-based light culling + shading in one compute dispatch, writing
    /// packed samples into the flat lit buffer.
    #[allow(clippy::too_many_arguments)]
    pub fn compute_tiled_light_culling(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        registry: &PassRegistry,
        gbuffer: &GBuffer,
        gbuffer_depth: &wgpu::TextureView,
        flat_output: &wgpu::Buffer,
    ) -> Result<()> {
        let pass = registry.pass(PassKey::new(Technique::TileCulling, self.samples))?;
        let dims = gbuffer.size();
        self.flush_frame_uniform(queue, dims);
        let gbuffer_bind = self.gbuffer_read_bind(device, gbuffer, gbuffer_depth);
        let io_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Tile Culling IO BG"),
            layout: &self.culling_io_bgl,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: self.light_buffer.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: flat_output.as_entire_binding() },
            ],
        });

        let (dispatch_x, dispatch_y) = dispatch_extent(dims.width, dims.height);
        let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(pass.label()),
            timestamp_writes: None,
        });
        cpass.set_pipeline(pass.compute_pipeline()?);
        cpass.set_bind_group(0, &self.frame_bind, &[]);
        cpass.set_bind_group(1, &gbuffer_bind, &[]);
        cpass.set_bind_group(2, &io_bind, &[]);
        cpass.dispatch_workgroups(dispatch_x, dispatch_y, 1);
        Ok(())
    }

    /// Full-screen GBuffer debug view straight to the surface.
    #[allow(clippy::too_many_arguments)]
    pub fn debug_gbuffer(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        registry: &PassRegistry,
        technique: Technique,
        gbuffer: &GBuffer,
        gbuffer_depth: &wgpu::TextureView,
        dst: &wgpu::TextureView,
    ) -> Result<()> {
        let pass = registry.pass(PassKey::new(technique, self.samples))?;
        self.flush_frame_uniform(queue, gbuffer.size());
        let gbuffer_bind = self.gbuffer_read_bind(device, gbuffer, gbuffer_depth);
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
        rpass.set_bind_group(0, &self.frame_bind, &[]);
        rpass.set_bind_group(1, &gbuffer_bind, &[]);
        rpass.set_bind_group(2, &self.light_bind, &[]);
        rpass.draw(0..3, 0..1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_extent_rounds_up() {
        assert_eq!(dispatch_extent(1920, 1080), (120, 68));
        assert_eq!(dispatch_extent(1, 1), (1, 1));
        assert_eq!(dispatch_extent(16, 16), (1, 1));
        assert_eq!(dispatch_extent(17, 16), (2, 1));
        assert_eq!(dispatch_extent(1600, 900), (100, 57));
    }

    #[test]
    fn dispatch_extent_covers_every_pixel() {
        for (w, h) in [(123, 456), (1024, 768), (1919, 1079)] {
            let (x, y) = dispatch_extent(w, h);
            assert!(x * COMPUTE_SHADER_TILE_GROUP_DIM >= w);
            assert!(y * COMPUTE_SHADER_TILE_GROUP_DIM >= h);
            assert!((x - 1) * COMPUTE_SHADER_TILE_GROUP_DIM < w);
            assert!((y - 1) * COMPUTE_SHADER_TILE_GROUP_DIM < h);
        }
    }
}
