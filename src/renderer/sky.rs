use anyhow::Result;
use bytemuck::Zeroable;
use glam::Mat4;

use super::passes::{
    color_texture_type, depth_texture_type, msaa_defines, MsaaSamples, PassKey, PassRegistry,
    RenderPassDesc, Technique,
};
use super::states::RenderStates;

const SKY_SHADER: &str = include_str!("../../assets/shaders/skybox_tonemap.wgsl");

const SKY_SHADER_NAMES: [&str; 4] =
    ["skybox_tonemap_1x", "skybox_tonemap_2x", "skybox_tonemap_4x", "skybox_tonemap_8x"];

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct SkyFrameUniform {
    inv_view_proj: [[f32; 4]; 4],
    // width, height, flat-buffer stride flag
    dims: [u32; 4],
}

/// Composites the lit scene with a procedural sky and tone-maps to the
/// surface. One pass permutation per lit-buffer sample count (the shader
/// resolves MSAA itself); a second family reads the tiled path's flat
/// buffer instead of the lit texture.
pub struct SkyboxToneMapEffect {
    frame_buffer: wgpu::Buffer,
    frame_bind: wgpu::BindGroup,
    texture_bgls: [wgpu::BindGroupLayout; 4],
    flat_bgls: [wgpu::BindGroupLayout; 4],
    uniform: SkyFrameUniform,
    samples: MsaaSamples,
}

impl SkyboxToneMapEffect {
    pub fn init(
        device: &wgpu::Device,
        _states: &RenderStates,
        registry: &mut PassRegistry,
        surface_format: wgpu::TextureFormat,
    ) -> Result<Self> {
        for samples in MsaaSamples::ALL {
            let mut defines = msaa_defines(samples);
            defines.push(("LitTexture", color_texture_type(samples)));
            defines.push(("SceneDepthTexture", depth_texture_type(samples)));
            registry.add_shader(device, SKY_SHADER_NAMES[samples.index()], SKY_SHADER, &defines)?;
        }

        let frame_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Sky Frame BGL"),
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
        });
        let texture_bgls = MsaaSamples::ALL.map(|samples| {
            let multisampled = samples.count() > 1;
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Sky Inputs BGL"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            multisampled,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            multisampled,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            sample_type: wgpu::TextureSampleType::Depth,
                        },
                        count: None,
                    },
                ],
            })
        });
        // The flat buffer sits at binding 2: the shader module declares the
        // lit texture at binding 0 and both composite entry points share the
        // depth declaration at binding 1.
        let flat_bgls = MsaaSamples::ALL.map(|samples| {
            let multisampled = samples.count() > 1;
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Sky Flat Inputs BGL"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            multisampled,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            sample_type: wgpu::TextureSampleType::Depth,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Storage { read_only: true },
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    },
                ],
            })
        });

        let surface_target = [Some(wgpu::ColorTargetState {
            format: surface_format,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        })];
        for samples in MsaaSamples::ALL {
            let shader = SKY_SHADER_NAMES[samples.index()];
            registry.add_render_pass(
                device,
                PassKey::new(Technique::SkyboxToneMap, samples),
                RenderPassDesc {
                    vs: shader,
                    vs_entry: "vs_fullscreen",
                    fs: Some((shader, "fs_composite")),
                    targets: &surface_target,
                    bind_layouts: &[&frame_bgl, &texture_bgls[samples.index()]],
                    cull_mode: None,
                    ..Default::default()
                },
            )?;
            registry.add_render_pass(
                device,
                PassKey::new(Technique::SkyboxToneMapTiled, samples),
                RenderPassDesc {
                    vs: shader,
                    vs_entry: "vs_fullscreen",
                    fs: Some((shader, "fs_composite_flat")),
                    targets: &surface_target,
                    bind_layouts: &[&frame_bgl, &flat_bgls[samples.index()]],
                    cull_mode: None,
                    ..Default::default()
                },
            )?;
        }

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Sky Frame Uniform"),
            size: std::mem::size_of::<SkyFrameUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sky Frame BG"),
            layout: &frame_bgl,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: frame_buffer.as_entire_binding() }],
        });

        Ok(Self {
            frame_buffer,
            frame_bind,
            texture_bgls,
            flat_bgls,
            uniform: SkyFrameUniform::zeroed(),
            samples: MsaaSamples::X1,
        })
    }

    pub fn set_msaa_samples(&mut self, samples: MsaaSamples) {
        self.samples = samples;
    }

    /// Camera matrices for reconstructing the sky-ray direction; the
    /// translation is dropped so the sky stays at infinity.
    pub fn set_camera(&mut self, view: Mat4, proj: Mat4) {
        let mut rotation_only = view;
        rotation_only.w_axis = glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        self.uniform.inv_view_proj = (proj * rotation_only).inverse().to_cols_array_2d();
    }

    /// Composite from the MSAA lit texture (forward and full-screen
    /// deferred paths).
    #[allow(clippy::too_many_arguments)]
    pub fn composite(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        registry: &PassRegistry,
        lit_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        dims: (u32, u32),
        dst: &wgpu::TextureView,
    ) -> Result<()> {
        let bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sky Inputs BG"),
            layout: &self.texture_bgls[self.samples.index()],
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(lit_view) },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(depth_view),
                },
            ],
        });
        self.run(queue, encoder, registry, Technique::SkyboxToneMap, bind, dims, dst)
    }

    /// Composite from the tiled path's flat lit buffer.
    #[allow(clippy::too_many_arguments)]
    pub fn composite_flat(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        registry: &PassRegistry,
        flat_buffer: &wgpu::Buffer,
        depth_view: &wgpu::TextureView,
        dims: (u32, u32),
        dst: &wgpu::TextureView,
    ) -> Result<()> {
        let bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sky Flat Inputs BG"),
            layout: &self.flat_bgls[self.samples.index()],
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(depth_view),
                },
                wgpu::BindGroupEntry { binding: 2, resource: flat_buffer.as_entire_binding() },
            ],
        });
        self.run(queue, encoder, registry, Technique::SkyboxToneMapTiled, bind, dims, dst)
    }

    fn run(
        &mut self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        registry: &PassRegistry,
        technique: Technique,
        bind: wgpu::BindGroup,
        dims: (u32, u32),
        dst: &wgpu::TextureView,
    ) -> Result<()> {
        let pass = registry.pass(PassKey::new(technique, self.samples))?;
        self.uniform.dims = [dims.0, dims.1, self.samples.count(), 0];
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&self.uniform));
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
        rpass.set_bind_group(1, &bind, &[]);
        rpass.draw(0..3, 0..1);
        Ok(())
    }
}
