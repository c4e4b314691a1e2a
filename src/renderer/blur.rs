use anyhow::Result;

use super::passes::{PassKey, PassRegistry, Technique};
use super::states::RenderStates;

const BLUR_SHADER: &str = include_str!("../../assets/shaders/blur.wgsl");

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct BlurUniform {
    texel: [f32; 2],
    kernel_size: u32,
    sigma: f32,
    direction: [f32; 2],
    exponent: f32,
    _padding: f32,
}

/// Full-screen separable blur for variance maps and single-pass log-space
/// Gaussian blur for exponential maps. The three pass directions keep their
/// own uniform buffers so one frame can encode every cascade's blur without
/// the writes trampling each other.
pub struct FullScreenBlurEffect {
    texture_bgl: wgpu::BindGroupLayout,
    uniform_x: wgpu::Buffer,
    uniform_y: wgpu::Buffer,
    uniform_log: wgpu::Buffer,
    bind_x: wgpu::BindGroup,
    bind_y: wgpu::BindGroup,
    bind_log: wgpu::BindGroup,
}

impl FullScreenBlurEffect {
    pub fn init(device: &wgpu::Device, _states: &RenderStates, registry: &mut PassRegistry) -> Result<Self> {
        registry.add_shader(device, "blur", BLUR_SHADER, &[])?;

        let uniform_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blur Uniform BGL"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let texture_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blur Texture BGL"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                },
                count: None,
            }],
        });

        let make_buffer = |label| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: std::mem::size_of::<BlurUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let uniform_x = make_buffer("Blur X Uniform");
        let uniform_y = make_buffer("Blur Y Uniform");
        let uniform_log = make_buffer("Log Blur Uniform");
        let make_bind = |label, buffer: &wgpu::Buffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &uniform_bgl,
                entries: &[wgpu::BindGroupEntry { binding: 0, resource: buffer.as_entire_binding() }],
            })
        };
        let bind_x = make_bind("Blur X BG", &uniform_x);
        let bind_y = make_bind("Blur Y BG", &uniform_y);
        let bind_log = make_bind("Log Blur BG", &uniform_log);

        let variance_target = [Some(wgpu::ColorTargetState {
            format: wgpu::TextureFormat::Rg32Float,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        })];
        let exponential_target = [Some(wgpu::ColorTargetState {
            format: wgpu::TextureFormat::R32Float,
            blend: None,
            write_mask: wgpu::ColorWrites::ALL,
        })];
        for (technique, entry, targets) in [
            (Technique::BlurX, "fs_separable", &variance_target),
            (Technique::BlurY, "fs_separable", &variance_target),
            (Technique::BlurLogGaussian, "fs_log_gaussian", &exponential_target),
        ] {
            registry.add_render_pass(
                device,
                PassKey::single(technique),
                super::passes::RenderPassDesc {
                    vs: "blur",
                    vs_entry: "vs_fullscreen",
                    fs: Some(("blur", entry)),
                    targets,
                    bind_layouts: &[&uniform_bgl, &texture_bgl],
                    cull_mode: None,
                    ..Default::default()
                },
            )?;
        }

        Ok(Self {
            texture_bgl,
            uniform_x,
            uniform_y,
            uniform_log,
            bind_x,
            bind_y,
            bind_log,
        })
    }

    /// Uploads this frame's blur parameters for all three pass flavors.
    pub fn set_params(
        &self,
        queue: &wgpu::Queue,
        shadow_size: u32,
        kernel_size: u32,
        sigma: f32,
        exponent: f32,
    ) {
        let texel = 1.0 / shadow_size.max(1) as f32;
        let base = BlurUniform {
            texel: [texel, texel],
            kernel_size,
            sigma,
            direction: [1.0, 0.0],
            exponent,
            _padding: 0.0,
        };
        queue.write_buffer(&self.uniform_x, 0, bytemuck::bytes_of(&base));
        let vertical = BlurUniform { direction: [0.0, 1.0], ..base };
        queue.write_buffer(&self.uniform_y, 0, bytemuck::bytes_of(&vertical));
        queue.write_buffer(&self.uniform_log, 0, bytemuck::bytes_of(&base));
    }

    pub fn blur_x(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        registry: &PassRegistry,
        src: &wgpu::TextureView,
        dst: &wgpu::TextureView,
        viewport: (f32, f32),
    ) -> Result<()> {
        self.run(device, encoder, registry, Technique::BlurX, &self.bind_x, src, dst, viewport)
    }

    pub fn blur_y(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        registry: &PassRegistry,
        src: &wgpu::TextureView,
        dst: &wgpu::TextureView,
        viewport: (f32, f32),
    ) -> Result<()> {
        self.run(device, encoder, registry, Technique::BlurY, &self.bind_y, src, dst, viewport)
    }

    /// Gaussian blur computed in log space, which keeps exponential shadow
    /// maps stable for large exponents.
    pub fn log_gaussian_blur(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        registry: &PassRegistry,
        src: &wgpu::TextureView,
        dst: &wgpu::TextureView,
        viewport: (f32, f32),
    ) -> Result<()> {
        self.run(device, encoder, registry, Technique::BlurLogGaussian, &self.bind_log, src, dst, viewport)
    }

    #[allow(clippy::too_many_arguments)]
    fn run(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        registry: &PassRegistry,
        technique: Technique,
        uniform_bind: &wgpu::BindGroup,
        src: &wgpu::TextureView,
        dst: &wgpu::TextureView,
        viewport: (f32, f32),
    ) -> Result<()> {
        let pass = registry.pass(PassKey::single(technique))?;
        let texture_bind = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blur Source BG"),
            layout: &self.texture_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(src),
            }],
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
        rpass.set_bind_group(0, uniform_bind, &[]);
        rpass.set_bind_group(1, &texture_bind, &[]);
        rpass.draw(0..3, 0..1);
        Ok(())
    }
}
