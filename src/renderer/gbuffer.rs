use anyhow::Result;
use winit::dpi::PhysicalSize;

use super::passes::MsaaSamples;
use super::{GBUFFER_ALBEDO_FORMAT, GBUFFER_NORMAL_FORMAT, GBUFFER_POSZ_FORMAT, LIT_FORMAT, SCENE_DEPTH_FORMAT};

fn create_target(
    device: &wgpu::Device,
    label: &str,
    size: PhysicalSize<u32>,
    samples: u32,
    format: wgpu::TextureFormat,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: samples,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

/// Geometry-pass outputs, allocated per (resolution, sample count).
pub struct GBuffer {
    pub normal_specular_view: wgpu::TextureView,
    pub albedo_view: wgpu::TextureView,
    pub posz_grad_view: wgpu::TextureView,
    size: PhysicalSize<u32>,
    samples: MsaaSamples,
    normal_specular: wgpu::Texture,
    albedo: wgpu::Texture,
    posz_grad: wgpu::Texture,
}

impl GBuffer {
    pub fn new(device: &wgpu::Device, size: PhysicalSize<u32>, samples: MsaaSamples) -> Self {
        let count = samples.count();
        let (normal_specular, normal_specular_view) =
            create_target(device, "GBuffer Normal+Specular", size, count, GBUFFER_NORMAL_FORMAT);
        let (albedo, albedo_view) = create_target(device, "GBuffer Albedo", size, count, GBUFFER_ALBEDO_FORMAT);
        let (posz_grad, posz_grad_view) =
            create_target(device, "GBuffer PosZ Gradient", size, count, GBUFFER_POSZ_FORMAT);
        Self { normal_specular_view, albedo_view, posz_grad_view, size, samples, normal_specular, albedo, posz_grad }
    }

    pub fn matches(&self, size: PhysicalSize<u32>, samples: MsaaSamples) -> bool {
        self.size == size && self.samples == samples
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn samples(&self) -> MsaaSamples {
        self.samples
    }

    pub fn color_attachments(&self) -> [Option<wgpu::RenderPassColorAttachment<'_>>; 3] {
        let clear = |view| {
            Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })
        };
        [clear(&self.normal_specular_view), clear(&self.albedo_view), clear(&self.posz_grad_view)]
    }

    /// Keeps the textures alive while only views are handed out.
    pub fn textures(&self) -> [&wgpu::Texture; 3] {
        [&self.normal_specular, &self.albedo, &self.posz_grad]
    }
}

/// Lighting outputs: the HDR lit texture for the forward and full-screen
/// deferred paths, a flat storage buffer for the tiled compute path (MSAA
/// textures cannot be written from a compute shader), and the scene
/// depth/stencil target.
pub struct LitBuffers {
    pub lit_view: wgpu::TextureView,
    pub depth_view: wgpu::TextureView,
    pub flat_buffer: wgpu::Buffer,
    size: PhysicalSize<u32>,
    samples: MsaaSamples,
    lit: wgpu::Texture,
    depth: wgpu::Texture,
}

impl LitBuffers {
    pub fn new(device: &wgpu::Device, size: PhysicalSize<u32>, samples: MsaaSamples) -> Result<Self> {
        let count = samples.count();
        let (lit, lit_view) = create_target(device, "Lit Buffer", size, count, LIT_FORMAT);
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Scene Depth Buffer"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: count,
            dimension: wgpu::TextureDimension::D2,
            format: SCENE_DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());
        let texels = size.width.max(1) as u64 * size.height.max(1) as u64 * count as u64;
        let flat_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Lit Flat Buffer"),
            // one packed rgba16f pair (2 x u32) per sample
            size: texels * 8,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });
        Ok(Self { lit_view, depth_view, flat_buffer, size, samples, lit, depth })
    }

    pub fn matches(&self, size: PhysicalSize<u32>, samples: MsaaSamples) -> bool {
        self.size == size && self.samples == samples
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn samples(&self) -> MsaaSamples {
        self.samples
    }

    pub fn depth_only_view(&self) -> wgpu::TextureView {
        self.depth.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Scene Depth (depth aspect)"),
            aspect: wgpu::TextureAspect::DepthOnly,
            ..Default::default()
        })
    }

    pub fn lit_texture(&self) -> &wgpu::Texture {
        &self.lit
    }
}
