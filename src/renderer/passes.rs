use anyhow::{anyhow, Result};
use std::collections::HashMap;

/// Supported MSAA sample counts. Shader behavior under multisampling is
/// permutation-specific, so every technique that touches an MSAA surface is
/// compiled and registered once per count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsaaSamples {
    X1,
    X2,
    X4,
    X8,
}

impl MsaaSamples {
    pub const ALL: [MsaaSamples; 4] = [MsaaSamples::X1, MsaaSamples::X2, MsaaSamples::X4, MsaaSamples::X8];

    pub fn count(self) -> u32 {
        match self {
            MsaaSamples::X1 => 1,
            MsaaSamples::X2 => 2,
            MsaaSamples::X4 => 4,
            MsaaSamples::X8 => 8,
        }
    }

    /// Dense index for permutation tables.
    pub fn index(self) -> usize {
        match self {
            MsaaSamples::X1 => 0,
            MsaaSamples::X2 => 1,
            MsaaSamples::X4 => 2,
            MsaaSamples::X8 => 3,
        }
    }

    /// Rounds an arbitrary requested count down to the nearest supported one.
    pub fn from_count(count: u32) -> Self {
        match count {
            0..=1 => MsaaSamples::X1,
            2..=3 => MsaaSamples::X2,
            4..=7 => MsaaSamples::X4,
            _ => MsaaSamples::X8,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MsaaSamples::X1 => "None",
            MsaaSamples::X2 => "2x MSAA",
            MsaaSamples::X4 => "4x MSAA",
            MsaaSamples::X8 => "8x MSAA",
        }
    }
}

/// Interned pass identifiers. These replace runtime-formatted name strings:
/// the (technique, sample count) pair uniquely determines shader stages and
/// fixed-function state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Technique {
    GBuffer,
    LightingMask,
    LightingPerPixel,
    LightingPerSample,
    DebugNormals,
    DebugDepthGradient,
    TileCulling,
    ForwardStandard,
    ForwardVariance,
    ForwardExponential,
    ShadowStandard,
    ShadowVariance,
    ShadowExponential,
    BlurX,
    BlurY,
    BlurLogGaussian,
    SkyboxToneMap,
    SkyboxToneMapTiled,
    ShadowDebugView,
}

impl Technique {
    pub fn label(self) -> &'static str {
        match self {
            Technique::GBuffer => "gbuffer",
            Technique::LightingMask => "lighting_mask_stencil",
            Technique::LightingPerPixel => "lighting_per_pixel",
            Technique::LightingPerSample => "lighting_per_sample",
            Technique::DebugNormals => "debug_normals",
            Technique::DebugDepthGradient => "debug_depth_gradient",
            Technique::TileCulling => "tile_light_culling",
            Technique::ForwardStandard => "forward_csm",
            Technique::ForwardVariance => "forward_vsm",
            Technique::ForwardExponential => "forward_esm",
            Technique::ShadowStandard => "shadow_depth",
            Technique::ShadowVariance => "shadow_variance",
            Technique::ShadowExponential => "shadow_exponential",
            Technique::BlurX => "blur_x",
            Technique::BlurY => "blur_y",
            Technique::BlurLogGaussian => "blur_log_gaussian",
            Technique::SkyboxToneMap => "skybox_tonemap",
            Technique::SkyboxToneMapTiled => "skybox_tonemap_tiled",
            Technique::ShadowDebugView => "shadow_debug_view",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PassKey {
    pub technique: Technique,
    pub samples: MsaaSamples,
}

impl PassKey {
    pub fn new(technique: Technique, samples: MsaaSamples) -> Self {
        Self { technique, samples }
    }

    /// Key for techniques that never touch an MSAA surface.
    pub fn single(technique: Technique) -> Self {
        Self { technique, samples: MsaaSamples::X1 }
    }

    pub fn display_name(&self) -> String {
        format!("{}_{}x", self.technique.label(), self.samples.count())
    }
}

/// Rewrites `const NAME: <ty> = <value>;` and `alias NAME = <ty>;`
/// declarations in WGSL source. This is how one logical shader yields the
/// per-sample-count variants: the sample count (and the matching
/// single/multisampled texture types) are spliced into the source before
/// module creation.
pub fn apply_defines(source: &str, defines: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(source.len());
    for line in source.lines() {
        let trimmed = line.trim_start();
        let mut replaced = false;
        let declaration = trimmed
            .strip_prefix("const ")
            .map(|rest| (rest, ":"))
            .or_else(|| trimmed.strip_prefix("alias ").map(|rest| (rest, "=")));
        if let Some((rest, terminator)) = declaration {
            for (name, value) in defines {
                let Some(after_name) = rest.strip_prefix(name) else { continue };
                if !after_name.trim_start().starts_with(terminator) {
                    continue;
                }
                let Some(eq) = line.find('=') else { continue };
                out.push_str(&line[..eq]);
                out.push_str("= ");
                out.push_str(value);
                out.push(';');
                replaced = true;
                break;
            }
        }
        if !replaced {
            out.push_str(line);
        }
        out.push('\n');
    }
    out
}

/// Convenience for the MSAA permutation define.
pub fn msaa_defines(samples: MsaaSamples) -> Vec<(&'static str, String)> {
    vec![("MSAA_SAMPLES", format!("{}u", samples.count()))]
}

/// WGSL color texture type matching the sample count.
pub fn color_texture_type(samples: MsaaSamples) -> String {
    if samples.count() > 1 {
        "texture_multisampled_2d<f32>".to_string()
    } else {
        "texture_2d<f32>".to_string()
    }
}

/// WGSL depth texture type matching the sample count.
pub fn depth_texture_type(samples: MsaaSamples) -> String {
    if samples.count() > 1 {
        "texture_depth_multisampled_2d".to_string()
    } else {
        "texture_depth_2d".to_string()
    }
}

enum PassPipeline {
    Render(wgpu::RenderPipeline),
    Compute(wgpu::ComputePipeline),
}

/// A named, immutable combination of shader stages and fixed-function state.
pub struct Pass {
    label: String,
    pipeline: PassPipeline,
    stencil_reference: u32,
}

impl Pass {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Binds this pass onto a render pass encoder.
    pub fn bind(&self, rpass: &mut wgpu::RenderPass<'_>) -> Result<()> {
        match &self.pipeline {
            PassPipeline::Render(pipeline) => {
                rpass.set_pipeline(pipeline);
                rpass.set_stencil_reference(self.stencil_reference);
                Ok(())
            }
            PassPipeline::Compute(_) => Err(anyhow!("pass '{}' is a compute pass", self.label)),
        }
    }

    pub fn compute_pipeline(&self) -> Result<&wgpu::ComputePipeline> {
        match &self.pipeline {
            PassPipeline::Compute(pipeline) => Ok(pipeline),
            PassPipeline::Render(_) => Err(anyhow!("pass '{}' is a render pass", self.label)),
        }
    }
}

/// Descriptor for building a render pass pipeline out of registered shaders.
pub struct RenderPassDesc<'a> {
    pub vs: &'static str,
    pub vs_entry: &'static str,
    pub fs: Option<(&'static str, &'static str)>,
    pub vertex_layouts: &'a [wgpu::VertexBufferLayout<'static>],
    pub targets: &'a [Option<wgpu::ColorTargetState>],
    pub depth_stencil: Option<wgpu::DepthStencilState>,
    pub bind_layouts: &'a [&'a wgpu::BindGroupLayout],
    pub sample_count: u32,
    pub cull_mode: Option<wgpu::Face>,
    pub stencil_reference: u32,
}

impl Default for RenderPassDesc<'_> {
    fn default() -> Self {
        Self {
            vs: "",
            vs_entry: "vs_main",
            fs: None,
            vertex_layouts: &[],
            targets: &[],
            depth_stencil: None,
            bind_layouts: &[],
            sample_count: 1,
            cull_mode: Some(wgpu::Face::Back),
            stencil_reference: 0,
        }
    }
}

/// Compiles and caches shader modules and passes. Shaders are registered
/// under unique names; passes under unique (technique, sample count) keys.
/// Both kinds of duplicate registration fail, as does referencing a shader
/// that was never registered.
#[derive(Default)]
pub struct PassRegistry {
    shaders: HashMap<&'static str, wgpu::ShaderModule>,
    passes: HashMap<PassKey, Pass>,
}

impl PassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_shader(
        &mut self,
        device: &wgpu::Device,
        name: &'static str,
        source: &str,
        defines: &[(&str, String)],
    ) -> Result<()> {
        if self.shaders.contains_key(name) {
            return Err(anyhow!("shader '{name}' is already registered"));
        }
        let processed = apply_defines(source, defines);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(name),
            source: wgpu::ShaderSource::Wgsl(processed.into()),
        });
        self.shaders.insert(name, module);
        Ok(())
    }

    fn shader(&self, name: &'static str) -> Result<&wgpu::ShaderModule> {
        self.shaders.get(name).ok_or_else(|| anyhow!("shader '{name}' is not registered"))
    }

    pub fn add_render_pass(
        &mut self,
        device: &wgpu::Device,
        key: PassKey,
        desc: RenderPassDesc<'_>,
    ) -> Result<()> {
        if self.passes.contains_key(&key) {
            return Err(anyhow!("pass '{}' is already registered", key.display_name()));
        }
        let label = key.display_name();
        let vs_module = self.shader(desc.vs)?;
        let fragment = match desc.fs {
            Some((fs, entry)) => Some(wgpu::FragmentState {
                module: self.shader(fs)?,
                entry_point: Some(entry),
                targets: desc.targets,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            None => None,
        };
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&label),
            bind_group_layouts: desc.bind_layouts,
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&label),
            layout: Some(&layout),
            vertex: wgpu::VertexState {
                module: vs_module,
                entry_point: Some(desc.vs_entry),
                buffers: desc.vertex_layouts,
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment,
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: desc.cull_mode,
                ..Default::default()
            },
            depth_stencil: desc.depth_stencil,
            multisample: wgpu::MultisampleState {
                count: desc.sample_count,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });
        self.passes.insert(
            key,
            Pass {
                label,
                pipeline: PassPipeline::Render(pipeline),
                stencil_reference: desc.stencil_reference,
            },
        );
        Ok(())
    }

    pub fn add_compute_pass(
        &mut self,
        device: &wgpu::Device,
        key: PassKey,
        cs: &'static str,
        entry: &'static str,
        bind_layouts: &[&wgpu::BindGroupLayout],
    ) -> Result<()> {
        if self.passes.contains_key(&key) {
            return Err(anyhow!("pass '{}' is already registered", key.display_name()));
        }
        let label = key.display_name();
        let module = self.shader(cs)?;
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&label),
            bind_group_layouts: bind_layouts,
            push_constant_ranges: &[],
        });
        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&label),
            layout: Some(&layout),
            module,
            entry_point: Some(entry),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });
        self.passes
            .insert(key, Pass { label, pipeline: PassPipeline::Compute(pipeline), stencil_reference: 0 });
        Ok(())
    }

    /// Callers must not request keys that were never registered.
    pub fn pass(&self, key: PassKey) -> Result<&Pass> {
        self.passes.get(&key).ok_or_else(|| anyhow!("pass '{}' is not registered", key.display_name()))
    }

    pub fn contains(&self, key: PassKey) -> bool {
        self.passes.contains_key(&key)
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }
}

/// Pool of per-draw uniform buffers. `queue.write_buffer` only lands at
/// submit time, so every draw recorded into one encoder needs its own
/// buffer; the pool grows on demand and is rewound each frame.
pub struct UniformPool<T> {
    layout: std::sync::Arc<wgpu::BindGroupLayout>,
    label: &'static str,
    entries: Vec<(wgpu::Buffer, wgpu::BindGroup)>,
    cursor: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T: bytemuck::Pod> UniformPool<T> {
    pub fn new(layout: std::sync::Arc<wgpu::BindGroupLayout>, label: &'static str) -> Self {
        Self { layout, label, entries: Vec::new(), cursor: 0, _marker: std::marker::PhantomData }
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Writes `value` into the next pooled buffer and returns its bind group.
    pub fn next(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, value: &T) -> wgpu::BindGroup {
        if self.cursor >= self.entries.len() {
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(self.label),
                size: std::mem::size_of::<T>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(self.label),
                layout: &self.layout,
                entries: &[wgpu::BindGroupEntry { binding: 0, resource: buffer.as_entire_binding() }],
            });
            self.entries.push((buffer, bind_group));
        }
        let (buffer, bind_group) = &self.entries[self.cursor];
        self.cursor += 1;
        queue.write_buffer(buffer, 0, bytemuck::bytes_of(value));
        bind_group.clone()
    }

    /// Drops buffers beyond the high-water mark plus some headroom.
    pub fn trim(&mut self, headroom: usize) {
        let keep = self.cursor.saturating_add(headroom);
        if self.entries.len() > keep {
            self.entries.truncate(keep);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msaa_from_count_rounds_down() {
        assert_eq!(MsaaSamples::from_count(0), MsaaSamples::X1);
        assert_eq!(MsaaSamples::from_count(3), MsaaSamples::X2);
        assert_eq!(MsaaSamples::from_count(6), MsaaSamples::X4);
        assert_eq!(MsaaSamples::from_count(32), MsaaSamples::X8);
    }

    #[test]
    fn pass_keys_never_alias_across_sample_counts() {
        let mut seen = std::collections::HashSet::new();
        for samples in MsaaSamples::ALL {
            assert!(seen.insert(PassKey::new(Technique::GBuffer, samples)));
        }
        assert_eq!(seen.len(), 4);
        assert!(!seen.contains(&PassKey::new(Technique::LightingPerPixel, MsaaSamples::X1)));
    }

    #[test]
    fn display_names_encode_sample_count() {
        let key = PassKey::new(Technique::TileCulling, MsaaSamples::X4);
        assert_eq!(key.display_name(), "tile_light_culling_4x");
    }

    #[test]
    fn apply_defines_rewrites_const_lines() {
        let source = "const MSAA_SAMPLES: u32 = 1u;\nconst OTHER: f32 = 2.0;\nfn main() {}\n";
        let out = apply_defines(source, &msaa_defines(MsaaSamples::X8));
        assert!(out.contains("const MSAA_SAMPLES: u32 = 8u;"));
        assert!(out.contains("const OTHER: f32 = 2.0;"));
        assert!(out.contains("fn main() {}"));
    }

    #[test]
    fn apply_defines_ignores_prefix_matches() {
        let source = "const MSAA_SAMPLES_LOG2: u32 = 0u;\n";
        let out = apply_defines(source, &msaa_defines(MsaaSamples::X4));
        assert_eq!(out, source);
    }

    #[test]
    fn apply_defines_rewrites_alias_lines() {
        let source = "alias LitTexture = texture_2d<f32>;\nvar t: LitTexture;\n";
        let out = apply_defines(
            source,
            &[("LitTexture", "texture_multisampled_2d<f32>".to_string())],
        );
        assert!(out.contains("alias LitTexture = texture_multisampled_2d<f32>;"));
        assert!(out.contains("var t: LitTexture;"));
    }
}
