use anyhow::{Context, Result};
use glam::{Mat4, Vec3, Vec4};
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;

pub mod bindings;
pub mod blur;
pub mod cascades;
pub mod deferred;
pub mod forward;
pub mod gbuffer;
pub mod gpu_timer;
pub mod passes;
pub mod shadow;
pub mod sky;
pub mod states;
pub mod surface;

use crate::camera3d::{reverse_depth, Camera3D};
use crate::config::AppConfig;
use crate::scene::{Aabb, DemoScene, MeshDraw};
use crate::settings::{CameraSelection, FrameSettings, GBufferDebug, LightingMode, ShadowMode};
use bindings::{slots, ResourceBindings};
use blur::FullScreenBlurEffect;
use cascades::CascadeShadowManager;
use deferred::DeferredEffect;
use forward::ForwardEffect;
use gbuffer::{GBuffer, LitBuffers};
pub use gpu_timer::{GpuPass, GpuPassTiming, GpuTimer};
pub use passes::{MsaaSamples, PassKey, PassRegistry, Technique};
use shadow::ShadowEffect;
use sky::SkyboxToneMapEffect;
use states::RenderStates;
pub use surface::{SurfaceFrame, WindowSurface};

pub const MAX_CASCADES: usize = 8;
pub const MAX_POINT_LIGHTS: usize = 256;
/// Tile edge in pixels for the compute light-culling pass.
pub const COMPUTE_SHADER_TILE_GROUP_DIM: u32 = 16;

pub const SHADOW_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
pub const SCENE_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;
pub const LIT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const GBUFFER_NORMAL_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
pub const GBUFFER_ALBEDO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const GBUFFER_POSZ_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rg16Float;

/// Matrix products derived from (world, view, projection) in one place, so
/// every effect agrees on multiplication order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedMatrices {
    pub world_view: Mat4,
    pub world_view_proj: Mat4,
    pub view_proj: Mat4,
    pub inv_view: Mat4,
}

impl DerivedMatrices {
    pub fn compute(world: Mat4, view: Mat4, proj: Mat4) -> Self {
        let world_view = view * world;
        Self {
            world_view,
            world_view_proj: proj * world_view,
            view_proj: proj * view,
            inv_view: view.inverse(),
        }
    }
}

/// Frustum planes of a view-projection matrix as (normal, distance) rows;
/// a point p is inside when `dot(plane.xyz, p) + plane.w >= 0`.
pub fn extract_frustum_planes(view_proj: Mat4) -> [Vec4; 6] {
    let m = view_proj;
    let row = |i: usize| Vec4::new(m.x_axis[i], m.y_axis[i], m.z_axis[i], m.w_axis[i]);
    let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));
    let normalize = |p: Vec4| {
        let len = p.truncate().length();
        if len > 1e-6 {
            p / len
        } else {
            p
        }
    };
    [
        normalize(r3 + r0),
        normalize(r3 - r0),
        normalize(r3 + r1),
        normalize(r3 - r1),
        // wgpu clip space: 0 <= z <= w
        normalize(r2),
        normalize(r3 - r2),
    ]
}

/// Conservative AABB-vs-frustum test (p-vertex).
pub fn aabb_in_frustum(bounds: &Aabb, planes: &[Vec4; 6]) -> bool {
    for plane in planes {
        let p = Vec3::new(
            if plane.x >= 0.0 { bounds.max.x } else { bounds.min.x },
            if plane.y >= 0.0 { bounds.max.y } else { bounds.min.y },
            if plane.z >= 0.0 { bounds.max.z } else { bounds.min.z },
        );
        if plane.truncate().dot(p) + plane.w < 0.0 {
            return false;
        }
    }
    true
}

struct EffectSuite {
    shadow: ShadowEffect,
    forward: ForwardEffect,
    deferred: DeferredEffect,
    sky: SkyboxToneMapEffect,
    blur: FullScreenBlurEffect,
}

/// Everything the orchestrator needs to draw one frame.
pub struct FrameContext<'a> {
    pub scene: &'a DemoScene,
    pub settings: &'a FrameSettings,
    pub viewer: &'a Camera3D,
    pub light: &'a Camera3D,
}

/// Frame orchestrator. Owns the pass registry, all effects, the cascade
/// manager and the size-dependent render targets; runs the fixed
/// shadow -> lighting -> composite -> present sequence every frame.
pub struct Renderer {
    surface: WindowSurface,
    registry: PassRegistry,
    states: Option<RenderStates>,
    effects: Option<EffectSuite>,
    pub cascades: CascadeShadowManager,
    bindings: ResourceBindings,
    gbuffer: Option<GBuffer>,
    lit: Option<LitBuffers>,
    timer: Option<GpuTimer>,
    debug_shadow: Option<(wgpu::Texture, wgpu::TextureView, u32)>,
    samples: MsaaSamples,
}

impl Renderer {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            surface: WindowSurface::new(&config.window),
            registry: PassRegistry::new(),
            states: None,
            effects: None,
            cascades: CascadeShadowManager::new(),
            bindings: ResourceBindings::new(),
            gbuffer: None,
            lit: None,
            timer: None,
            debug_shadow: None,
            samples: MsaaSamples::X1,
        }
    }

    pub fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        self.surface.ensure_window(event_loop)?;
        if self.effects.is_none() {
            self.init_effects()?;
        }
        Ok(())
    }

    pub fn surface(&self) -> &WindowSurface {
        &self.surface
    }

    pub fn device(&self) -> Result<&wgpu::Device> {
        self.surface.device()
    }

    pub fn queue(&self) -> Result<&wgpu::Queue> {
        self.surface.queue()
    }

    pub fn surface_format(&self) -> Result<wgpu::TextureFormat> {
        self.surface.surface_format()
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.surface.size()
    }

    pub fn window(&self) -> Option<&winit::window::Window> {
        self.surface.window()
    }

    pub fn pixels_per_point(&self) -> f32 {
        self.surface.pixels_per_point()
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.surface.resize(new_size);
        // lit/gbuffer reallocation happens lazily next frame
    }

    pub fn pass_timings(&self) -> Vec<GpuPassTiming> {
        self.timer.as_ref().map(|t| t.timings()).unwrap_or_default()
    }

    pub fn average_pass_ms(&self, pass: GpuPass) -> f32 {
        self.timer.as_ref().map(|t| t.average_time_ms(pass)).unwrap_or(0.0)
    }

    pub fn debug_shadow_view(&self) -> Option<&wgpu::TextureView> {
        self.debug_shadow.as_ref().map(|(_, view, _)| view)
    }

    /// Shared fixed-function presets; `None` until the device exists.
    pub fn render_states(&self) -> Option<&RenderStates> {
        self.states.as_ref()
    }

    /// Render-state presets and every shader/pass permutation are built
    /// once, right after the device exists. Pass registration failures are
    /// fatal: a missing variant means the technique cannot render.
    fn init_effects(&mut self) -> Result<()> {
        let device = self.surface.device()?.clone();
        let queue = self.surface.queue()?.clone();
        let surface_format = self.surface.surface_format()?;
        let states = RenderStates::new(&device);
        let shadow = ShadowEffect::init(&device, &states, &mut self.registry)?;
        let forward = ForwardEffect::init(&device, &states, &mut self.registry)?;
        let deferred = DeferredEffect::init(&device, &states, &mut self.registry, surface_format)?;
        let sky = SkyboxToneMapEffect::init(&device, &states, &mut self.registry, surface_format)?;
        let blur = FullScreenBlurEffect::init(&device, &states, &mut self.registry)?;
        log::info!("[renderer] registered {} passes", self.registry.pass_count());
        self.timer = Some(GpuTimer::new(&device, &queue, self.surface.gpu_timing_supported()));
        self.states = Some(states);
        self.effects = Some(EffectSuite { shadow, forward, deferred, sky, blur });
        Ok(())
    }

    /// Reacts to UI-driven state: MSAA count, cascade count/size and shadow
    /// algorithm changes invalidate GPU resources here. Idempotent when
    /// nothing changed.
    pub fn apply_settings(&mut self, settings: &FrameSettings) -> Result<()> {
        let device = self.surface.device()?.clone();
        let samples = MsaaSamples::from_count(settings.msaa_samples);
        let mut invalidated = samples != self.samples;
        self.samples = samples;

        let before = (
            self.cascades.cascade_count(),
            self.cascades.shadow_size(),
            self.cascades.shadow_map_format(),
        );
        self.cascades.init_resource(
            &device,
            settings.cascade_count,
            settings.shadow_mode.map_components(),
            settings.shadow_size,
        )?;
        invalidated |= before
            != (self.cascades.cascade_count(), self.cascades.shadow_size(), self.cascades.shadow_map_format());
        self.cascades.apply_settings(settings);

        if invalidated {
            if let Some(timer) = self.timer.as_mut() {
                timer.reset();
            }
        }
        Ok(())
    }

    /// Lit buffer, depth buffer and GBuffer follow the client area and the
    /// MSAA sample count; any mismatch drops and reallocates them.
    fn ensure_targets(&mut self, settings: &FrameSettings) -> Result<()> {
        let device = self.surface.device()?.clone();
        let size = self.surface.size();
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }
        let needs_lit = self.lit.as_ref().map_or(true, |lit| !lit.matches(size, self.samples));
        if needs_lit {
            self.lit = Some(LitBuffers::new(&device, size, self.samples)?);
        }
        let needs_gbuffer = self.gbuffer.as_ref().map_or(true, |g| !g.matches(size, self.samples));
        if needs_gbuffer {
            self.gbuffer = Some(GBuffer::new(&device, size, self.samples));
        }
        let shadow_size = self.cascades.shadow_size();
        let needs_debug = settings.debug_shadow
            && self.debug_shadow.as_ref().map_or(true, |(_, _, s)| *s != shadow_size);
        if needs_debug {
            let texture = device.create_texture(&wgpu::TextureDescriptor {
                label: Some("Shadow Debug Buffer"),
                size: wgpu::Extent3d { width: shadow_size, height: shadow_size, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            });
            let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
            self.debug_shadow = Some((texture, view, shadow_size));
        }
        Ok(())
    }

    /// Runs one frame: shadow pass over all cascades, the selected lighting
    /// path, the composite, an optional overlay, then present. Transitions
    /// are unconditional; a failed frame propagates its error.
    pub fn render_frame(
        &mut self,
        ctx: FrameContext<'_>,
        overlay: impl FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    ) -> Result<()> {
        self.apply_settings(ctx.settings)?;
        self.ensure_targets(ctx.settings)?;

        let device = self.surface.device()?.clone();
        let queue = self.surface.queue()?.clone();
        let size = self.surface.size();
        if size.width == 0 || size.height == 0 {
            return Ok(());
        }
        let aspect = self.surface.aspect_ratio();

        self.cascades.update_frame(ctx.viewer, aspect, ctx.light, ctx.scene.bounds());

        // Camera selection feeds the lighting pass; cascade debug cameras
        // use the cascade's own projection under the reversed-depth
        // convention (near -> 1, far -> 0).
        let (view, proj, lighting_viewport) = match ctx.settings.camera {
            CameraSelection::Eye => (
                ctx.viewer.view_matrix(),
                ctx.viewer.projection_matrix_reversed(aspect),
                (size.width as f32, size.height as f32),
            ),
            CameraSelection::Light => (
                ctx.light.view_matrix(),
                ctx.light.projection_matrix_reversed(aspect),
                (size.width as f32, size.height as f32),
            ),
            CameraSelection::Cascade(index) => {
                let square = size.width.min(size.height) as f32;
                (ctx.light.view_matrix(), reverse_depth(self.cascades.shadow_projection(index)), (square, square))
            }
        };

        let draws = ctx.scene.draws();
        let frame = self.surface.acquire_surface_frame()?;
        let mut encoder = device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Frame Encoder") });

        let effects = self.effects.as_mut().context("effects not initialized")?;
        let timer = self.timer.as_mut().context("gpu timer not initialized")?;
        let registry = &self.registry;
        let cascades = &mut self.cascades;
        let bindings = &mut self.bindings;
        let lit = self.lit.as_ref().context("lit buffers not allocated")?;
        let gbuffer = self.gbuffer.as_ref().context("gbuffer not allocated")?;

        // -------- shadow pass --------
        timer.begin(&mut encoder, GpuPass::Shadow);
        render_shadow_cascades(
            &device, &queue, &mut encoder, registry, effects, cascades, bindings, ctx.settings, &draws,
        )?;
        timer.end(&mut encoder, GpuPass::Shadow);

        // -------- lighting pass --------
        timer.begin(&mut encoder, GpuPass::Lighting);
        let planes = extract_frustum_planes(proj * view);
        let visible: Vec<MeshDraw<'_>> =
            draws.iter().filter(|d| aabb_in_frustum(&d.world_bounds(), &planes)).cloned().collect();
        match ctx.settings.lighting_mode {
            LightingMode::Forward => {
                effects.forward.set_view_matrix(view);
                effects.forward.set_proj_matrix(proj);
                effects.forward.set_light_dir(ctx.light.look_dir());
                effects.forward.set_cascades(cascades);
                effects.forward.set_shadow_settings(ctx.settings);
                effects.forward.select_pass(ctx.settings.shadow_mode, self.samples);
                bindings.acquire_read(slots::CASCADE_MAPS)?;
                bindings.acquire_write(slots::LIT_BUFFER)?;
                effects.forward.render(
                    &device,
                    &queue,
                    &mut encoder,
                    registry,
                    &lit.lit_view,
                    &lit.depth_view,
                    cascades.array_view()?,
                    lighting_viewport,
                    &visible,
                )?;
                bindings.release(slots::CASCADE_MAPS);
                bindings.release(slots::LIT_BUFFER);
            }
            LightingMode::Deferred | LightingMode::TiledDeferred => {
                effects.deferred.set_msaa_samples(self.samples);
                effects.deferred.set_camera(view, proj, ctx.viewer.near, ctx.viewer.far);
                effects.deferred.set_flags(ctx.settings);
                effects.deferred.set_lights(&queue, ctx.scene.lights());

                bindings.acquire_write(slots::GBUFFER)?;
                effects.deferred.render_gbuffer(
                    &device, &queue, &mut encoder, registry, gbuffer, &lit.depth_view, &visible,
                )?;
                bindings.release(slots::GBUFFER);

                bindings.acquire_read(slots::GBUFFER)?;
                let gbuffer_depth = lit.depth_only_view();
                if ctx.settings.lighting_mode == LightingMode::Deferred {
                    bindings.acquire_write(slots::LIT_BUFFER)?;
                    effects.deferred.compute_lighting(
                        &device,
                        &mut encoder,
                        registry,
                        &lit.lit_view,
                        &lit.depth_view,
                        gbuffer,
                        &gbuffer_depth,
                    )?;
                    bindings.release(slots::LIT_BUFFER);
                } else {
                    bindings.acquire_write(slots::LIT_FLAT_BUFFER)?;
                    effects.deferred.compute_tiled_light_culling(
                        &device,
                        &queue,
                        &mut encoder,
                        registry,
                        gbuffer,
                        &gbuffer_depth,
                        &lit.flat_buffer,
                    )?;
                    bindings.release(slots::LIT_FLAT_BUFFER);
                }
                bindings.release(slots::GBUFFER);
            }
        }
        timer.end(&mut encoder, GpuPass::Lighting);

        // -------- composite --------
        timer.begin(&mut encoder, GpuPass::Composite);
        let gbuffer_debug_active =
            ctx.settings.gbuffer_debug != GBufferDebug::Off && ctx.settings.lighting_mode.uses_gbuffer();
        if gbuffer_debug_active {
            let technique = match ctx.settings.gbuffer_debug {
                GBufferDebug::Normals => Technique::DebugNormals,
                _ => Technique::DebugDepthGradient,
            };
            bindings.acquire_read(slots::GBUFFER)?;
            let gbuffer_depth = lit.depth_only_view();
            effects.deferred.debug_gbuffer(
                &device,
                &queue,
                &mut encoder,
                registry,
                technique,
                gbuffer,
                &gbuffer_depth,
                frame.view(),
            )?;
            bindings.release(slots::GBUFFER);
        } else {
            effects.sky.set_msaa_samples(self.samples);
            effects.sky.set_camera(view, proj);
            let depth_only = lit.depth_only_view();
            bindings.acquire_read(slots::SCENE_DEPTH)?;
            if ctx.settings.lighting_mode == LightingMode::TiledDeferred {
                bindings.acquire_read(slots::LIT_FLAT_BUFFER)?;
                effects.sky.composite_flat(
                    &device,
                    &queue,
                    &mut encoder,
                    registry,
                    &lit.flat_buffer,
                    &depth_only,
                    (size.width, size.height),
                    frame.view(),
                )?;
                bindings.release(slots::LIT_FLAT_BUFFER);
            } else {
                bindings.acquire_read(slots::LIT_BUFFER)?;
                effects.sky.composite(
                    &device,
                    &queue,
                    &mut encoder,
                    registry,
                    &lit.lit_view,
                    &depth_only,
                    (size.width, size.height),
                    frame.view(),
                )?;
                bindings.release(slots::LIT_BUFFER);
            }
            bindings.release(slots::SCENE_DEPTH);
        }
        timer.end(&mut encoder, GpuPass::Composite);

        // -------- debug shadow readout --------
        if ctx.settings.debug_shadow {
            let cascade = ctx.settings.debug_shadow_cascade.min(cascades.cascade_count() - 1);
            if let Some((_, debug_view, _)) = &self.debug_shadow {
                bindings.acquire_read(slots::CASCADE_MAPS)?;
                effects.shadow.render_depth_to_texture(
                    &device,
                    &mut encoder,
                    registry,
                    cascades.slice_view(cascade)?,
                    debug_view,
                    cascades.shadow_viewport(),
                )?;
                bindings.release(slots::CASCADE_MAPS);
            }
        }

        overlay(&device, &queue, &mut encoder, frame.view());

        timer.finish_frame(&mut encoder);
        queue.submit(std::iter::once(encoder.finish()));
        timer.collect_results(&device);
        frame.present();
        if let Err(err) = self.bindings.reset_frame() {
            log::warn!("[renderer] {err}");
        }
        Ok(())
    }
}

/// Shadow pass body: renders every cascade, then applies the mode's blur.
#[allow(clippy::too_many_arguments)]
fn render_shadow_cascades(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    encoder: &mut wgpu::CommandEncoder,
    registry: &PassRegistry,
    effects: &mut EffectSuite,
    cascades: &CascadeShadowManager,
    bindings: &mut ResourceBindings,
    settings: &FrameSettings,
    draws: &[MeshDraw<'_>],
) -> Result<()> {
    let shadow = &mut effects.shadow;
    shadow.select_mode(settings.shadow_mode, settings.magic_power);
    shadow.set_view(cascades.shadow_view());
    shadow.begin_frame();

    bindings.acquire_write(slots::CASCADE_MAPS)?;
    let light_view = cascades.shadow_view();
    let viewport = cascades.shadow_viewport();
    for cascade in 0..cascades.cascade_count() {
        let cascade_bounds = cascades.shadow_bounds(cascade);
        let casters: Vec<&MeshDraw<'_>> = draws
            .iter()
            .filter(|draw| {
                draw.casts_shadows && draw.world_bounds().transformed(light_view).intersects(&cascade_bounds)
            })
            .collect();
        shadow.render_cascade(
            device,
            queue,
            encoder,
            registry,
            cascades.slice_view(cascade)?,
            cascades.depth_view()?,
            viewport,
            cascades.shadow_projection(cascade),
            &casters,
        )?;
    }
    shadow.end_frame();
    bindings.release(slots::CASCADE_MAPS);

    // Filterable shadow representations get their blur here; the plain
    // depth path never blurs.
    if settings.shadow_mode != ShadowMode::Standard && settings.blur_kernel_size > 1 {
        effects.blur.set_params(
            queue,
            cascades.shadow_size(),
            settings.blur_kernel_size,
            settings.gaussian_blur_sigma,
            settings.magic_power,
        );
        for cascade in 0..cascades.cascade_count() {
            match settings.shadow_mode {
                ShadowMode::Variance => {
                    bindings.acquire_read(slots::CASCADE_MAPS)?;
                    bindings.acquire_write(slots::CASCADE_SCRATCH)?;
                    effects.blur.blur_x(
                        device,
                        encoder,
                        registry,
                        cascades.slice_view(cascade)?,
                        cascades.scratch_view()?,
                        viewport,
                    )?;
                    bindings.release(slots::CASCADE_MAPS);
                    bindings.release(slots::CASCADE_SCRATCH);

                    bindings.acquire_read(slots::CASCADE_SCRATCH)?;
                    bindings.acquire_write(slots::CASCADE_MAPS)?;
                    effects.blur.blur_y(
                        device,
                        encoder,
                        registry,
                        cascades.scratch_view()?,
                        cascades.slice_view(cascade)?,
                        viewport,
                    )?;
                    bindings.release(slots::CASCADE_SCRATCH);
                    bindings.release(slots::CASCADE_MAPS);
                }
                ShadowMode::Exponential => {
                    bindings.acquire_read(slots::CASCADE_MAPS)?;
                    bindings.acquire_write(slots::CASCADE_SCRATCH)?;
                    effects.blur.log_gaussian_blur(
                        device,
                        encoder,
                        registry,
                        cascades.slice_view(cascade)?,
                        cascades.scratch_view()?,
                        viewport,
                    )?;
                    bindings.release(slots::CASCADE_MAPS);
                    bindings.release(slots::CASCADE_SCRATCH);
                    cascades.copy_scratch_to_cascade(encoder, cascade)?;
                }
                ShadowMode::Standard => {}
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_matrices_match_direct_products() {
        let world = Mat4::from_translation(Vec3::new(3.0, -2.0, 7.0)) * Mat4::from_rotation_y(0.8);
        let view = Mat4::look_at_rh(Vec3::new(0.0, 4.0, 10.0), Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(1.0, 1.6, 0.1, 200.0);
        let derived = DerivedMatrices::compute(world, view, proj);
        assert_eq!(derived.world_view.to_cols_array(), (view * world).to_cols_array());
        assert_eq!(derived.world_view_proj.to_cols_array(), (proj * view * world).to_cols_array());
        assert_eq!(derived.view_proj.to_cols_array(), (proj * view).to_cols_array());
        let round_trip = derived.inv_view * view;
        for (value, expected) in round_trip.to_cols_array().iter().zip(Mat4::IDENTITY.to_cols_array()) {
            assert!((value - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn frustum_culling_keeps_visible_boxes() {
        let camera = Camera3D::new(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, 1.0, 0.1, 100.0);
        let planes = extract_frustum_planes(camera.projection_matrix(1.0) * camera.view_matrix());
        let center = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert!(aabb_in_frustum(&center, &planes));
        let behind = Aabb::new(Vec3::new(-1.0, -1.0, 50.0), Vec3::new(1.0, 1.0, 52.0));
        assert!(!aabb_in_frustum(&behind, &planes));
        let far_left = Aabb::new(Vec3::new(-500.0, -1.0, -1.0), Vec3::new(-400.0, 1.0, 1.0));
        assert!(!aabb_in_frustum(&far_left, &planes));
    }

    #[test]
    fn reversed_depth_culling_also_works() {
        let camera = Camera3D::new(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, 1.0, 0.1, 100.0);
        let planes = extract_frustum_planes(camera.projection_matrix_reversed(1.0) * camera.view_matrix());
        let center = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert!(aabb_in_frustum(&center, &planes));
    }
}
