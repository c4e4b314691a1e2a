use anyhow::{Context, Result};
use glam::{Vec2, Vec3};
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{Key, NamedKey};

use crate::camera3d::{Camera3D, OrbitCamera};
use crate::config::AppConfig;
#[cfg(feature = "ui")]
use crate::renderer::GpuPass;
use crate::renderer::{FrameContext, Renderer};
use crate::scene::DemoScene;
use crate::settings::FrameSettings;

#[cfg(feature = "ui")]
use egui_wgpu::{Renderer as EguiRenderer, RendererOptions, ScreenDescriptor};
#[cfg(feature = "ui")]
use egui_winit::State as EguiWinit;

const VIEWER_FOV: f32 = std::f32::consts::FRAC_PI_3;
const VIEWER_NEAR: f32 = 0.5;
const VIEWER_FAR: f32 = 300.0;

pub fn run() -> Result<()> {
    let config = AppConfig::load_or_default("config/app.json");
    let event_loop = EventLoop::new().context("Failed to create winit event loop")?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app).context("Event loop execution failed")?;
    Ok(())
}

pub struct App {
    config: AppConfig,
    renderer: Renderer,
    scene: Option<DemoScene>,
    settings: FrameSettings,
    orbit: OrbitCamera,
    light_camera: Camera3D,
    start: Instant,
    should_close: bool,
    dragging: bool,
    last_cursor: Option<Vec2>,

    #[cfg(feature = "ui")]
    egui_ctx: egui::Context,
    #[cfg(feature = "ui")]
    egui_winit: Option<EguiWinit>,
    #[cfg(feature = "ui")]
    egui_renderer: Option<EguiRenderer>,
    #[cfg(feature = "ui")]
    debug_shadow_texture: Option<(egui::TextureId, u32)>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let mut settings = FrameSettings::default();
        settings.cascade_count = config.shadow.cascade_count as usize;
        settings.shadow_size = config.shadow.shadow_size;
        settings.blur_kernel_size = config.shadow.blur_kernel_size;
        settings.pcf_depth_bias = config.shadow.depth_bias;
        settings.sanitize();

        let mut orbit = OrbitCamera::new(Vec3::new(0.0, 2.0, 0.0), 45.0);
        orbit.pitch_radians = -0.45;
        let light_camera =
            Camera3D::new(Vec3::new(-80.0, 90.0, -55.0), Vec3::ZERO, VIEWER_FOV, 0.1, 1000.0);

        Self {
            renderer: Renderer::new(&config),
            config,
            scene: None,
            settings,
            orbit,
            light_camera,
            start: Instant::now(),
            should_close: false,
            dragging: false,
            last_cursor: None,
            #[cfg(feature = "ui")]
            egui_ctx: egui::Context::default(),
            #[cfg(feature = "ui")]
            egui_winit: None,
            #[cfg(feature = "ui")]
            egui_renderer: None,
            #[cfg(feature = "ui")]
            debug_shadow_texture: None,
        }
    }

    fn viewer_camera(&self) -> Camera3D {
        self.orbit.to_camera(VIEWER_FOV, VIEWER_NEAR, VIEWER_FAR)
    }

    #[cfg(feature = "ui")]
    fn settings_panel(ctx: &egui::Context, settings: &mut FrameSettings, renderer: &Renderer) {
        use crate::settings::{
            CameraSelection, CascadeFit, CascadeSelection, GBufferDebug, LightingMode, NearFarFit,
            ShadowMode,
        };

        egui::Window::new("Cascaded Shadow Mapping").default_width(320.0).show(ctx, |ui| {
            egui::ComboBox::from_label("Type")
                .selected_text(settings.shadow_mode.label())
                .show_ui(ui, |ui| {
                    for mode in ShadowMode::ALL {
                        ui.selectable_value(&mut settings.shadow_mode, mode, mode.label());
                    }
                });
            egui::ComboBox::from_label("Lighting")
                .selected_text(settings.lighting_mode.label())
                .show_ui(ui, |ui| {
                    for mode in LightingMode::ALL {
                        ui.selectable_value(&mut settings.lighting_mode, mode, mode.label());
                    }
                });
            ui.checkbox(&mut settings.debug_shadow, "Debug Shadow");
            ui.checkbox(&mut settings.visualize_cascades, "Visualize Cascades");

            egui::ComboBox::from_label("MSAA")
                .selected_text(format!("{}x", settings.msaa_samples))
                .show_ui(ui, |ui| {
                    for count in [1u32, 2, 4, 8] {
                        ui.selectable_value(&mut settings.msaa_samples, count, format!("{count}x"));
                    }
                });

            let mut texture_level = settings.shadow_size.trailing_zeros() as i32;
            ui.label(format!("Texture Size: {}", settings.shadow_size));
            if ui.add(egui::Slider::new(&mut texture_level, 9..=13).show_value(false)).changed() {
                settings.shadow_size = 1u32 << texture_level;
            }

            let mut blur_level = (settings.blur_kernel_size / 2) as i32;
            ui.label(format!("Blur Size: {}", settings.blur_kernel_size));
            if ui.add(egui::Slider::new(&mut blur_level, 0..=7).show_value(false)).changed() {
                settings.blur_kernel_size = (2 * blur_level + 1) as u32;
            }

            match settings.shadow_mode {
                ShadowMode::Standard => {
                    ui.add(
                        egui::Slider::new(&mut settings.pcf_depth_bias, 0.0..=0.05).text("Depth Bias"),
                    );
                }
                ShadowMode::Variance => {
                    ui.add(
                        egui::Slider::new(&mut settings.magic_power, 0.1..=200.0).text("Magic Power"),
                    );
                }
                ShadowMode::Exponential => {
                    ui.add(
                        egui::Slider::new(&mut settings.gaussian_blur_sigma, 0.1..=10.0)
                            .text("Blur Sigma"),
                    );
                    ui.add(
                        egui::Slider::new(&mut settings.magic_power, 0.1..=200.0).text("Magic Power"),
                    );
                }
            }

            ui.checkbox(&mut settings.blend_between_cascades, "Cascade Blur");
            ui.add(egui::Slider::new(&mut settings.blend_area, 0.0..=0.5).text("Blend Area"));
            ui.checkbox(&mut settings.fixed_size_frustum_aabb, "Fixed Size Frustum AABB");
            ui.checkbox(&mut settings.snap_to_texel, "Fit Light to Texels");

            egui::ComboBox::from_label("Fit Projection")
                .selected_text(settings.cascade_fit.label())
                .show_ui(ui, |ui| {
                    for fit in [CascadeFit::ToCascade, CascadeFit::ToScene] {
                        ui.selectable_value(&mut settings.cascade_fit, fit, fit.label());
                    }
                });
            egui::ComboBox::from_label("Camera")
                .selected_text(settings.camera.label())
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut settings.camera, CameraSelection::Eye, "Main Camera");
                    ui.selectable_value(&mut settings.camera, CameraSelection::Light, "Light Camera");
                    for cascade in 0..settings.cascade_count {
                        let choice = CameraSelection::Cascade(cascade);
                        ui.selectable_value(&mut settings.camera, choice, choice.label());
                    }
                });
            egui::ComboBox::from_label("Near/Far Fit")
                .selected_text(settings.near_far_fit.label())
                .show_ui(ui, |ui| {
                    for fit in NearFarFit::ALL {
                        ui.selectable_value(&mut settings.near_far_fit, fit, fit.label());
                    }
                });
            egui::ComboBox::from_label("Selection")
                .selected_text(settings.cascade_selection.label())
                .show_ui(ui, |ui| {
                    for selection in [CascadeSelection::MapBased, CascadeSelection::IntervalBased] {
                        ui.selectable_value(&mut settings.cascade_selection, selection, selection.label());
                    }
                });
            egui::ComboBox::from_label("Cascades")
                .selected_text(format!("{} Levels", settings.cascade_count))
                .show_ui(ui, |ui| {
                    for count in 1..=crate::renderer::MAX_CASCADES {
                        ui.selectable_value(
                            &mut settings.cascade_count,
                            count,
                            format!("{count} Levels"),
                        );
                    }
                });
            for cascade in 0..settings.cascade_count {
                ui.add(
                    egui::Slider::new(&mut settings.cascade_partitions[cascade], 0.0..=1.0)
                        .text(format!("Level {}", cascade + 1)),
                );
            }

            if settings.lighting_mode.uses_gbuffer() {
                egui::ComboBox::from_label("GBuffer Debug")
                    .selected_text(settings.gbuffer_debug.label())
                    .show_ui(ui, |ui| {
                        for debug in GBufferDebug::ALL {
                            ui.selectable_value(&mut settings.gbuffer_debug, debug, debug.label());
                        }
                    });
                ui.checkbox(&mut settings.lighting_only, "Lighting Only");
                ui.checkbox(&mut settings.face_normals, "Face Normals");
                ui.checkbox(&mut settings.visualize_light_count, "Visualize Light Count");
                ui.checkbox(&mut settings.visualize_shading_freq, "Visualize Shading Freq");
            }

            ui.separator();
            ui.label("GPU Profile");
            let mut total = 0.0;
            for pass in GpuPass::ALL {
                let ms = renderer.average_pass_ms(pass);
                total += ms;
                ui.label(format!("{}: {:.3} ms", pass.label(), ms));
            }
            ui.label(format!("Total: {total:.3} ms"));
        });
    }

    #[cfg(feature = "ui")]
    fn debug_shadow_window(
        ctx: &egui::Context,
        settings: &mut FrameSettings,
        texture: Option<(egui::TextureId, u32)>,
    ) {
        if !settings.debug_shadow {
            return;
        }
        egui::Window::new("Debug Shadow").show(ctx, |ui| {
            egui::ComboBox::from_label("Level")
                .selected_text(format!("Level {}", settings.debug_shadow_cascade + 1))
                .show_ui(ui, |ui| {
                    for cascade in 0..settings.cascade_count {
                        ui.selectable_value(
                            &mut settings.debug_shadow_cascade,
                            cascade,
                            format!("Level {}", cascade + 1),
                        );
                    }
                });
            if let Some((id, _)) = texture {
                let side = ui.available_width().min(320.0).max(64.0);
                ui.image((id, egui::Vec2::splat(side)));
            }
        });
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(err) = self.renderer.ensure_window(event_loop) {
            log::error!("renderer init failed: {err:?}");
            self.should_close = true;
            return;
        }
        if self.scene.is_none() {
            match self.renderer.device() {
                Ok(device) => {
                    self.scene = Some(DemoScene::build(device, &self.config.lighting));
                }
                Err(err) => {
                    log::error!("scene init failed: {err:?}");
                    self.should_close = true;
                    return;
                }
            }
        }
        #[cfg(feature = "ui")]
        {
            if self.egui_winit.is_none() {
                if let Some(window) = self.renderer.window() {
                    self.egui_winit = Some(EguiWinit::new(
                        self.egui_ctx.clone(),
                        egui::ViewportId::ROOT,
                        window,
                        Some(self.renderer.pixels_per_point()),
                        window.theme(),
                        None,
                    ));
                }
            }
            if self.egui_renderer.is_none() {
                match (self.renderer.device(), self.renderer.surface_format()) {
                    (Ok(device), Ok(format)) => {
                        self.egui_renderer =
                            Some(EguiRenderer::new(device, format, RendererOptions::default()));
                    }
                    (Err(err), _) | (_, Err(err)) => {
                        log::error!("egui renderer init failed: {err:?}");
                        self.should_close = true;
                    }
                }
            }
        }
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let mut consumed = false;
        #[cfg(feature = "ui")]
        if let (Some(window), Some(state)) = (self.renderer.window(), self.egui_winit.as_mut()) {
            if window_id == window.id() {
                consumed = state.on_window_event(window, &event).consumed;
            }
        }
        #[cfg(not(feature = "ui"))]
        let _ = window_id;

        match &event {
            WindowEvent::CloseRequested => self.should_close = true,
            WindowEvent::Resized(size) => self.renderer.resize(*size),
            WindowEvent::KeyboardInput { event, .. } => {
                if let Key::Named(NamedKey::Escape) = event.logical_key {
                    if event.state == ElementState::Pressed {
                        self.should_close = true;
                    }
                }
            }
            WindowEvent::MouseInput { state, button: MouseButton::Right, .. } if !consumed => {
                self.dragging = *state == ElementState::Pressed;
                if !self.dragging {
                    self.last_cursor = None;
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                let cursor = Vec2::new(position.x as f32, position.y as f32);
                if self.dragging && !consumed {
                    if let Some(last) = self.last_cursor {
                        let delta = (cursor - last) * 0.005;
                        self.orbit.orbit(Vec2::new(-delta.x, -delta.y));
                    }
                }
                self.last_cursor = Some(cursor);
            }
            WindowEvent::MouseWheel { delta, .. } if !consumed => {
                let scroll = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 40.0,
                };
                self.orbit.zoom(1.0 - scroll * 0.1);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.should_close {
            event_loop.exit();
            return;
        }
        let Some(scene) = self.scene.as_mut() else {
            return;
        };
        scene.animate_lights(self.start.elapsed().as_secs_f32());

        #[cfg(feature = "ui")]
        let ui_output = {
            let (Some(window), Some(egui_winit)) = (self.renderer.window(), self.egui_winit.as_mut())
            else {
                return;
            };
            let raw_input = egui_winit.take_egui_input(window);
            let settings = &mut self.settings;
            let renderer = &self.renderer;
            let debug_texture = self.debug_shadow_texture;
            let output = self.egui_ctx.run(raw_input, |ctx| {
                Self::settings_panel(ctx, settings, renderer);
                Self::debug_shadow_window(ctx, settings, debug_texture);
            });
            egui_winit.handle_platform_output(window, output.platform_output.clone());
            output
        };

        self.settings.sanitize();
        let viewer = self.viewer_camera();
        let Some(scene) = self.scene.as_ref() else {
            return;
        };
        let ctx = FrameContext {
            scene,
            settings: &self.settings,
            viewer: &viewer,
            light: &self.light_camera,
        };

        #[cfg(feature = "ui")]
        {
            let pixels_per_point = self.renderer.pixels_per_point();
            let size = self.renderer.size();
            let screen =
                ScreenDescriptor { size_in_pixels: [size.width, size.height], pixels_per_point };
            let paint_jobs = self.egui_ctx.tessellate(ui_output.shapes, pixels_per_point);
            let textures_delta = ui_output.textures_delta;
            let painter = self.egui_renderer.as_mut();
            let renderer = &mut self.renderer;
            let result = match painter {
                Some(painter) => renderer.render_frame(ctx, |device, queue, encoder, view| {
                    for (id, delta) in &textures_delta.set {
                        painter.update_texture(device, queue, *id, delta);
                    }
                    let extra = painter.update_buffers(device, queue, encoder, &paint_jobs, &screen);
                    if !extra.is_empty() {
                        queue.submit(extra);
                    }
                    {
                        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                            label: Some("Egui Pass"),
                            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                                view,
                                depth_slice: None,
                                resolve_target: None,
                                ops: wgpu::Operations {
                                    load: wgpu::LoadOp::Load,
                                    store: wgpu::StoreOp::Store,
                                },
                            })],
                            depth_stencil_attachment: None,
                            occlusion_query_set: None,
                            timestamp_writes: None,
                        });
                        let pass = unsafe {
                            std::mem::transmute::<&mut wgpu::RenderPass<'_>, &mut wgpu::RenderPass<'static>>(
                                &mut pass,
                            )
                        };
                        painter.render(pass, &paint_jobs, &screen);
                    }
                    for id in &textures_delta.free {
                        painter.free_texture(id);
                    }
                }),
                None => renderer.render_frame(ctx, |_, _, _, _| {}),
            };
            if let Err(err) = result {
                log::warn!("frame error: {err:?}");
            }

            // Keep the egui-side handle to the shadow debug texture current.
            if self.settings.debug_shadow {
                let shadow_size = self.renderer.cascades.shadow_size();
                let stale = self.debug_shadow_texture.map_or(true, |(_, size)| size != shadow_size);
                if stale {
                    if let (Some(painter), Ok(device), Some(view)) = (
                        self.egui_renderer.as_mut(),
                        self.renderer.device(),
                        self.renderer.debug_shadow_view(),
                    ) {
                        if let Some((old, _)) = self.debug_shadow_texture.take() {
                            painter.free_texture(&old);
                        }
                        let id = painter.register_native_texture(
                            device,
                            view,
                            wgpu::FilterMode::Nearest,
                        );
                        self.debug_shadow_texture = Some((id, shadow_size));
                    }
                }
            }
        }

        #[cfg(not(feature = "ui"))]
        if let Err(err) = self.renderer.render_frame(ctx, |_, _, _, _| {}) {
            log::warn!("frame error: {err:?}");
        }

        if let Some(window) = self.renderer.window() {
            window.request_redraw();
        }
    }
}
