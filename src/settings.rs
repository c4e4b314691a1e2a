use crate::renderer::MAX_CASCADES;

/// Shadow filtering algorithm. Selects both the shadow-map render pass and
/// the forward-shading sampling path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShadowMode {
    Standard,
    Variance,
    Exponential,
}

impl ShadowMode {
    pub const ALL: [ShadowMode; 3] = [ShadowMode::Standard, ShadowMode::Variance, ShadowMode::Exponential];

    pub fn label(self) -> &'static str {
        match self {
            ShadowMode::Standard => "CSM",
            ShadowMode::Variance => "VSM",
            ShadowMode::Exponential => "ESM",
        }
    }

    /// Color components stored per texel in the cascade array: VSM keeps
    /// two moments, the others a single depth value.
    pub fn map_components(self) -> u32 {
        match self {
            ShadowMode::Variance => 2,
            ShadowMode::Standard | ShadowMode::Exponential => 1,
        }
    }
}

/// Which lighting path runs between the shadow pass and the composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightingMode {
    Forward,
    Deferred,
    TiledDeferred,
}

impl LightingMode {
    pub const ALL: [LightingMode; 3] =
        [LightingMode::Forward, LightingMode::Deferred, LightingMode::TiledDeferred];

    pub fn label(self) -> &'static str {
        match self {
            LightingMode::Forward => "Forward",
            LightingMode::Deferred => "Deferred",
            LightingMode::TiledDeferred => "Tile-Based Deferred",
        }
    }

    pub fn uses_gbuffer(self) -> bool {
        !matches!(self, LightingMode::Forward)
    }
}

/// Which view/projection feeds the lighting pass this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraSelection {
    Eye,
    Light,
    Cascade(usize),
}

impl CameraSelection {
    pub fn label(self) -> &'static str {
        match self {
            CameraSelection::Eye => "Main Camera",
            CameraSelection::Light => "Light Camera",
            CameraSelection::Cascade(0) => "Cascade Camera 1",
            CameraSelection::Cascade(1) => "Cascade Camera 2",
            CameraSelection::Cascade(2) => "Cascade Camera 3",
            CameraSelection::Cascade(3) => "Cascade Camera 4",
            CameraSelection::Cascade(4) => "Cascade Camera 5",
            CameraSelection::Cascade(5) => "Cascade Camera 6",
            CameraSelection::Cascade(6) => "Cascade Camera 7",
            CameraSelection::Cascade(_) => "Cascade Camera 8",
        }
    }

    /// Keeps a cascade debug selection valid after the cascade count shrinks.
    pub fn clamp_to(self, cascade_count: usize) -> Self {
        match self {
            CameraSelection::Cascade(idx) if idx >= cascade_count => {
                CameraSelection::Cascade(cascade_count.saturating_sub(1))
            }
            other => other,
        }
    }
}

/// How the orthographic XY extent of each cascade is fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeFit {
    ToCascade,
    ToScene,
}

impl CascadeFit {
    pub fn label(self) -> &'static str {
        match self {
            CascadeFit::ToCascade => "Fit Projection To Cascade",
            CascadeFit::ToScene => "Fit Projection To Scene",
        }
    }
}

/// How the light-space near/far planes of each cascade are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NearFarFit {
    ZeroToOne,
    CascadeAabb,
    SceneAabb,
    SceneAabbIntersection,
}

impl NearFarFit {
    pub const ALL: [NearFarFit; 4] = [
        NearFarFit::ZeroToOne,
        NearFarFit::CascadeAabb,
        NearFarFit::SceneAabb,
        NearFarFit::SceneAabbIntersection,
    ];

    pub fn label(self) -> &'static str {
        match self {
            NearFarFit::ZeroToOne => "0:1 NearFar",
            NearFarFit::CascadeAabb => "Cascade AABB NearFar",
            NearFarFit::SceneAabb => "Scene AABB NearFar",
            NearFarFit::SceneAabbIntersection => "Scene AABB Intersection NearFar",
        }
    }
}

/// Full-screen GBuffer inspection views (deferred paths only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GBufferDebug {
    Off,
    Normals,
    DepthGradient,
}

impl GBufferDebug {
    pub const ALL: [GBufferDebug; 3] = [GBufferDebug::Off, GBufferDebug::Normals, GBufferDebug::DepthGradient];

    pub fn label(self) -> &'static str {
        match self {
            GBufferDebug::Off => "Off",
            GBufferDebug::Normals => "View Normals",
            GBufferDebug::DepthGradient => "View Depth Gradient",
        }
    }
}

/// How the forward shader picks a cascade per fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeSelection {
    MapBased,
    IntervalBased,
}

impl CascadeSelection {
    pub fn label(self) -> &'static str {
        match self {
            CascadeSelection::MapBased => "Map-based Selection",
            CascadeSelection::IntervalBased => "Interval-based Selection",
        }
    }
}

/// Per-frame state driven by the UI panel. Lives for the process lifetime;
/// the renderer reads it every frame and reacts to changes that invalidate
/// GPU resources (cascade count/size, shadow mode, MSAA).
#[derive(Debug, Clone)]
pub struct FrameSettings {
    pub shadow_mode: ShadowMode,
    pub lighting_mode: LightingMode,
    pub camera: CameraSelection,
    pub msaa_samples: u32,

    pub cascade_count: usize,
    pub shadow_size: u32,
    pub cascade_partitions: [f32; MAX_CASCADES],

    pub blur_kernel_size: u32,
    pub gaussian_blur_sigma: f32,
    pub magic_power: f32,
    pub pcf_depth_bias: f32,

    pub blend_between_cascades: bool,
    pub blend_area: f32,
    pub fixed_size_frustum_aabb: bool,
    pub snap_to_texel: bool,
    pub cascade_fit: CascadeFit,
    pub near_far_fit: NearFarFit,
    pub cascade_selection: CascadeSelection,

    pub visualize_cascades: bool,
    pub lighting_only: bool,
    pub face_normals: bool,
    pub visualize_light_count: bool,
    pub visualize_shading_freq: bool,
    pub debug_shadow: bool,
    pub debug_shadow_cascade: usize,
    pub gbuffer_debug: GBufferDebug,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            shadow_mode: ShadowMode::Standard,
            lighting_mode: LightingMode::Forward,
            camera: CameraSelection::Eye,
            msaa_samples: 1,
            cascade_count: 4,
            shadow_size: 1024,
            cascade_partitions: [0.04, 0.10, 0.25, 1.0, 1.0, 1.0, 1.0, 1.0],
            blur_kernel_size: 5,
            gaussian_blur_sigma: 3.0,
            magic_power: 80.0,
            pcf_depth_bias: 0.002,
            blend_between_cascades: true,
            blend_area: 0.1,
            fixed_size_frustum_aabb: false,
            snap_to_texel: true,
            cascade_fit: CascadeFit::ToCascade,
            near_far_fit: NearFarFit::SceneAabbIntersection,
            cascade_selection: CascadeSelection::MapBased,
            visualize_cascades: false,
            lighting_only: false,
            face_normals: false,
            visualize_light_count: false,
            visualize_shading_freq: false,
            debug_shadow: false,
            debug_shadow_cascade: 0,
            gbuffer_debug: GBufferDebug::Off,
        }
    }
}

impl FrameSettings {
    /// Applies the soft UI invariants: cascade count in range, partitions
    /// ordered, sliders within bounds. Out-of-order edits are clamped, never
    /// rejected.
    pub fn sanitize(&mut self) {
        self.cascade_count = self.cascade_count.clamp(1, MAX_CASCADES);
        self.shadow_size = self.shadow_size.clamp(256, 8192).next_power_of_two();
        self.msaa_samples = match self.msaa_samples {
            0 | 1 => 1,
            2 | 3 => 2,
            4..=7 => 4,
            _ => 8,
        };
        if self.blur_kernel_size % 2 == 0 {
            self.blur_kernel_size += 1;
        }
        self.blur_kernel_size = self.blur_kernel_size.clamp(1, 15);
        self.gaussian_blur_sigma = self.gaussian_blur_sigma.clamp(0.1, 10.0);
        self.magic_power = self.magic_power.clamp(0.1, 200.0);
        self.pcf_depth_bias = self.pcf_depth_bias.clamp(0.0, 0.05);
        self.blend_area = self.blend_area.clamp(0.0, 0.5);
        self.camera = self.camera.clamp_to(self.cascade_count);
        self.debug_shadow_cascade = self.debug_shadow_cascade.min(self.cascade_count - 1);
        crate::renderer::cascades::clamp_partitions(&mut self.cascade_partitions, self.cascade_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_rounds_msaa_to_supported_counts() {
        for (requested, expected) in [(0, 1), (1, 1), (2, 2), (3, 2), (5, 4), (6, 4), (8, 8), (16, 8)] {
            let mut settings = FrameSettings { msaa_samples: requested, ..Default::default() };
            settings.sanitize();
            assert_eq!(settings.msaa_samples, expected, "requested {requested}");
        }
    }

    #[test]
    fn sanitize_keeps_camera_selection_in_range() {
        let mut settings =
            FrameSettings { camera: CameraSelection::Cascade(7), cascade_count: 3, ..Default::default() };
        settings.sanitize();
        assert_eq!(settings.camera, CameraSelection::Cascade(2));
    }

    #[test]
    fn sanitize_forces_odd_blur_kernel() {
        let mut settings = FrameSettings { blur_kernel_size: 6, ..Default::default() };
        settings.sanitize();
        assert_eq!(settings.blur_kernel_size % 2, 1);
    }
}
