use anyhow::{ensure, Result};
use glam::{Mat4, Vec3, Vec4};

use super::{MAX_CASCADES, SHADOW_DEPTH_FORMAT};
use crate::camera3d::Camera3D;
use crate::scene::Aabb;
use crate::settings::{CascadeFit, FrameSettings, NearFarFit};

/// Fixed depth range used by the `ZeroToOne` policy: depth 0..1 is spread
/// over a constant distance instead of being fitted to anything.
const ZERO_ONE_FAR_PLANE: f32 = 10_000.0;

/// Cascade fitting parameters mirrored from the UI each frame.
#[derive(Debug, Clone)]
pub struct CascadeConfig {
    pub partitions: [f32; MAX_CASCADES],
    pub fixed_size_frustum_aabb: bool,
    pub snap_to_texel: bool,
    pub cascade_fit: CascadeFit,
    pub near_far_fit: NearFarFit,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            partitions: [0.04, 0.10, 0.25, 1.0, 1.0, 1.0, 1.0, 1.0],
            fixed_size_frustum_aabb: false,
            snap_to_texel: true,
            cascade_fit: CascadeFit::ToCascade,
            near_far_fit: NearFarFit::SceneAabbIntersection,
        }
    }
}

struct CascadeResources {
    texture: wgpu::Texture,
    array_view: wgpu::TextureView,
    slice_views: Vec<wgpu::TextureView>,
    scratch_texture: wgpu::Texture,
    scratch_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    cascade_count: usize,
    shadow_size: u32,
    format: wgpu::TextureFormat,
}

/// Partitions the view frustum into depth cascades, fits a light-space
/// orthographic projection to each and owns their render targets. All of
/// the fitting math is device-independent; only `init_resource` touches the
/// GPU.
pub struct CascadeShadowManager {
    pub config: CascadeConfig,
    cascade_count: usize,
    shadow_size: u32,
    resources: Option<CascadeResources>,
    shadow_view: Mat4,
    shadow_proj: [Mat4; MAX_CASCADES],
    cascade_bounds: [Aabb; MAX_CASCADES],
    partition_depths: [f32; MAX_CASCADES],
}

impl Default for CascadeShadowManager {
    fn default() -> Self {
        Self {
            config: CascadeConfig::default(),
            cascade_count: 4,
            shadow_size: 1024,
            resources: None,
            shadow_view: Mat4::IDENTITY,
            shadow_proj: [Mat4::IDENTITY; MAX_CASCADES],
            cascade_bounds: [Aabb::new(Vec3::ZERO, Vec3::ZERO); MAX_CASCADES],
            partition_depths: [0.0; MAX_CASCADES],
        }
    }
}

impl CascadeShadowManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cascade_count(&self) -> usize {
        self.cascade_count
    }

    /// Adjusts the active cascade count without touching GPU resources; the
    /// next `init_resource` call reallocates to match.
    pub fn set_cascade_count(&mut self, count: usize) {
        self.cascade_count = count.clamp(1, MAX_CASCADES);
    }

    pub fn shadow_size(&self) -> u32 {
        self.shadow_size
    }

    pub fn shadow_map_format(&self) -> Option<wgpu::TextureFormat> {
        self.resources.as_ref().map(|r| r.format)
    }

    /// Square viewport covering one cascade slice.
    pub fn shadow_viewport(&self) -> (f32, f32) {
        (self.shadow_size as f32, self.shadow_size as f32)
    }

    /// (Re)allocates the cascade render-target array, the blur scratch
    /// target and the shadow depth buffer. Idempotent: a call with
    /// parameters identical to the live allocation is a no-op, so callers
    /// may invoke it every time a UI value might have changed.
    pub fn init_resource(
        &mut self,
        device: &wgpu::Device,
        cascade_count: usize,
        map_components: u32,
        shadow_size: u32,
    ) -> Result<()> {
        ensure!((1..=MAX_CASCADES).contains(&cascade_count), "cascade count {cascade_count} out of range");
        let shadow_size = shadow_size.clamp(256, 8192);
        let format = match map_components {
            2 => wgpu::TextureFormat::Rg32Float,
            _ => wgpu::TextureFormat::R32Float,
        };
        if let Some(res) = &self.resources {
            if res.cascade_count == cascade_count && res.shadow_size == shadow_size && res.format == format
            {
                self.cascade_count = cascade_count;
                self.shadow_size = shadow_size;
                return Ok(());
            }
        }
        log::info!(
            "[cascades] allocating {cascade_count} x {shadow_size}px cascade maps ({format:?})"
        );

        let extent = wgpu::Extent3d {
            width: shadow_size,
            height: shadow_size,
            depth_or_array_layers: cascade_count as u32,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Cascade Map Array"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let array_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Cascade Map Array View"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });
        let mut slice_views = Vec::with_capacity(cascade_count);
        for layer in 0..cascade_count {
            slice_views.push(texture.create_view(&wgpu::TextureViewDescriptor {
                label: Some("Cascade Map Slice"),
                dimension: Some(wgpu::TextureViewDimension::D2),
                base_array_layer: layer as u32,
                array_layer_count: Some(1),
                ..Default::default()
            }));
        }

        let scratch_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Cascade Blur Scratch"),
            size: wgpu::Extent3d { width: shadow_size, height: shadow_size, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let scratch_view = scratch_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let depth_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Cascade Depth Buffer"),
            size: wgpu::Extent3d { width: shadow_size, height: shadow_size, depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SHADOW_DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());

        self.resources = Some(CascadeResources {
            texture,
            array_view,
            slice_views,
            scratch_texture,
            scratch_view,
            depth_view,
            cascade_count,
            shadow_size,
            format,
        });
        self.cascade_count = cascade_count;
        self.shadow_size = shadow_size;
        Ok(())
    }

    /// Pulls the cascade-related scalars out of the frame settings.
    pub fn apply_settings(&mut self, settings: &FrameSettings) {
        self.config.partitions = settings.cascade_partitions;
        self.config.fixed_size_frustum_aabb = settings.fixed_size_frustum_aabb;
        self.config.snap_to_texel = settings.snap_to_texel;
        self.config.cascade_fit = settings.cascade_fit;
        self.config.near_far_fit = settings.near_far_fit;
    }

    /// Recomputes every cascade's partition interval, light-space bounds and
    /// fitted orthographic projection from the current cameras and scene
    /// bounds. Pure math; safe to call without GPU resources.
    pub fn update_frame(&mut self, viewer: &Camera3D, aspect: f32, light: &Camera3D, scene_bounds: Aabb) {
        clamp_partitions(&mut self.config.partitions, self.cascade_count);
        let light_view = light.view_matrix();
        self.shadow_view = light_view;
        let scene_light = scene_bounds.transformed(light_view);

        let camera_range = (viewer.far - viewer.near).max(1e-3);
        let mut prev_fraction = 0.0f32;
        for cascade in 0..self.cascade_count {
            let fraction = self.config.partitions[cascade];
            let begin_fraction = match self.config.cascade_fit {
                CascadeFit::ToScene => 0.0,
                CascadeFit::ToCascade => prev_fraction,
            };
            prev_fraction = fraction;
            let interval_begin = viewer.near + begin_fraction * camera_range;
            let interval_end = (viewer.near + fraction * camera_range).max(interval_begin + 1e-3);

            let corners = frustum_slice_corners(viewer, aspect, interval_begin, interval_end);
            let mut bounds =
                Aabb::from_points(corners.iter().map(|&c| light_view.transform_point3(c)));

            if self.config.fixed_size_frustum_aabb {
                bounds = fix_bounds_size(bounds, slice_diagonal(&corners));
            }
            if self.config.snap_to_texel {
                bounds = snap_bounds_to_texels(bounds, self.shadow_size);
            }

            let (near, far) = match self.config.near_far_fit {
                NearFarFit::ZeroToOne => (0.0, ZERO_ONE_FAR_PLANE),
                NearFarFit::CascadeAabb => (-bounds.max.z, -bounds.min.z),
                NearFarFit::SceneAabb => (-scene_light.max.z, -scene_light.min.z),
                NearFarFit::SceneAabbIntersection => {
                    compute_near_far_intersection(&bounds, &scene_light.corners())
                        .unwrap_or((-scene_light.max.z, -scene_light.min.z))
                }
            };
            let far = far.max(near + 1e-3);

            self.shadow_proj[cascade] =
                Mat4::orthographic_rh(bounds.min.x, bounds.max.x, bounds.min.y, bounds.max.y, near, far);
            self.cascade_bounds[cascade] = Aabb::new(
                Vec3::new(bounds.min.x, bounds.min.y, -far),
                Vec3::new(bounds.max.x, bounds.max.y, -near),
            );
            self.partition_depths[cascade] = interval_end;
        }
    }

    /// Light-space projection for `cascade`. Callers must keep
    /// `cascade < cascade_count()`.
    pub fn shadow_projection(&self, cascade: usize) -> Mat4 {
        debug_assert!(cascade < self.cascade_count);
        self.shadow_proj[cascade]
    }

    /// Like `shadow_projection` but valid for every slot; slots beyond the
    /// active count hold the last computed (or identity) matrix. Used when
    /// packing the full uniform array.
    pub fn shadow_projection_raw(&self, cascade: usize) -> Mat4 {
        self.shadow_proj[cascade.min(MAX_CASCADES - 1)]
    }

    pub fn shadow_view(&self) -> Mat4 {
        self.shadow_view
    }

    /// Light-space bounds of `cascade`, for caster culling.
    pub fn shadow_bounds(&self, cascade: usize) -> Aabb {
        debug_assert!(cascade < self.cascade_count);
        self.cascade_bounds[cascade]
    }

    /// Eye-space depth of each cascade's far boundary; feeds interval-based
    /// selection and cascade blending in the forward shader.
    pub fn cascade_partitions(&self) -> [f32; MAX_CASCADES] {
        self.partition_depths
    }

    pub fn partition_fractions(&self) -> [f32; MAX_CASCADES] {
        self.config.partitions
    }

    pub fn array_view(&self) -> Result<&wgpu::TextureView> {
        Ok(&self.resources()?.array_view)
    }

    pub fn slice_view(&self, cascade: usize) -> Result<&wgpu::TextureView> {
        let res = self.resources()?;
        ensure!(cascade < res.slice_views.len(), "cascade {cascade} has no render target");
        Ok(&res.slice_views[cascade])
    }

    pub fn scratch_view(&self) -> Result<&wgpu::TextureView> {
        Ok(&self.resources()?.scratch_view)
    }

    pub fn depth_view(&self) -> Result<&wgpu::TextureView> {
        Ok(&self.resources()?.depth_view)
    }

    /// Copies the blurred scratch target back into one cascade slice
    /// (single-pass blurs render into scratch instead of in place).
    pub fn copy_scratch_to_cascade(&self, encoder: &mut wgpu::CommandEncoder, cascade: usize) -> Result<()> {
        let res = self.resources()?;
        ensure!(cascade < res.cascade_count, "cascade {cascade} out of range");
        encoder.copy_texture_to_texture(
            res.scratch_texture.as_image_copy(),
            wgpu::TexelCopyTextureInfo {
                texture: &res.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x: 0, y: 0, z: cascade as u32 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d { width: res.shadow_size, height: res.shadow_size, depth_or_array_layers: 1 },
        );
        Ok(())
    }

    fn resources(&self) -> Result<&CascadeResources> {
        self.resources.as_ref().ok_or_else(|| anyhow::anyhow!("cascade resources not initialized"))
    }
}

/// Clamps partition fractions to [0, 1] and non-decreasing order; the last
/// active cascade always reaches the full range. Out-of-order UI edits are
/// corrected, never rejected.
pub fn clamp_partitions(partitions: &mut [f32; MAX_CASCADES], cascade_count: usize) {
    let count = cascade_count.clamp(1, MAX_CASCADES);
    for i in 0..MAX_CASCADES {
        partitions[i] = partitions[i].clamp(0.0, 1.0);
        if i > 0 && partitions[i] < partitions[i - 1] {
            partitions[i] = partitions[i - 1];
        }
    }
    partitions[count - 1] = 1.0;
    for value in partitions.iter_mut().skip(count) {
        *value = 1.0;
    }
}

/// World-space corners of the view-frustum slice between `begin` and `end`
/// (view depths), recovered by inverse-transforming the clip-space cube.
pub fn frustum_slice_corners(viewer: &Camera3D, aspect: f32, begin: f32, end: f32) -> [Vec3; 8] {
    let proj = Mat4::perspective_rh(viewer.fov_y_radians, aspect.max(0.0001), begin.max(1e-4), end);
    let inv = (proj * viewer.view_matrix()).inverse();
    let mut corners = [Vec3::ZERO; 8];
    let mut idx = 0;
    for &z in &[0.0f32, 1.0] {
        for &y in &[-1.0f32, 1.0] {
            for &x in &[-1.0f32, 1.0] {
                let world = inv * Vec4::new(x, y, z, 1.0);
                corners[idx] = world.truncate() / world.w;
                idx += 1;
            }
        }
    }
    corners
}

/// Length of the slice's far diagonal; an upper bound on the extent of the
/// slice under any camera orientation.
fn slice_diagonal(corners: &[Vec3; 8]) -> f32 {
    // near-bottom-left to far-top-right
    (corners[7] - corners[0]).length()
}

/// Grows the XY extent to a rotation-invariant size so the projection does
/// not change as the camera turns (stops shadow-edge shimmer).
fn fix_bounds_size(mut bounds: Aabb, diagonal: f32) -> Aabb {
    let extent = bounds.max - bounds.min;
    let border_x = ((diagonal - extent.x) * 0.5).max(0.0);
    let border_y = ((diagonal - extent.y) * 0.5).max(0.0);
    bounds.min.x -= border_x;
    bounds.max.x += border_x;
    bounds.min.y -= border_y;
    bounds.max.y += border_y;
    bounds
}

/// Quantizes the XY extent to shadow-map texel increments so a crawling
/// camera does not make shadow edges swim.
pub fn snap_bounds_to_texels(mut bounds: Aabb, shadow_size: u32) -> Aabb {
    let size = shadow_size.max(1) as f32;
    let units_x = ((bounds.max.x - bounds.min.x) / size).max(1e-6);
    let units_y = ((bounds.max.y - bounds.min.y) / size).max(1e-6);
    bounds.min.x = (bounds.min.x / units_x).floor() * units_x;
    bounds.max.x = (bounds.max.x / units_x).ceil() * units_x;
    bounds.min.y = (bounds.min.y / units_y).floor() * units_y;
    bounds.max.y = (bounds.max.y / units_y).ceil() * units_y;
    bounds
}

/// Exact light-space depth bounds of the scene geometry that can influence
/// this cascade: every face of the scene AABB is clipped against the
/// cascade's XY rectangle and the surviving z extents are returned as
/// (near, far) plane distances. `None` when nothing intersects.
pub fn compute_near_far_intersection(
    cascade_bounds: &Aabb,
    scene_corners: &[Vec3; 8],
) -> Option<(f32, f32)> {
    // Two triangles per face of the scene box, indexed into Aabb::corners().
    const TRIANGLES: [[usize; 3]; 12] = [
        [0, 1, 3],
        [0, 3, 2],
        [4, 5, 7],
        [4, 7, 6],
        [0, 2, 6],
        [0, 6, 4],
        [1, 3, 7],
        [1, 7, 5],
        [0, 1, 5],
        [0, 5, 4],
        [2, 3, 7],
        [2, 7, 6],
    ];
    let min = cascade_bounds.min;
    let max = cascade_bounds.max;
    let planes: [Box<dyn Fn(Vec3) -> f32>; 4] = [
        Box::new(move |p| p.x - min.x),
        Box::new(move |p| max.x - p.x),
        Box::new(move |p| p.y - min.y),
        Box::new(move |p| max.y - p.y),
    ];

    let mut min_z = f32::MAX;
    let mut max_z = f32::MIN;
    for tri in TRIANGLES {
        let mut poly: Vec<Vec3> = tri.iter().map(|&i| scene_corners[i]).collect();
        for plane in &planes {
            poly = clip_polygon(&poly, plane.as_ref());
            if poly.is_empty() {
                break;
            }
        }
        for p in &poly {
            min_z = min_z.min(p.z);
            max_z = max_z.max(p.z);
        }
    }
    if min_z > max_z {
        None
    } else {
        // Light space looks down -z: the largest z is the closest plane.
        Some((-max_z, -min_z))
    }
}

/// Sutherland-Hodgman clip of a convex polygon against one half-space
/// (`distance >= 0` is inside).
fn clip_polygon(poly: &[Vec3], distance: &dyn Fn(Vec3) -> f32) -> Vec<Vec3> {
    let mut out = Vec::with_capacity(poly.len() + 1);
    for (i, &current) in poly.iter().enumerate() {
        let previous = poly[(i + poly.len() - 1) % poly.len()];
        let d_cur = distance(current);
        let d_prev = distance(previous);
        if d_prev >= 0.0 && d_cur >= 0.0 {
            out.push(current);
        } else if d_prev >= 0.0 || d_cur >= 0.0 {
            let t = d_prev / (d_prev - d_cur);
            let crossing = previous + (current - previous) * t;
            out.push(crossing);
            if d_cur >= 0.0 {
                out.push(current);
            }
        }
    }
    out
}

/// Scale/offset that take a light-space position through the cascade's
/// projection straight into shadow-map texture coordinates (NDC [-1,1] to
/// [0,1] with Y flipped).
pub fn cascade_scale_offset(proj: Mat4) -> (Vec4, Vec4) {
    let tex = Mat4::from_cols(
        Vec4::new(0.5, 0.0, 0.0, 0.0),
        Vec4::new(0.0, -0.5, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 1.0, 0.0),
        Vec4::new(0.5, 0.5, 0.0, 1.0),
    ) * proj;
    let scale = Vec4::new(tex.x_axis.x, tex.y_axis.y, tex.z_axis.z, 1.0);
    let offset = Vec4::new(tex.w_axis.x, tex.w_axis.y, tex.w_axis.z, 0.0);
    (scale, offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewer() -> Camera3D {
        Camera3D::new(Vec3::new(0.0, 5.0, 20.0), Vec3::ZERO, 60.0_f32.to_radians(), 0.5, 300.0)
    }

    fn light() -> Camera3D {
        Camera3D::new(Vec3::new(-120.0, 150.0, -80.0), Vec3::ZERO, 60.0_f32.to_radians(), 0.1, 1000.0)
    }

    fn scene() -> Aabb {
        Aabb::new(Vec3::new(-60.0, 0.0, -60.0), Vec3::new(60.0, 20.0, 60.0))
    }

    #[test]
    fn clamp_partitions_orders_and_saturates() {
        let mut partitions = [0.5, 0.1, 2.0, -0.3, 0.9, 0.2, 0.4, 0.6];
        clamp_partitions(&mut partitions, 5);
        for window in partitions.windows(2) {
            assert!(window[0] <= window[1]);
        }
        assert!(partitions.iter().all(|p| (0.0..=1.0).contains(p)));
        assert_eq!(partitions[4], 1.0);
        assert_eq!(partitions[7], 1.0);
    }

    #[test]
    fn update_frame_is_deterministic_for_all_counts() {
        for count in 1..=MAX_CASCADES {
            let mut a = CascadeShadowManager::new();
            let mut b = CascadeShadowManager::new();
            a.cascade_count = count;
            b.cascade_count = count;
            a.update_frame(&viewer(), 16.0 / 9.0, &light(), scene());
            b.update_frame(&viewer(), 16.0 / 9.0, &light(), scene());
            for cascade in 0..count {
                assert_eq!(
                    a.shadow_proj[cascade].to_cols_array(),
                    b.shadow_proj[cascade].to_cols_array(),
                    "cascade {cascade} of {count}"
                );
            }
        }
    }

    #[test]
    fn partition_depths_increase_with_cascade_index() {
        let mut manager = CascadeShadowManager::new();
        manager.update_frame(&viewer(), 16.0 / 9.0, &light(), scene());
        let depths = manager.cascade_partitions();
        for cascade in 1..manager.cascade_count() {
            assert!(depths[cascade] >= depths[cascade - 1]);
        }
        let cam = viewer();
        assert!(depths[manager.cascade_count() - 1] <= cam.far + 1e-3);
    }

    #[test]
    fn frustum_slice_corners_straddle_the_interval() {
        let cam = viewer();
        let corners = frustum_slice_corners(&cam, 1.0, 1.0, 50.0);
        let view = cam.view_matrix();
        for (i, corner) in corners.iter().enumerate() {
            let depth = -view.transform_point3(*corner).z;
            let expected = if i < 4 { 1.0 } else { 50.0 };
            assert!((depth - expected).abs() < 0.05, "corner {i} depth {depth}");
        }
    }

    #[test]
    fn texel_snapping_only_grows_bounds() {
        let bounds = Aabb::new(Vec3::new(-10.3, -7.7, -50.0), Vec3::new(11.9, 9.1, -1.0));
        let snapped = snap_bounds_to_texels(bounds, 1024);
        assert!(snapped.min.x <= bounds.min.x);
        assert!(snapped.min.y <= bounds.min.y);
        assert!(snapped.max.x >= bounds.max.x);
        assert!(snapped.max.y >= bounds.max.y);
        assert_eq!(snapped.min.z, bounds.min.z);
    }

    #[test]
    fn near_far_intersection_inside_scene() {
        let scene_light = Aabb::new(Vec3::new(-10.0, -10.0, -90.0), Vec3::new(10.0, 10.0, -30.0));
        let cascade = Aabb::new(Vec3::new(-5.0, -5.0, 0.0), Vec3::new(5.0, 5.0, 0.0));
        let (near, far) =
            compute_near_far_intersection(&cascade, &scene_light.corners()).expect("overlap");
        assert!((near - 30.0).abs() < 1e-4);
        assert!((far - 90.0).abs() < 1e-4);
    }

    #[test]
    fn near_far_intersection_misses_disjoint_scene() {
        let scene_light = Aabb::new(Vec3::new(50.0, 50.0, -90.0), Vec3::new(60.0, 60.0, -30.0));
        let cascade = Aabb::new(Vec3::new(-5.0, -5.0, 0.0), Vec3::new(5.0, 5.0, 0.0));
        assert!(compute_near_far_intersection(&cascade, &scene_light.corners()).is_none());
    }

    #[test]
    fn scale_offset_maps_light_space_to_texture_space() {
        let proj = Mat4::orthographic_rh(-20.0, 20.0, -10.0, 10.0, 1.0, 100.0);
        let (scale, offset) = cascade_scale_offset(proj);
        // The projection is axis-aligned, so scale/offset applied to a
        // light-space position reproduce projection + NDC-to-texture mapping.
        // Min corner at the near plane lands on (0, 1, 0): top-left origin
        // with +y down, depth 0 at the near plane.
        let p = Vec3::new(-20.0, -10.0, -1.0);
        let u = p.x * scale.x + offset.x;
        let v = p.y * scale.y + offset.y;
        let d = p.z * scale.z + offset.z;
        assert!(u.abs() < 1e-5);
        assert!((v - 1.0).abs() < 1e-5);
        assert!(d.abs() < 1e-5);

        let far_max = Vec3::new(20.0, 10.0, -100.0);
        let u2 = far_max.x * scale.x + offset.x;
        let v2 = far_max.y * scale.y + offset.y;
        let d2 = far_max.z * scale.z + offset.z;
        assert!((u2 - 1.0).abs() < 1e-5);
        assert!(v2.abs() < 1e-5);
        assert!((d2 - 1.0).abs() < 1e-5);
    }
}
