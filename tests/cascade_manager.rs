use glam::{Mat4, Vec3, Vec4};
use lantern::camera3d::{reverse_depth, Camera3D};
use lantern::renderer::cascades::{clamp_partitions, CascadeShadowManager};
use lantern::renderer::MAX_CASCADES;
use lantern::scene::Aabb;

fn viewer() -> Camera3D {
    Camera3D::new(Vec3::new(10.0, 6.0, 30.0), Vec3::ZERO, 60.0_f32.to_radians(), 0.5, 300.0)
}

fn light() -> Camera3D {
    Camera3D::new(Vec3::new(-320.0, 300.0, -220.0), Vec3::ZERO, 60.0_f32.to_radians(), 0.1, 1000.0)
}

fn scene_bounds() -> Aabb {
    Aabb::new(Vec3::new(-60.0, 0.0, -60.0), Vec3::new(60.0, 25.0, 60.0))
}

#[test]
fn partitions_stay_ordered_for_every_cascade_count() {
    for count in 1..=MAX_CASCADES {
        let mut manager = CascadeShadowManager::new();
        manager.set_cascade_count(count);
        // deliberately hostile slider values
        manager.config.partitions = [0.9, 0.05, 1.7, -0.4, 0.3, 0.2, 0.8, 0.1];
        manager.update_frame(&viewer(), 16.0 / 9.0, &light(), scene_bounds());
        let fractions = manager.partition_fractions();
        for window in fractions.windows(2) {
            assert!(window[0] <= window[1], "fractions out of order for count {count}: {fractions:?}");
        }
        assert!(fractions.iter().all(|f| (0.0..=1.0).contains(f)));
        assert_eq!(fractions[count - 1], 1.0);
    }
}

#[test]
fn repeated_updates_are_bit_identical() {
    // The idempotence contract: recomputing with identical inputs, or
    // re-initializing with identical parameters, must not change a single
    // bit of the cascade projections.
    let mut first = CascadeShadowManager::new();
    let mut second = CascadeShadowManager::new();
    for manager in [&mut first, &mut second] {
        manager.set_cascade_count(4);
        manager.update_frame(&viewer(), 1.5, &light(), scene_bounds());
        // second run with the same inputs on the same manager
        manager.update_frame(&viewer(), 1.5, &light(), scene_bounds());
    }
    for cascade in 0..4 {
        let a = first.shadow_projection(cascade).to_cols_array();
        let b = second.shadow_projection(cascade).to_cols_array();
        assert_eq!(a, b, "cascade {cascade} diverged");
        assert!(a.iter().all(|v| v.is_finite()));
    }
}

#[test]
fn cascade_projections_cover_their_frustum_slice() {
    let mut manager = CascadeShadowManager::new();
    manager.set_cascade_count(3);
    manager.config.partitions = [0.2, 0.5, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0];
    manager.update_frame(&viewer(), 1.0, &light(), scene_bounds());

    let cam = viewer();
    let light_view = manager.shadow_view();
    // a point on the view axis inside cascade 2's depth interval
    // (fractions 0.5..1.0 of the 0.5..300 range) must project into the
    // cascade's clip box
    let probe = cam.position + cam.look_dir() * 200.0;
    let clip = manager.shadow_projection(2) * light_view * Vec4::new(probe.x, probe.y, probe.z, 1.0);
    assert!(clip.x.abs() <= 1.0 + 1e-3, "x out of range: {}", clip.x);
    assert!(clip.y.abs() <= 1.0 + 1e-3, "y out of range: {}", clip.y);
}

#[test]
fn reversed_depth_debug_projection_maps_near_to_one_far_to_zero() {
    // Known test frustum: the cascade debug camera flips the projection so
    // the near plane lands on depth 1 and the far plane on depth 0.
    let proj = Mat4::orthographic_rh(-30.0, 30.0, -20.0, 20.0, 2.0, 250.0);
    let flipped = reverse_depth(proj);

    let near_point = flipped * Vec4::new(0.0, 0.0, -2.0, 1.0);
    let far_point = flipped * Vec4::new(0.0, 0.0, -250.0, 1.0);
    assert!((near_point.z / near_point.w - 1.0).abs() < 1e-5);
    assert!((far_point.z / far_point.w).abs() < 1e-5);

    // and the original convention is the exact mirror
    let near_orig = proj * Vec4::new(0.0, 0.0, -2.0, 1.0);
    let far_orig = proj * Vec4::new(0.0, 0.0, -250.0, 1.0);
    assert!((near_orig.z).abs() < 1e-5);
    assert!((far_orig.z - 1.0).abs() < 1e-5);
}

#[test]
fn reversed_depth_applies_to_computed_cascades() {
    let mut manager = CascadeShadowManager::new();
    manager.update_frame(&viewer(), 1.2, &light(), scene_bounds());
    let proj = manager.shadow_projection(0);
    let flipped = reverse_depth(proj);
    // any light-space point's depth flips to its complement
    let point = Vec4::new(3.0, -4.0, -25.0, 1.0);
    let original = (proj * point).z;
    let reversed = (flipped * point).z;
    assert!((original + reversed - 1.0).abs() < 1e-4);
}

#[test]
fn clamp_partitions_is_idempotent() {
    let mut partitions = [0.3, 0.1, 0.9, 0.2, 1.4, -0.1, 0.5, 0.6];
    clamp_partitions(&mut partitions, 6);
    let once = partitions;
    clamp_partitions(&mut partitions, 6);
    assert_eq!(once, partitions);
}

#[test]
fn near_far_policies_produce_distinct_projections() {
    use lantern::settings::NearFarFit;
    let mut projections = Vec::new();
    for fit in NearFarFit::ALL {
        let mut manager = CascadeShadowManager::new();
        manager.config.near_far_fit = fit;
        manager.update_frame(&viewer(), 1.0, &light(), scene_bounds());
        projections.push(manager.shadow_projection(0).to_cols_array());
    }
    // the fixed 0..1 policy must differ from the fitted ones
    assert_ne!(projections[0], projections[1]);
    assert_ne!(projections[0], projections[2]);
    // XY fit is shared; only the depth mapping changes
    for fitted in &projections[1..] {
        assert_eq!(projections[0][0], fitted[0]);
        assert_eq!(projections[0][5], fitted[5]);
    }
}
