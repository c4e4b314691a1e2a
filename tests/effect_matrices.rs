use glam::{Mat4, Vec3, Vec4};
use lantern::renderer::DerivedMatrices;

#[test]
fn derived_products_match_direct_multiplication() {
    let world = Mat4::from_scale_rotation_translation(
        Vec3::new(2.0, 1.0, 0.5),
        glam::Quat::from_rotation_y(1.1),
        Vec3::new(-4.0, 3.0, 12.0),
    );
    let view = Mat4::look_at_rh(Vec3::new(8.0, 10.0, -20.0), Vec3::ZERO, Vec3::Y);
    let proj = Mat4::perspective_rh(std::f32::consts::FRAC_PI_3, 16.0 / 9.0, 0.5, 300.0);

    let derived = DerivedMatrices::compute(world, view, proj);
    assert_eq!(derived.world_view.to_cols_array(), (view * world).to_cols_array());
    assert_eq!(derived.world_view_proj.to_cols_array(), (proj * view * world).to_cols_array());
    assert_eq!(derived.view_proj.to_cols_array(), (proj * view).to_cols_array());
}

#[test]
fn derived_products_agree_on_transformed_points() {
    let world = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
    let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
    let proj = Mat4::orthographic_rh(-10.0, 10.0, -10.0, 10.0, 0.1, 100.0);
    let derived = DerivedMatrices::compute(world, view, proj);

    let p = Vec4::new(0.5, -0.5, 0.25, 1.0);
    let step_by_step = proj * (view * (world * p));
    let combined = derived.world_view_proj * p;
    for (a, b) in step_by_step.to_array().iter().zip(combined.to_array()) {
        assert!((a - b).abs() < 1e-5);
    }
}

#[test]
fn inverse_view_round_trips() {
    let view = Mat4::look_at_rh(Vec3::new(5.0, 2.0, 8.0), Vec3::new(1.0, 0.0, 0.0), Vec3::Y);
    let derived = DerivedMatrices::compute(Mat4::IDENTITY, view, Mat4::IDENTITY);
    let identity = derived.inv_view * view;
    for (value, expected) in identity.to_cols_array().iter().zip(Mat4::IDENTITY.to_cols_array()) {
        assert!((value - expected).abs() < 1e-5);
    }
}
