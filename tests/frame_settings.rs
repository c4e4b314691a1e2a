use lantern::renderer::MAX_CASCADES;
use lantern::settings::{CameraSelection, FrameSettings, ShadowMode};

#[test]
fn out_of_order_partitions_are_clamped_not_rejected() {
    let mut settings = FrameSettings::default();
    settings.cascade_count = 5;
    settings.cascade_partitions = [0.8, 0.2, 0.6, 0.1, 0.9, 0.0, 0.0, 0.0];
    settings.sanitize();
    for window in settings.cascade_partitions.windows(2) {
        assert!(window[0] <= window[1]);
    }
    assert_eq!(settings.cascade_partitions[4], 1.0);
}

#[test]
fn cascade_count_bounds_are_enforced() {
    let mut settings = FrameSettings::default();
    settings.cascade_count = 0;
    settings.sanitize();
    assert_eq!(settings.cascade_count, 1);

    settings.cascade_count = 99;
    settings.sanitize();
    assert_eq!(settings.cascade_count, MAX_CASCADES);
}

#[test]
fn shadow_size_snaps_to_power_of_two_range() {
    let mut settings = FrameSettings::default();
    settings.shadow_size = 100;
    settings.sanitize();
    assert_eq!(settings.shadow_size, 256);

    settings.shadow_size = 1500;
    settings.sanitize();
    assert!(settings.shadow_size.is_power_of_two());
    assert!(settings.shadow_size >= 1500);
}

#[test]
fn shrinking_cascades_pulls_debug_camera_back_in_range() {
    let mut settings = FrameSettings::default();
    settings.cascade_count = 8;
    settings.camera = CameraSelection::Cascade(7);
    settings.debug_shadow_cascade = 7;
    settings.sanitize();
    assert_eq!(settings.camera, CameraSelection::Cascade(7));

    settings.cascade_count = 2;
    settings.sanitize();
    assert_eq!(settings.camera, CameraSelection::Cascade(1));
    assert_eq!(settings.debug_shadow_cascade, 1);
}

#[test]
fn variance_mode_uses_two_map_components() {
    assert_eq!(ShadowMode::Standard.map_components(), 1);
    assert_eq!(ShadowMode::Variance.map_components(), 2);
    assert_eq!(ShadowMode::Exponential.map_components(), 1);
}
