use lantern::renderer::deferred::dispatch_extent;
use lantern::renderer::COMPUTE_SHADER_TILE_GROUP_DIM;

#[test]
fn full_hd_dispatch_matches_reference() {
    // 1920/16 = 120 exactly; 1080/16 = 67.5 rounds up to 68
    assert_eq!(dispatch_extent(1920, 1080), (120, 68));
}

#[test]
fn exact_multiples_do_not_over_dispatch() {
    assert_eq!(dispatch_extent(1280, 720), (80, 45));
    assert_eq!(dispatch_extent(COMPUTE_SHADER_TILE_GROUP_DIM, COMPUTE_SHADER_TILE_GROUP_DIM), (1, 1));
}

#[test]
fn partial_tiles_round_up() {
    assert_eq!(dispatch_extent(1, 1), (1, 1));
    assert_eq!(dispatch_extent(17, 33), (2, 3));
    assert_eq!(dispatch_extent(1921, 1081), (121, 68));
}

#[test]
fn dispatch_grid_always_covers_the_framebuffer() {
    for width in [1u32, 15, 16, 17, 639, 640, 641, 1919, 1920] {
        for height in [1u32, 15, 16, 17, 479, 480, 481, 1079, 1080] {
            let (x, y) = dispatch_extent(width, height);
            assert!(x * COMPUTE_SHADER_TILE_GROUP_DIM >= width);
            assert!(y * COMPUTE_SHADER_TILE_GROUP_DIM >= height);
            assert!((x - 1) * COMPUTE_SHADER_TILE_GROUP_DIM < width);
            assert!((y - 1) * COMPUTE_SHADER_TILE_GROUP_DIM < height);
        }
    }
}
