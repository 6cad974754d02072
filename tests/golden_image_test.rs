#![cfg(feature = "integration-tests")]

use toon_flight::{
    SceneConfig,
    config::CloudConfig,
    context::Context,
    render::SceneRenderer,
    scene::SceneState,
};

const SIZE: u32 = 64;

/// The default scene without clouds or model, so only sky and ground are visible.
fn empty_sky_config() -> SceneConfig {
    SceneConfig {
        clouds: CloudConfig {
            count: 0,
            seed: Some(1),
            ..SceneConfig::default().clouds
        },
        ..SceneConfig::default()
    }
}

fn assert_close(actual: image::Rgba<u8>, expected: [u8; 3], tolerance: u8) {
    for (a, e) in actual.0.iter().zip(expected) {
        assert!(
            a.abs_diff(e) <= tolerance,
            "pixel {:?} differs from {:?}",
            actual,
            expected
        );
    }
}

#[tokio::test]
async fn should_hide_the_far_sky_in_fog() {
    let config = empty_sky_config();
    let ctx = Context::new_headless(SIZE, SIZE, &config)
        .await
        .expect("headless context");
    let scene = SceneState::new(&config);
    let mut renderer = SceneRenderer::new(&ctx);

    let image = renderer
        .render_to_image(&ctx, &scene)
        .await
        .expect("frame is read back");

    assert_eq!(image.dimensions(), (SIZE, SIZE));
    // the dome sits at radius 500, far past the fog's far plane
    assert_close(*image.get_pixel(0, 0), [0xBC, 0xD6, 0xF3], 2);
    assert_close(*image.get_pixel(SIZE - 1, 0), [0xBC, 0xD6, 0xF3], 2);
}

#[tokio::test]
async fn should_light_the_ground_in_the_bright_band() {
    let config = empty_sky_config();
    let ctx = Context::new_headless(SIZE, SIZE, &config)
        .await
        .expect("headless context");
    let mut scene = SceneState::new(&config);
    let mut renderer = SceneRenderer::new(&ctx);

    // without a farmland image the ground samples plain white
    let image = renderer
        .render_to_image(&ctx, &scene)
        .await
        .expect("frame is read back");
    let ground = image.get_pixel(SIZE / 2, SIZE - 1);
    assert!(ground.0[..3].iter().all(|&c| c >= 250), "ground is {:?}", ground);

    let farmland = std::sync::Arc::new(image::RgbaImage::from_pixel(
        1,
        1,
        image::Rgba([0, 64, 0, 255]),
    ));
    scene.on_texture_loaded(scene.ground_texture, Ok(farmland));
    let image = renderer
        .render_to_image(&ctx, &scene)
        .await
        .expect("frame is read back");
    let ground = image.get_pixel(SIZE / 2, SIZE - 1);
    assert!(ground.0[1] > ground.0[0], "ground is {:?}", ground);
    assert!(ground.0[1] > ground.0[2], "ground is {:?}", ground);
}
