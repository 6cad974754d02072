use approx::assert_relative_eq;
use toon_flight::{SceneConfig, config::srgb_hex_to_linear};

#[test]
fn should_keep_black_and_white_at_the_ends() {
    for channel in srgb_hex_to_linear(0xFFFFFF) {
        assert_relative_eq!(channel, 1.0, epsilon = 1e-6);
    }
    assert_eq!(srgb_hex_to_linear(0x000000), [0.0, 0.0, 0.0]);
}

#[test]
fn should_linearise_each_channel() {
    let [r, g, b] = srgb_hex_to_linear(0x87BEFC);
    assert_relative_eq!(r, 0.2423, epsilon = 1e-3);
    assert_relative_eq!(g, 0.5149, epsilon = 1e-3);
    assert_relative_eq!(b, 0.9734, epsilon = 1e-3);

    // the linear segment near black
    let [r, g, b] = srgb_hex_to_linear(0x0A0000);
    assert_relative_eq!(r, 10.0 / 255.0 / 12.92, epsilon = 1e-6);
    assert_eq!((g, b), (0.0, 0.0));
}

#[test]
fn should_default_to_the_flight_scene() {
    let config = SceneConfig::default();

    assert_eq!(config.clear_colour, 0x87BEFC);
    assert_eq!(config.camera.position, [0.0, 0.0, 5.0]);
    assert_eq!(config.camera.fovy_degrees, 75.0);
    assert_eq!((config.camera.znear, config.camera.zfar), (0.1, 1000.0));

    assert_eq!(config.light.position, [0.0, 1.0, 0.0]);
    assert_eq!(config.light.intensity, 4.0);
    assert_eq!(config.fog.colour, 0xBCD6F3);
    assert_eq!((config.fog.near, config.fog.far), (100.0, 140.0));

    assert_eq!(config.model.file, "spitfire.gltf");
    assert_eq!(config.model.position, [0.0, -1.0, 0.0]);
    assert_eq!(config.model.rotation, [0.0, std::f32::consts::FRAC_PI_2, 0.0]);

    assert_eq!(config.ground.size, [300.0, 300.0]);
    assert_eq!(config.ground.height, -50.0);
    assert_eq!(config.ground.texture_repeat, 3.0);
    assert_eq!(config.sky.radius, 500.0);
    assert_eq!((config.sky.width_segments, config.sky.height_segments), (60, 40));

    assert_eq!(config.clouds.count, 10);
    assert_eq!((config.clouds.wrap_max, config.clouds.wrap_to), (5.0, -5.0));
    assert_eq!(config.clouds.seed, None);
}
