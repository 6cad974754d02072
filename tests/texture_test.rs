use std::borrow::Cow;

use approx::assert_relative_eq;
use toon_flight::{data_structures::texture::Texture, render::wrapped_offset};

fn image(width: u32, height: u32) -> image::RgbaImage {
    image::RgbaImage::from_pixel(width, height, image::Rgba([90, 140, 60, 255]))
}

#[test]
fn should_keep_textures_within_the_limit() {
    let farmland = image(1024, 512);
    let fitted = Texture::fit_to_limit(&farmland, 2048);

    assert!(matches!(fitted, Cow::Borrowed(_)));
    assert_eq!(fitted.dimensions(), (1024, 512));
    assert_eq!(Texture::fit_to_limit(&image(2048, 2048), 2048).dimensions(), (2048, 2048));
}

#[test]
fn should_downscale_textures_over_the_limit() {
    let sky = image(4096, 2048);
    let fitted = Texture::fit_to_limit(&sky, 2048);

    assert!(matches!(fitted, Cow::Owned(_)));
    assert_eq!(fitted.dimensions(), (2048, 1024));
    let pixel = fitted.get_pixel(100, 100).0;
    for (actual, expected) in pixel.iter().zip([90u8, 140, 60, 255]) {
        assert!(actual.abs_diff(expected) <= 1, "pixel is {:?}", pixel);
    }
}

#[test]
fn should_keep_slivers_at_least_one_pixel_wide() {
    assert_eq!(Texture::fit_to_limit(&image(3000, 10), 2048).dimensions(), (2048, 7));
    assert_eq!(Texture::fit_to_limit(&image(1, 5000), 2048).dimensions(), (1, 2048));
}

#[test]
fn should_upload_only_the_fraction_of_uv_offsets() {
    let [u, v] = wrapped_offset(cgmath::Vector2::new(-2048.1, 3.25));
    assert_relative_eq!(u, 0.9, epsilon = 1e-6);
    assert_relative_eq!(v, 0.25);

    assert_eq!(wrapped_offset(cgmath::Vector2::new(0.0, -1.0)), [0.0, 0.0]);
    let [u, _] = wrapped_offset(cgmath::Vector2::new(-0.0001, 0.0));
    assert!((0.0..1.0).contains(&u));
    assert_relative_eq!(u, 0.9999, epsilon = 1e-6);
}
