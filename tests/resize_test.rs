use cgmath::Deg;
use toon_flight::{camera::Projection, context::apply_resize};

fn surface_config(width: u32, height: u32) -> wgpu::SurfaceConfiguration {
    wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: wgpu::TextureFormat::Bgra8UnormSrgb,
        width,
        height,
        present_mode: wgpu::PresentMode::Fifo,
        alpha_mode: wgpu::CompositeAlphaMode::Auto,
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    }
}

#[test]
fn should_follow_the_viewport_aspect_ratio() {
    let mut config = surface_config(800, 600);
    let mut projection = Projection::new(800, 600, Deg(75.0), 0.1, 1000.0);
    assert_eq!(projection.aspect, 800.0 / 600.0);

    assert!(apply_resize(&mut config, &mut projection, 1024, 768));

    assert_eq!((config.width, config.height), (1024, 768));
    assert_eq!(projection.aspect, 1024.0 / 768.0);
    assert_eq!(
        projection.matrix,
        Projection::new(1024, 768, Deg(75.0), 0.1, 1000.0).matrix
    );
}

#[test]
fn should_recompute_the_matrix_for_non_uniform_changes() {
    let mut config = surface_config(800, 600);
    let mut projection = Projection::new(800, 600, Deg(75.0), 0.1, 1000.0);
    let before = projection.matrix;

    apply_resize(&mut config, &mut projection, 600, 800);

    assert_eq!(projection.aspect, 600.0 / 800.0);
    assert_ne!(projection.matrix, before);
    // the vertical field of view stays fixed, only x scales
    assert_eq!(projection.matrix.y.y, before.y.y);
    assert!(projection.matrix.x.x > before.x.x);
}

#[test]
fn should_ignore_a_zero_sized_viewport() {
    let mut config = surface_config(800, 600);
    let mut projection = Projection::new(800, 600, Deg(75.0), 0.1, 1000.0);
    let before = projection.clone();

    assert!(!apply_resize(&mut config, &mut projection, 0, 600));
    assert!(!apply_resize(&mut config, &mut projection, 1024, 0));

    assert_eq!((config.width, config.height), (800, 600));
    assert_eq!(projection.aspect, before.aspect);
    assert_eq!(projection.matrix, before.matrix);
}
