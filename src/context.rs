use std::sync::Arc;

use winit::window::Window;

use crate::{
    camera::{Camera, CameraResources, Projection},
    config::{SceneConfig, srgb_hex_to_linear},
    data_structures::texture,
    pipelines::{
        Pipelines,
        basic::SceneLayouts,
        fog::FogResources,
        light::LightResources,
    },
    resources::texture::material_layout,
};

/// GPU device, surface and every scene-wide GPU resource.
///
/// `window` and `surface` are absent for a headless context, which renders into
/// off-screen textures only.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Option<Arc<Window>>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: Option<wgpu::Surface<'static>>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub light: LightResources,
    pub fog: FogResources,
    pub material_layout: wgpu::BindGroupLayout,
    pub pipelines: Pipelines,
    pub clear_colour: wgpu::Color,
}

/**
 * Applies a new viewport size to the surface configuration and the camera
 * projection. The aspect ratio becomes exactly `width / height` and the
 * projection matrix is recomputed.
 *
 * Zero-sized viewports (a minimised window) are ignored since a surface cannot
 * be configured with them. Returns whether anything changed.
 */
pub fn apply_resize(
    config: &mut wgpu::SurfaceConfiguration,
    projection: &mut Projection,
    width: u32,
    height: u32,
) -> bool {
    if width == 0 || height == 0 {
        return false;
    }
    config.width = width;
    config.height = height;
    projection.resize(width, height);
    true
}

impl Context {
    pub async fn new(window: Arc<Window>, scene: &SceneConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();

        // The instance is a handle to our GPU
        // BackendBit::PRIMARY => Vulkan + Metal + DX12 + Browser WebGPU
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });

        let surface = instance.create_surface(window.clone())?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;
        let (device, queue) = request_device(&adapter).await?;

        let surface_caps = surface.get_capabilities(&adapter);
        // Shaders write linear colour and rely on an sRGB surface to encode it.
        // Other formats make everything come out darker.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| anyhow::anyhow!("the surface is incompatible with the adapter"))?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        // Configuration is deferred to the first non-zero resize, see `resize`.
        log::info!("Surface format {:?}", surface_format);

        let mut ctx = Self::with_device(device, queue, config, scene);
        ctx.window = Some(window);
        ctx.surface = Some(surface);
        Ok(ctx)
    }

    /// A context without window or surface that renders into `width`x`height` textures.
    #[cfg(feature = "integration-tests")]
    pub async fn new_headless(width: u32, height: u32, scene: &SceneConfig) -> anyhow::Result<Self> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::new_without_display_handle());
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;
        let (device, queue) = request_device(&adapter).await?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            width,
            height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        Ok(Self::with_device(device, queue, config, scene))
    }

    fn with_device(
        device: wgpu::Device,
        queue: wgpu::Queue,
        config: wgpu::SurfaceConfiguration,
        scene: &SceneConfig,
    ) -> Self {
        let projection = Projection::from_config(config.width, config.height, &scene.camera);
        let camera = CameraResources::new(&device, Camera::from_config(&scene.camera), &projection);
        let light = LightResources::new(&device, &scene.light);
        let fog = FogResources::new(&device, &scene.fog);
        let material_layout = material_layout(&device);
        let pipelines = Pipelines::new(
            &device,
            config.format,
            &SceneLayouts {
                material: &material_layout,
                camera: &camera.bind_group_layout,
                light: &light.bind_group_layout,
                fog: &fog.bind_group_layout,
            },
        );
        let depth_texture =
            texture::Texture::create_depth_texture(&device, [config.width, config.height], "depth_texture");
        let [r, g, b] = srgb_hex_to_linear(scene.clear_colour);

        Self {
            window: None,
            surface: None,
            device,
            queue,
            config,
            camera,
            projection,
            light,
            fog,
            material_layout,
            pipelines,
            depth_texture,
            clear_colour: wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: 1.0,
            },
        }
    }

    /// Resizes surface, depth buffer and camera aspect. Returns false for zero sizes.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if !apply_resize(&mut self.config, &mut self.projection, width, height) {
            return false;
        }
        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.config);
        }
        self.depth_texture = texture::Texture::create_depth_texture(
            &self.device,
            [self.config.width, self.config.height],
            "depth_texture",
        );
        self.camera.write(&self.queue, &self.projection);
        true
    }

    pub fn window(&self) -> Option<&Arc<Window>> {
        self.window.as_ref()
    }
}

async fn request_device(adapter: &wgpu::Adapter) -> anyhow::Result<(wgpu::Device, wgpu::Queue)> {
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: None,
            required_features: wgpu::Features::empty(),
            // WebGL doesn't support all of wgpu's features, so if
            // we're building for the web we'll have to disable some.
            required_limits: if cfg!(target_arch = "wasm32") {
                wgpu::Limits::downlevel_webgl2_defaults()
            } else {
                wgpu::Limits::default()
            },
            memory_hints: Default::default(),
            trace: wgpu::Trace::Off,
            ..Default::default()
        })
        .await?;
    Ok((device, queue))
}
