//! Application event loop.
//!
//! The event loop owns the GPU context, the scene and the renderer. Everything
//! else reaches it as an event:
//!
//! 1. `resumed` creates the window and the GPU context, builds the scene and
//!    starts loading its assets in the background
//! 2. finished loads come back as [`FlowEvent`]s through the event-loop proxy
//!    and are applied to the scene on the main thread
//! 3. pointer input goes to the orbit controller, resizes to the context
//! 4. every `RedrawRequested` advances the scene one tick, renders it and
//!    requests the next redraw

use std::{fmt::Debug, sync::Arc};

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    config::SceneConfig,
    context::Context,
    data_structures::texture::TextureHandle,
    render::SceneRenderer,
    resources::{self, ModelData},
    scene::{AssetRequest, SceneState, wall_clock_seconds},
};

/// Application state bundle: GPU context, scene, renderer and surface status.
pub(crate) struct AppState {
    pub(crate) ctx: Context,
    scene: SceneState,
    renderer: SceneRenderer,
    is_surface_configured: bool,
}

impl Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("ctx", &self.ctx)
            .field("is_surface_configured", &self.is_surface_configured)
            .finish()
    }
}

impl AppState {
    async fn new(window: Arc<Window>, config: &SceneConfig) -> anyhow::Result<Self> {
        let ctx = Context::new(window, config).await?;
        let scene = SceneState::new(config);
        let renderer = SceneRenderer::new(&ctx);
        Ok(Self {
            ctx,
            scene,
            renderer,
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            self.is_surface_configured = true;
        } else {
            log::debug!("ignoring resize to {}x{}", width, height);
        }
    }

    fn render(&mut self) -> Result<(), wgpu::CurrentSurfaceTexture> {
        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }
        let Some(surface) = &self.ctx.surface else {
            return Ok(());
        };
        let output = match surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(texture)
            | wgpu::CurrentSurfaceTexture::Suboptimal(texture) => texture,
            other => return Err(other),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.renderer
            .render(&self.ctx, &self.scene, &view, &self.ctx.depth_texture.view);
        output.present();
        Ok(())
    }

    fn request_redraw(&self) {
        if let Some(window) = self.ctx.window() {
            window.request_redraw();
        }
    }
}

pub(crate) enum FlowEvent {
    /// The context finished its async setup (web only, natively setup blocks).
    #[cfg(target_arch = "wasm32")]
    Initialized(anyhow::Result<AppState>),
    ModelLoaded(anyhow::Result<ModelData>),
    TextureLoaded(TextureHandle, anyhow::Result<Arc<image::RgbaImage>>),
}

impl Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(target_arch = "wasm32")]
            Self::Initialized(state) => f.debug_tuple("Initialized").field(&state.is_ok()).finish(),
            Self::ModelLoaded(model) => f.debug_tuple("ModelLoaded").field(&model.is_ok()).finish(),
            Self::TextureLoaded(handle, image) => f
                .debug_tuple("TextureLoaded")
                .field(handle)
                .field(&image.is_ok())
                .finish(),
        }
    }
}

pub(crate) struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<FlowEvent>,
    config: SceneConfig,
    state: Option<AppState>,
    init_error: Option<anyhow::Error>,
}

impl App {
    fn new(event_loop: &EventLoop<FlowEvent>, config: SceneConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config,
            state: None,
            init_error: None,
        })
    }

    /// Starts every load in the background. Results arrive as user events.
    fn spawn_loads(&self, requests: Vec<AssetRequest>) {
        for request in requests {
            let proxy = self.proxy.clone();
            let source = self.config.assets.clone();
            let load = async move {
                let event = match request {
                    AssetRequest::Model(file) => {
                        FlowEvent::ModelLoaded(resources::load_model(&source, &file).await)
                    }
                    AssetRequest::Texture(handle, file) => {
                        FlowEvent::TextureLoaded(handle, resources::load_image(&source, &file).await)
                    }
                };
                if let Err(e) = proxy.send_event(event) {
                    log::warn!("event loop closed before {:?} was delivered", e.0);
                }
            };
            #[cfg(not(target_arch = "wasm32"))]
            self.async_runtime.spawn(load);
            #[cfg(target_arch = "wasm32")]
            wasm_bindgen_futures::spawn_local(load);
        }
    }

    fn start(&mut self, mut state: AppState) {
        if let Some(window) = state.ctx.window() {
            let size = window.inner_size();
            state.resize(size.width, size.height);
        }
        self.spawn_loads(state.scene.asset_requests());
        state.request_redraw();
        self.state = Some(state);
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("App initialization failed. Cannot create the main context: {:#}", error);
        self.init_error = Some(error);
        event_loop.exit();
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("toon-flight");

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;

            // winit creates the canvas and appends it to the page body
            window_attributes = window_attributes.with_append(true);
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self
                .async_runtime
                .block_on(AppState::new(window, &self.config))
            {
                Ok(state) => self.start(state),
                Err(e) => self.fail(event_loop, e),
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            let config = self.config.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let state = AppState::new(window, &config).await;
                if proxy.send_event(FlowEvent::Initialized(state)).is_err() {
                    log::error!("event loop closed during initialization");
                }
            });
        }
    }

    #[cfg_attr(not(target_arch = "wasm32"), allow(unused_variables))]
    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            #[cfg(target_arch = "wasm32")]
            FlowEvent::Initialized(state) => match state {
                // This is the message from our wasm `spawn_local`
                Ok(state) => self.start(state),
                Err(e) => self.fail(event_loop, e),
            },
            FlowEvent::ModelLoaded(result) => {
                if let Some(state) = &mut self.state {
                    state.scene.on_model_loaded(result);
                }
            }
            FlowEvent::TextureLoaded(handle, result) => {
                if let Some(state) = &mut self.state {
                    state.scene.on_texture_loaded(handle, result);
                }
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        let ctx = &mut state.ctx;
        let camera = &mut ctx.camera;
        if camera.controller.handle_window_events(
            &mut camera.camera,
            &ctx.projection,
            ctx.config.height,
            &event,
        ) {
            camera.write(&ctx.queue, &ctx.projection);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                state.scene.run_frame(wall_clock_seconds());
                match state.render() {
                    Ok(_) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated) => {
                        if let Some(size) = state.ctx.window().map(|window| window.inner_size()) {
                            state.resize(size.width, size.height);
                        }
                    }
                    Err(e) => {
                        log::error!("Unable to render {:?}", e);
                    }
                }
                state.request_redraw();
            }
            _ => {}
        }
    }
}

pub fn run(config: SceneConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info)?;
    }

    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;

    let mut app = App::new(&event_loop, config)?;

    event_loop.run_app(&mut app)?;

    match app.init_error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
