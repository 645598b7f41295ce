//! Flow control and application event loop.
//!
//! [`App`] is the single owner of everything the turntable needs at runtime:
//! the GPU [`Context`], the [`Scene`], the [`FrameLoop`] and the
//! [`ResizeHandler`]. All three event sources (frame presentation, viewport
//! changes and the asset loader finishing) arrive as winit events on the same
//! thread and each runs to completion before the next one starts.
//!
//! # Lifecycle
//!
//! 1. `resumed` creates the window and initializes the context asynchronously
//! 2. `Initialized` applies the first layout, starts listening for viewport
//!    changes and kicks off the asset load
//! 3. every `RedrawRequested` runs one [`FrameLoop::tick`]
//! 4. `AssetLoaded` fills the asset slot once, with the model or a placeholder
//! 5. `CloseRequested` stops the loop and drops the context

use std::{fmt::Debug, sync::Arc};

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    clock::InstantClock,
    config::SceneConfig,
    context::{Context, InitContext},
    data_structures::scene_graph::SceneNode,
    frame::{FrameLoop, FrameStage},
    resize::{ResizeHandler, SurfaceLayout, Viewport},
    resources::load_model_gltf,
    scene::Scene,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// GPU context and scene, created together once the window exists.
#[derive(Debug)]
pub struct AppState {
    pub ctx: Context,
    pub scene: Scene,
}

impl AppState {
    async fn new(
        window: Arc<Window>,
        config: &SceneConfig,
        layout: SurfaceLayout,
    ) -> anyhow::Result<Self> {
        let ctx = Context::new(window, config, layout).await?;
        let scene = Scene::build(&ctx.device, &ctx.queue, config);
        Ok(Self { ctx, scene })
    }

    fn on_asset(&mut self, asset_path: &str, loaded: anyhow::Result<Box<dyn SceneNode>>) {
        let written = match loaded {
            Ok(node) => self.scene.insert_asset(node),
            Err(e) => {
                log::error!("Could not load {}: {:#}", asset_path, e);
                self.scene
                    .fail_asset(format!("{:#}", e), &self.ctx.device, &self.ctx.queue)
            }
        };
        if let Err(e) = written {
            log::warn!("Asset slot left unchanged: {}", e);
        }
    }
}

impl FrameStage for AppState {
    type Asset = Box<dyn SceneNode>;

    fn update_controls(&mut self) {
        self.ctx.update_camera();
    }

    fn asset_mut(&mut self) -> Option<&mut Self::Asset> {
        self.scene.model.slot.active_mut()
    }

    fn draw(&mut self) -> Result<(), wgpu::SurfaceError> {
        self.ctx.render(&mut self.scene)
    }
}

pub enum FlowEvent {
    /// The context finished initializing (posted from `spawn_local` on the web).
    Initialized(Box<AppState>),
    /// The loader finished, successfully or not.
    AssetLoaded(anyhow::Result<Box<dyn SceneNode>>),
    /// The host viewport changed size or pixel ratio.
    Viewport(Viewport),
}

impl Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(state) => f.debug_tuple("Initialized").field(state).finish(),
            Self::AssetLoaded(Ok(_)) => f.write_str("AssetLoaded(Ok(SceneNode))"),
            Self::AssetLoaded(Err(e)) => f.debug_tuple("AssetLoaded").field(e).finish(),
            Self::Viewport(viewport) => f.debug_tuple("Viewport").field(viewport).finish(),
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<FlowEvent>,
    config: SceneConfig,
    state: Option<AppState>,
    /// Created right before the first frame is requested, so setup time is
    /// not part of the elapsed time the model turns by.
    frames: Option<FrameLoop<InstantClock>>,
    resize: ResizeHandler,
    window_created: bool,
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
            frames: None,
            resize: ResizeHandler::new(config.max_pixel_ratio),
            config,
            state: None,
            window_created: false,
        })
    }

    /// The current viewport as the host reports it.
    fn viewport(&self, window: &Window) -> Viewport {
        #[cfg(target_arch = "wasm32")]
        {
            match crate::resize::web_viewport() {
                Ok(viewport) => return viewport,
                Err(e) => log::warn!("Falling back to the canvas size: {}", e),
            }
        }
        Viewport::from_window(window)
    }

    fn on_viewport(&mut self, viewport: Viewport) {
        if let Some(state) = &mut self.state {
            self.resize.handle(viewport, &mut state.ctx);
        }
    }

    /// Starts the one and only asset load. The result comes back as
    /// [`FlowEvent::AssetLoaded`].
    fn load_asset(&self, init: InitContext) {
        let proxy = self.proxy.clone();
        let asset_path = self.config.asset_path;
        let draco_decoder_path = self.config.draco_decoder_path;
        log::info!("Loading {}", asset_path);
        let load = async move {
            load_model_gltf(asset_path, draco_decoder_path, &init.device, &init.queue).await
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            let loaded = self.async_runtime.block_on(load);
            if proxy.send_event(FlowEvent::AssetLoaded(loaded)).is_err() {
                log::error!("Event loop was closed before the asset arrived.");
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            wasm_bindgen_futures::spawn_local(async move {
                let loaded = load.await;
                if proxy.send_event(FlowEvent::AssetLoaded(loaded)).is_err() {
                    log::error!("Event loop was closed before the asset arrived.");
                }
            });
        }
    }

    fn on_initialized(&mut self, state: AppState) {
        let viewport = self.viewport(&state.ctx.window);
        let init = InitContext::from(&state.ctx);
        self.state = Some(state);
        self.on_viewport(viewport);

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            let listening = crate::resize::listen_for_viewport_changes(move |viewport| {
                let _ = proxy.send_event(FlowEvent::Viewport(viewport));
            });
            if let Err(e) = listening {
                log::warn!("Viewport changes will not be tracked: {}", e);
            }
        }

        self.load_asset(init);
        if let Some(state) = &self.state {
            self.frames = Some(FrameLoop::new(InstantClock::new(), self.config.spin_speed));
            state.ctx.window.request_redraw();
        }
    }

    fn teardown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(frames) = &mut self.frames {
            log::info!("Shutting down after {} frames", frames.ticks());
            frames.stop();
        }
        self.state = None;
        event_loop.exit();
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window_created {
            return;
        }
        self.window_created = true;

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("turntable");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            let window = web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = document
                .get_element_by_id(self.config.canvas_id)
                .unwrap_throw();
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Could not create a window: {}", e);
                event_loop.exit();
                return;
            }
        };
        let layout = self
            .viewport(&window)
            .layout(self.config.max_pixel_ratio)
            .unwrap_or_default();
        let config = self.config.clone();
        let init_future = async move { AppState::new(window, &config, layout).await };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok(state) => self.on_initialized(state),
                Err(e) => {
                    log::error!("App initialization failed. Cannot create the main context: {:#}", e);
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match init_future.await {
                    Ok(state) => {
                        if proxy.send_event(FlowEvent::Initialized(Box::new(state))).is_err() {
                            log::error!("Event loop was closed during initialization.");
                        }
                    }
                    Err(e) => {
                        log::error!("App initialization failed. Cannot create the main context: {:#}", e)
                    }
                }
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            FlowEvent::Initialized(state) => self.on_initialized(*state),
            FlowEvent::AssetLoaded(loaded) => {
                if let Some(state) = &mut self.state {
                    state.on_asset(self.config.asset_path, loaded);
                }
            }
            FlowEvent::Viewport(viewport) => self.on_viewport(viewport),
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

        state.ctx.camera.controller.handle_window_events(&event);

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => self.teardown(event_loop),
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                let window = state.ctx.window.clone();
                let viewport = self.viewport(&window);
                self.on_viewport(viewport);
            }
            WindowEvent::RedrawRequested => {
                let Some(frames) = &mut self.frames else {
                    return;
                };
                let window = state.ctx.window.clone();
                match frames.tick(state, window.as_ref()) {
                    Ok(Some(tick)) => {
                        log::trace!("frame {} at {:?}", tick.index, tick.elapsed)
                    }
                    Ok(None) => (),
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        state.ctx.reconfigure();
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Runs the turntable with the default [`SceneConfig`].
pub fn run() -> anyhow::Result<()> {
    run_with(SceneConfig::default())
}

pub fn run_with(config: SceneConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info).unwrap_throw();
    }

    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;

    let mut app = App::new(&event_loop, config)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}
