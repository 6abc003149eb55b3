//! Desktop viewer window.
//!
//! [`App`] opens a window, binds a [`WgpuSurface`] to it and runs a
//! [`Viewer`] on winit's event loop.
//!
//! Key bindings:
//!
//! | Key | Action |
//! |---|---|
//! | `A` | enter / leave the immersive session |
//! | `R` | reset the camera |
//! | `L` | reload the model |
//! | `Esc` | quit |
//!
//! ```rust,ignore
//! use arview::app::App;
//! use arview::viewer::ModelSource;
//!
//! App::new()
//!     .with_title("arview")
//!     .with_model(ModelSource::Locator(locator))
//!     .run()?;
//! ```

use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
pub use winit::window::{Window, WindowId};

use crate::app::input::{Input, Key};
use crate::errors::{Error, Result};
use crate::render::gpu::{GpuSettings, WgpuSurface};
use crate::utils::fps_counter::FpsCounter;
use crate::viewer::{LoadHandle, ModelSource, Viewer, ViewerConfig};
use crate::xr::{NoXrRuntime, XrSessionState};

pub mod input_adapter;

/// Builder for the desktop viewer.
pub struct App {
    title: String,
    gpu_settings: GpuSettings,
    viewer_config: ViewerConfig,
    model: Option<ModelSource>,
}

impl App {
    #[must_use]
    pub fn new() -> Self {
        Self {
            title: "arview".into(),
            gpu_settings: GpuSettings::default(),
            viewer_config: ViewerConfig::default(),
            model: None,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_gpu_settings(mut self, settings: GpuSettings) -> Self {
        self.gpu_settings = settings;
        self
    }

    #[must_use]
    pub fn with_viewer_config(mut self, config: ViewerConfig) -> Self {
        self.viewer_config = config;
        self
    }

    /// Model loaded as soon as the window opens.
    #[must_use]
    pub fn with_model(mut self, source: ModelSource) -> Self {
        self.model = Some(source);
        self
    }

    /// Blocks until the window closes.
    pub fn run(self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut runner = AppRunner::new(self);
        event_loop.run_app(&mut runner)?;
        runner.failure.map_or(Ok(()), Err)
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

struct AppRunner {
    app: App,

    window: Option<Arc<Window>>,
    viewer: Option<Viewer<WgpuSurface>>,
    input: Input,
    fps: FpsCounter,
    pending_load: Option<LoadHandle>,
    failure: Option<Error>,
}

impl AppRunner {
    fn new(app: App) -> Self {
        Self {
            app,
            window: None,
            viewer: None,
            input: Input::new(),
            fps: FpsCounter::new(),
            pending_load: None,
            failure: None,
        }
    }

    fn init_viewer(&mut self, window: &Arc<Window>) -> Result<Viewer<WgpuSurface>> {
        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));

        log::info!("Initializing Renderer Backend...");
        let surface = pollster::block_on(WgpuSurface::new(
            window.clone(),
            &self.app.gpu_settings,
            width,
            height,
        ))?;

        let mut viewer = Viewer::initialize(surface, self.app.viewer_config.clone())?;
        self.input.inject_resize(width, height);

        if let Some(source) = self.app.model.take() {
            self.pending_load = Some(viewer.load(source));
        }
        Ok(viewer)
    }

    fn handle_actions(&mut self, event_loop: &ActiveEventLoop) {
        let Some(viewer) = &mut self.viewer else {
            return;
        };

        if self.input.get_key_down(Key::Escape) {
            event_loop.exit();
            return;
        }

        if self.input.get_key_down(Key::A) {
            let outcome = match viewer.xr_state() {
                XrSessionState::Idle => viewer.enter_immersive(NoXrRuntime),
                _ => viewer.exit_immersive(),
            };
            if let Err(e) = outcome {
                log::warn!("{e}");
            }
        }

        if self.input.get_key_down(Key::L)
            && let Some(handle) = viewer.reload()
        {
            self.pending_load = Some(handle);
        }
    }

    fn render_frame(&mut self) {
        let Some(viewer) = &mut self.viewer else {
            return;
        };

        if let Err(e) = viewer.frame(&self.input) {
            log::error!("Frame failed: {e}");
        }
        self.input.start_frame();

        if let Some(handle) = &mut self.pending_load
            && let Some(outcome) = handle.try_result()
        {
            match outcome {
                Ok(root) => log::info!("Model ready: {root:?}"),
                Err(e) => log::error!("Model failed to load: {e}"),
            }
            self.pending_load = None;
        }

        if self.fps.update().is_some()
            && let Some(window) = &self.window
        {
            window.set_title(&self.fps.title(&self.app.title));
        }
    }

    fn shutdown(&mut self) {
        if let Some(viewer) = self.viewer.take() {
            let surface = viewer.teardown();
            drop(surface);
        }
        self.pending_load = None;
    }
}

impl ApplicationHandler for AppRunner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title(&self.app.title)
            .with_inner_size(winit::dpi::LogicalSize::new(1280.0, 720.0));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                self.failure = Some(Error::Gpu(e.to_string()));
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());

        match self.init_viewer(&window) {
            Ok(viewer) => self.viewer = Some(viewer),
            Err(e) => {
                log::error!("Fatal Renderer Error: {e}");
                self.failure = Some(e);
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        input_adapter::process_window_event(&mut self.input, &event);

        match event {
            WindowEvent::CloseRequested => {
                self.shutdown();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(viewer) = &mut self.viewer {
                    viewer.on_resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                self.handle_actions(event_loop);
                self.render_frame();
                if let Some(w) = &self.window {
                    w.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if self.viewer.is_some()
            && let Some(window) = &self.window
        {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.shutdown();
    }
}
