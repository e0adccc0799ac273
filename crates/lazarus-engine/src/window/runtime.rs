use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::core::{SurfaceApp, WindowHost};
use crate::device::wgpu_binding::{GpuInit, WgpuBinding};
use crate::runloop::ViewConfig;
use crate::view::SurfaceView;

/// Binding used by the winit runtime.
pub type WinitBinding = WgpuBinding<Arc<Window>>;

/// How often the event loop checks whether the render loop died on its own.
const HEALTH_CHECK: Duration = Duration::from_millis(250);

/// Window/runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub title: String,
    pub initial_size: LogicalSize<f64>,
    /// `None` renders as fast as the present mode allows.
    pub updates_per_second: Option<f64>,
    pub gpu: GpuInit,
    pub view: ViewConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            title: "lazarus".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
            updates_per_second: Some(60.0),
            gpu: GpuInit::default(),
            view: ViewConfig::default(),
        }
    }
}

/// [`WindowHost`] backed by a winit window.
pub struct WinitHost {
    window: Arc<Window>,
    focused: AtomicBool,
    finishing: AtomicBool,
}

impl WinitHost {
    fn new(window: Arc<Window>) -> Self {
        let focused = window.has_focus();
        Self {
            window,
            focused: AtomicBool::new(focused),
            finishing: AtomicBool::new(false),
        }
    }

    fn set_focused(&self, focused: bool) {
        self.focused.store(focused, Ordering::Release);
    }

    fn finish(&self) {
        self.finishing.store(true, Ordering::Release);
    }
}

impl WindowHost for WinitHost {
    fn is_focused(&self) -> bool {
        self.focused.load(Ordering::Acquire)
    }

    fn request_focus(&self) -> Result<()> {
        self.window.focus_window();
        Ok(())
    }

    fn is_finishing(&self) -> bool {
        self.finishing.load(Ordering::Acquire)
    }
}

/// Entry point for the runtime.
pub struct Runtime;

impl Runtime {
    /// Opens one window and renders `app` into it until the window closes.
    ///
    /// Returns the error that ended the render loop, if any.
    pub fn run<A>(config: RuntimeConfig, app: A) -> Result<()>
    where
        A: SurfaceApp<WinitBinding>,
    {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        let mut state = AppState::new(config, app);

        event_loop
            .run_app(&mut state)
            .context("winit event loop terminated with error")?;

        match state.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

struct WindowEntry {
    window: Arc<Window>,
    host: Arc<WinitHost>,
    view: SurfaceView<WinitBinding>,
}

struct AppState<A> {
    config: RuntimeConfig,
    app: Option<A>,
    entry: Option<WindowEntry>,
    error: Option<anyhow::Error>,
}

impl<A> AppState<A>
where
    A: SurfaceApp<WinitBinding>,
{
    fn new(config: RuntimeConfig, app: A) -> Self {
        Self {
            config,
            app: Some(app),
            entry: None,
            error: None,
        }
    }

    fn create_window_entry(&mut self, event_loop: &ActiveEventLoop, app: A) -> Result<WindowEntry> {
        let attrs = Window::default_attributes()
            .with_title(self.config.title.clone())
            .with_inner_size(self.config.initial_size);

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let host = Arc::new(WinitHost::new(window.clone()));
        let binding = WgpuBinding::new(window.clone(), self.config.gpu.clone());
        let mut view = SurfaceView::new(binding, host.clone(), self.config.view.clone());

        let PhysicalSize { width, height } = window.inner_size();
        view.on_surface_created(width, height);
        view.start(app, self.config.updates_per_second)
            .context("failed to start render loop")?;

        Ok(WindowEntry { window, host, view })
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(mut entry) = self.entry.take() {
            entry.host.finish();
            if let Err(e) = entry.view.stop() {
                log::error!("render loop failed: {e}");
                self.error.get_or_insert(e.into());
            }
        }
        event_loop.exit();
    }
}

impl<A> ApplicationHandler for AppState<A>
where
    A: SurfaceApp<WinitBinding>,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(entry) = &self.entry {
            let PhysicalSize { width, height } = entry.window.inner_size();
            entry.view.on_surface_created(width, height);
            entry.view.on_resume();
            return;
        }

        let Some(app) = self.app.take() else {
            return;
        };
        match self.create_window_entry(event_loop, app) {
            Ok(entry) => self.entry = Some(entry),
            Err(e) => {
                log::error!("failed to create initial window: {e:#}");
                self.error = Some(e);
                event_loop.exit();
            }
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(entry) = &self.entry {
            entry.view.on_pause();
            entry.view.on_surface_destroyed();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.entry.as_ref().is_some_and(|e| !e.view.is_running()) {
            log::warn!("render loop exited; closing window");
            self.shutdown(event_loop);
            return;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(Instant::now() + HEALTH_CHECK));
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(entry) = self.entry.as_ref().filter(|e| e.window.id() == window_id) else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),

            WindowEvent::Resized(size) => {
                entry.view.on_surface_changed(0, size.width, size.height);
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let PhysicalSize { width, height } = entry.window.inner_size();
                entry.view.on_surface_changed(0, width, height);
            }

            WindowEvent::Focused(focused) => entry.host.set_focused(focused),

            WindowEvent::Occluded(true) => entry.view.on_pause(),
            WindowEvent::Occluded(false) => entry.view.on_resume(),

            _ => {}
        }
    }

    fn exiting(&mut self, event_loop: &ActiveEventLoop) {
        self.shutdown(event_loop);
    }
}
