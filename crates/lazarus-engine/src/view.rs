use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;

use crate::core::{SurfaceApp, WindowHost};
use crate::device::{GpuBinding, LifecycleError};
use crate::runloop::{RenderHost, RenderLoop, ViewConfig};
use crate::surface::{CancellationHandle, SurfaceTracker};
use crate::time::FramePacer;

/// Errors reported by [`SurfaceView`].
#[derive(Debug, Error)]
pub enum ViewError {
    #[error("render loop is already running")]
    AlreadyRunning,

    #[error("could not spawn render thread: {0}")]
    Spawn(#[source] io::Error),

    /// Context or configuration negotiation failed.
    #[error(transparent)]
    Loop(#[from] LifecycleError),

    /// A frame callback returned [`FrameError::Fatal`](crate::core::FrameError::Fatal).
    #[error("frame callback failed: {0:#}")]
    Frame(anyhow::Error),

    #[error("render loop panicked: {0}")]
    Panicked(String),
}

/// Cloneable handle for the windowing side of a view.
///
/// Useful when the loop runs on the calling thread ([`RenderHost::CurrentThread`])
/// and windowing callbacks arrive elsewhere.
#[derive(Debug, Clone)]
pub struct ViewHandle {
    tracker: Arc<SurfaceTracker>,
}

impl ViewHandle {
    pub fn on_surface_created(&self, width: u32, height: u32) {
        self.tracker.notify_surface_created(width, height);
    }

    pub fn on_surface_changed(&self, format: u32, width: u32, height: u32) {
        log::trace!("surface format {format}");
        self.tracker.notify_surface_changed(width, height);
    }

    /// Returns once the render thread has released its drawable.
    pub fn on_surface_destroyed(&self) {
        self.tracker.notify_surface_destroyed();
    }

    pub fn on_pause(&self) {
        self.tracker.request_pause();
    }

    pub fn on_resume(&self) {
        self.tracker.request_resume();
    }

    /// The driver reported a reset; the context is rebuilt before the next frame.
    pub fn notify_context_lost(&self) {
        self.tracker.report_context_lost();
    }

    /// Asks the loop to exit without waiting for it.
    pub fn request_stop(&self) {
        self.tracker.request_stop();
    }

    pub fn is_running(&self) -> bool {
        self.tracker.is_running()
    }

    pub fn size(&self) -> (u32, u32) {
        self.tracker.size()
    }
}

struct RunningLoop {
    cancel: CancellationHandle,
    join: JoinHandle<Result<(), ViewError>>,
}

/// Hosts one GPU drawable and the render loop that feeds it.
///
/// The windowing layer forwards its surface callbacks here; the render thread
/// reacts to them. Dropping the view stops the loop.
pub struct SurfaceView<B: GpuBinding> {
    binding: Arc<B>,
    tracker: Arc<SurfaceTracker>,
    config: ViewConfig,
    running: Option<RunningLoop>,
}

impl<B: GpuBinding> SurfaceView<B> {
    pub fn new(binding: B, host: Arc<dyn WindowHost>, config: ViewConfig) -> Self {
        Self::with_binding(Arc::new(binding), host, config)
    }

    pub fn with_binding(binding: Arc<B>, host: Arc<dyn WindowHost>, config: ViewConfig) -> Self {
        Self {
            binding,
            tracker: Arc::new(SurfaceTracker::new(host)),
            config,
            running: None,
        }
    }

    pub fn handle(&self) -> ViewHandle {
        ViewHandle {
            tracker: self.tracker.clone(),
        }
    }

    pub fn binding(&self) -> &Arc<B> {
        &self.binding
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn tracker(&self) -> &Arc<SurfaceTracker> {
        &self.tracker
    }

    // ── windowing callbacks ───────────────────────────────────────────────

    pub fn on_surface_created(&self, width: u32, height: u32) {
        self.tracker.notify_surface_created(width, height);
    }

    pub fn on_surface_changed(&self, format: u32, width: u32, height: u32) {
        log::trace!("surface format {format}");
        self.tracker.notify_surface_changed(width, height);
    }

    /// Blocks until the render thread has released its drawable.
    pub fn on_surface_destroyed(&self) {
        self.tracker.notify_surface_destroyed();
    }

    pub fn on_pause(&self) {
        self.tracker.request_pause();
    }

    pub fn on_resume(&self) {
        self.tracker.request_resume();
    }

    pub fn notify_context_lost(&self) {
        self.tracker.report_context_lost();
    }

    pub fn is_running(&self) -> bool {
        self.tracker.is_running()
    }

    pub fn size(&self) -> (u32, u32) {
        self.tracker.size()
    }

    // ── loop control ──────────────────────────────────────────────────────

    /// Starts the render loop, throttled to `updates_per_second` if given.
    ///
    /// With [`RenderHost::CurrentThread`] this blocks until the loop exits and
    /// returns its result.
    pub fn start<A>(&mut self, app: A, updates_per_second: Option<f64>) -> Result<(), ViewError>
    where
        A: SurfaceApp<B>,
    {
        if let Some(previous) = self.running.take() {
            if !previous.join.is_finished() {
                self.running = Some(previous);
                return Err(ViewError::AlreadyRunning);
            }
            if let Err(e) = Self::join(previous) {
                log::warn!("previous render loop ended with error: {e}");
            }
        }

        let pacer = FramePacer::from_rate(updates_per_second);
        if !self.tracker.begin_run() {
            return Err(ViewError::AlreadyRunning);
        }

        let cancel = CancellationHandle::new(self.tracker.clone());
        let render_loop = RenderLoop::new(
            self.tracker.clone(),
            cancel.clone(),
            self.binding.clone(),
            &self.config,
            app,
            pacer,
        );

        match self.config.render_host {
            RenderHost::CurrentThread => render_loop.run(),
            RenderHost::DedicatedThread => {
                let spawned = thread::Builder::new()
                    .name(self.config.thread_name.clone())
                    .spawn(move || render_loop.run());
                match spawned {
                    Ok(join) => {
                        self.running = Some(RunningLoop { cancel, join });
                        Ok(())
                    }
                    Err(e) => {
                        self.tracker.mark_exited();
                        Err(ViewError::Spawn(e))
                    }
                }
            }
        }
    }

    /// Cancels the loop and waits for it to release every GPU object.
    ///
    /// Returns the error that ended the loop, if any. Calling it again, or
    /// when nothing runs, is a no-op.
    pub fn stop(&mut self) -> Result<(), ViewError> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        running.cancel.cancel();
        if self.tracker.snapshot().render_thread == Some(thread::current().id()) {
            log::warn!("stop called from the render thread; cancelling only");
            self.running = Some(running);
            return Ok(());
        }

        self.tracker.wait_for_exit(self.config.stop_poll_interval);
        Self::join(running)
    }

    fn join(running: RunningLoop) -> Result<(), ViewError> {
        match running.join.join() {
            Ok(result) => result,
            Err(_) => Err(ViewError::Panicked("render thread panicked".to_string())),
        }
    }
}

impl<B: GpuBinding> Drop for SurfaceView<B> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("render loop ended with error: {e}");
        }
    }
}
