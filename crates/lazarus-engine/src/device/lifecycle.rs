use std::sync::Arc;

use crate::core::{ReloadTask, SurfaceApp};
use crate::surface::{GpuFlags, SurfaceTracker};

use super::background::BackgroundContext;
use super::config::{select_config, DepthFormat};
use super::{GpuBinding, LifecycleError};

/// Restoration step still owed to the application after a context was
/// replaced but its drawable could not be created yet.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct PendingRestore {
    /// The previous context was lost, not just replaced.
    lost: bool,
}

/// Owns the GPU context and drawable of one view.
///
/// Only the render thread touches this. Every create/destroy is followed by a
/// publish to the [`SurfaceTracker`], so the windowing thread always sees the
/// flags of the last completed GPU call.
pub struct ContextSurfaceLifecycle<B: GpuBinding> {
    binding: Arc<B>,
    tracker: Arc<SurfaceTracker>,
    depth_format: DepthFormat,
    background_size: (u32, u32),

    config: Option<B::Config>,
    context: Option<B::Context>,
    drawable: Option<B::Surface>,
    context_lost: bool,
    loaded_once: bool,

    pending: Option<PendingRestore>,
    reload: Option<ReloadTask>,
}

impl<B: GpuBinding> ContextSurfaceLifecycle<B> {
    pub(crate) fn new(
        binding: Arc<B>,
        tracker: Arc<SurfaceTracker>,
        depth_format: DepthFormat,
        background_size: (u32, u32),
    ) -> Self {
        Self {
            binding,
            tracker,
            depth_format,
            background_size,
            config: None,
            context: None,
            drawable: None,
            context_lost: false,
            loaded_once: false,
            pending: None,
            reload: None,
        }
    }

    pub fn binding(&self) -> &B {
        &self.binding
    }

    pub fn config(&self) -> Option<&B::Config> {
        self.config.as_ref()
    }

    pub fn context(&self) -> Option<&B::Context> {
        self.context.as_ref()
    }

    pub fn has_context(&self) -> bool {
        self.context.is_some()
    }

    pub fn has_drawable(&self) -> bool {
        self.drawable.is_some()
    }

    pub fn is_context_lost(&self) -> bool {
        self.context_lost
    }

    /// A reload job is in flight; the app should draw a placeholder.
    pub fn is_resuming(&self) -> bool {
        self.reload.is_some()
    }

    /// Context and drawable together, when both exist.
    pub fn target(&mut self) -> Option<(&B::Context, &mut B::Surface)> {
        match (self.context.as_ref(), self.drawable.as_mut()) {
            (Some(context), Some(drawable)) => Some((context, drawable)),
            _ => None,
        }
    }

    fn flags(&self) -> GpuFlags {
        GpuFlags {
            surface: self.drawable.is_some(),
            context: self.context.is_some(),
            context_lost: self.context_lost,
        }
    }

    fn publish(&self) {
        self.tracker.publish_gpu(self.flags());
    }

    // ── primitives ────────────────────────────────────────────────────────

    /// Negotiates a configuration (once) and creates the main context.
    pub(crate) fn create_context(&mut self) -> Result<(), LifecycleError> {
        let config = match self.config.clone() {
            Some(config) => config,
            None => {
                let (config, attribs) = select_config(self.binding.as_ref(), self.depth_format)?;
                log::info!("created format {attribs}");
                self.config = Some(config.clone());
                config
            }
        };

        let context = self.binding.create_context(&config, None).map_err(|code| {
            log::error!("context creation failed: {code}");
            LifecycleError::ContextCreation { code }
        })?;

        self.context = Some(context);
        self.context_lost = false;
        self.tracker.publish_new_context(self.flags());
        log::debug!("context created");
        Ok(())
    }

    /// Creates the window drawable and binds it. Returns `false` on failure;
    /// the failure is recorded against the current generation so the loop
    /// waits for the windowing state to move before retrying.
    pub(crate) fn create_surface(&mut self) -> bool {
        self.destroy_surface();

        let (Some(context), Some(config)) = (self.context.as_ref(), self.config.as_ref()) else {
            log::error!("cannot create a drawable: {}", LifecycleError::NoContext);
            self.tracker.record_surface_failure();
            return false;
        };

        if let Err(e) = self.binding.clear_current() {
            log::debug!("could not clear current context: {e}");
        }

        if !self.tracker.begin_surface_creation() {
            log::debug!("window surface went away; skipping drawable creation");
            return false;
        }

        let (width, height) = self.tracker.size();
        let result = self
            .binding
            .create_window_surface(context, config, width, height)
            .map_err(|code| LifecycleError::SurfaceCreation { code })
            .and_then(|surface| match self.binding.make_current(context, &surface, &surface) {
                Ok(()) => Ok(surface),
                Err(code) => {
                    if let Err(e) = self.binding.destroy_surface(surface) {
                        log::warn!("could not destroy unusable drawable: {e}");
                    }
                    Err(LifecycleError::MakeCurrent { code })
                }
            });

        match result {
            Ok(surface) => {
                self.drawable = Some(surface);
                self.publish();
                log::debug!("drawable created ({width}x{height})");
                true
            }
            Err(e) => {
                log::error!("{e}");
                self.publish();
                self.tracker.record_surface_failure();
                false
            }
        }
    }

    /// Destroys the drawable, if any. The context survives.
    pub(crate) fn destroy_surface(&mut self) {
        let Some(surface) = self.drawable.take() else {
            return;
        };
        if let Err(e) = self.binding.clear_current() {
            log::debug!("could not clear current context: {e}");
        }
        if let Err(e) = self.binding.destroy_surface(surface) {
            log::warn!("could not destroy drawable: {e}");
        }
        self.publish();
        log::debug!("drawable destroyed");
    }

    /// Destroys the context and, first, everything that depends on it.
    pub(crate) fn destroy_context(&mut self) {
        self.finish_reload(true);
        self.destroy_surface();
        let Some(context) = self.context.take() else {
            return;
        };
        if let Err(e) = self.binding.destroy_context(context) {
            log::warn!("could not destroy context: {e}");
        }
        self.publish();
        log::debug!("context destroyed");
    }

    /// Applies new window dimensions to the live drawable.
    pub(crate) fn resize(&mut self, width: u32, height: u32) {
        let (Some(context), Some(drawable)) = (self.context.as_ref(), self.drawable.as_mut()) else {
            return;
        };
        if let Err(code) = self.binding.resize_surface(context, drawable, width, height) {
            log::warn!("could not resize drawable to {width}x{height}: {code}");
        }
    }

    /// Presents the drawable. A failed swap marks the context lost.
    pub(crate) fn swap_buffers(&mut self) -> bool {
        let (Some(context), Some(drawable)) = (self.context.as_ref(), self.drawable.as_mut()) else {
            return false;
        };
        match self.binding.swap_buffers(context, drawable) {
            Ok(()) => true,
            Err(code) => {
                log::error!("swap failed ({code}); context lost");
                self.context_lost = true;
                self.publish();
                false
            }
        }
    }

    /// Shared context + off-screen surface for a worker thread.
    pub fn create_background_context(&self) -> Result<BackgroundContext<B>, LifecycleError> {
        let (Some(config), Some(context)) = (self.config.as_ref(), self.context.as_ref()) else {
            return Err(LifecycleError::NoContext);
        };
        BackgroundContext::new(self.binding.clone(), config, context, self.background_size)
    }

    // ── transitions ───────────────────────────────────────────────────────

    /// Pause, background or window loss: drop the drawable, keep the context.
    pub(crate) fn teardown_surface<A: SurfaceApp<B>>(&mut self, app: &mut A) {
        self.destroy_surface();
        if self.loaded_once {
            app.on_unload();
        }
    }

    /// Recreates the drawable on the surviving context.
    pub(crate) fn restore_surface<A: SurfaceApp<B>>(&mut self, app: &mut A) {
        if self.create_surface() {
            self.surface_ready(app);
        }
    }

    /// (Re)builds the context and its drawable.
    ///
    /// An existing context is torn down first: any reload is cancelled and
    /// joined, then the drawable goes, then `on_context_losing`, the context
    /// itself and `on_context_lost`.
    pub(crate) fn recover<A: SurfaceApp<B>>(&mut self, app: &mut A) -> Result<(), LifecycleError> {
        let reported = self.tracker.take_context_loss_report();
        let lost = self.context_lost || reported;
        if lost {
            log::info!("recovering from context loss");
        }

        let replaced = self.context.is_some();
        if replaced {
            self.finish_reload(true);
            self.destroy_surface();
            app.on_context_losing();
            self.destroy_context();
            app.on_context_lost();
        }

        self.create_context()?;
        if replaced {
            self.pending = Some(PendingRestore { lost });
        }

        if self.create_surface() {
            self.surface_ready(app);
        }
        Ok(())
    }

    /// Fires the notifications owed once a drawable exists.
    fn surface_ready<A: SurfaceApp<B>>(&mut self, app: &mut A) {
        if !self.loaded_once {
            self.loaded_once = true;
            app.on_load();
        }

        let Some(PendingRestore { lost }) = self.pending.take() else {
            return;
        };
        if lost {
            self.start_reload(app);
        }
        app.on_context_set(self.is_resuming());
    }

    fn start_reload<A: SurfaceApp<B>>(&mut self, app: &mut A) {
        let Some(job) = app.reload_job() else {
            return;
        };
        let background = match self.create_background_context() {
            Ok(background) => background,
            Err(e) => {
                log::warn!("skipping content reload: {e}");
                return;
            }
        };
        match ReloadTask::spawn(background, job) {
            Ok(task) => self.reload = Some(task),
            Err(e) => log::warn!("could not spawn reload worker: {e}"),
        }
    }

    /// Joins a finished reload job and tells the app its resources are back.
    pub(crate) fn poll_reload<A: SurfaceApp<B>>(&mut self, app: &mut A) {
        if !self.reload.as_ref().is_some_and(ReloadTask::is_finished) {
            return;
        }
        self.finish_reload(false);
        app.on_device_reset();
    }

    fn finish_reload(&mut self, cancel: bool) {
        let Some(task) = self.reload.take() else {
            return;
        };
        let result = if cancel { task.cancel_and_join() } else { task.join() };
        if let Err(e) = result {
            log::error!("content reload failed: {e:#}");
        }
    }

    /// Releases every GPU object on loop exit.
    pub(crate) fn shutdown<A: SurfaceApp<B>>(&mut self, app: &mut A) {
        self.finish_reload(true);
        self.destroy_surface();
        if self.context.is_some() {
            self.destroy_context();
            app.on_context_lost();
        }
        self.context_lost = false;
        self.pending = None;
        self.publish();
    }
}
