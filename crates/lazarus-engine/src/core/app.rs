use thiserror::Error;

use crate::device::GpuBinding;

use super::ctx::FrameCtx;
use super::reload::ReloadJob;

/// Failure returned from a frame callback.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Content was not ready yet. Ignored during update, logged during render.
    #[error("content load failed: {0:#}")]
    ContentLoad(anyhow::Error),

    /// Logged; the loop keeps running.
    #[error("frame failed: {0:#}")]
    Recoverable(anyhow::Error),

    /// Ends the render loop.
    #[error("fatal frame error: {0:#}")]
    Fatal(anyhow::Error),
}

impl From<anyhow::Error> for FrameError {
    fn from(e: anyhow::Error) -> Self {
        Self::Recoverable(e)
    }
}

/// Application contract driven by the render loop.
///
/// Every method runs on the render thread. Lifecycle notifications default to
/// no-ops; only the two frame callbacks are required.
pub trait SurfaceApp<B: GpuBinding>: Send + 'static {
    /// First successful context + drawable creation.
    fn on_load(&mut self) {}

    /// The drawable was torn down (pause, background, window destroyed).
    fn on_unload(&mut self) {}

    /// Drawable is gone and the context is about to be destroyed. Release
    /// GPU-owned resources here.
    fn on_context_losing(&mut self) {}

    /// The context was destroyed.
    fn on_context_lost(&mut self) {}

    /// A replacement context and drawable exist. `resuming` is `true` while the
    /// job from [`reload_job`](Self::reload_job) is still running.
    fn on_context_set(&mut self, resuming: bool) {
        let _ = resuming;
    }

    /// The reload job finished; GPU resources are back.
    fn on_device_reset(&mut self) {}

    /// Viewport/back-buffer dimensions changed.
    fn on_surface_changed(&mut self, width: u32, height: u32) {
        let _ = (width, height);
    }

    /// The loop exited and every GPU object is gone.
    fn on_stopped(&mut self) {}

    /// Work to run on a background context after a context loss.
    fn reload_job(&mut self) -> Option<ReloadJob<B>> {
        None
    }

    fn on_update_frame(&mut self, ctx: &mut FrameCtx<'_, B>) -> Result<(), FrameError>;

    fn on_render_frame(&mut self, ctx: &mut FrameCtx<'_, B>) -> Result<(), FrameError>;
}
