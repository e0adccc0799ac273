use crate::device::{ContextSurfaceLifecycle, GpuBinding};
use crate::time::FrameTime;

/// Per-frame context passed to the update and render callbacks.
///
/// Borrows the lifecycle for the duration of one callback so the application
/// can reach the current context/drawable and present.
pub struct FrameCtx<'a, B: GpuBinding> {
    pub time: FrameTime,
    pub width: u32,
    pub height: u32,
    average_fps: f64,
    lifecycle: &'a mut ContextSurfaceLifecycle<B>,
}

impl<'a, B: GpuBinding> FrameCtx<'a, B> {
    pub(crate) fn new(
        time: FrameTime,
        (width, height): (u32, u32),
        average_fps: f64,
        lifecycle: &'a mut ContextSurfaceLifecycle<B>,
    ) -> Self {
        Self {
            time,
            width,
            height,
            average_fps,
            lifecycle,
        }
    }

    /// Seconds since the previous call of the same callback.
    #[inline]
    pub fn dt(&self) -> f32 {
        self.time.dt
    }

    /// `true` while resources are still being reloaded after a context loss.
    /// Draw a placeholder frame in the meantime.
    pub fn is_resuming(&self) -> bool {
        self.lifecycle.is_resuming()
    }

    pub fn average_fps(&self) -> f64 {
        self.average_fps
    }

    pub fn binding(&self) -> &B {
        self.lifecycle.binding()
    }

    pub fn context(&self) -> Option<&B::Context> {
        self.lifecycle.context()
    }

    /// Current context and drawable, for issuing GPU work.
    pub fn target(&mut self) -> Option<(&B::Context, &mut B::Surface)> {
        self.lifecycle.target()
    }

    /// Presents the drawable. Returns `false` if the swap failed, in which case
    /// the context is considered lost and gets rebuilt before the next frame.
    pub fn present(&mut self) -> bool {
        self.lifecycle.swap_buffers()
    }
}
