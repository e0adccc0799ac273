use std::thread::ThreadId;

/// Shared surface/loop state. Only ever touched under the tracker lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurfaceState {
    /// The windowing layer has a drawable surface for us.
    pub surface_available: bool,
    pub paused: bool,
    pub width: u32,
    pub height: u32,

    /// The render loop finished its teardown.
    pub exited: bool,
    pub cancel_requested: bool,

    /// A GPU drawable exists on the render thread.
    pub gpu_surface_available: bool,
    /// The render thread is inside a window drawable creation call.
    pub gpu_surface_creating: bool,
    pub gpu_context_available: bool,
    /// The render thread detected context loss (failed swap).
    pub context_lost: bool,
    /// Context loss reported from outside the render thread.
    pub context_loss_reported: bool,

    /// A render loop is active.
    pub running: bool,
    pub render_thread: Option<ThreadId>,

    /// Bumped by every windowing notification that changes state.
    pub generation: u64,
    /// Generation at which drawable creation last failed.
    pub surface_failed_generation: Option<u64>,
    /// Dimensions from a surface change not yet delivered to the app.
    pub pending_resize: Option<(u32, u32)>,
}

/// What the render thread must do next.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RenderDecision {
    /// Cancelled, or the host is going away. Exit the loop.
    Stopped,
    /// Destroy the drawable (paused or window surface gone).
    NeedTeardown,
    /// Context is healthy, only the drawable is missing.
    NeedCreateSurface,
    /// No usable context: (re)create context and drawable.
    NeedCreateContext,
    /// A drawable exists and rendering may proceed.
    Ready,
    /// Nothing to do until the state changes.
    BlockAndRetry,
}

impl SurfaceState {
    fn context_lost_any(&self) -> bool {
        self.context_lost || (self.context_loss_reported && self.gpu_context_available)
    }
}

/// Evaluates the whole state and picks the next step.
///
/// Never works from a cached partial view: callers re-run this after every
/// wakeup and after every GPU call.
pub fn decide(state: &SurfaceState) -> RenderDecision {
    if state.cancel_requested {
        return RenderDecision::Stopped;
    }

    if state.gpu_surface_available && (state.paused || !state.surface_available) {
        return RenderDecision::NeedTeardown;
    }

    let renderable = state.surface_available && !state.paused;
    let lost = state.context_lost_any();

    if renderable && (lost || !state.gpu_surface_available) {
        if lost {
            return RenderDecision::NeedCreateContext;
        }
        if state.surface_failed_generation == Some(state.generation) {
            return RenderDecision::BlockAndRetry;
        }
        return if state.gpu_context_available {
            RenderDecision::NeedCreateSurface
        } else {
            RenderDecision::NeedCreateContext
        };
    }

    if state.gpu_surface_available {
        RenderDecision::Ready
    } else {
        RenderDecision::BlockAndRetry
    }
}
