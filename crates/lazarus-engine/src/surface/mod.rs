//! Surface availability tracking.
//!
//! The tracker is the single synchronization point between the windowing
//! thread and the render thread: one lock, one condition variable, one
//! decision function over the whole state.

mod cancel;
mod state;
mod tracker;

pub use cancel::{CancelToken, CancellationHandle};
pub use state::{decide, RenderDecision, SurfaceState};
pub use tracker::SurfaceTracker;

pub(crate) use tracker::GpuFlags;
