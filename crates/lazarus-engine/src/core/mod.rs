//! Core engine-facing contracts.
//!
//! Defines the interface between the render loop and the application layer
//! (lifecycle notifications, frame callbacks, per-frame context) and the
//! outbound capability the loop needs from the windowing layer.

mod app;
mod ctx;
mod host;
mod reload;

pub use app::{FrameError, SurfaceApp};
pub use ctx::FrameCtx;
pub use host::{HeadlessHost, WindowHost};
pub use reload::ReloadJob;

pub(crate) use reload::ReloadTask;
