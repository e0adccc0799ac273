//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window and forwards window lifecycle events
//! to a [`SurfaceView`](crate::view::SurfaceView).

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, WinitBinding, WinitHost};
