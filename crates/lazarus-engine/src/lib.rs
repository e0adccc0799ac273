//! Lazarus engine crate.
//!
//! Keeps a GPU context and its drawable alive across a windowing layer that
//! creates, resizes and destroys native surfaces asynchronously, and rebuilds
//! both after a driver-level context loss.

pub mod core;
pub mod device;
pub mod runloop;
pub mod surface;
pub mod time;
pub mod view;
pub mod window;

pub mod logging;

#[cfg(test)]
mod testing;

pub use view::{SurfaceView, ViewError, ViewHandle};
