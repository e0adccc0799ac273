//! Time subsystem.
//!
//! Frame timing for the render loop, decoupled from it so it can be driven
//! with synthetic timestamps in tests:
//! - `FrameClock`: per-callback delta time
//! - `FramePacer`: fixed-rate throttling
//! - `FrameRateSampler`: smoothed fps for diagnostics

mod fps;
mod frame_clock;
mod pacer;

pub use fps::FrameRateSampler;
pub use frame_clock::{FrameClock, FrameTime};
pub use pacer::FramePacer;
