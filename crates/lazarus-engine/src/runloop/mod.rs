//! Render loop scheduling.
//!
//! Each iteration asks the surface tracker what to do, drives the context /
//! drawable lifecycle accordingly and, once a drawable exists, runs one
//! update + render pair followed by optional fixed-rate pacing.

mod config;
mod scheduler;

pub use config::{RenderHost, ViewConfig};

pub(crate) use scheduler::RenderLoop;
