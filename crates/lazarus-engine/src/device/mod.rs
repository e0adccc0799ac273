//! GPU context + drawable management.
//!
//! This module is responsible for:
//! - the capability interface over the platform binding (`GpuBinding`)
//! - negotiating a pixel-format configuration from a preference ladder
//! - creating, destroying and recovering the main context and its drawable
//! - auxiliary shared contexts for worker threads

mod background;
mod binding;
mod config;
mod error;
mod lifecycle;
pub mod wgpu_binding;

pub use background::BackgroundContext;
pub use binding::{GpuBinding, GpuErrorCode};
pub use config::{config_ladder, select_config, select_first, ConfigAttribs, DepthFormat};
pub use error::LifecycleError;
pub use lifecycle::ContextSurfaceLifecycle;
