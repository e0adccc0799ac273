use thiserror::Error;

use super::GpuErrorCode;

/// Errors raised while building or rebuilding GPU objects.
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    /// Every candidate on the configuration ladder was rejected.
    #[error("no valid GPU configuration found: {code}")]
    NoConfig { code: GpuErrorCode },

    #[error("could not create GPU context: {code}")]
    ContextCreation { code: GpuErrorCode },

    #[error("could not create window surface: {code}")]
    SurfaceCreation { code: GpuErrorCode },

    #[error("could not make context current: {code}")]
    MakeCurrent { code: GpuErrorCode },

    #[error("could not create off-screen surface: {code}")]
    OffscreenSurface { code: GpuErrorCode },

    #[error("no GPU context is available")]
    NoContext,
}

impl LifecycleError {
    /// Fatal errors end surface initialization. Everything else is retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NoConfig { .. } | Self::ContextCreation { .. })
    }
}
