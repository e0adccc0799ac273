use std::fmt;

use super::ConfigAttribs;

/// Error code reported by the platform GPU binding.
///
/// Mirrors the usual display/context error enumeration exposed by native
/// bindings. `ContextLost` is reported when the driver invalidated the context.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum GpuErrorCode {
    #[default]
    Success,
    NotInitialized,
    BadAccess,
    BadAlloc,
    BadAttribute,
    BadConfig,
    BadContext,
    BadCurrentSurface,
    BadDisplay,
    BadMatch,
    BadNativePixmap,
    BadNativeWindow,
    BadParameter,
    BadSurface,
    ContextLost,
    Unknown,
}

impl GpuErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::NotInitialized => "Not Initialized",
            Self::BadAccess => "Bad Access",
            Self::BadAlloc => "Bad Allocation",
            Self::BadAttribute => "Bad Attribute",
            Self::BadConfig => "Bad Config",
            Self::BadContext => "Bad Context",
            Self::BadCurrentSurface => "Bad Current Surface",
            Self::BadDisplay => "Bad Display",
            Self::BadMatch => "Bad Match",
            Self::BadNativePixmap => "Bad Native Pixmap",
            Self::BadNativeWindow => "Bad Native Window",
            Self::BadParameter => "Bad Parameter",
            Self::BadSurface => "Bad Surface",
            Self::ContextLost => "Context Lost",
            Self::Unknown => "Unknown Error",
        }
    }
}

impl fmt::Display for GpuErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability interface over the platform GPU binding.
///
/// The lifecycle only ever talks to the GPU through this trait. Handles are
/// owned values: `destroy_*` consumes them, so a destroyed handle cannot be
/// passed to `make_current`/`swap_buffers` afterwards.
///
/// Implementations are shared between the render thread and the reload worker,
/// hence `Send + Sync`. A context must never be current on two threads at once;
/// callers uphold that.
pub trait GpuBinding: Send + Sync + 'static {
    /// Negotiated pixel-format configuration.
    type Config: Clone + fmt::Debug + Send + Sync + 'static;

    /// GPU context handle.
    type Context: Send + 'static;

    /// Drawable handle (window-backed or off-screen).
    type Surface: Send + 'static;

    /// Returns a configuration matching `attribs`, or `None` if the platform
    /// rejects it.
    fn choose_config(&self, attribs: &ConfigAttribs) -> Option<Self::Config>;

    /// Creates a context bound to `config`, optionally sharing objects with
    /// `share`.
    fn create_context(
        &self,
        config: &Self::Config,
        share: Option<&Self::Context>,
    ) -> Result<Self::Context, GpuErrorCode>;

    /// Creates the on-screen drawable for the window owned by the binding.
    ///
    /// `width`/`height` are the last dimensions reported by the windowing layer;
    /// bindings whose window surfaces size themselves may ignore them.
    fn create_window_surface(
        &self,
        context: &Self::Context,
        config: &Self::Config,
        width: u32,
        height: u32,
    ) -> Result<Self::Surface, GpuErrorCode>;

    /// Creates an off-screen drawable of a fixed size.
    fn create_offscreen_surface(
        &self,
        context: &Self::Context,
        config: &Self::Config,
        width: u32,
        height: u32,
    ) -> Result<Self::Surface, GpuErrorCode>;

    /// Binds `context` with the given draw/read surfaces on the calling thread.
    fn make_current(
        &self,
        context: &Self::Context,
        draw: &Self::Surface,
        read: &Self::Surface,
    ) -> Result<(), GpuErrorCode>;

    /// Unbinds whatever is current on the calling thread.
    fn clear_current(&self) -> Result<(), GpuErrorCode>;

    /// Presents the back buffer. A failure is treated as context loss.
    fn swap_buffers(
        &self,
        context: &Self::Context,
        surface: &mut Self::Surface,
    ) -> Result<(), GpuErrorCode>;

    /// Applies new window dimensions to an existing drawable.
    fn resize_surface(
        &self,
        context: &Self::Context,
        surface: &mut Self::Surface,
        width: u32,
        height: u32,
    ) -> Result<(), GpuErrorCode> {
        let _ = (context, surface, width, height);
        Ok(())
    }

    fn destroy_surface(&self, surface: Self::Surface) -> Result<(), GpuErrorCode>;

    fn destroy_context(&self, context: Self::Context) -> Result<(), GpuErrorCode>;

    /// Error recorded by the most recent failed call.
    fn last_error(&self) -> GpuErrorCode;
}
