use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::Arc;

use super::{GpuBinding, LifecycleError};

struct Handles<B: GpuBinding> {
    context: B::Context,
    surface: B::Surface,
}

/// Auxiliary context for worker threads (e.g. asynchronous resource loading).
///
/// Shares objects with the main context and owns a small off-screen surface so
/// it can be made current on a thread that has no window. It can move between
/// threads but is not `Sync`: only one thread may use it at a time.
pub struct BackgroundContext<B: GpuBinding> {
    binding: Arc<B>,
    handles: Option<Handles<B>>,
    _not_sync: PhantomData<Cell<()>>,
}

impl<B: GpuBinding> BackgroundContext<B> {
    pub(crate) fn new(
        binding: Arc<B>,
        config: &B::Config,
        share: &B::Context,
        (width, height): (u32, u32),
    ) -> Result<Self, LifecycleError> {
        let context = binding
            .create_context(config, Some(share))
            .map_err(|code| LifecycleError::ContextCreation { code })?;

        let surface = match binding.create_offscreen_surface(&context, config, width, height) {
            Ok(surface) => surface,
            Err(code) => {
                if let Err(e) = binding.destroy_context(context) {
                    log::warn!("could not destroy background context: {e}");
                }
                return Err(LifecycleError::OffscreenSurface { code });
            }
        };

        log::debug!("created background context ({width}x{height} off-screen)");
        Ok(Self {
            binding,
            handles: Some(Handles { context, surface }),
            _not_sync: PhantomData,
        })
    }

    /// Binds this context on the calling thread, unbinding whatever was current.
    pub fn make_current(&mut self) -> Result<(), LifecycleError> {
        if let Err(e) = self.binding.clear_current() {
            log::debug!("could not clear current context: {e}");
        }
        let handles = self.handles.as_ref().ok_or(LifecycleError::NoContext)?;
        self.binding
            .make_current(&handles.context, &handles.surface, &handles.surface)
            .map_err(|code| LifecycleError::MakeCurrent { code })
    }

    pub fn binding(&self) -> &B {
        &self.binding
    }

    pub fn context(&self) -> Option<&B::Context> {
        self.handles.as_ref().map(|h| &h.context)
    }

    pub fn surface(&self) -> Option<&B::Surface> {
        self.handles.as_ref().map(|h| &h.surface)
    }
}

impl<B: GpuBinding> Drop for BackgroundContext<B> {
    fn drop(&mut self) {
        let Some(Handles { context, surface }) = self.handles.take() else {
            return;
        };
        if let Err(e) = self.binding.clear_current() {
            log::debug!("could not clear background context: {e}");
        }
        if let Err(e) = self.binding.destroy_surface(surface) {
            log::warn!("could not destroy background surface: {e}");
        }
        if let Err(e) = self.binding.destroy_context(context) {
            log::warn!("could not destroy background context: {e}");
        }
    }
}
