use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::{FrameCtx, FrameError, SurfaceApp};
use crate::device::{ContextSurfaceLifecycle, GpuBinding};
use crate::surface::{CancellationHandle, RenderDecision, SurfaceTracker};
use crate::time::{FrameClock, FramePacer, FrameRateSampler};
use crate::view::ViewError;

use super::ViewConfig;

/// Marks the loop exited however the render thread leaves, so neither `stop`
/// nor a destroy rendezvous can wait forever.
struct ExitGuard(Arc<SurfaceTracker>);

impl Drop for ExitGuard {
    fn drop(&mut self) {
        self.0.mark_exited();
        log::debug!("render loop exited");
    }
}

/// One run of the render loop. Owns everything the render thread touches.
pub(crate) struct RenderLoop<B: GpuBinding, A: SurfaceApp<B>> {
    tracker: Arc<SurfaceTracker>,
    cancel: CancellationHandle,
    lifecycle: ContextSurfaceLifecycle<B>,
    app: A,

    pacer: FramePacer,
    update_clock: FrameClock,
    render_clock: FrameClock,
    fps: FrameRateSampler,
    log_fps: bool,
}

impl<B: GpuBinding, A: SurfaceApp<B>> RenderLoop<B, A> {
    pub(crate) fn new(
        tracker: Arc<SurfaceTracker>,
        cancel: CancellationHandle,
        binding: Arc<B>,
        config: &ViewConfig,
        app: A,
        pacer: FramePacer,
    ) -> Self {
        let lifecycle = ContextSurfaceLifecycle::new(
            binding,
            tracker.clone(),
            config.depth_format,
            config.background_surface_size,
        );
        Self {
            tracker,
            cancel,
            lifecycle,
            app,
            pacer,
            update_clock: FrameClock::with_clamps(Duration::ZERO, config.max_frame_delta),
            render_clock: FrameClock::with_clamps(Duration::ZERO, config.max_frame_delta),
            fps: FrameRateSampler::new(pacer.target_rate().unwrap_or(1.0)),
            log_fps: config.log_fps,
        }
    }

    /// Runs until cancelled or a loop-fatal error, then releases every GPU
    /// object and fires `on_stopped`.
    pub(crate) fn run(mut self) -> Result<(), ViewError> {
        let _exit = ExitGuard(self.tracker.clone());
        self.tracker.enter_render_thread();
        log::debug!("render loop started");

        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run_loop()))
            .unwrap_or_else(|payload| Err(ViewError::Panicked(panic_message(payload.as_ref()))));
        if let Err(e) = &result {
            log::error!("render loop failed: {e}");
        }

        let teardown = panic::catch_unwind(AssertUnwindSafe(|| {
            self.lifecycle.shutdown(&mut self.app);
            self.app.on_stopped();
        }));
        if let Err(payload) = teardown {
            log::error!("render loop teardown panicked: {}", panic_message(payload.as_ref()));
        }

        result
    }

    fn run_loop(&mut self) -> Result<(), ViewError> {
        self.update_clock.reset();
        self.render_clock.reset();

        loop {
            if let Some((width, height)) = self.tracker.take_pending_resize() {
                self.lifecycle.resize(width, height);
                self.app.on_surface_changed(width, height);
            }
            self.lifecycle.poll_reload(&mut self.app);

            match self.tracker.wait_until_renderable(&self.cancel) {
                RenderDecision::Stopped => return Ok(()),
                RenderDecision::NeedTeardown => self.lifecycle.teardown_surface(&mut self.app),
                RenderDecision::NeedCreateSurface => self.lifecycle.restore_surface(&mut self.app),
                RenderDecision::NeedCreateContext => self.lifecycle.recover(&mut self.app)?,
                RenderDecision::Ready => self.run_iteration()?,
                RenderDecision::BlockAndRetry => {}
            }
        }
    }

    fn run_iteration(&mut self) -> Result<(), ViewError> {
        let started = Instant::now();
        let size = self.tracker.size();

        let time = self.update_clock.tick();
        let mut ctx = FrameCtx::new(time, size, self.fps.average(), &mut self.lifecycle);
        match self.app.on_update_frame(&mut ctx) {
            Ok(()) | Err(FrameError::ContentLoad(_)) => {}
            Err(FrameError::Recoverable(e)) => log::error!("update failed: {e:#}"),
            Err(FrameError::Fatal(e)) => return Err(ViewError::Frame(e)),
        }

        if self.cancel.is_cancelled() {
            return Ok(());
        }

        if let Some(average) = self.fps.mark() {
            if self.log_fps {
                log::info!("{average:.2} fps");
            }
        }

        let time = self.render_clock.tick();
        let mut ctx = FrameCtx::new(time, size, self.fps.average(), &mut self.lifecycle);
        match self.app.on_render_frame(&mut ctx) {
            Ok(()) => {}
            Err(FrameError::ContentLoad(e)) => log::warn!("render skipped content: {e:#}"),
            Err(FrameError::Recoverable(e)) => log::error!("render failed: {e:#}"),
            Err(FrameError::Fatal(e)) => return Err(ViewError::Frame(e)),
        }

        self.pace(started);
        Ok(())
    }

    /// Waits out the rest of the nominal interval. Wakes early on cancellation
    /// or when the surface needs attention.
    fn pace(&self, started: Instant) {
        let Some(wait) = self.pacer.shortfall(started, Instant::now()) else {
            return;
        };
        if self.log_fps {
            if let Some(interval) = self.pacer.interval() {
                log::trace!(
                    "took {:.2}ms, should take {:.2}ms, sleeping for {:.2}ms",
                    started.elapsed().as_secs_f64() * 1000.0,
                    interval.as_secs_f64() * 1000.0,
                    wait.as_secs_f64() * 1000.0,
                );
            }
        }
        self.tracker.pace_wait(wait, &self.cancel);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
