use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::core::WindowHost;

use super::state::{decide, RenderDecision, SurfaceState};
use super::CancellationHandle;

/// GPU availability as published by the render thread.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub(crate) struct GpuFlags {
    pub surface: bool,
    pub context: bool,
    pub context_lost: bool,
}

/// Monitor guarding [`SurfaceState`].
///
/// Windowing callbacks mutate it from the UI thread; the render thread asks it
/// what to do next. Every transition wakes all waiters. GPU calls never run
/// while the lock is held; the render thread publishes its flags right after
/// each call instead.
pub struct SurfaceTracker {
    state: Mutex<SurfaceState>,
    changed: Condvar,
    host: Arc<dyn WindowHost>,
}

impl fmt::Debug for SurfaceTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SurfaceTracker")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl SurfaceTracker {
    pub fn new(host: Arc<dyn WindowHost>) -> Self {
        Self {
            state: Mutex::new(SurfaceState::default()),
            changed: Condvar::new(),
            host,
        }
    }

    pub fn host(&self) -> &Arc<dyn WindowHost> {
        &self.host
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> SurfaceState {
        self.state.lock().clone()
    }

    /// Last dimensions reported by the windowing layer.
    pub fn size(&self) -> (u32, u32) {
        let state = self.state.lock();
        (state.width, state.height)
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    // ── windowing side ────────────────────────────────────────────────────

    /// The window surface exists. Repeated calls with the same size are no-ops.
    pub fn notify_surface_created(&self, width: u32, height: u32) {
        let mut state = self.state.lock();
        log::trace!("surface created ({width}x{height})");

        let resized = state.width != width || state.height != height;
        let changed = !state.surface_available || resized;
        if state.surface_available && resized {
            state.pending_resize = Some((width, height));
        }
        state.surface_available = true;
        state.width = width;
        state.height = height;
        if changed {
            state.generation += 1;
        }
        self.changed.notify_all();
    }

    /// The window surface was resized or reformatted. Availability is unchanged.
    pub fn notify_surface_changed(&self, width: u32, height: u32) {
        let mut state = self.state.lock();
        log::trace!("surface changed ({width}x{height})");

        state.width = width;
        state.height = height;
        state.pending_resize = Some((width, height));
        state.generation += 1;
        self.changed.notify_all();
    }

    /// The window surface is going away.
    ///
    /// Blocks until the render thread has destroyed its drawable so the
    /// windowing layer never recycles memory the GPU still references.
    pub fn notify_surface_destroyed(&self) {
        let mut state = self.state.lock();
        log::trace!("surface destroyed");

        if state.surface_available {
            state.surface_available = false;
            state.generation += 1;
        }
        self.changed.notify_all();

        if state.render_thread == Some(thread::current().id()) {
            log::warn!("surface destroyed from the render thread; skipping teardown rendezvous");
            return;
        }

        while state.gpu_surface_available || state.gpu_surface_creating {
            self.changed.wait(&mut state);
        }
        log::trace!("surface destroy rendezvous complete");
    }

    pub fn request_pause(&self) {
        let mut state = self.state.lock();
        state.paused = true;
        self.changed.notify_all();
    }

    /// Unpauses and asks the host for input focus.
    pub fn request_resume(&self) {
        {
            let mut state = self.state.lock();
            if state.paused {
                state.paused = false;
                state.generation += 1;
                self.changed.notify_all();
            }
        }

        if !self.host.is_focused() {
            if let Err(e) = self.host.request_focus() {
                log::debug!("focus request failed: {e:#}");
            }
        }
    }

    /// Context loss observed outside the render thread (e.g. a driver reset
    /// notification). Ignored while no context exists.
    pub fn report_context_lost(&self) {
        let mut state = self.state.lock();
        if state.gpu_context_available {
            state.context_loss_reported = true;
            self.changed.notify_all();
        }
    }

    // ── render side ───────────────────────────────────────────────────────

    /// Blocks until there is something for the render thread to do.
    ///
    /// Never returns [`RenderDecision::BlockAndRetry`]; that case waits on the
    /// condition and re-evaluates the whole state.
    pub fn wait_until_renderable(&self, cancel: &CancellationHandle) -> RenderDecision {
        let mut state = self.state.lock();
        loop {
            if cancel.is_cancelled() {
                return RenderDecision::Stopped;
            }

            match decide(&state) {
                RenderDecision::BlockAndRetry => {
                    if self.host.is_finishing() {
                        log::debug!("host is finishing; leaving render loop");
                        return RenderDecision::Stopped;
                    }
                    log::trace!("entering wait state");
                    self.changed.wait(&mut state);
                    log::trace!("exiting wait state");
                }
                decision => return decision,
            }
        }
    }

    /// Resets the per-run flags. Returns `false` if a loop is already active.
    pub(crate) fn begin_run(&self) -> bool {
        let mut state = self.state.lock();
        if state.running {
            return false;
        }
        state.running = true;
        state.exited = false;
        state.cancel_requested = false;
        true
    }

    pub(crate) fn enter_render_thread(&self) {
        self.state.lock().render_thread = Some(thread::current().id());
    }

    pub(crate) fn request_stop(&self) {
        let mut state = self.state.lock();
        state.cancel_requested = true;
        self.changed.notify_all();
    }

    pub(crate) fn publish_gpu(&self, flags: GpuFlags) {
        let mut state = self.state.lock();
        Self::apply_gpu(&mut state, flags);
        self.changed.notify_all();
    }

    /// Publishes a newly installed context. Loss reports filed against the
    /// context it replaced are dropped in the same step.
    pub(crate) fn publish_new_context(&self, flags: GpuFlags) {
        let mut state = self.state.lock();
        state.context_loss_reported = false;
        Self::apply_gpu(&mut state, flags);
        self.changed.notify_all();
    }

    fn apply_gpu(state: &mut SurfaceState, flags: GpuFlags) {
        state.gpu_surface_available = flags.surface;
        state.gpu_context_available = flags.context;
        state.context_lost = flags.context_lost;
        state.gpu_surface_creating = false;
        if flags.surface {
            state.surface_failed_generation = None;
        }
    }

    /// Claims the window surface for a drawable creation call. Returns `false`
    /// if the window is already gone; otherwise a destroy rendezvous waits
    /// until the outcome is published.
    pub(crate) fn begin_surface_creation(&self) -> bool {
        let mut state = self.state.lock();
        if !state.surface_available {
            return false;
        }
        state.gpu_surface_creating = true;
        true
    }

    /// Drawable creation failed; don't retry until the windowing state moves.
    pub(crate) fn record_surface_failure(&self) {
        let mut state = self.state.lock();
        state.surface_failed_generation = Some(state.generation);
        self.changed.notify_all();
    }

    pub(crate) fn take_pending_resize(&self) -> Option<(u32, u32)> {
        self.state.lock().pending_resize.take()
    }

    pub(crate) fn take_context_loss_report(&self) -> bool {
        std::mem::take(&mut self.state.lock().context_loss_reported)
    }

    /// Sleeps up to `duration`, waking early on cancellation or when the
    /// surface state needs attention.
    pub(crate) fn pace_wait(&self, duration: Duration, cancel: &CancellationHandle) {
        let deadline = Instant::now() + duration;
        let mut state = self.state.lock();
        while !cancel.is_cancelled() && decide(&state) == RenderDecision::Ready {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
    }

    /// Final signal from the render thread. Clears every GPU flag so no
    /// windowing thread stays parked in the destroy rendezvous.
    pub(crate) fn mark_exited(&self) {
        let mut state = self.state.lock();
        state.exited = true;
        state.running = false;
        state.render_thread = None;
        state.gpu_surface_available = false;
        state.gpu_surface_creating = false;
        state.gpu_context_available = false;
        state.context_lost = false;
        state.context_loss_reported = false;
        self.changed.notify_all();
    }

    /// Waits for [`mark_exited`](Self::mark_exited), re-broadcasting every
    /// `poll` in case the loop is parked somewhere that missed a wakeup.
    pub(crate) fn wait_for_exit(&self, poll: Duration) {
        let mut state = self.state.lock();
        while !state.exited {
            self.changed.notify_all();
            let _ = self.changed.wait_for(&mut state, poll);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockHost;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;

    fn tracker() -> (Arc<SurfaceTracker>, Arc<MockHost>) {
        let host = Arc::new(MockHost::default());
        (Arc::new(SurfaceTracker::new(host.clone())), host)
    }

    /// Healthy context, with or without a drawable.
    fn live(surface: bool) -> GpuFlags {
        GpuFlags {
            surface,
            context: true,
            context_lost: false,
        }
    }

    // ── notifications ─────────────────────────────────────────────────────

    #[test]
    fn surface_created_is_idempotent() {
        let (once, _) = tracker();
        once.notify_surface_created(800, 600);

        let (twice, _) = tracker();
        twice.notify_surface_created(800, 600);
        twice.notify_surface_created(800, 600);

        assert_eq!(once.snapshot(), twice.snapshot());
        assert!(twice.snapshot().surface_available);
    }

    #[test]
    fn surface_changed_keeps_availability() {
        let (tracker, _) = tracker();
        tracker.notify_surface_changed(1024, 768);

        let state = tracker.snapshot();
        assert!(!state.surface_available);
        assert_eq!((state.width, state.height), (1024, 768));
        assert_eq!(tracker.take_pending_resize(), Some((1024, 768)));
        assert_eq!(tracker.take_pending_resize(), None);
    }

    #[test]
    fn recreate_with_new_size_schedules_resize() {
        let (tracker, _) = tracker();
        tracker.notify_surface_created(800, 600);
        assert_eq!(tracker.take_pending_resize(), None);

        tracker.notify_surface_created(800, 600);
        assert_eq!(tracker.take_pending_resize(), None);

        let generation = tracker.snapshot().generation;
        tracker.notify_surface_created(1024, 768);
        assert_eq!(tracker.take_pending_resize(), Some((1024, 768)));
        assert_eq!(tracker.snapshot().generation, generation + 1);
    }

    #[test]
    fn destroy_without_drawable_returns_immediately() {
        let (tracker, _) = tracker();
        tracker.notify_surface_created(800, 600);
        tracker.notify_surface_destroyed();
        assert!(!tracker.snapshot().surface_available);
    }

    #[test]
    fn destroy_waits_for_gpu_teardown() {
        let (tracker, _) = tracker();
        tracker.notify_surface_created(800, 600);
        tracker.publish_gpu(live(true));

        let returned = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();
        let ui = {
            let tracker = tracker.clone();
            let returned = returned.clone();
            thread::spawn(move || {
                tracker.notify_surface_destroyed();
                // The drawable must already be gone when the rendezvous returns.
                tx.send(tracker.snapshot().gpu_surface_available).unwrap();
                returned.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!returned.load(Ordering::SeqCst));

        tracker.publish_gpu(live(false));
        assert!(!rx.recv_timeout(Duration::from_secs(2)).unwrap());
        ui.join().unwrap();
    }

    #[test]
    fn destroy_waits_for_creation_in_flight() {
        let (tracker, _) = tracker();
        tracker.notify_surface_created(800, 600);
        tracker.publish_gpu(live(false));
        assert!(tracker.begin_surface_creation());

        let returned = Arc::new(AtomicBool::new(false));
        let ui = {
            let tracker = tracker.clone();
            let returned = returned.clone();
            thread::spawn(move || {
                tracker.notify_surface_destroyed();
                returned.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!returned.load(Ordering::SeqCst));

        // The creation succeeded; the rendezvous now waits for its teardown.
        tracker.publish_gpu(live(true));
        thread::sleep(Duration::from_millis(20));
        assert!(!returned.load(Ordering::SeqCst));

        tracker.publish_gpu(live(false));
        ui.join().unwrap();
        assert!(returned.load(Ordering::SeqCst));
    }

    #[test]
    fn creation_refused_once_window_is_gone() {
        let (tracker, _) = tracker();
        assert!(!tracker.begin_surface_creation());

        tracker.notify_surface_created(800, 600);
        tracker.notify_surface_destroyed();
        assert!(!tracker.begin_surface_creation());
        assert!(!tracker.snapshot().gpu_surface_creating);
    }

    #[test]
    fn failed_creation_releases_rendezvous() {
        let (tracker, _) = tracker();
        tracker.notify_surface_created(800, 600);
        tracker.publish_gpu(live(false));
        assert!(tracker.begin_surface_creation());

        let ui = {
            let tracker = tracker.clone();
            thread::spawn(move || tracker.notify_surface_destroyed())
        };
        thread::sleep(Duration::from_millis(20));
        tracker.publish_gpu(live(false));
        ui.join().unwrap();
    }

    #[test]
    fn exit_releases_destroy_rendezvous() {
        let (tracker, _) = tracker();
        tracker.notify_surface_created(800, 600);
        tracker.publish_gpu(live(true));

        let ui = {
            let tracker = tracker.clone();
            thread::spawn(move || tracker.notify_surface_destroyed())
        };
        thread::sleep(Duration::from_millis(20));
        tracker.mark_exited();
        ui.join().unwrap();
    }

    #[test]
    fn pause_and_resume() {
        let (tracker, host) = tracker();
        host.set_focused(false);

        tracker.request_pause();
        assert!(tracker.snapshot().paused);

        tracker.request_resume();
        assert!(!tracker.snapshot().paused);
        assert_eq!(host.focus_requests(), 1);
    }

    #[test]
    fn resume_skips_focus_when_focused() {
        let (tracker, host) = tracker();
        tracker.request_resume();
        assert_eq!(host.focus_requests(), 0);
    }

    #[test]
    fn context_loss_report_needs_a_context() {
        let (tracker, _) = tracker();
        tracker.report_context_lost();
        assert!(!tracker.take_context_loss_report());

        tracker.publish_gpu(live(false));
        tracker.report_context_lost();
        assert!(tracker.take_context_loss_report());
        assert!(!tracker.take_context_loss_report());
    }

    #[test]
    fn new_context_absorbs_stale_loss_report() {
        let (tracker, _) = tracker();
        tracker.notify_surface_created(800, 600);
        tracker.publish_gpu(live(false));
        tracker.report_context_lost();

        tracker.publish_new_context(live(true));
        assert!(!tracker.take_context_loss_report());
        assert_eq!(decide(&tracker.snapshot()), RenderDecision::Ready);
    }

    // ── render side ───────────────────────────────────────────────────────

    #[test]
    fn wait_returns_when_surface_appears() {
        let (tracker, _) = tracker();
        let cancel = CancellationHandle::new(tracker.clone());

        let render = {
            let tracker = tracker.clone();
            let cancel = cancel.clone();
            thread::spawn(move || tracker.wait_until_renderable(&cancel))
        };

        thread::sleep(Duration::from_millis(20));
        tracker.notify_surface_created(800, 600);
        assert_eq!(render.join().unwrap(), RenderDecision::NeedCreateContext);
    }

    #[test]
    fn cancel_unblocks_wait() {
        let (tracker, _) = tracker();
        let cancel = CancellationHandle::new(tracker.clone());

        let render = {
            let tracker = tracker.clone();
            let cancel = cancel.clone();
            thread::spawn(move || tracker.wait_until_renderable(&cancel))
        };

        thread::sleep(Duration::from_millis(20));
        cancel.cancel();
        assert_eq!(render.join().unwrap(), RenderDecision::Stopped);
    }

    #[test]
    fn finishing_host_stops_instead_of_blocking() {
        let (tracker, host) = tracker();
        host.set_finishing(true);
        let cancel = CancellationHandle::new(tracker.clone());
        assert_eq!(tracker.wait_until_renderable(&cancel), RenderDecision::Stopped);
    }

    #[test]
    fn surface_failure_blocks_until_state_moves() {
        let (tracker, _) = tracker();
        tracker.notify_surface_created(800, 600);
        tracker.publish_gpu(live(false));
        tracker.record_surface_failure();
        assert_eq!(decide(&tracker.snapshot()), RenderDecision::BlockAndRetry);

        tracker.notify_surface_changed(800, 601);
        assert_eq!(decide(&tracker.snapshot()), RenderDecision::NeedCreateSurface);
    }

    #[test]
    fn begin_run_rejects_second_loop() {
        let (tracker, _) = tracker();
        assert!(tracker.begin_run());
        assert!(!tracker.begin_run());
        tracker.mark_exited();
        assert!(tracker.begin_run());
    }

    #[test]
    fn pace_wait_cut_short_by_teardown() {
        let (tracker, _) = tracker();
        tracker.notify_surface_created(800, 600);
        tracker.publish_gpu(live(true));
        let cancel = CancellationHandle::new(tracker.clone());

        let pacer = {
            let tracker = tracker.clone();
            thread::spawn(move || {
                let started = Instant::now();
                tracker.pace_wait(Duration::from_secs(5), &cancel);
                started.elapsed()
            })
        };

        thread::sleep(Duration::from_millis(20));
        tracker.request_pause();
        assert!(pacer.join().unwrap() < Duration::from_secs(2));
    }
}
