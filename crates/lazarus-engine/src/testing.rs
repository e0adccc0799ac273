//! Test doubles shared by the unit tests: a recording GPU binding, a recording
//! application and a scriptable window host.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::core::{FrameCtx, FrameError, ReloadJob, SurfaceApp, WindowHost};
use crate::device::{ConfigAttribs, GpuBinding, GpuErrorCode};

// ── binding ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    ChooseConfig(ConfigAttribs),
    CreateContext { id: u64, share: Option<u64> },
    CreateWindowSurface {
        id: u64,
        context: u64,
        width: u32,
        height: u32,
    },
    CreateOffscreen {
        id: u64,
        context: u64,
        width: u32,
        height: u32,
    },
    MakeCurrent { context: u64, surface: u64 },
    ClearCurrent,
    Swap { surface: u64 },
    Resize {
        surface: u64,
        width: u32,
        height: u32,
    },
    DestroySurface { id: u64 },
    DestroyContext { id: u64 },
}

#[derive(Debug)]
pub(crate) struct MockContext {
    pub id: u64,
}

#[derive(Debug)]
pub(crate) struct MockSurface {
    pub id: u64,
    pub context: u64,
}

type Acceptor = Box<dyn Fn(&ConfigAttribs) -> bool + Send + Sync>;
type Hook = Box<dyn Fn() + Send + Sync>;

/// Parks a binding call until the test opens it.
#[derive(Default)]
pub(crate) struct Gate {
    entered: AtomicBool,
    open: AtomicBool,
}

impl Gate {
    pub(crate) fn open(&self) {
        self.open.store(true, Ordering::SeqCst);
    }

    /// Waits until a call is parked at the gate.
    pub(crate) fn wait_entered(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while !self.entered.load(Ordering::SeqCst) {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }

    fn pass(&self) {
        self.entered.store(true, Ordering::SeqCst);
        while !self.open.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(1));
        }
    }
}

struct MockState {
    next_id: u64,
    calls: Vec<Call>,
    live_contexts: HashMap<u64, ()>,
    live_surfaces: HashMap<u64, u64>,
    accept: Acceptor,
    reject_code: GpuErrorCode,
    fail_window_surfaces: usize,
    fail_offscreen: bool,
    fail_context: bool,
    fail_swaps: usize,
    last_error: GpuErrorCode,
    window_gate: Option<Arc<Gate>>,
}

/// GPU binding that records calls and panics on any use of a dead handle.
pub(crate) struct MockBinding {
    state: Mutex<MockState>,
    destroy_surface_hook: Mutex<Option<Hook>>,
}

impl MockBinding {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                next_id: 1,
                calls: Vec::new(),
                live_contexts: HashMap::new(),
                live_surfaces: HashMap::new(),
                accept: Box::new(|_| true),
                reject_code: GpuErrorCode::BadConfig,
                fail_window_surfaces: 0,
                fail_offscreen: false,
                fail_context: false,
                fail_swaps: 0,
                last_error: GpuErrorCode::Success,
                window_gate: None,
            }),
            destroy_surface_hook: Mutex::new(None),
        }
    }

    pub(crate) fn accept_configs(&self, accept: impl Fn(&ConfigAttribs) -> bool + Send + Sync + 'static) {
        self.state.lock().accept = Box::new(accept);
    }

    pub(crate) fn reject_all_configs(&self, code: GpuErrorCode) {
        let mut state = self.state.lock();
        state.accept = Box::new(|_| false);
        state.reject_code = code;
    }

    pub(crate) fn fail_window_surfaces(&self, count: usize) {
        self.state.lock().fail_window_surfaces = count;
    }

    pub(crate) fn fail_offscreen(&self, fail: bool) {
        self.state.lock().fail_offscreen = fail;
    }

    pub(crate) fn fail_context(&self, fail: bool) {
        self.state.lock().fail_context = fail;
    }

    pub(crate) fn fail_swaps(&self, count: usize) {
        self.state.lock().fail_swaps = count;
    }

    /// Parks every window drawable creation at the returned gate.
    pub(crate) fn gate_window_surfaces(&self) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.state.lock().window_gate = Some(gate.clone());
        gate
    }

    /// Runs `hook` after each surface destruction, outside the mock's lock.
    pub(crate) fn on_destroy_surface(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.destroy_surface_hook.lock() = Some(Box::new(hook));
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| pred(c)).count()
    }

    pub(crate) fn live_contexts(&self) -> usize {
        self.state.lock().live_contexts.len()
    }

    pub(crate) fn live_surfaces(&self) -> usize {
        self.state.lock().live_surfaces.len()
    }

    fn alloc(state: &mut MockState) -> u64 {
        let id = state.next_id;
        state.next_id += 1;
        id
    }

    fn fail<T>(state: &mut MockState, code: GpuErrorCode) -> Result<T, GpuErrorCode> {
        state.last_error = code;
        Err(code)
    }
}

impl GpuBinding for MockBinding {
    type Config = ConfigAttribs;
    type Context = MockContext;
    type Surface = MockSurface;

    fn choose_config(&self, attribs: &ConfigAttribs) -> Option<ConfigAttribs> {
        let mut state = self.state.lock();
        state.calls.push(Call::ChooseConfig(*attribs));
        if (state.accept)(attribs) {
            Some(*attribs)
        } else {
            state.last_error = state.reject_code;
            None
        }
    }

    fn create_context(
        &self,
        _config: &ConfigAttribs,
        share: Option<&MockContext>,
    ) -> Result<MockContext, GpuErrorCode> {
        let mut state = self.state.lock();
        if state.fail_context {
            return Self::fail(&mut state, GpuErrorCode::BadAlloc);
        }
        if let Some(share) = share {
            assert!(state.live_contexts.contains_key(&share.id), "shared with dead context {}", share.id);
        }
        let id = Self::alloc(&mut state);
        state.live_contexts.insert(id, ());
        state.calls.push(Call::CreateContext {
            id,
            share: share.map(|s| s.id),
        });
        Ok(MockContext { id })
    }

    fn create_window_surface(
        &self,
        context: &MockContext,
        _config: &ConfigAttribs,
        width: u32,
        height: u32,
    ) -> Result<MockSurface, GpuErrorCode> {
        let gate = self.state.lock().window_gate.clone();
        if let Some(gate) = gate {
            gate.pass();
        }

        let mut state = self.state.lock();
        assert!(state.live_contexts.contains_key(&context.id), "surface on dead context {}", context.id);
        if state.fail_window_surfaces > 0 {
            state.fail_window_surfaces -= 1;
            return Self::fail(&mut state, GpuErrorCode::BadNativeWindow);
        }
        let id = Self::alloc(&mut state);
        state.live_surfaces.insert(id, context.id);
        state.calls.push(Call::CreateWindowSurface {
            id,
            context: context.id,
            width,
            height,
        });
        Ok(MockSurface {
            id,
            context: context.id,
        })
    }

    fn create_offscreen_surface(
        &self,
        context: &MockContext,
        _config: &ConfigAttribs,
        width: u32,
        height: u32,
    ) -> Result<MockSurface, GpuErrorCode> {
        let mut state = self.state.lock();
        assert!(state.live_contexts.contains_key(&context.id), "surface on dead context {}", context.id);
        if state.fail_offscreen {
            return Self::fail(&mut state, GpuErrorCode::BadAlloc);
        }
        let id = Self::alloc(&mut state);
        state.live_surfaces.insert(id, context.id);
        state.calls.push(Call::CreateOffscreen {
            id,
            context: context.id,
            width,
            height,
        });
        Ok(MockSurface {
            id,
            context: context.id,
        })
    }

    fn make_current(
        &self,
        context: &MockContext,
        draw: &MockSurface,
        read: &MockSurface,
    ) -> Result<(), GpuErrorCode> {
        let mut state = self.state.lock();
        assert!(state.live_contexts.contains_key(&context.id), "current on dead context {}", context.id);
        assert!(state.live_surfaces.contains_key(&draw.id), "current on dead surface {}", draw.id);
        assert!(state.live_surfaces.contains_key(&read.id), "current on dead surface {}", read.id);
        state.calls.push(Call::MakeCurrent {
            context: context.id,
            surface: draw.id,
        });
        Ok(())
    }

    fn clear_current(&self) -> Result<(), GpuErrorCode> {
        self.state.lock().calls.push(Call::ClearCurrent);
        Ok(())
    }

    fn swap_buffers(&self, context: &MockContext, surface: &mut MockSurface) -> Result<(), GpuErrorCode> {
        let mut state = self.state.lock();
        assert!(state.live_contexts.contains_key(&context.id), "swap on dead context {}", context.id);
        assert!(state.live_surfaces.contains_key(&surface.id), "swap on dead surface {}", surface.id);
        state.calls.push(Call::Swap {
            surface: surface.id,
        });
        if state.fail_swaps > 0 {
            state.fail_swaps -= 1;
            return Self::fail(&mut state, GpuErrorCode::ContextLost);
        }
        Ok(())
    }

    fn resize_surface(
        &self,
        _context: &MockContext,
        surface: &mut MockSurface,
        width: u32,
        height: u32,
    ) -> Result<(), GpuErrorCode> {
        let mut state = self.state.lock();
        assert!(state.live_surfaces.contains_key(&surface.id), "resize of dead surface {}", surface.id);
        state.calls.push(Call::Resize {
            surface: surface.id,
            width,
            height,
        });
        Ok(())
    }

    fn destroy_surface(&self, surface: MockSurface) -> Result<(), GpuErrorCode> {
        {
            let mut state = self.state.lock();
            assert!(state.live_surfaces.remove(&surface.id).is_some(), "double destroy of surface {}", surface.id);
            state.calls.push(Call::DestroySurface { id: surface.id });
        }
        if let Some(hook) = self.destroy_surface_hook.lock().as_ref() {
            hook();
        }
        Ok(())
    }

    fn destroy_context(&self, context: MockContext) -> Result<(), GpuErrorCode> {
        let mut state = self.state.lock();
        assert!(
            !state.live_surfaces.values().any(|owner| *owner == context.id),
            "context {} destroyed with a live surface",
            context.id
        );
        assert!(state.live_contexts.remove(&context.id).is_some(), "double destroy of context {}", context.id);
        state.calls.push(Call::DestroyContext { id: context.id });
        Ok(())
    }

    fn last_error(&self) -> GpuErrorCode {
        self.state.lock().last_error
    }
}

// ── host ──────────────────────────────────────────────────────────────────

pub(crate) struct MockHost {
    focused: AtomicBool,
    finishing: AtomicBool,
    focus_requests: AtomicUsize,
}

impl Default for MockHost {
    fn default() -> Self {
        Self {
            focused: AtomicBool::new(true),
            finishing: AtomicBool::new(false),
            focus_requests: AtomicUsize::new(0),
        }
    }
}

impl MockHost {
    pub(crate) fn set_focused(&self, focused: bool) {
        self.focused.store(focused, Ordering::SeqCst);
    }

    pub(crate) fn set_finishing(&self, finishing: bool) {
        self.finishing.store(finishing, Ordering::SeqCst);
    }

    pub(crate) fn focus_requests(&self) -> usize {
        self.focus_requests.load(Ordering::SeqCst)
    }
}

impl WindowHost for MockHost {
    fn is_focused(&self) -> bool {
        self.focused.load(Ordering::SeqCst)
    }

    fn request_focus(&self) -> anyhow::Result<()> {
        self.focus_requests.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_finishing(&self) -> bool {
        self.finishing.load(Ordering::SeqCst)
    }
}

// ── application ───────────────────────────────────────────────────────────

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Load,
    Unload,
    ContextLosing,
    ContextLost,
    ContextSet { resuming: bool },
    DeviceReset,
    SurfaceChanged(u32, u32),
    Stopped,
    Update,
    Render { resuming: bool },
    ReloadRan,
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct Entry {
    pub at: Instant,
    pub event: Event,
    pub dt: f32,
}

#[derive(Default)]
pub(crate) struct EventLog {
    entries: Mutex<Vec<Entry>>,
    changed: Condvar,
}

impl EventLog {
    pub(crate) fn push(&self, event: Event, dt: f32) {
        self.entries.lock().push(Entry {
            at: Instant::now(),
            event,
            dt,
        });
        self.changed.notify_all();
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.entries.lock().iter().map(|e| e.event).collect()
    }

    pub(crate) fn entries(&self) -> Vec<Entry> {
        self.entries.lock().clone()
    }

    pub(crate) fn count(&self, event: Event) -> usize {
        self.entries.lock().iter().filter(|e| e.event == event).count()
    }

    /// Events with frame callbacks filtered out.
    pub(crate) fn lifecycle(&self) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| !matches!(e, Event::Update | Event::Render { .. }))
            .collect()
    }

    /// Waits until `pred` holds over the recorded events.
    pub(crate) fn wait_for(&self, timeout: Duration, pred: impl Fn(&[Event]) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        let mut entries = self.entries.lock();
        loop {
            let events: Vec<Event> = entries.iter().map(|e| e.event).collect();
            if pred(&events) {
                return true;
            }
            if self.changed.wait_until(&mut entries, deadline).timed_out() {
                let events: Vec<Event> = entries.iter().map(|e| e.event).collect();
                return pred(&events);
            }
        }
    }

    pub(crate) fn wait_count(&self, timeout: Duration, event: Event, n: usize) -> bool {
        self.wait_for(timeout, |events| events.iter().filter(|e| **e == event).count() >= n)
    }
}

/// Scripted behavior shared between a test and its running app.
#[derive(Default)]
pub(crate) struct Script {
    pub update_errors: VecDeque<FrameError>,
    pub render_errors: VecDeque<FrameError>,
    pub panic_on_render: bool,
}

pub(crate) struct RecordingApp {
    pub log: Arc<EventLog>,
    pub script: Arc<Mutex<Script>>,
    pub present: bool,
    /// When set, context restoration runs a reload job that waits for this flag.
    pub reload_gate: Option<Arc<AtomicBool>>,
}

impl RecordingApp {
    pub(crate) fn new() -> Self {
        crate::logging::init_logging(crate::logging::LoggingConfig::for_tests());
        Self {
            log: Arc::new(EventLog::default()),
            script: Arc::new(Mutex::new(Script::default())),
            present: true,
            reload_gate: None,
        }
    }
}

impl SurfaceApp<MockBinding> for RecordingApp {
    fn on_load(&mut self) {
        self.log.push(Event::Load, 0.0);
    }

    fn on_unload(&mut self) {
        self.log.push(Event::Unload, 0.0);
    }

    fn on_context_losing(&mut self) {
        self.log.push(Event::ContextLosing, 0.0);
    }

    fn on_context_lost(&mut self) {
        self.log.push(Event::ContextLost, 0.0);
    }

    fn on_context_set(&mut self, resuming: bool) {
        self.log.push(Event::ContextSet { resuming }, 0.0);
    }

    fn on_device_reset(&mut self) {
        self.log.push(Event::DeviceReset, 0.0);
    }

    fn on_surface_changed(&mut self, width: u32, height: u32) {
        self.log.push(Event::SurfaceChanged(width, height), 0.0);
    }

    fn on_stopped(&mut self) {
        self.log.push(Event::Stopped, 0.0);
    }

    fn reload_job(&mut self) -> Option<ReloadJob<MockBinding>> {
        let gate = self.reload_gate.clone()?;
        let log = self.log.clone();
        Some(Box::new(move |background, cancel| {
            assert!(background.context().is_some());
            while !gate.load(Ordering::SeqCst) && !cancel.is_cancelled() {
                std::thread::sleep(Duration::from_millis(1));
            }
            log.push(Event::ReloadRan, 0.0);
            Ok(())
        }))
    }

    fn on_update_frame(&mut self, ctx: &mut FrameCtx<'_, MockBinding>) -> Result<(), FrameError> {
        self.log.push(Event::Update, ctx.dt());
        match self.script.lock().update_errors.pop_front() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn on_render_frame(&mut self, ctx: &mut FrameCtx<'_, MockBinding>) -> Result<(), FrameError> {
        let resuming = ctx.is_resuming();
        self.log.push(Event::Render { resuming }, ctx.dt());
        let (error, panic) = {
            let mut script = self.script.lock();
            (script.render_errors.pop_front(), script.panic_on_render)
        };
        if panic {
            panic!("render callback panicked");
        }
        if self.present {
            ctx.present();
        }
        match error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
