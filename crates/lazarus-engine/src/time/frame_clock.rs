use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick of the same clock. Zero on the first tick.
    pub dt: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Ticks taken before this one.
    pub frame_index: u64,
}

/// Delta-time source for one callback stream.
///
/// The render loop keeps two: one for updates and one for renders, so each
/// callback sees the time since its own previous invocation. Timestamps that
/// go backwards produce a zero delta rather than a negative one.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<Instant>,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Option<Duration>,
}

impl FrameClock {
    /// Unclamped clock (apart from the zero floor).
    pub fn new() -> Self {
        Self::with_clamps(Duration::ZERO, None)
    }

    /// Clock with custom clamps. `dt_max` bounds the delta after long stalls
    /// (debugger, backgrounding).
    pub fn with_clamps(dt_min: Duration, dt_max: Option<Duration>) -> Self {
        debug_assert!(dt_max.is_none_or(|max| dt_min <= max));
        Self {
            last: None,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Forgets the previous tick; the next one reports a zero delta.
    pub fn reset(&mut self) {
        self.last = None;
        self.frame_index = 0;
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    /// Advances the clock to `now`.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let mut dt = match self.last {
            Some(last) => now.saturating_duration_since(last).max(self.dt_min),
            None => Duration::ZERO,
        };
        if let Some(max) = self.dt_max {
            dt = dt.min(max);
        }

        self.last = Some(now);

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
