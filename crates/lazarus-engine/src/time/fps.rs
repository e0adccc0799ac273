use std::time::{Duration, Instant};

/// Samples taken before this much time has passed are discarded.
const WARMUP: Duration = Duration::from_millis(2000);

/// Length of one averaging window.
const WINDOW: Duration = Duration::from_millis(995);

/// Exponentially smoothed frames-per-second estimate.
///
/// Each full window contributes 20% to the average. Startup frames are skipped
/// because loading stalls would drag the estimate down for several seconds.
#[derive(Debug, Clone)]
pub struct FrameRateSampler {
    started: Option<Instant>,
    window_start: Option<Instant>,
    frames: u32,
    average: f64,
}

impl FrameRateSampler {
    /// `initial` seeds the average; use the target rate when there is one.
    pub fn new(initial: f64) -> Self {
        Self {
            started: None,
            window_start: None,
            frames: 0,
            average: initial,
        }
    }

    pub fn average(&self) -> f64 {
        self.average
    }

    pub fn mark(&mut self) -> Option<f64> {
        self.mark_at(Instant::now())
    }

    /// Records one frame. Returns the new average when a window closes.
    pub fn mark_at(&mut self, now: Instant) -> Option<f64> {
        let started = *self.started.get_or_insert(now);
        if now.saturating_duration_since(started) < WARMUP {
            return None;
        }

        let window_start = *self.window_start.get_or_insert(now);
        self.frames += 1;

        let elapsed = now.saturating_duration_since(window_start);
        if elapsed < WINDOW {
            return None;
        }

        let rate = f64::from(self.frames) / elapsed.as_secs_f64();
        self.average = 0.8 * self.average + 0.2 * rate;
        log::trace!(
            "frames {} elapsed {}ms {:.2} fps",
            self.frames,
            elapsed.as_millis(),
            self.average
        );
        self.frames = 0;
        self.window_start = Some(now);
        Some(self.average)
    }
}
