use std::time::{Duration, Instant};

/// Fixed-rate throttle for the render loop.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FramePacer {
    interval: Option<Duration>,
}

impl FramePacer {
    /// `None`, zero, negative or non-finite rates mean unthrottled, as do
    /// rates whose interval is not representable or rounds to zero.
    pub fn from_rate(updates_per_second: Option<f64>) -> Self {
        let interval = updates_per_second
            .filter(|r| r.is_finite() && *r > 0.0)
            .and_then(|r| Duration::try_from_secs_f64(1.0 / r).ok())
            .filter(|i| !i.is_zero());
        Self { interval }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn target_rate(&self) -> Option<f64> {
        self.interval.map(|i| 1.0 / i.as_secs_f64())
    }

    /// Time left in the iteration that began at `started`.
    pub fn shortfall(&self, started: Instant, now: Instant) -> Option<Duration> {
        let interval = self.interval?;
        let spent = now.saturating_duration_since(started);
        interval.checked_sub(spent).filter(|d| !d.is_zero())
    }
}
