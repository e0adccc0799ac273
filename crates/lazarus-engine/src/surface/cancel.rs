use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::SurfaceTracker;

/// Shared one-shot flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if this call flipped the flag.
    pub fn cancel(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Cancellation for one run of the render loop.
///
/// Cancelling also wakes every blocking wait in the tracker, so a loop parked
/// in `BlockAndRetry` observes it immediately.
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    token: CancelToken,
    tracker: Arc<SurfaceTracker>,
}

impl CancellationHandle {
    pub(crate) fn new(tracker: Arc<SurfaceTracker>) -> Self {
        Self {
            token: CancelToken::new(),
            tracker,
        }
    }

    pub fn cancel(&self) {
        if self.token.cancel() {
            log::debug!("render loop cancellation requested");
        }
        self.tracker.request_stop();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }
}
