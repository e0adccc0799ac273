use std::time::Duration;

use crate::device::DepthFormat;

/// Where the render loop runs.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum RenderHost {
    /// A named thread owned by the view.
    #[default]
    DedicatedThread,
    /// The thread that calls `start`, which blocks until the loop exits.
    CurrentThread,
}

/// View/render-loop configuration.
#[derive(Debug, Clone)]
pub struct ViewConfig {
    /// Depth/stencil format requested from the configuration ladder.
    pub depth_format: DepthFormat,

    pub render_host: RenderHost,

    /// Log the smoothed frame rate and pacing decisions.
    pub log_fps: bool,

    /// How often `stop` re-broadcasts while waiting for the loop to exit.
    pub stop_poll_interval: Duration,

    /// Off-screen surface size of background contexts.
    pub background_surface_size: (u32, u32),

    /// Upper bound on the delta reported to frame callbacks.
    pub max_frame_delta: Option<Duration>,

    pub thread_name: String,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            depth_format: DepthFormat::None,
            render_host: RenderHost::DedicatedThread,
            log_fps: false,
            stop_poll_interval: Duration::from_millis(100),
            background_surface_size: (64, 64),
            max_frame_delta: None,
            thread_name: "lazarus-render".to_string(),
        }
    }
}
