/// Outbound capability to the windowing layer.
///
/// Methods are called from both the UI and the render thread, sometimes while
/// the tracker lock is held; implementations must be cheap and must not call
/// back into the view.
pub trait WindowHost: Send + Sync + 'static {
    fn is_focused(&self) -> bool {
        true
    }

    /// Asks the windowing layer to give the view input focus.
    fn request_focus(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// The host is shutting down; a blocked render loop should exit instead of
    /// waiting for a surface that will never come.
    fn is_finishing(&self) -> bool {
        false
    }
}

/// Host with no windowing behavior. Useful for off-screen or embedded setups.
#[derive(Debug, Default, Copy, Clone)]
pub struct HeadlessHost;

impl WindowHost for HeadlessHost {}
