use std::io;
use std::thread::{self, JoinHandle};

use anyhow::anyhow;

use crate::device::{BackgroundContext, GpuBinding};
use crate::surface::CancelToken;

/// Resource reload run on a worker thread after a context loss.
///
/// The background context shares objects with the new main context and is
/// already current when the job starts.
pub type ReloadJob<B> =
    Box<dyn FnOnce(&mut BackgroundContext<B>, &CancelToken) -> anyhow::Result<()> + Send + 'static>;

/// Handle to a running reload job.
///
/// Completion is observed through the join handle. The render thread joins the
/// worker before it touches the main context again, so the shared context never
/// outlives the context it shares with.
pub(crate) struct ReloadTask {
    cancel: CancelToken,
    join: Option<JoinHandle<anyhow::Result<()>>>,
}

impl ReloadTask {
    pub(crate) fn spawn<B: GpuBinding>(
        mut background: BackgroundContext<B>,
        job: ReloadJob<B>,
    ) -> io::Result<Self> {
        let cancel = CancelToken::new();
        let token = cancel.clone();

        let join = thread::Builder::new()
            .name("lazarus-reload".to_string())
            .spawn(move || -> anyhow::Result<()> {
                log::debug!("begin reloading graphics content");
                background.make_current()?;
                let result = job(&mut background, &token);
                drop(background);
                log::debug!("end reloading graphics content");
                result
            })?;

        Ok(Self {
            cancel,
            join: Some(join),
        })
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.join.as_ref().is_none_or(JoinHandle::is_finished)
    }

    pub(crate) fn join(mut self) -> anyhow::Result<()> {
        self.join_inner()
    }

    pub(crate) fn cancel_and_join(mut self) -> anyhow::Result<()> {
        self.cancel.cancel();
        self.join_inner()
    }

    fn join_inner(&mut self) -> anyhow::Result<()> {
        match self.join.take() {
            Some(join) => join
                .join()
                .map_err(|_| anyhow!("reload worker panicked"))?,
            None => Ok(()),
        }
    }
}

impl Drop for ReloadTask {
    fn drop(&mut self) {
        if self.join.is_some() {
            self.cancel.cancel();
            if let Err(e) = self.join_inner() {
                log::warn!("reload job failed during shutdown: {e:#}");
            }
        }
    }
}
