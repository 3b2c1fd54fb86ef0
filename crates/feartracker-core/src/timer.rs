//! Restart-on-activity debounce timer

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Runs a task once its delay passes without being re-armed
#[derive(Default)]
pub struct Debouncer {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending run and schedule `task` after `delay`
    pub fn arm<F>(&self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut handle = self.handle.lock();
        if let Some(previous) = handle.take() {
            previous.abort();
        }
        *handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }));
    }

    /// Cancel the pending run, if any
    pub fn cancel(&self) {
        if let Some(previous) = self.handle.lock().take() {
            previous.abort();
        }
    }

    /// Whether a run is scheduled and has not happened yet
    pub fn is_armed(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
