/// One-shot cross-thread signal.
///
/// A `Notifier` can be cloned into event handlers and worker threads; the
/// first value posted wins and later posts are discarded. The `Waiter` is
/// consumed by waiting, so a signal cannot be observed twice.
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    /// Nothing was posted before the deadline.
    TimedOut,
    /// Every notifier was dropped without posting.
    Abandoned,
}

pub struct Notifier<T> {
    tx: SyncSender<T>,
}

pub struct Waiter<T> {
    rx: Receiver<T>,
}

pub fn signal<T: Send>() -> (Notifier<T>, Waiter<T>) {
    let (tx, rx) = mpsc::sync_channel(1);
    (Notifier { tx }, Waiter { rx })
}

impl<T> Clone for Notifier<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<T> Notifier<T> {
    /// Post a value without blocking. Returns false if a value was already
    /// posted or the waiter is gone.
    pub fn notify(&self, value: T) -> bool {
        match self.tx.try_send(value) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

impl<T> Waiter<T> {
    /// Block until a value is posted. `None` if every notifier went away.
    pub fn wait(self) -> Option<T> {
        self.rx.recv().ok()
    }

    pub fn wait_timeout(self, timeout: Duration) -> Result<T, WaitError> {
        self.rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => WaitError::TimedOut,
            RecvTimeoutError::Disconnected => WaitError::Abandoned,
        })
    }
}
