use std::{
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::sync::oneshot;

/// One-shot completion signal between the firing side (any controller task)
/// and a single waiter (the test driver).
///
/// Firing is idempotent: concurrent callers race on the flag and only the
/// winner sends. The signal is buffered, so firing before anyone waits is
/// never lost.
pub(crate) struct Completion {
    fired: AtomicBool,
    sender: Mutex<Option<oneshot::Sender<()>>>,
    receiver: Mutex<Option<oneshot::Receiver<()>>>,
}

impl Completion {
    pub fn new() -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            fired: AtomicBool::new(false),
            sender: Mutex::new(Some(tx)),
            receiver: Mutex::new(Some(rx)),
        }
    }

    /// Returns true for the one call that completed the signal.
    pub fn fire(&self) -> bool {
        if self.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sender) = sender {
            let _ = sender.send(());
        }
        true
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Wait for the signal; returns true if `timeout` elapsed first.
    ///
    /// Only the first call actually waits, later calls report the current
    /// state immediately.
    pub async fn wait(&self, timeout: Duration) -> bool {
        let receiver = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(receiver) = receiver else {
            return !self.has_fired();
        };
        let _ = tokio::time::timeout(timeout, receiver).await;
        !self.has_fired()
    }
}
