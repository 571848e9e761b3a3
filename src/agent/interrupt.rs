use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Cloneable handle for aborting the agent's suspension points
///
/// The loop races its awaits (model call, confirmation, spawned process)
/// against `wait`; firing `interrupt` wins every such race and marks the
/// session aborted.
#[derive(Clone, Default)]
pub struct InterruptHandle {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    notify: Notify,
    flag: AtomicBool,
}

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signal the interrupt; idempotent
    pub fn interrupt(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_interrupted(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Resolve once the interrupt fires (immediately if it already has)
    pub async fn wait(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register interest before checking the flag, so a signal landing
        // between the two cannot be lost.
        notified.as_mut().enable();
        if self.is_interrupted() {
            return;
        }
        notified.await;
    }
}
