//! One-shot cancellation flag shared between the scanner handle and its task.

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

use tokio::sync::Notify;

/// Cloneable cancellation token. Once cancelled it stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
  inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
  cancelled: AtomicBool,
  notify:    Notify,
}

impl CancelToken {
  pub fn new() -> Self { Self::default() }

  pub fn cancel(&self) {
    self.inner.cancelled.store(true, Ordering::SeqCst);
    self.inner.notify.notify_waiters();
  }

  pub fn is_cancelled(&self) -> bool { self.inner.cancelled.load(Ordering::SeqCst) }

  /// Resolves once [`cancel`](Self::cancel) has been called.
  pub async fn cancelled(&self) {
    // Register before checking the flag so a concurrent `cancel` cannot slip
    // between the check and the wait.
    let notified = self.inner.notify.notified();
    if self.is_cancelled() {
      return;
    }
    notified.await;
  }
}
