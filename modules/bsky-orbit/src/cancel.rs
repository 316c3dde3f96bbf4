//! Cooperative cancellation shared by every request of a run.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

/// Clone-able cancellation flag. Once cancelled it stays cancelled.
///
/// In-flight requests are raced against [`CancellationToken::cancelled`] and
/// dropped when it resolves, so whatever was accumulated before the signal is
/// kept and the run can still produce a partial result.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent cancel() is not missed.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }

    /// Drive `fut` to completion unless the token fires first, in which case
    /// the future is dropped and `None` is returned.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.cancelled() => None,
            out = fut => Some(out),
        }
    }

    /// Cancel automatically once `after` has elapsed.
    pub fn cancel_after(&self, after: Duration) -> tokio::task::JoinHandle<()> {
        let token = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if !token.is_cancelled() {
                tracing::warn!(after_secs = after.as_secs_f64(), "Deadline reached, cancelling run");
                token.cancel();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn run_completes_when_not_cancelled() {
        let token = CancellationToken::new();
        assert_eq!(token.run(async { 7 }).await, Some(7));
    }

    #[tokio::test]
    async fn run_short_circuits_when_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        assert!(token.is_cancelled());
        assert_eq!(token.run(async { 7 }).await, None);
    }

    #[tokio::test]
    async fn cancel_interrupts_pending_future() {
        let token = CancellationToken::new();
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.run(std::future::pending::<()>()).await })
        };
        tokio::task::yield_now().await;
        token.cancel();
        assert_eq!(waiter.await.unwrap(), None);
    }

    #[tokio::test]
    async fn cancel_after_fires() {
        let token = CancellationToken::new();
        token.cancel_after(Duration::from_millis(10));
        let out = tokio::time::timeout(Duration::from_secs(5), token.cancelled()).await;
        assert!(out.is_ok());
        assert!(token.is_cancelled());
    }
}
