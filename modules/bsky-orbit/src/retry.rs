use std::future::Future;
use std::time::Duration;

use bsky_client::BskyError;
use tracing::debug;

/// Bounded retry with exponential backoff for transient API failures.
/// The default performs no retries.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent attempt.
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_backoff: Duration) -> Self {
        Self {
            max_retries,
            base_backoff,
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff.saturating_mul(2u32.saturating_pow(attempt))
    }

    pub async fn run<T, F, Fut>(&self, actor: &str, mut op: F) -> Result<T, BskyError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BskyError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    let backoff = self.backoff(attempt);
                    attempt += 1;
                    debug!(
                        actor,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "Transient failure, retrying after backoff"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
