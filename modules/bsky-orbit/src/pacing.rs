use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Interval, MissedTickBehavior};

/// Fixed-interval request gate shared by every worker in a run.
///
/// Each outbound request waits for the next tick, so the aggregate request
/// rate stays at one per `period` no matter how many workers run at once.
/// A zero period disables pacing entirely.
pub struct Pacer {
    period: Duration,
    // Created lazily: an Interval must be built inside a runtime.
    ticker: Mutex<Option<Interval>>,
}

impl Pacer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            ticker: Mutex::new(None),
        }
    }

    pub fn unpaced() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Wait until the next request is allowed. The first call returns immediately.
    pub async fn ready(&self) {
        if self.period.is_zero() {
            return;
        }
        let mut ticker = self.ticker.lock().await;
        let interval = ticker.get_or_insert_with(|| {
            let mut interval = tokio::time::interval(self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        interval.tick().await;
    }
}
