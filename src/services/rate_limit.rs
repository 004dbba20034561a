use std::time::Duration;

/// Pause between sequential calls to the marketplace search API
const DEFAULT_INTERVAL_MS: u64 = 500;

/// Pacing for sequential external calls inside a batch.
///
/// The search collaborator rate-limits aggressively, so batch loops call
/// `acquire` before every request. Kept behind a trait so tests and future
/// token-bucket implementations can swap in without touching batch logic.
#[async_trait::async_trait]
pub trait RateLimiter: Send + Sync {
    async fn acquire(&self);
}

/// Fixed-delay pacing: every acquire sleeps for the configured interval
pub struct FixedDelayLimiter {
    interval: Duration,
}

impl FixedDelayLimiter {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for FixedDelayLimiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_INTERVAL_MS))
    }
}

#[async_trait::async_trait]
impl RateLimiter for FixedDelayLimiter {
    async fn acquire(&self) {
        tokio::time::sleep(self.interval).await;
    }
}

/// No pacing at all; used by tests
pub struct NoopLimiter;

#[async_trait::async_trait]
impl RateLimiter for NoopLimiter {
    async fn acquire(&self) {}
}
