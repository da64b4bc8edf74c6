//! Explicit per-venue token bucket, so concurrent monitor, HTTP, and
//! executor traffic against the same venue shares one rate budget instead
//! of each caller guessing at its own pace.
//!
//! One token is refilled every `interval`; `acquire` suspends the caller
//! until a token is available. This is intentionally a plain async mutex
//! around a single counter rather than a lock-free structure — the bucket
//! is already a serialization point (outbound RPC rate), so there is
//! nothing to gain from a fancier structure here.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

pub struct RateLimiter {
    interval: Duration,
    state: Mutex<Instant>,
}

impl RateLimiter {
    /// `interval` is the minimum gap between successive acquisitions — 20ms
    /// for every venue in this system, per their documented rate limits.
    pub fn new(interval: Duration) -> Self {
        Self { interval, state: Mutex::new(Instant::now() - interval) }
    }

    pub async fn acquire(&self) {
        let mut last = self.state.lock().await;
        let now = Instant::now();
        let earliest = *last + self.interval;
        if earliest > now {
            tokio::time::sleep(earliest - now).await;
        }
        *last = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn acquire_spaces_calls_by_at_least_the_interval() {
        let limiter = RateLimiter::new(Duration::from_millis(20));
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(40));
    }
}
