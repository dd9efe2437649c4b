//! Escalating backoff and jittered delays.

use std::time::Duration;

use crate::timing::entropy::RandomSource;

/// Sleep for a random duration in `[min_ms, max_ms)`.
///
/// When `min_ms >= max_ms` the delay is exactly `min_ms`.
pub async fn random_delay(min_ms: u64, max_ms: u64, rng: &RandomSource) {
    tokio::time::sleep(jitter_between(min_ms, max_ms, rng)).await;
}

/// The delay `random_delay` would sleep for.
pub fn jitter_between(min_ms: u64, max_ms: u64, rng: &RandomSource) -> Duration {
    if min_ms >= max_ms {
        return Duration::from_millis(min_ms);
    }
    Duration::from_millis(min_ms + rng.below(max_ms - min_ms))
}

/// Per-connection escalating delay.
///
/// Each `sleep` waits the current delay and then grows it by `step`, clamped
/// at `max`. Once the clamp is reached every later call waits `max`.
#[derive(Debug, Clone)]
pub struct Tarpit {
    delay: Duration,
    step: Duration,
    max: Duration,
}

impl Tarpit {
    pub fn new(start_ms: u64, step_ms: u64, max_ms: u64) -> Self {
        let max = Duration::from_millis(max_ms);
        Self {
            delay: Duration::from_millis(start_ms).min(max),
            step: Duration::from_millis(step_ms),
            max,
        }
    }

    /// The delay the next `sleep` will wait.
    pub fn current(&self) -> Duration {
        self.delay
    }

    /// Return the current delay and advance to the next one.
    pub fn advance(&mut self) -> Duration {
        let current = self.delay;
        self.delay = self.delay.saturating_add(self.step).min(self.max);
        current
    }

    pub async fn sleep(&mut self) {
        let delay = self.advance();
        tokio::time::sleep(delay).await;
    }
}
