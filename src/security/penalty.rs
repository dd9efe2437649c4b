//! Reconnect penalty.
//!
//! # Responsibilities
//! - Count recent connections per source address in a sliding window
//! - Scale the fixed pre-delay for repeat visitors, with jitter
//! - Forget addresses that went quiet so the table stays bounded

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

use crate::timing::RandomSource;

/// Connection history per source address.
#[derive(Debug, Clone, Default)]
pub struct PenaltyTracker {
    history: Arc<DashMap<IpAddr, Vec<Instant>>>,
}

impl PenaltyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a connection from `ip` and return how many connections it made
    /// within `window`, this one included.
    pub fn record(&self, ip: IpAddr, window: Duration) -> usize {
        let now = Instant::now();
        let mut entry = self.history.entry(ip).or_default();
        entry.retain(|seen| now.duration_since(*seen) < window);
        entry.push(now);
        entry.len()
    }

    /// Drop every address with no connection inside `window`. Returns how
    /// many were dropped.
    pub fn sweep(&self, window: Duration) -> usize {
        let now = Instant::now();
        let before = self.history.len();
        self.history.retain(|_, seen| {
            seen.retain(|t| now.duration_since(*t) < window);
            !seen.is_empty()
        });
        before.saturating_sub(self.history.len())
    }

    /// Number of addresses currently tracked.
    pub fn tracked(&self) -> usize {
        self.history.len()
    }
}

/// Pre-delay for a visitor seen `attempts` times in the window.
///
/// A first visit keeps `delay_ms`. Repeat visits wait `delay_ms * attempts`
/// plus a uniform jitter in `[0, delay_ms / 2]`.
pub fn penalized_delay(delay_ms: u64, attempts: usize, rng: &RandomSource) -> u64 {
    if attempts <= 1 {
        return delay_ms;
    }
    let base = delay_ms.saturating_mul(attempts as u64);
    base.saturating_add(rng.between(0, delay_ms / 2))
}
