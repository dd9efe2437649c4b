//! Shutdown coordination.
//!
//! A stop request is broadcast every time it is made. The first one stops
//! the accept loop (and aborts sessions when configured); a repeated one
//! cuts the drain short.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::net::ConnectionTracker;

/// Coordinator for graceful shutdown.
///
/// The accept loop, the penalty sweeper and, when sessions are abortable,
/// every session subscribe to it.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    requests: Arc<AtomicUsize>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(4);
        Self {
            tx,
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Receivers only see requests made after they subscribed.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Request shutdown. Returns how many requests have been made, this one
    /// included.
    pub fn trigger(&self) -> usize {
        let requests = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.tx.send(());
        requests
    }

    pub fn is_triggered(&self) -> bool {
        self.requests() > 0
    }

    /// How many stop requests have been made so far.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// How the post-shutdown drain ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drain {
    /// Every session finished.
    Idle,
    /// Sessions were still running when the limit elapsed.
    DeadlineReached,
    /// A repeated stop request cut the wait short.
    Abandoned,
}

/// Wait for running sessions after the first stop request.
///
/// Returns early once a further request arrives, including one made before
/// this call.
pub async fn drain_sessions(
    tracker: &ConnectionTracker,
    shutdown: &Shutdown,
    limit: Duration,
) -> Drain {
    // Subscribe before reading the count so no request slips between them.
    let mut repeated = shutdown.subscribe();
    if shutdown.requests() > 1 {
        return Drain::Abandoned;
    }
    tokio::select! {
        idle = tracker.wait_for_idle(limit) => {
            if idle { Drain::Idle } else { Drain::DeadlineReached }
        }
        _ = repeated.recv() => Drain::Abandoned,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trigger_reaches_every_subscriber() {
        let shutdown = Shutdown::new();
        let mut accept_loop = shutdown.subscribe();
        let mut session = shutdown.subscribe();
        assert_eq!(shutdown.receiver_count(), 2);

        assert_eq!(shutdown.trigger(), 1);
        assert!(accept_loop.recv().await.is_ok());
        assert!(session.recv().await.is_ok());
    }

    #[tokio::test]
    async fn late_subscriber_sees_only_the_repeat() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_triggered());
        shutdown.trigger();
        assert!(shutdown.is_triggered());

        let mut drain = shutdown.subscribe();
        assert!(drain.try_recv().is_err());
        assert_eq!(shutdown.trigger(), 2);
        assert!(drain.recv().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn drain_waits_for_sessions() {
        let shutdown = Shutdown::new();
        let tracker = ConnectionTracker::new();
        shutdown.trigger();
        assert_eq!(
            drain_sessions(&tracker, &shutdown, Duration::from_secs(10)).await,
            Drain::Idle
        );

        let _held = tracker.track();
        assert_eq!(
            drain_sessions(&tracker, &shutdown, Duration::from_secs(10)).await,
            Drain::DeadlineReached
        );
    }

    #[tokio::test(start_paused = true)]
    async fn repeat_request_before_drain_is_not_lost() {
        let shutdown = Shutdown::new();
        let tracker = ConnectionTracker::new();
        let _held = tracker.track();
        shutdown.trigger();
        shutdown.trigger();

        let started = tokio::time::Instant::now();
        let outcome = drain_sessions(&tracker, &shutdown, Duration::from_secs(10)).await;
        assert_eq!(outcome, Drain::Abandoned);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn repeat_request_during_drain_ends_it() {
        let shutdown = Shutdown::new();
        let tracker = ConnectionTracker::new();
        let _held = tracker.track();
        shutdown.trigger();

        let second = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            second.trigger();
        });
        let outcome = drain_sessions(&tracker, &shutdown, Duration::from_secs(10)).await;
        assert_eq!(outcome, Drain::Abandoned);
    }

    #[test]
    fn trigger_without_subscribers_is_harmless() {
        assert_eq!(Shutdown::new().trigger(), 1);
    }
}
