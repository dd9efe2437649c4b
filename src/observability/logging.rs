//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once at startup
//! - Let `RUST_LOG` override the configured level
//!
//! # Design Decisions
//! - Attacker-supplied text is never logged verbatim, only lengths
//! - Per-session fields live on the `session` span, not on each event

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub fn default_filter(log_level: &str) -> String {
    format!("snare={}", log_level)
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(log_level: &str) {
    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter(log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
