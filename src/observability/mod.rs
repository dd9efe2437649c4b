//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Server and sessions produce:
//!     → logging.rs (structured events inside per-session spans)
//!     → metrics.rs (counters, gauge, histogram)
//!
//! Consumers:
//!     → stdout (fmt layer)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
