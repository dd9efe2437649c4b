//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + CLI flags
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → presets.rs (Behavior: preset applied to the mock section)
//!     → one MockConfig per accepted connection
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps its Behavior; running sessions keep their MockConfig
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Only the mock and penalty sections reload; listener changes need a restart

pub mod loader;
pub mod presets;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use presets::{Behavior, Preset};
pub use schema::{
    ListenerConfig, MockSettings, ObservabilityConfig, PenaltyConfig, ServerConfig,
    ShutdownConfig,
};
