//! Prelude module for common re-exports.
//!
//! ```rust
//! use arbiter_common::prelude::*;
//! ```

use std::time::Duration;

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{DEFAULT_CYCLE_TIME_MS, MAX_ROUTINES, MAX_SUBSYSTEMS};

/// Default control-loop period as Duration.
pub const DEFAULT_CYCLE_TIME: Duration = Duration::from_millis(DEFAULT_CYCLE_TIME_MS);
