//! Arbiter Common Library
//!
//! Shared constants and configuration loading utilities for all arbiter
//! workspace crates.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - Workspace-wide constants
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use arbiter_common::config::{ConfigLoader, SharedConfig};
//! use arbiter_common::consts::DEFAULT_CYCLE_TIME_MS;
//! ```

pub mod config;
pub mod consts;
pub mod prelude;
