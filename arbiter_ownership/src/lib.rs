//! # Arbiter Ownership Library
//!
//! Exclusive ownership arbitration for shared control subsystems.
//! Periodic task loops, autonomous sequences and operator commands each
//! present an owner token; the [`OwnershipRegistry`] guarantees that at
//! most one token owns a given subsystem at any instant.
//!
//! ## Layers
//!
//! 1. **[`subsystem`]**: identity of a controllable device
//! 2. **[`token`]**: caller-defined owner tokens
//! 3. **[`registry`]**: acquire/release/validate under one lock
//! 4. **[`guard`]**: scoped acquisition released on drop
//! 5. **[`sim`]**: multi-threaded control-loop simulator driving the registry
//!
//! All registry operations are non-blocking: they take the registry lock for
//! one map lookup/insert/erase and return immediately. Nothing is queued.

pub mod config;
pub mod error;
pub mod guard;
pub mod registry;
pub mod sim;
pub mod subsystem;
pub mod token;

pub use error::{OwnershipError, OwnershipResult};
pub use guard::OwnershipGuard;
pub use registry::OwnershipRegistry;
pub use subsystem::{ExclusiveSubsystem, Subsystem, SubsystemId};
pub use token::OwnerToken;
