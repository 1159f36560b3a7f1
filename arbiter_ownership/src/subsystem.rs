//! Subsystem identity.
//!
//! A subsystem is keyed by identity, never by value: two devices built from
//! identical settings are still two keys. Identities are minted from a
//! process-wide counter so an id is never handed out twice, even after the
//! subsystem that carried it has been dropped.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::OwnershipResult;
use crate::registry::OwnershipRegistry;
use crate::token::OwnerToken;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque, stable identity of a controllable resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubsystemId(u64);

impl SubsystemId {
    /// Mint a fresh identity, distinct from every other id in the process.
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, for logs and diagnostics.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubsystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A resource that can be exclusively owned through an [`OwnershipRegistry`].
///
/// Implementors only provide identity and a display name. The provided
/// methods are shorthands for the registry operations with `self` as the
/// subsystem.
pub trait ExclusiveSubsystem {
    /// Identity used as the registry key.
    fn subsystem_id(&self) -> SubsystemId;

    /// Human-readable name used in logs and errors.
    fn subsystem_name(&self) -> &str;

    /// Current owner of this subsystem.
    fn owner(&self, registry: &OwnershipRegistry) -> Option<OwnerToken> {
        registry.owner(self)
    }

    /// See [`OwnershipRegistry::has_ownership`].
    fn has_ownership(&self, owner: Option<&str>, registry: &OwnershipRegistry) -> bool {
        registry.has_ownership(owner, self)
    }

    /// See [`OwnershipRegistry::validate_ownership`].
    fn validate_ownership(
        &self,
        owner: Option<&str>,
        registry: &OwnershipRegistry,
    ) -> OwnershipResult<bool> {
        registry.validate_ownership(owner, self)
    }

    /// See [`OwnershipRegistry::acquire_ownership`].
    fn acquire_exclusive_access(&self, owner: Option<&str>, registry: &OwnershipRegistry) -> bool {
        registry.acquire_ownership(owner, self)
    }

    /// See [`OwnershipRegistry::release_ownership`].
    fn release_exclusive_access(&self, owner: Option<&str>, registry: &OwnershipRegistry) -> bool {
        registry.release_ownership(owner, self)
    }
}

/// Named identity carrier for a device.
///
/// Collaborators embed a `Subsystem` (or implement [`ExclusiveSubsystem`]
/// themselves). Cloning refers to the same device; equality compares ids.
#[derive(Debug, Clone)]
pub struct Subsystem {
    id: SubsystemId,
    name: Arc<str>,
}

impl Subsystem {
    /// Create a subsystem with a fresh identity.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            id: SubsystemId::next(),
            name: name.into(),
        }
    }

    /// Identity of this subsystem.
    #[inline]
    pub fn id(&self) -> SubsystemId {
        self.id
    }

    /// Display name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl ExclusiveSubsystem for Subsystem {
    fn subsystem_id(&self) -> SubsystemId {
        self.id
    }

    fn subsystem_name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Subsystem {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Subsystem {}

impl Hash for Subsystem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.id)
    }
}
