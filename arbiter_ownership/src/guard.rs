//! Scoped ownership.
//!
//! [`OwnershipGuard`] releases its subsystem when it goes out of scope, so a
//! routine that bails out early (error return, panic unwinding) cannot leave
//! a device locked.

use tracing::{debug, warn};

use crate::registry::OwnershipRegistry;
use crate::subsystem::SubsystemId;
use crate::token::OwnerToken;

/// Ownership of one subsystem held for the lifetime of the guard.
///
/// Created by [`OwnershipRegistry::try_acquire`]. The guard remembers the
/// claim it took: if that claim is released by other means and the
/// subsystem is acquired again, even by the same token, dropping the guard
/// leaves the new claim in place.
#[must_use = "ownership is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct OwnershipGuard<'r> {
    registry: &'r OwnershipRegistry,
    owner: OwnerToken,
    id: SubsystemId,
    claim: u64,
    name: String,
    reentrant: bool,
    done: bool,
}

impl<'r> OwnershipGuard<'r> {
    pub(crate) fn new(
        registry: &'r OwnershipRegistry,
        owner: OwnerToken,
        id: SubsystemId,
        claim: u64,
        name: &str,
        reentrant: bool,
    ) -> Self {
        Self {
            registry,
            owner,
            id,
            claim,
            name: name.to_string(),
            reentrant,
            done: false,
        }
    }

    /// Token holding the subsystem.
    pub fn owner(&self) -> &OwnerToken {
        &self.owner
    }

    /// Guarded subsystem.
    pub fn subsystem_id(&self) -> SubsystemId {
        self.id
    }

    /// Guarded subsystem's name.
    pub fn subsystem_name(&self) -> &str {
        &self.name
    }

    /// `true` if ownership predates this guard; dropping it then releases
    /// nothing.
    pub fn is_reentrant(&self) -> bool {
        self.reentrant
    }

    /// Release now and report whether the registry entry was removed.
    pub fn release(mut self) -> bool {
        self.release_inner()
    }

    fn release_inner(&mut self) -> bool {
        if self.reentrant || self.done {
            return false;
        }
        self.done = true;
        let released = self
            .registry
            .release_claim(&self.owner, self.id, self.claim);
        if released {
            debug!(subsystem = %self.name, id = %self.id, owner = self.owner.as_str(), "scoped ownership released");
        } else {
            warn!(
                subsystem = %self.name,
                id = %self.id,
                owner = self.owner.as_str(),
                "scoped ownership was already gone"
            );
        }
        released
    }
}

impl Drop for OwnershipGuard<'_> {
    fn drop(&mut self) {
        self.release_inner();
    }
}
