//! Ownership registry (acquire / release / validate).
//!
//! Single source of truth for "who may currently command this subsystem".
//! The mapping holds one entry per owned subsystem; an unowned subsystem
//! has no entry. Every operation runs under one registry-wide lock whose
//! critical section is a single map lookup, insert or erase.
//!
//! ## Null caller rule
//!
//! A caller without a token (`None`) is treated as owning a subsystem only
//! while nobody owns it. This keeps routines that never opted into
//! ownership working on free subsystems, and rejects them as soon as any
//! routine claims exclusivity. It also means a routine that forgets to
//! acquire is indistinguishable from one that deliberately runs anonymous,
//! so prefer named tokens for anything that moves hardware.
//!
//! ## Claims
//!
//! Every entry records the claim that created it. Re-acquiring after a
//! release starts a new claim even for the same token, so a scoped guard
//! only ever removes the claim it took.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

use crate::error::{OwnershipError, OwnershipResult};
use crate::guard::OwnershipGuard;
use crate::subsystem::{ExclusiveSubsystem, SubsystemId};
use crate::token::OwnerToken;

static GLOBAL_REGISTRY: LazyLock<OwnershipRegistry> = LazyLock::new(OwnershipRegistry::new);

/// Registry of exclusive subsystem owners.
///
/// Construct one per process and pass it by reference (or `Arc`) to every
/// routine. [`OwnershipRegistry::global`] provides the shared instance for
/// callers that cannot have it injected.
#[derive(Debug, Default)]
pub struct OwnershipRegistry {
    owners: Mutex<HashMap<SubsystemId, Claim>>,
    next_claim: AtomicU64,
}

/// One owned subsystem: the holder and the claim number it was taken under.
#[derive(Debug, Clone)]
struct Claim {
    owner: OwnerToken,
    number: u64,
}

/// `true` iff `owner` passes the ownership check against `current`.
#[inline]
fn holds(owner: Option<&str>, current: Option<&Claim>) -> bool {
    match (owner, current) {
        (None, None) => true,
        (Some(owner), Some(current)) => current.owner.as_str() == owner,
        _ => false,
    }
}

impl OwnershipRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            owners: Mutex::new(HashMap::new()),
            next_claim: AtomicU64::new(0),
        }
    }

    fn claim(&self, owner: OwnerToken) -> Claim {
        Claim {
            owner,
            number: self.next_claim.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Process-wide registry, created on first use.
    pub fn global() -> &'static OwnershipRegistry {
        &GLOBAL_REGISTRY
    }

    /// Current owner of `subsystem`, or `None` if unowned.
    pub fn owner<S: ExclusiveSubsystem + ?Sized>(&self, subsystem: &S) -> Option<OwnerToken> {
        let current = self
            .owners
            .lock()
            .get(&subsystem.subsystem_id())
            .map(|claim| claim.owner.clone());
        trace!(
            subsystem = subsystem.subsystem_name(),
            id = %subsystem.subsystem_id(),
            owner = current.as_deref(),
            "owner query"
        );
        current
    }

    /// Returns `true` if `owner` may command `subsystem`.
    ///
    /// A named owner matches only the current holder. `None` matches only an
    /// unowned subsystem.
    pub fn has_ownership<S: ExclusiveSubsystem + ?Sized>(
        &self,
        owner: Option<&str>,
        subsystem: &S,
    ) -> bool {
        let owners = self.owners.lock();
        holds(owner, owners.get(&subsystem.subsystem_id()))
    }

    /// Same check as [`has_ownership`](Self::has_ownership), but a failing
    /// named owner is an error.
    ///
    /// # Errors
    ///
    /// Returns [`OwnershipError::Violation`] if `owner` is `Some` and does not
    /// hold `subsystem`. A `None` caller gets `Ok(false)` instead.
    pub fn validate_ownership<S: ExclusiveSubsystem + ?Sized>(
        &self,
        owner: Option<&str>,
        subsystem: &S,
    ) -> OwnershipResult<bool> {
        let owners = self.owners.lock();
        let current = owners.get(&subsystem.subsystem_id());
        if holds(owner, current) {
            return Ok(true);
        }

        match owner {
            Some(owner) => {
                let current_owner = current.map(|claim| claim.owner.clone());
                drop(owners);
                error!(
                    subsystem = subsystem.subsystem_name(),
                    id = %subsystem.subsystem_id(),
                    owner,
                    current_owner = current_owner.as_deref(),
                    "ownership violation"
                );
                Err(OwnershipError::Violation {
                    owner: owner.into(),
                    subsystem: subsystem.subsystem_name().to_string(),
                    current_owner,
                })
            }
            None => Ok(false),
        }
    }

    /// Acquire exclusive ownership of `subsystem` for `owner`.
    ///
    /// Succeeds if the subsystem is unowned or already owned by `owner`.
    /// Fails without changing state if a different owner holds it. Never
    /// waits: a caller that lost must retry on a later cycle.
    ///
    /// A `None` caller succeeds on an unowned subsystem without creating an
    /// entry, and fails on an owned one.
    pub fn acquire_ownership<S: ExclusiveSubsystem + ?Sized>(
        &self,
        owner: Option<&str>,
        subsystem: &S,
    ) -> bool {
        let id = subsystem.subsystem_id();
        let mut owners = self.owners.lock();
        match (owners.get(&id), owner) {
            (None, Some(owner)) => {
                owners.insert(id, self.claim(OwnerToken::from(owner)));
                drop(owners);
                debug!(subsystem = subsystem.subsystem_name(), %id, owner, "ownership acquired");
                true
            }
            (None, None) => true,
            (Some(current), Some(owner)) if current.owner.as_str() == owner => true,
            (Some(current), owner) => {
                let current = current.owner.clone();
                drop(owners);
                if let Some(owner) = owner {
                    warn!(
                        subsystem = subsystem.subsystem_name(),
                        %id,
                        owner,
                        current_owner = current.as_str(),
                        "acquire rejected"
                    );
                }
                false
            }
        }
    }

    /// Release ownership of `subsystem` if `owner` holds it.
    ///
    /// Succeeds iff [`has_ownership`](Self::has_ownership) holds at the time
    /// of the call. A `None` caller releasing an unowned subsystem is a
    /// successful no-op.
    pub fn release_ownership<S: ExclusiveSubsystem + ?Sized>(
        &self,
        owner: Option<&str>,
        subsystem: &S,
    ) -> bool {
        let id = subsystem.subsystem_id();
        let mut owners = self.owners.lock();
        let current = owners.get(&id);
        if !holds(owner, current) {
            let current = current.map(|claim| claim.owner.clone());
            drop(owners);
            if let Some(owner) = owner {
                warn!(
                    subsystem = subsystem.subsystem_name(),
                    %id,
                    owner,
                    current_owner = current.as_deref(),
                    "release rejected"
                );
            }
            return false;
        }

        if owners.remove(&id).is_some() {
            drop(owners);
            debug!(subsystem = subsystem.subsystem_name(), %id, owner, "ownership released");
        }
        true
    }

    /// Acquire `subsystem` for `owner` and return a guard that releases it
    /// when dropped.
    ///
    /// If `owner` already held the subsystem the guard is re-entrant and
    /// leaves ownership in place on drop. Otherwise the guard releases only
    /// the claim it took: once that claim is released some other way, the
    /// guard leaves any later claim alone, including one by the same token.
    ///
    /// # Errors
    ///
    /// - [`OwnershipError::Anonymous`] if `owner` is `None`
    /// - [`OwnershipError::Contended`] if another owner holds the subsystem
    pub fn try_acquire<'r, S: ExclusiveSubsystem + ?Sized>(
        &'r self,
        owner: Option<&str>,
        subsystem: &S,
    ) -> OwnershipResult<OwnershipGuard<'r>> {
        let Some(owner) = owner else {
            return Err(OwnershipError::Anonymous {
                subsystem: subsystem.subsystem_name().to_string(),
            });
        };

        let id = subsystem.subsystem_id();
        let token = OwnerToken::from(owner);
        let mut owners = self.owners.lock();
        let (claim, reentrant) = match owners.get(&id) {
            None => {
                let claim = self.claim(token.clone());
                let number = claim.number;
                owners.insert(id, claim);
                (number, false)
            }
            Some(current) if current.owner == token => (current.number, true),
            Some(current) => {
                let current_owner = current.owner.clone();
                drop(owners);
                warn!(
                    subsystem = subsystem.subsystem_name(),
                    %id,
                    owner,
                    current_owner = current_owner.as_str(),
                    "scoped acquire rejected"
                );
                return Err(OwnershipError::Contended {
                    owner: token,
                    subsystem: subsystem.subsystem_name().to_string(),
                    current_owner,
                });
            }
        };
        drop(owners);

        debug!(subsystem = subsystem.subsystem_name(), %id, owner, reentrant, "scoped ownership acquired");
        Ok(OwnershipGuard::new(
            self,
            token,
            id,
            claim,
            subsystem.subsystem_name(),
            reentrant,
        ))
    }

    /// Release every subsystem held by `owner`. Returns how many were released.
    ///
    /// Intended for a routine's abort path. A `None` caller owns nothing.
    pub fn release_all(&self, owner: Option<&str>) -> usize {
        let Some(owner) = owner else {
            return 0;
        };

        let mut owners = self.owners.lock();
        let before = owners.len();
        owners.retain(|_, current| current.owner.as_str() != owner);
        let released = before - owners.len();
        drop(owners);

        if released > 0 {
            debug!(owner, released, "released all subsystems");
        }
        released
    }

    /// Consistent copy of the ownership mapping, sorted by subsystem id.
    pub fn snapshot(&self) -> Vec<(SubsystemId, OwnerToken)> {
        let mut entries: Vec<_> = self
            .owners
            .lock()
            .iter()
            .map(|(id, claim)| (*id, claim.owner.clone()))
            .collect();
        entries.sort_by_key(|(id, _)| *id);
        entries
    }

    /// Number of subsystems currently owned.
    pub fn owned_count(&self) -> usize {
        self.owners.lock().len()
    }

    /// Returns `true` if anyone owns `subsystem`.
    pub fn is_owned<S: ExclusiveSubsystem + ?Sized>(&self, subsystem: &S) -> bool {
        self.owners.lock().contains_key(&subsystem.subsystem_id())
    }

    /// Release one specific claim by id, used by [`OwnershipGuard`] which
    /// outlives the borrowed subsystem.
    pub(crate) fn release_claim(&self, owner: &OwnerToken, id: SubsystemId, claim: u64) -> bool {
        let mut owners = self.owners.lock();
        if owners
            .get(&id)
            .is_some_and(|current| current.number == claim && current.owner == *owner)
        {
            owners.remove(&id);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsystem::Subsystem;

    #[test]
    fn unowned_subsystem_is_free_for_null_caller() {
        let reg = OwnershipRegistry::new();
        let s = Subsystem::new("Intake");
        assert!(reg.owner(&s).is_none());
        assert!(reg.has_ownership(None, &s));
        assert!(!reg.has_ownership(Some("auto1"), &s));
    }

    #[test]
    fn acquire_records_owner() {
        let reg = OwnershipRegistry::new();
        let s = Subsystem::new("Intake");
        assert!(reg.acquire_ownership(Some("auto1"), &s));
        assert_eq!(reg.owner(&s).unwrap(), "auto1");
        assert!(reg.has_ownership(Some("auto1"), &s));
        assert!(!reg.has_ownership(Some("teleop"), &s));
        assert!(!reg.has_ownership(None, &s));
    }

    #[test]
    fn null_acquire_creates_no_entry() {
        let reg = OwnershipRegistry::new();
        let s = Subsystem::new("Intake");
        assert!(reg.acquire_ownership(None, &s));
        assert_eq!(reg.owned_count(), 0);

        assert!(reg.acquire_ownership(Some("auto1"), &s));
        assert!(!reg.acquire_ownership(None, &s));
    }

    #[test]
    fn validate_null_caller_is_quiet() {
        let reg = OwnershipRegistry::new();
        let s = Subsystem::new("Intake");
        reg.acquire_ownership(Some("auto1"), &s);
        assert_eq!(reg.validate_ownership(None, &s), Ok(false));
    }

    #[test]
    fn validate_named_caller_is_loud() {
        let reg = OwnershipRegistry::new();
        let s = Subsystem::new("Intake");
        reg.acquire_ownership(Some("auto1"), &s);

        let err = reg.validate_ownership(Some("teleop"), &s).unwrap_err();
        assert_eq!(
            err,
            OwnershipError::Violation {
                owner: "teleop".into(),
                subsystem: "Intake".to_string(),
                current_owner: Some("auto1".into()),
            }
        );
        assert_eq!(reg.validate_ownership(Some("auto1"), &s), Ok(true));
    }

    #[test]
    fn validate_named_caller_on_unowned_is_violation() {
        let reg = OwnershipRegistry::new();
        let s = Subsystem::new("Intake");
        assert!(matches!(
            reg.validate_ownership(Some("auto1"), &s),
            Err(OwnershipError::Violation { current_owner: None, .. })
        ));
        assert_eq!(reg.validate_ownership(None, &s), Ok(true));
    }

    #[test]
    fn release_by_wrong_owner_rejected() {
        let reg = OwnershipRegistry::new();
        let s = Subsystem::new("Intake");
        reg.acquire_ownership(Some("auto1"), &s);
        assert!(!reg.release_ownership(Some("teleop"), &s));
        assert!(!reg.release_ownership(None, &s));
        assert_eq!(reg.owner(&s).unwrap(), "auto1");
    }

    #[test]
    fn null_release_of_unowned_is_noop_success() {
        let reg = OwnershipRegistry::new();
        let s = Subsystem::new("Intake");
        assert!(reg.release_ownership(None, &s));
        assert!(!reg.release_ownership(Some("auto1"), &s));
        assert_eq!(reg.owned_count(), 0);
    }

    #[test]
    fn release_all_only_touches_owner() {
        let reg = OwnershipRegistry::new();
        let a = Subsystem::new("A");
        let b = Subsystem::new("B");
        let c = Subsystem::new("C");
        reg.acquire_ownership(Some("auto1"), &a);
        reg.acquire_ownership(Some("auto1"), &b);
        reg.acquire_ownership(Some("teleop"), &c);

        assert_eq!(reg.release_all(None), 0);
        assert_eq!(reg.release_all(Some("auto1")), 2);
        assert!(!reg.is_owned(&a));
        assert!(!reg.is_owned(&b));
        assert_eq!(reg.owner(&c).unwrap(), "teleop");
    }

    #[test]
    fn snapshot_is_sorted_by_id() {
        let reg = OwnershipRegistry::new();
        let a = Subsystem::new("A");
        let b = Subsystem::new("B");
        reg.acquire_ownership(Some("x"), &b);
        reg.acquire_ownership(Some("y"), &a);

        let snap = reg.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].0, a.id());
        assert_eq!(snap[0].1, "y");
        assert_eq!(snap[1].0, b.id());
    }

    #[test]
    fn global_is_a_single_instance() {
        assert!(std::ptr::eq(
            OwnershipRegistry::global(),
            OwnershipRegistry::global()
        ));
    }
}
