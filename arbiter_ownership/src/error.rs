//! Error types for ownership arbitration.
//!
//! Ordinary contention is reported as `bool` by the registry. Only misuse by
//! a registered owner, and the scoped-acquisition helper, produce an
//! [`OwnershipError`].

use thiserror::Error;

use crate::token::OwnerToken;

/// Errors raised by ownership checks.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OwnershipError {
    /// A named owner failed an ownership check it relied on.
    ///
    /// Signals a sequencing bug in the caller: it used a subsystem without
    /// acquiring it, or its ownership was released behind its back.
    #[error("{owner} does not have exclusive ownership of subsystem {subsystem} (held by {})", fmt_holder(.current_owner))]
    Violation {
        /// Token that failed the check.
        owner: OwnerToken,
        /// Subsystem name.
        subsystem: String,
        /// Holder at the time of the check.
        current_owner: Option<OwnerToken>,
    },

    /// Scoped acquisition failed because another owner holds the subsystem.
    #[error("subsystem {subsystem} is owned by {current_owner}, {owner} cannot acquire it")]
    Contended {
        /// Token that requested ownership.
        owner: OwnerToken,
        /// Subsystem name.
        subsystem: String,
        /// Current holder.
        current_owner: OwnerToken,
    },

    /// Scoped acquisition requires a named owner.
    #[error("scoped acquisition of subsystem {subsystem} requires an owner token")]
    Anonymous {
        /// Subsystem name.
        subsystem: String,
    },
}

fn fmt_holder(holder: &Option<OwnerToken>) -> String {
    match holder {
        Some(owner) => owner.to_string(),
        None => "nobody".to_string(),
    }
}

/// Result type for ownership operations.
pub type OwnershipResult<T> = Result<T, OwnershipError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violation_message_names_both_owners() {
        let err = OwnershipError::Violation {
            owner: "teleop".into(),
            subsystem: "Elevator".to_string(),
            current_owner: Some("auto1".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("teleop"));
        assert!(msg.contains("Elevator"));
        assert!(msg.contains("auto1"));
    }

    #[test]
    fn violation_message_unowned() {
        let err = OwnershipError::Violation {
            owner: "teleop".into(),
            subsystem: "Elevator".to_string(),
            current_owner: None,
        };
        assert!(err.to_string().contains("held by nobody"));
    }
}
