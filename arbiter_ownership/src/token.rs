//! Owner tokens.
//!
//! A token is an opaque string chosen by the caller. The registry compares
//! tokens by value and never looks inside them. Absence of a token (the
//! "null caller") is expressed as `Option::None` at the API boundary and is
//! never stored.

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Immutable owner token. Cloning shares the underlying string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerToken(Arc<str>);

impl OwnerToken {
    /// Create a token from any string-like value.
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self(token.into())
    }

    /// Token contents.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for OwnerToken {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for OwnerToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for OwnerToken {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OwnerToken {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for OwnerToken {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl PartialEq<str> for OwnerToken {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for OwnerToken {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Display for OwnerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
