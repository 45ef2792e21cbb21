//! Capability kind identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CapabilityError, CapabilityResult};

/// Longest accepted kind identifier.
const MAX_KIND_LEN: usize = 128;

/// Name of a kind of privileged operation, e.g. `FILE_READ`.
///
/// Kinds are compared exactly. Accepted characters are ASCII letters, digits,
/// `_`, `.`, `:` and `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CapabilityKind(String);

impl CapabilityKind {
    /// Create a kind from an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::InvalidKind`] if the identifier is empty,
    /// too long, or contains characters outside the accepted set.
    pub fn new(kind: impl Into<String>) -> CapabilityResult<Self> {
        let kind = kind.into();
        if kind.is_empty() {
            return Err(CapabilityError::InvalidKind {
                kind,
                reason: "kind must not be empty".to_string(),
            });
        }
        if kind.len() > MAX_KIND_LEN {
            return Err(CapabilityError::InvalidKind {
                kind,
                reason: format!("kind exceeds {MAX_KIND_LEN} characters"),
            });
        }
        let invalid = kind
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ':' | '-')));
        if let Some(bad) = invalid {
            return Err(CapabilityError::InvalidKind {
                reason: format!("unexpected character {bad:?}"),
                kind,
            });
        }
        Ok(Self(kind))
    }

    /// Get the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CapabilityKind {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for CapabilityKind {
    type Error = CapabilityError;

    fn try_from(value: &str) -> CapabilityResult<Self> {
        Self::new(value)
    }
}

impl<'de> Deserialize<'de> for CapabilityKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let kind = String::deserialize(deserializer)?;
        Self::new(kind).map_err(serde::de::Error::custom)
    }
}

/// Collapse duplicate kinds while keeping first-occurrence order.
pub(crate) fn dedup_preserving_order(
    kinds: impl IntoIterator<Item = CapabilityKind>,
) -> Vec<CapabilityKind> {
    let mut out: Vec<CapabilityKind> = Vec::new();
    for kind in kinds {
        if !out.contains(&kind) {
            out.push(kind);
        }
    }
    out
}
