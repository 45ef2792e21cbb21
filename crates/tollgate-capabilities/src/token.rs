//! Capability tokens.
//!
//! A capability token names a kind of privileged operation and, optionally,
//! the resources it may be exercised against. Tokens are:
//! - Immutable once created (fields are only reachable through accessors)
//! - Identified by a unique [`TokenId`]
//! - Timestamped at issue

use serde::{Deserialize, Serialize};

use crate::error::CapabilityResult;
use crate::kind::CapabilityKind;
use crate::pattern::ResourcePattern;
use crate::types::{Timestamp, TokenId};

/// A capability token granting one kind of operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityToken {
    id: TokenId,
    kind: CapabilityKind,
    resource_pattern: Option<ResourcePattern>,
    issued_at: Timestamp,
}

impl CapabilityToken {
    /// Create a token for `kind` that applies to every resource.
    #[must_use]
    pub fn new(kind: CapabilityKind) -> Self {
        Self::create(kind, None)
    }

    /// Create a token for `kind` restricted to resources matching `pattern`.
    #[must_use]
    pub fn scoped(kind: CapabilityKind, pattern: ResourcePattern) -> Self {
        Self::create(kind, Some(pattern))
    }

    /// Parse `kind` and create an unrestricted token.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::InvalidKind`](crate::CapabilityError::InvalidKind)
    /// if the identifier is invalid.
    pub fn parse(kind: &str) -> CapabilityResult<Self> {
        Ok(Self::new(CapabilityKind::new(kind)?))
    }

    fn create(kind: CapabilityKind, resource_pattern: Option<ResourcePattern>) -> Self {
        Self {
            id: TokenId::new(),
            kind,
            resource_pattern,
            issued_at: Timestamp::now(),
        }
    }

    /// Unique token identifier.
    #[must_use]
    pub fn id(&self) -> &TokenId {
        &self.id
    }

    /// Kind of operation this token grants.
    #[must_use]
    pub fn kind(&self) -> &CapabilityKind {
        &self.kind
    }

    /// Resource restriction, if any.
    #[must_use]
    pub fn resource_pattern(&self) -> Option<&ResourcePattern> {
        self.resource_pattern.as_ref()
    }

    /// When the token was issued.
    #[must_use]
    pub fn issued_at(&self) -> Timestamp {
        self.issued_at
    }

    /// Check if this token grants `kind`, optionally for a concrete `resource`.
    ///
    /// With no resource the check is by kind only. With a resource, a token
    /// carrying a pattern must match it; a token without a pattern covers
    /// every resource of its kind.
    #[must_use]
    pub fn grants(&self, kind: &CapabilityKind, resource: Option<&str>) -> bool {
        if &self.kind != kind {
            return false;
        }
        match (resource, &self.resource_pattern) {
            (Some(resource), Some(pattern)) => pattern.matches(resource),
            _ => true,
        }
    }
}

impl PartialEq for CapabilityToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CapabilityToken {}

impl std::hash::Hash for CapabilityToken {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for CapabilityToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.resource_pattern {
            Some(pattern) => write!(f, "{}({})", self.kind, pattern),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Builder for creating capability tokens with fluent API.
pub struct TokenBuilder {
    kind: CapabilityKind,
    resource_pattern: Option<ResourcePattern>,
}

impl TokenBuilder {
    /// Create a new token builder.
    #[must_use]
    pub fn new(kind: CapabilityKind) -> Self {
        Self {
            kind,
            resource_pattern: None,
        }
    }

    /// Restrict the token to resources matching `pattern`.
    #[must_use]
    pub fn resource(mut self, pattern: ResourcePattern) -> Self {
        self.resource_pattern = Some(pattern);
        self
    }

    /// Parse and set a resource pattern.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::InvalidPattern`](crate::CapabilityError::InvalidPattern)
    /// if the pattern is invalid.
    pub fn resource_glob(self, pattern: &str) -> CapabilityResult<Self> {
        Ok(self.resource(ResourcePattern::new(pattern)?))
    }

    /// Build the token.
    #[must_use]
    pub fn build(self) -> CapabilityToken {
        CapabilityToken::create(self.kind, self.resource_pattern)
    }
}
