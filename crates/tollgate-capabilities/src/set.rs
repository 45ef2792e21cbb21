//! Indexed set of held capability tokens.

use std::collections::BTreeMap;

use crate::kind::CapabilityKind;
use crate::token::CapabilityToken;

/// Tokens held by a context, indexed by kind.
///
/// Tokens are deduplicated by id. Lookups by kind do not scan unrelated
/// tokens, so checking a requirement list costs O(|required| · log |kinds|).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    by_kind: BTreeMap<CapabilityKind, Vec<CapabilityToken>>,
}

impl CapabilitySet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a token. Returns `false` if a token with the same id was already held.
    pub(crate) fn insert(&mut self, token: CapabilityToken) -> bool {
        let tokens = self.by_kind.entry(token.kind().clone()).or_default();
        if tokens.contains(&token) {
            return false;
        }
        tokens.push(token);
        true
    }

    /// Union of `self` and `additional`, leaving `self` untouched.
    #[must_use]
    pub fn union(&self, additional: impl IntoIterator<Item = CapabilityToken>) -> Self {
        let mut merged = self.clone();
        for token in additional {
            merged.insert(token);
        }
        merged
    }

    /// Check whether any token of `kind` is held.
    #[must_use]
    pub fn contains_kind(&self, kind: &CapabilityKind) -> bool {
        self.by_kind.get(kind).is_some_and(|tokens| !tokens.is_empty())
    }

    /// Check whether a held token grants `kind` for `resource`.
    #[must_use]
    pub fn grants(&self, kind: &CapabilityKind, resource: Option<&str>) -> bool {
        self.by_kind
            .get(kind)
            .is_some_and(|tokens| tokens.iter().any(|t| t.grants(kind, resource)))
    }

    /// Held kinds in sorted order.
    #[must_use]
    pub fn kinds(&self) -> Vec<CapabilityKind> {
        self.by_kind.keys().cloned().collect()
    }

    /// Iterate over every held token.
    pub fn iter(&self) -> impl Iterator<Item = &CapabilityToken> {
        self.by_kind.values().flatten()
    }

    /// Number of held tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_kind.values().map(Vec::len).sum()
    }

    /// Whether no tokens are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }
}

impl FromIterator<CapabilityToken> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = CapabilityToken>>(iter: I) -> Self {
        Self::new().union(iter)
    }
}
