//! Capability contexts.
//!
//! A [`CapabilityContext`] is the immutable set of capabilities available to
//! one unit of execution. Contexts form a forest: a derived context records
//! its parent's id but never holds a reference to the parent itself, and it
//! copies the parent's tokens at derivation time. Granting more authority
//! always produces a new context.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::thread::ThreadId;

use crate::kind::CapabilityKind;
use crate::set::CapabilitySet;
use crate::token::CapabilityToken;
use crate::types::{ContextId, Timestamp};

/// How the unit of execution owning a context was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionKind {
    /// A call chain on the current thread.
    Synchronous,
    /// A task handed to a worker pool or async executor.
    Pooled,
    /// A callback invoked by some later trigger.
    Callback,
    /// An inbound request admitted by a server-style host.
    Request,
}

impl fmt::Display for ExecutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synchronous => write!(f, "synchronous"),
            Self::Pooled => write!(f, "pooled"),
            Self::Callback => write!(f, "callback"),
            Self::Request => write!(f, "request"),
        }
    }
}

/// Immutable set of capabilities active for a unit of execution.
#[derive(Debug)]
pub struct CapabilityContext {
    id: ContextId,
    parent: Option<ContextId>,
    held: CapabilitySet,
    execution_kind: ExecutionKind,
    owner_thread: ThreadId,
    created_at: Timestamp,
}

impl CapabilityContext {
    fn build(
        parent: Option<ContextId>,
        held: CapabilitySet,
        execution_kind: ExecutionKind,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: ContextId::next(),
            parent,
            held,
            execution_kind,
            owner_thread: std::thread::current().id(),
            created_at: Timestamp::now(),
        })
    }

    /// Create a root context (no parent) holding `tokens`.
    #[must_use]
    pub fn root(
        execution_kind: ExecutionKind,
        tokens: impl IntoIterator<Item = CapabilityToken>,
    ) -> Arc<Self> {
        Self::build(None, tokens.into_iter().collect(), execution_kind)
    }

    /// Create a synchronous root context holding `tokens`.
    #[must_use]
    pub fn synchronous(tokens: impl IntoIterator<Item = CapabilityToken>) -> Arc<Self> {
        Self::root(ExecutionKind::Synchronous, tokens)
    }

    /// Derive a child holding this context's tokens plus `additional`.
    ///
    /// The child keeps this context's execution kind. `self` is not modified.
    #[must_use]
    pub fn derive(&self, additional: impl IntoIterator<Item = CapabilityToken>) -> Arc<Self> {
        self.derive_as(additional, self.execution_kind)
    }

    /// Derive a child of the given execution kind.
    #[must_use]
    pub fn derive_as(
        &self,
        additional: impl IntoIterator<Item = CapabilityToken>,
        execution_kind: ExecutionKind,
    ) -> Arc<Self> {
        let child = Self::build(Some(self.id), self.held.union(additional), execution_kind);
        tracing::debug!(
            parent = %self.id,
            context_id = %child.id,
            kind = %execution_kind,
            held = child.held.len(),
            "derived capability context"
        );
        child
    }

    /// Context identifier.
    #[must_use]
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Identifier of the context this one was derived from.
    #[must_use]
    pub fn parent_id(&self) -> Option<ContextId> {
        self.parent
    }

    /// Capabilities held by this context.
    #[must_use]
    pub fn held_capabilities(&self) -> &CapabilitySet {
        &self.held
    }

    /// Held kinds in sorted order.
    #[must_use]
    pub fn held_kinds(&self) -> Vec<CapabilityKind> {
        self.held.kinds()
    }

    /// Whether any token of `kind` is held.
    #[must_use]
    pub fn holds(&self, kind: &CapabilityKind) -> bool {
        self.held.contains_kind(kind)
    }

    /// Whether a held token grants `kind` for `resource`.
    #[must_use]
    pub fn grants(&self, kind: &CapabilityKind, resource: Option<&str>) -> bool {
        self.held.grants(kind, resource)
    }

    /// How the owning unit of execution was started.
    #[must_use]
    pub fn execution_kind(&self) -> ExecutionKind {
        self.execution_kind
    }

    /// Thread the context was created on.
    #[must_use]
    pub fn owner_thread(&self) -> ThreadId {
        self.owner_thread
    }

    /// Creation time.
    #[must_use]
    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Tracing span carrying this context's identity.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "capability_context",
            context_id = %self.id,
            parent = self.parent.map(ContextId::as_u64),
            kind = %self.execution_kind,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(name: &str) -> CapabilityToken {
        CapabilityToken::parse(name).unwrap()
    }

    fn kind(name: &str) -> CapabilityKind {
        CapabilityKind::new(name).unwrap()
    }

    #[test]
    fn test_root_context() {
        let ctx = CapabilityContext::synchronous([token("FILE_READ")]);
        assert!(ctx.parent_id().is_none());
        assert_eq!(ctx.execution_kind(), ExecutionKind::Synchronous);
        assert_eq!(ctx.owner_thread(), std::thread::current().id());
        assert!(ctx.holds(&kind("FILE_READ")));
        assert!(!ctx.holds(&kind("FILE_WRITE")));
    }

    #[test]
    fn test_derive_is_union_and_does_not_mutate_parent() {
        let parent = CapabilityContext::synchronous([token("FILE_READ")]);
        let child = parent.derive([token("NET_CONNECT")]);

        assert_eq!(child.parent_id(), Some(parent.id()));
        assert_ne!(child.id(), parent.id());
        assert_eq!(child.held_kinds(), vec![kind("FILE_READ"), kind("NET_CONNECT")]);
        assert_eq!(parent.held_kinds(), vec![kind("FILE_READ")]);
    }

    #[test]
    fn test_repeated_empty_derivation_is_idempotent() {
        let parent = CapabilityContext::synchronous([token("FILE_READ"), token("NET_CONNECT")]);
        let first = parent.derive([]);
        let second = parent.derive([]);

        assert_eq!(first.held_capabilities(), parent.held_capabilities());
        assert_eq!(second.held_capabilities(), parent.held_capabilities());
        assert_ne!(first.id(), second.id());
        assert_eq!(parent.held_capabilities().len(), 2);
    }

    #[test]
    fn test_derive_as_sets_kind() {
        let parent = CapabilityContext::synchronous([]);
        let pooled = parent.derive_as([], ExecutionKind::Pooled);
        assert_eq!(pooled.execution_kind(), ExecutionKind::Pooled);
        assert_eq!(pooled.derive([]).execution_kind(), ExecutionKind::Pooled);
    }

    #[test]
    fn test_child_does_not_keep_parent_alive() {
        let parent = CapabilityContext::synchronous([token("FILE_READ")]);
        let weak = Arc::downgrade(&parent);
        let child = parent.derive([]);
        drop(parent);

        assert!(weak.upgrade().is_none());
        assert!(child.holds(&kind("FILE_READ")));
    }

    #[test]
    fn test_execution_kind_display() {
        assert_eq!(ExecutionKind::Callback.to_string(), "callback");
        assert_eq!(
            serde_json::to_string(&ExecutionKind::Request).unwrap(),
            "\"request\""
        );
    }
}
