//! Diagnostic registry of live capability contexts.
//!
//! The registry holds weak references only. Registering a context never
//! extends its lifetime, and lookups of a dropped context return `None`.
//! Hosts use it to answer "which contexts exist right now and what do they
//! hold" without walking thread-local state.
//!
//! Dead entries are swept on insert whenever the map doubles past its last
//! live size, so the registry stays proportional to the live context count.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

use crate::context::{CapabilityContext, ExecutionKind};
use crate::error::{CapabilityError, CapabilityResult};
use crate::kind::CapabilityKind;
use crate::types::{ContextId, Timestamp};

/// Point-in-time description of a live context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSummary {
    /// Context identifier.
    pub id: ContextId,
    /// Parent context, if derived.
    pub parent: Option<ContextId>,
    /// How the owning unit of execution was started.
    pub execution_kind: ExecutionKind,
    /// Held kinds in sorted order.
    pub held: Vec<CapabilityKind>,
    /// Creation time.
    pub created_at: Timestamp,
    /// Thread the context was created on, as its debug rendering.
    pub owner_thread: String,
}

impl ContextSummary {
    fn of(context: &CapabilityContext) -> Self {
        Self {
            id: context.id(),
            parent: context.parent_id(),
            execution_kind: context.execution_kind(),
            held: context.held_kinds(),
            created_at: context.created_at(),
            owner_thread: format!("{:?}", context.owner_thread()),
        }
    }
}

/// Entry count below which `register` never sweeps.
const MIN_SWEEP_THRESHOLD: usize = 64;

#[derive(Debug)]
struct Entries {
    map: HashMap<ContextId, Weak<CapabilityContext>>,
    sweep_at: usize,
}

impl Default for Entries {
    fn default() -> Self {
        Self {
            map: HashMap::new(),
            sweep_at: MIN_SWEEP_THRESHOLD,
        }
    }
}

impl Entries {
    /// Remove dead entries and reset the next sweep point. Returns how many
    /// were removed.
    fn sweep(&mut self) -> usize {
        let before = self.map.len();
        self.map.retain(|_, weak| weak.strong_count() > 0);
        self.sweep_at = self.map.len().saturating_mul(2).max(MIN_SWEEP_THRESHOLD);
        before.saturating_sub(self.map.len())
    }
}

/// Weak index of contexts by id.
#[derive(Debug, Default)]
pub struct ContextRegistry {
    entries: RwLock<Entries>,
}

impl ContextRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `context`, sweeping dead entries once the map has grown past
    /// twice its last live size.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::RegistryPoisoned`] if the lock is poisoned.
    pub fn register(&self, context: &Arc<CapabilityContext>) -> CapabilityResult<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| CapabilityError::RegistryPoisoned(e.to_string()))?;
        if entries.map.len() >= entries.sweep_at {
            let removed = entries.sweep();
            tracing::trace!(removed, live = entries.map.len(), "swept capability registry");
        }
        entries.map.insert(context.id(), Arc::downgrade(context));
        Ok(())
    }

    /// Look up a context that is still alive.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::RegistryPoisoned`] if the lock is poisoned.
    pub fn get(&self, id: ContextId) -> CapabilityResult<Option<Arc<CapabilityContext>>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| CapabilityError::RegistryPoisoned(e.to_string()))?;
        Ok(entries.map.get(&id).and_then(Weak::upgrade))
    }

    /// Whether the context with `id` is registered and still alive.
    #[must_use]
    pub fn is_live(&self, id: ContextId) -> bool {
        matches!(self.get(id), Ok(Some(_)))
    }

    /// Summaries of every live context, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::RegistryPoisoned`] if the lock is poisoned.
    pub fn snapshot(&self) -> CapabilityResult<Vec<ContextSummary>> {
        let entries = self
            .entries
            .read()
            .map_err(|e| CapabilityError::RegistryPoisoned(e.to_string()))?;
        let mut live: Vec<ContextSummary> = entries
            .map
            .values()
            .filter_map(Weak::upgrade)
            .map(|ctx| ContextSummary::of(&ctx))
            .collect();
        live.sort_by_key(|s| s.id);
        Ok(live)
    }

    /// Drop entries whose context no longer exists. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::RegistryPoisoned`] if the lock is poisoned.
    pub fn prune(&self) -> CapabilityResult<usize> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| CapabilityError::RegistryPoisoned(e.to_string()))?;
        let removed = entries.sweep();
        if removed > 0 {
            tracing::debug!(removed, "pruned dead capability contexts");
        }
        Ok(removed)
    }

    /// Number of entries, including dead ones not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.map.len())
    }

    /// Whether the registry has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
