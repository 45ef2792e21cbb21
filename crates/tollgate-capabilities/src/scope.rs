//! The current capability context of a thread.
//!
//! Each thread has exactly one slot. It starts empty, is set by [`enter`],
//! and is restored to its previous value when the returned [`ContextGuard`]
//! drops. Slots are never shared between threads: a worker thread, a
//! callback invocation, or a request handler sees only what was explicitly
//! entered on it (see [`crate::propagate`]).

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::context::CapabilityContext;
use crate::error::{CapabilityError, CapabilityResult};
use crate::kind::CapabilityKind;

thread_local! {
    static CURRENT: RefCell<Option<Arc<CapabilityContext>>> = const { RefCell::new(None) };
}

/// The context currently active on this thread, if any.
#[must_use]
pub fn current() -> Option<Arc<CapabilityContext>> {
    CURRENT.with(|slot| slot.borrow().clone())
}

/// Make `context` current on this thread until the guard drops.
///
/// Guards nest: dropping the inner guard restores the outer context.
#[must_use = "the context is exited as soon as the guard is dropped"]
pub fn enter(context: Arc<CapabilityContext>) -> ContextGuard {
    tracing::trace!(context_id = %context.id(), "entering capability context");
    let previous = CURRENT.with(|slot| slot.replace(Some(context)));
    ContextGuard {
        previous,
        _not_send: PhantomData,
    }
}

/// Clear this thread's slot until the guard drops.
///
/// Used when running work that must not observe whatever context the
/// executing thread happens to carry.
#[must_use = "the previous context is restored as soon as the guard is dropped"]
pub fn clear() -> ContextGuard {
    let previous = CURRENT.with(|slot| slot.replace(None));
    ContextGuard {
        previous,
        _not_send: PhantomData,
    }
}

/// Enter `context` if present, otherwise clear the slot.
pub(crate) fn enter_or_clear(context: Option<&Arc<CapabilityContext>>) -> ContextGuard {
    match context {
        Some(context) => enter(Arc::clone(context)),
        None => clear(),
    }
}

/// Run `f` with `context` current, restoring the previous context afterwards.
///
/// The previous context is restored even if `f` panics.
pub fn with_context<R>(context: Arc<CapabilityContext>, f: impl FnOnce() -> R) -> R {
    let _guard = enter(context);
    f()
}

/// RAII guard returned by [`enter`].
///
/// The guard is `!Send`: it must drop on the thread whose slot it changed.
pub struct ContextGuard {
    previous: Option<Arc<CapabilityContext>>,
    _not_send: PhantomData<*const ()>,
}

impl std::fmt::Debug for ContextGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextGuard")
            .field("restores", &self.previous.as_ref().map(|c| c.id()))
            .finish()
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        tracing::trace!(
            restores = previous.as_ref().map(|c| c.id().as_u64()),
            "leaving capability context"
        );
        // The slot may already be gone during thread teardown.
        let _ = CURRENT.try_with(|slot| {
            *slot.borrow_mut() = previous;
        });
    }
}

/// Check that the current context holds every kind in `required`.
///
/// An empty requirement list always succeeds, with or without a context.
///
/// # Errors
///
/// - [`CapabilityError::NoActiveContext`] if `required` is non-empty and no
///   context is active.
/// - [`CapabilityError::MissingCapabilities`] listing every unsatisfied kind.
pub fn check_capabilities(required: &[CapabilityKind]) -> CapabilityResult<()> {
    check_capabilities_for(required, None)
}

/// Like [`check_capabilities`], additionally requiring each held token to
/// cover `resource` when one is given.
///
/// # Errors
///
/// Same as [`check_capabilities`]; `resource` is carried in the
/// [`CapabilityError::MissingCapabilities`] payload.
pub fn check_capabilities_for(
    required: &[CapabilityKind],
    resource: Option<&str>,
) -> CapabilityResult<()> {
    if required.is_empty() {
        return Ok(());
    }

    let Some(context) = current() else {
        tracing::debug!(
            required = ?required.iter().map(CapabilityKind::as_str).collect::<Vec<_>>(),
            "capability check with no active context"
        );
        return Err(CapabilityError::NoActiveContext {
            missing: required.to_vec(),
        });
    };

    let missing: Vec<CapabilityKind> = required
        .iter()
        .filter(|kind| !context.grants(kind, resource))
        .cloned()
        .collect();

    if missing.is_empty() {
        tracing::trace!(context_id = %context.id(), "capability check passed");
        return Ok(());
    }

    tracing::debug!(
        context_id = %context.id(),
        missing = ?missing.iter().map(CapabilityKind::as_str).collect::<Vec<_>>(),
        resource,
        "capability check failed"
    );
    Err(CapabilityError::MissingCapabilities {
        missing,
        available: context.held_kinds(),
        resource: resource.map(str::to_string),
    })
}
