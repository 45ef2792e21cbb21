//! Carrying capability contexts across execution boundaries.
//!
//! A thread's slot is never inherited implicitly. Each helper here captures
//! the context at the moment work is handed off and re-establishes a
//! derived child of it where the work actually runs:
//!
//! - [`wrap_task`], [`spawn_blocking`] and [`spawn`] for pools and executors
//! - [`Callback`] for deferred invocation by an unrelated trigger
//! - [`RequestScope`] for fresh, parentless authority per inbound request
//!
//! When nothing was captured the work runs with the slot cleared, so a
//! reused worker thread never leaks a stale context into the next task.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::context::{CapabilityContext, ExecutionKind};
use crate::error::CapabilityResult;
use crate::registry::ContextRegistry;
use crate::scope::{self, ContextGuard};
use crate::token::CapabilityToken;

/// The context current on a thread at one moment.
#[derive(Debug, Clone, Default)]
pub struct ContextSnapshot {
    captured: Option<Arc<CapabilityContext>>,
    registry: Option<Arc<ContextRegistry>>,
}

impl ContextSnapshot {
    /// Capture this thread's current context.
    #[must_use]
    pub fn capture() -> Self {
        Self {
            captured: scope::current(),
            registry: None,
        }
    }

    /// Register every child derived from this snapshot in `registry`.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<ContextRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// The captured context, if one was active.
    #[must_use]
    pub fn captured(&self) -> Option<&Arc<CapabilityContext>> {
        self.captured.as_ref()
    }

    /// Derive the child that work resumed from this snapshot runs under.
    fn child(&self, kind: ExecutionKind) -> Option<Arc<CapabilityContext>> {
        let child = self.captured.as_ref()?.derive_as([], kind);
        if let Some(registry) = &self.registry
            && let Err(e) = registry.register(&child)
        {
            tracing::warn!(error = %e, context_id = %child.id(), "failed to register context");
        }
        Some(child)
    }

    /// Run `f` on this thread under a fresh child of the captured context.
    ///
    /// Whatever was current before is restored afterwards, even on panic.
    pub fn run<R>(&self, kind: ExecutionKind, f: impl FnOnce() -> R) -> R {
        let child = self.child(kind);
        let _guard = scope::enter_or_clear(child.as_ref());
        f()
    }

    /// Attach this snapshot to a future, entering a pooled child around each poll.
    #[must_use]
    pub fn attach<F: Future>(&self, future: F) -> WithContext<F> {
        WithContext {
            inner: Box::pin(future),
            context: self.child(ExecutionKind::Pooled),
        }
    }
}

/// Wrap a task for submission to a worker pool.
///
/// The submitting thread's context is captured now; the returned closure
/// runs `task` under a pooled child of it on whichever thread calls it.
pub fn wrap_task<F, R>(task: F) -> impl FnOnce() -> R + Send + 'static
where
    F: FnOnce() -> R + Send + 'static,
{
    let snapshot = ContextSnapshot::capture();
    move || snapshot.run(ExecutionKind::Pooled, task)
}

/// Run a blocking task on tokio's blocking pool under the caller's context.
pub fn spawn_blocking<F, R>(task: F) -> tokio::task::JoinHandle<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(wrap_task(task))
}

/// Spawn a future on the current tokio runtime under the caller's context.
///
/// # Panics
///
/// Panics if called outside a tokio runtime, as [`tokio::spawn`] does.
pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(ContextSnapshot::capture().attach(future))
}

/// Future adapter that enters a fixed context around every poll.
///
/// The context is never held across a suspension point, so the task may
/// migrate between worker threads freely.
pub struct WithContext<F> {
    inner: Pin<Box<F>>,
    context: Option<Arc<CapabilityContext>>,
}

impl<F> WithContext<F> {
    /// Context entered while the inner future is polled.
    #[must_use]
    pub fn context(&self) -> Option<&Arc<CapabilityContext>> {
        self.context.as_ref()
    }
}

impl<F> std::fmt::Debug for WithContext<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WithContext")
            .field("context", &self.context.as_ref().map(|c| c.id()))
            .finish_non_exhaustive()
    }
}

impl<F: Future> Future for WithContext<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let _guard = scope::enter_or_clear(this.context.as_ref());
        this.inner.as_mut().poll(cx)
    }
}

/// A callable bound to the context that was current when it was registered.
///
/// Invocation enters a callback child of the registration-time context and
/// ignores whatever the invoking thread carries.
pub struct Callback<F> {
    f: F,
    snapshot: ContextSnapshot,
}

impl<F> Callback<F> {
    /// Capture the current context and bind it to `f`.
    pub fn register(f: F) -> Self {
        let snapshot = ContextSnapshot::capture();
        tracing::debug!(
            context_id = snapshot.captured().map(|c| c.id().as_u64()),
            "registered callback"
        );
        Self { f, snapshot }
    }

    /// Bind `f` to an explicit snapshot instead of the current context.
    pub fn with_snapshot(f: F, snapshot: ContextSnapshot) -> Self {
        Self { f, snapshot }
    }

    /// The context captured at registration.
    #[must_use]
    pub fn captured(&self) -> Option<&Arc<CapabilityContext>> {
        self.snapshot.captured()
    }

    /// Invoke a zero-argument callback.
    pub fn invoke<R>(&self) -> R
    where
        F: Fn() -> R,
    {
        self.snapshot.run(ExecutionKind::Callback, &self.f)
    }

    /// Invoke a single-argument callback.
    pub fn invoke_with<A, R>(&self, arg: A) -> R
    where
        F: Fn(A) -> R,
    {
        self.snapshot.run(ExecutionKind::Callback, || (self.f)(arg))
    }
}

impl<F> std::fmt::Debug for Callback<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callback")
            .field("captured", &self.captured().map(|c| c.id()))
            .finish_non_exhaustive()
    }
}

/// Authority admitted for one inbound request.
///
/// The context is a root: nothing current on the admitting thread flows in.
#[derive(Debug, Clone)]
pub struct RequestScope {
    context: Arc<CapabilityContext>,
}

impl RequestScope {
    /// Admit a request carrying `tokens`.
    #[must_use]
    pub fn admit(tokens: impl IntoIterator<Item = CapabilityToken>) -> Self {
        let context = CapabilityContext::root(ExecutionKind::Request, tokens);
        tracing::debug!(
            context_id = %context.id(),
            held = context.held_capabilities().len(),
            "admitted request"
        );
        Self { context }
    }

    /// Admit a request and record its context in `registry`.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::RegistryPoisoned`](crate::CapabilityError::RegistryPoisoned)
    /// if the registry lock is poisoned.
    pub fn admit_with_registry(
        tokens: impl IntoIterator<Item = CapabilityToken>,
        registry: &ContextRegistry,
    ) -> CapabilityResult<Self> {
        let scope = Self::admit(tokens);
        registry.register(&scope.context)?;
        Ok(scope)
    }

    /// The request's root context.
    #[must_use]
    pub fn context(&self) -> &Arc<CapabilityContext> {
        &self.context
    }

    /// Enter the request context on this thread until the guard drops.
    #[must_use = "the request context is exited as soon as the guard is dropped"]
    pub fn enter(&self) -> ContextGuard {
        scope::enter(Arc::clone(&self.context))
    }

    /// Run `f` with the request context current.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let _span = self.context.span().entered();
        scope::with_context(Arc::clone(&self.context), f)
    }

    /// Attach the request context to a future handling the request.
    #[must_use]
    pub fn attach<F: Future>(&self, future: F) -> WithContext<F> {
        WithContext {
            inner: Box::pin(future),
            context: Some(Arc::clone(&self.context)),
        }
    }
}

/// Admit `tokens` and run `f` under the resulting request context.
pub fn request_scope<R>(
    tokens: impl IntoIterator<Item = CapabilityToken>,
    f: impl FnOnce() -> R,
) -> R {
    RequestScope::admit(tokens).run(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::CapabilityKind;
    use std::sync::mpsc;

    fn token(name: &str) -> CapabilityToken {
        CapabilityToken::parse(name).unwrap()
    }

    fn kind(name: &str) -> CapabilityKind {
        CapabilityKind::new(name).unwrap()
    }

    type Job = Box<dyn FnOnce() + Send>;

    /// Single reused worker thread standing in for a pool.
    fn worker() -> (mpsc::Sender<Job>, std::thread::JoinHandle<()>) {
        let (tx, rx) = mpsc::channel::<Job>();
        let handle = std::thread::spawn(move || {
            for job in rx {
                job();
            }
        });
        (tx, handle)
    }

    #[test]
    fn test_wrap_task_derives_pooled_child() {
        let parent = CapabilityContext::synchronous([token("FILE_READ")]);
        let task = scope::with_context(Arc::clone(&parent), || {
            wrap_task(|| {
                let ctx = scope::current().unwrap();
                (ctx.parent_id(), ctx.execution_kind(), ctx.holds(&kind("FILE_READ")))
            })
        });

        let (parent_id, exec_kind, holds) = std::thread::spawn(task).join().unwrap();
        assert_eq!(parent_id, Some(parent.id()));
        assert_eq!(exec_kind, ExecutionKind::Pooled);
        assert!(holds);
    }

    #[test]
    fn test_reused_worker_does_not_leak_context() {
        let (tx, handle) = worker();
        let (seen_tx, seen_rx) = mpsc::channel();

        let with_ctx = scope::with_context(CapabilityContext::synchronous([token("A")]), || {
            let seen = seen_tx.clone();
            wrap_task(move || seen.send(scope::current().map(|c| c.held_kinds())).unwrap())
        });
        let without_ctx = {
            let seen = seen_tx.clone();
            wrap_task(move || seen.send(scope::current().map(|c| c.held_kinds())).unwrap())
        };

        tx.send(Box::new(with_ctx)).unwrap();
        tx.send(Box::new(without_ctx)).unwrap();
        drop(tx);
        handle.join().unwrap();

        assert_eq!(seen_rx.recv().unwrap(), Some(vec![kind("A")]));
        assert_eq!(seen_rx.recv().unwrap(), None);
    }

    #[test]
    fn test_task_panic_restores_worker_slot() {
        let task = scope::with_context(CapabilityContext::synchronous([token("A")]), || {
            wrap_task::<_, ()>(|| panic!("task failed"))
        });
        let observed = std::thread::spawn(move || {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task));
            (result.is_err(), scope::current().is_none())
        })
        .join()
        .unwrap();
        assert_eq!(observed, (true, true));
    }

    #[test]
    fn test_callback_uses_registration_context() {
        let registered = CapabilityContext::synchronous([token("UI_DRAW")]);
        let callback = scope::with_context(Arc::clone(&registered), || {
            Callback::register(|| {
                let ctx = scope::current().unwrap();
                (ctx.parent_id(), ctx.execution_kind(), ctx.held_kinds())
            })
        });

        // Invoked later, with no context of its own.
        assert!(scope::current().is_none());
        let (parent, exec_kind, held) = callback.invoke();
        assert_eq!(parent, Some(registered.id()));
        assert_eq!(exec_kind, ExecutionKind::Callback);
        assert_eq!(held, vec![kind("UI_DRAW")]);
        assert!(scope::current().is_none());
    }

    #[test]
    fn test_callback_ignores_invoker_authority() {
        let callback = Callback::register(|n: u32| (n, scope::current().is_none()));
        let invoker = CapabilityContext::synchronous([token("FILE_WRITE")]);
        let result = scope::with_context(invoker, || callback.invoke_with(7));
        assert_eq!(result, (7, true));
    }

    #[test]
    fn test_request_scope_is_fresh_root() {
        let ambient = CapabilityContext::synchronous([token("ADMIN")]);
        let (parent, held) = scope::with_context(ambient, || {
            request_scope([token("DB_READ")], || {
                let ctx = scope::current().unwrap();
                (ctx.parent_id(), ctx.held_kinds())
            })
        });
        assert!(parent.is_none());
        assert_eq!(held, vec![kind("DB_READ")]);
        assert!(scope::current().is_none());
    }

    #[test]
    fn test_snapshot_registers_children() {
        let registry = Arc::new(ContextRegistry::new());
        let snapshot = scope::with_context(CapabilityContext::synchronous([]), || {
            ContextSnapshot::capture().with_registry(Arc::clone(&registry))
        });
        let child_id = snapshot.run(ExecutionKind::Pooled, || scope::current().unwrap().id());
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_live(child_id));

        let request = RequestScope::admit_with_registry([token("A")], &registry).unwrap();
        assert!(registry.is_live(request.context().id()));
    }

    #[test]
    fn test_many_pooled_runs_keep_registry_bounded() {
        let registry = Arc::new(ContextRegistry::new());
        let snapshot = scope::with_context(CapabilityContext::synchronous([]), || {
            ContextSnapshot::capture().with_registry(Arc::clone(&registry))
        });

        for _ in 0..10_000 {
            snapshot.run(ExecutionKind::Pooled, || ());
        }

        assert!(registry.len() <= 64, "len {}", registry.len());
        assert!(registry.snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_callback_with_explicit_snapshot() {
        let registry = Arc::new(ContextRegistry::new());
        let origin = CapabilityContext::synchronous([token("UI_DRAW")]);
        let snapshot = scope::with_context(Arc::clone(&origin), ContextSnapshot::capture)
            .with_registry(Arc::clone(&registry));

        // Built while a different context is current; the snapshot decides.
        let callback = scope::with_context(CapabilityContext::synchronous([token("ADMIN")]), || {
            Callback::with_snapshot(
                || {
                    let ctx = scope::current().unwrap();
                    (ctx.id(), ctx.parent_id(), ctx.held_kinds())
                },
                snapshot,
            )
        });

        assert_eq!(callback.captured().map(|c| c.id()), Some(origin.id()));
        let (child_id, parent, held) = callback.invoke();
        assert_eq!(parent, Some(origin.id()));
        assert_eq!(held, vec![kind("UI_DRAW")]);
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_live(child_id));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_spawn_enters_context_around_polls() {
        let parent = CapabilityContext::synchronous([token("NET_CONNECT")]);
        let handle = scope::with_context(Arc::clone(&parent), || {
            spawn(async {
                let before = scope::current().map(|c| c.parent_id());
                tokio::task::yield_now().await;
                let after = scope::current().map(|c| c.parent_id());
                (before, after)
            })
        });

        let (before, after) = handle.await.unwrap();
        assert_eq!(before, Some(Some(parent.id())));
        assert_eq!(after, Some(Some(parent.id())));
    }

    #[tokio::test]
    async fn test_spawn_blocking_carries_context() {
        let parent = CapabilityContext::synchronous([token("FILE_READ")]);
        let handle = scope::with_context(Arc::clone(&parent), || {
            spawn_blocking(|| scope::current().map(|c| c.holds(&kind("FILE_READ"))))
        });
        assert_eq!(handle.await.unwrap(), Some(true));
    }

    #[tokio::test]
    async fn test_spawn_without_context_runs_cleared() {
        let seen = spawn(async { scope::current().is_none() }).await.unwrap();
        assert!(seen);
    }

    #[tokio::test]
    async fn test_request_attach() {
        let request = RequestScope::admit([token("DB_READ")]);
        let id = request.context().id();
        let seen = request.attach(async { scope::current().map(|c| c.id()) }).await;
        assert_eq!(seen, Some(id));
    }
}
