//! Test fixtures for tokens, contexts, and callables.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tollgate_capabilities::{
    CapabilityContext, CapabilityToken, FunctionCapabilityDescriptor, TokenBuilder,
    VettedTypeDescriptor,
};
use tollgate_config::{Config, DEFAULT_PROGRAM_NAMESPACE};
use tollgate_runtime::{
    CallResult, CallValidator, Callable, ContainerType, HostObject, Receiver, Value,
};

/// Create an unscoped token for `kind`.
///
/// # Panics
///
/// Panics if `kind` is not a valid capability identifier.
#[must_use]
pub fn test_token(kind: &str) -> CapabilityToken {
    CapabilityToken::parse(kind).expect("invalid capability kind in test")
}

/// Create a token for `kind` limited to resources matching `glob`.
///
/// # Panics
///
/// Panics if `kind` or `glob` is invalid.
#[must_use]
pub fn test_token_with_pattern(kind: &str, glob: &str) -> CapabilityToken {
    let kind = tollgate_capabilities::CapabilityKind::new(kind)
        .expect("invalid capability kind in test");
    TokenBuilder::new(kind)
        .resource_glob(glob)
        .expect("invalid resource pattern in test")
        .build()
}

/// Create a synchronous root context holding unscoped tokens for `kinds`.
#[must_use]
pub fn test_context(kinds: &[&str]) -> Arc<CapabilityContext> {
    CapabilityContext::synchronous(kinds.iter().map(|k| test_token(k)))
}

/// Build a descriptor for `qualified_name` in `module` requiring `required`.
///
/// # Panics
///
/// Panics if any required kind is invalid.
#[must_use]
pub fn test_descriptor(
    qualified_name: &str,
    module: &str,
    required: &[&str],
) -> FunctionCapabilityDescriptor {
    FunctionCapabilityDescriptor::new(qualified_name, module)
        .requiring(required.iter().copied())
        .expect("invalid capability kind in test")
}

/// A vetted host function that returns its own name.
#[must_use]
pub fn vetted_host_fn(qualified_name: &str, module: &str, required: &[&str]) -> Callable {
    let name = qualified_name.to_string();
    Callable::vetted(
        test_descriptor(qualified_name, module, required),
        move |_: &[Value]| Ok(Value::from(name.as_str())),
    )
}

/// A vetted host function that binds argument `index` as its resource and
/// echoes it back.
#[must_use]
pub fn vetted_resource_fn(
    qualified_name: &str,
    module: &str,
    required: &[&str],
    index: usize,
) -> Callable {
    Callable::vetted(
        test_descriptor(qualified_name, module, required).with_resource_argument(index),
        move |args: &[Value]| Ok(args.get(index).cloned().unwrap_or(Value::None)),
    )
}

/// A host function with no descriptor, declared in `namespace`.
#[must_use]
pub fn unvetted_host_fn(name: &str, namespace: &str) -> Callable {
    Callable::function(name, namespace, |_: &[Value]| Ok(Value::None))
}

/// A function declared by the sandboxed program itself.
#[must_use]
pub fn program_fn(name: &str) -> Callable {
    Callable::function(name, DEFAULT_PROGRAM_NAMESPACE, |_: &[Value]| {
        Ok(Value::Bool(true))
    })
}

/// A method bound to a container value of type `receiver`.
#[must_use]
pub fn bound_method(receiver: ContainerType, method: &str) -> Callable {
    Callable::method(Receiver::Container(receiver), method, |_: &[Value]| {
        Ok(Value::None)
    })
}

/// A method bound to an instance of a vetted host type.
#[must_use]
pub fn vetted_object_method(type_name: &str, module: &str, method: &str) -> Callable {
    let object = HostObject::vetted(VettedTypeDescriptor::new(type_name, module));
    Callable::method(Receiver::Object(object), method, |_: &[Value]| {
        Ok(Value::None)
    })
}

/// A validator built from the default configuration.
#[must_use]
pub fn test_validator() -> CallValidator {
    CallValidator::from_config(&Config::default())
}

/// Counts how many times callables built from it actually ran.
#[derive(Debug, Clone, Default)]
pub struct CallCounter {
    runs: Arc<AtomicUsize>,
}

impl CallCounter {
    /// Create a counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A callable body that bumps the counter and returns `None`.
    pub fn body(&self) -> impl Fn(&[Value]) -> CallResult<Value> + Send + Sync + 'static {
        let runs = Arc::clone(&self.runs);
        move |_: &[Value]| {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(Value::None)
        }
    }

    /// Number of runs so far.
    #[must_use]
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}
