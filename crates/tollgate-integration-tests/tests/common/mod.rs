//! Shared helpers for integration tests.

use std::sync::Arc;

use tollgate_capabilities::CapabilityKind;
use tollgate_runtime::{CallError, CallResult, CallValidator, Callable, Value};
use tollgate_test::test_descriptor;

/// Parse a list of kind names.
#[allow(dead_code)]
pub fn kinds(names: &[&str]) -> Vec<CapabilityKind> {
    names
        .iter()
        .map(|n| CapabilityKind::new(*n).unwrap())
        .collect()
}

/// Assert that `result` is an unauthorized-call denial naming `name`.
#[allow(dead_code)]
pub fn assert_unauthorized(result: CallResult<Value>, name: &str) {
    match result {
        Err(CallError::Unauthorized {
            name: denied,
            permitted,
            ..
        }) => {
            assert_eq!(denied, name);
            assert!(!permitted.is_empty());
        },
        other => panic!("expected Unauthorized for {name}, got {other:?}"),
    }
}

/// A program-defined `apply(f, *args)` that forwards its first argument
/// through the validator, as compiled code would.
#[allow(dead_code)]
pub fn program_apply(validator: &Arc<CallValidator>) -> Value {
    let validator = Arc::clone(validator);
    Callable::function("apply", validator.program_namespace().to_string(), move |args| {
        let (target, rest) = args.split_first().ok_or_else(|| CallError::raised("TypeError"))?;
        validator.safe_call(target, rest)
    })
    .into()
}

/// A vetted, capability-free `builtins.call(f, *args)` primitive that
/// forwards its first argument through the validator.
#[allow(dead_code)]
pub fn builtin_call(validator: &Arc<CallValidator>) -> Value {
    let validator = Arc::clone(validator);
    Callable::vetted(test_descriptor("builtins.call", "builtins", &[]), move |args| {
        let (target, rest) = args.split_first().ok_or_else(|| CallError::raised("TypeError"))?;
        validator.safe_call(target, rest)
    })
    .into()
}
