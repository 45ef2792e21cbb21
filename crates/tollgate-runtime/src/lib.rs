//! Tollgate Runtime - call validation for sandboxed programs.
//!
//! Sandboxed code is compiled so that every call the generator cannot prove
//! safe goes through [`CallValidator::safe_call`]. This crate provides:
//!
//! - [`CallSiteClassifier`] to decide, per call site, whether to wrap
//! - [`CallValidator`] to sort a callable into a permitted category and
//!   check a vetted primitive's capability requirements against the
//!   calling thread's context
//! - [`AttributePolicy`] as the seam to the attribute-access layer
//! - [`config_bridge`] to build all of the above from a loaded config
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tollgate_capabilities::{CapabilityContext, CapabilityToken, FunctionCapabilityDescriptor, scope};
//! use tollgate_runtime::{Callable, CallValidator, DenyAllAttributePolicy, Value};
//!
//! let read = FunctionCapabilityDescriptor::new("fs.read_text", "fs")
//!     .requiring(["FILE_READ"])
//!     .unwrap();
//! let target = Value::from(Callable::vetted(read, |_: &[Value]| Ok(Value::from("contents"))));
//! let validator = CallValidator::new("__main__", Arc::new(DenyAllAttributePolicy));
//!
//! assert!(validator.safe_call(&target, &[]).is_err());
//!
//! let ctx = CapabilityContext::synchronous([CapabilityToken::parse("FILE_READ").unwrap()]);
//! let out = scope::with_context(ctx, || validator.safe_call(&target, &[])).unwrap();
//! assert_eq!(out, Value::from("contents"));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config_bridge;
pub mod prelude;

mod attribute;
mod classifier;
mod error;
mod validator;
mod value;

pub use attribute::{
    AllowlistAttributePolicy, AttributePolicy, ContainerType, DenyAllAttributePolicy,
};
pub use classifier::{
    CallEmission, CallSiteClassifier, CallTarget, ClassificationSummary, NameBinding,
    TopLevelItem, VALIDATOR_ENTRY_POINT,
};
pub use error::{CallError, CallResult, PermittedCategory};
pub use validator::{CallPermission, CallValidator};
pub use value::{
    BUILTINS_NAMESPACE, Callable, CallableFn, CallableOrigin, HostObject, Receiver, Value,
};
