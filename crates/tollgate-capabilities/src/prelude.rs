//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tollgate_capabilities::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use tollgate_capabilities::prelude::*;
//!
//! let ctx = CapabilityContext::synchronous([CapabilityToken::parse("NET_CONNECT").unwrap()]);
//! let task = with_context(ctx, || wrap_task(|| current().is_some()));
//! assert!(std::thread::spawn(task).join().unwrap());
//! ```

// Errors
pub use crate::{CapabilityError, CapabilityResult};

// Tokens and metadata
pub use crate::{
    CapabilityKind, CapabilitySet, CapabilityToken, FunctionCapabilityDescriptor,
    ResourcePattern, TokenBuilder, VettedTypeDescriptor,
};

// Contexts
pub use crate::{CapabilityContext, ContextId, ContextRegistry, ExecutionKind};
pub use crate::scope::{check_capabilities, check_capabilities_for, current, enter, with_context};

// Propagation
pub use crate::propagate::{Callback, ContextSnapshot, RequestScope, request_scope, wrap_task};
