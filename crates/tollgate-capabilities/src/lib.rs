//! Tollgate Capabilities - capability tokens and the contexts that hold them.
//!
//! This crate provides:
//! - Capability kinds, tokens and resource patterns
//! - Descriptors attached to vetted functions and types
//! - Immutable, hierarchical capability contexts
//! - The per-thread current context and the capability check against it
//! - Propagation of contexts across pools, async tasks, callbacks and requests
//! - A weak diagnostic registry of live contexts
//!
//! # Security Model
//!
//! Authority is never ambient. A thread holds a capability only while a
//! context granting it has been explicitly entered on that thread, and
//! contexts are immutable: granting more authority derives a new context.
//! Every boundary where work changes thread or is deferred must go through
//! [`propagate`], otherwise the work runs with no context and every
//! capability check fails closed.
//!
//! # Example
//!
//! ```
//! use tollgate_capabilities::{
//!     CapabilityContext, CapabilityKind, CapabilityToken, TokenBuilder, scope,
//! };
//!
//! let read = CapabilityKind::new("FILE_READ").unwrap();
//! let token = TokenBuilder::new(read.clone())
//!     .resource_glob("/data/*")
//!     .unwrap()
//!     .build();
//!
//! let ctx = CapabilityContext::synchronous([token]);
//! scope::with_context(ctx, || {
//!     assert!(scope::check_capabilities(&[read.clone()]).is_ok());
//!     assert!(scope::check_capabilities_for(&[read.clone()], Some("/etc/passwd")).is_err());
//! });
//!
//! // Outside the context nothing is held.
//! assert!(scope::check_capabilities(&[read]).is_err());
//! # let _ = CapabilityToken::parse("NET_CONNECT").unwrap();
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;
pub mod propagate;
pub mod scope;

mod context;
mod descriptor;
mod error;
mod kind;
mod pattern;
mod registry;
mod set;
mod token;
mod types;

pub use context::{CapabilityContext, ExecutionKind};
pub use descriptor::{FunctionCapabilityDescriptor, VettedTypeDescriptor};
pub use error::{CapabilityError, CapabilityResult};
pub use kind::CapabilityKind;
pub use pattern::ResourcePattern;
pub use registry::{ContextRegistry, ContextSummary};
pub use set::CapabilitySet;
pub use token::{CapabilityToken, TokenBuilder};
pub use types::{ContextId, Timestamp, TokenId};
