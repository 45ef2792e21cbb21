//! Prelude module - commonly used types for convenient import.
//!
//! Use `use tollgate_runtime::prelude::*;` to import all essential types.

// Errors
pub use crate::{CallError, CallResult, PermittedCategory};

// Validation
pub use crate::{
    AllowlistAttributePolicy, AttributePolicy, CallPermission, CallValidator, ContainerType,
    DenyAllAttributePolicy,
};

// Values
pub use crate::{Callable, CallableOrigin, HostObject, Receiver, Value};

// Classification
pub use crate::{CallEmission, CallSiteClassifier, CallTarget, NameBinding, TopLevelItem};
