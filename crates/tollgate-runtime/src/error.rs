//! Call validation error types.

use std::fmt;
use thiserror::Error;
use tollgate_capabilities::CapabilityError;

/// A category of callable the validator lets through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermittedCategory {
    /// A function carrying a capability descriptor.
    VettedPrimitive,
    /// A function declared by the sandboxed program itself.
    ProgramDefined,
    /// An approved method on a safe container type.
    SafeTypeMethod,
    /// A method on an instance of a vetted host type.
    VettedTypeMethod,
}

impl PermittedCategory {
    /// Every permitted category, in the order the validator tries them.
    pub const ALL: &'static [Self] = &[
        Self::VettedPrimitive,
        Self::ProgramDefined,
        Self::SafeTypeMethod,
        Self::VettedTypeMethod,
    ];
}

impl fmt::Display for PermittedCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::VettedPrimitive => write!(f, "vetted primitive"),
            Self::ProgramDefined => write!(f, "program-defined function"),
            Self::SafeTypeMethod => write!(f, "safe container method"),
            Self::VettedTypeMethod => write!(f, "vetted type method"),
        }
    }
}

fn category_list(categories: &[PermittedCategory]) -> String {
    categories
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised by a validated call.
///
/// All variants pass unchanged through nested calls; nothing here is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// The call target is not invocable.
    #[error("'{type_name}' object is not callable")]
    NotCallable {
        /// Type name of the value that was called.
        type_name: String,
    },

    /// The call target is not in any permitted category.
    #[error(
        "call to '{name}' from namespace '{namespace}' is not permitted; allowed callables are: {}",
        category_list(.permitted)
    )]
    Unauthorized {
        /// Name of the rejected callable.
        name: String,
        /// Namespace that declared it.
        namespace: String,
        /// Categories that would have been accepted.
        permitted: &'static [PermittedCategory],
    },

    /// The callable is vetted but the active context is insufficient.
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// The callee itself raised an error after being allowed to run.
    #[error("{0}")]
    Raised(String),
}

impl CallError {
    /// An unauthorized-call error listing every permitted category.
    #[must_use]
    pub fn unauthorized(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self::Unauthorized {
            name: name.into(),
            namespace: namespace.into(),
            permitted: PermittedCategory::ALL,
        }
    }

    /// An error raised by callee code.
    #[must_use]
    pub fn raised(message: impl Into<String>) -> Self {
        Self::Raised(message.into())
    }

    /// Whether the validator denied the call (as opposed to the callee failing).
    #[must_use]
    pub fn is_denial(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::Capability(_))
    }
}

/// Result type for validated calls.
pub type CallResult<T> = Result<T, CallError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_capabilities::CapabilityKind;

    #[test]
    fn test_unauthorized_message_is_actionable() {
        let err = CallError::unauthorized("eval", "builtins");
        let message = err.to_string();
        assert!(message.contains("'eval'"));
        assert!(message.contains("'builtins'"));
        assert!(message.contains("vetted primitive"));
        assert!(message.contains("program-defined function"));
        assert!(message.contains("safe container method"));
        assert!(err.is_denial());
    }

    #[test]
    fn test_capability_error_is_transparent() {
        let inner = CapabilityError::NoActiveContext {
            missing: vec![CapabilityKind::new("FILE_READ").unwrap()],
        };
        let err: CallError = inner.clone().into();
        assert_eq!(err.to_string(), inner.to_string());
        assert!(err.is_denial());
    }

    #[test]
    fn test_not_callable_message() {
        let err = CallError::NotCallable {
            type_name: "int".to_string(),
        };
        assert_eq!(err.to_string(), "'int' object is not callable");
        assert!(!err.is_denial());
        assert!(!CallError::raised("boom").is_denial());
    }
}
