//! Capability-related error types.

use thiserror::Error;

use crate::kind::CapabilityKind;

/// Render a list of kinds as `[A, B]` for error messages.
fn kind_list(kinds: &[CapabilityKind]) -> String {
    let names: Vec<&str> = kinds.iter().map(CapabilityKind::as_str).collect();
    format!("[{}]", names.join(", "))
}

/// Errors that can occur while checking or modelling capabilities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// Capabilities are required but no context is active on this thread.
    #[error("no active capability context; missing {}", kind_list(.missing))]
    NoActiveContext {
        /// Every kind the call required.
        missing: Vec<CapabilityKind>,
    },

    /// The active context lacks one or more required capabilities.
    #[error(
        "missing capabilities {} (available: {})",
        kind_list(.missing),
        kind_list(.available)
    )]
    MissingCapabilities {
        /// Required kinds that were not held (or not held for the resource).
        missing: Vec<CapabilityKind>,
        /// Kinds held by the active context.
        available: Vec<CapabilityKind>,
        /// The resource the check was bound to, if any.
        resource: Option<String>,
    },

    /// A descriptor binds a resource argument that the call did not supply.
    #[error("function {function} expects a string resource at argument {index}")]
    ResourceArgument {
        /// Qualified name of the vetted function.
        function: String,
        /// Argument position declared by the descriptor.
        index: usize,
    },

    /// Invalid capability kind identifier.
    #[error("invalid capability kind '{kind}': {reason}")]
    InvalidKind {
        /// The rejected identifier.
        kind: String,
        /// Why it's invalid.
        reason: String,
    },

    /// Invalid resource pattern.
    #[error("invalid resource pattern: {pattern} - {reason}")]
    InvalidPattern {
        /// The invalid pattern.
        pattern: String,
        /// Why it's invalid.
        reason: String,
    },

    /// The diagnostic registry lock was poisoned by a panicking holder.
    #[error("context registry poisoned: {0}")]
    RegistryPoisoned(String),
}

impl CapabilityError {
    /// The required kinds that were not satisfied, if this is a missing-capability error.
    #[must_use]
    pub fn missing(&self) -> &[CapabilityKind] {
        match self {
            Self::NoActiveContext { missing } | Self::MissingCapabilities { missing, .. } => {
                missing
            },
            _ => &[],
        }
    }
}

/// Result type for capability operations.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(names: &[&str]) -> Vec<CapabilityKind> {
        names
            .iter()
            .map(|n| CapabilityKind::new(*n).unwrap())
            .collect()
    }

    #[test]
    fn test_missing_capabilities_message_lists_both_sides() {
        let err = CapabilityError::MissingCapabilities {
            missing: kinds(&["FILE_WRITE"]),
            available: kinds(&["FILE_READ", "NET_CONNECT"]),
            resource: None,
        };
        assert_eq!(
            err.to_string(),
            "missing capabilities [FILE_WRITE] (available: [FILE_READ, NET_CONNECT])"
        );
        assert_eq!(err.missing(), kinds(&["FILE_WRITE"]).as_slice());
    }

    #[test]
    fn test_no_active_context_message() {
        let err = CapabilityError::NoActiveContext {
            missing: kinds(&["FILE_READ"]),
        };
        assert!(err.to_string().contains("no active capability context"));
        assert!(err.to_string().contains("FILE_READ"));
    }

    #[test]
    fn test_missing_is_empty_for_other_errors() {
        let err = CapabilityError::RegistryPoisoned("boom".to_string());
        assert!(err.missing().is_empty());
    }
}
