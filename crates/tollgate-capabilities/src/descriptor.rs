//! Capability metadata attached to callables and types at definition time.
//!
//! A [`FunctionCapabilityDescriptor`] on a callable is the only thing that
//! marks it as a vetted sandbox primitive. A [`VettedTypeDescriptor`] is the
//! type-level analogue: methods on instances of that type are callable.

use serde::{Deserialize, Serialize};

use crate::error::CapabilityResult;
use crate::kind::{CapabilityKind, dedup_preserving_order};

/// Requirements declared by a vetted, sandbox-exposed function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DescriptorFields")]
pub struct FunctionCapabilityDescriptor {
    qualified_name: String,
    required_capabilities: Vec<CapabilityKind>,
    owning_module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    resource_argument: Option<usize>,
}

/// Wire form of a descriptor, normalized on the way in.
#[derive(Deserialize)]
struct DescriptorFields {
    qualified_name: String,
    #[serde(default)]
    required_capabilities: Vec<CapabilityKind>,
    owning_module: String,
    #[serde(default)]
    resource_argument: Option<usize>,
}

impl From<DescriptorFields> for FunctionCapabilityDescriptor {
    fn from(fields: DescriptorFields) -> Self {
        Self {
            qualified_name: fields.qualified_name,
            required_capabilities: dedup_preserving_order(fields.required_capabilities),
            owning_module: fields.owning_module,
            resource_argument: fields.resource_argument,
        }
    }
}

impl FunctionCapabilityDescriptor {
    /// Describe a function that requires no capabilities.
    #[must_use]
    pub fn new(qualified_name: impl Into<String>, owning_module: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            required_capabilities: Vec::new(),
            owning_module: owning_module.into(),
            resource_argument: None,
        }
    }

    /// Add a required capability kind. Duplicates are collapsed.
    #[must_use]
    pub fn require(mut self, kind: CapabilityKind) -> Self {
        if !self.required_capabilities.contains(&kind) {
            self.required_capabilities.push(kind);
        }
        self
    }

    /// Add several required kinds. Duplicates are collapsed, first occurrence wins.
    #[must_use]
    pub fn require_all(mut self, kinds: impl IntoIterator<Item = CapabilityKind>) -> Self {
        let combined = std::mem::take(&mut self.required_capabilities)
            .into_iter()
            .chain(kinds);
        self.required_capabilities = dedup_preserving_order(combined);
        self
    }

    /// Parse and add required kinds from identifiers.
    ///
    /// # Errors
    ///
    /// Returns [`CapabilityError::InvalidKind`](crate::CapabilityError::InvalidKind)
    /// for the first invalid identifier.
    pub fn requiring<'a>(self, kinds: impl IntoIterator<Item = &'a str>) -> CapabilityResult<Self> {
        let parsed = kinds
            .into_iter()
            .map(CapabilityKind::new)
            .collect::<CapabilityResult<Vec<_>>>()?;
        Ok(self.require_all(parsed))
    }

    /// Bind the argument at `index` as the concrete resource the call acts on.
    ///
    /// The validator forwards that argument to the capability check so that
    /// resource patterns on held tokens are enforced.
    #[must_use]
    pub fn with_resource_argument(mut self, index: usize) -> Self {
        self.resource_argument = Some(index);
        self
    }

    /// Fully qualified function name.
    #[must_use]
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Required kinds in declaration order.
    #[must_use]
    pub fn required_capabilities(&self) -> &[CapabilityKind] {
        &self.required_capabilities
    }

    /// Module that exposes the function.
    #[must_use]
    pub fn owning_module(&self) -> &str {
        &self.owning_module
    }

    /// Argument position bound as the call's resource, if any.
    #[must_use]
    pub fn resource_argument(&self) -> Option<usize> {
        self.resource_argument
    }

    /// Whether the function can run without any held capability.
    #[must_use]
    pub fn is_capability_free(&self) -> bool {
        self.required_capabilities.is_empty()
    }
}

/// Marks a host type whose instance methods are exposed to the sandbox.
///
/// Vetting is class-level: every method reachable on an instance is allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VettedTypeDescriptor {
    type_name: String,
    owning_module: String,
}

impl VettedTypeDescriptor {
    /// Describe a vetted type.
    #[must_use]
    pub fn new(type_name: impl Into<String>, owning_module: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            owning_module: owning_module.into(),
        }
    }

    /// Type name as seen by the sandboxed program.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Module that exposes the type.
    #[must_use]
    pub fn owning_module(&self) -> &str {
        &self.owning_module
    }
}
