//! Safe container types and the attribute-access approval seam.
//!
//! The validator lets a bound method through when its receiver is one of
//! the closed set of [`ContainerType`]s and the attribute-access layer has
//! approved the method name for that type.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tollgate_config::MethodsSection;

/// Closed set of receiver types whose approved methods are always callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerType {
    /// Integers.
    Int,
    /// Floating point numbers.
    Float,
    /// Booleans.
    Bool,
    /// Text strings.
    Str,
    /// Byte strings.
    Bytes,
    /// Mutable sequences.
    List,
    /// Immutable sequences.
    Tuple,
    /// Mappings.
    Dict,
    /// Mutable sets.
    Set,
    /// Immutable sets.
    FrozenSet,
}

impl ContainerType {
    /// Every container type.
    pub const ALL: [Self; 10] = [
        Self::Int,
        Self::Float,
        Self::Bool,
        Self::Str,
        Self::Bytes,
        Self::List,
        Self::Tuple,
        Self::Dict,
        Self::Set,
        Self::FrozenSet,
    ];

    /// Type name as seen by the sandboxed program.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Str => "str",
            Self::Bytes => "bytes",
            Self::List => "list",
            Self::Tuple => "tuple",
            Self::Dict => "dict",
            Self::Set => "set",
            Self::FrozenSet => "frozenset",
        }
    }

    /// Look up a container type by its program-visible name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decides which methods on container types the sandbox may call.
pub trait AttributePolicy: fmt::Debug + Send + Sync {
    /// Whether `method` may be called on a receiver of type `receiver`.
    fn is_approved(&self, receiver: ContainerType, method: &str) -> bool;
}

/// Per-container method allowlist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowlistAttributePolicy {
    approved: BTreeMap<ContainerType, BTreeSet<String>>,
}

impl AllowlistAttributePolicy {
    /// Create an empty allowlist (approves nothing).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Approve `method` on `receiver`.
    #[must_use]
    pub fn allow(mut self, receiver: ContainerType, method: impl Into<String>) -> Self {
        self.approved
            .entry(receiver)
            .or_default()
            .insert(method.into());
        self
    }

    /// Approve several methods on `receiver`.
    #[must_use]
    pub fn allow_all<I, S>(mut self, receiver: ContainerType, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.approved
            .entry(receiver)
            .or_default()
            .extend(methods.into_iter().map(Into::into));
        self
    }

    /// Build the allowlist from the `[methods]` config section.
    ///
    /// Keys that do not name a container type are skipped with a warning.
    #[must_use]
    pub fn from_config(section: &MethodsSection) -> Self {
        section
            .approved
            .iter()
            .fold(Self::new(), |policy, (type_name, methods)| {
                match ContainerType::from_name(type_name) {
                    Some(receiver) => policy.allow_all(receiver, methods),
                    None => {
                        tracing::warn!(type_name, "ignoring methods for unknown container type");
                        policy
                    },
                }
            })
    }

    /// Approved methods for `receiver`, sorted.
    pub fn methods(&self, receiver: ContainerType) -> impl Iterator<Item = &str> {
        self.approved
            .get(&receiver)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }
}

impl AttributePolicy for AllowlistAttributePolicy {
    fn is_approved(&self, receiver: ContainerType, method: &str) -> bool {
        self.approved
            .get(&receiver)
            .is_some_and(|methods| methods.contains(method))
    }
}

/// Approves no container methods at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAllAttributePolicy;

impl AttributePolicy for DenyAllAttributePolicy {
    fn is_approved(&self, _receiver: ContainerType, _method: &str) -> bool {
        false
    }
}
