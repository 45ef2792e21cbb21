//! Compile-time call-site classification.
//!
//! The code generator asks, once per call site, whether the call must go
//! through [`CallValidator::safe_call`](crate::CallValidator::safe_call).
//! Only a bare reference to a function declared at the top level of the
//! same compilation unit, and never rebound there, may be called directly.
//! Everything else, including every ambiguous shape, is wrapped.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Name the generator imports once per unit and routes wrapped calls to.
pub const VALIDATOR_ENTRY_POINT: &str = "safe_call";

/// How a bare name at a call site resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameBinding {
    /// The unit's top-level binding.
    TopLevel,
    /// A parameter or local variable that shadows any top-level name.
    Local,
    /// Resolution is not known statically.
    Unknown,
}

/// The expression being called at a call site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum CallTarget {
    /// A bare name, e.g. `helper(x)`.
    Name {
        /// The referenced name.
        name: String,
        /// How the name resolves at this site.
        binding: NameBinding,
    },
    /// Member access, e.g. `module.function(x)` or `obj.method(x)`.
    Attribute {
        /// Dotted path as written.
        path: String,
    },
    /// A value read from a container, e.g. `handlers[key](x)`.
    Subscript,
    /// The result of another call, e.g. `make()(x)`.
    Call,
    /// A lambda or closure literal.
    Lambda,
    /// Any other expression.
    Other,
}

impl CallTarget {
    /// A bare name resolved to the top-level binding.
    #[must_use]
    pub fn top_level(name: impl Into<String>) -> Self {
        Self::Name {
            name: name.into(),
            binding: NameBinding::TopLevel,
        }
    }

    /// A bare name resolved to a local binding.
    #[must_use]
    pub fn local(name: impl Into<String>) -> Self {
        Self::Name {
            name: name.into(),
            binding: NameBinding::Local,
        }
    }
}

/// A binding introduced at the top level of a compilation unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "item", content = "name", rename_all = "snake_case")]
pub enum TopLevelItem {
    /// A function definition.
    Function(String),
    /// An assignment to a name.
    Assignment(String),
    /// An import binding a name.
    Import(String),
    /// A class definition.
    Class(String),
}

/// What the generator emits for a call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallEmission {
    /// Call the target directly.
    Direct,
    /// Route the call through the validator entry point.
    Wrapped,
}

/// Per-unit classification counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationSummary {
    /// Call sites emitted directly.
    pub direct: usize,
    /// Call sites routed through the validator.
    pub wrapped: usize,
}

impl ClassificationSummary {
    /// Total call sites classified.
    #[must_use]
    pub fn total(&self) -> usize {
        self.direct.saturating_add(self.wrapped)
    }
}

/// Classifies call sites of one compilation unit.
#[derive(Debug, Clone, Default)]
pub struct CallSiteClassifier {
    direct_names: BTreeSet<String>,
}

impl CallSiteClassifier {
    /// Build a classifier from the unit's top-level items.
    ///
    /// A function name that is also assigned, imported, or used as a class
    /// name anywhere at top level is not eligible for direct calls.
    #[must_use]
    pub fn new(items: impl IntoIterator<Item = TopLevelItem>) -> Self {
        let mut functions = BTreeSet::new();
        let mut rebound = BTreeSet::new();
        for item in items {
            match item {
                TopLevelItem::Function(name) => {
                    functions.insert(name);
                },
                TopLevelItem::Assignment(name)
                | TopLevelItem::Import(name)
                | TopLevelItem::Class(name) => {
                    rebound.insert(name);
                },
            }
        }
        Self {
            direct_names: functions.difference(&rebound).cloned().collect(),
        }
    }

    /// Whether `name` may be called directly when resolved at top level.
    #[must_use]
    pub fn is_direct_name(&self, name: &str) -> bool {
        self.direct_names.contains(name)
    }

    /// Whether the call at `target` must be routed through the validator.
    #[must_use]
    pub fn should_wrap(&self, target: &CallTarget) -> bool {
        match target {
            CallTarget::Name {
                name,
                binding: NameBinding::TopLevel,
            } => !self.is_direct_name(name),
            _ => true,
        }
    }

    /// The emission for `target`.
    #[must_use]
    pub fn emission(&self, target: &CallTarget) -> CallEmission {
        if self.should_wrap(target) {
            CallEmission::Wrapped
        } else {
            CallEmission::Direct
        }
    }

    /// Classify every call site of a unit.
    pub fn classify_unit<'a>(
        &self,
        targets: impl IntoIterator<Item = &'a CallTarget>,
    ) -> ClassificationSummary {
        let summary = targets
            .into_iter()
            .fold(ClassificationSummary::default(), |mut acc, target| {
                match self.emission(target) {
                    CallEmission::Direct => acc.direct = acc.direct.saturating_add(1),
                    CallEmission::Wrapped => acc.wrapped = acc.wrapped.saturating_add(1),
                }
                acc
            });
        tracing::debug!(
            direct = summary.direct,
            wrapped = summary.wrapped,
            "classified call sites"
        );
        summary
    }
}
