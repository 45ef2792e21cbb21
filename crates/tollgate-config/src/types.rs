//! Configuration types for the Tollgate sandbox runtime.
//!
//! All types in this module are self-contained with no dependencies on other
//! internal tollgate crates. Domain types are mirrored here and converted at
//! the boundary. Every struct implements [`Default`] with the same values as
//! the embedded `defaults.toml`, so a bare `[section]` header in TOML produces
//! a working configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Namespace the host assigns to the sandboxed program's own code.
pub const DEFAULT_PROGRAM_NAMESPACE: &str = "__main__";

/// Namespace that declares host primitives and container methods.
pub const BUILTINS_NAMESPACE: &str = "builtins";

/// Host namespaces that can never be the program namespace.
pub const RESERVED_NAMESPACES: &[&str] = &[BUILTINS_NAMESPACE, "__builtins__"];

/// Whether `namespace` belongs to the host and may not hold program code.
#[must_use]
pub fn is_reserved_namespace(namespace: &str) -> bool {
    RESERVED_NAMESPACES.contains(&namespace)
}

/// Names of the container types whose methods may be approved.
pub const CONTAINER_TYPE_NAMES: &[&str] = &[
    "int",
    "float",
    "bool",
    "str",
    "bytes",
    "list",
    "tuple",
    "dict",
    "set",
    "frozenset",
];

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration for the Tollgate runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sandboxed program identity.
    pub sandbox: SandboxSection,
    /// Container methods approved by the attribute-access layer.
    pub methods: MethodsSection,
    /// Diagnostic context registry.
    pub registry: RegistrySection,
    /// Logging output.
    pub logging: LoggingSection,
}

// ---------------------------------------------------------------------------
// SandboxSection
// ---------------------------------------------------------------------------

/// Settings describing the sandboxed program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSection {
    /// Namespace of the program's own compilation unit. Callables declared
    /// here are trusted without a descriptor.
    pub program_namespace: String,
}

impl Default for SandboxSection {
    fn default() -> Self {
        Self {
            program_namespace: DEFAULT_PROGRAM_NAMESPACE.to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// MethodsSection
// ---------------------------------------------------------------------------

/// Approved methods per container type, keyed by type name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethodsSection {
    /// Method names approved for each container type.
    pub approved: BTreeMap<String, Vec<String>>,
}

impl MethodsSection {
    /// Whether `method` is approved for the container named `type_name`.
    #[must_use]
    pub fn is_approved(&self, type_name: &str, method: &str) -> bool {
        self.approved
            .get(type_name)
            .is_some_and(|methods| methods.iter().any(|m| m == method))
    }
}

fn owned(methods: &[&str]) -> Vec<String> {
    methods.iter().map(|m| (*m).to_owned()).collect()
}

impl Default for MethodsSection {
    fn default() -> Self {
        let numeric = ["bit_length", "conjugate", "to_bytes"];
        let approved = BTreeMap::from([
            ("int".to_owned(), owned(&numeric)),
            ("bool".to_owned(), owned(&numeric)),
            (
                "float".to_owned(),
                owned(&["as_integer_ratio", "conjugate", "hex", "is_integer"]),
            ),
            (
                "str".to_owned(),
                owned(&[
                    "capitalize", "count", "endswith", "find", "format", "isalnum", "isalpha",
                    "isdigit", "join", "lower", "lstrip", "replace", "rstrip", "split",
                    "startswith", "strip", "title", "upper",
                ]),
            ),
            (
                "bytes".to_owned(),
                owned(&["count", "decode", "endswith", "find", "hex", "startswith"]),
            ),
            (
                "list".to_owned(),
                owned(&[
                    "append", "clear", "copy", "count", "extend", "index", "insert", "pop",
                    "remove", "reverse", "sort",
                ]),
            ),
            ("tuple".to_owned(), owned(&["count", "index"])),
            (
                "dict".to_owned(),
                owned(&[
                    "clear", "copy", "get", "items", "keys", "pop", "setdefault", "update",
                    "values",
                ]),
            ),
            (
                "set".to_owned(),
                owned(&[
                    "add", "clear", "copy", "difference", "discard", "intersection",
                    "issubset", "issuperset", "remove", "union",
                ]),
            ),
            (
                "frozenset".to_owned(),
                owned(&[
                    "copy", "difference", "intersection", "issubset", "issuperset", "union",
                ]),
            ),
        ]);
        Self { approved }
    }
}

// ---------------------------------------------------------------------------
// RegistrySection
// ---------------------------------------------------------------------------

/// Diagnostic context registry settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    /// Whether hosts attach a registry of live capability contexts.
    pub enabled: bool,
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"` (human-friendly), `"compact"` (one-line),
    /// `"json"` (structured), or `"full"` (verbose).
    pub format: String,
    /// Per-crate tracing directives (e.g. `["tollgate_runtime=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_sections_use_defaults() {
        let config: Config = toml::from_str("[sandbox]\n[methods]\n[logging]").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.sandbox.program_namespace, "__main__");
        assert!(!config.registry.enabled);
    }

    #[test]
    fn test_default_methods_cover_known_types_only() {
        let methods = MethodsSection::default();
        for type_name in methods.approved.keys() {
            assert!(CONTAINER_TYPE_NAMES.contains(&type_name.as_str()));
        }
        assert!(methods.is_approved("str", "upper"));
        assert!(methods.is_approved("dict", "get"));
        assert!(!methods.is_approved("str", "__class__"));
        assert!(!methods.is_approved("module", "system"));
    }

    #[test]
    fn test_partial_methods_table_replaces_map() {
        let config: Config = toml::from_str(
            r#"
            [methods.approved]
            str = ["upper"]
            "#,
        )
        .unwrap();
        assert_eq!(config.methods.approved.len(), 1);
        assert!(config.methods.is_approved("str", "upper"));
        assert!(!config.methods.is_approved("str", "lower"));
    }
}
