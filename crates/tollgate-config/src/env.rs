//! Environment variable fallbacks.
//!
//! Environment variables are a **fallback**, not an override: each one is
//! applied only when no config file set the field it maps to.

use std::collections::HashMap;

use tracing::debug;

use crate::merge::{ConfigLayer, FieldSources, set_nested};

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
}

/// All supported `TOLLGATE_*` env var mappings.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "TOLLGATE_LOG_LEVEL",
        field_path: "logging.level",
    },
    EnvMapping {
        var_name: "TOLLGATE_LOG_FORMAT",
        field_path: "logging.format",
    },
    EnvMapping {
        var_name: "TOLLGATE_PROGRAM_NAMESPACE",
        field_path: "sandbox.program_namespace",
    },
    EnvMapping {
        var_name: "TOLLGATE_REGISTRY_ENABLED",
        field_path: "registry.enabled",
    },
];

/// Environment variable naming an alternate user config directory.
pub const TOLLGATE_HOME_VAR: &str = "TOLLGATE_HOME";

/// Apply environment variable fallbacks to fields that no config file set.
///
/// Returns the number of env vars applied.
pub fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &mut FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> usize {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if is_file_set(sources, mapping.field_path) {
            continue;
        }

        if let Some(val) = env_vars.get(mapping.var_name) {
            debug!(
                var = mapping.var_name,
                field = mapping.field_path,
                "applying env var fallback"
            );

            let segments: Vec<&str> = mapping.field_path.split('.').collect();
            set_nested(merged, &segments, coerce_to_toml_value(mapping.field_path, val));
            sources.insert(mapping.field_path.to_owned(), ConfigLayer::Environment);
            count = count.saturating_add(1);
        }
    }

    count
}

/// Whether a user or workspace file set `field`. Embedded defaults do not count.
fn is_file_set(sources: &FieldSources, field: &str) -> bool {
    matches!(
        sources.get(field),
        Some(ConfigLayer::User | ConfigLayer::Workspace)
    )
}

/// Coerce a string env var value to the TOML type of the field it maps to.
fn coerce_to_toml_value(path: &str, val: &str) -> toml::Value {
    if path == "registry.enabled"
        && let Ok(b) = val.parse::<bool>()
    {
        return toml::Value::Boolean(b);
    }

    toml::Value::String(val.to_owned())
}

/// Collect all current environment variables into a map.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}
