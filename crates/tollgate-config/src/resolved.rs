//! The result of a layered load.

use std::fmt;

use crate::error::ConfigResult;
use crate::merge::{ConfigLayer, FieldSources};
use crate::types::Config;

/// A loaded [`Config`] together with where each field came from.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The final configuration.
    pub config: Config,
    /// Layer that set each dotted field path.
    pub field_sources: FieldSources,
    /// Config files merged, in load order.
    pub loaded_files: Vec<String>,
}

impl ResolvedConfig {
    /// Layer that set `field`, if any layer did.
    #[must_use]
    pub fn source_of(&self, field: &str) -> Option<ConfigLayer> {
        self.field_sources.get(field).copied()
    }

    /// Fields set by `layer`, sorted.
    #[must_use]
    pub fn fields_from(&self, layer: ConfigLayer) -> Vec<&str> {
        let mut fields: Vec<&str> = self
            .field_sources
            .iter()
            .filter(|(_, l)| **l == layer)
            .map(|(f, _)| f.as_str())
            .collect();
        fields.sort_unstable();
        fields
    }

    /// Render the final configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`](crate::ConfigError::ValidationError)
    /// if the configuration cannot be serialized.
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(&self.config).map_err(|e| {
            crate::ConfigError::ValidationError {
                field: "<resolved config>".to_owned(),
                message: e.to_string(),
            }
        })
    }
}

impl fmt::Display for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.loaded_files.is_empty() {
            writeln!(f, "# no config files loaded; using defaults")?;
        }
        for file in &self.loaded_files {
            writeln!(f, "# loaded: {file}")?;
        }
        let mut fields: Vec<(&String, &ConfigLayer)> = self.field_sources.iter().collect();
        fields.sort_unstable_by(|a, b| a.0.cmp(b.0));
        for (field, layer) in fields {
            writeln!(f, "{field} <- {layer}")?;
        }
        Ok(())
    }
}
