//! Post-merge configuration validation.
//!
//! Runs on the deserialized [`Config`](crate::Config) after every layer has
//! been merged, so a bad value is reported against its final field path.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{CONTAINER_TYPE_NAMES, Config, is_reserved_namespace};

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_sandbox(config)?;
    validate_methods(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

/// Whether `name` is a plain identifier: a letter or underscore followed by
/// letters, digits, or underscores.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn validate_sandbox(config: &Config) -> ConfigResult<()> {
    let ns = &config.sandbox.program_namespace;
    if ns.is_empty() {
        return Err(invalid(
            "sandbox.program_namespace",
            "program namespace must not be empty",
        ));
    }
    if ns.chars().any(char::is_whitespace) {
        return Err(invalid(
            "sandbox.program_namespace",
            format!("program namespace '{ns}' must not contain whitespace"),
        ));
    }
    if is_reserved_namespace(ns) {
        return Err(invalid(
            "sandbox.program_namespace",
            format!("'{ns}' is a host namespace and cannot hold program code"),
        ));
    }
    Ok(())
}

fn validate_methods(config: &Config) -> ConfigResult<()> {
    for (type_name, methods) in &config.methods.approved {
        let field = format!("methods.approved.{type_name}");
        if !CONTAINER_TYPE_NAMES.contains(&type_name.as_str()) {
            return Err(invalid(
                field,
                format!(
                    "unknown container type '{type_name}'; expected one of: {}",
                    CONTAINER_TYPE_NAMES.join(", ")
                ),
            ));
        }
        if let Some(bad) = methods.iter().find(|m| !is_identifier(m)) {
            return Err(invalid(
                field,
                format!("'{bad}' is not a valid method name"),
            ));
        }
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        ));
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        ));
    }

    if let Some(bad) = config.logging.directives.iter().find(|d| d.trim().is_empty()) {
        return Err(invalid(
            "logging.directives",
            format!("directive '{bad}' is empty"),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: ConfigResult<()>) -> String {
        match result {
            Err(ConfigError::ValidationError { field, .. }) => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_program_namespace() {
        let mut config = Config::default();
        config.sandbox.program_namespace = String::new();
        assert_eq!(field_of(validate(&config)), "sandbox.program_namespace");
    }

    #[test]
    fn test_program_namespace_with_whitespace() {
        let mut config = Config::default();
        config.sandbox.program_namespace = "my app".to_owned();
        assert_eq!(field_of(validate(&config)), "sandbox.program_namespace");
    }

    #[test]
    fn test_host_namespace_rejected_as_program_namespace() {
        for ns in ["builtins", "__builtins__"] {
            let mut config = Config::default();
            config.sandbox.program_namespace = ns.to_owned();
            assert_eq!(field_of(validate(&config)), "sandbox.program_namespace", "{ns}");
        }
    }

    #[test]
    fn test_unknown_container_type() {
        let mut config = Config::default();
        config
            .methods
            .approved
            .insert("module".to_owned(), vec!["system".to_owned()]);
        assert_eq!(field_of(validate(&config)), "methods.approved.module");
    }

    #[test]
    fn test_invalid_method_name() {
        let mut config = Config::default();
        config
            .methods
            .approved
            .insert("str".to_owned(), vec!["upper".to_owned(), "up.per".to_owned()]);
        assert_eq!(field_of(validate(&config)), "methods.approved.str");
    }

    #[test]
    fn test_dunder_names_are_identifiers() {
        assert!(is_identifier("__len__"));
        assert!(is_identifier("to_bytes"));
        assert!(!is_identifier("2x"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.level");
    }

    #[test]
    fn test_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.format");
    }

    #[test]
    fn test_blank_directive() {
        let mut config = Config::default();
        config.logging.directives = vec!["tollgate_runtime=debug".to_owned(), " ".to_owned()];
        assert_eq!(field_of(validate(&config)), "logging.directives");
    }
}
