//! Bridge from `tollgate_config::Config` to runtime types.
//!
//! The config crate has no dependencies on other internal crates. Hosts
//! load a [`Config`] once at startup and convert it here into the validator,
//! the context registry, and the logging setup.

use std::sync::Arc;

use tollgate_capabilities::ContextRegistry;
use tollgate_config::Config;
use tollgate_telemetry::{LogConfig, LogFormat};

use crate::attribute::AllowlistAttributePolicy;
use crate::validator::CallValidator;

/// Convert the `[methods]` section to an attribute-access allowlist.
#[must_use]
pub fn to_attribute_policy(cfg: &Config) -> AllowlistAttributePolicy {
    AllowlistAttributePolicy::from_config(&cfg.methods)
}

/// Build a [`CallValidator`] for the configured program namespace and
/// approved methods.
#[must_use]
pub fn to_call_validator(cfg: &Config) -> CallValidator {
    CallValidator::new(
        cfg.sandbox.program_namespace.clone(),
        Arc::new(to_attribute_policy(cfg)),
    )
}

/// A fresh context registry if `[registry] enabled` is set.
#[must_use]
pub fn to_registry(cfg: &Config) -> Option<Arc<ContextRegistry>> {
    cfg.registry
        .enabled
        .then(|| Arc::new(ContextRegistry::new()))
}

/// Convert the `[logging]` section to a [`LogConfig`].
#[must_use]
pub fn to_log_config(cfg: &Config) -> LogConfig {
    let format = match cfg.logging.format.as_str() {
        "pretty" => LogFormat::Pretty,
        "json" => LogFormat::Json,
        "full" => LogFormat::Full,
        _ => LogFormat::Compact,
    };

    cfg.logging
        .directives
        .iter()
        .fold(
            LogConfig::new(&cfg.logging.level).with_format(format),
            |log_config, directive| log_config.with_directive(directive),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{AttributePolicy, ContainerType};
    use crate::validator::CallPermission;
    use crate::value::{Callable, Receiver, Value};

    fn ok(_: &[Value]) -> crate::CallResult<Value> {
        Ok(Value::None)
    }

    #[test]
    fn attribute_policy_follows_methods_section() {
        let policy = to_attribute_policy(&Config::default());
        assert!(policy.is_approved(ContainerType::Str, "upper"));
        assert!(policy.is_approved(ContainerType::FrozenSet, "union"));
        assert!(!policy.is_approved(ContainerType::Str, "__class__"));
    }

    #[test]
    fn call_validator_uses_configured_namespace() {
        let mut cfg = Config::default();
        cfg.sandbox.program_namespace = "app".to_string();
        let validator = to_call_validator(&cfg);

        assert_eq!(validator.program_namespace(), "app");
        assert_eq!(
            validator.classify(&Callable::function("main", "app", ok)),
            CallPermission::ProgramDefined
        );
        assert_eq!(
            validator.classify(&Callable::function("main", "__main__", ok)),
            CallPermission::Unauthorized
        );
        assert_eq!(
            validator.classify(&Callable::method(
                Receiver::Container(ContainerType::List),
                "append",
                ok
            )),
            CallPermission::SafeTypeMethod
        );
    }

    #[test]
    fn registry_only_when_enabled() {
        let mut cfg = Config::default();
        assert!(to_registry(&cfg).is_none());

        cfg.registry.enabled = true;
        let registry = to_registry(&cfg).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn log_config_maps_format_and_directives() {
        let mut cfg = Config::default();
        cfg.logging.level = "debug".to_string();
        cfg.logging.format = "json".to_string();
        cfg.logging.directives = vec!["tollgate_capabilities=trace".to_string()];

        let log = to_log_config(&cfg);
        assert_eq!(log.level, "debug");
        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(log.directives, vec!["tollgate_capabilities=trace"]);
    }

    #[test]
    fn log_config_unknown_format_is_compact() {
        let mut cfg = Config::default();
        cfg.logging.format = "mystery".to_string();
        assert_eq!(to_log_config(&cfg).format, LogFormat::Compact);
    }
}
