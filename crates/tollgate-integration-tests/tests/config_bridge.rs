//! Layered configuration flowing into the validator and logging setup.

mod common;

use tollgate_capabilities::scope;
use tollgate_config::{Config, ConfigError, ConfigLayer};
use tollgate_runtime::config_bridge;
use tollgate_runtime::{Callable, ContainerType, Value};
use tollgate_telemetry::LogFormat;
use tollgate_test::{
    bound_method, program_fn, test_context, test_dir, test_file_in_dir, vetted_host_fn,
    write_workspace_config,
};

use common::assert_unauthorized;

#[test]
fn defaults_produce_a_working_validator() {
    let home = test_dir();
    let resolved = Config::load_with_home(None, home.path()).unwrap();
    assert!(resolved.loaded_files.is_empty());

    let validator = config_bridge::to_call_validator(&resolved.config);
    assert_eq!(validator.program_namespace(), "__main__");
    assert!(validator.safe_call(&program_fn("main").into(), &[]).is_ok());
    assert!(
        validator
            .safe_call(&bound_method(ContainerType::Str, "upper").into(), &[])
            .is_ok()
    );
    assert!(config_bridge::to_registry(&resolved.config).is_none());
}

#[test]
fn workspace_can_narrow_approved_methods() {
    let home = test_dir();
    let workspace = test_dir();
    write_workspace_config(
        &workspace,
        r#"
[methods.approved]
str = ["upper"]
"#,
    );

    let resolved = Config::load_with_home(Some(workspace.path()), home.path()).unwrap();
    assert_eq!(
        resolved.source_of("methods.approved.str"),
        Some(ConfigLayer::Workspace)
    );

    let validator = config_bridge::to_call_validator(&resolved.config);
    assert!(
        validator
            .safe_call(&bound_method(ContainerType::Str, "upper").into(), &[])
            .is_ok()
    );
    assert_unauthorized(
        validator.safe_call(&bound_method(ContainerType::Str, "lower").into(), &[]),
        "str.lower",
    );
    // Types the workspace did not mention keep their defaults.
    assert!(
        validator
            .safe_call(&bound_method(ContainerType::List, "append").into(), &[])
            .is_ok()
    );
}

#[test]
fn workspace_cannot_widen_approved_methods() {
    let home = test_dir();
    let workspace = test_dir();
    write_workspace_config(
        &workspace,
        r#"
[methods.approved]
str = ["upper", "__class__"]
"#,
    );

    let resolved = Config::load_with_home(Some(workspace.path()), home.path()).unwrap();
    let validator = config_bridge::to_call_validator(&resolved.config);

    assert!(
        validator
            .safe_call(&bound_method(ContainerType::Str, "upper").into(), &[])
            .is_ok()
    );
    assert_unauthorized(
        validator.safe_call(&bound_method(ContainerType::Str, "__class__").into(), &[]),
        "str.__class__",
    );
}

#[test]
fn workspace_cannot_move_the_program_namespace() {
    let home = test_dir();
    let workspace = test_dir();
    write_workspace_config(
        &workspace,
        r#"
[sandbox]
program_namespace = "os"
"#,
    );

    let resolved = Config::load_with_home(Some(workspace.path()), home.path()).unwrap();
    assert_eq!(resolved.config.sandbox.program_namespace, "__main__");

    let validator = config_bridge::to_call_validator(&resolved.config);
    let system = Value::from(Callable::function("system", "os", |_: &[Value]| {
        Ok(Value::None)
    }));
    assert_unauthorized(validator.safe_call(&system, &[]), "system");
}

#[test]
fn user_layer_sets_namespace_and_registry() {
    let home = test_dir();
    test_file_in_dir(
        &home,
        "config.toml",
        r#"
[sandbox]
program_namespace = "app"

[registry]
enabled = true
"#,
    );

    let resolved = Config::load_with_home(None, home.path()).unwrap();
    assert_eq!(resolved.loaded_files.len(), 1);
    assert_eq!(
        resolved.source_of("sandbox.program_namespace"),
        Some(ConfigLayer::User)
    );

    let validator = config_bridge::to_call_validator(&resolved.config);
    let registry = config_bridge::to_registry(&resolved.config).unwrap();

    let app_fn = Value::from(Callable::function("run", "app", |_: &[Value]| {
        Ok(Value::Bool(true))
    }));
    assert_eq!(validator.safe_call(&app_fn, &[]).unwrap(), Value::Bool(true));
    assert_unauthorized(validator.safe_call(&program_fn("main").into(), &[]), "main");

    let ctx = test_context(&["FILE_READ"]);
    registry.register(&ctx).unwrap();
    assert!(registry.is_live(ctx.id()));

    let read = Value::from(vetted_host_fn("fs.read_text", "fs", &["FILE_READ"]));
    scope::with_context(ctx, || assert!(validator.safe_call(&read, &[]).is_ok()));
}

#[test]
fn logging_section_maps_to_log_config() {
    let home = test_dir();
    test_file_in_dir(
        &home,
        "config.toml",
        r#"
[logging]
level = "debug"
format = "json"
directives = ["tollgate_capabilities=trace"]
"#,
    );

    let resolved = Config::load_with_home(None, home.path()).unwrap();
    let log_config = config_bridge::to_log_config(&resolved.config);
    assert_eq!(log_config.level, "debug");
    assert_eq!(log_config.format, LogFormat::Json);
    assert_eq!(log_config.directives, vec!["tollgate_capabilities=trace"]);
}

#[test]
fn invalid_user_config_is_rejected() {
    let home = test_dir();
    test_file_in_dir(
        &home,
        "config.toml",
        r#"
[sandbox]
program_namespace = ""
"#,
    );

    let err = Config::load_with_home(None, home.path()).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::ValidationError { ref field, .. } if field == "sandbox.program_namespace"
    ));
}
