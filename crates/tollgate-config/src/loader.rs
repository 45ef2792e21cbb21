//! Config file discovery and layered loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` as the base
//! 2. Merge the user config (`~/.tollgate/config.toml`, else `$TOLLGATE_HOME/config.toml`)
//! 3. Merge `{workspace}/.tollgate/config.toml` with restriction enforcement
//! 4. Apply env var fallbacks for fields no file set
//! 5. Deserialize the merged tree into [`Config`]
//! 6. Validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::env::{TOLLGATE_HOME_VAR, apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{ConfigLayer, FieldSources, deep_merge_tracking, enforce_restrictions};
use crate::resolved::ResolvedConfig;
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Directory holding user and workspace config files.
const CONFIG_DIR: &str = ".tollgate";

/// Config file name inside [`CONFIG_DIR`].
const CONFIG_FILE: &str = "config.toml";

/// Maximum allowed config file size (1 MB).
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load the configuration with layered file precedence.
///
/// `workspace_root` is the root of the current project. If `None`, the
/// workspace layer is skipped. `home_override` names a directory that holds
/// `config.toml` directly, bypassing home discovery and `TOLLGATE_HOME`.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is malformed, or if the
/// final merged configuration fails validation.
pub fn load(
    workspace_root: Option<&Path>,
    home_override: Option<&Path>,
) -> ConfigResult<ResolvedConfig> {
    load_with_env(workspace_root, home_override, &collect_env_vars())
}

/// [`load`] against an explicit environment.
pub(crate) fn load_with_env(
    workspace_root: Option<&Path>,
    home_override: Option<&Path>,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<ResolvedConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let mut field_sources = FieldSources::new();
    let mut loaded_files = Vec::new();
    record_defaults(&merged, "", &mut field_sources);

    if let Some((overlay, path)) = load_user_layer(home_override, env_vars)? {
        deep_merge_tracking(
            &mut merged,
            &overlay,
            "",
            ConfigLayer::User,
            &mut field_sources,
        );
        info!(path = %path.display(), "loaded user config");
        loaded_files.push(path.display().to_string());
    }

    // The pre-workspace tree is the baseline restrictions are measured
    // against, so they hold even with no user config.
    if let Some(ws_root) = workspace_root {
        let ws_path = ws_root.join(CONFIG_DIR).join(CONFIG_FILE);
        if let Some(overlay) = try_load_file(&ws_path)? {
            let baseline = merged.clone();
            deep_merge_tracking(
                &mut merged,
                &overlay,
                "",
                ConfigLayer::Workspace,
                &mut field_sources,
            );
            enforce_restrictions(&mut merged, &baseline, &overlay);
            info!(path = %ws_path.display(), "loaded workspace config");
            loaded_files.push(ws_path.display().to_string());
        }
    }

    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars);
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    validate::validate(&config)?;

    Ok(ResolvedConfig {
        config,
        field_sources,
        loaded_files,
    })
}

fn load_user_layer(
    home_override: Option<&Path>,
    env_vars: &HashMap<String, String>,
) -> ConfigResult<Option<(toml::Value, PathBuf)>> {
    if let Some(dir) = home_override {
        let path = dir.join(CONFIG_FILE);
        return Ok(try_load_file(&path)?.map(|overlay| (overlay, path)));
    }

    let home_dir = home_directory()?;
    let user_path = home_dir.join(CONFIG_DIR).join(CONFIG_FILE);
    if let Some(overlay) = try_load_file(&user_path)? {
        return Ok(Some((overlay, user_path)));
    }

    let Some(raw) = env_vars.get(TOLLGATE_HOME_VAR) else {
        return Ok(None);
    };
    let Some(canonical) = validate_tollgate_home(raw, &home_dir) else {
        warn!(
            path = %raw,
            "TOLLGATE_HOME is not a directory owned by the current user; ignoring"
        );
        return Ok(None);
    };
    let alt_path = canonical.join(CONFIG_FILE);
    Ok(try_load_file(&alt_path)?.map(|overlay| (overlay, alt_path)))
}

/// Load a config from a specific file path (no layering).
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, parsed, or fails
/// validation.
pub fn load_file(path: &Path) -> ConfigResult<Config> {
    let Some(value) = try_load_file(path)? else {
        return Err(ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
    };

    let config: Config = value.try_into().map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    validate::validate(&config)?;
    Ok(config)
}

/// Try to load a file, returning `None` if it doesn't exist.
///
/// Reads once with no prior existence check, so there is no window between
/// checking and reading.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {MAX_CONFIG_FILE_SIZE} byte limit",
                content.len(),
            ),
        });
    }

    let value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

/// Check that a `TOLLGATE_HOME` path is a real directory owned by the user
/// who owns `home_dir`. Returns the canonicalized path on success.
fn validate_tollgate_home(raw_path: &str, home_dir: &Path) -> Option<PathBuf> {
    let canonical = PathBuf::from(raw_path).canonicalize().ok()?;

    if !canonical.is_dir() {
        return None;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        let dir_uid = canonical.metadata().ok()?.uid();
        let home_uid = home_dir.metadata().ok()?.uid();
        if dir_uid != home_uid {
            return None;
        }
    }

    #[cfg(not(unix))]
    let _ = home_dir;

    Some(canonical)
}

fn home_directory() -> ConfigResult<PathBuf> {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().to_path_buf())
        .ok_or(ConfigError::NoHomeDir)
}

/// Mark every leaf of the defaults tree with the `Defaults` layer.
fn record_defaults(val: &toml::Value, prefix: &str, sources: &mut FieldSources) {
    if let toml::Value::Table(table) = val {
        for (key, child) in table {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            record_defaults(child, &path, sources);
        }
    } else {
        sources.insert(prefix.to_owned(), ConfigLayer::Defaults);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &Path, content: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(CONFIG_FILE), content).unwrap();
    }

    #[test]
    fn test_defaults_match_struct_defaults() {
        let config: Config = toml::from_str(DEFAULTS_TOML).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_with_defaults_only() {
        let home = tempfile::tempdir().unwrap();
        let resolved = load_with_env(None, Some(home.path()), &HashMap::new()).unwrap();

        assert_eq!(resolved.config, Config::default());
        assert!(resolved.loaded_files.is_empty());
        assert_eq!(
            resolved.source_of("sandbox.program_namespace"),
            Some(ConfigLayer::Defaults)
        );
    }

    #[test]
    fn test_user_layer_overrides_defaults() {
        let home = tempfile::tempdir().unwrap();
        write_config(
            home.path(),
            "[sandbox]\nprogram_namespace = \"app\"\n[registry]\nenabled = true",
        );

        let resolved = load_with_env(None, Some(home.path()), &HashMap::new()).unwrap();

        assert_eq!(resolved.config.sandbox.program_namespace, "app");
        assert!(resolved.config.registry.enabled);
        assert_eq!(resolved.loaded_files.len(), 1);
        assert_eq!(
            resolved.source_of("registry.enabled"),
            Some(ConfigLayer::User)
        );
    }

    #[test]
    fn test_workspace_layer_is_restricted() {
        let home = tempfile::tempdir().unwrap();
        let ws = tempfile::tempdir().unwrap();
        write_config(
            &ws.path().join(CONFIG_DIR),
            r#"
            [sandbox]
            program_namespace = "os"
            [methods.approved]
            str = ["upper", "__class__"]
            "#,
        );

        let resolved =
            load_with_env(Some(ws.path()), Some(home.path()), &HashMap::new()).unwrap();

        assert_eq!(resolved.config.sandbox.program_namespace, "__main__");
        assert_eq!(resolved.config.methods.approved["str"], vec!["upper"]);
        assert!(resolved.config.methods.is_approved("list", "append"));
    }

    #[test]
    fn test_env_fallback_applies_only_to_unset_fields() {
        let home = tempfile::tempdir().unwrap();
        write_config(home.path(), "[logging]\nlevel = \"warn\"");
        let env = HashMap::from([
            ("TOLLGATE_LOG_LEVEL".to_owned(), "trace".to_owned()),
            ("TOLLGATE_LOG_FORMAT".to_owned(), "json".to_owned()),
        ]);

        let resolved = load_with_env(None, Some(home.path()), &env).unwrap();

        assert_eq!(resolved.config.logging.level, "warn");
        assert_eq!(resolved.config.logging.format, "json");
        assert_eq!(
            resolved.source_of("logging.format"),
            Some(ConfigLayer::Environment)
        );
    }

    #[test]
    fn test_env_cannot_make_builtins_the_program_namespace() {
        let home = tempfile::tempdir().unwrap();
        let env = HashMap::from([(
            "TOLLGATE_PROGRAM_NAMESPACE".to_owned(),
            "builtins".to_owned(),
        )]);

        let result = load_with_env(None, Some(home.path()), &env);
        assert!(matches!(
            result,
            Err(ConfigError::ValidationError { ref field, .. }) if field == "sandbox.program_namespace"
        ));
    }

    #[test]
    fn test_invalid_merged_config_is_rejected() {
        let home = tempfile::tempdir().unwrap();
        write_config(home.path(), "[methods.approved]\nmodule = [\"system\"]");

        let result = load_with_env(None, Some(home.path()), &HashMap::new());
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let home = tempfile::tempdir().unwrap();
        write_config(home.path(), "[sandbox\nprogram_namespace = ");

        let result = load_with_env(None, Some(home.path()), &HashMap::new());
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_load_file_nonexistent() {
        let result = load_file(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn test_load_file_single() {
        let dir = tempfile::tempdir().unwrap();
        write_config(dir.path(), "[logging]\nformat = \"pretty\"");

        let config = load_file(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.sandbox.program_namespace, "__main__");
    }

    #[test]
    fn test_record_defaults() {
        let val: toml::Value = toml::from_str(DEFAULTS_TOML).unwrap();
        let mut sources = FieldSources::new();
        record_defaults(&val, "", &mut sources);

        assert_eq!(sources.get("logging.level"), Some(&ConfigLayer::Defaults));
        assert_eq!(
            sources.get("methods.approved.str"),
            Some(&ConfigLayer::Defaults)
        );
    }

    #[test]
    fn test_tollgate_home_must_exist() {
        let home = tempfile::tempdir().unwrap();
        assert!(validate_tollgate_home("/nonexistent/tollgate", home.path()).is_none());

        let alt = tempfile::tempdir().unwrap();
        let path = alt.path().to_str().unwrap();
        assert!(validate_tollgate_home(path, home.path()).is_some());
    }

    #[test]
    fn test_oversized_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("huge.toml");
        let data = "x = \"".to_owned() + &"a".repeat(1_100_000) + "\"";
        std::fs::write(&file_path, data).unwrap();

        let result = try_load_file(&file_path);
        assert!(
            matches!(result, Err(ConfigError::ValidationError { .. })),
            "expected ValidationError for oversized config, got: {result:?}"
        );
    }
}
