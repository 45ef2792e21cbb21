//! Test harness helpers.

use std::path::PathBuf;
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Create a temporary directory for testing.
///
/// The directory is removed when the returned `TempDir` is dropped.
///
/// # Panics
///
/// Panics if the temporary directory cannot be created.
#[must_use]
pub fn test_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Create a file within a temporary directory, creating parents as needed.
///
/// Returns the path to the created file.
///
/// # Panics
///
/// Panics if the file cannot be created or written.
#[must_use]
pub fn test_file_in_dir(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directories");
    }
    std::fs::write(&path, content).expect("Failed to write file");
    path
}

/// Write `content` as the config file of a `.tollgate` directory under `root`.
///
/// Returns the path to the written `config.toml`.
#[must_use]
pub fn write_workspace_config(root: &TempDir, content: &str) -> PathBuf {
    test_file_in_dir(root, ".tollgate/config.toml", content)
}

/// Set up test logging with the given filter.
///
/// Safe to call from every test; only the first call installs a subscriber.
///
/// ```rust,ignore
/// use tollgate_test::setup_test_logging;
///
/// #[test]
/// fn my_test() {
///     setup_test_logging("tollgate_capabilities=trace");
/// }
/// ```
pub fn setup_test_logging(filter: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_thread_ids(true)
        .with_test_writer()
        .try_init();
}

/// Set up test logging at warn level, which shows denied calls.
pub fn setup_test_logging_default() {
    setup_test_logging("warn");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_in_dir_helper() {
        let dir = test_dir();
        let path = test_file_in_dir(&dir, "subdir/test.txt", "content");

        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "content");
    }

    #[test]
    fn test_workspace_config_location() {
        let dir = test_dir();
        let path = write_workspace_config(&dir, "[registry]\nenabled = true");
        assert!(path.ends_with(".tollgate/config.toml"));
    }
}
