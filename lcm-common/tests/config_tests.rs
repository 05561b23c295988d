//! Tests for bootstrap configuration loading and root folder resolution
//!
//! Tests that touch LCM_ROOT_FOLDER are marked #[serial] so they do not race
//! on the process environment.

use lcm_common::config::{
    ensure_root_folder, load_toml_config, resolve_root_folder, TomlConfig, DATABASE_FILE,
    ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};

#[test]
fn test_missing_config_file_yields_defaults() {
    let config = load_toml_config(Path::new("/nonexistent/lcm/lcm-enrich.toml")).unwrap();
    assert!(config.root_folder.is_none());
    assert!(config.port.is_none());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_full_config_file_parses() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lcm-enrich.toml");
    std::fs::write(
        &path,
        r#"
root_folder = "/srv/lcm"
port = 6001

[logging]
level = "debug"

[z2data]
api_key = "secret-key"
base_url = "http://localhost:9999"
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/lcm")));
    assert_eq!(config.port, Some(6001));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.z2data.api_key.as_deref(), Some("secret-key"));
    assert_eq!(config.z2data.base_url.as_deref(), Some("http://localhost:9999"));
}

#[test]
fn test_malformed_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "port = \"not a number\"").unwrap();

    let err = load_toml_config(&path).unwrap_err();
    assert!(matches!(err, lcm_common::Error::Toml(_)));
}

#[test]
#[serial]
fn test_cli_argument_wins_over_environment() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/lcm-from-env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/lcm-from-toml")),
        ..Default::default()
    };

    let resolved = resolve_root_folder(Some(Path::new("/tmp/lcm-from-cli")), &config);
    assert_eq!(resolved, PathBuf::from("/tmp/lcm-from-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_environment_wins_over_toml() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/lcm-from-env");
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/lcm-from-toml")),
        ..Default::default()
    };

    let resolved = resolve_root_folder(None, &config);
    assert_eq!(resolved, PathBuf::from("/tmp/lcm-from-env"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_toml_used_when_no_override() {
    env::remove_var(ROOT_FOLDER_ENV);
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/lcm-from-toml")),
        ..Default::default()
    };

    let resolved = resolve_root_folder(None, &config);
    assert_eq!(resolved, PathBuf::from("/tmp/lcm-from-toml"));
}

#[test]
#[serial]
fn test_default_root_folder_when_nothing_configured() {
    env::remove_var(ROOT_FOLDER_ENV);
    let resolved = resolve_root_folder(None, &TomlConfig::default());
    assert!(!resolved.as_os_str().is_empty());
}

#[test]
fn test_ensure_root_folder_creates_directory() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("nested").join("lcm");

    let db_path = ensure_root_folder(&root).unwrap();
    assert!(root.is_dir());
    assert_eq!(db_path, root.join(DATABASE_FILE));
}
