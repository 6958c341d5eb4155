// tests/config_test.rs
use roadnik_release::artifacts::EmptyScanPolicy;
use roadnik_release::config::{load_config, Config, CONFIG_FILE_NAME};
use roadnik_release::ReleaseError;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tempfile::{NamedTempFile, TempDir};

#[test]
fn test_load_default_config() {
    let config = Config::default();
    assert_eq!(config.paths.output_dir, PathBuf::from("output"));
    assert_eq!(config.paths.artifacts_dir, PathBuf::from("artifacts"));
    assert_eq!(
        config.client.artifact_patterns.get("android").map(String::as_str),
        Some(r"-(Signed)\.apk$|-(Signed)\.aab$")
    );
    assert_eq!(config.server.archive_name, "server-{platform}.zip");
    assert_eq!(config.image.extra_tags, vec!["latest".to_string()]);
}

#[test]
fn test_load_from_file() {
    let mut temp_file = NamedTempFile::new().unwrap();
    let toml_content = r#"
[repository]
remote = "upstream"
push_tag = false

[repository.identity]
name = "casualshammy"
email = "ci@roadnik.app"

[client]
default_framework = "net9.0-ios"
on_empty_scan = "skip"

[client.artifact_patterns]
ios = '-(Signed)\.ipa$'

[image]
platforms = ["linux/amd64"]
"#;
    temp_file.write_all(toml_content.as_bytes()).unwrap();
    temp_file.flush().unwrap();

    let root = TempDir::new().unwrap();
    let config = load_config(Some(temp_file.path()), root.path()).unwrap();

    assert_eq!(config.repository.remote, "upstream");
    assert!(!config.repository.push_tag);
    assert!(config.repository.merge_back);
    assert_eq!(config.repository.identity.unwrap().email, "ci@roadnik.app");
    assert_eq!(config.client.default_framework, "net9.0-ios");
    assert_eq!(config.client.on_empty_scan, EmptyScanPolicy::Skip);
    assert!(config.client.artifact_patterns.contains_key("ios"));
    assert_eq!(config.image.platforms, vec!["linux/amd64".to_string()]);
    assert_eq!(config.image.repo_env, "DOCKER_REPO");
}

#[test]
fn test_load_from_project_root() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join(CONFIG_FILE_NAME),
        "[repository]\ntrunk = \"develop\"\n",
    )
    .unwrap();

    let config = load_config(None, root.path()).unwrap();
    assert_eq!(config.repository.trunk, "develop");
}

#[test]
fn test_invalid_file_is_config_error() {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(b"[repository\ntrunk = ").unwrap();
    temp_file.flush().unwrap();

    let root = TempDir::new().unwrap();
    let err = load_config(Some(temp_file.path()), root.path()).unwrap_err();
    assert!(matches!(err, ReleaseError::Config(_)));
}

#[test]
fn test_missing_explicit_file_is_config_error() {
    let root = TempDir::new().unwrap();
    let err = load_config(Some(root.path().join("nope.toml").as_path()), root.path()).unwrap_err();
    assert!(matches!(err, ReleaseError::Config(_)));
}
