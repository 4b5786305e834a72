// tests/config_loading.rs

mod common;
use crate::common::builders::ConfigFileBuilder;

use std::path::Path;

use runtime_validator::config::{ConfigSource, load_and_validate, load_or_builtin};
use runtime_validator::errors::ValidatorError;
use runtime_validator::registry::{Invocation, SourceRef};
use runtime_validator::types::RunExit;

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("RuntimeValidator.toml");
    std::fs::write(&path, body).unwrap();
    path
}

#[test]
fn explicit_missing_config_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_or_builtin(Some(&dir.path().join("nope.toml"))).unwrap_err();

    assert!(matches!(err, ValidatorError::ConfigError(_)));
    assert_eq!(err.run_exit(), RunExit::Usage);
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn builtin_registry_lists_the_four_runtimes_in_order() {
    let loaded = load_or_builtin(None).unwrap();
    // The test binary runs from the crate root, which ships no default config.
    assert_eq!(loaded.source, ConfigSource::Builtin);

    let keys: Vec<&str> = loaded.config.check_keys().collect();
    assert_eq!(keys, vec!["python", "java", "node", "postgres"]);

    let registry = loaded.config.registry(&loaded.base_dir).unwrap();
    assert_eq!(
        registry.get("node").unwrap().invocation,
        Invocation::Local(Path::new(".").join("checks/check-node.sh"))
    );
}

#[test]
fn relative_paths_resolve_against_the_config_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[[check]]
key = "python"
path = "checks/check-python.sh"

[[check]]
key = "postgres"
name = "PostgreSQL client"
path = "/opt/checks/check-postgres.sh"
"#,
    );

    let loaded = load_or_builtin(Some(&path)).unwrap();
    assert_eq!(loaded.source, ConfigSource::File(path.clone()));
    assert_eq!(loaded.base_dir, dir.path());

    let registry = loaded.config.registry(&loaded.base_dir).unwrap();
    assert_eq!(
        registry.get("python").unwrap().invocation,
        Invocation::Local(dir.path().join("checks/check-python.sh"))
    );
    assert_eq!(
        registry.get("postgres").unwrap().invocation,
        Invocation::Local("/opt/checks/check-postgres.sh".into())
    );
}

#[test]
fn fetched_checks_join_the_suite_base() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[suite]
base = "https://artifacts.example/suite/"

[[check]]
key = "java"
fetch = "check-java.sh"
"#,
    );

    let config = load_and_validate(&path).unwrap();
    match &config.checks[0].invocation {
        Invocation::Fetched(SourceRef::Url(url)) => {
            assert_eq!(url.as_str(), "https://artifacts.example/suite/check-java.sh");
        }
        other => panic!("expected a fetched url, got {other:?}"),
    }
}

#[test]
fn malformed_toml_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "[[check]\nkey = ");

    let err = load_and_validate(&path).unwrap_err();
    assert!(matches!(err, ValidatorError::TomlError(_)));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn unknown_fields_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"
[run]
continue_on_failure = true
retries = 3
"#,
    );

    let err = load_and_validate(&path).unwrap_err();
    assert!(err.to_string().contains("retries"), "{err}");
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn built_config_keeps_declaration_order_and_publish_settings() {
    let config = ConfigFileBuilder::new()
        .suite_base("https://artifacts.example/suite/")
        .with_fetched_check("java", "check-java.sh")
        .with_local_check("python", "checks/check-python.sh")
        .continue_on_failure(true)
        .instance_name("vm-built")
        .publish_to_directory("/mnt/results")
        .build();

    assert!(config.run.continue_on_failure);
    assert_eq!(config.publish.resolve_instance_name(), "vm-built");
    assert_eq!(
        config.publish.directory.as_ref().map(|d| d.root.clone()),
        Some("/mnt/results".into())
    );

    let registry = config.registry(Path::new("/etc/validator")).unwrap();
    let keys: Vec<&str> = registry.keys().collect();
    assert_eq!(keys, vec!["java", "python"]);
    assert_eq!(
        registry.get("python").unwrap().invocation,
        Invocation::Local(Path::new("/etc/validator").join("checks/check-python.sh"))
    );
}
