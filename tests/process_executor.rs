// tests/process_executor.rs
#![cfg(unix)]

mod common;
use crate::common::{init_tracing, script, with_timeout};

use std::path::{Path, PathBuf};
use std::time::Duration;

use runtime_validator::exec::{CheckExecutor, ProcessExecutor};
use runtime_validator::registry::{CheckDescriptor, Invocation, ResolvedCheck};

fn check_at(key: &str, executable: PathBuf) -> ResolvedCheck {
    ResolvedCheck {
        descriptor: CheckDescriptor::new(key, key, 1, Invocation::Local(executable.clone())),
        executable,
    }
}

async fn run(executor: &ProcessExecutor, key: &str, path: &Path) -> runtime_validator::exec::ExecOutcome {
    let check = check_at(key, path.to_path_buf());
    with_timeout(executor.execute(&check, false)).await
}

#[tokio::test]
async fn passing_script_reports_exit_zero_and_output() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = script(dir.path(), "check-python.sh", "echo python 3.12 found\nexit 0");

    let outcome = run(&ProcessExecutor::default(), "python", &path).await;

    assert_eq!(outcome.exit_code, Some(0));
    assert!(outcome.success());
    assert_eq!(outcome.output, "python 3.12 found\n");
    assert!(outcome.detail.is_none());
}

#[tokio::test]
async fn failing_script_keeps_exit_code_and_merges_stderr() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = script(
        dir.path(),
        "check-java.sh",
        "echo looking for java\necho 'java: command not found' >&2\nexit 7",
    );

    let outcome = run(&ProcessExecutor::default(), "java", &path).await;

    assert_eq!(outcome.exit_code, Some(7));
    assert!(!outcome.success());
    assert!(outcome.output.contains("looking for java"));
    assert!(outcome.output.contains("java: command not found"));
}

#[tokio::test]
async fn missing_executable_is_not_invoked() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let outcome = run(
        &ProcessExecutor::default(),
        "node",
        &dir.path().join("check-node.sh"),
    )
    .await;

    assert_eq!(outcome.exit_code, None);
    assert!(!outcome.success());
    assert!(outcome.detail.unwrap().contains("executable not found"));
}

#[tokio::test]
async fn file_without_execute_bit_is_not_invoked() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("check-postgres.sh");
    std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();

    let outcome = run(&ProcessExecutor::default(), "postgres", &path).await;

    assert_eq!(outcome.exit_code, None);
    assert!(outcome.detail.unwrap().contains("no execute permission"));
}

#[tokio::test]
async fn directory_is_not_invoked() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let outcome = run(&ProcessExecutor::default(), "python", dir.path()).await;

    assert_eq!(outcome.exit_code, None);
    assert!(outcome.detail.unwrap().contains("is a directory"));
}

#[tokio::test]
async fn slow_check_is_killed_at_the_timeout() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = script(dir.path(), "check-slow.sh", "echo started\nexec sleep 30");

    let executor = ProcessExecutor::new(Some(Duration::from_millis(300)));
    let started = std::time::Instant::now();
    let outcome = run(&executor, "slow", &path).await;

    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(outcome.exit_code, None);
    assert!(outcome.output.contains("started"));
    assert!(outcome.detail.unwrap().starts_with("timed out after"));
}
