// tests/cli_exit_codes.rs
#![cfg(unix)]

mod common;
use crate::common::script;

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use runtime_validator::publish::ResultEnvelope;
use runtime_validator::types::OverallStatus;

/// A scratch directory with two check scripts and a config pointing at them.
struct Sandbox {
    dir: tempfile::TempDir,
}

impl Sandbox {
    fn new(python_exit: i32, node_exit: i32, extra: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("checks")).unwrap();
        script(
            &dir.path().join("checks"),
            "check-python.sh",
            &format!("echo python check\nexit {python_exit}"),
        );
        script(
            &dir.path().join("checks"),
            "check-node.sh",
            &format!("echo node check\nexit {node_exit}"),
        );

        let config = format!(
            r#"
[[check]]
key = "python"
name = "Python"
path = "checks/check-python.sh"

[[check]]
key = "node"
name = "Node.js"
path = "checks/check-node.sh"
{extra}
"#
        );
        std::fs::write(dir.path().join("RuntimeValidator.toml"), config).unwrap();
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn cmd(&self, subcommand: Option<&str>) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!("runtime-validator");
        cmd.current_dir(self.path());
        if let Some(sub) = subcommand {
            cmd.arg(sub);
        }
        cmd.arg("--config")
            .arg(self.path().join("RuntimeValidator.toml"))
            .arg("--work-dir")
            .arg(self.path().join("work"))
            .arg("--log-file")
            .arg(self.log_file());
        cmd
    }

    fn log_file(&self) -> PathBuf {
        self.path().join("validation.log")
    }

    /// Add a directory transport for `instance`; returns the results root.
    fn publish_to_directory(&self, instance: &str) -> PathBuf {
        let results = self.path().join("results");
        let config = self.path().join("RuntimeValidator.toml");
        let body = std::fs::read_to_string(&config).unwrap();
        std::fs::write(
            &config,
            format!(
                "{body}\n[publish]\ninstance_name = \"{instance}\"\n\n[publish.directory]\nroot = \"{}\"\n",
                results.display()
            ),
        )
        .unwrap();
        results
    }
}

#[test]
fn all_checks_passing_exits_zero_and_prints_the_signal() {
    let sandbox = Sandbox::new(0, 0, "");

    sandbox
        .cmd(None)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("RUNTIME_VALIDATION_RESULT=Pass"))
        .stdout(predicate::str::contains("passed: 2  failed: 0"));

    let log = std::fs::read_to_string(sandbox.log_file()).unwrap();
    assert!(log.contains("python check"));
    assert!(log.contains("overall=Pass"));
}

#[test]
fn failing_check_exits_one_and_skips_the_rest() {
    let sandbox = Sandbox::new(3, 0, "");

    sandbox
        .cmd(Some("validate"))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("RUNTIME_VALIDATION_RESULT=Fail"))
        .stdout(predicate::str::contains("node check").not());
}

#[test]
fn continue_on_failure_runs_every_check() {
    let sandbox = Sandbox::new(3, 0, "");

    let output = sandbox
        .cmd(None)
        .arg("--continue-on-failure")
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8_lossy(&output);
    assert!(text.contains("passed: 1  failed: 1"), "{text}");
}

#[test]
fn runtime_filter_only_counts_the_selected_check() {
    let sandbox = Sandbox::new(3, 0, "");

    sandbox
        .cmd(None)
        .args(["--runtime", "node"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("RUNTIME_VALIDATION_RESULT=Pass"));
}

#[test]
fn unknown_runtime_filter_is_a_usage_error() {
    let sandbox = Sandbox::new(0, 0, "");

    sandbox
        .cmd(None)
        .args(["--runtime", "cobol"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cobol"));
}

#[test]
fn missing_config_file_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();

    cargo_bin_cmd!("runtime-validator")
        .current_dir(dir.path())
        .arg("--config")
        .arg(dir.path().join("missing.toml"))
        .assert()
        .code(2);
}

#[test]
fn unreachable_suite_source_is_a_setup_fault() {
    let sandbox = Sandbox::new(
        0,
        0,
        r#"
[[check]]
key = "java"
fetch = "/nonexistent/suite/check-java.sh"
"#,
    );

    sandbox
        .cmd(None)
        .assert()
        .code(3)
        .stdout(predicate::str::contains("RUNTIME_VALIDATION_RESULT").not());
}

#[test]
fn skip_setup_reuses_the_fetched_copy() {
    let suite = tempfile::tempdir().unwrap();
    let origin = script(suite.path(), "check-java.sh", "echo java check\nexit 0");
    let sandbox = Sandbox::new(
        0,
        0,
        &format!("\n[[check]]\nkey = \"java\"\nfetch = \"{}\"\n", origin.display()),
    );

    sandbox.cmd(None).assert().code(0);
    assert!(sandbox.path().join("work/suite/java/check-java.sh").is_file());

    // The origin now fails; the reused copy must still pass.
    std::fs::write(&origin, "#!/bin/sh\nexit 9\n").unwrap();
    sandbox
        .cmd(None)
        .arg("--skip-setup")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("passed: 3  failed: 0"));
}

#[test]
fn skip_setup_without_a_fetched_copy_is_a_setup_fault() {
    let suite = tempfile::tempdir().unwrap();
    let origin = script(suite.path(), "check-java.sh", "exit 0");
    let sandbox = Sandbox::new(
        0,
        0,
        &format!("\n[[check]]\nkey = \"java\"\nfetch = \"{}\"\n", origin.display()),
    );

    sandbox
        .cmd(None)
        .arg("--skip-setup")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("no previously fetched copy"))
        .stdout(predicate::str::contains("RUNTIME_VALIDATION_RESULT").not());
}

#[test]
fn cleanup_only_removes_work_dir_and_log() {
    let sandbox = Sandbox::new(1, 1, "");
    std::fs::create_dir_all(sandbox.path().join("work/suite/java")).unwrap();
    std::fs::write(sandbox.path().join("work/suite/java/check-java.sh"), "exit 0").unwrap();
    std::fs::write(sandbox.log_file(), "old run\n").unwrap();

    sandbox
        .cmd(Some("validate"))
        .arg("--cleanup-only")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("removed"))
        .stdout(predicate::str::contains("python check").not());

    assert!(!sandbox.path().join("work").exists());
    assert!(!sandbox.log_file().exists());
}

#[test]
fn unsafe_instance_name_is_a_usage_error() {
    let sandbox = Sandbox::new(0, 0, "");

    sandbox
        .cmd(Some("worker"))
        .args(["--instance-name", "vm;touch pwned;"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--instance-name"));

    assert!(!sandbox.path().join("pwned").exists());
}

#[test]
fn dry_run_prints_the_plan_without_running() {
    let sandbox = Sandbox::new(1, 1, "");

    sandbox
        .cmd(None)
        .arg("--dry-run")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Python (python)"))
        .stdout(predicate::str::contains("python check").not());

    assert!(!sandbox.log_file().exists());
}

#[test]
fn worker_publishes_the_envelope_to_a_directory() {
    let sandbox = Sandbox::new(0, 4, "");
    let results = sandbox.publish_to_directory("vm-cli");

    sandbox
        .cmd(Some("worker"))
        .arg("--continue-on-failure")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("RUNTIME_VALIDATION_RESULT=Fail"));

    let record = results.join("runtime-validation/vm-cli/validation-result.json");
    let envelope = ResultEnvelope::from_json(&std::fs::read(&record).unwrap()).unwrap();
    assert_eq!(envelope.instance_name, "vm-cli");
    assert_eq!(envelope.scan_result, OverallStatus::Fail);
    assert_eq!(envelope.checks.len(), 2);
    assert!(results.join("runtime-validation/vm-cli/validation.log").is_file());
}

#[test]
fn verdict_prefers_the_durable_record() {
    let dir = tempfile::tempdir().unwrap();
    let console = dir.path().join("console.txt");
    std::fs::write(&console, "booting\nRUNTIME_VALIDATION_RESULT=Pass\n").unwrap();
    let record = dir.path().join("validation-result.json");
    let envelope = ResultEnvelope::for_setup_fault("vm-v", "suite unreachable", "none");
    std::fs::write(&record, envelope.to_json().unwrap()).unwrap();

    cargo_bin_cmd!("runtime-validator")
        .arg("verdict")
        .arg("--console")
        .arg(&console)
        .arg("--record")
        .arg(&record)
        .assert()
        .code(1)
        .stdout(predicate::str::contains("verdict: Fail (durable record)"));

    cargo_bin_cmd!("runtime-validator")
        .arg("verdict")
        .arg("--console")
        .arg(&console)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("verdict: Pass (transient signal)"));
}

#[test]
fn verdict_without_inputs_is_a_usage_error() {
    cargo_bin_cmd!("runtime-validator")
        .arg("verdict")
        .assert()
        .code(2);
}

#[test]
fn closed_stdout_does_not_stop_a_verbose_worker() {
    let sandbox = Sandbox::new(0, 0, "");
    let results = sandbox.publish_to_directory("vm-pipe");
    let status_file = sandbox.path().join("status");

    // The reader exits at once, so every stdout write hits a broken pipe.
    let status = std::process::Command::new("sh")
        .arg("-c")
        .arg(r#"{ "$0" worker --verbose --config "$1" --work-dir "$2" --log-file "$3"; echo $? > "$4"; } | true"#)
        .arg(env!("CARGO_BIN_EXE_runtime-validator"))
        .arg(sandbox.path().join("RuntimeValidator.toml"))
        .arg(sandbox.path().join("work"))
        .arg(sandbox.log_file())
        .arg(&status_file)
        .current_dir(sandbox.path())
        .status()
        .unwrap();

    assert!(status.success());
    assert_eq!(std::fs::read_to_string(&status_file).unwrap().trim(), "0");
    let record = results.join("runtime-validation/vm-pipe/validation-result.json");
    let envelope = ResultEnvelope::from_json(&std::fs::read(&record).unwrap()).unwrap();
    assert_eq!(envelope.scan_result, OverallStatus::Pass);
}
