// src/types.rs

//! Small shared enums used by config, engine, publishing and the CLI.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Strategy requested on the command line or in `[run]`.
///
/// - `PerRuntime`: run each registered check as its own unit (default).
/// - `Global`: reserved name; not implemented, falls back to `PerRuntime`
///   with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    #[default]
    PerRuntime,
    Global,
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "per-runtime" | "per_runtime" => Ok(Strategy::PerRuntime),
            "global" => Ok(Strategy::Global),
            other => Err(format!(
                "invalid strategy: {other} (expected \"per-runtime\" or \"global\")"
            )),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::PerRuntime => f.write_str("per-runtime"),
            Strategy::Global => f.write_str("global"),
        }
    }
}

/// How the orchestrator reacts to a failed check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStrategy {
    SequentialStopOnFailure,
    SequentialContinueOnFailure,
}

impl ExecutionStrategy {
    pub fn from_continue_flag(continue_on_failure: bool) -> Self {
        if continue_on_failure {
            ExecutionStrategy::SequentialContinueOnFailure
        } else {
            ExecutionStrategy::SequentialStopOnFailure
        }
    }

    pub fn continue_on_failure(self) -> bool {
        matches!(self, ExecutionStrategy::SequentialContinueOnFailure)
    }
}

/// Status of a single check within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    Passed,
    Failed,
    Skipped,
}

impl CheckStatus {
    /// Skipped checks were never invoked and do not count toward the verdict.
    pub fn was_executed(self) -> bool {
        !matches!(self, CheckStatus::Skipped)
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Passed => f.pad("PASSED"),
            CheckStatus::Failed => f.pad("FAILED"),
            CheckStatus::Skipped => f.pad("SKIPPED"),
        }
    }
}

/// Aggregate verdict of a run.
///
/// The `Display` and serde forms (`Pass` / `Fail`) are the wire format used
/// by both publishing channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverallStatus {
    Pass,
    Fail,
}

impl OverallStatus {
    pub fn is_pass(self) -> bool {
        matches!(self, OverallStatus::Pass)
    }
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverallStatus::Pass => f.write_str("Pass"),
            OverallStatus::Fail => f.write_str("Fail"),
        }
    }
}

impl FromStr for OverallStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Pass" => Ok(OverallStatus::Pass),
            "Fail" => Ok(OverallStatus::Fail),
            other => Err(format!("invalid result: {other} (expected Pass or Fail)")),
        }
    }
}

/// Process exit codes for local invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// Every executed check passed.
    Passed,
    /// At least one executed check failed.
    Failed,
    /// Invalid configuration or usage; nothing ran.
    Usage,
    /// Setup or environment fault before any check ran.
    Setup,
}

impl RunExit {
    pub fn code(self) -> i32 {
        match self {
            RunExit::Passed => 0,
            RunExit::Failed => 1,
            RunExit::Usage => 2,
            RunExit::Setup => 3,
        }
    }
}

impl From<OverallStatus> for RunExit {
    fn from(status: OverallStatus) -> Self {
        match status {
            OverallStatus::Pass => RunExit::Passed,
            OverallStatus::Fail => RunExit::Failed,
        }
    }
}
