// src/model.rs

//! Run data model: per-check results and the finalized run result.

use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::aggregate::{RunSummary, summarize};
use crate::registry::{CheckKey, ResolvedCheck};
use crate::types::{CheckStatus, ExecutionStrategy, OverallStatus, RunExit};

/// Immutable record of one check within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub key: CheckKey,
    pub display_name: String,
    pub status: CheckStatus,
    /// `None` when the check was skipped, could not be started, timed out,
    /// or was terminated by a signal.
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
    pub output: String,
    /// Why the check was skipped or could not run normally.
    pub detail: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl CheckResult {
    /// Record a check that was never invoked.
    pub fn skipped(check: &ResolvedCheck, reason: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            key: check.key().to_string(),
            display_name: check.display_name().to_string(),
            status: CheckStatus::Skipped,
            exit_code: None,
            duration_ms: 0,
            output: String::new(),
            detail: Some(reason.into()),
            started_at: now,
            ended_at: now,
        }
    }
}

/// In-progress run. Results can only be appended; [`RunRecorder::finalize`]
/// consumes the recorder so a run is finalized exactly once.
#[derive(Debug)]
pub struct RunRecorder {
    strategy: ExecutionStrategy,
    results: Vec<CheckResult>,
    started: Instant,
}

impl RunRecorder {
    pub fn new(strategy: ExecutionStrategy) -> Self {
        Self {
            strategy,
            results: Vec::new(),
            started: Instant::now(),
        }
    }

    pub fn record(&mut self, result: CheckResult) {
        self.results.push(result);
    }

    pub fn finalize(self) -> RunResult {
        let summary = summarize(&self.results);
        RunResult {
            strategy: self.strategy,
            overall_status: summary.overall,
            total_duration_ms: self.started.elapsed().as_millis() as u64,
            results: self.results,
        }
    }
}

/// Finalized outcome of an orchestrated run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    strategy: ExecutionStrategy,
    results: Vec<CheckResult>,
    overall_status: OverallStatus,
    total_duration_ms: u64,
}

impl RunResult {
    pub fn strategy(&self) -> ExecutionStrategy {
        self.strategy
    }

    /// Results in registration order.
    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    pub fn result_for(&self, key: &str) -> Option<&CheckResult> {
        self.results.iter().find(|r| r.key == key)
    }

    pub fn overall_status(&self) -> OverallStatus {
        self.overall_status
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.total_duration_ms
    }

    pub fn summary(&self) -> RunSummary {
        summarize(&self.results)
    }
}

/// How a run ended, as far as publishing is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The orchestrator produced a result.
    Completed(RunResult),
    /// The run never started; no `RunResult` exists.
    SetupFault { reason: String },
}

impl RunOutcome {
    /// A setup fault always publishes as `Fail`.
    pub fn overall_status(&self) -> OverallStatus {
        match self {
            RunOutcome::Completed(run) => run.overall_status(),
            RunOutcome::SetupFault { .. } => OverallStatus::Fail,
        }
    }

    pub fn run_exit(&self) -> RunExit {
        match self {
            RunOutcome::Completed(run) => run.overall_status().into(),
            RunOutcome::SetupFault { .. } => RunExit::Setup,
        }
    }

    pub fn run(&self) -> Option<&RunResult> {
        match self {
            RunOutcome::Completed(run) => Some(run),
            RunOutcome::SetupFault { .. } => None,
        }
    }
}
