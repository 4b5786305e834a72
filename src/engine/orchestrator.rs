// src/engine/orchestrator.rs

//! Validation orchestrator.
//!
//! The policy decision for each check is a pure function ([`decide`]) that
//! can be tested without processes. [`Orchestrator`] is the async shell that
//! walks the registry in order, invokes the executor, and records results.

use std::fmt;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::context::RunContext;
use crate::exec::CheckExecutor;
use crate::model::{CheckResult, RunRecorder, RunResult};
use crate::registry::{CheckKey, Registry, ResolvedCheck, ResolvedRegistry};
use crate::report::write_stdout;
use crate::types::{CheckStatus, ExecutionStrategy};

/// Stop/continue policy plus an optional single-check filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunPolicy {
    pub continue_on_failure: bool,
    pub filter_key: Option<CheckKey>,
}

impl RunPolicy {
    pub fn new(continue_on_failure: bool, filter_key: Option<CheckKey>) -> Self {
        Self {
            continue_on_failure,
            filter_key,
        }
    }

    pub fn execution_strategy(&self) -> ExecutionStrategy {
        ExecutionStrategy::from_continue_flag(self.continue_on_failure)
    }

    /// A filter must name a registered check.
    pub fn validate_against(&self, registry: &Registry) -> Result<(), String> {
        match &self.filter_key {
            Some(key) if !registry.contains(key) => {
                let known: Vec<&str> = registry.keys().collect();
                Err(format!(
                    "unknown runtime filter '{key}' (known: {})",
                    known.join(", ")
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Why a check was recorded without being invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    FilteredOut { filter: CheckKey },
    HaltedAfter { failed: CheckKey },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::FilteredOut { filter } => {
                write!(f, "not selected (runtime filter '{filter}')")
            }
            SkipReason::HaltedAfter { failed } => {
                write!(f, "not run: '{failed}' failed and continue-on-failure is off")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Invoke,
    Skip(SkipReason),
}

/// Decide what to do with the check `key`, given the policy and the key of
/// the check that halted the run (if any).
pub fn decide(policy: &RunPolicy, key: &str, halted_after: Option<&str>) -> Decision {
    if let Some(filter) = &policy.filter_key {
        if filter != key {
            return Decision::Skip(SkipReason::FilteredOut {
                filter: filter.clone(),
            });
        }
    }

    if let Some(failed) = halted_after {
        return Decision::Skip(SkipReason::HaltedAfter {
            failed: failed.to_string(),
        });
    }

    Decision::Invoke
}

/// Runs a resolved registry under a [`RunPolicy`], one check at a time.
#[derive(Debug)]
pub struct Orchestrator<E> {
    executor: E,
}

impl<E: CheckExecutor> Orchestrator<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Execute every check in registration order and finalize the run.
    ///
    /// Individual check failures never abort this function; they are
    /// recorded and, under stop-on-failure, turn the remaining checks into
    /// `Skipped` entries.
    pub async fn run(
        &self,
        registry: &ResolvedRegistry,
        policy: &RunPolicy,
        ctx: &mut RunContext,
    ) -> RunResult {
        let strategy = policy.execution_strategy();
        info!(
            run_id = %ctx.run_id,
            checks = registry.len(),
            ?strategy,
            filter = ?policy.filter_key,
            "starting validation run"
        );

        ctx.log.section(format!("validation run {}", ctx.run_id));
        ctx.log.line(format!("instance: {}", ctx.instance_name));
        ctx.log.line(format!("strategy: {strategy:?}"));
        if let Some(filter) = &policy.filter_key {
            ctx.log.line(format!("runtime filter: {filter}"));
        }

        let mut recorder = RunRecorder::new(strategy);
        let mut halted_after: Option<CheckKey> = None;
        let total = registry.len();

        for (idx, check) in registry.iter().enumerate() {
            match decide(policy, check.key(), halted_after.as_deref()) {
                Decision::Skip(reason) => {
                    debug!(check = %check.key(), %reason, "skipping check");
                    ctx.log
                        .line(format!("[{}/{total}] {} skipped: {reason}", idx + 1, check.key()));
                    recorder.record(CheckResult::skipped(check, reason.to_string()));
                }
                Decision::Invoke => {
                    let result = self.invoke(check, idx + 1, total, ctx).await;
                    if result.status == CheckStatus::Failed && !strategy.continue_on_failure() {
                        warn!(check = %check.key(), "check failed; skipping remaining checks");
                        halted_after = Some(check.key().to_string());
                    }
                    recorder.record(result);
                }
            }
        }

        let run = recorder.finalize();
        let summary = run.summary();

        ctx.log.section("summary");
        for result in run.results() {
            ctx.log.line(format!("{:<8} {}", result.status, result.key));
        }
        ctx.log.line(format!(
            "passed={} failed={} skipped={} overall={} duration_ms={}",
            summary.passed,
            summary.failed,
            summary.skipped,
            summary.overall,
            run.total_duration_ms()
        ));

        info!(
            passed = summary.passed,
            failed = summary.failed,
            skipped = summary.skipped,
            overall = %summary.overall,
            "validation run finished"
        );

        run
    }

    async fn invoke(
        &self,
        check: &ResolvedCheck,
        position: usize,
        total: usize,
        ctx: &mut RunContext,
    ) -> CheckResult {
        ctx.log.section(format!(
            "[{position}/{total}] {} ({})",
            check.display_name(),
            check.key()
        ));
        ctx.log
            .line(format!("executable: {}", check.executable.display()));
        if ctx.verbose {
            write_stdout(&format!(
                "==> [{position}/{total}] {} ({})\n",
                check.display_name(),
                check.key()
            ));
        }

        let started_at = Utc::now();
        let started = Instant::now();
        let outcome = self.executor.execute(check, ctx.verbose).await;
        let duration_ms = started.elapsed().as_millis() as u64;
        let ended_at = Utc::now();

        let status = if outcome.success() {
            CheckStatus::Passed
        } else {
            CheckStatus::Failed
        };

        ctx.log.output_block(&outcome.output);
        if let Some(detail) = &outcome.detail {
            ctx.log.line(format!("detail: {detail}"));
        }
        let code = outcome
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "none".to_string());
        ctx.log
            .line(format!("result: {status} (exit code {code}, {duration_ms} ms)"));

        match status {
            CheckStatus::Passed => {
                info!(check = %check.key(), duration_ms, "check passed")
            }
            _ => warn!(
                check = %check.key(),
                exit_code = ?outcome.exit_code,
                detail = ?outcome.detail,
                duration_ms,
                "check failed"
            ),
        }

        CheckResult {
            key: check.key().to_string(),
            display_name: check.display_name().to_string(),
            status,
            exit_code: outcome.exit_code,
            duration_ms,
            output: outcome.output,
            detail: outcome.detail,
            started_at,
            ended_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_skips_everything_else() {
        let policy = RunPolicy::new(false, Some("node".into()));
        assert_eq!(decide(&policy, "node", None), Decision::Invoke);
        assert_eq!(
            decide(&policy, "python", None),
            Decision::Skip(SkipReason::FilteredOut {
                filter: "node".into()
            })
        );
    }

    #[test]
    fn halted_run_skips_remaining() {
        let policy = RunPolicy::default();
        assert_eq!(
            decide(&policy, "java", Some("python")),
            Decision::Skip(SkipReason::HaltedAfter {
                failed: "python".into()
            })
        );
    }

    #[test]
    fn no_filter_and_no_halt_invokes() {
        assert_eq!(decide(&RunPolicy::new(true, None), "java", None), Decision::Invoke);
    }
}
