// src/lifecycle/host.rs

//! The production [`WorkerHost`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use tracing::{debug, info, warn};

use super::controller::{StepFuture, WorkerHost};
use crate::config::model::DecommissionSection;
use crate::context::RunContext;
use crate::engine::{Orchestrator, RunPolicy};
use crate::exec::{CheckExecutor, shell_command};
use crate::fs::FileSystem;
use crate::model::{RunOutcome, RunResult};
use crate::publish::ResultPublisher;
use crate::registry::{Registry, ResolvedRegistry, SourceFetcher};

/// Upper bound for one decommission command.
pub const DECOMMISSION_STEP_TIMEOUT: Duration = Duration::from_secs(120);

/// Executables that must be on `PATH` before a phase may proceed.
pub fn missing_tools(tools: &[String]) -> Vec<String> {
    tools
        .iter()
        .filter(|t| which::which(t.as_str()).is_err())
        .cloned()
        .collect()
}

/// Everything the worker needs, assembled by the caller from config + CLI.
pub struct ProcessWorkerHost<E> {
    pub required_tools: Vec<String>,
    pub runtimes: Vec<String>,
    pub registry: Registry,
    pub fetcher: Arc<dyn SourceFetcher>,
    pub skip_fetch: bool,
    pub orchestrator: Orchestrator<E>,
    pub policy: RunPolicy,
    pub publisher: ResultPublisher,
    pub decommission: DecommissionSection,
    pub fs: Arc<dyn FileSystem>,
}

impl<E> ProcessWorkerHost<E> {
    fn require(ctx: &mut RunContext, what: &str, tools: &[String]) -> anyhow::Result<()> {
        if tools.is_empty() {
            ctx.log.line(format!("{what}: nothing required"));
            return Ok(());
        }

        let missing = missing_tools(tools);
        if missing.is_empty() {
            ctx.log.line(format!("{what}: found {}", tools.join(", ")));
            Ok(())
        } else {
            ctx.log.line(format!("{what}: missing {}", missing.join(", ")));
            Err(anyhow!("{what} not found on PATH: {}", missing.join(", ")))
        }
    }
}

impl<E: CheckExecutor> WorkerHost for ProcessWorkerHost<E> {
    fn bootstrap<'a>(&'a self, ctx: &'a mut RunContext) -> StepFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            std::fs::create_dir_all(&ctx.work_dir)
                .with_context(|| format!("creating work dir {}", ctx.work_dir.display()))?;
            Self::require(ctx, "bootstrap tools", &self.required_tools)
        })
    }

    fn check_prerequisites<'a>(
        &'a self,
        ctx: &'a mut RunContext,
    ) -> StepFuture<'a, anyhow::Result<()>> {
        Box::pin(async move { Self::require(ctx, "runtimes", &self.runtimes) })
    }

    fn fetch_suite<'a>(
        &'a self,
        ctx: &'a mut RunContext,
    ) -> StepFuture<'a, anyhow::Result<ResolvedRegistry>> {
        Box::pin(async move {
            ctx.log.line(format!(
                "resolving {} checks into {}",
                self.registry.len(),
                ctx.suite_dir.display()
            ));
            let resolved = self
                .registry
                .resolve(self.fetcher.as_ref(), &ctx.suite_dir, self.skip_fetch)
                .await?;
            for check in resolved.iter() {
                ctx.log
                    .line(format!("{} -> {}", check.key(), check.executable.display()));
            }
            Ok(resolved)
        })
    }

    fn run_validation<'a>(
        &'a self,
        registry: &'a ResolvedRegistry,
        ctx: &'a mut RunContext,
    ) -> StepFuture<'a, RunResult> {
        Box::pin(self.orchestrator.run(registry, &self.policy, ctx))
    }

    fn publish<'a>(
        &'a self,
        outcome: &'a RunOutcome,
        ctx: &'a mut RunContext,
    ) -> StepFuture<'a, Vec<String>> {
        Box::pin(async move {
            ctx.log.section("publish");
            ctx.log
                .line(format!("scan_result: {}", outcome.overall_status()));

            let report = self
                .publisher
                .publish(&ctx.instance_name, outcome, ctx.log.path())
                .await;

            match report.durable_location() {
                Some(location) => ctx.log.line(format!("durable record: {location}")),
                None => ctx.log.line("durable record: not stored"),
            }
            report.warnings()
        })
    }

    fn decommission<'a>(&'a self, ctx: &'a mut RunContext) -> StepFuture<'a, Vec<String>> {
        Box::pin(async move {
            let mut warnings = Vec::new();
            ctx.log.section("decommission");

            for command in &self.decommission.commands {
                info!(%command, "running decommission step");
                ctx.log.line(format!("$ {command}"));

                let res = tokio::time::timeout(
                    DECOMMISSION_STEP_TIMEOUT,
                    shell_command(command).output(),
                )
                .await;

                let problem = match res {
                    Ok(Ok(output)) if output.status.success() => None,
                    Ok(Ok(output)) => Some(format!(
                        "decommission step `{command}` exited with {}",
                        output.status
                    )),
                    Ok(Err(e)) => Some(format!("decommission step `{command}` failed: {e}")),
                    Err(_) => Some(format!(
                        "decommission step `{command}` timed out after {}",
                        humantime::format_duration(DECOMMISSION_STEP_TIMEOUT)
                    )),
                };
                if let Some(p) = problem {
                    warnings.push(p);
                }
            }

            if self.decommission.remove_work_dir {
                debug!(path = %ctx.work_dir.display(), "removing work dir");
                if let Err(e) = self.fs.remove_all(&ctx.work_dir) {
                    warn!(error = %e, "failed to remove work dir");
                    warnings.push(format!("removing work dir: {e:#}"));
                }
            }

            warnings
        })
    }
}
