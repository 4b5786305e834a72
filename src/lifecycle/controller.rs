// src/lifecycle/controller.rs

//! Async shell around the [`Lifecycle`] state machine.
//!
//! The controller asks a [`WorkerHost`] to perform each phase and turns the
//! result into a [`LifecycleEvent`]. Setup phases may fail (routing through
//! `FailedTerminal`); publish and decommission only ever produce warnings.

use std::future::Future;
use std::pin::Pin;

use tracing::{error, info, warn};

use super::state::{Lifecycle, LifecycleEvent, LifecycleState, Transition};
use crate::context::RunContext;
use crate::model::{RunOutcome, RunResult};
use crate::registry::ResolvedRegistry;
use crate::types::RunExit;

pub type StepFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The side effects of each lifecycle phase.
pub trait WorkerHost: Send + Sync {
    /// Bootstrapping: tools needed to do anything at all.
    fn bootstrap<'a>(&'a self, ctx: &'a mut RunContext) -> StepFuture<'a, anyhow::Result<()>>;

    /// PrerequisiteCheck: the runtimes under validation are present.
    fn check_prerequisites<'a>(
        &'a self,
        ctx: &'a mut RunContext,
    ) -> StepFuture<'a, anyhow::Result<()>>;

    /// FetchValidationSuite: resolve every check to an executable.
    fn fetch_suite<'a>(
        &'a self,
        ctx: &'a mut RunContext,
    ) -> StepFuture<'a, anyhow::Result<ResolvedRegistry>>;

    fn run_validation<'a>(
        &'a self,
        registry: &'a ResolvedRegistry,
        ctx: &'a mut RunContext,
    ) -> StepFuture<'a, RunResult>;

    /// Best-effort; returns warnings.
    fn publish<'a>(
        &'a self,
        outcome: &'a RunOutcome,
        ctx: &'a mut RunContext,
    ) -> StepFuture<'a, Vec<String>>;

    /// Best-effort; returns warnings.
    fn decommission<'a>(&'a self, ctx: &'a mut RunContext) -> StepFuture<'a, Vec<String>>;
}

#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub transitions: Vec<Transition>,
    pub final_state: LifecycleState,
    pub outcome: RunOutcome,
    pub warnings: Vec<String>,
    pub exit: RunExit,
}

impl WorkerReport {
    pub fn states(&self) -> Vec<LifecycleState> {
        let mut states = vec![LifecycleState::Bootstrapping];
        states.extend(self.transitions.iter().map(|t| t.to));
        states
    }
}

#[derive(Debug)]
pub struct LifecycleController<H> {
    host: H,
}

impl<H: WorkerHost> LifecycleController<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }

    /// Drive the worker from `Bootstrapping` to `Terminated`.
    pub async fn run(&self, ctx: &mut RunContext) -> WorkerReport {
        let mut lifecycle = Lifecycle::new();
        let mut registry: Option<ResolvedRegistry> = None;
        let mut outcome: Option<RunOutcome> = None;
        let mut warnings = Vec::new();

        ctx.log.section(format!("worker lifecycle {}", ctx.run_id));

        while !lifecycle.state().is_terminal() {
            let state = lifecycle.state();
            info!(%state, "entering lifecycle state");
            ctx.log.line(format!("state: {state}"));

            let event = match state {
                LifecycleState::Bootstrapping => match self.host.bootstrap(ctx).await {
                    Ok(()) => LifecycleEvent::BootstrapSucceeded,
                    Err(e) => {
                        outcome = Some(setup_fault(ctx, "bootstrap", &e));
                        LifecycleEvent::BootstrapFailed
                    }
                },
                LifecycleState::PrerequisiteCheck => {
                    match self.host.check_prerequisites(ctx).await {
                        Ok(()) => LifecycleEvent::PrerequisitesSatisfied,
                        Err(e) => {
                            outcome = Some(setup_fault(ctx, "prerequisite check", &e));
                            LifecycleEvent::RuntimeMissing
                        }
                    }
                }
                LifecycleState::FetchValidationSuite => match self.host.fetch_suite(ctx).await {
                    Ok(resolved) => {
                        registry = Some(resolved);
                        LifecycleEvent::SuiteRetrieved
                    }
                    Err(e) => {
                        outcome = Some(setup_fault(ctx, "suite retrieval", &e));
                        LifecycleEvent::RetrievalFailed
                    }
                },
                LifecycleState::RunValidation => {
                    let result = match &registry {
                        Some(resolved) => {
                            RunOutcome::Completed(self.host.run_validation(resolved, ctx).await)
                        }
                        None => RunOutcome::SetupFault {
                            reason: "validation suite was not resolved".to_string(),
                        },
                    };
                    outcome = Some(result);
                    LifecycleEvent::RunFinished
                }
                LifecycleState::FailedTerminal => LifecycleEvent::Proceed,
                LifecycleState::PublishResults => {
                    let current = outcome.get_or_insert_with(|| RunOutcome::SetupFault {
                        reason: "no run outcome recorded".to_string(),
                    });
                    let step = self.host.publish(current, ctx).await;
                    record_warnings(ctx, "publish", &step);
                    warnings.extend(step);
                    LifecycleEvent::Proceed
                }
                LifecycleState::Decommission => {
                    let step = self.host.decommission(ctx).await;
                    record_warnings(ctx, "decommission", &step);
                    warnings.extend(step);
                    LifecycleEvent::Proceed
                }
                LifecycleState::Terminated => break,
            };

            if let Err(e) = lifecycle.apply(event) {
                // Unreachable with the events chosen above.
                error!(error = %e, "lifecycle stalled");
                warnings.push(e.to_string());
                break;
            }
        }

        let final_state = lifecycle.state();
        let outcome = outcome.unwrap_or_else(|| RunOutcome::SetupFault {
            reason: "no run outcome recorded".to_string(),
        });
        let exit = if lifecycle.failed() {
            RunExit::Setup
        } else {
            outcome.run_exit()
        };

        info!(%final_state, exit = exit.code(), warnings = warnings.len(), "worker lifecycle finished");
        ctx.log
            .line(format!("state: {final_state} (exit code {})", exit.code()));

        WorkerReport {
            transitions: lifecycle.into_history(),
            final_state,
            outcome,
            warnings,
            exit,
        }
    }
}

fn setup_fault(ctx: &mut RunContext, phase: &str, err: &anyhow::Error) -> RunOutcome {
    let reason = format!("{phase} failed: {err:#}");
    error!(%reason, "setup fault");
    ctx.log.line(format!("SETUP FAULT: {reason}"));
    RunOutcome::SetupFault { reason }
}

fn record_warnings(ctx: &mut RunContext, phase: &str, warnings: &[String]) {
    for w in warnings {
        warn!(phase, warning = %w, "best-effort step reported a problem");
        ctx.log.line(format!("warning ({phase}): {w}"));
    }
}
