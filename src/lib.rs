// src/lib.rs

pub mod cli;
pub mod config;
pub mod consumer;
pub mod context;
pub mod diagnostics;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod lifecycle;
pub mod logging;
pub mod model;
pub mod publish;
pub mod registry;
pub mod report;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::cli::{CliArgs, Commands, RunArgs, VerdictArgs};
use crate::config::validate::is_valid_instance_name;
use crate::config::{ConfigFile, PublishSettings, load_or_builtin};
use crate::consumer::{VerdictSource, reconcile, scan_console};
use crate::context::RunContext;
use crate::diagnostics::DiagnosticLog;
use crate::engine::{Orchestrator, RunPolicy};
use crate::errors::{Result, ValidatorError};
use crate::exec::ProcessExecutor;
use crate::fs::{FileSystem, RealFileSystem};
use crate::lifecycle::{LifecycleController, ProcessWorkerHost};
use crate::publish::{
    CommandPublisher, DirectoryPublisher, HttpPublisher, LOG_FILE, PublisherChain, ResultEnvelope,
    ResultPublisher, SignalEmitter,
};
use crate::registry::{Registry, TransportFetcher};
use crate::types::{RunExit, Strategy};

/// High-level entry point used by `main.rs`.
///
/// Returns the exit classification of a run that got as far as producing a
/// verdict; usage and setup problems come back as [`ValidatorError`].
pub async fn run(args: CliArgs) -> Result<RunExit> {
    match args.command {
        Some(Commands::Validate(run_args)) => validate(run_args).await,
        Some(Commands::Worker(run_args)) => worker(run_args).await,
        Some(Commands::Verdict(verdict_args)) => verdict(&verdict_args),
        None => validate(args.run).await,
    }
}

/// Config file and CLI flags merged into what one run needs.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub config: ConfigFile,
    pub registry: Registry,
    pub policy: RunPolicy,
    pub strategy: Strategy,
    pub check_timeout: Option<Duration>,
    pub work_dir: PathBuf,
    pub log_file: PathBuf,
    pub instance_name: String,
}

/// Default work directory: `<tmp>/runtime-validator`.
pub fn default_work_dir() -> PathBuf {
    std::env::temp_dir().join("runtime-validator")
}

/// Load configuration, apply CLI overrides, and validate everything that
/// can be checked before a run starts. All failures here are usage errors.
pub fn prepare(args: &RunArgs) -> Result<Prepared> {
    let loaded = load_or_builtin(args.config.as_deref())?;
    let config = loaded.config;

    let strategy = args.strategy.unwrap_or(config.run.strategy);
    if strategy == Strategy::Global {
        warn!("strategy 'global' is not implemented; falling back to per-runtime");
    }
    if config.run.parallel {
        warn!("[run].parallel is reserved; checks run sequentially");
    }

    let registry = config.registry(&loaded.base_dir)?;

    let policy = RunPolicy::new(
        args.continue_on_failure || config.run.continue_on_failure,
        args.runtime.clone(),
    );
    policy
        .validate_against(&registry)
        .map_err(ValidatorError::UsageError)?;

    let check_timeout = match args.timeout {
        Some(t) if t.is_zero() => {
            return Err(ValidatorError::UsageError(
                "--timeout must be greater than zero".to_string(),
            ));
        }
        Some(t) => Some(Duration::from(t)),
        None => config.run.check_timeout,
    };

    let instance_name = match &args.instance_name {
        Some(name) if !is_valid_instance_name(name) => {
            return Err(ValidatorError::UsageError(format!(
                "invalid --instance-name {name:?}: must match [A-Za-z0-9._-]+ and not be '.' or '..'"
            )));
        }
        Some(name) => name.clone(),
        None => config.publish.resolve_instance_name(),
    };

    let work_dir = args
        .work_dir
        .clone()
        .or_else(|| config.run.work_dir.clone())
        .unwrap_or_else(default_work_dir);
    let log_file = args
        .log_file
        .clone()
        .or_else(|| config.run.log_file.clone())
        .unwrap_or_else(|| work_dir.join(LOG_FILE));

    Ok(Prepared {
        config,
        registry,
        policy,
        strategy,
        check_timeout,
        work_dir,
        log_file,
        instance_name,
    })
}

/// Durable transports in fallback order: command, http, directory.
pub fn build_publisher(settings: &PublishSettings, fs: Arc<dyn FileSystem>) -> ResultPublisher {
    let mut chain = PublisherChain::default().with_attempt_timeout(settings.attempt_timeout);
    if let Some(cmd) = &settings.command {
        chain.push(Arc::new(CommandPublisher::new(
            cmd.upload.clone(),
            cmd.location.clone(),
        )));
    }
    if let Some(http) = &settings.http {
        let headers = http
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        chain.push(Arc::new(HttpPublisher::new(
            http.url.clone(),
            headers,
            settings.attempt_timeout,
        )));
    }
    if let Some(dir) = &settings.directory {
        chain.push(Arc::new(DirectoryPublisher::new(fs, dir.root.clone())));
    }

    ResultPublisher::new(
        SignalEmitter::new(settings.console.clone()),
        chain,
        settings.prefix.clone(),
    )
}

/// Remove the artifacts of a previous run.
pub fn cleanup(work_dir: &Path, log_file: &Path, fs: &dyn FileSystem) -> Result<()> {
    for path in [work_dir, log_file] {
        if fs.exists(path) {
            fs.remove_all(path)?;
            report::write_stdout(&format!("removed {}\n", path.display()));
        }
    }
    Ok(())
}

async fn validate(args: RunArgs) -> Result<RunExit> {
    let prepared = prepare(&args)?;

    if args.cleanup_only {
        cleanup(&prepared.work_dir, &prepared.log_file, &RealFileSystem)?;
        return Ok(RunExit::Passed);
    }
    if args.dry_run {
        report::print_plan(&prepared.registry, &prepared.policy, prepared.strategy);
        return Ok(RunExit::Passed);
    }

    let log = DiagnosticLog::create(&prepared.log_file).map_err(|e| {
        ValidatorError::SetupFault(format!(
            "cannot create diagnostic log {}: {e}",
            prepared.log_file.display()
        ))
    })?;
    let mut ctx = RunContext::new(
        prepared.instance_name.clone(),
        prepared.work_dir.clone(),
        log,
        args.verbose,
    );

    let resolved = match prepared
        .registry
        .resolve(&TransportFetcher::new(), &ctx.suite_dir, args.skip_setup)
        .await
    {
        Ok(resolved) => resolved,
        Err(e) => {
            ctx.log.line(format!("SETUP FAULT: {e}"));
            return Err(e.into());
        }
    };

    let orchestrator = Orchestrator::new(ProcessExecutor::new(prepared.check_timeout));
    let run = orchestrator.run(&resolved, &prepared.policy, &mut ctx).await;

    report::print_summary(&run);
    if let Some(path) = ctx.log_path() {
        report::write_stdout(&format!("diagnostic log: {}\n", path.display()));
    }
    SignalEmitter::default().emit(run.overall_status());

    Ok(run.overall_status().into())
}

async fn worker(args: RunArgs) -> Result<RunExit> {
    let Prepared {
        config,
        registry,
        policy,
        strategy,
        check_timeout,
        work_dir,
        log_file,
        instance_name,
    } = prepare(&args)?;

    if args.cleanup_only {
        cleanup(&work_dir, &log_file, &RealFileSystem)?;
        return Ok(RunExit::Passed);
    }
    if args.dry_run {
        report::print_plan(&registry, &policy, strategy);
        return Ok(RunExit::Passed);
    }

    // The worker has to reach Terminated even without a log file.
    let log = DiagnosticLog::create(&log_file).unwrap_or_else(|e| {
        warn!(path = %log_file.display(), error = %e, "diagnostic log unavailable");
        DiagnosticLog::disabled()
    });
    let mut ctx = RunContext::new(instance_name, work_dir, log, args.verbose);
    info!(run_id = %ctx.run_id, instance = %ctx.instance_name, "starting worker");

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let host = ProcessWorkerHost {
        required_tools: config.bootstrap.required_tools.clone(),
        runtimes: config.prerequisites.runtimes.clone(),
        registry,
        fetcher: Arc::new(TransportFetcher::new()),
        skip_fetch: args.skip_setup,
        orchestrator: Orchestrator::new(ProcessExecutor::new(check_timeout)),
        policy,
        publisher: build_publisher(&config.publish, Arc::clone(&fs)),
        decommission: config.decommission.clone(),
        fs,
    };

    let report = LifecycleController::new(host).run(&mut ctx).await;

    if let Some(run) = report.outcome.run() {
        report::print_summary(run);
    }
    if !report.warnings.is_empty() {
        warn!(count = report.warnings.len(), "worker finished with warnings");
    }

    Ok(report.exit)
}

fn verdict(args: &VerdictArgs) -> Result<RunExit> {
    if args.console.is_none() && args.record.is_none() {
        return Err(ValidatorError::UsageError(
            "verdict needs --console and/or --record".to_string(),
        ));
    }

    let transient = args.console.as_deref().and_then(|path| match std::fs::read(path) {
        Ok(bytes) => scan_console(&String::from_utf8_lossy(&bytes)),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "console capture unreadable");
            None
        }
    });

    let durable = args.record.as_deref().and_then(|path| {
        let bytes = std::fs::read(path)
            .map_err(|e| warn!(path = %path.display(), error = %e, "durable record unreadable"))
            .ok()?;
        ResultEnvelope::from_json(&bytes)
            .map_err(|e| warn!(path = %path.display(), error = %e, "durable record malformed"))
            .ok()
            .map(|envelope| envelope.scan_result)
    });

    let verdict = reconcile(transient, durable);
    if verdict.conflict {
        warn!(
            transient = ?transient,
            durable = ?durable,
            "channels disagree; using the durable record"
        );
    }
    if verdict.source == VerdictSource::Neither {
        warn!("no result observed on either channel; treating as Fail");
    }

    report::write_stdout(&format!("verdict: {} ({})\n", verdict.status, verdict.source));
    Ok(verdict.status.into())
}
