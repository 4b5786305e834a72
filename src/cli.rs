// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! Without a subcommand the binary behaves like `validate`, so
//! `runtime-validator --runtime python` and
//! `runtime-validator validate --runtime python` are equivalent.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::types::Strategy;

/// Command-line arguments for `runtime-validator`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "runtime-validator",
    version,
    about = "Validate installed runtimes and publish a pass/fail verdict.",
    long_about = None,
    args_conflicts_with_subcommands = true
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Options for the implicit `validate` command.
    #[command(flatten)]
    pub run: RunArgs,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `--verbose` selects debug, otherwise `RUNTIME_VALIDATOR_LOG`
    /// or `info` is used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Run the checks on this machine and exit with the verdict (default).
    Validate(RunArgs),
    /// Full ephemeral-worker lifecycle: bootstrap, validate, publish,
    /// decommission.
    Worker(RunArgs),
    /// Reconcile a console capture and a durable record into one verdict.
    Verdict(VerdictArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `RuntimeValidator.toml` in the current working directory,
    /// or the built-in checks if that file does not exist.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Validation strategy (`global` falls back to `per-runtime`).
    #[arg(long, value_name = "STRATEGY")]
    pub strategy: Option<Strategy>,

    /// Run only the check with this key; all others are recorded as skipped.
    #[arg(long, value_name = "KEY")]
    pub runtime: Option<String>,

    /// Echo check output as it arrives and log at debug level.
    #[arg(short, long)]
    pub verbose: bool,

    /// Keep running checks after a failure.
    #[arg(long)]
    pub continue_on_failure: bool,

    /// Diagnostic log path (default: `<work dir>/validation.log`).
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Working directory for fetched checks (default: a temp dir).
    #[arg(long, value_name = "PATH")]
    pub work_dir: Option<PathBuf>,

    /// Reuse previously fetched checks instead of fetching again.
    #[arg(long)]
    pub skip_setup: bool,

    /// Remove the work directory and log file of a previous run, then exit.
    #[arg(long)]
    pub cleanup_only: bool,

    /// Per-check timeout, e.g. `90s` or `5m`.
    #[arg(long, value_name = "DURATION")]
    pub timeout: Option<humantime::Duration>,

    /// Print the resolved plan without running anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Instance name used in the durable record.
    #[arg(long, value_name = "NAME")]
    pub instance_name: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct VerdictArgs {
    /// Captured console output to scan for the result line.
    #[arg(long, value_name = "PATH")]
    pub console: Option<PathBuf>,

    /// Durable result record (`validation-result.json`).
    #[arg(long, value_name = "PATH")]
    pub record: Option<PathBuf>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliArgs {
    /// Whether the selected command asked for verbose output.
    pub fn verbose(&self) -> bool {
        match &self.command {
            Some(Commands::Validate(a)) | Some(Commands::Worker(a)) => a.verbose,
            Some(Commands::Verdict(_)) => false,
            None => self.run.verbose,
        }
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
