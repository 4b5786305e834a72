// src/exec/backend.rs

//! Pluggable check executor abstraction.
//!
//! The orchestrator talks to a `CheckExecutor` instead of spawning processes
//! itself. Production uses [`ProcessExecutor`](super::ProcessExecutor); tests
//! provide executors with scripted outcomes.

use std::future::Future;
use std::pin::Pin;

use crate::registry::ResolvedCheck;

/// What came back from invoking one check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecOutcome {
    /// Exit code if the process ran to completion and exited normally.
    pub exit_code: Option<i32>,
    /// Combined stdout/stderr in arrival order.
    pub output: String,
    /// Set when the process could not be started, timed out, or was killed.
    pub detail: Option<String>,
}

impl ExecOutcome {
    pub fn exited(code: i32, output: impl Into<String>) -> Self {
        Self {
            exit_code: Some(code),
            output: output.into(),
            detail: None,
        }
    }

    /// The executable unit could not be invoked at all.
    pub fn not_invoked(detail: impl Into<String>) -> Self {
        Self {
            exit_code: None,
            output: String::new(),
            detail: Some(detail.into()),
        }
    }

    /// Pass iff the process exited with status zero.
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Trait abstracting how a resolved check is executed.
///
/// Implementations never fail: problems starting or waiting for the unit
/// are reported through [`ExecOutcome::detail`] so the orchestrator can
/// classify them as a failed check.
pub trait CheckExecutor: Send + Sync {
    fn execute<'a>(
        &'a self,
        check: &'a ResolvedCheck,
        echo_output: bool,
    ) -> Pin<Box<dyn Future<Output = ExecOutcome> + Send + 'a>>;
}
