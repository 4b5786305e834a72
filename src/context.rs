// src/context.rs

//! Per-invocation run context.
//!
//! Owned by the top-level invocation (`validate` or `worker`) and passed by
//! `&mut` to everything that needs the work directory or the diagnostic log.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::diagnostics::DiagnosticLog;

#[derive(Debug)]
pub struct RunContext {
    pub run_id: String,
    pub instance_name: String,
    pub work_dir: PathBuf,
    pub suite_dir: PathBuf,
    pub log: DiagnosticLog,
    /// Echo captured check output to stdout as it arrives.
    pub verbose: bool,
}

impl RunContext {
    pub fn new(
        instance_name: impl Into<String>,
        work_dir: impl Into<PathBuf>,
        log: DiagnosticLog,
        verbose: bool,
    ) -> Self {
        let work_dir = work_dir.into();
        Self {
            run_id: Uuid::new_v4().to_string(),
            instance_name: instance_name.into(),
            suite_dir: work_dir.join("suite"),
            work_dir,
            log,
            verbose,
        }
    }

    /// Context with a discarded log; used by dry runs and tests.
    pub fn detached(instance_name: impl Into<String>, work_dir: impl Into<PathBuf>) -> Self {
        Self::new(instance_name, work_dir, DiagnosticLog::disabled(), false)
    }

    pub fn log_path(&self) -> Option<&Path> {
        self.log.path()
    }
}
