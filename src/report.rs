// src/report.rs

//! Human-readable output on stdout: the end-of-run summary and the dry-run
//! plan.

use std::fmt::Write as _;
use std::io::{self, Write as _};

use tracing::debug;

use crate::engine::RunPolicy;
use crate::model::RunResult;
use crate::registry::Registry;
use crate::types::{CheckStatus, Strategy};

/// Lines of a failed check's output shown in the summary.
const FAILED_OUTPUT_LINES: usize = 10;

/// Write `text` to stdout. A closed or broken stdout is logged and ignored,
/// so console output can never abort a run.
pub fn write_stdout(text: &str) {
    let mut out = io::stdout().lock();
    if let Err(e) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
        debug!(error = %e, "stdout unavailable, output dropped");
    }
}

pub fn render_summary(run: &RunResult) -> String {
    let summary = run.summary();
    let key_width = run
        .results()
        .iter()
        .map(|r| r.key.len())
        .max()
        .unwrap_or(0)
        .max("CHECK".len());

    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:<key_width$}  {:<7}  {:>4}  {:>9}  DETAIL",
        "CHECK", "STATUS", "EXIT", "DURATION"
    );
    for r in run.results() {
        let code = r
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        let duration = if r.status.was_executed() {
            format!("{}ms", r.duration_ms)
        } else {
            "-".to_string()
        };
        let _ = writeln!(
            out,
            "{:<key_width$}  {:<7}  {:>4}  {:>9}  {}",
            r.key,
            r.status,
            code,
            duration,
            r.detail.as_deref().unwrap_or("")
        );
    }

    for r in run
        .results()
        .iter()
        .filter(|r| r.status == CheckStatus::Failed && !r.output.trim().is_empty())
    {
        let _ = writeln!(out);
        let _ = writeln!(out, "--- {} ({}) output ---", r.display_name, r.key);
        let lines: Vec<&str> = r.output.lines().collect();
        for line in lines.iter().take(FAILED_OUTPUT_LINES) {
            let _ = writeln!(out, "  {line}");
        }
        if lines.len() > FAILED_OUTPUT_LINES {
            let _ = writeln!(
                out,
                "  ... {} more lines in the diagnostic log",
                lines.len() - FAILED_OUTPUT_LINES
            );
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "passed: {}  failed: {}  skipped: {}  overall: {}  ({} ms)",
        summary.passed,
        summary.failed,
        summary.skipped,
        summary.overall,
        run.total_duration_ms()
    );
    out
}

pub fn print_summary(run: &RunResult) {
    write_stdout(&render_summary(run));
}

pub fn render_plan(registry: &Registry, policy: &RunPolicy, strategy: Strategy) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "runtime-validator dry-run");
    let _ = writeln!(out, "  strategy = {strategy}");
    let _ = writeln!(out, "  execution = {:?}", policy.execution_strategy());
    if let Some(filter) = &policy.filter_key {
        let _ = writeln!(out, "  runtime filter = {filter}");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "checks ({}):", registry.len());
    for (idx, check) in registry.iter().enumerate() {
        let selected = policy
            .filter_key
            .as_deref()
            .is_none_or(|f| f == check.key);
        let marker = if selected { " " } else { "-" };
        let _ = writeln!(
            out,
            " {marker}{:>2}. {} ({})",
            idx + 1,
            check.display_name,
            check.key
        );
        let _ = writeln!(out, "       {}", check.invocation);
    }
    out
}

pub fn print_plan(registry: &Registry, policy: &RunPolicy, strategy: Strategy) {
    write_stdout(&render_plan(registry, policy, strategy));
}
