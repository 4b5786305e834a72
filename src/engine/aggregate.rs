// src/engine/aggregate.rs

//! Pure reduction of check results into summary counts and a verdict.

use crate::model::CheckResult;
use crate::types::{CheckStatus, OverallStatus};

/// Counts per status plus the aggregate verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub overall: OverallStatus,
}

/// `Pass` iff no executed check failed. Skipped entries only contribute to
/// the `skipped` count.
pub fn summarize(results: &[CheckResult]) -> RunSummary {
    let mut passed = 0;
    let mut failed = 0;
    let mut skipped = 0;

    for result in results {
        match result.status {
            CheckStatus::Passed => passed += 1,
            CheckStatus::Failed => failed += 1,
            CheckStatus::Skipped => skipped += 1,
        }
    }

    let overall = if failed == 0 {
        OverallStatus::Pass
    } else {
        OverallStatus::Fail
    };

    RunSummary {
        passed,
        failed,
        skipped,
        overall,
    }
}
