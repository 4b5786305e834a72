// src/publish/envelope.rs

//! The durable `ResultEnvelope` record.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::model::RunResult;
use crate::types::{CheckStatus, OverallStatus};

pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Per-check line in the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeCheck {
    pub key: String,
    pub status: CheckStatus,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub duration_ms: u64,
}

/// One verdict per run, written once to durable storage.
///
/// ```json
/// {
///   "instance_name": "img-build-42",
///   "scan_result": "Pass",
///   "timestamp": "2026-10-17T09:30:00.125Z",
///   "validation_log_reference": "https://store/runtime-validation/img-build-42/validation.log",
///   "schema_version": 1,
///   "checks": [{ "key": "python", "status": "Passed", "exit_code": 0, "duration_ms": 812 }]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub instance_name: String,
    pub scan_result: OverallStatus,
    pub timestamp: DateTime<Utc>,
    pub validation_log_reference: String,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub checks: Vec<EnvelopeCheck>,
    /// Setup-fault reason when no checks ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultEnvelope {
    pub fn for_run(
        instance_name: impl Into<String>,
        run: &RunResult,
        log_reference: impl Into<String>,
    ) -> Self {
        let checks = run
            .results()
            .iter()
            .map(|r| EnvelopeCheck {
                key: r.key.clone(),
                status: r.status,
                exit_code: r.exit_code,
                duration_ms: r.duration_ms,
            })
            .collect();

        Self {
            instance_name: instance_name.into(),
            scan_result: run.overall_status(),
            timestamp: Utc::now().trunc_subsecs(3),
            validation_log_reference: log_reference.into(),
            schema_version: SCHEMA_VERSION,
            checks,
            error: None,
        }
    }

    /// A `Fail` envelope with an empty check list and the fault reason.
    pub fn for_setup_fault(
        instance_name: impl Into<String>,
        reason: impl Into<String>,
        log_reference: impl Into<String>,
    ) -> Self {
        Self {
            instance_name: instance_name.into(),
            scan_result: OverallStatus::Fail,
            timestamp: Utc::now().trunc_subsecs(3),
            validation_log_reference: log_reference.into(),
            schema_version: SCHEMA_VERSION,
            checks: Vec::new(),
            error: Some(reason.into()),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    pub fn from_json(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}
