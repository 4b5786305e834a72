// src/engine/mod.rs

//! Orchestration engine.
//!
//! - [`orchestrator`] walks the registry under a stop/continue policy and
//!   produces a `RunResult`. Its per-check decision is pure; the async shell
//!   around it owns process execution and the diagnostic log.
//! - [`aggregate`] reduces check results into counts and a verdict.

pub mod aggregate;
pub mod orchestrator;

pub use aggregate::{RunSummary, summarize};
pub use orchestrator::{Decision, Orchestrator, RunPolicy, SkipReason, decide};
