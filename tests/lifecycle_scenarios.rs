// tests/lifecycle_scenarios.rs

mod common;
use crate::common::builders::{RUNTIMES, fetched_registry, local_registry};
use crate::common::fake_executor::FakeExecutor;
use crate::common::fakes::{FailingPublisher, FakeFetcher, HangingPublisher, RecordingPublisher};
use crate::common::{init_tracing, logged_context, with_timeout};

use std::sync::Arc;
use std::time::Duration;

use runtime_validator::config::model::DecommissionSection;
use runtime_validator::engine::{Orchestrator, RunPolicy};
use runtime_validator::fs::mock::MockFileSystem;
use runtime_validator::lifecycle::{
    LifecycleController, LifecycleState, ProcessWorkerHost, WorkerReport,
};
use runtime_validator::model::RunOutcome;
use runtime_validator::publish::{
    CommandPublisher, PublisherChain, ResultEnvelope, ResultPublisher, SignalEmitter,
};
use runtime_validator::registry::Registry;
use runtime_validator::types::{OverallStatus, RunExit};

const RESULT_KEY: &str = "runtime-validation/vm-life/validation-result.json";

struct Harness {
    registry: Registry,
    executor: FakeExecutor,
    fetcher: FakeFetcher,
    chain: PublisherChain,
    required_tools: Vec<String>,
    decommission: DecommissionSection,
    fs: MockFileSystem,
}

impl Harness {
    fn new(store: &RecordingPublisher) -> Self {
        Self {
            registry: local_registry(&RUNTIMES),
            executor: FakeExecutor::new(),
            fetcher: FakeFetcher::new(),
            chain: PublisherChain::default().with(Arc::new(store.clone())),
            required_tools: Vec::new(),
            decommission: DecommissionSection::default(),
            fs: MockFileSystem::new(),
        }
    }

    async fn run(self) -> WorkerReport {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = logged_context("vm-life", dir.path());

        let host = ProcessWorkerHost {
            required_tools: self.required_tools,
            runtimes: Vec::new(),
            registry: self.registry,
            fetcher: Arc::new(self.fetcher),
            skip_fetch: false,
            orchestrator: Orchestrator::new(self.executor),
            policy: RunPolicy::default(),
            publisher: ResultPublisher::new(SignalEmitter::default(), self.chain, "runtime-validation"),
            decommission: self.decommission,
            fs: Arc::new(self.fs),
        };

        with_timeout(LifecycleController::new(host).run(&mut ctx)).await
    }
}

fn stored_envelope(store: &RecordingPublisher) -> ResultEnvelope {
    let body = store.get(RESULT_KEY).expect("envelope stored");
    ResultEnvelope::from_json(&body).unwrap()
}

#[tokio::test]
async fn passing_run_walks_every_state_once() {
    init_tracing();
    let store = RecordingPublisher::new("store");

    let report = Harness::new(&store).run().await;

    assert_eq!(
        report.states(),
        vec![
            LifecycleState::Bootstrapping,
            LifecycleState::PrerequisiteCheck,
            LifecycleState::FetchValidationSuite,
            LifecycleState::RunValidation,
            LifecycleState::PublishResults,
            LifecycleState::Decommission,
            LifecycleState::Terminated,
        ]
    );
    assert_eq!(report.exit, RunExit::Passed);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert_eq!(stored_envelope(&store).scan_result, OverallStatus::Pass);
}

#[tokio::test]
async fn failing_check_publishes_fail_and_exits_one() {
    init_tracing();
    let store = RecordingPublisher::new("store");
    let mut harness = Harness::new(&store);
    harness.executor = FakeExecutor::new().failing("node");

    let report = harness.run().await;

    assert_eq!(report.final_state, LifecycleState::Terminated);
    assert_eq!(report.exit, RunExit::Failed);
    assert_eq!(report.outcome.overall_status(), OverallStatus::Fail);
    assert_eq!(stored_envelope(&store).scan_result, OverallStatus::Fail);
}

#[tokio::test]
async fn scenario_d_unreachable_suite_publishes_fail_envelope() {
    init_tracing();
    let store = RecordingPublisher::new("store");
    let mut harness = Harness::new(&store);
    harness.registry = fetched_registry(&RUNTIMES, "https://suite.invalid/checks");
    harness.fetcher = FakeFetcher::unreachable();
    let fetcher = harness.fetcher.clone();
    let executor = harness.executor.clone();

    let report = harness.run().await;

    assert!(report.states().contains(&LifecycleState::FailedTerminal));
    assert!(!report.states().contains(&LifecycleState::RunValidation));
    assert_eq!(report.final_state, LifecycleState::Terminated);
    assert_eq!(report.exit, RunExit::Setup);
    assert_eq!(report.exit.code(), 3);
    assert!(executor.invoked().is_empty(), "no check may run");
    assert!(!fetcher.fetched().is_empty(), "the suite fetch was attempted");
    assert!(matches!(report.outcome, RunOutcome::SetupFault { .. }));

    let envelope = stored_envelope(&store);
    assert_eq!(envelope.scan_result, OverallStatus::Fail);
    assert!(envelope.checks.is_empty());
    assert!(envelope.error.unwrap().contains("suite retrieval failed"));
}

#[tokio::test]
async fn missing_bootstrap_tool_fails_before_prerequisites() {
    init_tracing();
    let store = RecordingPublisher::new("store");
    let mut harness = Harness::new(&store);
    harness.required_tools = vec!["definitely-not-installed-tool-1138".to_string()];

    let report = harness.run().await;

    assert_eq!(
        report.states()[..3],
        [
            LifecycleState::Bootstrapping,
            LifecycleState::FailedTerminal,
            LifecycleState::PublishResults,
        ]
    );
    assert_eq!(report.exit, RunExit::Setup);
    let envelope = stored_envelope(&store);
    assert!(
        envelope
            .error
            .unwrap()
            .contains("definitely-not-installed-tool-1138")
    );
}

#[tokio::test]
async fn publish_failure_never_blocks_termination() {
    init_tracing();
    let store = RecordingPublisher::new("unused");
    let mut harness = Harness::new(&store);
    harness.chain = PublisherChain::default()
        .with(Arc::new(FailingPublisher::unavailable("cli")))
        .with(Arc::new(FailingPublisher::failed("http")));

    let report = harness.run().await;

    assert_eq!(report.final_state, LifecycleState::Terminated);
    assert_eq!(report.exit, RunExit::Passed);
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.contains("result envelope not stored durably"))
    );
}

#[tokio::test]
async fn hung_transport_is_abandoned_and_the_next_one_stores() {
    init_tracing();
    let store = RecordingPublisher::new("store");
    let mut harness = Harness::new(&store);
    harness.chain = PublisherChain::default()
        .with_attempt_timeout(Duration::from_millis(200))
        .with(Arc::new(HangingPublisher::new("stuck")))
        .with(Arc::new(store.clone()));

    let report = harness.run().await;

    assert_eq!(report.final_state, LifecycleState::Terminated);
    assert_eq!(report.exit, RunExit::Passed);
    assert_eq!(stored_envelope(&store).scan_result, OverallStatus::Pass);
}

#[cfg(unix)]
#[tokio::test]
async fn hanging_upload_command_still_reaches_terminated() {
    init_tracing();
    let store = RecordingPublisher::new("unused");
    let mut harness = Harness::new(&store);
    harness.chain = PublisherChain::default()
        .with_attempt_timeout(Duration::from_millis(300))
        .with(Arc::new(CommandPublisher::new("sleep 30 || true {file}", "x/{key}")));

    let report = harness.run().await;

    assert_eq!(report.final_state, LifecycleState::Terminated);
    assert!(report.states().contains(&LifecycleState::Decommission));
    assert!(
        report.warnings.iter().any(|w| w.contains("timed out")),
        "{:?}",
        report.warnings
    );
}

#[cfg(unix)]
#[tokio::test]
async fn decommission_failures_are_warnings() {
    init_tracing();
    let store = RecordingPublisher::new("store");
    let mut harness = Harness::new(&store);
    harness.decommission = DecommissionSection {
        commands: vec!["exit 4".to_string(), "true".to_string()],
        remove_work_dir: true,
    };

    let report = harness.run().await;

    assert_eq!(report.final_state, LifecycleState::Terminated);
    assert_eq!(report.exit, RunExit::Passed);
    assert_eq!(report.warnings.len(), 1, "{:?}", report.warnings);
    assert!(report.warnings[0].contains("exit 4"));
}
