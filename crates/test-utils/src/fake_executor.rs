use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use runtime_validator::exec::{CheckExecutor, ExecOutcome};
use runtime_validator::registry::ResolvedCheck;

/// A fake executor that:
/// - records which checks were invoked, in order
/// - returns a scripted outcome per key (exit 0 unless told otherwise).
#[derive(Debug, Clone, Default)]
pub struct FakeExecutor {
    outcomes: HashMap<String, ExecOutcome>,
    invoked: Arc<Mutex<Vec<String>>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `key` exit with `code`.
    pub fn exit_with(mut self, key: &str, code: i32) -> Self {
        self.outcomes.insert(
            key.to_string(),
            ExecOutcome::exited(code, format!("{key}: exit {code}\n")),
        );
        self
    }

    pub fn failing(self, key: &str) -> Self {
        self.exit_with(key, 1)
    }

    pub fn outcome(mut self, key: &str, outcome: ExecOutcome) -> Self {
        self.outcomes.insert(key.to_string(), outcome);
        self
    }

    /// Shared handle; stays valid after the executor is moved into an
    /// orchestrator.
    pub fn invoked_handle(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.invoked)
    }

    pub fn invoked(&self) -> Vec<String> {
        self.invoked.lock().unwrap().clone()
    }
}

impl CheckExecutor for FakeExecutor {
    fn execute<'a>(
        &'a self,
        check: &'a ResolvedCheck,
        _echo_output: bool,
    ) -> Pin<Box<dyn Future<Output = ExecOutcome> + Send + 'a>> {
        Box::pin(async move {
            self.invoked.lock().unwrap().push(check.key().to_string());

            self.outcomes
                .get(check.key())
                .cloned()
                .unwrap_or_else(|| ExecOutcome::exited(0, format!("{} ok\n", check.key())))
        })
    }
}
