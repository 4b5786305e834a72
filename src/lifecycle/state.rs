// src/lifecycle/state.rs

//! Pure lifecycle state machine. No IO; the controller feeds it events.

use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Bootstrapping,
    PrerequisiteCheck,
    FetchValidationSuite,
    RunValidation,
    FailedTerminal,
    PublishResults,
    Decommission,
    Terminated,
}

impl LifecycleState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Terminated)
    }

    /// Apply `event`, returning the next state.
    pub fn next(self, event: LifecycleEvent) -> Result<LifecycleState, InvalidTransition> {
        use LifecycleEvent as E;
        use LifecycleState as S;

        let to = match (self, event) {
            (S::Bootstrapping, E::BootstrapSucceeded) => S::PrerequisiteCheck,
            (S::Bootstrapping, E::BootstrapFailed) => S::FailedTerminal,
            (S::PrerequisiteCheck, E::PrerequisitesSatisfied) => S::FetchValidationSuite,
            (S::PrerequisiteCheck, E::RuntimeMissing) => S::FailedTerminal,
            (S::FetchValidationSuite, E::SuiteRetrieved) => S::RunValidation,
            (S::FetchValidationSuite, E::RetrievalFailed) => S::FailedTerminal,
            (S::RunValidation, E::RunFinished) => S::PublishResults,
            (S::FailedTerminal, E::Proceed) => S::PublishResults,
            (S::PublishResults, E::Proceed) => S::Decommission,
            (S::Decommission, E::Proceed) => S::Terminated,
            (from, event) => return Err(InvalidTransition { from, event }),
        };
        Ok(to)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    BootstrapSucceeded,
    BootstrapFailed,
    PrerequisitesSatisfied,
    RuntimeMissing,
    SuiteRetrieved,
    RetrievalFailed,
    RunFinished,
    /// Unconditional step out of `FailedTerminal`, `PublishResults` and
    /// `Decommission`.
    Proceed,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("invalid lifecycle transition: {event:?} in state {from}")]
pub struct InvalidTransition {
    pub from: LifecycleState,
    pub event: LifecycleEvent,
}

/// One applied transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: LifecycleState,
    pub event: LifecycleEvent,
    pub to: LifecycleState,
}

/// The state machine plus its history.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: LifecycleState,
    history: Vec<Transition>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: LifecycleState::Bootstrapping,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn apply(&mut self, event: LifecycleEvent) -> Result<Transition, InvalidTransition> {
        let to = self.state.next(event)?;
        let transition = Transition {
            from: self.state,
            event,
            to,
        };
        self.state = to;
        self.history.push(transition);
        Ok(transition)
    }

    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    /// Whether the run went through `FailedTerminal`.
    pub fn failed(&self) -> bool {
        self.history
            .iter()
            .any(|t| t.to == LifecycleState::FailedTerminal)
    }

    pub fn into_history(self) -> Vec<Transition> {
        self.history
    }
}
