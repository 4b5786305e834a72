// src/lifecycle/mod.rs

//! Ephemeral worker lifecycle.
//!
//! - [`state`]: the pure state machine (`Bootstrapping` .. `Terminated`).
//! - [`controller`]: drives the machine through a [`WorkerHost`].
//! - [`host`]: the production host (PATH lookups, fetch, process checks,
//!   dual-channel publish, shell decommission steps).

pub mod controller;
pub mod host;
pub mod state;

pub use controller::{LifecycleController, StepFuture, WorkerHost, WorkerReport};
pub use host::ProcessWorkerHost;
pub use state::{InvalidTransition, Lifecycle, LifecycleEvent, LifecycleState, Transition};
