#![forbid(unsafe_code)]

//! FrankenDash Runtime
//!
//! Dependency graph and settle-cycle propagation for dashboard callbacks.
//!
//! # Key Components
//!
//! - [`Layout`] - Components and their initial property values
//! - [`Callback`] - A computation with declared inputs, states and outputs
//! - [`DependencyGraph`] - Property-level graph, acyclic at registration
//! - [`Propagator`] - Owns the store and runs settle cycles to a fixpoint
//! - [`SettleReport`] - What one settle cycle ran and changed
//! - [`RuntimeConfig`] - Policy-as-data tunables
//!
//! # Role in FrankenDash
//! `fdash-runtime` sits between app code and `fdash-core`. It decides which
//! callbacks run after a property changes, in what order and with which
//! inputs, and delegates catalog replacement, value reconciliation and patch
//! application to the core crate.
//!
//! # How it fits in the system
//! `fdash-harness` drives a [`Propagator`] the way a browser would (clicks,
//! keystrokes) and reads settled text back out of it.

pub mod callback;
pub mod config;
pub mod graph;
pub mod key;
pub mod layout;
pub mod propagator;
pub mod report;
pub mod store;

pub use callback::{
    Callback, CallbackContext, CallbackId, CallbackSpec, ComputationError, ExecutionSite, Outcome,
    Update,
};
pub use config::{ConfigError, RuntimeConfig};
pub use graph::{DependencyGraph, GraphError};
pub use key::{ComponentId, PropKey};
pub use layout::{Dropdown, Layout, LayoutError};
pub use propagator::{ApplyError, Propagator, SettleError};
pub use report::{CallbackRun, ChangeKind, PropertyChange, RunOutcome, SettleReport, TriggerEvent};
pub use store::PropertyStore;
