#![forbid(unsafe_code)]

//! Settle-cycle propagation.
//!
//! # Design
//!
//! [`Propagator`] owns the [`PropertyStore`], the typed [`Control`]s and the
//! [`DependencyGraph`]. Every mutating entry point takes `&mut self`, so one
//! settle cycle always drains before the next external input is accepted.
//!
//! A cycle is a FIFO queue of pending computations:
//!
//! 1. A property write that changes a value schedules that property's
//!    subscribers, in registration order.
//! 2. Each queued entry carries a snapshot of its inputs and states taken when
//!    it was queued. When coalescing is on, a re-triggered entry keeps its
//!    queue position, extends its trigger list and refreshes its snapshot.
//! 3. The dequeued computation runs. [`Outcome::Suppress`] writes nothing and
//!    schedules nothing. Otherwise each output is applied in order and every
//!    output whose value changed schedules its own subscribers.
//! 4. The cycle ends when the queue is empty.
//!
//! Writes to a control's `options` replace its catalog and reconcile its
//! `value`; a changed value is notified as a separate property change.
//! Patched writes go through the same path as replacements, so subscribers
//! cannot tell the two apart.
//!
//! # Failure modes
//!
//! | Failure | Effect |
//! |---------|--------|
//! | Computation returns `Err` | Cycle aborts; earlier writes stay |
//! | Wrong number of updates | Cycle aborts before any output is written |
//! | Output fails to apply | Cycle aborts; earlier outputs stay |
//!
//! Nothing is rolled back and nothing is retried.

use std::collections::{HashMap, VecDeque};

use fdash_core::{CatalogError, Control, OptionCatalog, PatchError, SelectionError, SelectionValue};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info_span, warn};
use web_time::Instant;

use crate::callback::{Callback, CallbackContext, CallbackId, ComputationError, Handler, Outcome, Update};
use crate::config::RuntimeConfig;
use crate::graph::{DependencyGraph, GraphError};
use crate::key::{ComponentId, PropKey};
use crate::report::{CallbackRun, ChangeKind, PropertyChange, RunOutcome, SettleReport, TriggerEvent};
use crate::store::PropertyStore;

/// A rejected property write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// Errors that abort a settle cycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SettleError {
    #[error("computation `{computation}` failed (trigger: {trigger}): {source}")]
    ComputationFailure {
        computation: String,
        trigger: TriggerEvent,
        #[source]
        source: ComputationError,
    },

    #[error("computation `{computation}` returned {found} updates for {expected} outputs")]
    OutputArity {
        computation: String,
        expected: usize,
        found: usize,
    },

    #[error("output {key} of `{computation}` could not be applied: {source}")]
    Apply {
        computation: String,
        key: PropKey,
        #[source]
        source: ApplyError,
    },

    #[error("external write to {key} rejected: {source}")]
    Rejected {
        key: PropKey,
        #[source]
        source: ApplyError,
    },

    #[error("unknown component {component}")]
    UnknownComponent { component: ComponentId },
}

/// How a write reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteKind {
    Replace,
    Patch,
}

impl WriteKind {
    fn change_kind(self) -> ChangeKind {
        match self {
            Self::Replace => ChangeKind::Replaced,
            Self::Patch => ChangeKind::Patched,
        }
    }
}

#[derive(Debug)]
struct Pending {
    id: CallbackId,
    triggered: Vec<PropKey>,
    inputs: Vec<(PropKey, Value)>,
    states: Vec<(PropKey, Value)>,
}

/// Owner of the property store, controls and callback graph.
pub struct Propagator {
    config: RuntimeConfig,
    graph: DependencyGraph,
    handlers: Vec<Handler>,
    store: PropertyStore,
    controls: HashMap<ComponentId, Control>,
}

impl std::fmt::Debug for Propagator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Propagator")
            .field("config", &self.config)
            .field("callbacks", &self.graph.len())
            .field("properties", &self.store.len())
            .field("controls", &self.controls.len())
            .finish()
    }
}

impl Default for Propagator {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl Propagator {
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            graph: DependencyGraph::new(),
            handlers: Vec::new(),
            store: PropertyStore::new(),
            controls: HashMap::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Declare a plain component and seed its properties.
    pub fn declare_component(
        &mut self,
        id: impl Into<ComponentId>,
        properties: impl IntoIterator<Item = (String, Value)>,
    ) {
        let id = id.into();
        for (property, value) in properties {
            self.store.declare(PropKey::new(id.clone(), property), value);
        }
        self.graph.declare_component(id);
    }

    /// Declare a selection control. Its `options` and `value` become
    /// ordinary properties backed by the typed control.
    pub fn declare_control(&mut self, control: Control) {
        let id = ComponentId::from(control.id());
        self.store.declare(
            PropKey::new(id.clone(), "options"),
            control.catalog().to_json(),
        );
        self.store
            .declare(PropKey::new(id.clone(), "value"), control.value().to_json());
        self.graph.declare_control(id.clone());
        self.controls.insert(id, control);
    }

    /// Register a computation. On error nothing is registered.
    pub fn register(&mut self, callback: Callback) -> Result<CallbackId, GraphError> {
        let (spec, handler) = callback.into_parts();
        let id = self.graph.register(spec)?;
        self.handlers.push(handler);
        Ok(id)
    }

    /// Current settled value of a property.
    #[must_use]
    pub fn get_property(&self, component: &str, property: &str) -> Option<&Value> {
        self.store.get(&PropKey::new(component, property))
    }

    /// Typed view of a selection control.
    #[must_use]
    pub fn control(&self, id: &str) -> Option<&Control> {
        self.controls.get(&ComponentId::from(id))
    }

    /// Run the initial call: every computation not marked
    /// `prevent_initial_call`, upstream before downstream.
    pub fn start(&mut self) -> Result<SettleReport, SettleError> {
        let mut queue = VecDeque::new();
        if self.config.initial_call {
            for id in self.graph.initial_order() {
                if self.graph.spec(id).prevent_initial_call {
                    continue;
                }
                queue.push_back(self.pending(id, Vec::new()));
            }
        }
        self.settle(TriggerEvent::Initial, queue, None)
    }

    /// External write; the only entry point that starts a settle cycle after
    /// [`Propagator::start`].
    pub fn set_property(
        &mut self,
        component: &str,
        property: &str,
        value: Value,
    ) -> Result<SettleReport, SettleError> {
        let key = PropKey::new(component, property);
        if !self.graph.has_component(&key.component) {
            return Err(SettleError::UnknownComponent {
                component: key.component,
            });
        }
        self.settle(
            TriggerEvent::External(key.clone()),
            VecDeque::new(),
            Some((key, value)),
        )
    }

    fn settle(
        &mut self,
        trigger: TriggerEvent,
        mut queue: VecDeque<Pending>,
        external: Option<(PropKey, Value)>,
    ) -> Result<SettleReport, SettleError> {
        let started = Instant::now();
        let span = info_span!(
            "fdash.settle",
            trigger = %trigger,
            computations_run = tracing::field::Empty,
            properties_changed = tracing::field::Empty,
            duration_us = tracing::field::Empty
        );
        let _guard = span.enter();

        let mut report = SettleReport::new(trigger);
        let result = self.run_cycle(&mut queue, external, &mut report);

        report.duration_us = started.elapsed().as_micros() as u64;
        span.record("computations_run", report.computations_run() as u64);
        span.record("properties_changed", report.properties_changed() as u64);
        span.record("duration_us", report.duration_us);
        result.map(|()| report)
    }

    fn run_cycle(
        &mut self,
        queue: &mut VecDeque<Pending>,
        external: Option<(PropKey, Value)>,
        report: &mut SettleReport,
    ) -> Result<(), SettleError> {
        if let Some((key, value)) = external {
            let changed = self
                .write(&key, value, WriteKind::Replace, None, report)
                .map_err(|source| SettleError::Rejected {
                    key: key.clone(),
                    source,
                })?;
            for changed_key in &changed {
                self.schedule(queue, changed_key);
            }
        }

        while let Some(pending) = queue.pop_front() {
            self.run_one(pending, queue, report)?;
        }
        Ok(())
    }

    fn run_one(
        &mut self,
        pending: Pending,
        queue: &mut VecDeque<Pending>,
        report: &mut SettleReport,
    ) -> Result<(), SettleError> {
        let spec = self.graph.spec(pending.id).clone();
        let ctx = CallbackContext {
            name: spec.name.clone(),
            site: spec.site,
            inputs: pending.inputs,
            states: pending.states,
            triggered: pending.triggered,
        };
        debug!(
            callback = %spec.name,
            site = ?spec.site,
            triggered = ctx.triggered.len(),
            "running computation"
        );

        let outcome = (self.handlers[pending.id.index()])(&ctx).map_err(|source| {
            warn!(callback = %spec.name, error = %source, "computation failed");
            SettleError::ComputationFailure {
                computation: spec.name.clone(),
                trigger: report.trigger.clone(),
                source,
            }
        })?;

        let updates = match outcome {
            Outcome::Suppress => {
                debug!(callback = %spec.name, "computation suppressed update");
                report.runs.push(CallbackRun {
                    callback: spec.name,
                    site: spec.site,
                    triggered: ctx.triggered,
                    outcome: RunOutcome::Suppressed,
                });
                return Ok(());
            }
            Outcome::Outputs(updates) => updates,
        };
        if updates.len() != spec.outputs.len() {
            warn!(
                callback = %spec.name,
                expected = spec.outputs.len(),
                found = updates.len(),
                "output arity mismatch"
            );
            return Err(SettleError::OutputArity {
                computation: spec.name,
                expected: spec.outputs.len(),
                found: updates.len(),
            });
        }

        report.runs.push(CallbackRun {
            callback: spec.name.clone(),
            site: spec.site,
            triggered: ctx.triggered,
            outcome: RunOutcome::Applied,
        });
        for (key, update) in spec.outputs.iter().zip(updates) {
            let written = match update {
                Update::NoUpdate => continue,
                Update::Replace(value) => {
                    self.write(key, value, WriteKind::Replace, Some(&spec.name), report)
                }
                Update::Patch(patch) => {
                    let current = self.store.get_or_null(key);
                    match patch.apply(&current) {
                        Ok(next) => self.write(key, next, WriteKind::Patch, Some(&spec.name), report),
                        Err(err) => Err(ApplyError::from(err)),
                    }
                }
            };
            let changed = written.map_err(|source| {
                warn!(callback = %spec.name, key = %key, error = %source, "output rejected");
                SettleError::Apply {
                    computation: spec.name.clone(),
                    key: key.clone(),
                    source,
                }
            })?;
            for changed_key in &changed {
                self.schedule(queue, changed_key);
            }
        }
        Ok(())
    }

    /// Write one property, routing control properties through the typed
    /// control. Returns every key whose value changed, in notification order.
    fn write(
        &mut self,
        key: &PropKey,
        value: Value,
        kind: WriteKind,
        source: Option<&str>,
        report: &mut SettleReport,
    ) -> Result<Vec<PropKey>, ApplyError> {
        if self.config.trace_values {
            debug!(key = %key, value = %self.config.preview(&value), "writing property");
        }
        let mut changed = Vec::new();
        let mut record = |key: &PropKey, kind: ChangeKind, changed: &mut Vec<PropKey>| {
            report.changes.push(PropertyChange {
                key: key.clone(),
                kind,
                source: source.map(str::to_owned),
            });
            changed.push(key.clone());
        };

        let Some(control) = self.controls.get_mut(&key.component) else {
            if self.store.set(key, value) {
                record(key, kind.change_kind(), &mut changed);
            }
            return Ok(changed);
        };

        match key.property.as_str() {
            "options" => {
                let catalog = OptionCatalog::from_json(&value)?;
                let canonical = catalog.to_json();
                let value_changed = control.set_catalog(catalog);
                let value_json = control.value().to_json();
                if self.store.set(key, canonical) {
                    record(key, kind.change_kind(), &mut changed);
                }
                let value_key = PropKey::new(key.component.clone(), "value");
                if value_changed && self.store.set(&value_key, value_json) {
                    debug!(control = %key.component, "value reconciled against new options");
                    record(&value_key, ChangeKind::Reconciled, &mut changed);
                }
            }
            "value" => {
                let next = SelectionValue::from_json(&value, control.is_multi(), control.id())?;
                control.set_value(next)?;
                let value_json = control.value().to_json();
                if self.store.set(key, value_json) {
                    record(key, kind.change_kind(), &mut changed);
                }
            }
            _ => {
                if self.store.set(key, value) {
                    record(key, kind.change_kind(), &mut changed);
                }
            }
        }
        Ok(changed)
    }

    fn snapshot(&self, keys: &[PropKey]) -> Vec<(PropKey, Value)> {
        keys.iter()
            .map(|key| (key.clone(), self.store.get_or_null(key)))
            .collect()
    }

    fn pending(&self, id: CallbackId, triggered: Vec<PropKey>) -> Pending {
        let spec = self.graph.spec(id);
        Pending {
            id,
            triggered,
            inputs: self.snapshot(&spec.inputs),
            states: self.snapshot(&spec.states),
        }
    }

    fn schedule(&self, queue: &mut VecDeque<Pending>, key: &PropKey) {
        for &id in self.graph.subscribers(key) {
            let existing = if self.config.coalesce_pending {
                queue.iter_mut().find(|p| p.id == id)
            } else {
                None
            };
            match existing {
                Some(existing) => {
                    if !existing.triggered.contains(key) {
                        existing.triggered.push(key.clone());
                    }
                    let spec = self.graph.spec(id);
                    existing.inputs = self.snapshot(&spec.inputs);
                    existing.states = self.snapshot(&spec.states);
                }
                None => queue.push_back(self.pending(id, vec![key.clone()])),
            }
        }
    }
}
