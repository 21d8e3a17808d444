#![forbid(unsafe_code)]

//! Callback registration types.
//!
//! A [`Callback`] is a computation plus its declared dependencies:
//!
//! - **inputs**: properties whose changes trigger the callback;
//! - **states**: properties read when it runs but that never trigger it;
//! - **outputs**: properties it writes, one [`Update`] per output, in order.
//!
//! The handler returns either [`Outcome::Suppress`] (nothing is written and
//! no dependent is scheduled) or [`Outcome::Outputs`]. A handler error is a
//! failure, which is a different signal from suppression: it aborts the
//! settle cycle.
//!
//! Server and client callbacks share this interface. [`ExecutionSite`] is
//! metadata recorded in the settle report; reconciliation semantics are the
//! same for both.

use std::fmt;

use fdash_core::Patch;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::key::PropKey;

/// Registration-order index of a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct CallbackId(pub(crate) usize);

impl CallbackId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cb#{}", self.0)
    }
}

/// Where a callback body runs. Transport is out of scope; this is a tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionSite {
    #[default]
    Server,
    Client,
}

/// A failure raised by a callback body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ComputationError {
    message: String,
}

impl ComputationError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for ComputationError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ComputationError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// What a callback wants done with one output.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Full replacement.
    Replace(Value),
    /// In-place edit of the current value.
    Patch(Patch),
    /// Leave this output untouched; sibling outputs still apply.
    NoUpdate,
}

impl From<Value> for Update {
    fn from(value: Value) -> Self {
        Self::Replace(value)
    }
}

impl From<Patch> for Update {
    fn from(patch: Patch) -> Self {
        Self::Patch(patch)
    }
}

/// Result of one callback invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Do not update any output and do not schedule dependents.
    Suppress,
    /// One update per declared output, in declaration order.
    Outputs(Vec<Update>),
}

impl Outcome {
    /// Single-output replacement.
    #[must_use]
    pub fn replace(value: impl Into<Value>) -> Self {
        Self::Outputs(vec![Update::Replace(value.into())])
    }

    /// Single-output patch.
    #[must_use]
    pub fn patch(patch: Patch) -> Self {
        Self::Outputs(vec![Update::Patch(patch)])
    }

    #[must_use]
    pub fn outputs(updates: impl IntoIterator<Item = Update>) -> Self {
        Self::Outputs(updates.into_iter().collect())
    }
}

static NULL: Value = Value::Null;

/// Values handed to a callback body.
///
/// Every value is an owned copy taken when the callback is dequeued, so the
/// body sees a consistent snapshot and cannot reach back into the store.
#[derive(Debug, Clone)]
pub struct CallbackContext {
    pub(crate) name: String,
    pub(crate) site: ExecutionSite,
    pub(crate) inputs: Vec<(PropKey, Value)>,
    pub(crate) states: Vec<(PropKey, Value)>,
    pub(crate) triggered: Vec<PropKey>,
}

impl CallbackContext {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn site(&self) -> ExecutionSite {
        self.site
    }

    /// Value of the `index`th declared input, or `null` past the end.
    #[must_use]
    pub fn input(&self, index: usize) -> &Value {
        self.inputs.get(index).map_or(&NULL, |(_, value)| value)
    }

    /// Value of the `index`th declared state, or `null` past the end.
    #[must_use]
    pub fn state(&self, index: usize) -> &Value {
        self.states.get(index).map_or(&NULL, |(_, value)| value)
    }

    #[must_use]
    pub fn inputs(&self) -> &[(PropKey, Value)] {
        &self.inputs
    }

    #[must_use]
    pub fn states(&self) -> &[(PropKey, Value)] {
        &self.states
    }

    /// Input properties whose change scheduled this run. Empty on the
    /// initial call.
    #[must_use]
    pub fn triggered(&self) -> &[PropKey] {
        &self.triggered
    }

    #[must_use]
    pub fn is_initial_call(&self) -> bool {
        self.triggered.is_empty()
    }

    #[must_use]
    pub fn triggered_by(&self, component: &str, property: &str) -> bool {
        self.triggered.iter().any(|key| key.is(component, property))
    }
}

pub(crate) type Handler = Box<dyn Fn(&CallbackContext) -> Result<Outcome, ComputationError>>;

/// Declared dependencies and flags of a registered callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackSpec {
    pub name: String,
    pub inputs: Vec<PropKey>,
    pub states: Vec<PropKey>,
    pub outputs: Vec<PropKey>,
    pub site: ExecutionSite,
    pub prevent_initial_call: bool,
}

/// A callback awaiting registration.
pub struct Callback {
    spec: CallbackSpec,
    handler: Handler,
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

impl Callback {
    pub fn new(
        name: impl Into<String>,
        handler: impl Fn(&CallbackContext) -> Result<Outcome, ComputationError> + 'static,
    ) -> Self {
        Self {
            spec: CallbackSpec {
                name: name.into(),
                inputs: Vec::new(),
                states: Vec::new(),
                outputs: Vec::new(),
                site: ExecutionSite::Server,
                prevent_initial_call: false,
            },
            handler: Box::new(handler),
        }
    }

    #[must_use]
    pub fn input(mut self, component: &str, property: &str) -> Self {
        self.spec.inputs.push(PropKey::new(component, property));
        self
    }

    #[must_use]
    pub fn state(mut self, component: &str, property: &str) -> Self {
        self.spec.states.push(PropKey::new(component, property));
        self
    }

    #[must_use]
    pub fn output(mut self, component: &str, property: &str) -> Self {
        self.spec.outputs.push(PropKey::new(component, property));
        self
    }

    /// Mark as a client-side callback.
    #[must_use]
    pub fn clientside(mut self) -> Self {
        self.spec.site = ExecutionSite::Client;
        self
    }

    /// Skip this callback during [`crate::Propagator::start`].
    #[must_use]
    pub fn prevent_initial_call(mut self) -> Self {
        self.spec.prevent_initial_call = true;
        self
    }

    #[must_use]
    pub fn spec(&self) -> &CallbackSpec {
        &self.spec
    }

    pub(crate) fn into_parts(self) -> (CallbackSpec, Handler) {
        (self.spec, self.handler)
    }
}
