#![forbid(unsafe_code)]

//! Settle-cycle reports.

use std::fmt;

use serde::Serialize;

use crate::callback::ExecutionSite;
use crate::key::PropKey;

/// What started a settle cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    /// The initial call made by [`crate::Propagator::start`].
    Initial,
    /// An external write through [`crate::Propagator::set_property`].
    External(PropKey),
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => f.write_str("initial"),
            Self::External(key) => write!(f, "{key}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Applied,
    Suppressed,
}

/// One computation invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackRun {
    pub callback: String,
    pub site: ExecutionSite,
    pub triggered: Vec<PropKey>,
    pub outcome: RunOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Full-value write (external or from a computation).
    Replaced,
    /// Written by applying a patch.
    Patched,
    /// A control's value rewritten after its catalog changed.
    Reconciled,
}

/// One property whose value changed during the cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertyChange {
    pub key: PropKey,
    pub kind: ChangeKind,
    /// Computation that caused the write; `None` for the external trigger.
    pub source: Option<String>,
}

/// Everything one settle cycle did, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettleReport {
    pub trigger: TriggerEvent,
    pub runs: Vec<CallbackRun>,
    pub changes: Vec<PropertyChange>,
    pub duration_us: u64,
}

impl SettleReport {
    pub(crate) fn new(trigger: TriggerEvent) -> Self {
        Self {
            trigger,
            runs: Vec::new(),
            changes: Vec::new(),
            duration_us: 0,
        }
    }

    #[must_use]
    pub fn computations_run(&self) -> usize {
        self.runs.len()
    }

    #[must_use]
    pub fn properties_changed(&self) -> usize {
        self.changes.len()
    }

    /// Names of the computations run, in execution order.
    pub fn run_names(&self) -> impl Iterator<Item = &str> {
        self.runs.iter().map(|run| run.callback.as_str())
    }

    #[must_use]
    pub fn changed(&self, component: &str, property: &str) -> bool {
        self.changes.iter().any(|c| c.key.is(component, property))
    }

    #[must_use]
    pub fn change_kind(&self, component: &str, property: &str) -> Option<ChangeKind> {
        self.changes
            .iter()
            .rev()
            .find(|c| c.key.is(component, property))
            .map(|c| c.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_display() {
        assert_eq!(TriggerEvent::Initial.to_string(), "initial");
        assert_eq!(
            TriggerEvent::External(PropKey::new("remove", "n_clicks")).to_string(),
            "remove.n_clicks"
        );
    }

    #[test]
    fn change_kind_reports_latest() {
        let mut report = SettleReport::new(TriggerEvent::Initial);
        report.changes.push(PropertyChange {
            key: PropKey::new("d", "value"),
            kind: ChangeKind::Replaced,
            source: None,
        });
        report.changes.push(PropertyChange {
            key: PropKey::new("d", "value"),
            kind: ChangeKind::Reconciled,
            source: Some("trim".into()),
        });
        assert!(report.changed("d", "value"));
        assert_eq!(report.change_kind("d", "value"), Some(ChangeKind::Reconciled));
        assert_eq!(report.change_kind("d", "options"), None);
    }
}
