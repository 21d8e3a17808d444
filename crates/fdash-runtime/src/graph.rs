#![forbid(unsafe_code)]

//! Callback dependency graph.
//!
//! # Design
//!
//! The graph is kept at property granularity. Nodes are [`PropKey`]s; edges
//! come from two sources:
//!
//! - every registered callback contributes `input -> output` edges for each
//!   input/output pair (states contribute none);
//! - every selection control contributes an implicit `options -> value`
//!   edge, because replacing a control's catalog may rewrite its value.
//!
//! Subscribers of a property are kept in registration order, which is the
//! order a settle cycle schedules them in.
//!
//! # Invariants
//!
//! 1. The property graph is acyclic; registration that would close a cycle
//!    is rejected and leaves the graph unchanged.
//! 2. Each property is the output of at most one callback.
//! 3. [`DependencyGraph::initial_order`] lists every callback whose outputs
//!    can reach another callback's inputs before that callback.

use std::collections::{BTreeSet, HashMap, HashSet};

use thiserror::Error;

use crate::callback::{CallbackId, CallbackSpec};
use crate::key::{ComponentId, PropKey};

/// Registration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("callback `{callback}` would create a dependency cycle through {output} -> {input}")]
    CycleDetectedAtRegistration {
        callback: String,
        input: PropKey,
        output: PropKey,
    },

    #[error("output {output} of `{callback}` is already written by `{owner}`")]
    DuplicateOutput {
        callback: String,
        output: PropKey,
        owner: String,
    },

    #[error("callback `{callback}` declares no outputs")]
    EmptyOutputs { callback: String },

    #[error("callback `{callback}` references unknown component {component}")]
    UnknownComponent {
        callback: String,
        component: ComponentId,
    },
}

/// Property-level dependency graph over registered callbacks.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    specs: Vec<CallbackSpec>,
    /// Property -> callbacks that list it as an input, in registration order.
    subscribers: HashMap<PropKey, Vec<CallbackId>>,
    /// Property -> callback that writes it.
    writers: HashMap<PropKey, CallbackId>,
    /// Property -> properties it feeds.
    edges: HashMap<PropKey, Vec<PropKey>>,
    components: HashSet<ComponentId>,
}

impl DependencyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `component` addressable by callbacks.
    pub fn declare_component(&mut self, component: ComponentId) {
        self.components.insert(component);
    }

    /// Declare a selection control: its `options` feed its `value`.
    pub fn declare_control(&mut self, component: ComponentId) {
        let options = PropKey::new(component.clone(), "options");
        let value = PropKey::new(component.clone(), "value");
        self.components.insert(component);
        self.edges.entry(options).or_default().push(value);
    }

    #[must_use]
    pub fn has_component(&self, component: &ComponentId) -> bool {
        self.components.contains(component)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    #[must_use]
    pub fn spec(&self, id: CallbackId) -> &CallbackSpec {
        &self.specs[id.0]
    }

    pub fn specs(&self) -> impl Iterator<Item = (CallbackId, &CallbackSpec)> {
        self.specs
            .iter()
            .enumerate()
            .map(|(index, spec)| (CallbackId(index), spec))
    }

    /// Callbacks triggered by `key`, in registration order.
    #[must_use]
    pub fn subscribers(&self, key: &PropKey) -> &[CallbackId] {
        self.subscribers.get(key).map_or(&[], Vec::as_slice)
    }

    /// Callback that writes `key`, if any.
    #[must_use]
    pub fn writer(&self, key: &PropKey) -> Option<CallbackId> {
        self.writers.get(key).copied()
    }

    /// Validate and add a callback. On error the graph is unchanged.
    pub fn register(&mut self, spec: CallbackSpec) -> Result<CallbackId, GraphError> {
        if spec.outputs.is_empty() {
            return Err(GraphError::EmptyOutputs {
                callback: spec.name,
            });
        }
        for key in spec.inputs.iter().chain(&spec.states).chain(&spec.outputs) {
            if !self.components.contains(&key.component) {
                return Err(GraphError::UnknownComponent {
                    callback: spec.name.clone(),
                    component: key.component.clone(),
                });
            }
        }
        let mut claimed = HashSet::new();
        for output in &spec.outputs {
            if let Some(owner) = self.writers.get(output) {
                return Err(GraphError::DuplicateOutput {
                    callback: spec.name.clone(),
                    output: output.clone(),
                    owner: self.specs[owner.0].name.clone(),
                });
            }
            if !claimed.insert(output) {
                return Err(GraphError::DuplicateOutput {
                    callback: spec.name.clone(),
                    output: output.clone(),
                    owner: spec.name.clone(),
                });
            }
        }
        // The graph was acyclic before; any new cycle must pass through one
        // of the new input -> output edges, i.e. some output reaches some
        // input once those edges exist.
        for input in &spec.inputs {
            for output in &spec.outputs {
                if input == output || self.reaches_with(output, input, &spec) {
                    return Err(GraphError::CycleDetectedAtRegistration {
                        callback: spec.name.clone(),
                        input: input.clone(),
                        output: output.clone(),
                    });
                }
            }
        }

        let id = CallbackId(self.specs.len());
        for input in &spec.inputs {
            let subs = self.subscribers.entry(input.clone()).or_default();
            if !subs.contains(&id) {
                subs.push(id);
            }
            let feeds = self.edges.entry(input.clone()).or_default();
            for output in &spec.outputs {
                if !feeds.contains(output) {
                    feeds.push(output.clone());
                }
            }
        }
        for output in &spec.outputs {
            self.writers.insert(output.clone(), id);
        }
        tracing::trace!(
            callback = %spec.name,
            id = %id,
            inputs = spec.inputs.len(),
            outputs = spec.outputs.len(),
            "callback registered"
        );
        self.specs.push(spec);
        Ok(id)
    }

    /// DFS over existing edges plus the pending callback's edges.
    fn reaches_with(&self, from: &PropKey, to: &PropKey, pending: &CallbackSpec) -> bool {
        let mut visited: HashSet<&PropKey> = HashSet::new();
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(next) = self.edges.get(current) {
                stack.extend(next.iter().filter(|n| !visited.contains(n)));
            }
            if pending.inputs.contains(current) {
                stack.extend(pending.outputs.iter());
            }
        }
        false
    }

    /// Properties reachable from `from` (excluding `from` itself).
    fn downstream(&self, from: &PropKey) -> HashSet<&PropKey> {
        let mut seen: HashSet<&PropKey> = HashSet::new();
        let mut stack: Vec<&PropKey> = self
            .edges
            .get(from)
            .map(|next| next.iter().collect())
            .unwrap_or_default();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            if let Some(next) = self.edges.get(current) {
                stack.extend(next.iter());
            }
        }
        seen
    }

    /// Topological order of all callbacks, registration order breaking ties.
    ///
    /// Callback `a` precedes `b` when an output of `a` reaches an input or
    /// state of `b`. Used to seed the initial settle cycle so each callback
    /// first runs after everything upstream of it.
    #[must_use]
    pub fn initial_order(&self) -> Vec<CallbackId> {
        let n = self.specs.len();
        let mut in_degree = vec![0usize; n];
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];

        for (a, spec) in self.specs.iter().enumerate() {
            let mut reach: HashSet<&PropKey> = HashSet::new();
            for output in &spec.outputs {
                reach.insert(output);
                reach.extend(self.downstream(output));
            }
            for (b, other) in self.specs.iter().enumerate() {
                if a == b {
                    continue;
                }
                if other.inputs.iter().chain(&other.states).any(|k| reach.contains(k)) {
                    adjacency[a].push(b);
                    in_degree[b] += 1;
                }
            }
        }

        // Kahn's algorithm; the ready set is ordered so ties resolve to the
        // earliest registration.
        let mut ready: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(next) = ready.pop_first() {
            order.push(CallbackId(next));
            for &b in &adjacency[next] {
                in_degree[b] -= 1;
                if in_degree[b] == 0 {
                    ready.insert(b);
                }
            }
        }
        // States do not take part in cycle checks, so a state read can point
        // "backwards"; anything left over keeps registration order.
        if order.len() < n {
            let placed: HashSet<usize> = order.iter().map(|id| id.0).collect();
            order.extend((0..n).filter(|i| !placed.contains(i)).map(CallbackId));
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::ExecutionSite;

    fn spec(name: &str, inputs: &[(&str, &str)], outputs: &[(&str, &str)]) -> CallbackSpec {
        CallbackSpec {
            name: name.into(),
            inputs: inputs.iter().map(|(c, p)| PropKey::new(*c, *p)).collect(),
            states: Vec::new(),
            outputs: outputs.iter().map(|(c, p)| PropKey::new(*c, *p)).collect(),
            site: ExecutionSite::Server,
            prevent_initial_call: false,
        }
    }

    fn graph(components: &[&str], controls: &[&str]) -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for c in components {
            g.declare_component(ComponentId::from(*c));
        }
        for c in controls {
            g.declare_control(ComponentId::from(*c));
        }
        g
    }

    #[test]
    fn subscribers_in_registration_order() {
        let mut g = graph(&["a", "x", "y"], &[]);
        let first = g.register(spec("one", &[("a", "v")], &[("x", "v")])).expect("one");
        let second = g.register(spec("two", &[("a", "v")], &[("y", "v")])).expect("two");
        assert_eq!(g.subscribers(&PropKey::new("a", "v")), &[first, second]);
        assert_eq!(g.writer(&PropKey::new("y", "v")), Some(second));
    }

    #[test]
    fn direct_self_cycle_rejected() {
        let mut g = graph(&["a"], &[]);
        let err = g
            .register(spec("loop", &[("a", "v")], &[("a", "v")]))
            .expect_err("cycle");
        assert!(matches!(err, GraphError::CycleDetectedAtRegistration { .. }));
        assert!(g.is_empty());
    }

    #[test]
    fn indirect_cycle_through_control_rejected() {
        // d.value -> x.children is fine; x.children -> d.options closes the
        // loop through the implicit options -> value edge.
        let mut g = graph(&["x"], &["d"]);
        g.register(spec("show", &[("d", "value")], &[("x", "children")]))
            .expect("show");
        let err = g
            .register(spec("feed", &[("x", "children")], &[("d", "options")]))
            .expect_err("cycle");
        assert!(matches!(err, GraphError::CycleDetectedAtRegistration { .. }));
        assert_eq!(g.len(), 1);
        assert!(g.subscribers(&PropKey::new("x", "children")).is_empty());
    }

    #[test]
    fn cycle_formed_by_two_edges_of_one_callback_rejected() {
        let mut g = graph(&["a", "b", "c", "d"], &[]);
        g.register(spec("ab", &[("b", "v")], &[("c", "v")])).expect("ab");
        g.register(spec("cd", &[("d", "v")], &[("a", "v")])).expect("cd");
        // a -> b and c -> d inside one callback: a->b->c->d->a.
        let err = g
            .register(spec("both", &[("a", "v"), ("c", "v")], &[("b", "v"), ("d", "v")]))
            .expect_err("cycle");
        assert!(matches!(err, GraphError::CycleDetectedAtRegistration { .. }));
    }

    #[test]
    fn duplicate_output_rejected() {
        let mut g = graph(&["a", "b", "x"], &[]);
        g.register(spec("one", &[("a", "v")], &[("x", "v")])).expect("one");
        let err = g
            .register(spec("two", &[("b", "v")], &[("x", "v")]))
            .expect_err("dup");
        assert!(matches!(err, GraphError::DuplicateOutput { owner, .. } if owner == "one"));
    }

    #[test]
    fn unknown_component_and_empty_outputs_rejected() {
        let mut g = graph(&["a"], &[]);
        assert!(matches!(
            g.register(spec("ghost", &[("a", "v")], &[("nowhere", "v")])),
            Err(GraphError::UnknownComponent { .. })
        ));
        assert!(matches!(
            g.register(spec("empty", &[("a", "v")], &[])),
            Err(GraphError::EmptyOutputs { .. })
        ));
    }

    #[test]
    fn initial_order_is_topological() {
        let mut g = graph(&["count", "out", "count-out"], &["drop"]);
        // Registered consumer-first on purpose.
        let client = g
            .register(spec("client", &[("count", "data")], &[("count-out", "children")]))
            .expect("client");
        let server = g
            .register(spec(
                "server",
                &[("drop", "value")],
                &[("out", "children"), ("count", "data")],
            ))
            .expect("server");
        assert_eq!(g.initial_order(), vec![server, client]);
    }

    #[test]
    fn initial_order_follows_control_reconciliation() {
        // a.value -> b.options, and b.options implicitly feeds b.value.
        let mut g = graph(&["btn", "out"], &["a", "b"]);
        let print = g
            .register(spec("print", &[("b", "value")], &[("out", "children")]))
            .expect("print");
        let feed = g
            .register(spec("feed", &[("a", "value")], &[("b", "options")]))
            .expect("feed");
        let trim = g
            .register(spec("trim", &[("btn", "n_clicks")], &[("a", "options")]))
            .expect("trim");
        assert_eq!(g.initial_order(), vec![trim, feed, print]);
    }
}
