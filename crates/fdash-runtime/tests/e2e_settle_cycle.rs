//! E2E settle-cycle tests for chained dropdowns and patched stores.
//!
//! # Test Scenarios
//!
//! 1. Chained dropdowns: trimming A's catalog reconciles A, re-derives B's
//!    options, and reconciles B.
//! 2. State reads observe the settled values of the previous cycle.
//! 3. Empty-string value survives the initial call.
//! 4. Patched counter increments once per cycle and reaches the client
//!    callback.
//! 5. Coalescing off: a re-triggered computation runs once per trigger.
//! 6. Initial call disabled by configuration.

#![forbid(unsafe_code)]

use fdash_core::{Patch, path};
use fdash_runtime::{
    Callback, ChangeKind, Dropdown, ExecutionSite, Layout, Outcome, PropKey, Propagator, RunOutcome,
    RuntimeConfig, TriggerEvent, Update,
};
use serde_json::{Value, json};

fn cities() -> Value {
    json!([
        {"label": "New York City", "value": "NYC"},
        {"label": "Montreal", "value": "MTL"},
        {"label": "San Francisco", "value": "SF"},
    ])
}

fn first_two_cities() -> Value {
    json!([
        {"label": "New York City", "value": "NYC"},
        {"label": "Montreal", "value": "MTL"},
    ])
}

fn chained(config: RuntimeConfig) -> Propagator {
    let mut p = Layout::new()
        .dropdown(
            Dropdown::new("available-options")
                .options(cities())
                .value(json!(["MTL", "NYC", "SF"]))
                .multi(true),
        )
        .dropdown(
            Dropdown::new("chosen")
                .options(cities())
                .value(json!(["NYC", "SF"]))
                .multi(true),
        )
        .button("remove-btn", "Remove")
        .button("submit-btn", "Submit")
        .div("value-output")
        .div("options-output")
        .into_propagator(config)
        .expect("layout");

    p.register(
        Callback::new("update_options", |ctx| {
            let Some(available) = ctx.input(0).as_array() else {
                return Ok(Outcome::replace(json!([])));
            };
            Ok(Outcome::replace(Value::Array(
                available
                    .iter()
                    .map(|v| json!({"label": v, "value": v}))
                    .collect(),
            )))
        })
        .output("chosen", "options")
        .input("available-options", "value"),
    )
    .expect("update_options");
    p.register(
        Callback::new("on_click", |ctx| {
            if ctx.input(0).is_null() {
                return Ok(Outcome::Suppress);
            }
            Ok(Outcome::replace(first_two_cities()))
        })
        .output("available-options", "options")
        .input("remove-btn", "n_clicks"),
    )
    .expect("on_click");
    p.register(
        Callback::new("print_value", |ctx| {
            if ctx.input(0).is_null() {
                return Ok(Outcome::Suppress);
            }
            let options: Vec<Value> = ctx
                .state(0)
                .as_array()
                .map(|opts| opts.iter().map(|o| o["value"].clone()).collect())
                .unwrap_or_default();
            Ok(Outcome::outputs([
                Update::Replace(ctx.state(1).to_string().into()),
                Update::Replace(Value::Array(options).to_string().into()),
            ]))
        })
        .output("value-output", "children")
        .output("options-output", "children")
        .input("submit-btn", "n_clicks")
        .state("chosen", "options")
        .state("chosen", "value"),
    )
    .expect("print_value");
    p
}

#[test]
fn chained_dropdowns_reconcile_downstream() {
    let mut p = chained(RuntimeConfig::default());

    let initial = p.start().expect("start");
    assert_eq!(initial.trigger, TriggerEvent::Initial);
    assert_eq!(
        initial.run_names().collect::<Vec<_>>(),
        vec!["on_click", "update_options", "print_value"]
    );
    // chosen's catalog now follows available-options' value order.
    assert_eq!(
        p.control("chosen")
            .map(|c| c.catalog().values().map(ToString::to_string).collect::<Vec<_>>()),
        Some(vec!["MTL".to_string(), "NYC".to_string(), "SF".to_string()])
    );

    let removed = p.set_property("remove-btn", "n_clicks", json!(1)).expect("remove");
    assert_eq!(
        removed.run_names().collect::<Vec<_>>(),
        vec!["on_click", "update_options"]
    );
    assert_eq!(
        removed.change_kind("available-options", "value"),
        Some(ChangeKind::Reconciled)
    );
    assert_eq!(removed.change_kind("chosen", "value"), Some(ChangeKind::Reconciled));
    assert_eq!(p.get_property("chosen", "value"), Some(&json!(["NYC"])));

    p.set_property("submit-btn", "n_clicks", json!(1)).expect("submit");
    assert_eq!(p.get_property("value-output", "children"), Some(&json!("[\"NYC\"]")));
    assert_eq!(
        p.get_property("options-output", "children"),
        Some(&json!("[\"MTL\",\"NYC\"]"))
    );
}

fn empty_string_app() -> Propagator {
    let mut p = Layout::new()
        .dropdown(Dropdown::new("drop").options(json!(["a", "b", "c"])).value(""))
        .div("output")
        .store("count", json!({"count": 0}))
        .div("count-output")
        .into_propagator(RuntimeConfig::default())
        .expect("layout");
    p.register(
        Callback::new("on_value", |ctx| {
            let count = Patch::new().increment(path!["count"], 1);
            let text = match ctx.input(0) {
                Value::Null => "Value is none".to_string(),
                Value::String(s) => format!("Value={s}"),
                other => format!("Value={other}"),
            };
            Ok(Outcome::outputs([Update::Replace(text.into()), Update::Patch(count)]))
        })
        .output("output", "children")
        .output("count", "data")
        .input("drop", "value"),
    )
    .expect("on_value");
    p.register(
        Callback::new("count_output", |ctx| Ok(Outcome::replace(ctx.input(0)["count"].clone())))
            .output("count-output", "children")
            .input("count", "data")
            .clientside(),
    )
    .expect("count_output");
    p
}

#[test]
fn empty_string_survives_and_patch_counts() {
    let mut p = empty_string_app();
    let initial = p.start().expect("start");
    assert_eq!(p.get_property("output", "children"), Some(&json!("Value=")));
    assert_eq!(p.get_property("drop", "value"), Some(&json!("")));
    assert_eq!(p.get_property("count-output", "children"), Some(&json!(1)));
    assert_eq!(initial.change_kind("count", "data"), Some(ChangeKind::Patched));
    let client = initial
        .runs
        .iter()
        .filter(|run| run.callback == "count_output")
        .collect::<Vec<_>>();
    assert_eq!(client.len(), 1);
    assert_eq!(client[0].site, ExecutionSite::Client);

    p.set_property("drop", "value", json!("a")).expect("choose");
    assert_eq!(p.get_property("output", "children"), Some(&json!("Value=a")));
    assert_eq!(p.get_property("count-output", "children"), Some(&json!(2)));
}

#[test]
fn coalescing_off_runs_once_per_trigger() {
    let config = RuntimeConfig {
        coalesce_pending: false,
        ..RuntimeConfig::default()
    };
    let mut p = Layout::new()
        .store("a", json!(0))
        .store("b", json!(0))
        .div("out")
        .into_propagator(config)
        .expect("layout");
    p.register(
        Callback::new("copy", |ctx| Ok(Outcome::replace(ctx.input(0).clone())))
            .output("b", "data")
            .input("a", "data")
            .prevent_initial_call(),
    )
    .expect("copy");
    p.register(
        Callback::new("pair", |ctx| {
            Ok(Outcome::replace(json!([ctx.input(0), ctx.input(1)])))
        })
        .output("out", "children")
        .input("a", "data")
        .input("b", "data")
        .prevent_initial_call(),
    )
    .expect("pair");
    p.start().expect("start");

    let report = p.set_property("a", "data", json!(4)).expect("set");
    assert_eq!(report.run_names().collect::<Vec<_>>(), vec!["copy", "pair", "pair"]);
    assert_eq!(report.runs[1].triggered, vec![PropKey::new("a", "data")]);
    assert_eq!(report.runs[2].triggered, vec![PropKey::new("b", "data")]);
    assert_eq!(p.get_property("out", "children"), Some(&json!([4, 4])));
}

#[test]
fn initial_call_can_be_disabled() {
    let config = RuntimeConfig {
        initial_call: false,
        ..RuntimeConfig::default()
    };
    let mut p = empty_string_app();
    let report = p.start().expect("start");
    assert_eq!(report.computations_run(), 2);

    let mut quiet = Layout::new()
        .store("s", json!(1))
        .div("out")
        .into_propagator(config)
        .expect("layout");
    quiet
        .register(
            Callback::new("echo", |ctx| Ok(Outcome::replace(ctx.input(0).clone())))
                .output("out", "children")
                .input("s", "data"),
        )
        .expect("echo");
    let report = quiet.start().expect("start");
    assert_eq!(report.computations_run(), 0);
    assert_eq!(quiet.get_property("out", "children"), Some(&Value::Null));
}

#[test]
fn suppressed_runs_are_reported() {
    let mut p = chained(RuntimeConfig::default());
    let initial = p.start().expect("start");
    let outcomes: Vec<_> = initial.runs.iter().map(|run| run.outcome).collect();
    assert_eq!(
        outcomes,
        vec![RunOutcome::Suppressed, RunOutcome::Applied, RunOutcome::Suppressed]
    );
    assert_eq!(p.get_property("value-output", "children"), Some(&Value::Null));
}
