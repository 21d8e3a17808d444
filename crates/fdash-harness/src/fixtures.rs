#![forbid(unsafe_code)]

//! Reference dropdown apps and the scenarios that exercise them.
//!
//! Each builder returns an unstarted [`Harness`]; each scenario starts it,
//! performs the user steps and checks the rendered text.

use fdash_runtime::{Callback, Dropdown, Layout, Outcome, RuntimeConfig, Update};
use serde::Serialize;
use serde_json::{Value, json};

use crate::{Harness, HarnessError, dumps};

/// Options shared by the reference apps.
#[must_use]
pub fn sample_options() -> Value {
    json!([
        {"label": "New York City", "value": "NYC"},
        {"label": "Montreal", "value": "MTL"},
        {"label": "San Francisco", "value": "SF"},
    ])
}

/// Every option except the last.
fn trimmed_options() -> Value {
    match sample_options() {
        Value::Array(mut items) => {
            items.pop();
            Value::Array(items)
        }
        other => other,
    }
}

fn remove_last_option(dropdown: &str, button: &str) -> Callback {
    Callback::new("on_click", |ctx| {
        if ctx.input(0).is_null() {
            return Ok(Outcome::Suppress);
        }
        Ok(Outcome::replace(trimmed_options()))
    })
    .output(dropdown, "options")
    .input(button, "n_clicks")
}

/// Single-select dropdown holding `SF`; a button removes the last option.
pub fn remove_option_single(searchable: bool, config: RuntimeConfig) -> Result<Harness, HarnessError> {
    let mut p = Layout::new()
        .dropdown(
            Dropdown::new("dropdown")
                .options(sample_options())
                .value("SF")
                .searchable(searchable),
        )
        .button("remove", "Remove option")
        .div("value-output")
        .into_propagator(config)?;
    p.register(remove_last_option("dropdown", "remove"))?;
    p.register(
        Callback::new("on_change", |ctx| {
            let value = ctx.input(0);
            let shown = match value {
                Value::Null => Value::from("Nothing Here"),
                Value::String(s) if s.is_empty() => Value::from("Nothing Here"),
                other => other.clone(),
            };
            Ok(Outcome::replace(shown))
        })
        .output("value-output", "children")
        .input("dropdown", "value"),
    )?;
    Ok(Harness::new(p))
}

/// Multi-select dropdown holding `[MTL, SF]`; a button removes the last
/// option.
pub fn remove_option_multi(searchable: bool, config: RuntimeConfig) -> Result<Harness, HarnessError> {
    let mut p = Layout::new()
        .dropdown(
            Dropdown::new("dropdown")
                .options(sample_options())
                .value(json!(["MTL", "SF"]))
                .multi(true)
                .searchable(searchable),
        )
        .button("remove", "Remove option")
        .div("value-output")
        .into_propagator(config)?;
    p.register(remove_last_option("dropdown", "remove"))?;
    p.register(
        Callback::new("on_change", |ctx| Ok(Outcome::replace(dumps(ctx.input(0)))))
            .output("value-output", "children")
            .input("dropdown", "value"),
    )?;
    Ok(Harness::new(p))
}

/// Two multi-select dropdowns: the first one's value is the second one's
/// options. Submit prints the second dropdown's value and option values.
pub fn remove_option_multiple_dropdowns(config: RuntimeConfig) -> Result<Harness, HarnessError> {
    let mut p = Layout::new()
        .dropdown(
            Dropdown::new("available-options")
                .options(sample_options())
                .value(json!(["MTL", "NYC", "SF"]))
                .multi(true),
        )
        .dropdown(
            Dropdown::new("chosen")
                .options(sample_options())
                .value(json!(["NYC", "SF"]))
                .multi(true),
        )
        .button("remove-btn", "Remove")
        .button("submit-btn", "Submit")
        .div("value-output")
        .div("options-output")
        .into_propagator(config)?;
    p.register(
        Callback::new("update_options", |ctx| {
            let options = match ctx.input(0) {
                Value::Array(values) => values
                    .iter()
                    .map(|v| json!({"label": v, "value": v}))
                    .collect(),
                _ => Vec::new(),
            };
            Ok(Outcome::replace(Value::Array(options)))
        })
        .output("chosen", "options")
        .input("available-options", "value"),
    )?;
    p.register(remove_last_option("available-options", "remove-btn"))?;
    p.register(
        Callback::new("print_value", |ctx| {
            if ctx.input(0).is_null() {
                return Ok(Outcome::Suppress);
            }
            let option_values: Vec<Value> = ctx
                .state(0)
                .as_array()
                .map(|options| options.iter().map(|o| o["value"].clone()).collect())
                .unwrap_or_default();
            Ok(Outcome::outputs([
                Update::Replace(dumps(ctx.state(1)).into()),
                Update::Replace(dumps(&Value::Array(option_values)).into()),
            ]))
        })
        .output("value-output", "children")
        .output("options-output", "children")
        .input("submit-btn", "n_clicks")
        .state("chosen", "options")
        .state("chosen", "value"),
    )?;
    Ok(Harness::new(p))
}

/// Dropdown whose value starts as the empty string, a server callback that
/// echoes it and bumps a stored counter with a patch, and a client callback
/// that renders the counter.
pub fn empty_string_not_updated(config: RuntimeConfig) -> Result<Harness, HarnessError> {
    let mut p = Layout::new()
        .dropdown(Dropdown::new("drop").options(json!(["a", "b", "c"])).value(""))
        .div("output")
        .store("count", json!({"count": 0}))
        .div("count-output")
        .into_propagator(config)?;
    p.register(
        Callback::new("on_value", |ctx| {
            let count = fdash_core::Patch::new().increment(fdash_core::path!["count"], 1);
            let text = match ctx.input(0) {
                Value::Null => "Value is none".to_owned(),
                Value::String(s) => format!("Value={s}"),
                other => format!("Value={other}"),
            };
            Ok(Outcome::outputs([Update::Replace(text.into()), Update::Patch(count)]))
        })
        .output("output", "children")
        .output("count", "data")
        .input("drop", "value"),
    )?;
    p.register(
        Callback::new("count_output", |ctx| Ok(Outcome::replace(ctx.input(0)["count"].clone())))
            .output("count-output", "children")
            .input("count", "data")
            .clientside(),
    )?;
    Ok(Harness::new(p))
}

/// Summary of one scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioOutcome {
    pub name: &'static str,
    pub cycles: usize,
    pub computations_run: usize,
}

/// A named, self-checking user session against one reference app.
#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    pub name: &'static str,
    pub run: fn(RuntimeConfig) -> Result<(usize, usize), HarnessError>,
}

impl Scenario {
    pub fn execute(&self, config: RuntimeConfig) -> Result<ScenarioOutcome, HarnessError> {
        let (cycles, computations_run) = (self.run)(config)?;
        Ok(ScenarioOutcome {
            name: self.name,
            cycles,
            computations_run,
        })
    }
}

fn single_session(searchable: bool, config: RuntimeConfig) -> Result<(usize, usize), HarnessError> {
    let mut app = remove_option_single(searchable, config)?;
    let mut runs = app.start()?.computations_run();
    runs += app.click("remove")?.computations_run();
    app.wait_for_text_to_equal("value-output", "Nothing Here")?;
    Ok((app.cycles(), runs))
}

fn multi_session(searchable: bool, config: RuntimeConfig) -> Result<(usize, usize), HarnessError> {
    let mut app = remove_option_multi(searchable, config)?;
    let mut runs = app.start()?.computations_run();
    runs += app.click("remove")?.computations_run();
    app.wait_for_text_to_equal("value-output", r#"["MTL"]"#)?;
    Ok((app.cycles(), runs))
}

fn multiple_dropdowns_session(config: RuntimeConfig) -> Result<(usize, usize), HarnessError> {
    let mut app = remove_option_multiple_dropdowns(config)?;
    let mut runs = app.start()?.computations_run();
    runs += app.click("remove-btn")?.computations_run();
    runs += app.click("submit-btn")?.computations_run();
    app.wait_for_text_to_equal("value-output", r#"["NYC"]"#)?;
    app.wait_for_text_to_equal("options-output", r#"["MTL", "NYC"]"#)?;
    Ok((app.cycles(), runs))
}

fn empty_string_session(config: RuntimeConfig) -> Result<(usize, usize), HarnessError> {
    let mut app = empty_string_not_updated(config)?;
    let mut runs = app.start()?.computations_run();
    app.wait_for_text_to_equal("output", "Value=")?;
    app.wait_for_text_to_equal("count-output", "1")?;
    runs += app.type_and_enter("drop", "a")?.computations_run();
    app.wait_for_text_to_equal("output", "Value=a")?;
    app.wait_for_text_to_equal("count-output", "2")?;
    Ok((app.cycles(), runs))
}

/// Every reference scenario.
#[must_use]
pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "remove_option_single[searchable]",
            run: |config| single_session(true, config),
        },
        Scenario {
            name: "remove_option_single[plain]",
            run: |config| single_session(false, config),
        },
        Scenario {
            name: "remove_option_multi[searchable]",
            run: |config| multi_session(true, config),
        },
        Scenario {
            name: "remove_option_multi[plain]",
            run: |config| multi_session(false, config),
        },
        Scenario {
            name: "remove_option_multiple_dropdowns",
            run: multiple_dropdowns_session,
        },
        Scenario {
            name: "empty_string_not_updated",
            run: empty_string_session,
        },
    ]
}
