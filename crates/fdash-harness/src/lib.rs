#![forbid(unsafe_code)]

//! Scenario harness for FrankenDash apps.
//!
//! [`Harness`] drives a [`Propagator`] the way a browser session would:
//! clicking buttons, typing into a dropdown's search box and pressing Enter,
//! and reading rendered text back out. Every interaction is a single external
//! property write, so each call returns the [`SettleReport`] of exactly one
//! settle cycle.
//!
//! Settling is synchronous, so [`Harness::wait_for_text_to_equal`] checks the
//! settled text immediately instead of polling.

pub mod fixtures;

use std::io;

use fdash_core::SelectionError;
use fdash_runtime::{GraphError, LayoutError, Propagator, SettleError, SettleReport};
use serde::Serialize;
use serde_json::Value;
use serde_json::ser::Formatter;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Settle(#[from] SettleError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("{0} is not a dropdown")]
    NotADropdown(String),

    #[error("no option of {dropdown} matches {query:?}")]
    NoMatch { dropdown: String, query: String },

    #[error("text of #{id}: expected {expected:?}, found {actual:?}")]
    TextMismatch {
        id: String,
        expected: String,
        actual: String,
    },
}

/// A running app.
#[derive(Debug)]
pub struct Harness {
    propagator: Propagator,
    cycles: usize,
}

impl Harness {
    #[must_use]
    pub fn new(propagator: Propagator) -> Self {
        Self {
            propagator,
            cycles: 0,
        }
    }

    #[must_use]
    pub fn propagator(&self) -> &Propagator {
        &self.propagator
    }

    /// Settle cycles run so far, including the initial call.
    #[must_use]
    pub fn cycles(&self) -> usize {
        self.cycles
    }

    fn settled(&mut self, report: SettleReport) -> SettleReport {
        self.cycles += 1;
        debug!(
            trigger = %report.trigger,
            computations_run = report.computations_run(),
            properties_changed = report.properties_changed(),
            "settled"
        );
        report
    }

    /// Serve the app: run the initial call.
    pub fn start(&mut self) -> Result<SettleReport, HarnessError> {
        let report = self.propagator.start()?;
        Ok(self.settled(report))
    }

    /// Click a button: `n_clicks` goes from `null` to 1, then counts up.
    pub fn click(&mut self, id: &str) -> Result<SettleReport, HarnessError> {
        let clicks = self
            .propagator
            .get_property(id, "n_clicks")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let report = self
            .propagator
            .set_property(id, "n_clicks", Value::from(clicks + 1))?;
        Ok(self.settled(report))
    }

    /// Type `query` into a dropdown's search box and press Enter, choosing
    /// the first enabled match.
    pub fn type_and_enter(&mut self, dropdown: &str, query: &str) -> Result<SettleReport, HarnessError> {
        let control = self
            .propagator
            .control(dropdown)
            .ok_or_else(|| HarnessError::NotADropdown(dropdown.to_owned()))?;
        let option = control
            .search_first(query)?
            .ok_or_else(|| HarnessError::NoMatch {
                dropdown: dropdown.to_owned(),
                query: query.to_owned(),
            })?;
        let next = control.choose(&option.value)?;
        let report = self
            .propagator
            .set_property(dropdown, "value", next.to_json())?;
        Ok(self.settled(report))
    }

    /// Rendered text of a component's `children`.
    #[must_use]
    pub fn text(&self, id: &str) -> String {
        self.propagator
            .get_property(id, "children")
            .map(render_text)
            .unwrap_or_default()
    }

    pub fn wait_for_text_to_equal(&self, id: &str, expected: &str) -> Result<(), HarnessError> {
        let actual = self.text(id);
        if actual == expected {
            return Ok(());
        }
        Err(HarnessError::TextMismatch {
            id: id.to_owned(),
            expected: expected.to_owned(),
            actual,
        })
    }
}

/// Text a `children` value renders as: `null` and booleans render nothing,
/// lists render each child in turn.
#[must_use]
pub fn render_text(children: &Value) -> String {
    match children {
        Value::Null | Value::Bool(_) => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items.iter().map(render_text).collect(),
        Value::Object(_) => children.to_string(),
    }
}

/// Compact JSON with `", "` and `": "` separators and non-ASCII text escaped
/// as `\uXXXX`.
struct DisplayFormatter;

impl Formatter for DisplayFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if fragment.is_ascii() {
            return writer.write_all(fragment.as_bytes());
        }
        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
                continue;
            }
            for unit in ch.encode_utf16(&mut units) {
                write!(writer, "\\u{unit:04x}")?;
            }
        }
        Ok(())
    }
}

/// JSON text the way dashboard apps usually serialize values for display:
/// `", "` and `": "` separators, non-ASCII characters escaped.
#[must_use]
pub fn dumps(value: &Value) -> String {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, DisplayFormatter);
    if value.serialize(&mut serializer).is_err() {
        return value.to_string();
    }
    String::from_utf8(out).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn render_text_flattens_children() {
        assert_eq!(render_text(&Value::Null), "");
        assert_eq!(render_text(&json!(1)), "1");
        assert_eq!(render_text(&json!(["Value=", "a"])), "Value=a");
        assert_eq!(render_text(&json!(true)), "");
    }

    #[test]
    fn dumps_uses_spaced_separators() {
        assert_eq!(dumps(&json!(["MTL", "NYC"])), r#"["MTL", "NYC"]"#);
        assert_eq!(dumps(&json!({"a": [1, "x"]})), r#"{"a": [1, "x"]}"#);
        assert_eq!(dumps(&json!([])), "[]");
        assert_eq!(dumps(&json!("q\"uote")), r#""q\"uote""#);
        assert_eq!(dumps(&json!({})), "{}");
    }

    #[test]
    fn dumps_escapes_non_ascii() {
        assert_eq!(dumps(&json!("é")), r#""\u00e9""#);
        assert_eq!(dumps(&json!(["Montréal", "NYC"])), r#"["Montr\u00e9al", "NYC"]"#);
        assert_eq!(dumps(&json!("😀")), r#""\ud83d\ude00""#);
    }
}
