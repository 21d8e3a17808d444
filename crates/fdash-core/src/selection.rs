#![forbid(unsafe_code)]

//! Selection values and reconciliation against a replacement catalog.
//!
//! # Design
//!
//! A control's value has one of two shapes fixed at creation:
//!
//! - single-select: `Single(Option<Scalar>)`, where `None` is "no selection"
//!   and serializes as JSON `null`;
//! - multi-select: `Multi(Vec<Scalar>)`, always a sequence, possibly empty.
//!
//! When a control's catalog is replaced, [`reconcile`] computes the value
//! that stays valid against the new catalog. The caller compares the result
//! with the previous value and only notifies observers when they differ.
//!
//! # Invariants
//!
//! 1. The output shape always equals the input shape.
//! 2. Single-select output is either a value present in the catalog, the
//!    empty string it started as, or "no selection".
//! 3. Multi-select output is the input filtered to catalog membership, in the
//!    input's order.
//! 4. `reconcile_value(reconcile_value(v, c), c) == reconcile_value(v, c)`.
//!
//! # Empty string
//!
//! An explicit `""` is a value, not an absence. A single-select control
//! holding `""` keeps it across every reconciliation pass, even when no
//! option carries the empty string; it is never rewritten to `null`.

use std::collections::HashSet;

use serde_json::Value;
use thiserror::Error;

use crate::catalog::OptionCatalog;
use crate::control::Control;
use crate::scalar::Scalar;

/// Errors raised by shape checks and user-driven selection changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("{control} value has the wrong shape: expected {expected}, found {found}")]
    ShapeMismatch {
        control: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{control} has no option with value {value}")]
    UnknownOption { control: String, value: Scalar },

    #[error("{control} option {value} is disabled")]
    DisabledOption { control: String, value: Scalar },

    #[error("{control} is not searchable")]
    NotSearchable { control: String },

    #[error("{control} is not clearable")]
    NotClearable { control: String },
}

/// The current selection of a control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionValue {
    Single(Option<Scalar>),
    Multi(Vec<Scalar>),
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl SelectionValue {
    /// The "no selection" value for the given shape.
    #[must_use]
    pub fn none(multi: bool) -> Self {
        if multi {
            Self::Multi(Vec::new())
        } else {
            Self::Single(None)
        }
    }

    #[must_use]
    pub fn is_multi(&self) -> bool {
        matches!(self, Self::Multi(_))
    }

    /// True for `Single(None)` and `Multi([])`. The empty string is a value.
    #[must_use]
    pub fn is_none(&self) -> bool {
        match self {
            Self::Single(value) => value.is_none(),
            Self::Multi(values) => values.is_empty(),
        }
    }

    #[must_use]
    pub fn contains(&self, value: &Scalar) -> bool {
        match self {
            Self::Single(current) => current.as_ref() == Some(value),
            Self::Multi(values) => values.contains(value),
        }
    }

    /// Shape-checked conversion from a JSON `value` property.
    ///
    /// `null` is accepted for both shapes (it becomes `Multi([])` for
    /// multi-select controls).
    pub fn from_json(raw: &Value, multi: bool, control: &str) -> Result<Self, SelectionError> {
        let mismatch = |expected: &'static str, found: &Value| SelectionError::ShapeMismatch {
            control: control.to_owned(),
            expected,
            found: json_kind(found),
        };
        match (multi, raw) {
            (_, Value::Null) => Ok(Self::none(multi)),
            (true, Value::Array(items)) => items
                .iter()
                .map(|item| Scalar::from_json(item).ok_or_else(|| mismatch("array of scalars", item)))
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Multi),
            (true, other) => Err(mismatch("array of scalars", other)),
            (false, other) => Scalar::from_json(other)
                .map(|scalar| Self::Single(Some(scalar)))
                .ok_or_else(|| mismatch("scalar or null", other)),
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Single(None) => Value::Null,
            Self::Single(Some(value)) => value.to_json(),
            Self::Multi(values) => Value::Array(values.iter().map(Scalar::to_json).collect()),
        }
    }
}

/// Reconcile `value` against `catalog`.
#[must_use]
pub fn reconcile_value(value: &SelectionValue, catalog: &OptionCatalog) -> SelectionValue {
    let valid: HashSet<&Scalar> = catalog.values().collect();
    match value {
        SelectionValue::Single(None) => SelectionValue::Single(None),
        SelectionValue::Single(Some(current)) => {
            if current.is_empty_string() || valid.contains(current) {
                SelectionValue::Single(Some(current.clone()))
            } else {
                SelectionValue::Single(None)
            }
        }
        SelectionValue::Multi(values) => SelectionValue::Multi(
            values
                .iter()
                .filter(|v| valid.contains(v))
                .cloned()
                .collect(),
        ),
    }
}

/// Compute the value `control` should hold once `new_catalog` replaces its
/// current catalog. Does not mutate the control.
#[must_use]
pub fn reconcile(control: &Control, new_catalog: &OptionCatalog) -> SelectionValue {
    reconcile_value(control.value(), new_catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SelectOption;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn catalog(values: &[&str]) -> OptionCatalog {
        OptionCatalog::replace(values.iter().map(|v| SelectOption::bare(*v))).expect("catalog")
    }

    fn single(v: &str) -> SelectionValue {
        SelectionValue::Single(Some(Scalar::from(v)))
    }

    fn multi(values: &[&str]) -> SelectionValue {
        SelectionValue::Multi(values.iter().map(|v| Scalar::from(*v)).collect())
    }

    #[test]
    fn single_kept_when_still_offered() {
        let next = reconcile_value(&single("MTL"), &catalog(&["NYC", "MTL"]));
        assert_eq!(next, single("MTL"));
    }

    #[test]
    fn single_dropped_when_option_removed() {
        let next = reconcile_value(&single("SF"), &catalog(&["NYC", "MTL"]));
        assert_eq!(next, SelectionValue::Single(None));
    }

    #[test]
    fn empty_string_survives_reconciliation() {
        let next = reconcile_value(&single(""), &catalog(&["a", "b", "c"]));
        assert_eq!(next, single(""));
        let next = reconcile_value(&single(""), &OptionCatalog::empty());
        assert_eq!(next, single(""));
    }

    #[test]
    fn no_selection_is_idempotent() {
        let none = SelectionValue::Single(None);
        assert_eq!(reconcile_value(&none, &catalog(&["a"])), none);
        assert_eq!(reconcile_value(&none, &OptionCatalog::empty()), none);
    }

    #[test]
    fn multi_filters_in_original_order() {
        let next = reconcile_value(&multi(&["SF", "MTL", "NYC"]), &catalog(&["NYC", "MTL"]));
        assert_eq!(next, multi(&["MTL", "NYC"]));
    }

    #[test]
    fn multi_against_empty_catalog_is_empty() {
        let next = reconcile_value(&multi(&["a", "b"]), &OptionCatalog::empty());
        assert_eq!(next, SelectionValue::Multi(Vec::new()));
    }

    #[test]
    fn number_and_string_values_do_not_alias() {
        let cat = OptionCatalog::from_json(&json!(["1", "2"])).expect("catalog");
        let value = SelectionValue::Single(Some(Scalar::from(1_i64)));
        assert_eq!(reconcile_value(&value, &cat), SelectionValue::Single(None));
    }

    #[test]
    fn integer_selection_matches_float_option() {
        let cat = OptionCatalog::from_json(&json!([{"label": "One", "value": 1.0}])).expect("catalog");
        let value = SelectionValue::Single(Some(Scalar::from(1_i64)));
        assert_eq!(reconcile_value(&value, &cat), value);

        let value = SelectionValue::Multi(vec![Scalar::from(1_i64), Scalar::from(2_i64)]);
        assert_eq!(
            reconcile_value(&value, &cat),
            SelectionValue::Multi(vec![Scalar::from(1_i64)])
        );
    }

    #[test]
    fn from_json_enforces_shape() {
        assert_eq!(
            SelectionValue::from_json(&json!(["a"]), true, "d").expect("multi"),
            multi(&["a"])
        );
        assert_eq!(
            SelectionValue::from_json(&Value::Null, true, "d").expect("multi"),
            SelectionValue::Multi(Vec::new())
        );
        assert_eq!(
            SelectionValue::from_json(&json!(""), false, "d").expect("single"),
            single("")
        );

        let err = SelectionValue::from_json(&json!("a"), true, "d").expect_err("bare scalar");
        assert_eq!(
            err,
            SelectionError::ShapeMismatch {
                control: "d".into(),
                expected: "array of scalars",
                found: "string",
            }
        );
        assert!(SelectionValue::from_json(&json!(["a"]), false, "d").is_err());
        assert!(SelectionValue::from_json(&json!(["a", null]), true, "d").is_err());
    }

    #[test]
    fn to_json_distinguishes_null_and_empty_string() {
        assert_eq!(SelectionValue::Single(None).to_json(), Value::Null);
        assert_eq!(single("").to_json(), json!(""));
        assert_eq!(multi(&[]).to_json(), json!([]));
    }
}
