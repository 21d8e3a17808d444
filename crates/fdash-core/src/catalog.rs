#![forbid(unsafe_code)]

//! Option catalogs for selection controls.
//!
//! # Design
//!
//! An [`OptionCatalog`] is the ordered list of `(label, value)` pairs a
//! dropdown offers. It is immutable once built: an update replaces the
//! whole catalog through [`OptionCatalog::replace`], and it is the caller's
//! job (see [`crate::selection::reconcile`]) to bring the control's value
//! back in line with the new catalog.
//!
//! # Invariants
//!
//! 1. No two options share a `value`.
//! 2. Option order is the order given at construction and is preserved by
//!    every accessor, including [`OptionCatalog::search`].
//!
//! # Accepted input shapes
//!
//! [`OptionCatalog::from_json`] accepts the three forms a dropdown's
//! `options` property may take:
//!
//! | shape                                  | label              |
//! |----------------------------------------|--------------------|
//! | `["a", "b"]`                           | the value as text  |
//! | `{"NYC": "New York City"}`             | the map value      |
//! | `[{"label": "Montreal", "value": "MTL"}]` | the `label` field |

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::scalar::Scalar;

/// Errors raised while building a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("duplicate option value {value} at positions {first} and {second}")]
    DuplicateValue {
        value: Scalar,
        first: usize,
        second: usize,
    },

    #[error("invalid option at position {index}: {reason}")]
    InvalidOption { index: usize, reason: String },
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// One selectable entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: Scalar,
    #[serde(default, skip_serializing_if = "is_false")]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Extra text matched by search in addition to label and value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl SelectOption {
    #[must_use]
    pub fn new(label: impl Into<String>, value: impl Into<Scalar>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            disabled: false,
            title: None,
            search: None,
        }
    }

    /// An option whose label is the value's text.
    #[must_use]
    pub fn bare(value: impl Into<Scalar>) -> Self {
        let value = value.into();
        Self::new(value.to_string(), value)
    }

    #[must_use]
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn search_text(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Case-insensitive substring match against label, value, and search text.
    #[must_use]
    pub fn matches(&self, query_lower: &str) -> bool {
        if query_lower.is_empty() {
            return true;
        }
        self.label.to_lowercase().contains(query_lower)
            || self.value.to_string().to_lowercase().contains(query_lower)
            || self
                .search
                .as_deref()
                .is_some_and(|s| s.to_lowercase().contains(query_lower))
    }

    fn from_object(index: usize, object: &Map<String, Value>) -> Result<Self, CatalogError> {
        let value = object
            .get("value")
            .and_then(Scalar::from_json)
            .ok_or_else(|| CatalogError::InvalidOption {
                index,
                reason: "`value` must be a string, number, or boolean".into(),
            })?;
        let label = match object.get("label") {
            None | Some(Value::Null) => value.to_string(),
            Some(raw) => match Scalar::from_json(raw) {
                Some(label) => label.to_string(),
                None => {
                    return Err(CatalogError::InvalidOption {
                        index,
                        reason: "`label` must be a string, number, or boolean".into(),
                    });
                }
            },
        };
        let disabled = match object.get("disabled") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => {
                return Err(CatalogError::InvalidOption {
                    index,
                    reason: "`disabled` must be a boolean".into(),
                });
            }
        };
        Ok(Self {
            label,
            value,
            disabled,
            title: object.get("title").and_then(Value::as_str).map(str::to_owned),
            search: object.get("search").and_then(Value::as_str).map(str::to_owned),
        })
    }
}

/// An ordered, duplicate-free set of options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionCatalog {
    options: Vec<SelectOption>,
}

impl OptionCatalog {
    /// The empty catalog.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a new catalog from `options`, rejecting duplicate values.
    ///
    /// The result shares nothing with any previous catalog; it never touches
    /// a control's value.
    pub fn replace(
        options: impl IntoIterator<Item = SelectOption>,
    ) -> Result<Self, CatalogError> {
        let options: Vec<SelectOption> = options.into_iter().collect();
        let mut seen: HashMap<&Scalar, usize> = HashMap::with_capacity(options.len());
        for (index, option) in options.iter().enumerate() {
            if let Some(&first) = seen.get(&option.value) {
                return Err(CatalogError::DuplicateValue {
                    value: option.value.clone(),
                    first,
                    second: index,
                });
            }
            seen.insert(&option.value, index);
        }
        Ok(Self { options })
    }

    /// Normalize any accepted `options` shape into a catalog.
    pub fn from_json(raw: &Value) -> Result<Self, CatalogError> {
        match raw {
            Value::Null => Ok(Self::empty()),
            Value::Array(items) => {
                let mut options = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let option = match item {
                        Value::Object(object) => SelectOption::from_object(index, object)?,
                        other => match Scalar::from_json(other) {
                            Some(value) => SelectOption::bare(value),
                            None => {
                                return Err(CatalogError::InvalidOption {
                                    index,
                                    reason: "expected a scalar or an option object".into(),
                                });
                            }
                        },
                    };
                    options.push(option);
                }
                Self::replace(options)
            }
            Value::Object(map) => {
                let mut options = Vec::with_capacity(map.len());
                for (index, (value, label)) in map.iter().enumerate() {
                    let label = Scalar::from_json(label).ok_or_else(|| {
                        CatalogError::InvalidOption {
                            index,
                            reason: "mapped label must be a string, number, or boolean".into(),
                        }
                    })?;
                    options.push(SelectOption::new(label.to_string(), value.as_str()));
                }
                Self::replace(options)
            }
            Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                Err(CatalogError::InvalidOption {
                    index: 0,
                    reason: "options must be an array, an object, or null".into(),
                })
            }
        }
    }

    /// Canonical array-of-objects form.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.options
                .iter()
                .map(|option| serde_json::to_value(option).unwrap_or(Value::Null))
                .collect(),
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SelectOption> {
        self.options.iter()
    }

    /// Option values in catalog order.
    pub fn values(&self) -> impl Iterator<Item = &Scalar> {
        self.options.iter().map(|option| &option.value)
    }

    #[must_use]
    pub fn contains(&self, value: &Scalar) -> bool {
        self.options.iter().any(|option| &option.value == value)
    }

    #[must_use]
    pub fn get(&self, value: &Scalar) -> Option<&SelectOption> {
        self.options.iter().find(|option| &option.value == value)
    }

    /// Enabled options matching `query`, in catalog order.
    pub fn search<'a>(&'a self, query: &str) -> impl Iterator<Item = &'a SelectOption> + 'a {
        let query_lower = query.trim().to_lowercase();
        self.options
            .iter()
            .filter(move |option| !option.disabled && option.matches(&query_lower))
    }
}

impl<'a> IntoIterator for &'a OptionCatalog {
    type Item = &'a SelectOption;
    type IntoIter = std::slice::Iter<'a, SelectOption>;

    fn into_iter(self) -> Self::IntoIter {
        self.options.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn cities() -> Value {
        json!([
            {"label": "New York City", "value": "NYC"},
            {"label": "Montreal", "value": "MTL"},
            {"label": "San Francisco", "value": "SF"},
        ])
    }

    #[test]
    fn object_form_keeps_order_and_labels() {
        let catalog = OptionCatalog::from_json(&cities()).expect("catalog");
        let values: Vec<String> = catalog.values().map(ToString::to_string).collect();
        assert_eq!(values, vec!["NYC", "MTL", "SF"]);
        assert_eq!(
            catalog.get(&Scalar::from("MTL")).map(|o| o.label.as_str()),
            Some("Montreal")
        );
    }

    #[test]
    fn scalar_list_uses_value_as_label() {
        let catalog = OptionCatalog::from_json(&json!(["a", "b", "c"])).expect("catalog");
        assert_eq!(catalog.len(), 3);
        assert!(catalog.iter().all(|o| o.label == o.value.to_string()));
    }

    #[test]
    fn value_label_map_form_preserves_insertion_order() {
        let catalog =
            OptionCatalog::from_json(&json!({"SF": "San Francisco", "MTL": "Montreal"}))
                .expect("catalog");
        let labels: Vec<&str> = catalog.iter().map(|o| o.label.as_str()).collect();
        assert_eq!(labels, vec!["San Francisco", "Montreal"]);
    }

    #[test]
    fn null_is_empty_catalog() {
        assert!(OptionCatalog::from_json(&Value::Null).expect("catalog").is_empty());
    }

    #[test]
    fn duplicate_values_rejected() {
        let err = OptionCatalog::replace([
            SelectOption::new("One", "x"),
            SelectOption::new("Two", "y"),
            SelectOption::new("Again", "x"),
        ])
        .expect_err("duplicate");
        assert_eq!(
            err,
            CatalogError::DuplicateValue {
                value: Scalar::from("x"),
                first: 0,
                second: 2,
            }
        );
    }

    #[test]
    fn numerically_equal_values_are_duplicates() {
        let err = OptionCatalog::from_json(&json!([1, 2, 1.0])).expect_err("duplicate");
        assert_eq!(
            err,
            CatalogError::DuplicateValue {
                value: Scalar::from(1_i64),
                first: 0,
                second: 2,
            }
        );
        let catalog = OptionCatalog::from_json(&json!([{"value": 2.0}])).expect("catalog");
        assert!(catalog.contains(&Scalar::from(2_i64)));
    }

    #[test]
    fn mixed_kinds_are_distinct_values() {
        let catalog = OptionCatalog::from_json(&json!(["1", 1, true, "true"])).expect("catalog");
        assert_eq!(catalog.len(), 4);
    }

    #[test]
    fn malformed_entries_report_position() {
        let err = OptionCatalog::from_json(&json!(["a", [1, 2]])).expect_err("invalid");
        assert!(matches!(err, CatalogError::InvalidOption { index: 1, .. }));

        let err = OptionCatalog::from_json(&json!([{"label": "no value"}])).expect_err("invalid");
        assert!(matches!(err, CatalogError::InvalidOption { index: 0, .. }));

        assert!(OptionCatalog::from_json(&json!("a")).is_err());
    }

    #[test]
    fn to_json_is_canonical_and_reparses() {
        let catalog = OptionCatalog::from_json(&json!(["a", "b"])).expect("catalog");
        assert_eq!(
            catalog.to_json(),
            json!([{"label": "a", "value": "a"}, {"label": "b", "value": "b"}])
        );
        assert_eq!(
            OptionCatalog::from_json(&catalog.to_json()).expect("catalog"),
            catalog
        );
    }

    #[test]
    fn search_is_case_insensitive_and_skips_disabled() {
        let catalog = OptionCatalog::replace([
            SelectOption::new("New York City", "NYC"),
            SelectOption::new("Montreal", "MTL").disabled(true),
            SelectOption::new("San Francisco", "SF").search_text("bay area"),
        ])
        .expect("catalog");

        let hits: Vec<&str> = catalog.search("n").map(|o| o.label.as_str()).collect();
        assert_eq!(hits, vec!["New York City", "San Francisco"]);

        let hits: Vec<&str> = catalog.search("BAY").map(|o| o.label.as_str()).collect();
        assert_eq!(hits, vec!["San Francisco"]);

        assert_eq!(catalog.search("").count(), 2);
    }

    #[test]
    fn disabled_flag_parsed_from_object() {
        let catalog =
            OptionCatalog::from_json(&json!([{"label": "A", "value": "a", "disabled": true}]))
                .expect("catalog");
        assert!(catalog.get(&Scalar::from("a")).expect("a").disabled);
        assert!(OptionCatalog::from_json(&json!([{"value": "a", "disabled": "yes"}])).is_err());
    }
}
