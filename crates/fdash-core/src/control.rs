#![forbid(unsafe_code)]

//! Selection controls (dropdowns).
//!
//! A [`Control`] pairs an [`OptionCatalog`] with a [`SelectionValue`] whose
//! shape is fixed by the `multi` flag at construction. Catalog replacement
//! goes through [`Control::set_catalog`], which reconciles the value in the
//! same step and reports whether it changed.
//!
//! User interaction (picking an option, clearing, typing into the search
//! box) is expressed as pure functions returning the *next* value. The
//! runtime applies that value as an ordinary property write so the change
//! flows through the same notification path as any other update.

use crate::catalog::{OptionCatalog, SelectOption};
use crate::scalar::Scalar;
use crate::selection::{SelectionError, SelectionValue, reconcile_value};

/// A dropdown-style selection control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    id: String,
    catalog: OptionCatalog,
    value: SelectionValue,
    multi: bool,
    searchable: bool,
    clearable: bool,
}

impl Control {
    /// Create a control with "no selection". Searchable and clearable by
    /// default.
    #[must_use]
    pub fn new(id: impl Into<String>, catalog: OptionCatalog, multi: bool) -> Self {
        Self {
            id: id.into(),
            catalog,
            value: SelectionValue::none(multi),
            multi,
            searchable: true,
            clearable: true,
        }
    }

    /// Set the initial value.
    ///
    /// The initial value is taken as declared; it is not reconciled against
    /// the initial catalog.
    pub fn with_value(mut self, value: SelectionValue) -> Result<Self, SelectionError> {
        self.check_shape(&value)?;
        self.value = value;
        Ok(self)
    }

    #[must_use]
    pub fn searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    #[must_use]
    pub fn clearable(mut self, clearable: bool) -> Self {
        self.clearable = clearable;
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn catalog(&self) -> &OptionCatalog {
        &self.catalog
    }

    #[must_use]
    pub fn value(&self) -> &SelectionValue {
        &self.value
    }

    #[must_use]
    pub fn is_multi(&self) -> bool {
        self.multi
    }

    #[must_use]
    pub fn is_searchable(&self) -> bool {
        self.searchable
    }

    #[must_use]
    pub fn is_clearable(&self) -> bool {
        self.clearable
    }

    fn check_shape(&self, value: &SelectionValue) -> Result<(), SelectionError> {
        if value.is_multi() == self.multi {
            return Ok(());
        }
        Err(SelectionError::ShapeMismatch {
            control: self.id.clone(),
            expected: if self.multi {
                "array of scalars"
            } else {
                "scalar or null"
            },
            found: if value.is_multi() { "array" } else { "scalar" },
        })
    }

    /// Replace the catalog and reconcile the value against it.
    ///
    /// Returns `true` when the reconciled value differs from the previous one.
    pub fn set_catalog(&mut self, catalog: OptionCatalog) -> bool {
        let next = reconcile_value(&self.value, &catalog);
        self.catalog = catalog;
        if next == self.value {
            return false;
        }
        self.value = next;
        true
    }

    /// Overwrite the value. Returns `true` when it changed.
    pub fn set_value(&mut self, value: SelectionValue) -> Result<bool, SelectionError> {
        self.check_shape(&value)?;
        if value == self.value {
            return Ok(false);
        }
        self.value = value;
        Ok(true)
    }

    fn enabled_option(&self, value: &Scalar) -> Result<&SelectOption, SelectionError> {
        let option = self
            .catalog
            .get(value)
            .ok_or_else(|| SelectionError::UnknownOption {
                control: self.id.clone(),
                value: value.clone(),
            })?;
        if option.disabled {
            return Err(SelectionError::DisabledOption {
                control: self.id.clone(),
                value: value.clone(),
            });
        }
        Ok(option)
    }

    /// The value after the user picks `value`: single-select replaces,
    /// multi-select appends unless already selected.
    pub fn choose(&self, value: &Scalar) -> Result<SelectionValue, SelectionError> {
        self.enabled_option(value)?;
        Ok(match &self.value {
            SelectionValue::Single(_) => SelectionValue::Single(Some(value.clone())),
            SelectionValue::Multi(current) => {
                let mut next = current.clone();
                if !next.contains(value) {
                    next.push(value.clone());
                }
                SelectionValue::Multi(next)
            }
        })
    }

    /// The value after the user removes `value` from the selection.
    #[must_use]
    pub fn deselect(&self, value: &Scalar) -> SelectionValue {
        match &self.value {
            SelectionValue::Single(Some(current)) if current == value => {
                SelectionValue::Single(None)
            }
            SelectionValue::Single(current) => SelectionValue::Single(current.clone()),
            SelectionValue::Multi(current) => {
                SelectionValue::Multi(current.iter().filter(|v| *v != value).cloned().collect())
            }
        }
    }

    /// The value after the user presses the clear button.
    pub fn clear(&self) -> Result<SelectionValue, SelectionError> {
        if !self.clearable {
            return Err(SelectionError::NotClearable {
                control: self.id.clone(),
            });
        }
        Ok(SelectionValue::none(self.multi))
    }

    /// First enabled option matching `query`, as the dropdown highlights it
    /// while the user types.
    pub fn search_first(&self, query: &str) -> Result<Option<&SelectOption>, SelectionError> {
        if !self.searchable {
            return Err(SelectionError::NotSearchable {
                control: self.id.clone(),
            });
        }
        Ok(self.catalog.search(query).next())
    }
}
