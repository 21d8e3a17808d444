#![forbid(unsafe_code)]

//! Layout construction.
//!
//! A [`Layout`] lists the components of an app with their initial property
//! values. [`Layout::into_propagator`] validates ids and dropdown settings
//! and seeds a [`Propagator`]; callbacks are registered on the result.

use std::collections::HashSet;

use fdash_core::{CatalogError, Control, OptionCatalog, SelectionError, SelectionValue};
use serde_json::Value;
use thiserror::Error;

use crate::config::RuntimeConfig;
use crate::key::ComponentId;
use crate::propagator::Propagator;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("component id {0} is used more than once")]
    DuplicateId(ComponentId),

    #[error("dropdown {id}: {source}")]
    Catalog {
        id: ComponentId,
        #[source]
        source: CatalogError,
    },

    #[error("dropdown {id}: {source}")]
    Selection {
        id: ComponentId,
        #[source]
        source: SelectionError,
    },
}

/// A dropdown as declared in a layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Dropdown {
    id: ComponentId,
    options: Value,
    value: Value,
    multi: bool,
    searchable: bool,
    clearable: bool,
}

impl Dropdown {
    #[must_use]
    pub fn new(id: impl Into<ComponentId>) -> Self {
        Self {
            id: id.into(),
            options: Value::Array(Vec::new()),
            value: Value::Null,
            multi: false,
            searchable: true,
            clearable: true,
        }
    }

    /// Options in any accepted shorthand: list of scalars, list of
    /// `{label, value}` objects, or a `value -> label` map.
    #[must_use]
    pub fn options(mut self, options: Value) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = value.into();
        self
    }

    #[must_use]
    pub fn multi(mut self, multi: bool) -> Self {
        self.multi = multi;
        self
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

    fn into_control(self) -> Result<Control, LayoutError> {
        let catalog = OptionCatalog::from_json(&self.options).map_err(|source| LayoutError::Catalog {
            id: self.id.clone(),
            source,
        })?;
        let selection = |source| LayoutError::Selection {
            id: self.id.clone(),
            source,
        };
        let value = SelectionValue::from_json(&self.value, self.multi, self.id.as_str())
            .map_err(selection)?;
        Control::new(self.id.as_str(), catalog, self.multi)
            .searchable(self.searchable)
            .clearable(self.clearable)
            .with_value(value)
            .map_err(selection)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Dropdown(Dropdown),
    Plain {
        id: ComponentId,
        properties: Vec<(String, Value)>,
    },
}

impl Node {
    fn id(&self) -> &ComponentId {
        match self {
            Self::Dropdown(dropdown) => &dropdown.id,
            Self::Plain { id, .. } => id,
        }
    }
}

/// Ordered list of components with their initial properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    nodes: Vec<Node>,
}

impl Layout {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn dropdown(mut self, dropdown: Dropdown) -> Self {
        self.nodes.push(Node::Dropdown(dropdown));
        self
    }

    /// A button. `n_clicks` starts as `null`, i.e. never clicked.
    #[must_use]
    pub fn button(self, id: impl Into<ComponentId>, label: &str) -> Self {
        self.component(
            id,
            [
                ("n_clicks".to_owned(), Value::Null),
                ("children".to_owned(), Value::from(label)),
            ],
        )
    }

    /// A text container with empty `children`.
    #[must_use]
    pub fn div(self, id: impl Into<ComponentId>) -> Self {
        self.component(id, [("children".to_owned(), Value::Null)])
    }

    /// A client-side data store.
    #[must_use]
    pub fn store(self, id: impl Into<ComponentId>, data: Value) -> Self {
        self.component(id, [("data".to_owned(), data)])
    }

    /// Any other component.
    #[must_use]
    pub fn component(
        mut self,
        id: impl Into<ComponentId>,
        properties: impl IntoIterator<Item = (String, Value)>,
    ) -> Self {
        self.nodes.push(Node::Plain {
            id: id.into(),
            properties: properties.into_iter().collect(),
        });
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Validate and seed a propagator with every component.
    pub fn into_propagator(self, config: RuntimeConfig) -> Result<Propagator, LayoutError> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id().clone()) {
                return Err(LayoutError::DuplicateId(node.id().clone()));
            }
        }
        let mut propagator = Propagator::new(config);
        for node in self.nodes {
            match node {
                Node::Dropdown(dropdown) => propagator.declare_control(dropdown.into_control()?),
                Node::Plain { id, properties } => propagator.declare_component(id, properties),
            }
        }
        tracing::debug!(components = seen.len(), "layout seeded");
        Ok(propagator)
    }
}
