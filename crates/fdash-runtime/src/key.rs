#![forbid(unsafe_code)]

//! Component and property addressing.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a component in a layout. Unique per layout and immutable.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ComponentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// One property of one component, e.g. `dropdown.options`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropKey {
    pub component: ComponentId,
    pub property: String,
}

impl PropKey {
    #[must_use]
    pub fn new(component: impl Into<ComponentId>, property: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            property: property.into(),
        }
    }

    #[must_use]
    pub fn is(&self, component: &str, property: &str) -> bool {
        self.component.as_str() == component && self.property == property
    }
}

impl fmt::Display for PropKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.property)
    }
}

impl<C: Into<ComponentId>, P: Into<String>> From<(C, P)> for PropKey {
    fn from((component, property): (C, P)) -> Self {
        Self::new(component, property)
    }
}
