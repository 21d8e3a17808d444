#![forbid(unsafe_code)]

//! Versioned property store.
//!
//! Each property keeps its current JSON value and a version counter bumped
//! on every write that actually changes the value. Equal writes are no-ops,
//! which is what lets the propagator stop at a fixpoint.

use std::collections::HashMap;

use serde_json::Value;

use crate::key::PropKey;

#[derive(Debug, Clone)]
struct Slot {
    value: Value,
    version: u64,
}

/// Current value of every declared property.
#[derive(Debug, Clone, Default)]
pub struct PropertyStore {
    slots: HashMap<PropKey, Slot>,
}

impl PropertyStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a property at layout-build time. Resets its version to zero.
    pub fn declare(&mut self, key: PropKey, value: Value) {
        self.slots.insert(key, Slot { value, version: 0 });
    }

    #[must_use]
    pub fn get(&self, key: &PropKey) -> Option<&Value> {
        self.slots.get(key).map(|slot| &slot.value)
    }

    /// Value of `key`, or `null` when it was never declared.
    #[must_use]
    pub fn get_or_null(&self, key: &PropKey) -> Value {
        self.get(key).cloned().unwrap_or(Value::Null)
    }

    #[must_use]
    pub fn version(&self, key: &PropKey) -> u64 {
        self.slots.get(key).map_or(0, |slot| slot.version)
    }

    #[must_use]
    pub fn contains(&self, key: &PropKey) -> bool {
        self.slots.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Write `value`. Returns `true` when it differs from the previous value.
    ///
    /// Undeclared properties are created on first write, matching a layout
    /// that leaves a property unset until a callback fills it.
    pub fn set(&mut self, key: &PropKey, value: Value) -> bool {
        match self.slots.get_mut(key) {
            Some(slot) if slot.value == value => false,
            Some(slot) => {
                slot.value = value;
                slot.version += 1;
                true
            }
            None => {
                let changed = !value.is_null();
                self.slots.insert(
                    key.clone(),
                    Slot {
                        value,
                        version: u64::from(changed),
                    },
                );
                changed
            }
        }
    }
}
