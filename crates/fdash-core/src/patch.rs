#![forbid(unsafe_code)]

//! Partial updates to stored JSON state.
//!
//! # Design
//!
//! A [`Patch`] is a write-only description of a delta: an ordered list of
//! [`PatchOperation`]s, each targeting a [`PathSegment`] path inside a JSON
//! document. A callback that wants to "bump a counter" emits
//! `Patch::new().increment(path!["count"], 1)` instead of reading the counter
//! and returning `count + 1`, so it never races on a stale read.
//!
//! [`apply`] is pure: it takes the current state by reference and returns the
//! patched copy, or the first error. A failing patch leaves the caller's state
//! untouched.
//!
//! # Operations
//!
//! | op          | target             | effect                                   |
//! |-------------|--------------------|------------------------------------------|
//! | `set`       | any (leaf may be missing) | replace / create                  |
//! | `increment` | number             | add `by`                                 |
//! | `multiply`  | number             | multiply by `by`                         |
//! | `append`    | array              | push at end                              |
//! | `prepend`   | array              | insert at front                          |
//! | `insert`    | array              | insert at `index` (`index <= len`)       |
//! | `extend`    | array              | push every value                         |
//! | `remove`    | array              | drop the first element equal to `value`  |
//! | `delete`    | object key / index | remove the addressed entry               |
//! | `clear`     | array/object/string| empty it                                 |
//! | `reverse`   | array              | reverse in place                         |
//! | `merge`     | object             | shallow key update                       |
//!
//! Integer arithmetic stays integral when both operands are integers; an
//! overflow is reported as a type mismatch instead of silently widening.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use thiserror::Error;

use crate::selection::json_kind;

/// Errors raised while applying a patch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    #[error("path not found: {path}")]
    PathNotFound { path: String },

    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("index {index} out of bounds at {path} (length {len})")]
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },
}

/// One step of a path: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_owned())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{i}"),
            Self::Key(k) => f.write_str(k),
        }
    }
}

/// Build a patch path from keys and indices: `path!["rows", 0, "label"]`.
#[macro_export]
macro_rules! path {
    () => {
        ::std::vec::Vec::<$crate::patch::PathSegment>::new()
    };
    ($($segment:expr),+ $(,)?) => {
        vec![$($crate::patch::PathSegment::from($segment)),+]
    };
}

/// Render a path as a JSON-pointer-like string for error messages.
#[must_use]
pub fn render_path(path: &[PathSegment]) -> String {
    if path.is_empty() {
        return "/".to_owned();
    }
    path.iter().fold(String::new(), |mut out, segment| {
        out.push('/');
        out.push_str(&segment.to_string());
        out
    })
}

/// A single structural edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PatchOperation {
    Set { path: Vec<PathSegment>, value: Value },
    Increment { path: Vec<PathSegment>, by: Number },
    Multiply { path: Vec<PathSegment>, by: Number },
    Append { path: Vec<PathSegment>, value: Value },
    Prepend { path: Vec<PathSegment>, value: Value },
    Insert { path: Vec<PathSegment>, index: usize, value: Value },
    Extend { path: Vec<PathSegment>, values: Vec<Value> },
    Remove { path: Vec<PathSegment>, value: Value },
    Delete { path: Vec<PathSegment> },
    Clear { path: Vec<PathSegment> },
    Reverse { path: Vec<PathSegment> },
    Merge { path: Vec<PathSegment>, value: Map<String, Value> },
}

impl PatchOperation {
    #[must_use]
    pub fn path(&self) -> &[PathSegment] {
        match self {
            Self::Set { path, .. }
            | Self::Increment { path, .. }
            | Self::Multiply { path, .. }
            | Self::Append { path, .. }
            | Self::Prepend { path, .. }
            | Self::Insert { path, .. }
            | Self::Extend { path, .. }
            | Self::Remove { path, .. }
            | Self::Delete { path }
            | Self::Clear { path }
            | Self::Reverse { path }
            | Self::Merge { path, .. } => path,
        }
    }

    /// Short name used in logs and error context.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Set { .. } => "set",
            Self::Increment { .. } => "increment",
            Self::Multiply { .. } => "multiply",
            Self::Append { .. } => "append",
            Self::Prepend { .. } => "prepend",
            Self::Insert { .. } => "insert",
            Self::Extend { .. } => "extend",
            Self::Remove { .. } => "remove",
            Self::Delete { .. } => "delete",
            Self::Clear { .. } => "clear",
            Self::Reverse { .. } => "reverse",
            Self::Merge { .. } => "merge",
        }
    }
}

/// An ordered list of patch operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Patch {
    operations: Vec<PatchOperation>,
}

impl Patch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_operations(operations: Vec<PatchOperation>) -> Self {
        Self { operations }
    }

    #[must_use]
    pub fn operations(&self) -> &[PatchOperation] {
        &self.operations
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    #[must_use]
    pub fn push(mut self, op: PatchOperation) -> Self {
        self.operations.push(op);
        self
    }

    #[must_use]
    pub fn set(self, path: Vec<PathSegment>, value: impl Into<Value>) -> Self {
        self.push(PatchOperation::Set {
            path,
            value: value.into(),
        })
    }

    #[must_use]
    pub fn increment(self, path: Vec<PathSegment>, by: impl Into<Number>) -> Self {
        self.push(PatchOperation::Increment {
            path,
            by: by.into(),
        })
    }

    #[must_use]
    pub fn multiply(self, path: Vec<PathSegment>, by: impl Into<Number>) -> Self {
        self.push(PatchOperation::Multiply {
            path,
            by: by.into(),
        })
    }

    #[must_use]
    pub fn append(self, path: Vec<PathSegment>, value: impl Into<Value>) -> Self {
        self.push(PatchOperation::Append {
            path,
            value: value.into(),
        })
    }

    #[must_use]
    pub fn prepend(self, path: Vec<PathSegment>, value: impl Into<Value>) -> Self {
        self.push(PatchOperation::Prepend {
            path,
            value: value.into(),
        })
    }

    #[must_use]
    pub fn insert(self, path: Vec<PathSegment>, index: usize, value: impl Into<Value>) -> Self {
        self.push(PatchOperation::Insert {
            path,
            index,
            value: value.into(),
        })
    }

    #[must_use]
    pub fn extend(self, path: Vec<PathSegment>, values: impl IntoIterator<Item = Value>) -> Self {
        self.push(PatchOperation::Extend {
            path,
            values: values.into_iter().collect(),
        })
    }

    #[must_use]
    pub fn remove(self, path: Vec<PathSegment>, value: impl Into<Value>) -> Self {
        self.push(PatchOperation::Remove {
            path,
            value: value.into(),
        })
    }

    #[must_use]
    pub fn delete(self, path: Vec<PathSegment>) -> Self {
        self.push(PatchOperation::Delete { path })
    }

    #[must_use]
    pub fn clear(self, path: Vec<PathSegment>) -> Self {
        self.push(PatchOperation::Clear { path })
    }

    #[must_use]
    pub fn reverse(self, path: Vec<PathSegment>) -> Self {
        self.push(PatchOperation::Reverse { path })
    }

    #[must_use]
    pub fn merge(self, path: Vec<PathSegment>, value: Map<String, Value>) -> Self {
        self.push(PatchOperation::Merge { path, value })
    }

    /// Apply every operation to a copy of `state`.
    pub fn apply(&self, state: &Value) -> Result<Value, PatchError> {
        apply(state, &self.operations)
    }
}

/// Apply `ops` in order to a copy of `state`. Each operation sees the result
/// of the previous one; the first failure aborts and `state` is unchanged.
pub fn apply(state: &Value, ops: &[PatchOperation]) -> Result<Value, PatchError> {
    let mut next = state.clone();
    for op in ops {
        apply_one(&mut next, op)?;
        #[cfg(feature = "tracing")]
        tracing::trace!(op = op.name(), path = %render_path(op.path()), "patch op applied");
    }
    Ok(next)
}

fn resolve<'a>(root: &'a mut Value, path: &[PathSegment]) -> Result<&'a mut Value, PatchError> {
    let mut current = root;
    for (depth, segment) in path.iter().enumerate() {
        let here = &path[..=depth];
        current = match (current, segment) {
            (Value::Object(map), PathSegment::Key(key)) => {
                map.get_mut(key).ok_or_else(|| PatchError::PathNotFound {
                    path: render_path(here),
                })?
            }
            (Value::Array(items), PathSegment::Index(index)) => {
                let len = items.len();
                items
                    .get_mut(*index)
                    .ok_or_else(|| PatchError::IndexOutOfBounds {
                        path: render_path(&path[..depth]),
                        index: *index,
                        len,
                    })?
            }
            // A key into a non-object or an index into a non-array does not
            // address anything.
            _ => {
                return Err(PatchError::PathNotFound {
                    path: render_path(here),
                });
            }
        };
    }
    Ok(current)
}

fn mismatch(path: &[PathSegment], expected: &'static str, found: &Value) -> PatchError {
    PatchError::TypeMismatch {
        path: render_path(path),
        expected,
        found: json_kind(found),
    }
}

fn array_at<'a>(
    root: &'a mut Value,
    path: &[PathSegment],
) -> Result<&'a mut Vec<Value>, PatchError> {
    match resolve(root, path)? {
        Value::Array(items) => Ok(items),
        other => Err(mismatch(path, "array", other)),
    }
}

#[derive(Clone, Copy)]
enum Arith {
    Add,
    Mul,
}

fn arithmetic(
    path: &[PathSegment],
    current: &Number,
    by: &Number,
    arith: Arith,
) -> Result<Number, PatchError> {
    let overflow = || PatchError::TypeMismatch {
        path: render_path(path),
        expected: "number within range",
        found: "number",
    };
    if let (Some(a), Some(b)) = (current.as_i64(), by.as_i64()) {
        let result = match arith {
            Arith::Add => a.checked_add(b),
            Arith::Mul => a.checked_mul(b),
        };
        return result.map(Number::from).ok_or_else(overflow);
    }
    if let (Some(a), Some(b)) = (current.as_u64(), by.as_u64()) {
        let result = match arith {
            Arith::Add => a.checked_add(b),
            Arith::Mul => a.checked_mul(b),
        };
        return result.map(Number::from).ok_or_else(overflow);
    }
    let (a, b) = match (current.as_f64(), by.as_f64()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(overflow()),
    };
    let result = match arith {
        Arith::Add => a + b,
        Arith::Mul => a * b,
    };
    Number::from_f64(result).ok_or_else(overflow)
}

fn apply_one(root: &mut Value, op: &PatchOperation) -> Result<(), PatchError> {
    match op {
        PatchOperation::Set { path, value } => set(root, path, value.clone()),
        PatchOperation::Increment { path, by } => match resolve(root, path)? {
            Value::Number(current) => {
                *current = arithmetic(path, current, by, Arith::Add)?;
                Ok(())
            }
            other => Err(mismatch(path, "number", other)),
        },
        PatchOperation::Multiply { path, by } => match resolve(root, path)? {
            Value::Number(current) => {
                *current = arithmetic(path, current, by, Arith::Mul)?;
                Ok(())
            }
            other => Err(mismatch(path, "number", other)),
        },
        PatchOperation::Append { path, value } => {
            array_at(root, path)?.push(value.clone());
            Ok(())
        }
        PatchOperation::Prepend { path, value } => {
            array_at(root, path)?.insert(0, value.clone());
            Ok(())
        }
        PatchOperation::Insert { path, index, value } => {
            let items = array_at(root, path)?;
            if *index > items.len() {
                return Err(PatchError::IndexOutOfBounds {
                    path: render_path(path),
                    index: *index,
                    len: items.len(),
                });
            }
            items.insert(*index, value.clone());
            Ok(())
        }
        PatchOperation::Extend { path, values } => {
            array_at(root, path)?.extend(values.iter().cloned());
            Ok(())
        }
        PatchOperation::Remove { path, value } => {
            let items = array_at(root, path)?;
            if let Some(position) = items.iter().position(|item| item == value) {
                items.remove(position);
            }
            Ok(())
        }
        PatchOperation::Delete { path } => delete(root, path),
        PatchOperation::Clear { path } => {
            match resolve(root, path)? {
                Value::Array(items) => items.clear(),
                Value::Object(map) => map.clear(),
                Value::String(s) => s.clear(),
                other => return Err(mismatch(path, "array, object, or string", other)),
            }
            Ok(())
        }
        PatchOperation::Reverse { path } => {
            array_at(root, path)?.reverse();
            Ok(())
        }
        PatchOperation::Merge { path, value } => match resolve(root, path)? {
            Value::Object(map) => {
                for (key, entry) in value {
                    map.insert(key.clone(), entry.clone());
                }
                Ok(())
            }
            other => Err(mismatch(path, "object", other)),
        },
    }
}

fn set(root: &mut Value, path: &[PathSegment], value: Value) -> Result<(), PatchError> {
    let Some((last, parent_path)) = path.split_last() else {
        *root = value;
        return Ok(());
    };
    let parent = resolve(root, parent_path)?;
    match (parent, last) {
        (Value::Object(map), PathSegment::Key(key)) => {
            map.insert(key.clone(), value);
            Ok(())
        }
        (Value::Array(items), PathSegment::Index(index)) => {
            let len = items.len();
            let slot = items
                .get_mut(*index)
                .ok_or_else(|| PatchError::IndexOutOfBounds {
                    path: render_path(parent_path),
                    index: *index,
                    len,
                })?;
            *slot = value;
            Ok(())
        }
        (Value::Object(_), PathSegment::Index(_)) | (Value::Array(_), PathSegment::Key(_)) => {
            Err(PatchError::PathNotFound {
                path: render_path(path),
            })
        }
        (other, _) => Err(mismatch(parent_path, "array or object", other)),
    }
}

fn delete(root: &mut Value, path: &[PathSegment]) -> Result<(), PatchError> {
    let Some((last, parent_path)) = path.split_last() else {
        return Err(PatchError::PathNotFound {
            path: render_path(path),
        });
    };
    match (resolve(root, parent_path)?, last) {
        (Value::Object(map), PathSegment::Key(key)) => map
            .shift_remove(key)
            .map(drop)
            .ok_or_else(|| PatchError::PathNotFound {
                path: render_path(path),
            }),
        (Value::Array(items), PathSegment::Index(index)) => {
            if *index >= items.len() {
                return Err(PatchError::IndexOutOfBounds {
                    path: render_path(parent_path),
                    index: *index,
                    len: items.len(),
                });
            }
            items.remove(*index);
            Ok(())
        }
        _ => Err(PatchError::PathNotFound {
            path: render_path(path),
        }),
    }
}
