#![forbid(unsafe_code)]

//! Core: option catalogs, selection reconciliation, and patch application.
//!
//! # Role in FrankenDash
//! `fdash-core` is the leaf data layer. It owns the typed model of a
//! selection control (its [`OptionCatalog`] and [`SelectionValue`]) and the
//! pure functions that keep that model consistent when upstream data changes.
//!
//! # Primary responsibilities
//! - **Scalar**: the string / number / boolean values an option can carry.
//! - **OptionCatalog**: ordered, duplicate-free option lists, normalized from
//!   the shorthand forms a dropdown accepts.
//! - **Selection reconciliation**: dropping selections that no longer have a
//!   backing option, without coercing an explicit empty string into "nothing".
//! - **Patch**: write-only descriptors of in-place edits to stored JSON state.
//!
//! # How it fits in the system
//! The runtime (`fdash-runtime`) owns the property store and the callback
//! graph; whenever a callback writes a control's `options` or emits a patch,
//! the runtime delegates to this crate and decides what to notify based on
//! whether the returned value differs from the previous one.

pub mod catalog;
pub mod control;
pub mod patch;
pub mod scalar;
pub mod selection;

pub use catalog::{CatalogError, OptionCatalog, SelectOption};
pub use control::Control;
pub use patch::{Patch, PatchError, PatchOperation, PathSegment};
pub use scalar::Scalar;
pub use selection::{SelectionError, SelectionValue, reconcile, reconcile_value};
