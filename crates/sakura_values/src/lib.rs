//! Dynamic values and the namespace resolver for SakuraTree (Layer 1).
//!
//! `sakura_values` provides the data plumbing the execution engine is built
//! on: a deep-copyable dynamic [`Value`], the [`ValueItem`] cell that couples
//! a value (or an identifier reference) with transform functions, and the
//! resolver that fills items against a namespace.
//!
//! # Core Concepts
//!
//! - [`Value`] - Tagged dynamic value (`Unset`/`Null`/scalars/`Array`/`Map`)
//! - [`ValueItem`] - A literal or identifier reference plus [`ValueFunction`]s
//! - [`ValueItemMap`] - Insertion-order-preserving map of named value items
//! - [`resolve`] - Identifier lookup, function application, map filling,
//!   override semantics
//! - [`TemplateEngine`] - The seam to the template renderer, with the
//!   built-in [`BraceTemplates`] implementation
//!
//! # Architecture
//!
//! This crate is Layer 1 of the SakuraTree architecture:
//!
//! - **Layer 1** (`sakura_values`): value model and resolver (this crate)
//! - **Layer 2** (`sakura_tree`): item tree, scheduler, interpreter
//! - **Layer 3** (`sakura_blossoms`): concrete task implementations

/// Dynamic value type and namespace map.
pub mod value;

/// Value items, roles, and transform functions.
pub mod item;

/// Identifier resolution, function application, and map filling.
pub mod resolve;

/// Template rendering seam.
pub mod template;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::item::{ValueFunction, ValueItem, ValueItemMap, ValueRole};
    pub use crate::resolve::{
        OverrideMode, ResolveError, apply_functions, fill_input_value_item_map,
        fill_output_value_item_map, fill_value_item, override_item_maps, override_values,
        override_values_with_items, resolve_identifier, uninitialized_keys,
    };
    pub use crate::template::{BraceTemplates, TemplateEngine, TemplateError};
    pub use crate::value::{Value, ValueMap};
}

pub use item::{ValueFunction, ValueItem, ValueItemMap, ValueRole};
pub use resolve::{OverrideMode, ResolveError};
pub use template::{BraceTemplates, TemplateEngine, TemplateError};
pub use value::{Value, ValueMap};
