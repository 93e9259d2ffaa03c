//! Value items, roles, and transform functions.
//!
//! A [`ValueItem`] is the cell the tree model stores for every named value:
//! either a literal payload or an identifier pointing into the enclosing
//! namespace, plus an ordered list of [`ValueFunction`]s applied after
//! resolution.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Insertion-order-preserving map from names to value items.
///
/// Order only matters for user-visible diagnostics; the semantics of the
/// engine never depend on it.
pub type ValueItemMap = IndexMap<String, ValueItem>;

/// How a value item participates in an operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueRole {
    /// Consumed by the operation; filled from the namespace before use.
    #[default]
    Input,
    /// Names a key the operation is expected to write back.
    Output,
    /// Post-condition: must equal the compared value.
    CompareEq,
    /// Post-condition: must differ from the compared value.
    CompareNeq,
}

/// A transform applied to a resolved value.
///
/// Functions are applied left-to-right after identifier resolution.
/// Arguments are themselves [`ValueItem`]s and are resolved against the
/// same namespace first. All functions are pure; `Insert` and `Append`
/// produce new collections instead of mutating the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueFunction {
    /// Index a map by key or an array by position.
    Get(ValueItem),
    /// Split a string into its non-empty substrings.
    Split(ValueItem),
    /// Membership test on strings, arrays, and map keys.
    Contains(ValueItem),
    /// Element count of arrays and maps, character count of strings.
    Size,
    /// Returns a new map with the given key set.
    Insert(ValueItem, ValueItem),
    /// Returns a new array with the given value appended.
    Append(ValueItem),
}

impl ValueFunction {
    /// Name of the function, for error messages.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ValueFunction::Get(_) => "get",
            ValueFunction::Split(_) => "split",
            ValueFunction::Contains(_) => "contains",
            ValueFunction::Size => "size",
            ValueFunction::Insert(_, _) => "insert",
            ValueFunction::Append(_) => "append",
        }
    }
}

/// A literal value or an identifier reference, plus transform functions.
///
/// When `is_identifier` is set, `item` holds a string naming another value
/// in the current namespace. Filling the item (see
/// [`fill_value_item`](crate::resolve::fill_value_item)) resolves the
/// reference, applies the functions, renders string results, and writes the
/// result back so subsequent code can treat the item as a literal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueItem {
    /// The literal payload, or the identifier name while `is_identifier`.
    pub item: Value,
    /// How this item participates in the enclosing operation.
    pub role: ValueRole,
    /// True while `item` names another value instead of holding one.
    pub is_identifier: bool,
    /// Transforms applied left-to-right after resolution.
    pub functions: Vec<ValueFunction>,
}

impl ValueItem {
    /// Creates a literal input item.
    #[must_use]
    pub fn literal(value: impl Into<Value>) -> Self {
        Self {
            item: value.into(),
            ..Self::default()
        }
    }

    /// Creates an identifier reference to `name` in the namespace.
    #[must_use]
    pub fn identifier(name: impl Into<String>) -> Self {
        Self {
            item: Value::String(name.into()),
            is_identifier: true,
            ..Self::default()
        }
    }

    /// Creates an output item naming the key `name` in the producer's
    /// output (the empty string selects the whole output).
    #[must_use]
    pub fn output(name: impl Into<String>) -> Self {
        Self {
            item: Value::String(name.into()),
            role: ValueRole::Output,
            is_identifier: true,
            ..Self::default()
        }
    }

    /// Sets the role.
    #[must_use]
    pub fn with_role(mut self, role: ValueRole) -> Self {
        self.role = role;
        self
    }

    /// Appends a transform function.
    #[must_use]
    pub fn with_function(mut self, function: ValueFunction) -> Self {
        self.functions.push(function);
        self
    }
}

impl From<Value> for ValueItem {
    fn from(value: Value) -> Self {
        ValueItem::literal(value)
    }
}
