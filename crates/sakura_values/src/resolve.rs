//! Identifier resolution, function application, and map filling.
//!
//! These operations turn the declarative [`ValueItem`]s of a compiled tree
//! into concrete [`Value`]s against a namespace, and move results between
//! scopes with explicit override semantics. Failures are ordinary values:
//! every operation returns a `Result` and the caller aborts its own scope.

use crate::item::{ValueFunction, ValueItem, ValueItemMap, ValueRole};
use crate::template::{TemplateEngine, TemplateError};
use crate::value::{Value, ValueMap};

/// Errors produced while resolving value items.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    /// An identifier named a value absent from the namespace.
    #[error("unknown identifier: {0}")]
    UnknownIdentifier(String),

    /// A function received a value of the wrong type.
    #[error("{function} expects {expected}, got {actual}")]
    TypeMismatch {
        /// The function that rejected its input.
        function: &'static str,
        /// The type the function expects.
        expected: &'static str,
        /// The type it actually received.
        actual: &'static str,
    },

    /// An array index outside the array bounds.
    #[error("index {index} out of range (length {length})")]
    IndexOutOfRange {
        /// The requested index.
        index: i64,
        /// The array length.
        length: usize,
    },

    /// A map lookup for a key that does not exist.
    #[error("key not found: {0}")]
    KeyNotFound(String),

    /// Rendering a string value failed.
    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// How [`override_values`] and friends treat keys missing from the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideMode {
    /// Insert new keys and update existing ones.
    All,
    /// Update existing keys only; never grow the target.
    OnlyExisting,
    /// Insert new keys only; existing entries win.
    OnlyNew,
}

/// Resolves an item to a value: namespace lookup when it is an identifier,
/// the literal payload otherwise.
///
/// # Errors
///
/// Returns [`ResolveError::UnknownIdentifier`] when the referenced name is
/// absent from the namespace.
pub fn resolve_identifier(item: &ValueItem, values: &ValueMap) -> Result<Value, ResolveError> {
    if !item.is_identifier {
        return Ok(item.item.clone());
    }

    let name = item.item.as_str().unwrap_or_default();
    values
        .get(name)
        .cloned()
        .ok_or_else(|| ResolveError::UnknownIdentifier(name.to_string()))
}

/// Resolves a function argument: identifier lookup plus the argument's own
/// functions, without template rendering.
fn resolve_argument(arg: &ValueItem, values: &ValueMap) -> Result<Value, ResolveError> {
    let resolved = resolve_identifier(arg, values)?;
    apply_functions(resolved, &arg.functions, values)
}

/// Applies transform functions left-to-right to a resolved value.
///
/// # Errors
///
/// Returns [`ResolveError`] on type mismatches, out-of-range indexes, and
/// missing keys.
pub fn apply_functions(
    value: Value,
    functions: &[ValueFunction],
    values: &ValueMap,
) -> Result<Value, ResolveError> {
    let mut current = value;
    for function in functions {
        current = apply_function(current, function, values)?;
    }
    Ok(current)
}

fn apply_function(
    value: Value,
    function: &ValueFunction,
    values: &ValueMap,
) -> Result<Value, ResolveError> {
    match function {
        ValueFunction::Get(key) => {
            let key = resolve_argument(key, values)?;
            match (&value, &key) {
                (Value::Map(map), Value::String(name)) => map
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ResolveError::KeyNotFound(name.clone())),
                (Value::Array(items), Value::Int(index)) => usize::try_from(*index)
                    .ok()
                    .and_then(|position| items.get(position))
                    .cloned()
                    .ok_or(ResolveError::IndexOutOfRange {
                        index: *index,
                        length: items.len(),
                    }),
                _ => Err(ResolveError::TypeMismatch {
                    function: "get",
                    expected: "map with string key or array with int index",
                    actual: value.type_name(),
                }),
            }
        }
        ValueFunction::Split(separator) => {
            let separator = resolve_argument(separator, values)?;
            let (Value::String(text), Value::String(sep)) = (&value, &separator) else {
                return Err(ResolveError::TypeMismatch {
                    function: "split",
                    expected: "string value and string separator",
                    actual: value.type_name(),
                });
            };
            let parts = text
                .split(sep.as_str())
                .filter(|part| !part.is_empty())
                .map(|part| Value::String(part.to_string()))
                .collect();
            Ok(Value::Array(parts))
        }
        ValueFunction::Contains(needle) => {
            let needle = resolve_argument(needle, values)?;
            let found = match &value {
                Value::String(text) => text.contains(&needle.to_string()),
                Value::Array(items) => items.contains(&needle),
                Value::Map(map) => map.contains_key(&needle.to_string()),
                _ => {
                    return Err(ResolveError::TypeMismatch {
                        function: "contains",
                        expected: "string, array, or map",
                        actual: value.type_name(),
                    });
                }
            };
            Ok(Value::Bool(found))
        }
        ValueFunction::Size => match value.len() {
            Some(len) => Ok(Value::Int(len as i64)),
            None => Err(ResolveError::TypeMismatch {
                function: "size",
                expected: "string, array, or map",
                actual: value.type_name(),
            }),
        },
        ValueFunction::Insert(key, new_value) => {
            let key = resolve_argument(key, values)?;
            let new_value = resolve_argument(new_value, values)?;
            let Value::Map(map) = &value else {
                return Err(ResolveError::TypeMismatch {
                    function: "insert",
                    expected: "map",
                    actual: value.type_name(),
                });
            };
            let mut out = map.clone();
            out.insert(key.to_string(), new_value);
            Ok(Value::Map(out))
        }
        ValueFunction::Append(new_value) => {
            let new_value = resolve_argument(new_value, values)?;
            let Value::Array(items) = &value else {
                return Err(ResolveError::TypeMismatch {
                    function: "append",
                    expected: "array",
                    actual: value.type_name(),
                });
            };
            let mut out = items.clone();
            out.push(new_value);
            Ok(Value::Array(out))
        }
    }
}

/// Fully fills one item: resolve the identifier, apply the functions, and
/// render string results against the namespace.
///
/// The result is written back into `item` and the identifier flag cleared,
/// so the item reads as a literal afterwards. Filling an already-literal
/// item with no remaining template text is the identity.
///
/// # Errors
///
/// Returns [`ResolveError`] on unknown identifiers, function type errors,
/// and template failures.
pub fn fill_value_item(
    item: &mut ValueItem,
    values: &ValueMap,
    templates: &dyn TemplateEngine,
) -> Result<Value, ResolveError> {
    let resolved = resolve_identifier(item, values)?;
    let mut resolved = apply_functions(resolved, &item.functions, values)?;

    if let Value::String(text) = &resolved {
        let rendered = templates.render(text, values)?;
        resolved = Value::String(rendered);
    }

    item.item = resolved.clone();
    item.is_identifier = false;
    Ok(resolved)
}

/// Fills every `Input` entry of the map; other roles are untouched.
///
/// # Errors
///
/// Returns the first [`ResolveError`] encountered.
pub fn fill_input_value_item_map(
    map: &mut ValueItemMap,
    values: &ValueMap,
    templates: &dyn TemplateEngine,
) -> Result<(), ResolveError> {
    for item in map.values_mut() {
        if item.role == ValueRole::Input {
            fill_value_item(item, values, templates)?;
        }
    }
    Ok(())
}

/// Publishes a producer's output into the map's `Output` entries.
///
/// Each `Output` entry still carrying an identifier names a key in the
/// output value; the empty name selects the whole output. The selected
/// value is stored into the entry, which afterwards reads as a literal.
///
/// # Errors
///
/// Returns [`ResolveError::KeyNotFound`] when a named key is absent from
/// the output.
pub fn fill_output_value_item_map(
    map: &mut ValueItemMap,
    output: &Value,
) -> Result<(), ResolveError> {
    for item in map.values_mut() {
        if item.role != ValueRole::Output || !item.is_identifier {
            continue;
        }

        let name = item.item.as_str().unwrap_or_default().to_string();
        let selected = if name.is_empty() {
            output.clone()
        } else {
            output
                .get(&name)
                .cloned()
                .ok_or(ResolveError::KeyNotFound(name))?
        };

        item.item = selected;
        item.is_identifier = false;
    }
    Ok(())
}

/// Writes entries from `source` into `target` under the given mode.
pub fn override_values(target: &mut ValueMap, source: &ValueMap, mode: OverrideMode) {
    for (key, value) in source {
        write_value(target, key, value, mode);
    }
}

/// Writes the current item values of `source` into the namespace `target`.
///
/// Entries still unset are never copied; they carry no value yet.
pub fn override_values_with_items(
    target: &mut ValueMap,
    source: &ValueItemMap,
    mode: OverrideMode,
) {
    for (key, item) in source {
        write_value(target, key, &item.item, mode);
    }
}

/// Writes entries from one item map into another under the given mode.
pub fn override_item_maps(target: &mut ValueItemMap, source: &ValueItemMap, mode: OverrideMode) {
    for (key, item) in source {
        let exists = target.contains_key(key);
        let write = match mode {
            OverrideMode::All => true,
            OverrideMode::OnlyExisting => exists,
            OverrideMode::OnlyNew => !exists,
        };
        if write {
            target.insert(key.clone(), item.clone());
        }
    }
}

fn write_value(target: &mut ValueMap, key: &str, value: &Value, mode: OverrideMode) {
    if value.is_unset() {
        return;
    }
    let exists = target.contains_key(key);
    let write = match mode {
        OverrideMode::All => true,
        OverrideMode::OnlyExisting => exists,
        OverrideMode::OnlyNew => !exists,
    };
    if write {
        target.insert(key.to_string(), value.clone());
    }
}

/// Names of map entries still carrying an uninitialized value.
#[must_use]
pub fn uninitialized_keys(map: &ValueItemMap) -> Vec<String> {
    map.iter()
        .filter(|(_, item)| !item.is_identifier && item.item.is_unset())
        .map(|(key, _)| key.clone())
        .collect()
}
