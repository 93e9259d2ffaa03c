//! Static checks on a compiled tree.
//!
//! Validation runs once, before execution: every blossom must be
//! registered and carry its required keys, output declarations must match
//! the blossom's schema, subtree calls must name known trees, and the tree
//! being run must not carry uninitialized values. A non-empty error list
//! is a hard failure.

use core::fmt;

use crate::context::EngineContext;
use crate::item::{BlossomItem, SakuraItem};
use sakura_values::resolve::uninitialized_keys;
use sakura_values::{ValueItemMap, ValueRole};

/// One human-readable validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Path of node labels down to the offending item.
    pub location: String,
    /// What is wrong.
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "in {}: {}", self.location, self.message)
    }
}

/// Validates a compiled tree against the engine context.
///
/// Returns every finding instead of stopping at the first one.
#[must_use]
pub fn validate_tree(item: &SakuraItem, ctx: &EngineContext) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut location = Vec::new();
    walk(item, ctx, &mut location, None, &mut errors);
    errors
}

fn walk(
    item: &SakuraItem,
    ctx: &EngineContext,
    location: &mut Vec<String>,
    group_type: Option<&str>,
    errors: &mut Vec<ValidationError>,
) {
    match item {
        SakuraItem::Tree(tree) => {
            location.push(format!("tree:{}", tree.id));
            let uninitialized = uninitialized_keys(&tree.values);
            if !uninitialized.is_empty() {
                push_error(
                    location,
                    format!("uninitialized values: {}", uninitialized.join(", ")),
                    errors,
                );
            }
            for child in &tree.children {
                walk(child, ctx, location, group_type, errors);
            }
            location.pop();
        }
        SakuraItem::Subtree(subtree) => {
            location.push(format!("subtree:{}", subtree.name_or_path));
            if !ctx.trees.contains_key(&subtree.name_or_path) {
                push_error(location, "unknown subtree".to_string(), errors);
            }
            location.pop();
        }
        SakuraItem::Blossom(blossom) => {
            check_blossom(blossom, ctx, location, group_type, None, errors);
        }
        SakuraItem::BlossomGroup(group) => {
            location.push(format!("blossom_group:{}", group.id));
            for blossom in &group.blossoms {
                check_blossom(
                    blossom,
                    ctx,
                    location,
                    Some(&group.group_type),
                    Some(&group.values),
                    errors,
                );
            }
            location.pop();
        }
        SakuraItem::Seed(seed) => {
            location.push(format!("seed:{}", seed.address));
            walk(&seed.child, ctx, location, group_type, errors);
            location.pop();
        }
        SakuraItem::Sequential(sequential) => {
            for child in &sequential.children {
                walk(child, ctx, location, group_type, errors);
            }
        }
        SakuraItem::Parallel(parallel) => {
            for child in &parallel.children {
                walk(child, ctx, location, group_type, errors);
            }
        }
        SakuraItem::If(branching) => {
            location.push("if".to_string());
            walk(&branching.then_branch, ctx, location, group_type, errors);
            walk(&branching.else_branch, ctx, location, group_type, errors);
            location.pop();
        }
        SakuraItem::For(looping) => {
            location.push(format!("for:{}", looping.counter_name));
            walk(&looping.body, ctx, location, group_type, errors);
            location.pop();
        }
        SakuraItem::ForEach(looping) => {
            location.push(format!("for_each:{}", looping.counter_name));
            walk(&looping.body, ctx, location, group_type, errors);
            location.pop();
        }
    }
}

fn check_blossom(
    blossom: &BlossomItem,
    ctx: &EngineContext,
    location: &mut Vec<String>,
    group_type: Option<&str>,
    prelude: Option<&ValueItemMap>,
    errors: &mut Vec<ValidationError>,
) {
    location.push(format!("blossom:{}", blossom.blossom_type));

    let effective_group = if blossom.group_type.is_empty() {
        group_type.unwrap_or_default()
    } else {
        &blossom.group_type
    };

    let Some(schema) = ctx.registry.schema(effective_group, &blossom.blossom_type) else {
        push_error(
            location,
            format!(
                "unknown blossom-type: {effective_group}/{}",
                blossom.blossom_type
            ),
            errors,
        );
        location.pop();
        return;
    };

    // Group prelude values count as provided when checking required keys.
    let mut declared = blossom.values.clone();
    if let Some(prelude) = prelude {
        for (key, item) in prelude {
            declared.entry(key.clone()).or_insert_with(|| item.clone());
        }
    }
    let missing = schema.missing_required(&declared);
    if !missing.is_empty() {
        push_error(
            location,
            format!("required keys are not set: {}", missing.join(", ")),
            errors,
        );
    }

    let has_output_items = blossom
        .values
        .values()
        .any(|item| item.role == ValueRole::Output);
    if has_output_items && !schema.has_output() {
        push_error(
            location,
            "output values declared, but the blossom produces no output".to_string(),
            errors,
        );
    }

    location.pop();
}

fn push_error(location: &[String], message: String, errors: &mut Vec<ValidationError>) {
    errors.push(ValidationError {
        location: location.join("/"),
        message,
    });
}
