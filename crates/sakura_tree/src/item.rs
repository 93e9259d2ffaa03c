//! Tree nodes for all control-flow and task kinds.
//!
//! A compiled tree is a [`SakuraItem`] graph produced by an external
//! converter. Every non-leaf node owns its children; deep copy via `Clone`
//! is supported and required for parallel loop bodies. The compiled tree is
//! never mutated by the interpreter — per-execution result fields on
//! [`BlossomItem`] live on working copies.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use sakura_values::{Value, ValueItem, ValueItemMap};

/// A node in the execution tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SakuraItem {
    /// Top-level node of a file-level tree.
    Tree(TreeItem),
    /// Call of a named tree with caller-supplied values.
    Subtree(SubtreeItem),
    /// Atomic task leaf.
    Blossom(BlossomItem),
    /// Named sequence of blossoms sharing a group type and prelude values.
    BlossomGroup(BlossomGroupItem),
    /// Remote-invocation descriptor carrying a payload tree.
    Seed(SeedItem),
    /// Children in declared order, sharing the namespace.
    Sequential(SequentialItem),
    /// Children fanned out to the worker pool on namespace copies.
    Parallel(ParallelItem),
    /// Two-way branch on a value comparison.
    If(IfItem),
    /// Bounded counter loop.
    For(ForItem),
    /// Value-indexed loop over an array.
    ForEach(ForEachItem),
}

impl SakuraItem {
    /// The node's declared values.
    #[must_use]
    pub fn values(&self) -> &ValueItemMap {
        match self {
            SakuraItem::Tree(item) => &item.values,
            SakuraItem::Subtree(item) => &item.values,
            SakuraItem::Blossom(item) => &item.values,
            SakuraItem::BlossomGroup(item) => &item.values,
            SakuraItem::Seed(item) => &item.values,
            SakuraItem::Sequential(item) => &item.values,
            SakuraItem::Parallel(item) => &item.values,
            SakuraItem::If(item) => &item.values,
            SakuraItem::For(item) => &item.values,
            SakuraItem::ForEach(item) => &item.values,
        }
    }

    /// Mutable access to the node's declared values.
    pub fn values_mut(&mut self) -> &mut ValueItemMap {
        match self {
            SakuraItem::Tree(item) => &mut item.values,
            SakuraItem::Subtree(item) => &mut item.values,
            SakuraItem::Blossom(item) => &mut item.values,
            SakuraItem::BlossomGroup(item) => &mut item.values,
            SakuraItem::Seed(item) => &mut item.values,
            SakuraItem::Sequential(item) => &mut item.values,
            SakuraItem::Parallel(item) => &mut item.values,
            SakuraItem::If(item) => &mut item.values,
            SakuraItem::For(item) => &mut item.values,
            SakuraItem::ForEach(item) => &mut item.values,
        }
    }

    /// Short name of the node kind, for diagnostics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            SakuraItem::Tree(_) => "tree",
            SakuraItem::Subtree(_) => "subtree",
            SakuraItem::Blossom(_) => "blossom",
            SakuraItem::BlossomGroup(_) => "blossom_group",
            SakuraItem::Seed(_) => "seed",
            SakuraItem::Sequential(_) => "sequential",
            SakuraItem::Parallel(_) => "parallel",
            SakuraItem::If(_) => "if",
            SakuraItem::For(_) => "for",
            SakuraItem::ForEach(_) => "for_each",
        }
    }
}

/// Terminal state of one blossom execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultState {
    /// Not executed yet.
    #[default]
    Undefined,
    /// The desired state already held; nothing was done.
    Skipped,
    /// The side effect was performed and verified.
    Changed,
    /// Input parsing or type checking failed.
    ErrorInit,
    /// The idempotence probe failed.
    ErrorPreCheck,
    /// The side effect itself failed.
    ErrorExec,
    /// The effect could not be observed afterwards.
    ErrorPostCheck,
    /// Resource teardown failed.
    ErrorClose,
}

impl ResultState {
    /// True for the two non-error terminal states.
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, ResultState::Skipped | ResultState::Changed)
    }
}

impl core::fmt::Display for ResultState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let label = match self {
            ResultState::Undefined => "undefined",
            ResultState::Skipped => "skipped",
            ResultState::Changed => "changed",
            ResultState::ErrorInit => "error in init-state",
            ResultState::ErrorPreCheck => "error in pre-check-state",
            ResultState::ErrorExec => "error in exec-state",
            ResultState::ErrorPostCheck => "error in post-check-state",
            ResultState::ErrorClose => "error in close-state",
        };
        write!(f, "{label}")
    }
}

/// Comparison operator of an [`IfItem`].
///
/// `Eq`/`Neq` compare string forms. The ordering operators compare as
/// integers when both sides parse as such, lexicographically otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compare {
    /// Equal.
    Eq,
    /// Not equal.
    Neq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
}

/// Top-level node of a file-level tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TreeItem {
    /// Tree identifier, used in diagnostics.
    pub id: String,
    /// Declared values; none may still be uninitialized when the tree runs.
    pub values: ValueItemMap,
    /// Children, executed in declared order.
    pub children: Vec<SakuraItem>,
}

impl TreeItem {
    /// Creates an empty tree with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// Call of a named tree.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubtreeItem {
    /// Name (or path) the tree handler resolves to a tree.
    pub name_or_path: String,
    /// Caller-supplied arguments, merged over the tree's own defaults.
    pub values: ValueItemMap,
    /// Named argument packs for nested subtree references.
    pub internal_subtrees: IndexMap<String, ValueItemMap>,
}

impl SubtreeItem {
    /// Creates a call of the named tree.
    #[must_use]
    pub fn new(name_or_path: impl Into<String>) -> Self {
        Self {
            name_or_path: name_or_path.into(),
            ..Self::default()
        }
    }
}

/// Atomic task leaf.
///
/// The fields below `values` are per-execution state: they are written by
/// the engine and the blossom implementation while a working copy of the
/// item runs, and feed the diagnostic record afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlossomItem {
    /// Blossom group the implementation is looked up under.
    pub group_type: String,
    /// Blossom type within the group.
    pub blossom_type: String,
    /// Source location, for diagnostics.
    pub path: String,
    /// Declared inputs and outputs.
    pub values: ValueItemMap,
    /// Breadcrumb of node labels down to this blossom.
    pub name_hierarchy: Vec<String>,
    /// Snapshot of the caller's namespace, readable by the implementation.
    pub parent_values: sakura_values::ValueMap,
    /// Output produced by the implementation, if it declares one.
    pub output: Value,
    /// Phase outcome flag; false aborts the lifecycle.
    pub success: bool,
    /// Set by the pre-check when the desired state already holds.
    pub skip: bool,
    /// Human-readable outcome or error text.
    pub message: String,
    /// Exit code of an external process, when one ran.
    pub exec_state: i32,
    /// Terminal state of this execution.
    pub result_state: ResultState,
}

impl BlossomItem {
    /// Creates a blossom leaf of the given group and type.
    #[must_use]
    pub fn new(group_type: impl Into<String>, blossom_type: impl Into<String>) -> Self {
        Self {
            group_type: group_type.into(),
            blossom_type: blossom_type.into(),
            ..Self::default()
        }
    }

    /// Adds a declared value.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, item: ValueItem) -> Self {
        self.values.insert(key.into(), item);
        self
    }

    /// The current value of an input entry, once filled.
    #[must_use]
    pub fn input_value(&self, key: &str) -> Option<&Value> {
        let item = self.values.get(key)?;
        if item.item.is_unset() {
            return None;
        }
        Some(&item.item)
    }

    /// String form of an input entry.
    #[must_use]
    pub fn input_str(&self, key: &str) -> Option<&str> {
        self.input_value(key)?.as_str()
    }

    /// Boolean form of an input entry.
    #[must_use]
    pub fn input_bool(&self, key: &str) -> Option<bool> {
        self.input_value(key)?.as_bool()
    }

    /// Integer form of an input entry.
    #[must_use]
    pub fn input_int(&self, key: &str) -> Option<i64> {
        self.input_value(key)?.as_int()
    }

    /// Marks the current phase as failed with a message.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.success = false;
        self.message = message.into();
    }
}

/// Named sequence of blossoms sharing a group type and prelude values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlossomGroupItem {
    /// Group identifier; may contain template placeholders.
    pub id: String,
    /// Group type inherited by every child blossom.
    pub group_type: String,
    /// Prelude values merged into each child as defaults.
    pub values: ValueItemMap,
    /// The blossoms, executed in declared order.
    pub blossoms: Vec<BlossomItem>,
}

impl BlossomGroupItem {
    /// Creates an empty group.
    #[must_use]
    pub fn new(id: impl Into<String>, group_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            group_type: group_type.into(),
            ..Self::default()
        }
    }
}

/// Remote-invocation descriptor.
///
/// The local interpreter treats a seed as equivalent to its payload tree;
/// the connection fields only matter to a remote transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedItem {
    /// Target host address.
    pub address: String,
    /// SSH port on the target host.
    pub ssh_port: u16,
    /// SSH user on the target host.
    pub ssh_user: String,
    /// Path to the SSH key.
    pub ssh_key: String,
    /// Serialized payload shipped to the host.
    pub content: String,
    /// Declared values.
    pub values: ValueItemMap,
    /// The payload tree, executed locally in place of the seed.
    pub child: Box<SakuraItem>,
}

/// Children in declared order, sharing the namespace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SequentialItem {
    /// Declared values.
    pub values: ValueItemMap,
    /// Children, executed in declared order.
    pub children: Vec<SakuraItem>,
}

impl SequentialItem {
    /// Creates a sequential composite over the given children.
    #[must_use]
    pub fn new(children: Vec<SakuraItem>) -> Self {
        Self {
            values: ValueItemMap::new(),
            children,
        }
    }
}

/// Children fanned out to the worker pool on namespace copies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParallelItem {
    /// Declared values.
    pub values: ValueItemMap,
    /// Children, executed concurrently without ordering guarantees.
    pub children: Vec<SakuraItem>,
}

impl ParallelItem {
    /// Creates a parallel composite over the given children.
    #[must_use]
    pub fn new(children: Vec<SakuraItem>) -> Self {
        Self {
            values: ValueItemMap::new(),
            children,
        }
    }
}

/// Two-way branch on a value comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfItem {
    /// Declared values.
    pub values: ValueItemMap,
    /// Left side of the comparison.
    pub left: ValueItem,
    /// Right side of the comparison.
    pub right: ValueItem,
    /// Comparison operator.
    pub op: Compare,
    /// Executed when the comparison holds.
    pub then_branch: Box<SakuraItem>,
    /// Executed when the comparison does not hold.
    pub else_branch: Box<SakuraItem>,
}

impl IfItem {
    /// Creates a branch comparing `left` and `right` under `op`.
    #[must_use]
    pub fn new(
        left: ValueItem,
        op: Compare,
        right: ValueItem,
        then_branch: SakuraItem,
        else_branch: SakuraItem,
    ) -> Self {
        Self {
            values: ValueItemMap::new(),
            left,
            right,
            op,
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        }
    }
}

/// Bounded counter loop over `start..end`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForItem {
    /// Declared values; in parallel mode these collect iteration results.
    pub values: ValueItemMap,
    /// Name the running counter is bound to inside the body.
    pub counter_name: String,
    /// Inclusive start of the counter range.
    pub start: ValueItem,
    /// Exclusive end of the counter range.
    pub end: ValueItem,
    /// Loop body, deep-copied per iteration.
    pub body: Box<SakuraItem>,
    /// Fan iterations out to the worker pool instead of running in order.
    pub parallel: bool,
}

/// Value-indexed loop over an array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForEachItem {
    /// Declared values; in parallel mode these collect iteration results.
    pub values: ValueItemMap,
    /// Name each element is bound to inside the body.
    pub counter_name: String,
    /// Holds the iterated array under the key `"array"`.
    pub iterable: ValueItemMap,
    /// Loop body, deep-copied per iteration.
    pub body: Box<SakuraItem>,
    /// Fan iterations out to the worker pool instead of running in order.
    pub parallel: bool,
}

impl ForEachItem {
    /// Key of the iterated array inside [`ForEachItem::iterable`].
    pub const ARRAY_KEY: &'static str = "array";
}

#[cfg(test)]
mod tests {
    use super::*;
    use sakura_values::ValueItem;

    #[test]
    fn values_accessor_covers_every_kind() {
        let mut blossom = BlossomItem::new("special", "cmd");
        blossom
            .values
            .insert("command".to_string(), ValueItem::literal("true"));
        let item = SakuraItem::Blossom(blossom);
        assert_eq!(item.values().len(), 1);
        assert_eq!(item.kind(), "blossom");
    }

    #[test]
    fn deep_copy_detaches_result_state() {
        let mut original = BlossomItem::new("special", "cmd");
        let mut copy = original.clone();
        copy.result_state = ResultState::Changed;
        copy.success = true;

        assert_eq!(original.result_state, ResultState::Undefined);
        original.fail("boom");
        assert_eq!(copy.message, "");
    }

    #[test]
    fn input_helpers_ignore_unset_entries() {
        let blossom = BlossomItem::new("special", "cmd")
            .with_value("pending", ValueItem::literal(Value::Unset))
            .with_value("flag", ValueItem::literal(Value::Bool(true)));

        assert_eq!(blossom.input_value("pending"), None);
        assert_eq!(blossom.input_bool("flag"), Some(true));
        assert_eq!(blossom.input_str("missing"), None);
    }

    #[test]
    fn result_state_success_covers_skipped_and_changed() {
        assert!(ResultState::Skipped.is_success());
        assert!(ResultState::Changed.is_success());
        assert!(!ResultState::ErrorExec.is_success());
        assert!(!ResultState::Undefined.is_success());
    }
}
