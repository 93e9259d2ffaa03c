//! Tree interpreter.
//!
//! The [`TreeRunner`] walks an execution tree, dispatching on item kind:
//! sequential composites share its namespace, parallel composites and
//! parallel loops are fanned out to the worker pool as work units, blossoms
//! are driven through their four-phase lifecycle. Failures are values —
//! every method returns a `Result` and a failing child aborts exactly its
//! own scope.

use core::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use crate::blossom::grow;
use crate::context::EngineContext;
use crate::item::{
    BlossomGroupItem, BlossomItem, Compare, ForEachItem, ForItem, IfItem, ParallelItem,
    ResultState, SakuraItem, SequentialItem, SubtreeItem, TreeItem,
};
use crate::queue::{ActiveCounter, SubtreeObject, SubtreeQueue};
use crate::report::format_blossom_record;
use sakura_values::resolve::{
    fill_input_value_item_map, fill_output_value_item_map, fill_value_item, override_item_maps,
    override_values, override_values_with_items, uninitialized_keys,
};
use sakura_values::{OverrideMode, ResolveError, Value, ValueItem, ValueMap};

/// Errors that can occur while interpreting a tree.
#[derive(Debug)]
pub enum RunError {
    /// A value item could not be resolved.
    Resolve {
        /// Where resolution failed, for diagnostics.
        location: String,
        /// The underlying resolver error.
        source: ResolveError,
    },
    /// A tree still carried uninitialized values at its boundary.
    UninitializedValues {
        /// The tree's identifier.
        tree: String,
        /// The names still uninitialized.
        keys: Vec<String>,
    },
    /// No blossom is registered under the requested pair.
    UnknownBlossom {
        /// The requested group type.
        group_type: String,
        /// The requested blossom type.
        blossom_type: String,
    },
    /// A blossom lifecycle terminated in an error state.
    BlossomFailed {
        /// The blossom's type.
        blossom_type: String,
        /// The terminal state it reached.
        state: ResultState,
    },
    /// A subtree call named a tree the context does not know.
    UnknownSubtree(String),
    /// A loop bound did not resolve to an integer.
    NotAnInteger(&'static str),
    /// A for-each loop without an `"array"` entry holding an array.
    MissingIterationArray,
    /// One or more children of a parallel composite failed.
    ParallelFailure {
        /// Number of failed children.
        failed: usize,
        /// Total number of spawned children.
        total: usize,
    },
}

impl RunError {
    fn resolve(location: impl Into<String>) -> impl FnOnce(ResolveError) -> Self {
        let location = location.into();
        move |source| RunError::Resolve { location, source }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Resolve { location, source } => {
                write!(f, "failed to resolve values of {location}: {source}")
            }
            RunError::UninitializedValues { tree, keys } => {
                write!(
                    f,
                    "tree '{tree}' has uninitialized values: {}",
                    keys.join(", ")
                )
            }
            RunError::UnknownBlossom {
                group_type,
                blossom_type,
            } => write!(f, "unknown blossom-type: {group_type}/{blossom_type}"),
            RunError::BlossomFailed {
                blossom_type,
                state,
            } => write!(f, "blossom '{blossom_type}' failed: {state}"),
            RunError::UnknownSubtree(name) => write!(f, "unknown subtree: {name}"),
            RunError::NotAnInteger(what) => {
                write!(f, "loop bound '{what}' is not an integer")
            }
            RunError::MissingIterationArray => {
                write!(f, "for-each loop has no array to iterate")
            }
            RunError::ParallelFailure { failed, total } => {
                write!(f, "{failed} of {total} parallel children failed")
            }
        }
    }
}

impl core::error::Error for RunError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            RunError::Resolve { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Recursive interpreter over one working copy of a tree.
///
/// A runner owns its namespace; namespaces are never shared across workers
/// as aliases. Parallel constructs hand namespace copies to work units and
/// re-import results through explicit override steps.
pub struct TreeRunner {
    queue: Arc<SubtreeQueue>,
    ctx: Arc<EngineContext>,
    parent_values: ValueMap,
    hierarchy: Vec<String>,
}

impl TreeRunner {
    /// Creates a runner over the given namespace and breadcrumb.
    #[must_use]
    pub fn new(
        queue: Arc<SubtreeQueue>,
        ctx: Arc<EngineContext>,
        parent_values: ValueMap,
        hierarchy: Vec<String>,
    ) -> Self {
        Self {
            queue,
            ctx,
            parent_values,
            hierarchy,
        }
    }

    /// The runner's current namespace.
    #[must_use]
    pub fn values(&self) -> &ValueMap {
        &self.parent_values
    }

    /// Interprets one item of the working tree.
    ///
    /// Returns a boxed future to support recursion through nested
    /// composites.
    ///
    /// # Errors
    ///
    /// Returns [`RunError`] when the item or any of its children fails;
    /// the failure has already been recorded on the item at that point.
    pub fn process_item<'a>(
        &'a mut self,
        item: &'a mut SakuraItem,
    ) -> BoxFuture<'a, Result<(), RunError>> {
        Box::pin(async move {
            tracing::trace!(kind = item.kind(), "processing item");
            match item {
                SakuraItem::Tree(tree) => {
                    self.hierarchy.push(format!("TREE: {}", tree.id));
                    let result = self.process_tree(tree).await;
                    self.hierarchy.pop();
                    result
                }
                SakuraItem::Subtree(subtree) => self.process_subtree(subtree).await,
                SakuraItem::Blossom(blossom) => self.process_blossom(blossom).await,
                SakuraItem::BlossomGroup(group) => self.process_blossom_group(group).await,
                SakuraItem::Seed(seed) => self.process_item(&mut seed.child).await,
                SakuraItem::Sequential(sequential) => self.process_sequential(sequential).await,
                SakuraItem::Parallel(parallel) => self.process_parallel(parallel).await,
                SakuraItem::If(branching) => self.process_if(branching).await,
                SakuraItem::For(looping) => self.process_for(looping).await,
                SakuraItem::ForEach(looping) => self.process_for_each(looping).await,
            }
        })
    }

    /// Runs a tree: refuses while any declared value is uninitialized,
    /// then runs the children in order.
    async fn process_tree(&mut self, tree: &mut TreeItem) -> Result<(), RunError> {
        let uninitialized = uninitialized_keys(&tree.values);
        if !uninitialized.is_empty() {
            return Err(RunError::UninitializedValues {
                tree: tree.id.clone(),
                keys: uninitialized,
            });
        }

        for child in &mut tree.children {
            self.process_item(child).await?;
        }
        Ok(())
    }

    async fn process_sequential(
        &mut self,
        sequential: &mut SequentialItem,
    ) -> Result<(), RunError> {
        for child in &mut sequential.children {
            self.process_item(child).await?;
        }
        Ok(())
    }

    /// Executes one blossom against the current namespace.
    ///
    /// The diagnostic record is emitted on every attempted execution,
    /// before the failure (if any) propagates.
    async fn process_blossom(&mut self, item: &mut BlossomItem) -> Result<(), RunError> {
        if item.name_hierarchy.is_empty() {
            item.name_hierarchy = self.hierarchy.clone();
            item.name_hierarchy
                .push(format!("BLOSSOM: {}", item.blossom_type));
        }

        if let Err(source) = fill_input_value_item_map(
            &mut item.values,
            &self.parent_values,
            self.ctx.templates.as_ref(),
        ) {
            item.fail(format!("error while filling blossom values: {source}"));
            item.result_state = ResultState::ErrorInit;
            self.ctx.sink.record(&format_blossom_record(item));
            return Err(RunError::resolve(format!("blossom '{}'", item.blossom_type))(source));
        }

        let Some(mut blossom) = self
            .ctx
            .registry
            .create(&item.group_type, &item.blossom_type)
        else {
            item.fail("unknown blossom-type");
            item.result_state = ResultState::ErrorInit;
            self.ctx.sink.record(&format_blossom_record(item));
            return Err(RunError::UnknownBlossom {
                group_type: item.group_type.clone(),
                blossom_type: item.blossom_type.clone(),
            });
        };

        let missing = blossom.schema().missing_required(&item.values);
        if !missing.is_empty() {
            item.fail(format!("following keys are not set: {}", missing.join(", ")));
            item.result_state = ResultState::ErrorInit;
            self.ctx.sink.record(&format_blossom_record(item));
            return Err(RunError::BlossomFailed {
                blossom_type: item.blossom_type.clone(),
                state: ResultState::ErrorInit,
            });
        }

        item.parent_values = self.parent_values.clone();
        grow(blossom.as_mut(), item).await;
        self.ctx.sink.record(&format_blossom_record(item));

        if !item.success {
            tracing::warn!(
                blossom_type = %item.blossom_type,
                state = %item.result_state,
                "blossom failed"
            );
            return Err(RunError::BlossomFailed {
                blossom_type: item.blossom_type.clone(),
                state: item.result_state,
            });
        }

        if blossom.schema().has_output() {
            fill_output_value_item_map(&mut item.values, &item.output)
                .map_err(RunError::resolve(format!("blossom '{}'", item.blossom_type)))?;
        }

        override_values_with_items(
            &mut self.parent_values,
            &item.values,
            OverrideMode::OnlyExisting,
        );
        Ok(())
    }

    /// Runs a group's blossoms in order, aborting on the first failure.
    ///
    /// Each blossom inherits the group type and the group's values as
    /// defaults, and carries the group id (template-rendered against the
    /// namespace) in its breadcrumb.
    async fn process_blossom_group(
        &mut self,
        group: &mut BlossomGroupItem,
    ) -> Result<(), RunError> {
        for blossom in &mut group.blossoms {
            blossom.group_type = group.group_type.clone();
            override_item_maps(&mut blossom.values, &group.values, OverrideMode::OnlyNew);

            let id = self
                .ctx
                .templates
                .render(&group.id, &self.parent_values)
                .map_err(|source| {
                    RunError::resolve(format!("blossom-group '{}'", group.id))(source.into())
                })?;
            blossom.name_hierarchy = self.hierarchy.clone();
            blossom.name_hierarchy.push(format!("BLOSSOM: {id}"));

            self.process_blossom(blossom).await?;
        }
        Ok(())
    }

    /// Calls a named tree on a fresh copy.
    ///
    /// Caller arguments override the tree's declared defaults; the merged
    /// values become visible in the caller's namespace downstream.
    async fn process_subtree(&mut self, subtree: &mut SubtreeItem) -> Result<(), RunError> {
        let Some(tree) = self.ctx.trees.get(&subtree.name_or_path) else {
            return Err(RunError::UnknownSubtree(subtree.name_or_path.clone()));
        };
        let mut copy = tree.clone();

        fill_input_value_item_map(
            &mut subtree.values,
            &self.parent_values,
            self.ctx.templates.as_ref(),
        )
        .map_err(RunError::resolve(format!(
            "subtree '{}'",
            subtree.name_or_path
        )))?;
        override_item_maps(copy.values_mut(), &subtree.values, OverrideMode::All);

        if !subtree.internal_subtrees.is_empty() {
            let mut internal = ValueMap::new();
            for (name, pack) in &mut subtree.internal_subtrees {
                let mut rendered = ValueMap::new();
                for (key, value_item) in pack.iter_mut() {
                    let value = fill_value_item(
                        value_item,
                        &self.parent_values,
                        self.ctx.templates.as_ref(),
                    )
                    .map_err(RunError::resolve(format!(
                        "subtree '{}'",
                        subtree.name_or_path
                    )))?;
                    rendered.insert(key.clone(), value);
                }
                internal.insert(name.clone(), Value::Map(rendered));
            }
            copy.values_mut().insert(
                "internal_subtypes".to_string(),
                ValueItem::literal(Value::Map(internal)),
            );
        }

        override_values_with_items(&mut self.parent_values, copy.values(), OverrideMode::All);
        self.process_item(&mut copy).await
    }

    /// Evaluates the condition and runs exactly one branch.
    async fn process_if(&mut self, branching: &mut IfItem) -> Result<(), RunError> {
        let left = fill_value_item(
            &mut branching.left,
            &self.parent_values,
            self.ctx.templates.as_ref(),
        )
        .map_err(RunError::resolve("if-condition"))?
        .to_string();
        let right = fill_value_item(
            &mut branching.right,
            &self.parent_values,
            self.ctx.templates.as_ref(),
        )
        .map_err(RunError::resolve("if-condition"))?
        .to_string();

        let matched = match branching.op {
            Compare::Eq => left == right,
            Compare::Neq => left != right,
            Compare::Gt => ordered(&left, &right, |o| o.is_gt()),
            Compare::Ge => ordered(&left, &right, |o| o.is_ge()),
            Compare::Lt => ordered(&left, &right, |o| o.is_lt()),
            Compare::Le => ordered(&left, &right, |o| o.is_le()),
        };

        if matched {
            self.process_item(&mut branching.then_branch).await
        } else {
            self.process_item(&mut branching.else_branch).await
        }
    }

    /// Runs a counter loop, sequentially or fanned out.
    async fn process_for(&mut self, looping: &mut ForItem) -> Result<(), RunError> {
        let start = fill_value_item(
            &mut looping.start,
            &self.parent_values,
            self.ctx.templates.as_ref(),
        )
        .map_err(RunError::resolve("for-loop"))?
        .as_int()
        .ok_or(RunError::NotAnInteger("start"))?;
        let end = fill_value_item(
            &mut looping.end,
            &self.parent_values,
            self.ctx.templates.as_ref(),
        )
        .map_err(RunError::resolve("for-loop"))?
        .as_int()
        .ok_or(RunError::NotAnInteger("end"))?;

        let counters: Vec<Value> = (start..end).map(Value::Int).collect();
        if looping.parallel {
            self.run_loop_parallel(
                &looping.counter_name,
                counters,
                &looping.body,
                &mut looping.values,
            )
            .await
        } else {
            self.run_loop_sequential(&looping.counter_name, counters, &looping.body)
                .await
        }
    }

    /// Runs a value-indexed loop, sequentially or fanned out.
    async fn process_for_each(&mut self, looping: &mut ForEachItem) -> Result<(), RunError> {
        fill_input_value_item_map(
            &mut looping.iterable,
            &self.parent_values,
            self.ctx.templates.as_ref(),
        )
        .map_err(RunError::resolve("for-each-loop"))?;

        let elements: Vec<Value> = looping
            .iterable
            .get(ForEachItem::ARRAY_KEY)
            .and_then(|entry| entry.item.as_array())
            .ok_or(RunError::MissingIterationArray)?
            .to_vec();

        if looping.parallel {
            self.run_loop_parallel(
                &looping.counter_name,
                elements,
                &looping.body,
                &mut looping.values,
            )
            .await
        } else {
            self.run_loop_sequential(&looping.counter_name, elements, &looping.body)
                .await
        }
    }

    /// Sequential loop core: bind the counter, run a body copy per
    /// iteration, and contain loop-internal bindings afterwards.
    ///
    /// Only keys that existed before the loop propagate out; the counter
    /// and any transient bindings stay inside.
    async fn run_loop_sequential(
        &mut self,
        counter_name: &str,
        counters: Vec<Value>,
        body: &SakuraItem,
    ) -> Result<(), RunError> {
        let before = self.parent_values.clone();

        for counter in counters {
            self.parent_values.insert(counter_name.to_string(), counter);
            let mut iteration = body.clone();
            self.process_item(&mut iteration).await?;
        }

        let after = std::mem::replace(&mut self.parent_values, before);
        override_values(&mut self.parent_values, &after, OverrideMode::OnlyExisting);
        Ok(())
    }

    /// Parallel loop core: one work unit per iteration, all sharing one
    /// counter; waits for every unit, then aggregates.
    ///
    /// Aggregation re-fills the loop's declared values from each unit's
    /// final namespace in spawn order; filling consumes identifiers, so
    /// the first unit to provide a key wins. A failing unit never cancels
    /// its siblings; the failure propagates after all of them completed.
    async fn run_loop_parallel(
        &mut self,
        counter_name: &str,
        counters: Vec<Value>,
        body: &SakuraItem,
        loop_values: &mut sakura_values::ValueItemMap,
    ) -> Result<(), RunError> {
        let mut internal_values = self.parent_values.clone();
        let counter = Arc::new(ActiveCounter::new(counters.len() as u32));
        let total = counters.len();
        let mut spawned = Vec::with_capacity(total);

        for value in counters {
            internal_values.insert(counter_name.to_string(), value);
            let unit = Arc::new(SubtreeObject::new(
                body.clone(),
                internal_values.clone(),
                self.hierarchy.clone(),
                counter.clone(),
            ));
            self.queue.push(unit.clone());
            spawned.push(unit);
        }

        drain_until_done(&counter, &self.queue, &self.ctx).await;

        let mut failed = 0;
        for unit in &spawned {
            if !unit.succeeded() {
                failed += 1;
                continue;
            }
            fill_input_value_item_map(
                loop_values,
                &unit.items(),
                self.ctx.templates.as_ref(),
            )
            .map_err(RunError::resolve("loop aggregation"))?;
        }
        override_values_with_items(
            &mut self.parent_values,
            loop_values,
            OverrideMode::OnlyExisting,
        );

        if failed > 0 {
            return Err(RunError::ParallelFailure { failed, total });
        }
        Ok(())
    }

    /// Fans a fixed child list out to the worker pool.
    ///
    /// Every child runs on its own namespace copy; results are not merged
    /// back. Parallel siblings communicate through explicit outputs only.
    async fn process_parallel(&mut self, parallel: &mut ParallelItem) -> Result<(), RunError> {
        let total = parallel.children.len();
        let counter = Arc::new(ActiveCounter::new(total as u32));
        let mut spawned = Vec::with_capacity(total);

        for child in &parallel.children {
            let unit = Arc::new(SubtreeObject::new(
                child.clone(),
                self.parent_values.clone(),
                self.hierarchy.clone(),
                counter.clone(),
            ));
            self.queue.push(unit.clone());
            spawned.push(unit);
        }

        drain_until_done(&counter, &self.queue, &self.ctx).await;

        let failed = spawned.iter().filter(|unit| !unit.succeeded()).count();
        if failed > 0 {
            return Err(RunError::ParallelFailure { failed, total });
        }
        Ok(())
    }
}

/// Compares under ordering semantics: integers when both sides parse as
/// such, lexicographic otherwise.
fn ordered(left: &str, right: &str, check: fn(core::cmp::Ordering) -> bool) -> bool {
    let ordering = match (left.parse::<i64>(), right.parse::<i64>()) {
        (Ok(left), Ok(right)) => left.cmp(&right),
        _ => left.cmp(right),
    };
    check(ordering)
}

/// Processes one dequeued work unit end to end.
///
/// The namespace is assembled from the subtree's declared values overlaid
/// with the unit's input items; results flow back into the unit's items
/// (existing keys only), and the counter increment is the final step so
/// producers observing completion also observe the results.
pub(crate) async fn process_unit(
    unit: &Arc<SubtreeObject>,
    queue: &Arc<SubtreeQueue>,
    ctx: &Arc<EngineContext>,
) {
    let Some(mut subtree) = unit.take_subtree() else {
        unit.counter.increment();
        return;
    };

    let mut parent_values = ValueMap::new();
    override_values_with_items(&mut parent_values, subtree.values(), OverrideMode::All);
    override_values(&mut parent_values, &unit.items(), OverrideMode::All);

    let mut runner = TreeRunner::new(
        queue.clone(),
        ctx.clone(),
        parent_values,
        unit.hierarchy.clone(),
    );
    let result = runner.process_item(&mut subtree).await;
    if let Err(error) = &result {
        tracing::debug!(%error, "work unit failed");
    }

    unit.store_items(runner.values());
    unit.finish(result);
    unit.counter.increment();
}

/// Waits on a counter while helping drain the queue.
///
/// A producer blocked on its batch would otherwise occupy a worker slot
/// doing nothing; with every waiter also pulling units, nested parallelism
/// cannot starve a small pool.
pub(crate) async fn drain_until_done(
    counter: &ActiveCounter,
    queue: &Arc<SubtreeQueue>,
    ctx: &Arc<EngineContext>,
) {
    while !counter.is_done() {
        match queue.pop() {
            Some(unit) => process_unit(&unit, queue, ctx).await,
            None => tokio::time::sleep(Duration::from_millis(10)).await,
        }
    }
}
