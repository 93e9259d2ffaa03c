//! The blossom contract and its four-phase lifecycle driver.
//!
//! A blossom is the atomic task unit executed by the engine. Each phase
//! receives the mutable working [`BlossomItem`] and communicates only
//! through its fields: `success` aborts the lifecycle, `skip` short-cuts
//! it, `message` and `output` carry results.

use async_trait::async_trait;

use crate::item::{BlossomItem, ResultState};
use sakura_values::ValueItemMap;

/// Static input/output schema a blossom declares.
///
/// The engine enforces required keys before `init` runs; the validator
/// checks them statically against the compiled tree.
#[derive(Debug, Clone, Default)]
pub struct BlossomSchema {
    keys: Vec<SchemaKey>,
    has_output: bool,
}

#[derive(Debug, Clone)]
struct SchemaKey {
    name: &'static str,
    required: bool,
}

impl BlossomSchema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a key the caller must provide.
    #[must_use]
    pub fn required(mut self, name: &'static str) -> Self {
        self.keys.push(SchemaKey {
            name,
            required: true,
        });
        self
    }

    /// Declares a key the caller may provide.
    #[must_use]
    pub fn optional(mut self, name: &'static str) -> Self {
        self.keys.push(SchemaKey {
            name,
            required: false,
        });
        self
    }

    /// Declares that this blossom produces an output value.
    #[must_use]
    pub fn with_output(mut self) -> Self {
        self.has_output = true;
        self
    }

    /// Whether this blossom produces an output value.
    #[must_use]
    pub fn has_output(&self) -> bool {
        self.has_output
    }

    /// All declared key names.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.keys.iter().map(|key| key.name)
    }

    /// Required keys absent from the given value map.
    #[must_use]
    pub fn missing_required(&self, values: &ValueItemMap) -> Vec<&'static str> {
        self.keys
            .iter()
            .filter(|key| key.required && !values.contains_key(key.name))
            .map(|key| key.name)
            .collect()
    }
}

/// An atomic task with a four-phase lifecycle.
///
/// The engine drives the phases through [`grow`]; implementations never
/// call each other. A fresh instance is created per execution, so phases
/// may stash parsed inputs in `self`.
#[async_trait]
pub trait Blossom: Send + Sync {
    /// The static input/output schema of this blossom.
    fn schema(&self) -> &BlossomSchema;

    /// Parses and type-checks inputs from the item's filled values.
    ///
    /// Malformed input sets `success = false` with a message.
    async fn init(&mut self, item: &mut BlossomItem);

    /// Idempotence probe: sets `skip = true` when the desired state
    /// already holds.
    async fn pre_check(&mut self, item: &mut BlossomItem) {
        item.success = true;
    }

    /// Performs the side effect.
    async fn run(&mut self, item: &mut BlossomItem);

    /// Verifies the observable effect of [`Blossom::run`].
    async fn post_check(&mut self, item: &mut BlossomItem) {
        item.success = true;
    }

    /// Releases transient resources.
    async fn close(&mut self, item: &mut BlossomItem) {
        item.success = true;
    }
}

/// Drives the lifecycle phases in order.
///
/// Stops at the first phase reporting `success = false` and maps it to the
/// matching [`ResultState`]. When the pre-check sets `skip`, the run and
/// post-check phases are bypassed and the terminal state is `Skipped`;
/// otherwise a clean pass terminates as `Changed`. The close phase runs on
/// every path that got past `init`, but its failure only surfaces as
/// `ErrorClose` on an otherwise clean run.
pub async fn grow(blossom: &mut dyn Blossom, item: &mut BlossomItem) {
    item.success = true;
    blossom.init(item).await;
    if !item.success {
        item.result_state = ResultState::ErrorInit;
        return;
    }

    blossom.pre_check(item).await;
    if !item.success {
        item.result_state = ResultState::ErrorPreCheck;
        blossom.close(item).await;
        return;
    }

    if item.skip {
        item.result_state = ResultState::Skipped;
        item.success = true;
        blossom.close(item).await;
        item.success = true;
        return;
    }

    blossom.run(item).await;
    if !item.success {
        item.result_state = ResultState::ErrorExec;
        blossom.close(item).await;
        return;
    }

    blossom.post_check(item).await;
    if !item.success {
        item.result_state = ResultState::ErrorPostCheck;
        blossom.close(item).await;
        return;
    }

    blossom.close(item).await;
    if !item.success {
        item.result_state = ResultState::ErrorClose;
        return;
    }

    item.result_state = ResultState::Changed;
}
