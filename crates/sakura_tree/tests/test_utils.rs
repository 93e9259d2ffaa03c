//! Shared test utilities for `sakura_tree` integration tests.
//!
//! Provides scripted blossoms (recording, failing, sleeping, output-
//! producing) and context builders used across test files. Import via
//! `mod test_utils;`.

#![allow(
    dead_code,
    missing_docs,
    reason = "shared test utilities — not all items used in every test binary"
)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use sakura_tree::blossom::{Blossom, BlossomSchema};
use sakura_tree::context::EngineContext;
use sakura_tree::item::{BlossomItem, SakuraItem};
use sakura_tree::registry::BlossomRegistry;
use sakura_tree::report::MemorySink;
use sakura_values::{Value, ValueItem};

// ═══════════════════════════════════════════════════════════════════════════════
// EXECUTION LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Collects the labels of executed test blossoms, in execution order.
#[derive(Clone, Default)]
pub struct TestLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl TestLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEST BLOSSOMS
// ═══════════════════════════════════════════════════════════════════════════════

/// Records its `label` input to the log.
struct RecordingBlossom {
    schema: BlossomSchema,
    log: TestLog,
    label: String,
}

#[async_trait]
impl Blossom for RecordingBlossom {
    fn schema(&self) -> &BlossomSchema {
        &self.schema
    }

    async fn init(&mut self, item: &mut BlossomItem) {
        match item.input_str("label") {
            Some(label) => {
                self.label = label.to_string();
                item.success = true;
            }
            None => item.fail("label is not a string"),
        }
    }

    async fn run(&mut self, item: &mut BlossomItem) {
        self.log.push(self.label.clone());
        item.success = true;
    }
}

/// Records its label, then fails its run phase.
struct FailingBlossom {
    schema: BlossomSchema,
    log: TestLog,
    label: String,
}

#[async_trait]
impl Blossom for FailingBlossom {
    fn schema(&self) -> &BlossomSchema {
        &self.schema
    }

    async fn init(&mut self, item: &mut BlossomItem) {
        self.label = item.input_str("label").unwrap_or("fail").to_string();
        item.success = true;
    }

    async fn run(&mut self, item: &mut BlossomItem) {
        self.log.push(self.label.clone());
        item.fail("intentional failure");
        item.exec_state = 1;
    }
}

/// Sleeps for its `millis` input.
struct SleepBlossom {
    schema: BlossomSchema,
    millis: u64,
}

#[async_trait]
impl Blossom for SleepBlossom {
    fn schema(&self) -> &BlossomSchema {
        &self.schema
    }

    async fn init(&mut self, item: &mut BlossomItem) {
        match item.input_int("millis") {
            Some(millis) if millis >= 0 => {
                self.millis = millis as u64;
                item.success = true;
            }
            _ => item.fail("millis is not a non-negative integer"),
        }
    }

    async fn run(&mut self, item: &mut BlossomItem) {
        tokio::time::sleep(Duration::from_millis(self.millis)).await;
        item.success = true;
    }
}

/// Produces its `value` input as the blossom output.
struct SetBlossom {
    schema: BlossomSchema,
    value: Value,
}

#[async_trait]
impl Blossom for SetBlossom {
    fn schema(&self) -> &BlossomSchema {
        &self.schema
    }

    async fn init(&mut self, item: &mut BlossomItem) {
        match item.input_value("value") {
            Some(value) => {
                self.value = value.clone();
                item.success = true;
            }
            None => item.fail("value is not set"),
        }
    }

    async fn run(&mut self, item: &mut BlossomItem) {
        item.output = self.value.clone();
        item.success = true;
    }
}

/// Skips when its `skip` input is true; records otherwise.
struct SkippableBlossom {
    schema: BlossomSchema,
    log: TestLog,
    skip: bool,
}

#[async_trait]
impl Blossom for SkippableBlossom {
    fn schema(&self) -> &BlossomSchema {
        &self.schema
    }

    async fn init(&mut self, item: &mut BlossomItem) {
        self.skip = item.input_bool("skip").unwrap_or(false);
        item.success = true;
    }

    async fn pre_check(&mut self, item: &mut BlossomItem) {
        item.success = true;
        if self.skip {
            item.skip = true;
        }
    }

    async fn run(&mut self, item: &mut BlossomItem) {
        self.log.push("ran");
        item.success = true;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTEXT AND TREE BUILDERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Registers every test blossom under the `test` group.
pub fn test_registry(log: &TestLog) -> BlossomRegistry {
    let mut registry = BlossomRegistry::new();

    let recording_log = log.clone();
    registry.register("test", "record", move || {
        Box::new(RecordingBlossom {
            schema: BlossomSchema::new().required("label"),
            log: recording_log.clone(),
            label: String::new(),
        })
    });

    let failing_log = log.clone();
    registry.register("test", "fail", move || {
        Box::new(FailingBlossom {
            schema: BlossomSchema::new().optional("label"),
            log: failing_log.clone(),
            label: String::new(),
        })
    });

    registry.register("test", "sleep", || {
        Box::new(SleepBlossom {
            schema: BlossomSchema::new().required("millis"),
            millis: 0,
        })
    });

    registry.register("test", "set", || {
        Box::new(SetBlossom {
            schema: BlossomSchema::new().required("value").with_output(),
            value: Value::Null,
        })
    });

    let skippable_log = log.clone();
    registry.register("test", "skippable", move || {
        Box::new(SkippableBlossom {
            schema: BlossomSchema::new().optional("skip"),
            log: skippable_log.clone(),
            skip: false,
        })
    });

    registry
}

/// Context over the test registry with an inspectable sink.
pub fn test_context(log: &TestLog) -> (EngineContext, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let ctx = EngineContext::new(test_registry(log)).with_sink(sink.clone());
    (ctx, sink)
}

/// A `test/record` leaf with the given label.
pub fn record(label: &str) -> SakuraItem {
    SakuraItem::Blossom(
        BlossomItem::new("test", "record").with_value("label", ValueItem::literal(label)),
    )
}

/// A `test/fail` leaf.
pub fn fail(label: &str) -> SakuraItem {
    SakuraItem::Blossom(
        BlossomItem::new("test", "fail").with_value("label", ValueItem::literal(label)),
    )
}

/// A `test/sleep` leaf.
pub fn sleep(millis: i64) -> SakuraItem {
    SakuraItem::Blossom(
        BlossomItem::new("test", "sleep").with_value("millis", ValueItem::literal(Value::Int(millis))),
    )
}

/// A `test/set` leaf producing the resolved `value` input and publishing
/// it under `target` in the enclosing namespace.
pub fn set(value: ValueItem, target: &str) -> SakuraItem {
    SakuraItem::Blossom(
        BlossomItem::new("test", "set")
            .with_value("value", value)
            .with_value(target, ValueItem::output("")),
    )
}
