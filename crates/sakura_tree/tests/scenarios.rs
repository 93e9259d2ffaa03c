//! End-to-end scenarios for the execution engine.
//!
//! These tests drive full trees through the engine (queue, pool, runner)
//! and assert the ordering, aggregation, and containment guarantees of the
//! concurrency model.

mod test_utils;

use std::sync::Arc;
use std::time::{Duration, Instant};

use sakura_tree::context::EngineContext;
use sakura_tree::engine::{Engine, EngineError};
use sakura_tree::item::{
    BlossomGroupItem, BlossomItem, Compare, ForEachItem, ForItem, IfItem, ParallelItem,
    SakuraItem, SeedItem, SequentialItem, SubtreeItem, TreeItem,
};
use sakura_tree::queue::SubtreeQueue;
use sakura_tree::runner::{RunError, TreeRunner};
use sakura_values::{Value, ValueItem, ValueItemMap, ValueMap};
use test_utils::{TestLog, fail, record, set, sleep, test_context};

fn tree(children: Vec<SakuraItem>) -> SakuraItem {
    let mut tree = TreeItem::new("test");
    tree.children = children;
    SakuraItem::Tree(tree)
}

fn initial(pairs: &[(&str, Value)]) -> ValueMap {
    pairs
        .iter()
        .map(|(key, value)| ((*key).to_string(), value.clone()))
        .collect()
}

/// A runner over an idle queue; parallel constructs still complete because
/// waiting producers drain the queue themselves.
fn runner(ctx: EngineContext, values: ValueMap) -> TreeRunner {
    TreeRunner::new(
        Arc::new(SubtreeQueue::new()),
        Arc::new(ctx),
        values,
        Vec::new(),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Sequential semantics
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sequential_success_runs_children_in_order() {
    let log = TestLog::new();
    let (ctx, sink) = test_context(&log);
    let engine = Engine::new(ctx);

    let result = engine
        .run(&tree(vec![record("a"), record("b")]), ValueMap::new())
        .await;

    assert!(result.is_ok(), "unexpected: {result:?}");
    assert_eq!(result.unwrap().len(), 0);
    assert_eq!(log.entries(), ["a", "b"]);

    let records = sink.records();
    assert_eq!(records.len(), 2);
    for record in &records {
        assert!(record.contains("CHANGED\n"), "unexpected record: {record}");
    }
    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sequential_abort_skips_later_children() {
    let log = TestLog::new();
    let (ctx, sink) = test_context(&log);
    let engine = Engine::new(ctx);

    let result = engine
        .run(&tree(vec![fail("boom"), record("b")]), ValueMap::new())
        .await;

    match result {
        Err(EngineError::Run(RunError::BlossomFailed { state, .. })) => {
            assert_eq!(state, sakura_tree::ResultState::ErrorExec);
        }
        other => panic!("expected blossom failure, got {other:?}"),
    }
    assert_eq!(log.entries(), ["boom"]);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert!(records[0].contains("ERROR in exec-state with error-code: 1"));
    engine.shutdown().await;
}

// ─────────────────────────────────────────────────────────────────────────────
// Parallel fan-out
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_for_overlaps_iterations() {
    let log = TestLog::new();
    let (ctx, _sink) = test_context(&log);
    let engine = Engine::with_workers(ctx, 4);

    let looping = SakuraItem::For(ForItem {
        values: ValueItemMap::new(),
        counter_name: "i".to_string(),
        start: ValueItem::literal(Value::Int(0)),
        end: ValueItem::literal(Value::Int(4)),
        body: Box::new(sleep(100)),
        parallel: true,
    });

    let started = Instant::now();
    let result = engine.run(&tree(vec![looping]), ValueMap::new()).await;
    let elapsed = started.elapsed();

    assert!(result.is_ok(), "unexpected: {result:?}");
    assert!(elapsed >= Duration::from_millis(100));
    assert!(
        elapsed < Duration::from_millis(350),
        "iterations did not overlap: {elapsed:?}"
    );
    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_failure_still_attempts_all_siblings() {
    let log = TestLog::new();
    let (ctx, sink) = test_context(&log);
    let engine = Engine::new(ctx);

    let parallel = SakuraItem::Parallel(ParallelItem::new(vec![
        record("a"),
        fail("x"),
        record("b"),
    ]));
    let result = engine.run(&tree(vec![parallel]), ValueMap::new()).await;

    match result {
        Err(EngineError::Run(RunError::ParallelFailure { failed, total })) => {
            assert_eq!((failed, total), (1, 3));
        }
        other => panic!("expected parallel failure, got {other:?}"),
    }

    let mut entries = log.entries();
    entries.sort();
    assert_eq!(entries, ["a", "b", "x"]);

    let records = sink.records();
    assert_eq!(records.len(), 3);
    let errors = records
        .iter()
        .filter(|record| record.contains("ERROR"))
        .count();
    assert_eq!(errors, 1);
    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn parallel_siblings_do_not_leak_into_parent() {
    let log = TestLog::new();
    let (ctx, _sink) = test_context(&log);

    let parallel = SakuraItem::Parallel(ParallelItem::new(vec![set(
        ValueItem::literal("private"),
        "leak",
    )]));

    let mut runner = runner(ctx, ValueMap::new());
    let mut item = parallel;
    runner.process_item(&mut item).await.unwrap();
    assert!(!runner.values().contains_key("leak"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Loops
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn for_each_contains_counter_and_transients() {
    let log = TestLog::new();
    let (ctx, _sink) = test_context(&log);

    let mut iterable = ValueItemMap::new();
    iterable.insert(
        ForEachItem::ARRAY_KEY.to_string(),
        ValueItem::literal(Value::Array(vec![
            Value::String("a".into()),
            Value::String("b".into()),
        ])),
    );
    let looping = SakuraItem::ForEach(ForEachItem {
        values: ValueItemMap::new(),
        counter_name: "x".to_string(),
        iterable,
        body: Box::new(set(ValueItem::identifier("x"), "k")),
        parallel: false,
    });

    let mut runner = runner(ctx, ValueMap::new());
    let mut item = looping;
    runner.process_item(&mut item).await.unwrap();

    assert!(!runner.values().contains_key("k"));
    assert!(!runner.values().contains_key("x"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn for_counter_propagates_only_when_predeclared() {
    let log = TestLog::new();
    let (ctx, _sink) = test_context(&log);

    let looping = SakuraItem::For(ForItem {
        values: ValueItemMap::new(),
        counter_name: "i".to_string(),
        start: ValueItem::literal(Value::Int(0)),
        end: ValueItem::literal(Value::Int(3)),
        body: Box::new(record("{{i}}")),
        parallel: false,
    });

    let mut runner = runner(ctx, initial(&[("i", Value::Int(99))]));
    let mut item = looping;
    runner.process_item(&mut item).await.unwrap();

    assert_eq!(runner.values().get("i"), Some(&Value::Int(2)));
    assert_eq!(log.entries(), ["0", "1", "2"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_loop_aggregates_declared_values() {
    let log = TestLog::new();
    let (ctx, _sink) = test_context(&log);
    let engine = Engine::with_workers(ctx, 4);

    let mut loop_values = ValueItemMap::new();
    loop_values.insert("collected".to_string(), ValueItem::identifier("out"));
    let looping = SakuraItem::For(ForItem {
        values: loop_values,
        counter_name: "i".to_string(),
        start: ValueItem::literal(Value::Int(0)),
        end: ValueItem::literal(Value::Int(3)),
        body: Box::new(set(ValueItem::identifier("i"), "out")),
        parallel: true,
    });

    let result = engine
        .run(
            &tree(vec![looping]),
            initial(&[("out", Value::String(String::new())), ("collected", Value::String(String::new()))]),
        )
        .await
        .unwrap();

    // Aggregation consumes identifiers on the first fill, so the first
    // spawned iteration provides the collected value.
    assert_eq!(result.get("collected"), Some(&Value::Int(0)));
    engine.shutdown().await;
}

// ─────────────────────────────────────────────────────────────────────────────
// Branching
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn if_runs_exactly_one_branch() {
    for (env, expected) in [("prod", "then"), ("dev", "else")] {
        let log = TestLog::new();
        let (ctx, _sink) = test_context(&log);
        let engine = Engine::new(ctx);

        let branching = SakuraItem::If(IfItem::new(
            ValueItem::literal("{{env}}"),
            Compare::Eq,
            ValueItem::literal("prod"),
            SakuraItem::Sequential(SequentialItem::new(vec![record("then")])),
            SakuraItem::Sequential(SequentialItem::new(vec![record("else")])),
        ));

        let result = engine
            .run(
                &tree(vec![branching]),
                initial(&[("env", Value::String(env.into()))]),
            )
            .await;
        assert!(result.is_ok(), "unexpected: {result:?}");
        assert_eq!(log.entries(), [expected]);
        engine.shutdown().await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn if_ordering_compares_integers_numerically() {
    let log = TestLog::new();
    let (ctx, _sink) = test_context(&log);

    let branching = SakuraItem::If(IfItem::new(
        ValueItem::literal(Value::Int(10)),
        Compare::Gt,
        ValueItem::literal(Value::Int(9)),
        record("gt"),
        record("le"),
    ));

    let mut runner = runner(ctx, ValueMap::new());
    let mut item = branching;
    runner.process_item(&mut item).await.unwrap();
    assert_eq!(log.entries(), ["gt"]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Outputs and subtrees
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn output_fills_predeclared_parent_key() {
    let log = TestLog::new();
    let (ctx, _sink) = test_context(&log);
    let engine = Engine::new(ctx);

    let result = engine
        .run(
            &tree(vec![set(ValueItem::literal("hello"), "result")]),
            initial(&[("result", Value::String(String::new()))]),
        )
        .await
        .unwrap();

    assert_eq!(result.get("result"), Some(&Value::String("hello".into())));
    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn subtree_call_merges_caller_arguments_over_defaults() {
    let log = TestLog::new();
    let (ctx, _sink) = test_context(&log);

    let mut child = TreeItem::new("child");
    child
        .values
        .insert("greeting".to_string(), ValueItem::literal("default"));
    child.children.push(record("{{greeting}}"));
    let ctx = ctx.with_tree("child", SakuraItem::Tree(child));

    let mut call = SubtreeItem::new("child");
    call.values
        .insert("greeting".to_string(), ValueItem::literal("from-caller"));

    let mut runner = runner(ctx, ValueMap::new());
    let mut item = SakuraItem::Subtree(call);
    runner.process_item(&mut item).await.unwrap();

    assert_eq!(log.entries(), ["from-caller"]);
    // The subtree's declared-and-filled values stay visible downstream.
    assert_eq!(
        runner.values().get("greeting"),
        Some(&Value::String("from-caller".into()))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn subtree_defaults_survive_when_caller_omits_them() {
    let log = TestLog::new();
    let (ctx, _sink) = test_context(&log);

    let mut child = TreeItem::new("child");
    child
        .values
        .insert("greeting".to_string(), ValueItem::literal("default"));
    child.children.push(record("{{greeting}}"));
    let ctx = ctx.with_tree("child", SakuraItem::Tree(child));

    let mut runner = runner(ctx, ValueMap::new());
    let mut item = SakuraItem::Subtree(SubtreeItem::new("child"));
    runner.process_item(&mut item).await.unwrap();
    assert_eq!(log.entries(), ["default"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_subtree_fails_structurally() {
    let log = TestLog::new();
    let (ctx, _sink) = test_context(&log);

    let mut runner = runner(ctx, ValueMap::new());
    let mut item = SakuraItem::Subtree(SubtreeItem::new("missing"));
    let result = runner.process_item(&mut item).await;
    assert!(matches!(result, Err(RunError::UnknownSubtree(name)) if name == "missing"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn seed_executes_its_child_locally() {
    let log = TestLog::new();
    let (ctx, _sink) = test_context(&log);
    let engine = Engine::new(ctx);

    let mut payload = TreeItem::new("remote-payload");
    payload.children.push(record("on-host"));
    let seed = SakuraItem::Seed(SeedItem {
        address: "203.0.113.7".to_string(),
        ssh_port: 22,
        ssh_user: "admin".to_string(),
        ssh_key: "/root/.ssh/id_ed25519".to_string(),
        content: String::new(),
        values: ValueItemMap::new(),
        child: Box::new(SakuraItem::Tree(payload)),
    });

    let result = engine.run(&tree(vec![seed]), ValueMap::new()).await;
    assert!(result.is_ok(), "unexpected: {result:?}");
    assert_eq!(log.entries(), ["on-host"]);
    engine.shutdown().await;
}

// ─────────────────────────────────────────────────────────────────────────────
// Blossom groups, skipping, validation
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn blossom_group_shares_type_prelude_and_rendered_id() {
    let log = TestLog::new();
    let (ctx, sink) = test_context(&log);
    let engine = Engine::new(ctx);

    let mut group = BlossomGroupItem::new("install on {{env}}", "test");
    group
        .values
        .insert("label".to_string(), ValueItem::literal("from-prelude"));
    group.blossoms.push(BlossomItem::new("", "record"));

    let result = engine
        .run(
            &tree(vec![SakuraItem::BlossomGroup(group)]),
            initial(&[("env", Value::String("prod".into()))]),
        )
        .await;

    assert!(result.is_ok(), "unexpected: {result:?}");
    assert_eq!(log.entries(), ["from-prelude"]);
    let records = sink.records();
    assert!(records[0].contains("BLOSSOM: install on prod"));
    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn skipped_blossom_reports_skipped_and_bypasses_run() {
    let log = TestLog::new();
    let (ctx, sink) = test_context(&log);
    let engine = Engine::new(ctx);

    let skipping = SakuraItem::Blossom(
        BlossomItem::new("test", "skippable")
            .with_value("skip", ValueItem::literal(Value::Bool(true))),
    );
    let result = engine.run(&tree(vec![skipping]), ValueMap::new()).await;

    assert!(result.is_ok(), "unexpected: {result:?}");
    assert!(log.entries().is_empty());
    assert!(sink.records()[0].contains("SKIPPED\n"));
    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn validation_rejects_before_running_anything() {
    let log = TestLog::new();
    let (ctx, sink) = test_context(&log);
    let engine = Engine::new(ctx);

    let result = engine
        .run(
            &tree(vec![SakuraItem::Blossom(BlossomItem::new(
                "test", "missing",
            ))]),
            ValueMap::new(),
        )
        .await;

    match result {
        Err(EngineError::Validation(errors)) => {
            assert_eq!(errors.len(), 1);
            assert!(errors[0].message.contains("unknown blossom-type"));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert!(log.entries().is_empty());
    assert!(sink.records().is_empty());
    engine.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn uninitialized_tree_value_fails_validation() {
    let log = TestLog::new();
    let (ctx, _sink) = test_context(&log);
    let engine = Engine::new(ctx);

    let mut root = TreeItem::new("needs-args");
    root.values
        .insert("target".to_string(), ValueItem::literal(Value::Unset));
    root.children.push(record("never"));

    let result = engine
        .run(&SakuraItem::Tree(root.clone()), ValueMap::new())
        .await;
    assert!(matches!(result, Err(EngineError::Validation(_))));

    // Providing the value as an initial key makes the same tree runnable.
    let result = engine
        .run(
            &SakuraItem::Tree(root),
            initial(&[("target", Value::String("host-1".into()))]),
        )
        .await;
    assert!(result.is_ok(), "unexpected: {result:?}");
    assert_eq!(log.entries(), ["never"]);
    engine.shutdown().await;
}
