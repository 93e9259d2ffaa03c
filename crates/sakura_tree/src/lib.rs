//! Task-tree execution engine for SakuraTree (Layer 2).
//!
//! `sakura_tree` holds the core of the system: the polymorphic item tree,
//! the blossom contract and registry, the static validator, and the
//! scheduler — a subtree queue feeding a pool of long-lived workers that
//! drive the recursive interpreter.
//!
//! # Core Concepts
//!
//! - [`SakuraItem`] - Tree nodes for all control-flow and task kinds
//! - [`Blossom`] - Atomic task contract with a four-phase lifecycle
//! - [`BlossomRegistry`] - Implementation lookup by `(group, type)`
//! - [`TreeRunner`] - Recursive interpreter over one working tree copy
//! - [`SubtreeQueue`] / [`WorkerPool`] - The fan-out machinery for
//!   parallel composites and parallel loops
//! - [`Engine`] - Validates, submits the root work unit, awaits the run
//!
//! # Concurrency model
//!
//! Work units are independent except through their shared
//! [`ActiveCounter`] and the side effects blossoms perform on the outside
//! world. Namespaces are never shared across workers as aliases: parallel
//! constructs hand each unit its own deep copy and re-import results
//! through explicit override steps. Within sequential composites children
//! run in declared order; between parallel siblings no order is
//! guaranteed, and a failing sibling never cancels the others.
//!
//! # Example
//!
//! ```ignore
//! use sakura_tree::{Engine, EngineContext};
//!
//! let ctx = EngineContext::new(registry);
//! let engine = Engine::new(ctx);
//! let finished = engine.run(&tree, initial_values).await?;
//! engine.shutdown().await;
//! ```

/// The blossom contract and its lifecycle driver.
pub mod blossom;

/// Engine context: registry, templates, named trees, diagnostic sink.
pub mod context;

/// Engine root: validation, root work unit, shutdown.
pub mod engine;

/// Tree nodes for all control-flow and task kinds.
pub mod item;

/// Worker pool over the shared subtree queue.
pub mod pool;

/// Subtree queue and completion counters.
pub mod queue;

/// Blossom registry.
pub mod registry;

/// Diagnostic output records.
pub mod report;

/// The recursive tree interpreter.
pub mod runner;

/// Static checks on compiled trees.
pub mod validator;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::blossom::{Blossom, BlossomSchema, grow};
    pub use crate::context::EngineContext;
    pub use crate::engine::{Engine, EngineError};
    pub use crate::item::{
        BlossomGroupItem, BlossomItem, Compare, ForEachItem, ForItem, IfItem, ParallelItem,
        ResultState, SakuraItem, SeedItem, SequentialItem, SubtreeItem, TreeItem,
    };
    pub use crate::pool::WorkerPool;
    pub use crate::queue::{ActiveCounter, RemoteSession, SubtreeObject, SubtreeQueue};
    pub use crate::registry::BlossomRegistry;
    pub use crate::report::{MemorySink, ReportSink, StdoutSink, format_blossom_record};
    pub use crate::runner::{RunError, TreeRunner};
    pub use crate::validator::{ValidationError, validate_tree};
}

pub use blossom::{Blossom, BlossomSchema};
pub use context::EngineContext;
pub use engine::{Engine, EngineError};
pub use item::{BlossomItem, ResultState, SakuraItem};
pub use pool::WorkerPool;
pub use queue::{ActiveCounter, SubtreeQueue};
pub use registry::BlossomRegistry;
pub use runner::{RunError, TreeRunner};
