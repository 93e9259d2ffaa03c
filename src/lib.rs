//! An automation engine executing declarative task trees on worker pools.
//!
//! SakuraTree compiles a declarative description of imperative tasks
//! ("blossoms") and control flow (sequential, parallel, conditionals,
//! loops, subtree calls) into an in-memory tree, validates it, and
//! processes it on a pool of workers while propagating values through
//! scoped namespaces.
//!
//! The layers:
//!
//! - [`values`] (`sakura_values`) - dynamic values and the namespace resolver
//! - [`tree`] (`sakura_tree`) - item model, scheduler, and interpreter
//! - [`blossoms`] (`sakura_blossoms`) - concrete task implementations
//!
//! # Example
//!
//! ```ignore
//! use sakura::prelude::*;
//!
//! let ctx = EngineContext::new(sakura::blossoms::default_registry());
//! let engine = Engine::new(ctx);
//! let finished = engine.run(&tree, initial_values).await?;
//! engine.shutdown().await;
//! ```

pub use sakura_blossoms as blossoms;
pub use sakura_tree as tree;
pub use sakura_values as values;

/// Tracing subscriber setup.
pub mod telemetry;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use sakura_blossoms::default_registry;
    pub use sakura_tree::prelude::*;
    pub use sakura_values::prelude::*;
}
