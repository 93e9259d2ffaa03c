//! Engine root.
//!
//! The engine validates a compiled tree, submits exactly one initial work
//! unit carrying a clone of it, and blocks on that unit's counter. The
//! final namespace of the run (the initial keys, updated) is returned on
//! success; failures carry the recorded run error.

use core::fmt;
use std::sync::Arc;

use crate::context::EngineContext;
use crate::item::SakuraItem;
use crate::pool::WorkerPool;
use crate::queue::{ActiveCounter, SubtreeObject};
use crate::runner::RunError;
use crate::validator::{ValidationError, validate_tree};
use sakura_values::{ValueItem, ValueMap};

/// Errors surfaced by [`Engine::run`].
#[derive(Debug)]
pub enum EngineError {
    /// Static validation rejected the tree.
    Validation(Vec<ValidationError>),
    /// The run failed; the diagnostic stream has the per-blossom records.
    Run(RunError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Validation(errors) => {
                writeln!(f, "tree validation failed:")?;
                for error in errors {
                    writeln!(f, "  {error}")?;
                }
                Ok(())
            }
            EngineError::Run(error) => write!(f, "run failed: {error}"),
        }
    }
}

impl core::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            EngineError::Run(error) => Some(error),
            EngineError::Validation(_) => None,
        }
    }
}

/// Executes compiled trees on a worker pool.
///
/// # Example
///
/// ```ignore
/// let ctx = EngineContext::new(registry);
/// let engine = Engine::new(ctx);
/// let result = engine.run(&tree, initial_values).await?;
/// engine.shutdown().await;
/// ```
#[derive(Debug)]
pub struct Engine {
    ctx: Arc<EngineContext>,
    pool: WorkerPool,
}

impl Engine {
    /// Creates an engine with the default worker count.
    #[must_use]
    pub fn new(ctx: EngineContext) -> Self {
        Self::with_workers(ctx, WorkerPool::DEFAULT_WORKERS)
    }

    /// Creates an engine with an explicit worker count.
    #[must_use]
    pub fn with_workers(ctx: EngineContext, workers: usize) -> Self {
        let ctx = Arc::new(ctx);
        let pool = WorkerPool::spawn(ctx.clone(), workers);
        Self { ctx, pool }
    }

    /// The engine's context.
    #[must_use]
    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Validates and runs a tree against the initial namespace.
    ///
    /// The compiled tree is never mutated; a clone (with the initial
    /// values merged over its declared defaults) is shipped to the pool.
    /// Returns the final values of the initial keys.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when static checks fail, and
    /// [`EngineError::Run`] when any blossom or composite fails.
    pub async fn run(
        &self,
        tree: &SakuraItem,
        initial: ValueMap,
    ) -> Result<ValueMap, EngineError> {
        let mut working = tree.clone();
        for (key, value) in &initial {
            working
                .values_mut()
                .insert(key.clone(), ValueItem::literal(value.clone()));
        }

        let errors = validate_tree(&working, &self.ctx);
        if !errors.is_empty() {
            return Err(EngineError::Validation(errors));
        }

        let counter = Arc::new(ActiveCounter::new(1));
        let unit = Arc::new(SubtreeObject::new(
            working,
            initial,
            Vec::new(),
            counter.clone(),
        ));
        self.pool.queue().push(unit.clone());
        counter.wait().await;

        if unit.succeeded() {
            Ok(unit.items())
        } else {
            let error = unit.take_error().unwrap_or(RunError::ParallelFailure {
                failed: 1,
                total: 1,
            });
            Err(EngineError::Run(error))
        }
    }

    /// Stops the worker pool and waits for it to drain.
    pub async fn shutdown(self) {
        self.pool.shutdown().await;
    }
}
