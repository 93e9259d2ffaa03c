//! Worker pool.
//!
//! N long-lived worker tasks share the subtree queue. Each worker pulls
//! work units and drives the interpreter on them; an empty queue is polled
//! with a short sleep. Shutdown raises a stop flag and joins the workers.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::context::EngineContext;
use crate::queue::SubtreeQueue;
use crate::runner::process_unit;

/// Pool of long-lived worker tasks over one shared [`SubtreeQueue`].
#[derive(Debug)]
pub struct WorkerPool {
    queue: Arc<SubtreeQueue>,
    stop: Arc<AtomicBool>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Default number of workers.
    pub const DEFAULT_WORKERS: usize = 2;

    /// Spawns `workers` worker tasks over a fresh queue.
    ///
    /// At least one worker is always spawned.
    #[must_use]
    pub fn spawn(ctx: Arc<EngineContext>, workers: usize) -> Self {
        let queue = Arc::new(SubtreeQueue::new());
        let stop = Arc::new(AtomicBool::new(false));
        let workers = (0..workers.max(1))
            .map(|id| {
                tokio::spawn(worker_loop(
                    id,
                    queue.clone(),
                    ctx.clone(),
                    stop.clone(),
                ))
            })
            .collect();

        Self {
            queue,
            stop,
            workers,
        }
    }

    /// The pool's shared queue.
    #[must_use]
    pub fn queue(&self) -> &Arc<SubtreeQueue> {
        &self.queue
    }

    /// Number of workers in the pool.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Stops the workers and waits for them to exit.
    ///
    /// Callers must not push further units; queued units are still drained
    /// by the workers before they observe the stop flag on an empty queue.
    pub async fn shutdown(self) {
        self.stop.store(true, Ordering::Release);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

async fn worker_loop(
    id: usize,
    queue: Arc<SubtreeQueue>,
    ctx: Arc<EngineContext>,
    stop: Arc<AtomicBool>,
) {
    tracing::debug!(worker = id, "worker started");
    loop {
        match queue.pop() {
            Some(unit) => process_unit(&unit, &queue, &ctx).await,
            None => {
                if stop.load(Ordering::Acquire) {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }
    }
    tracing::debug!(worker = id, "worker stopped");
}
