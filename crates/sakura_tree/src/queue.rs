//! Subtree queue and completion counters.
//!
//! The queue is the single shared mutable structure between the
//! interpreter and the worker pool: a mutex-protected FIFO of work units.
//! A producer spawning a batch of units shares one [`ActiveCounter`] across
//! them and waits until every unit has incremented it.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::item::SakuraItem;
use crate::runner::RunError;
use sakura_values::ValueMap;

/// Thread-safe fence counting completed work units of one batch.
///
/// Workers increment the counter as the last step of processing a unit, so
/// a producer observing `is_done` also observes every unit's results.
#[derive(Debug)]
pub struct ActiveCounter {
    done: AtomicU32,
    expected: u32,
}

impl ActiveCounter {
    /// Creates a counter expecting the given number of completions.
    #[must_use]
    pub fn new(expected: u32) -> Self {
        Self {
            done: AtomicU32::new(0),
            expected,
        }
    }

    /// Records one completed unit.
    pub fn increment(&self) {
        self.done.fetch_add(1, Ordering::Release);
    }

    /// True once every expected unit has completed.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire) == self.expected
    }

    /// The number of completions this counter expects.
    #[must_use]
    pub fn expected(&self) -> u32 {
        self.expected
    }

    /// Polls until every expected unit has completed.
    pub async fn wait(&self) {
        while !self.is_done() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

/// An authenticated connection to a remote host.
///
/// The core only observes that a session exists; transports live outside.
pub trait RemoteSession: Send + Sync {
    /// Address of the remote host.
    fn address(&self) -> &str;
}

/// A packaged subtree with its namespace and shared completion counter.
pub struct SubtreeObject {
    subtree: Mutex<Option<SakuraItem>>,
    items: Mutex<ValueMap>,
    /// Breadcrumb inherited from the spawning scope.
    pub hierarchy: Vec<String>,
    /// Completion fence shared with the unit's siblings.
    pub counter: Arc<ActiveCounter>,
    /// Session the unit belongs to, when it came in over the wire.
    pub session: Option<Arc<dyn RemoteSession>>,
    /// Identifier the remote side blocks on, when a session is set.
    pub blocker_id: u64,
    success: AtomicBool,
    error: Mutex<Option<RunError>>,
}

impl core::fmt::Debug for SubtreeObject {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SubtreeObject")
            .field("hierarchy", &self.hierarchy)
            .field("success", &self.succeeded())
            .finish()
    }
}

impl SubtreeObject {
    /// Packages a subtree copy with its input namespace.
    #[must_use]
    pub fn new(
        subtree: SakuraItem,
        items: ValueMap,
        hierarchy: Vec<String>,
        counter: Arc<ActiveCounter>,
    ) -> Self {
        Self {
            subtree: Mutex::new(Some(subtree)),
            items: Mutex::new(items),
            hierarchy,
            counter,
            session: None,
            blocker_id: 0,
            success: AtomicBool::new(false),
            error: Mutex::new(None),
        }
    }

    /// Takes ownership of the subtree; the processing worker mutates it.
    #[must_use]
    pub fn take_subtree(&self) -> Option<SakuraItem> {
        self.subtree.lock().take()
    }

    /// A copy of the unit's current namespace.
    #[must_use]
    pub fn items(&self) -> ValueMap {
        self.items.lock().clone()
    }

    /// Writes results back into the unit's namespace, existing keys only.
    pub fn store_items(&self, results: &ValueMap) {
        let mut items = self.items.lock();
        sakura_values::resolve::override_values(
            &mut items,
            results,
            sakura_values::OverrideMode::OnlyExisting,
        );
    }

    /// Records the unit's outcome. Called before the counter increment.
    pub fn finish(&self, result: Result<(), RunError>) {
        match result {
            Ok(()) => self.success.store(true, Ordering::Release),
            Err(error) => {
                *self.error.lock() = Some(error);
                self.success.store(false, Ordering::Release);
            }
        }
    }

    /// Whether the unit completed without failure.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.success.load(Ordering::Acquire)
    }

    /// Takes the recorded failure, if any.
    #[must_use]
    pub fn take_error(&self) -> Option<RunError> {
        self.error.lock().take()
    }
}

/// Thread-safe FIFO of work units.
#[derive(Debug, Default)]
pub struct SubtreeQueue {
    queue: Mutex<VecDeque<Arc<SubtreeObject>>>,
}

impl SubtreeQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a work unit.
    pub fn push(&self, object: Arc<SubtreeObject>) {
        self.queue.lock().push_back(object);
    }

    /// Removes the oldest work unit, if any.
    #[must_use]
    pub fn pop(&self) -> Option<Arc<SubtreeObject>> {
        self.queue.lock().pop_front()
    }

    /// Number of queued units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// True when no unit is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}
