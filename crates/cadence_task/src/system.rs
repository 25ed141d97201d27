//! The unit of per-cycle work.
//!
//! A [`System`] declares an [`Access`] profile once and runs every cycle. It
//! may split its work into [`Batch`]es that the pool executes in parallel.

use std::ops::Range;
use std::sync::Arc;

use cadence_ecs::{Access, World};

use crate::clock::FrameClock;
use crate::logger::DeferredLogger;

/// Shared state handed to every system invocation.
#[derive(Debug, Clone)]
pub struct SystemContext {
    world: Arc<World>,
    clock: Arc<FrameClock>,
    logger: Arc<DeferredLogger>,
}

impl SystemContext {
    /// Bundle the shared store, clock and logger.
    #[must_use]
    pub fn new(world: Arc<World>, clock: Arc<FrameClock>, logger: Arc<DeferredLogger>) -> Self {
        Self {
            world,
            clock,
            logger,
        }
    }

    /// The entity-component store.
    #[must_use]
    pub fn world(&self) -> &Arc<World> {
        &self.world
    }

    /// The frame clock.
    #[must_use]
    pub fn clock(&self) -> &Arc<FrameClock> {
        &self.clock
    }

    /// The deferred logger.
    #[must_use]
    pub fn logger(&self) -> &Arc<DeferredLogger> {
        &self.logger
    }

    /// Elapsed seconds for this cycle.
    #[must_use]
    pub fn delta(&self) -> f64 {
        self.clock.elapsed()
    }

    /// Number of clock updates so far. Stable within a cycle.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.clock.frame()
    }
}

/// How a system splits its work for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Workload {
    /// Total work items (entities, chunks, ...).
    pub items: usize,
    /// Items per batch. Treated as at least one.
    pub per_batch: usize,
}

impl Workload {
    /// One batch covering a single item.
    #[must_use]
    pub const fn single() -> Self {
        Self {
            items: 1,
            per_batch: 1,
        }
    }

    /// One batch per `per_batch` items.
    #[must_use]
    pub const fn chunks(items: usize, per_batch: usize) -> Self {
        Self { items, per_batch }
    }

    /// One batch per item.
    #[must_use]
    pub const fn each(items: usize) -> Self {
        Self::chunks(items, 1)
    }

    /// Nothing to do this cycle.
    #[must_use]
    pub const fn none() -> Self {
        Self::chunks(0, 1)
    }

    /// Number of batches.
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.items.div_ceil(self.per_batch.max(1))
    }

    /// The batches this workload splits into, in order.
    pub fn batches(&self) -> impl Iterator<Item = Batch> + '_ {
        let per_batch = self.per_batch.max(1);
        let count = self.batch_count();
        let items = self.items;
        (0..count).map(move |index| {
            let start = index * per_batch;
            Batch {
                index,
                count,
                items: start..(start + per_batch).min(items),
            }
        })
    }
}

impl Default for Workload {
    fn default() -> Self {
        Self::single()
    }
}

/// One subtask's slice of a system's workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Position of this batch within the cycle's workload.
    pub index: usize,
    /// Total batches in the workload.
    pub count: usize,
    /// Item range covered by this batch.
    pub items: Range<usize>,
}

impl Batch {
    /// Number of items in this batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the batch covers no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A unit of per-cycle work over the store.
///
/// Systems hold no state between invocations that the scheduler relies on.
/// The declared [`Access`] must cover everything `run` touches; the scheduler
/// orders conflicting systems by it and cannot check it at runtime.
pub trait System: Send + Sync + 'static {
    /// Unique name within a pipeline.
    fn name(&self) -> &str;

    /// Component types read and written by this system.
    fn access(&self) -> Access;

    /// How to split this cycle's work. Evaluated when the system is released,
    /// after every system it depends on has finished.
    fn workload(&self, _ctx: &SystemContext) -> Workload {
        Workload::single()
    }

    /// Execute one batch. Batches of one system may run concurrently.
    fn run(&self, ctx: &SystemContext, batch: &Batch);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_workload() {
        let batches: Vec<_> = Workload::single().batches().collect();
        assert_eq!(
            batches,
            vec![Batch {
                index: 0,
                count: 1,
                items: 0..1
            }]
        );
    }

    #[test]
    fn test_chunked_workload_covers_all_items() {
        let workload = Workload::chunks(1000, 256);
        assert_eq!(workload.batch_count(), 4);
        let batches: Vec<_> = workload.batches().collect();
        assert_eq!(batches[0].items, 0..256);
        assert_eq!(batches[3].items, 768..1000);
        assert_eq!(batches.iter().map(Batch::len).sum::<usize>(), 1000);
    }

    #[test]
    fn test_empty_workload_has_no_batches() {
        assert_eq!(Workload::none().batch_count(), 0);
        assert_eq!(Workload::chunks(0, 64).batches().count(), 0);
    }

    #[test]
    fn test_zero_per_batch_treated_as_one() {
        let workload = Workload::chunks(3, 0);
        assert_eq!(workload.batch_count(), 3);
        assert!(workload.batches().all(|b| b.len() == 1));
    }
}
