//! Deferred reclamation of models the audio thread may still be using.
//!
//! Every published model is a `basedrop::Shared` allocation tied to the
//! bridge's own `Collector`. Dropping the last reference, on any thread, only
//! pushes the allocation onto the collector's lock-free queue. The destructor
//! runs later, on a control thread, when `collect` is called.
//!
//! A render call that fetched a model an instant before it was replaced holds
//! a counted reference, so the model outlives the swap until that call ends.

use basedrop::{Collector, Handle};

/// Owns the collector for one bridge. Control-thread only.
pub(crate) struct Reclaimer {
    collector: Collector,
}

impl Reclaimer {
    pub(crate) fn new() -> Self {
        Self {
            collector: Collector::new(),
        }
    }

    /// Handle for allocating values this reclaimer will free.
    pub(crate) fn handle(&self) -> Handle {
        self.collector.handle()
    }

    /// Run destructors for everything whose last reference has been dropped.
    /// Returns how many allocations were freed.
    pub(crate) fn collect(&mut self) -> usize {
        let before = self.collector.alloc_count();
        self.collector.collect();
        let freed = before.saturating_sub(self.collector.alloc_count());
        if freed > 0 {
            tracing::debug!(
                "Reclaimed {} retired allocation(s), {} live",
                freed,
                self.collector.alloc_count()
            );
        }
        freed
    }

    /// Allocations not yet freed, whether still referenced or only queued.
    pub(crate) fn live(&self) -> usize {
        self.collector.alloc_count()
    }
}

impl Drop for Reclaimer {
    fn drop(&mut self) {
        self.collector.collect();
    }
}
