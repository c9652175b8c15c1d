use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

/// Monotonic counter bumped on every change to the analyzed sources.
#[derive(Debug, Default)]
pub struct ModificationTracker {
    count: AtomicU64,
}

impl ModificationTracker {
    pub const fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
        }
    }

    /// The process-wide tracker.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<ModificationTracker>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Self::new())).clone()
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    /// Records a modification and returns the new count.
    pub fn increment(&self) -> u64 {
        self.count.fetch_add(1, Ordering::AcqRel) + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale,
}

/// Remembers the modification count at pause time. Once any later check
/// observes a different count the guard stays stale.
#[derive(Debug)]
pub struct StaleGuard {
    tracker: Arc<ModificationTracker>,
    stamp: u64,
    stale: AtomicBool,
}

impl StaleGuard {
    pub fn capture(tracker: Arc<ModificationTracker>) -> Self {
        let stamp = tracker.count();
        Self {
            tracker,
            stamp,
            stale: AtomicBool::new(false),
        }
    }

    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    pub fn check(&self) -> Freshness {
        if self.stale.load(Ordering::Acquire) {
            return Freshness::Stale;
        }
        if self.tracker.count() != self.stamp {
            self.stale.store(true, Ordering::Release);
            return Freshness::Stale;
        }
        Freshness::Fresh
    }

    pub fn is_fresh(&self) -> bool {
        self.check() == Freshness::Fresh
    }
}
