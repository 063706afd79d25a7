use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters for a scheduler
#[derive(Debug, Default)]
pub struct SchedulerMetrics {
    /// Tasks accepted by `submit`
    pub submitted_count: AtomicU64,
    /// Tasks that ran to completion
    pub completed_count: AtomicU64,
    /// Tasks that panicked
    pub panicked_count: AtomicU64,
    /// Tasks submitted but not yet finished
    pub in_flight: AtomicUsize,
}

impl SchedulerMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_submit(&self) {
        self.submitted_count.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    /// Undo a submit whose coroutine never started.
    pub(crate) fn record_spawn_failure(&self) {
        self.submitted_count.fetch_sub(1, Ordering::Relaxed);
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completion(&self) {
        self.completed_count.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn record_panic(&self) {
        self.panicked_count.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn get_submitted_count(&self) -> u64 {
        self.submitted_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn get_completed_count(&self) -> u64 {
        self.completed_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn get_panicked_count(&self) -> u64 {
        self.panicked_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn get_in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }
}
