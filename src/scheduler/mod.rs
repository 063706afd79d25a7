//! # Scheduler Module
//!
//! Cooperative task scheduling on top of `may` coroutines.
//!
//! Many logical request tasks share a small, fixed set of worker threads
//! (`BRRTD_WORKERS`). Completion order follows unblocking, never submission:
//! a task sleeping for three units finishes after a task submitted later that
//! sleeps for one.
//!
//! Only `may`-aware blocking suspends a task. Blocking through `std`
//! (`std::thread::sleep`, std sockets, std locks held across waits) stalls
//! the whole worker thread.
//!
//! ```rust,no_run
//! use brrtdispatch::runtime_config::RuntimeConfig;
//! use brrtdispatch::scheduler::{self, Scheduler};
//! use std::time::Duration;
//!
//! let sched = Scheduler::new(RuntimeConfig::with_workers(2));
//! let slow = sched.submit(|| { scheduler::sleep(Duration::from_millis(30)); "slow" }).unwrap();
//! let fast = sched.submit(|| { scheduler::sleep(Duration::from_millis(10)); "fast" }).unwrap();
//! assert_eq!(fast.join().unwrap(), "fast");
//! assert_eq!(slow.join().unwrap(), "slow");
//! ```

mod core;
mod metrics;

pub use core::{Scheduler, TaskHandle};
pub use metrics::SchedulerMetrics;

use std::time::Duration;

/// Suspend the current task for `duration`, letting its worker run others.
///
/// Outside a coroutine this blocks the calling thread.
pub fn sleep(duration: Duration) {
    may::coroutine::sleep(duration);
}

/// Let other ready tasks on this worker run before continuing.
pub fn yield_now() {
    may::coroutine::yield_now();
}
