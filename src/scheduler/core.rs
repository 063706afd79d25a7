use may::coroutine::{self, JoinHandle};
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use super::metrics::SchedulerMetrics;
use crate::errors::{panic_message, SchedulerError};
use crate::ids::TaskId;
use crate::runtime_config::RuntimeConfig;

/// Maps request tasks onto the `may` worker pool.
///
/// Each submitted task runs in its own coroutine. A task parks when it hits a
/// blocking `may` operation ([`super::sleep`], channels, `may` I/O) and its
/// worker picks up another ready task. Tasks that never block run to
/// completion without being preempted.
#[derive(Clone)]
pub struct Scheduler {
    config: RuntimeConfig,
    metrics: Arc<SchedulerMetrics>,
}

impl Scheduler {
    /// Create a scheduler and push `config` into the `may` runtime.
    ///
    /// The worker count only takes effect if no coroutine has been spawned
    /// in this process yet.
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        config.apply();
        info!(
            workers = config.workers,
            stack_size = config.stack_size,
            pin_workers = config.pin_workers,
            "Scheduler configured"
        );
        Self {
            config,
            metrics: Arc::new(SchedulerMetrics::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<SchedulerMetrics> {
        &self.metrics
    }

    /// Admit a task. It starts as soon as a worker is free.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Spawn`] when the runtime cannot create the coroutine.
    pub fn submit<F, T>(&self, task: F) -> Result<TaskHandle<T>, SchedulerError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let id = TaskId::next();
        let metrics = Arc::clone(&self.metrics);
        metrics.record_submit();

        let task_metrics = Arc::clone(&metrics);
        // SAFETY: may::coroutine::Builder::spawn() is marked unsafe by the may runtime.
        // The closure is Send + 'static and owns everything it touches. Panics
        // are caught inside the coroutine, so none unwind into the runtime.
        // Coroutines must not use thread-local storage across suspension
        // points; the task closure only suspends through may primitives.
        #[allow(unsafe_code)]
        let spawned = unsafe {
            coroutine::Builder::new()
                .name(id.to_string())
                .stack_size(self.config.stack_size)
                .spawn(move || run_task(id, &task_metrics, task))
        };

        match spawned {
            Ok(inner) => {
                debug!(task_id = %id, "Task submitted");
                Ok(TaskHandle { id, inner })
            }
            Err(e) => {
                metrics.record_spawn_failure();
                error!(
                    task_id = %id,
                    error = %e,
                    stack_size = self.config.stack_size,
                    "Failed to spawn task coroutine - CRITICAL"
                );
                Err(SchedulerError::Spawn(e))
            }
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.config)
            .field("in_flight", &self.metrics.get_in_flight())
            .finish()
    }
}

fn run_task<F, T>(id: TaskId, metrics: &SchedulerMetrics, task: F) -> Result<T, String>
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    match catch_unwind(AssertUnwindSafe(task)) {
        Ok(value) => {
            metrics.record_completion();
            debug!(
                task_id = %id,
                elapsed_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX),
                "Task complete"
            );
            Ok(value)
        }
        Err(panic) => {
            metrics.record_panic();
            let message = panic_message(panic.as_ref());
            error!(task_id = %id, panic_message = %message, "Task panicked");
            Err(message)
        }
    }
}

/// Completion handle for a submitted task.
#[must_use = "dropping a TaskHandle detaches the task and discards its result"]
pub struct TaskHandle<T> {
    id: TaskId,
    inner: JoinHandle<Result<T, String>>,
}

impl<T> TaskHandle<T> {
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Whether the task has finished, without blocking.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.inner.is_done()
    }

    /// Wait for the task's result. Parks the caller when it is a coroutine,
    /// blocks the thread otherwise.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::TaskPanicked`] when the task panicked.
    pub fn join(self) -> Result<T, SchedulerError> {
        let task = self.id.to_string();
        match self.inner.join() {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(message)) => Err(SchedulerError::TaskPanicked { task, message }),
            Err(panic) => Err(SchedulerError::TaskPanicked {
                task,
                message: panic_message(panic.as_ref()),
            }),
        }
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("done", &self.is_done())
            .finish()
    }
}
