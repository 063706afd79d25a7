//! Before/after filters run around every matched route.
//!
//! Filters share the request's live [`RequestContext`], so anything a before
//! filter writes (params, headers, extensions) is visible to the handler.
//! A filter can only stop the rest of its phase by failing.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

use crate::context::RequestContext;
use crate::errors::{panic_message, DispatchError};

pub trait Filter: Send + Sync {
    fn call(&self, ctx: &mut RequestContext) -> anyhow::Result<()>;
}

impl<F> Filter for F
where
    F: Fn(&mut RequestContext) -> anyhow::Result<()> + Send + Sync,
{
    fn call(&self, ctx: &mut RequestContext) -> anyhow::Result<()> {
        self(ctx)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Before,
    After,
}

impl Phase {
    fn as_str(self) -> &'static str {
        match self {
            Phase::Before => "before",
            Phase::After => "after",
        }
    }
}

/// Ordered before and after filter lists shared by all routes of an app.
#[derive(Default, Clone)]
pub struct FilterChain {
    before: Vec<Arc<dyn Filter>>,
    after: Vec<Arc<dyn Filter>>,
}

impl FilterChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_before<F: Filter + 'static>(&mut self, filter: F) {
        self.before.push(Arc::new(filter));
    }

    pub fn add_after<F: Filter + 'static>(&mut self, filter: F) {
        self.after.push(Arc::new(filter));
    }

    /// Run before filters in registration order.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Filter`] from the first filter that fails or panics;
    /// later before filters are skipped.
    pub fn run_before(&self, ctx: &mut RequestContext) -> Result<(), DispatchError> {
        run_phase(Phase::Before, &self.before, ctx)
    }

    /// Run after filters in registration order.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Filter`] from the first filter that fails or panics;
    /// later after filters are skipped.
    pub fn run_after(&self, ctx: &mut RequestContext) -> Result<(), DispatchError> {
        run_phase(Phase::After, &self.after, ctx)
    }

    #[must_use]
    pub fn before_len(&self) -> usize {
        self.before.len()
    }

    #[must_use]
    pub fn after_len(&self) -> usize {
        self.after.len()
    }
}

fn run_phase(
    phase: Phase,
    filters: &[Arc<dyn Filter>],
    ctx: &mut RequestContext,
) -> Result<(), DispatchError> {
    for (idx, filter) in filters.iter().enumerate() {
        debug!(
            request_id = %ctx.request_id(),
            phase = phase.as_str(),
            filter_idx = idx,
            "Running filter"
        );
        let outcome = match catch_unwind(AssertUnwindSafe(|| filter.call(ctx))) {
            Ok(result) => result,
            Err(panic) => Err(anyhow::anyhow!(
                "filter panicked: {}",
                panic_message(panic.as_ref())
            )),
        };
        if let Err(e) = outcome {
            error!(
                request_id = %ctx.request_id(),
                phase = phase.as_str(),
                filter_idx = idx,
                error = %format!("{e:#}"),
                "Filter failed - skipping remaining filters of this phase"
            );
            return Err(DispatchError::Filter {
                phase: phase.as_str(),
                error: e,
            });
        }
    }
    Ok(())
}
