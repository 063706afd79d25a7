//! Error types for setup, dispatch and scheduling.
//!
//! Dispatch errors never escape a request task: the dispatcher converts every
//! [`DispatchError`] into a response using [`DispatchError::status`].

use http::Method;
use thiserror::Error;

/// Failures inside the per-request pipeline.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No route registered for this method matched the path
    #[error("no route for {method} {path}")]
    RouteNotFound { method: Method, path: String },

    /// The request body could not be decoded as its declared content type
    #[error("could not decode {format} request body: {reason}")]
    Decode { format: &'static str, reason: String },

    /// The handler's return value could not be encoded as the negotiated type
    #[error("could not serialize response as {content_type}: {reason}")]
    Serialization {
        content_type: &'static str,
        reason: String,
    },

    /// The handler returned an error or panicked
    #[error("handler failed: {0:#}")]
    Handler(anyhow::Error),

    /// A before or after filter returned an error or panicked
    #[error("{phase} filter failed: {error:#}")]
    Filter {
        phase: &'static str,
        error: anyhow::Error,
    },
}

impl DispatchError {
    /// HTTP status code this error is reported with.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::RouteNotFound { .. } => 404,
            DispatchError::Decode { .. } => 400,
            DispatchError::Serialization { .. }
            | DispatchError::Handler(_)
            | DispatchError::Filter { .. } => 500,
        }
    }

    /// Short, client-safe description used for error bodies.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self {
            DispatchError::RouteNotFound { .. } => "Not Found",
            DispatchError::Decode { .. } => "Bad Request",
            _ => "Internal Server Error",
        }
    }
}

/// Errors raised while defining an app, reported by `App::freeze`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SetupError {
    #[error("unsupported HTTP method {0}")]
    UnsupportedMethod(Method),

    #[error("invalid route pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Errors surfaced by the scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The runtime refused to spawn a coroutine for the task
    #[error("failed to spawn task: {0}")]
    Spawn(#[from] std::io::Error),

    /// The task panicked before producing a result
    #[error("task {task} panicked: {message}")]
    TaskPanicked { task: String, message: String },
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
