//! # Dispatcher Module
//!
//! The per-request pipeline. A [`Dispatcher`] owns the frozen route table,
//! filter chain, content negotiator and renderer, and turns one [`Request`]
//! into exactly one [`Response`].
//!
//! ## Request Flow
//!
//! 1. Route table resolves `(method, path)`; no match is a 404 and nothing
//!    else runs
//! 2. Params are merged (path > body > query); a malformed body is a 400 and
//!    the handler is skipped, but filters still run
//! 3. Before filters run in registration order
//! 4. The handler runs and its return value is encoded as the negotiated
//!    content type and appended to the body
//! 5. After filters run exactly once, whatever happened before
//! 6. `Content-Type`, `Content-Length` and `x-request-id` are set
//!
//! ## Error Handling
//!
//! - Handler errors and panics return 500 responses
//! - Filter errors and panics return 500 responses
//! - Serialization failures return 500 responses
//! - Error bodies are `{"error": "..."}` for JSON, reason text otherwise
//!
//! [`Request`]: crate::server::Request
//! [`Response`]: crate::server::Response

mod core;

pub use core::{Dispatcher, REQUEST_ID_HEADER};
