//! # brrtdispatch
//!
//! **brrtdispatch** is an embeddable, coroutine-powered HTTP request dispatch
//! engine built on the `may` runtime. Declare routes, before/after filters
//! and a content-type policy; the engine matches each request, runs the
//! filter pipeline around its handler and serializes the handler's return
//! value as the negotiated content type.
//!
//! ## Overview
//!
//! Every request runs as its own coroutine. A handler that waits on a `may`
//! primitive (sleep, channel, socket) parks only its own task, so one slow
//! request never stalls unrelated ones. Sockets and wire parsing stay outside
//! the engine: embedders hand over a parsed [`server::Request`] and receive a
//! [`server::Response`].
//!
//! ## Architecture
//!
//! - **[`app`]** - App definition DSL and the frozen [`Engine`]
//! - **[`router`]** - Pattern compilation and the per-method route table
//! - **[`params`]** - Query, body and path parameter merging
//! - **[`content`]** - Content-type symbols, codecs and negotiation
//! - **[`filter`]** - Before/after filter chain
//! - **[`context`]** - Per-request [`RequestContext`]
//! - **[`dispatcher`]** - The per-request pipeline
//! - **[`scheduler`]** - Coroutine task scheduling
//! - **[`server`]** - Request, response and response sink types
//! - **[`templates`]** - Template rendering for handlers
//! - **[`logging`]** / **[`runtime_config`]** - Environment-driven setup
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Embedder
//!     participant Engine
//!     participant Scheduler
//!     participant Dispatcher
//!     participant Router as RouteTable
//!     participant Filters as FilterChain
//!     participant Handler
//!
//!     Embedder->>Engine: serve(request, sink)
//!     Engine->>Scheduler: submit(task)
//!     Scheduler->>Dispatcher: handle(request)
//!     Dispatcher->>Router: resolve(method, path)
//!     alt No Route Match
//!         Dispatcher-->>Embedder: 404 Not Found
//!     end
//!     Dispatcher->>Dispatcher: merge params (path > body > query)
//!     Dispatcher->>Filters: run_before(ctx)
//!     Dispatcher->>Handler: handler(ctx)
//!     Handler-->>Dispatcher: Value
//!     Dispatcher->>Dispatcher: encode as negotiated type
//!     Dispatcher->>Filters: run_after(ctx)
//!     Dispatcher-->>Embedder: sink.deliver(response)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use brrtdispatch::{App, ContentType, Request};
//! use brrtdispatch::runtime_config::RuntimeConfig;
//! use serde_json::json;
//!
//! let mut app = App::new();
//! app.content_type(ContentType::Json)
//!     .get("/pets/:id", |ctx| Ok(json!({ "id": ctx.param("id") })))
//!     .after(|ctx| {
//!         ctx.set_header("x-served-by", "brrtdispatch");
//!         Ok(())
//!     });
//!
//! let engine = app.freeze_with_config(RuntimeConfig::with_workers(4)).unwrap();
//! let response = engine.call(Request::get("/pets/7")).unwrap().join().unwrap();
//! assert_eq!(response.status, 200);
//! assert_eq!(response.json().unwrap(), json!({ "id": "7" }));
//! ```

pub mod app;
pub mod content;
pub mod context;
pub mod dispatcher;
pub mod errors;
pub mod filter;
pub mod ids;
pub mod logging;
pub mod params;
pub mod router;
pub mod runtime_config;
pub mod scheduler;
pub mod server;
pub mod templates;

pub use app::{App, Engine};
pub use content::ContentType;
pub use context::RequestContext;
pub use dispatcher::Dispatcher;
pub use errors::{DispatchError, SchedulerError, SetupError};
pub use ids::{RequestId, TaskId};
pub use params::Params;
pub use scheduler::{Scheduler, TaskHandle};
pub use server::{Request, Response, ResponseSink};
pub use templates::{Render, Templates};
