//! # Server Module
//!
//! The types an embedder exchanges with the engine. The engine never touches
//! sockets: a front end parses the wire into a [`Request`], hands it to
//! [`crate::Engine::serve`] together with a [`ResponseSink`], and writes the
//! resulting [`Response`] back out.
//!
//! ```rust
//! use brrtdispatch::server::{Request, Response};
//!
//! let req = Request::post("/pets?dry_run=true")
//!     .with_content_type("application/json")
//!     .with_body(r#"{"name":"Rex"}"#);
//! assert_eq!(req.query(), "dry_run=true");
//!
//! let sink = |res: Response| println!("{} {}", res.status, res.body_str());
//! # let _ = sink;
//! ```

mod request;
mod response;
mod sink;

pub use request::Request;
pub use response::{set_header, HeaderVec, Response, MAX_INLINE_HEADERS};
pub use sink::{channel_sink, ResponseSink};
