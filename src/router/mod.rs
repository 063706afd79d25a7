//! # Router Module
//!
//! Route registration and resolution.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Compiling path patterns (`/:foo/things/:bar`) into [`Matcher`]s
//! - Holding the ordered [`RouteTable`] built during app definition
//! - Resolving a request's method and path to a [`RouteMatch`] with the
//!   extracted path parameters
//!
//! ## Architecture
//!
//! Two phases:
//!
//! 1. **Registration**: while the app is being defined, each
//!    `(method, pattern, handler)` binding is compiled and appended to the
//!    per-method list. Registering the same `(method, pattern)` again replaces
//!    the previous binding in place.
//!
//! 2. **Resolution**: for each request the entries for the request method are
//!    tested in registration order and the first match wins. No match means
//!    `RouteNotFound`, which the dispatcher turns into a 404.
//!
//! ## Example
//!
//! ```rust
//! use brrtdispatch::router::{handler_fn, PatternMatcher, RouteTable};
//! use http::Method;
//! use std::sync::Arc;
//!
//! let mut table = RouteTable::new();
//! let matcher = PatternMatcher::compile("/:foo/things/:bar").unwrap();
//! table
//!     .register(Method::GET, Arc::new(matcher), None, handler_fn(|_ctx| Ok("hi".into())))
//!     .unwrap();
//!
//! let m = table.resolve(&Method::GET, "/some/things/are_good").unwrap();
//! assert_eq!(m.get_path_param("foo"), Some("some"));
//! assert!(table.resolve(&Method::GET, "/bad/monkey").is_err());
//! ```

mod core;
mod matcher;

pub use core::{
    handler_fn, Handler, ParamVec, RouteEntry, RouteMatch, RouteTable, MAX_INLINE_PARAMS,
    SUPPORTED_METHODS,
};
pub use matcher::{Matcher, PatternMatcher};
