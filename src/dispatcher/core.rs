//! Dispatcher core module - hot path for request dispatch.
//!
//! # JSF Compliance (Rule 206)
//!
//! This module is part of the request hot path. Each request still allocates
//! its owned path, merged params and response body; the lints below only
//! reject the avoidable allocations:
//!
//! - `clippy::inefficient_to_string` - Catches unnecessary allocations
//! - `clippy::format_push_string` - Prevents format! string building
//! - `clippy::unnecessary_to_owned` - Prevents .to_owned() on borrowed data

// JSF Rule 206 (adapted): deny avoidable allocations in the hot path
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use serde_json::Value;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::content::{ContentNegotiator, ContentType};
use crate::context::RequestContext;
use crate::errors::{panic_message, DispatchError};
use crate::filter::FilterChain;
use crate::ids::RequestId;
use crate::params::{ParamResolver, Params};
use crate::router::{RouteEntry, RouteTable};
use crate::server::{set_header, HeaderVec, Request, Response};
use crate::templates::Render;

/// Header carrying the request id in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Runs one request through the pipeline:
///
/// `Matching → PreFilter → Handling → Serializing → PostFilter → Done`
///
/// Any stage may divert into error dispatch, which still produces exactly one
/// response. Built by `App::freeze` and shared read-only between request
/// tasks; nothing in it is mutated while serving.
pub struct Dispatcher {
    routes: RouteTable,
    filters: FilterChain,
    negotiator: ContentNegotiator,
    resolver: ParamResolver,
    renderer: Option<Arc<dyn Render>>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        routes: RouteTable,
        filters: FilterChain,
        negotiator: ContentNegotiator,
        renderer: Option<Arc<dyn Render>>,
    ) -> Self {
        Self {
            routes,
            filters,
            negotiator,
            resolver: ParamResolver,
            renderer,
        }
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    #[must_use]
    pub fn negotiator(&self) -> &ContentNegotiator {
        &self.negotiator
    }

    /// Dispatch a request synchronously on the calling thread or coroutine.
    ///
    /// Never fails: every [`DispatchError`] becomes an error response.
    #[must_use]
    pub fn handle(&self, request: Request) -> Response {
        let start = Instant::now();
        let request_id = RequestId::from_header_or_new(request.header(REQUEST_ID_HEADER));
        let method = request.method().clone();
        let path = request.path().to_owned();

        debug!(
            request_id = %request_id,
            method = %method,
            path = %path,
            "Dispatch start"
        );

        // Matching: unmatched requests skip params, filters and the handler
        let route_match = match self.routes.resolve(&method, &path) {
            Ok(m) => m,
            Err(err) => {
                let content_type = self.negotiator.resolve_for_route(None, None);
                let response = error_response(request_id, &err, HeaderVec::new(), content_type);
                log_completion(request_id, &method, &path, response.status, start);
                return response;
            }
        };

        let (params, mut failure) = match self.resolver.resolve(
            request.query(),
            &route_match.path_params,
            request.body(),
            request.content_type(),
        ) {
            Ok(params) => (params, None),
            Err(err) => {
                warn!(request_id = %request_id, error = %err, "Request body rejected");
                (Params::new(), Some(err))
            }
        };

        let route = route_match.route;
        let mut ctx = RequestContext::new(
            request_id,
            request,
            Some(Arc::clone(&route)),
            params,
            self.renderer.clone(),
        );

        // PreFilter
        if let Err(err) = self.filters.run_before(&mut ctx) {
            failure.get_or_insert(err);
        }

        // Handling and Serializing
        if failure.is_none() {
            if let Err(err) = self.run_handler(&route, &mut ctx) {
                failure = Some(err);
            }
        }
        let content_type = self
            .negotiator
            .resolve_for_route(ctx.route_content_type(), ctx.content_type_override());

        // PostFilter: exactly once for every matched request
        if let Err(err) = self.filters.run_after(&mut ctx) {
            failure.get_or_insert(err);
        }

        // Done
        let response = match failure {
            None => {
                let (status, headers, body) = ctx.into_parts();
                finish(request_id, status, headers, body, content_type)
            }
            Some(err) => {
                let (_, headers, _) = ctx.into_parts();
                error_response(request_id, &err, headers, content_type)
            }
        };
        log_completion(request_id, &method, &path, response.status, start);
        response
    }

    /// Invoke the handler and append its encoded return value to the body.
    fn run_handler(
        &self,
        route: &RouteEntry,
        ctx: &mut RequestContext,
    ) -> Result<(), DispatchError> {
        let value = invoke(route, ctx)?;
        if ctx.is_redirected() {
            debug!(request_id = %ctx.request_id(), "Redirect - skipping serialization");
            return Ok(());
        }
        let content_type = self
            .negotiator
            .resolve_for_route(route.content_type, ctx.content_type_override());
        let encoded = self.negotiator.encode(content_type, &value)?;
        ctx.write(encoded);
        Ok(())
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes)
            .field("before_filters", &self.filters.before_len())
            .field("after_filters", &self.filters.after_len())
            .field("negotiator", &self.negotiator)
            .field("renderer", &self.renderer.is_some())
            .finish()
    }
}

fn invoke(route: &RouteEntry, ctx: &mut RequestContext) -> Result<Value, DispatchError> {
    let request_id = ctx.request_id();
    match catch_unwind(AssertUnwindSafe(|| (route.handler)(ctx))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            error!(
                request_id = %request_id,
                route_pattern = %route.pattern(),
                error = %format!("{e:#}"),
                "Handler returned an error"
            );
            Err(DispatchError::Handler(e))
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(
                request_id = %request_id,
                route_pattern = %route.pattern(),
                panic_message = %message,
                "Handler panicked - CRITICAL"
            );
            Err(DispatchError::Handler(anyhow::anyhow!(
                "handler panicked: {message}"
            )))
        }
    }
}

fn finish(
    request_id: RequestId,
    status: u16,
    mut headers: HeaderVec,
    body: Vec<u8>,
    content_type: ContentType,
) -> Response {
    let has_content_type = headers
        .iter()
        .any(|(k, _)| k.eq_ignore_ascii_case("content-type"));
    if !has_content_type {
        set_header(&mut headers, "content-type", content_type.header_value().to_owned());
    }
    set_header(&mut headers, "content-length", body.len().to_string());
    set_header(&mut headers, REQUEST_ID_HEADER, request_id.to_string());
    Response::new(status, headers, body)
}

/// Error responses keep the request's headers but replace status and body.
fn error_response(
    request_id: RequestId,
    err: &DispatchError,
    mut headers: HeaderVec,
    content_type: ContentType,
) -> Response {
    let status = err.status();
    if status >= 500 {
        error!(request_id = %request_id, status, error = %err, "Dispatch failed");
    } else {
        warn!(request_id = %request_id, status, error = %err, "Dispatch rejected");
    }

    let message = err.public_message();
    let body = match content_type {
        ContentType::Json => serde_json::json!({ "error": message })
            .to_string()
            .into_bytes(),
        _ => message.as_bytes().to_vec(),
    };
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case("content-type"));
    set_header(&mut headers, "content-type", content_type.header_value().to_owned());
    set_header(&mut headers, "content-length", body.len().to_string());
    set_header(&mut headers, REQUEST_ID_HEADER, request_id.to_string());
    Response::new(status, headers, body)
}

fn log_completion(
    request_id: RequestId,
    method: &http::Method,
    path: &str,
    status: u16,
    start: Instant,
) {
    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status,
        latency_ms,
        "Request complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::{handler_fn, PatternMatcher};
    use http::Method;
    use serde_json::json;

    fn dispatcher(routes: RouteTable, filters: FilterChain) -> Dispatcher {
        Dispatcher::new(routes, filters, ContentNegotiator::new(), None)
    }

    fn table(
        method: Method,
        pattern: &str,
        ct: Option<ContentType>,
        f: crate::router::Handler,
    ) -> RouteTable {
        let mut routes = RouteTable::new();
        routes
            .register(method, Arc::new(PatternMatcher::compile(pattern).unwrap()), ct, f)
            .unwrap();
        routes
    }

    #[test]
    fn not_found_skips_filters() {
        let mut filters = FilterChain::new();
        filters.add_before(|_ctx: &mut RequestContext| -> anyhow::Result<()> {
            panic!("must not run")
        });
        let d = dispatcher(RouteTable::new(), filters);
        let res = d.handle(Request::get("/missing"));
        assert_eq!(res.status, 404);
        assert_eq!(res.body_str(), "Not Found");
        assert_eq!(res.get_header("content-type"), Some("text/html; charset=utf-8"));
        assert_eq!(res.get_header("content-length"), Some("9"));
    }

    #[test]
    fn request_id_is_echoed() {
        let d = dispatcher(
            table(Method::GET, "/", None, handler_fn(|_| Ok(json!("hi")))),
            FilterChain::new(),
        );
        let id = RequestId::new().to_string();
        let res = d.handle(Request::get("/").with_header("X-Request-Id", &id));
        assert_eq!(res.get_header(REQUEST_ID_HEADER), Some(id.as_str()));

        let res = d.handle(Request::get("/").with_header("x-request-id", "not-a-ulid"));
        let fresh = res.get_header(REQUEST_ID_HEADER).unwrap();
        assert!(fresh.parse::<RequestId>().is_ok());
    }

    #[test]
    fn decode_error_skips_handler_but_runs_filters() {
        let mut filters = FilterChain::new();
        filters.add_before(|ctx: &mut RequestContext| {
            ctx.set_header("x-before", ctx.params().len().to_string());
            Ok(())
        });
        filters.add_after(|ctx: &mut RequestContext| {
            ctx.set_header("x-after", "ran");
            Ok(())
        });
        let d = dispatcher(
            table(
                Method::POST,
                "/items",
                Some(ContentType::Json),
                handler_fn(|_| -> anyhow::Result<Value> { panic!("handler must be skipped") }),
            ),
            filters,
        );
        let res = d.handle(
            Request::post("/items?q=1")
                .with_content_type("application/json")
                .with_body("{not json"),
        );
        assert_eq!(res.status, 400);
        assert_eq!(res.json().unwrap(), json!({"error": "Bad Request"}));
        assert_eq!(res.get_header("x-before"), Some("0"));
        assert_eq!(res.get_header("x-after"), Some("ran"));
    }

    #[test]
    fn handler_error_keeps_headers_and_runs_after_filters() {
        let mut filters = FilterChain::new();
        filters.add_after(|ctx: &mut RequestContext| {
            ctx.set_header("x-after", "ran");
            Ok(())
        });
        let d = dispatcher(
            table(
                Method::GET,
                "/boom",
                None,
                handler_fn(|ctx| {
                    ctx.set_header("x-seen", "yes");
                    ctx.write("partial");
                    Err(anyhow::anyhow!("database unavailable"))
                }),
            ),
            filters,
        );
        let res = d.handle(Request::get("/boom"));
        assert_eq!(res.status, 500);
        assert_eq!(res.body_str(), "Internal Server Error");
        assert_eq!(res.get_header("x-seen"), Some("yes"));
        assert_eq!(res.get_header("x-after"), Some("ran"));
    }

    #[test]
    fn redirect_skips_serialization() {
        let after_runs = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&after_runs);
        let mut filters = FilterChain::new();
        filters.add_after(move |_: &mut RequestContext| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        });
        let redirect = handler_fn(|ctx| Ok(ctx.redirect("/new")));
        let d = dispatcher(
            table(Method::GET, "/old", Some(ContentType::Json), redirect),
            filters,
        );
        let res = d.handle(Request::get("/old"));
        assert_eq!(res.status, 301);
        assert_eq!(res.get_header("location"), Some("/new"));
        assert!(res.body.is_empty());
        assert_eq!(after_runs.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn accumulated_body_precedes_return_value() {
        let d = dispatcher(
            table(
                Method::GET,
                "/",
                Some(ContentType::Text),
                handler_fn(|ctx| {
                    ctx.write("head:");
                    Ok(json!("tail"))
                }),
            ),
            FilterChain::new(),
        );
        let res = d.handle(Request::get("/"));
        assert_eq!(res.body_str(), "head:tail");
        assert_eq!(res.get_header("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(res.get_header("content-length"), Some("9"));
    }
}
