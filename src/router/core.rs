//! Route table - hot path for request routing.
//!
//! Written only during app definition; after `App::freeze` the table is shared
//! read-only between every in-flight request through an `Arc`.

// JSF Rule 206 (adapted): deny avoidable allocations on the match path
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use http::Method;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::matcher::Matcher;
use crate::content::ContentType;
use crate::context::RequestContext;
use crate::errors::{DispatchError, SetupError};

/// Maximum number of path parameters before heap allocation.
/// Most routes have ≤4 path params (e.g., `/users/:id/posts/:post_id`).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the hot path.
///
/// Param names use `Arc<str>` because they come from the compiled pattern
/// (known at startup) and are cloned for every match; values are per-request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// The fixed set of verbs routes can be registered for.
pub const SUPPORTED_METHODS: [Method; 7] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
];

/// A route handler: a pure function of the request context.
///
/// The returned value is staged and serialized according to the negotiated
/// content type once the handler returns.
pub type Handler = Arc<dyn Fn(&mut RequestContext) -> anyhow::Result<Value> + Send + Sync>;

/// Box a closure as a [`Handler`], fixing its signature for inference.
pub fn handler_fn<F>(f: F) -> Handler
where
    F: Fn(&mut RequestContext) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A registered (method, pattern, handler) binding. Immutable once registered.
pub struct RouteEntry {
    pub method: Method,
    pub matcher: Arc<dyn Matcher>,
    pub handler: Handler,
    /// Content type declared for this route, overriding the app default
    pub content_type: Option<ContentType>,
}

impl RouteEntry {
    /// Pattern source text; together with `method` this is the route identity.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.matcher.source()
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("method", &self.method)
            .field("pattern", &self.pattern())
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Result of successfully resolving a request to a route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched entry. Cloned `Arc`, so a later re-registration does not
    /// affect a request that already resolved.
    pub route: Arc<RouteEntry>,
    /// Path parameters extracted by the matcher
    pub path_params: ParamVec,
}

impl RouteMatch {
    /// Get a path parameter by name
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Ordered routes per method; first structural match wins.
#[derive(Default, Clone)]
pub struct RouteTable {
    routes: HashMap<Method, Vec<Arc<RouteEntry>>>,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route.
    ///
    /// Re-registering the same (method, pattern) replaces the earlier entry in
    /// place, keeping its position in the match order. Other methods bound to
    /// the same pattern are untouched.
    ///
    /// # Errors
    ///
    /// [`SetupError::UnsupportedMethod`] for verbs outside [`SUPPORTED_METHODS`].
    pub fn register(
        &mut self,
        method: Method,
        matcher: Arc<dyn Matcher>,
        content_type: Option<ContentType>,
        handler: Handler,
    ) -> Result<(), SetupError> {
        if !SUPPORTED_METHODS.contains(&method) {
            return Err(SetupError::UnsupportedMethod(method));
        }

        let entry = Arc::new(RouteEntry {
            method: method.clone(),
            matcher,
            handler,
            content_type,
        });
        let entries = self.routes.entry(method.clone()).or_default();

        if let Some(slot) = entries
            .iter_mut()
            .find(|existing| existing.pattern() == entry.pattern())
        {
            warn!(
                method = %method,
                pattern = %entry.pattern(),
                "Replaced existing route"
            );
            *slot = entry;
        } else {
            info!(
                method = %method,
                pattern = %entry.pattern(),
                content_type = ?entry.content_type,
                "Route registered"
            );
            entries.push(entry);
        }
        Ok(())
    }

    /// Resolve `method` + `path` to the first matching entry.
    ///
    /// # Errors
    ///
    /// [`DispatchError::RouteNotFound`] when no entry for `method` matches.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<RouteMatch, DispatchError> {
        let found = self.routes.get(method).and_then(|entries| {
            entries.iter().find_map(|entry| {
                entry.matcher.matches(path).map(|path_params| RouteMatch {
                    route: Arc::clone(entry),
                    path_params,
                })
            })
        });

        match found {
            Some(route_match) => {
                debug!(
                    method = %method,
                    path = %path,
                    route_pattern = %route_match.route.pattern(),
                    path_params = ?route_match.path_params,
                    "Route matched"
                );
                Ok(route_match)
            }
            None => {
                warn!(method = %method, path = %path, "No route matched");
                Err(DispatchError::RouteNotFound {
                    method: method.clone(),
                    path: path.to_owned(),
                })
            }
        }
    }

    /// Total number of registered routes across all methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(method, pattern)` pairs in match order, methods in
    /// [`SUPPORTED_METHODS`] order.
    #[must_use]
    pub fn routes(&self) -> Vec<(Method, String)> {
        SUPPORTED_METHODS
            .iter()
            .filter_map(|m| self.routes.get(m))
            .flat_map(|entries| {
                entries
                    .iter()
                    .map(|e| (e.method.clone(), e.pattern().to_owned()))
            })
            .collect()
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.routes())
            .finish()
    }
}
