//! Per-request state shared by filters and the handler.
//!
//! A [`RequestContext`] is created for every request, owned by that request's
//! task, and dropped when the response is produced. Nothing in it is pooled
//! or visible to any other request.

use http::{HeaderMap, Method};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::content::ContentType;
use crate::ids::RequestId;
use crate::params::Params;
use crate::router::RouteEntry;
use crate::server::{self, HeaderVec, Request};
use crate::templates::Render;

/// Mutable request state handed to filters and handlers.
pub struct RequestContext {
    request_id: RequestId,
    request: Request,
    route: Option<Arc<RouteEntry>>,
    params: Params,
    status: u16,
    response_headers: HeaderVec,
    content_type: Option<ContentType>,
    body: Vec<u8>,
    redirected: bool,
    renderer: Option<Arc<dyn Render>>,
}

impl RequestContext {
    pub(crate) fn new(
        request_id: RequestId,
        request: Request,
        route: Option<Arc<RouteEntry>>,
        params: Params,
        renderer: Option<Arc<dyn Render>>,
    ) -> Self {
        Self {
            request_id,
            request,
            route,
            params,
            status: 200,
            response_headers: HeaderVec::new(),
            content_type: None,
            body: Vec::new(),
            redirected: false,
            renderer,
        }
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        self.request.method()
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.request.path()
    }

    /// The inbound request, including the raw body bytes.
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Raw request headers (case-insensitive).
    #[must_use]
    pub fn raw_headers(&self) -> &HeaderMap {
        self.request.headers()
    }

    /// Request header by a snake_cased name: `x_http_foo` finds `X-Http-Foo`.
    #[must_use]
    pub fn request_header(&self, name: &str) -> Option<&str> {
        let dashed = name.replace('_', "-");
        self.request.header(&dashed)
    }

    /// Pattern of the matched route, e.g. `/pets/:id`.
    #[must_use]
    pub fn route_pattern(&self) -> Option<&str> {
        self.route.as_deref().map(RouteEntry::pattern)
    }

    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut Params {
        &mut self.params
    }

    /// String parameter by name. Non-string JSON values read as absent; use
    /// [`RequestContext::param_value`] for those.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }

    #[must_use]
    pub fn param_value(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    /// Set a response header; setting the same name again replaces the value.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        server::set_header(&mut self.response_headers, name, value.into());
    }

    /// Set several response headers in order.
    pub fn set_headers<I, K, V>(&mut self, headers: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (name, value) in headers {
            self.set_header(name.as_ref(), value);
        }
    }

    /// Response header set so far in this request.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.response_headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn response_headers(&self) -> &HeaderVec {
        &self.response_headers
    }

    /// Override the response content type for this request only.
    ///
    /// Read when the response is finalized, so the last call wins.
    pub fn content_type(&mut self, content_type: ContentType) {
        self.content_type = Some(content_type);
    }

    /// Content type set with [`RequestContext::content_type`], if any.
    #[must_use]
    pub fn content_type_override(&self) -> Option<ContentType> {
        self.content_type
    }

    /// Append raw bytes to the response body. Written ahead of the serialized
    /// handler return value.
    pub fn write(&mut self, chunk: impl AsRef<[u8]>) {
        self.body.extend_from_slice(chunk.as_ref());
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Answer with `301 Moved Permanently` to `location`.
    ///
    /// Return the result from the handler: the response body is not
    /// serialized, but after filters still run.
    pub fn redirect(&mut self, location: &str) -> Value {
        self.status = 301;
        self.set_header("location", location);
        self.redirected = true;
        Value::Null
    }

    #[must_use]
    pub fn is_redirected(&self) -> bool {
        self.redirected
    }

    /// Render a template with the app's renderer.
    ///
    /// # Errors
    ///
    /// No renderer configured on the app, or the renderer's own error.
    pub fn render(&self, template: &str, locals: &Value) -> anyhow::Result<Value> {
        let renderer = self
            .renderer
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("no template renderer configured"))?;
        Ok(Value::String(renderer.render(template, locals)?))
    }

    pub(crate) fn route_content_type(&self) -> Option<ContentType> {
        self.route.as_ref().and_then(|r| r.content_type)
    }

    pub(crate) fn into_parts(self) -> (u16, HeaderVec, Vec<u8>) {
        (self.status, self.response_headers, self.body)
    }

    #[cfg(test)]
    pub(crate) fn for_test() -> Self {
        Self::new(RequestId::new(), Request::get("/"), None, Params::new(), None)
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("method", self.request.method())
            .field("path", &self.request.path())
            .field("route", &self.route_pattern())
            .field("params", &self.params)
            .field("status", &self.status)
            .field("response_headers", &self.response_headers)
            .field("content_type", &self.content_type)
            .field("body_len", &self.body.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_header_maps_snake_case() {
        let req = Request::get("/").with_header("X-Http-Foo", "bar");
        let ctx = RequestContext::new(RequestId::new(), req, None, Params::new(), None);
        assert_eq!(ctx.request_header("x_http_foo"), Some("bar"));
        assert_eq!(ctx.request_header("X_HTTP_FOO"), Some("bar"));
        assert_eq!(ctx.request_header("x_http_bar"), None);
    }

    #[test]
    fn headers_last_value_wins() {
        let mut ctx = RequestContext::for_test();
        ctx.set_header("x-foo", "1");
        ctx.set_headers([("X-Foo", "2"), ("x-bar", "3")]);
        assert_eq!(ctx.header("x-foo"), Some("2"));
        assert_eq!(ctx.response_headers().len(), 2);
    }

    #[test]
    fn redirect_sets_status_and_location() {
        let mut ctx = RequestContext::for_test();
        assert_eq!(ctx.redirect("/somewhere"), Value::Null);
        assert_eq!(ctx.status(), 301);
        assert_eq!(ctx.header("Location"), Some("/somewhere"));
        assert!(ctx.is_redirected());
    }

    #[test]
    fn render_without_renderer_fails() {
        let ctx = RequestContext::for_test();
        assert!(ctx.render("index.html", &json!({})).is_err());
    }

    #[test]
    fn write_accumulates() {
        let mut ctx = RequestContext::for_test();
        ctx.write("abc");
        ctx.write(b"def");
        assert_eq!(ctx.body(), b"abcdef");
        let (status, _, body) = ctx.into_parts();
        assert_eq!(status, 200);
        assert_eq!(body, b"abcdef");
    }
}
