//! App definition and the frozen engine.
//!
//! An [`App`] is built single-threaded: routes, filters, the default content
//! type and the renderer are declared on it. [`App::freeze`] validates the
//! declarations and produces an [`Engine`]. The engine shares the finished
//! tables through an `Arc` and never mutates them, so serving takes no locks.

use http::Method;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use crate::content::{ContentNegotiator, ContentType};
use crate::context::RequestContext;
use crate::dispatcher::Dispatcher;
use crate::errors::{SchedulerError, SetupError};
use crate::filter::FilterChain;
use crate::router::{handler_fn, Handler, Matcher, PatternMatcher, RouteTable, SUPPORTED_METHODS};
use crate::runtime_config::RuntimeConfig;
use crate::scheduler::{Scheduler, TaskHandle};
use crate::server::{Request, Response, ResponseSink};
use crate::templates::Render;

/// Route, filter and content-type declarations for one application.
#[derive(Default)]
pub struct App {
    routes: RouteTable,
    filters: FilterChain,
    negotiator: ContentNegotiator,
    renderer: Option<Arc<dyn Render>>,
    errors: Vec<SetupError>,
}

impl App {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `method` and `pattern`.
    ///
    /// Registering the same method and pattern again replaces the earlier
    /// handler. Unsupported methods and invalid patterns are reported by
    /// [`App::freeze`].
    pub fn route<F>(&mut self, method: Method, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut RequestContext) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.add(method, pattern, None, handler_fn(handler))
    }

    /// Like [`App::route`], overriding the app's content type for this route.
    pub fn route_with_content_type<F>(
        &mut self,
        method: Method,
        pattern: &str,
        content_type: ContentType,
        handler: F,
    ) -> &mut Self
    where
        F: Fn(&mut RequestContext) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.add(method, pattern, Some(content_type), handler_fn(handler))
    }

    /// Bind a handler behind a custom [`Matcher`].
    pub fn route_matcher<M, F>(
        &mut self,
        method: Method,
        matcher: M,
        content_type: Option<ContentType>,
        handler: F,
    ) -> &mut Self
    where
        M: Matcher + 'static,
        F: Fn(&mut RequestContext) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.register(method, Arc::new(matcher), content_type, handler_fn(handler))
    }

    pub fn get<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut RequestContext) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.route(Method::GET, pattern, handler)
    }

    pub fn post<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut RequestContext) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.route(Method::POST, pattern, handler)
    }

    pub fn put<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut RequestContext) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.route(Method::PUT, pattern, handler)
    }

    pub fn patch<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut RequestContext) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.route(Method::PATCH, pattern, handler)
    }

    pub fn delete<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut RequestContext) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.route(Method::DELETE, pattern, handler)
    }

    pub fn head<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut RequestContext) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.route(Method::HEAD, pattern, handler)
    }

    pub fn options<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut RequestContext) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.route(Method::OPTIONS, pattern, handler)
    }

    /// Bind one handler to `pattern` for every supported method.
    pub fn any<F>(&mut self, pattern: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut RequestContext) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        let handler = handler_fn(handler);
        for method in SUPPORTED_METHODS {
            self.add(method, pattern, None, Arc::clone(&handler));
        }
        self
    }

    /// Declare the app-wide response content type (default: HTML).
    pub fn content_type(&mut self, content_type: ContentType) -> &mut Self {
        self.negotiator.declare_default(content_type);
        self
    }

    /// Add a filter run before every matched handler.
    pub fn before<F>(&mut self, filter: F) -> &mut Self
    where
        F: Fn(&mut RequestContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.filters.add_before(filter);
        self
    }

    /// Add a filter run after every matched handler, even when it failed.
    pub fn after<F>(&mut self, filter: F) -> &mut Self
    where
        F: Fn(&mut RequestContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.filters.add_after(filter);
        self
    }

    /// Renderer used by [`RequestContext::render`].
    pub fn templates<R: Render + 'static>(&mut self, renderer: R) -> &mut Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    fn add(
        &mut self,
        method: Method,
        pattern: &str,
        content_type: Option<ContentType>,
        handler: Handler,
    ) -> &mut Self {
        match PatternMatcher::compile(pattern) {
            Ok(matcher) => self.register(method, Arc::new(matcher), content_type, handler),
            Err(e) => {
                self.errors.push(e);
                self
            }
        }
    }

    fn register(
        &mut self,
        method: Method,
        matcher: Arc<dyn Matcher>,
        content_type: Option<ContentType>,
        handler: Handler,
    ) -> &mut Self {
        if let Err(e) = self.routes.register(method, matcher, content_type, handler) {
            self.errors.push(e);
        }
        self
    }

    /// Validate the declarations and build an engine configured from the
    /// environment (see [`RuntimeConfig::from_env`]).
    ///
    /// # Errors
    ///
    /// The first [`SetupError`] recorded while the app was defined.
    pub fn freeze(self) -> Result<Engine, SetupError> {
        self.freeze_with_config(RuntimeConfig::from_env())
    }

    /// [`App::freeze`] with an explicit runtime configuration.
    ///
    /// # Errors
    ///
    /// The first [`SetupError`] recorded while the app was defined.
    pub fn freeze_with_config(self, config: RuntimeConfig) -> Result<Engine, SetupError> {
        let dispatcher = self.into_dispatcher()?;
        Ok(Engine::new(dispatcher, Scheduler::new(config)))
    }

    /// Validate the declarations and build a bare dispatcher, for embedders
    /// that schedule requests themselves.
    ///
    /// # Errors
    ///
    /// The first [`SetupError`] recorded while the app was defined.
    pub fn into_dispatcher(self) -> Result<Dispatcher, SetupError> {
        if let Some(first) = self.errors.into_iter().next() {
            error!(error = %first, "App definition rejected");
            return Err(first);
        }
        info!(
            routes = self.routes.len(),
            before_filters = self.filters.before_len(),
            after_filters = self.filters.after_len(),
            default_content_type = ?self.negotiator.app_default(),
            "App frozen"
        );
        Ok(Dispatcher::new(
            self.routes,
            self.filters,
            self.negotiator,
            self.renderer,
        ))
    }
}

/// A frozen app, ready to serve requests concurrently.
#[derive(Debug, Clone)]
pub struct Engine {
    dispatcher: Arc<Dispatcher>,
    scheduler: Scheduler,
}

impl Engine {
    #[must_use]
    pub fn new(dispatcher: Dispatcher, scheduler: Scheduler) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            scheduler,
        }
    }

    /// Run the request as its own task and return a handle to its response.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Spawn`] when the task could not be started.
    pub fn call(&self, request: Request) -> Result<TaskHandle<Response>, SchedulerError> {
        let dispatcher = Arc::clone(&self.dispatcher);
        self.scheduler.submit(move || dispatcher.handle(request))
    }

    /// Run the request as its own task and hand the response to `sink`.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Spawn`] when the task could not be started; the
    /// sink is dropped without a response in that case.
    pub fn serve<S: ResponseSink>(
        &self,
        request: Request,
        sink: S,
    ) -> Result<TaskHandle<()>, SchedulerError> {
        let dispatcher = Arc::clone(&self.dispatcher);
        self.scheduler
            .submit(move || sink.deliver(dispatcher.handle(request)))
    }

    /// Dispatch on the calling thread or coroutine, bypassing the scheduler.
    #[must_use]
    pub fn handle(&self, request: Request) -> Response {
        self.dispatcher.handle(request)
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// `(method, pattern)` pairs in match order.
    #[must_use]
    pub fn routes(&self) -> Vec<(Method, String)> {
        self.dispatcher.routes().routes()
    }

    /// Print the route table to stdout.
    pub fn dump_routes(&self) {
        let routes = self.routes();
        println!("[routes] count={}", routes.len());
        for (method, pattern) in routes {
            println!("[route] {method} {pattern}");
        }
    }
}
