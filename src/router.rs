//! Router seam and the in-process router
//!
//! The dispatcher only needs two operations from a router: per-method route
//! registration and generic middleware registration. [`Router`] is that
//! seam. [`MemoryRouter`] implements it in-process: layers run in
//! registration order, each one either advancing to the next matching layer
//! or stopping.

use crate::DispatchError;
use crate::http::{Body, Method, Request, Response};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{trace, warn};

/// Outcome of a middleware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    /// Advance to the next matching layer
    Continue,
    /// Do not advance
    Stop,
}

/// A pipeline stage or route handler
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, request: &Request, response: &mut Response) -> Result<Next, DispatchError>;
}

/// The two registration operations the dispatcher uses
pub trait Router: Send + Sync + 'static {
    /// Register `handler` for `method` requests matching `path`
    fn register(&mut self, method: Method, path: &str, handler: Arc<dyn Middleware>);

    /// Register `middleware` for every request
    fn use_middleware(&mut self, middleware: Arc<dyn Middleware>);
}

/// Turns a pipeline error into a response
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, error: &DispatchError, request: &Request, response: &mut Response);
}

/// Answers with the error's status code and `{"error": message}`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonErrorHandler;

impl ErrorHandler for JsonErrorHandler {
    fn handle(&self, error: &DispatchError, _request: &Request, response: &mut Response) {
        if response.is_finished() {
            return;
        }
        let message = error.to_string();
        response.set_status(error.status_code());
        if response.json(&json!({ "error": message })).is_err() {
            response.send(message);
        }
    }
}

/// Renders named views
pub trait ViewEngine: Send + Sync {
    fn render(&self, view: &str, model: &Value) -> Result<String, DispatchError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
    Wildcard,
}

/// Route path pattern: literal segments, `:name` parameters and a trailing `*`
#[derive(Debug, Clone, PartialEq, Eq)]
struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    fn parse(raw: &str) -> Self {
        let segments = split(raw)
            .map(|segment| match segment {
                "*" => Segment::Wildcard,
                s if s.starts_with(':') => Segment::Param(s[1..].to_string()),
                s => Segment::Literal(s.to_string()),
            })
            .collect();
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    /// Captured parameters if `path` matches
    fn matches(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let parts: Vec<&str> = split(path).collect();
        let mut params = BTreeMap::new();

        for (position, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Wildcard => {
                    params.insert("*".to_string(), parts.get(position..).unwrap_or_default().join("/"));
                    return Some(params);
                }
                Segment::Literal(literal) => {
                    if parts.get(position) != Some(&literal.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = parts.get(position)?;
                    params.insert(name.clone(), (*value).to_string());
                }
            }
        }

        (parts.len() == self.segments.len()).then_some(params)
    }
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    let path = path.split('?').next().unwrap_or_default();
    path.split('/').filter(|s| !s.is_empty())
}

enum Layer {
    Use(Arc<dyn Middleware>),
    Route {
        method: Method,
        pattern: PathPattern,
        handler: Arc<dyn Middleware>,
    },
}

/// In-process router.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use ioc_runtime::{DispatchError, Method, MemoryRouter, Middleware, Next, Request, Response, Router};
/// use std::sync::Arc;
///
/// struct Hello;
///
/// #[async_trait]
/// impl Middleware for Hello {
///     async fn handle(&self, request: &Request, response: &mut Response) -> Result<Next, DispatchError> {
///         response.send(format!("hello {}", request.param("name").unwrap_or("?")));
///         Ok(Next::Stop)
///     }
/// }
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let mut router = MemoryRouter::new();
/// router.register(Method::Get, "/hello/:name", Arc::new(Hello));
///
/// let response = router.dispatch(Request::get("/hello/world")).await;
/// assert_eq!(response.status(), 200);
///
/// let response = router.dispatch(Request::get("/bye")).await;
/// assert_eq!(response.status(), 404);
/// # });
/// ```
pub struct MemoryRouter {
    layers: Vec<Layer>,
    error_handler: Arc<dyn ErrorHandler>,
    views: Option<Arc<dyn ViewEngine>>,
}

impl MemoryRouter {
    pub fn new() -> Self {
        Self {
            layers: Vec::new(),
            error_handler: Arc::new(JsonErrorHandler),
            views: None,
        }
    }

    pub fn with_error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.error_handler = Arc::new(handler);
        self
    }

    pub fn with_view_engine(mut self, engine: impl ViewEngine + 'static) -> Self {
        self.views = Some(Arc::new(engine));
        self
    }

    pub fn set_view_engine(&mut self, engine: Arc<dyn ViewEngine>) {
        self.views = Some(engine);
    }

    /// Registered routes, in registration order
    pub fn routes(&self) -> Vec<(Method, &str)> {
        self.layers
            .iter()
            .filter_map(|layer| match layer {
                Layer::Route { method, pattern, .. } => Some((*method, pattern.raw.as_str())),
                Layer::Use(_) => None,
            })
            .collect()
    }

    /// Number of registered layers (middleware and routes)
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Run `request` through the layers and finalize the response.
    ///
    /// Errors go to the error handler, unfinished responses become `404`,
    /// views are rendered by the view engine when one is set, and completion
    /// listeners fire last.
    pub async fn dispatch(&self, mut request: Request) -> Response {
        let mut response = Response::new();

        #[cfg(feature = "logging")]
        trace!(target: "ioc_runtime", method = %request.method, path = %request.path, "Dispatching request");

        if let Err(error) = self.run_layers(&mut request, &mut response).await {
            #[cfg(feature = "logging")]
            warn!(
                target: "ioc_runtime",
                method = %request.method,
                path = %request.path,
                error = %error,
                "Request failed"
            );
            self.error_handler.handle(&error, &request, &mut response);
        }

        if !response.is_finished() {
            let message = format!("Cannot {} {}", request.method, request.path);
            response.set_status(404);
            if response.json(&json!({ "error": message })).is_err() {
                response.send(message);
            }
        }

        self.render_view(&request, &mut response);
        response.emit_complete(&request).await;
        response
    }

    async fn run_layers(&self, request: &mut Request, response: &mut Response) -> Result<(), DispatchError> {
        for layer in &self.layers {
            let handler = match layer {
                Layer::Use(middleware) => middleware,
                Layer::Route {
                    method,
                    pattern,
                    handler,
                } => {
                    if *method != request.method {
                        continue;
                    }
                    let Some(params) = pattern.matches(&request.path) else {
                        continue;
                    };
                    request.params = params;
                    handler
                }
            };

            if handler.handle(request, response).await? == Next::Stop {
                break;
            }
        }
        Ok(())
    }

    fn render_view(&self, request: &Request, response: &mut Response) {
        let Some(engine) = &self.views else {
            return;
        };
        let Body::View { name, model } = response.body() else {
            return;
        };

        match engine.render(name, model) {
            Ok(html) => {
                response.set_header("content-type", "text/html; charset=utf-8");
                response.replace_body(Body::Text(html));
            }
            Err(error) => {
                #[cfg(feature = "logging")]
                warn!(target: "ioc_runtime", path = %request.path, error = %error, "View rendering failed");
                #[cfg(not(feature = "logging"))]
                let _ = request;

                response.set_status(error.status_code());
                response.set_header("content-type", "application/json");
                response.replace_body(Body::Json(json!({ "error": error.to_string() })));
            }
        }
    }
}

impl Default for MemoryRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl Router for MemoryRouter {
    fn register(&mut self, method: Method, path: &str, handler: Arc<dyn Middleware>) {
        self.layers.push(Layer::Route {
            method,
            pattern: PathPattern::parse(path),
            handler,
        });
    }

    fn use_middleware(&mut self, middleware: Arc<dyn Middleware>) {
        self.layers.push(Layer::Use(middleware));
    }
}

impl fmt::Debug for MemoryRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryRouter")
            .field("routes", &self.routes())
            .field("layers", &self.layers.len())
            .field("views", &self.views.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Record {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        next: Next,
    }

    #[async_trait]
    impl Middleware for Record {
        async fn handle(&self, request: &Request, _response: &mut Response) -> Result<Next, DispatchError> {
            let mut entry = self.name.to_string();
            if let Some(id) = request.param("id") {
                entry.push_str(&format!("({id})"));
            }
            self.log.lock().unwrap().push(entry);
            Ok(self.next)
        }
    }

    struct Text(&'static str);

    #[async_trait]
    impl Middleware for Text {
        async fn handle(&self, _request: &Request, response: &mut Response) -> Result<Next, DispatchError> {
            response.send(self.0);
            Ok(Next::Continue)
        }
    }

    struct Fail;

    #[async_trait]
    impl Middleware for Fail {
        async fn handle(&self, _request: &Request, _response: &mut Response) -> Result<Next, DispatchError> {
            Err(DispatchError::status(403, "forbidden"))
        }
    }

    fn record(name: &'static str, log: &Arc<Mutex<Vec<String>>>, next: Next) -> Arc<dyn Middleware> {
        Arc::new(Record {
            name,
            log: Arc::clone(log),
            next,
        })
    }

    #[test]
    fn test_path_patterns() {
        let pattern = PathPattern::parse("/users/:id/posts");
        let params = pattern.matches("/users/42/posts").unwrap();
        assert_eq!(params.get("id").map(String::as_str), Some("42"));
        assert!(pattern.matches("/users/42").is_none());
        assert!(pattern.matches("/users/42/posts/7").is_none());

        let wildcard = PathPattern::parse("/static/*");
        let params = wildcard.matches("/static/css/site.css?v=2").unwrap();
        assert_eq!(params.get("*").map(String::as_str), Some("css/site.css"));

        assert!(PathPattern::parse("/").matches("/").is_some());
    }

    #[tokio::test]
    async fn test_layers_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = MemoryRouter::new();
        router.use_middleware(record("first", &log, Next::Continue));
        router.register(Method::Get, "/items/:id", record("route", &log, Next::Continue));
        router.register(Method::Post, "/items/:id", record("post", &log, Next::Continue));
        router.use_middleware(Arc::new(Text("done")));

        let response = router.dispatch(Request::get("/items/9")).await;
        assert_eq!(*log.lock().unwrap(), vec!["first", "route(9)"]);
        assert_eq!(response.body(), &Body::Text("done".into()));
    }

    #[tokio::test]
    async fn test_stop_skips_later_layers() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = MemoryRouter::new();
        router.use_middleware(record("gate", &log, Next::Stop));
        router.use_middleware(record("after", &log, Next::Continue));

        let response = router.dispatch(Request::get("/")).await;
        assert_eq!(*log.lock().unwrap(), vec!["gate"]);
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_errors_reach_error_handler() {
        let mut router = MemoryRouter::new();
        router.use_middleware(Arc::new(Fail));

        let response = router.dispatch(Request::get("/")).await;
        assert_eq!(response.status(), 403);
        assert_eq!(response.body(), &Body::Json(json!({ "error": "forbidden" })));
    }

    #[tokio::test]
    async fn test_view_engine_renders() {
        struct Upper;

        impl ViewEngine for Upper {
            fn render(&self, view: &str, model: &Value) -> Result<String, DispatchError> {
                match view {
                    "shout" => Ok(model.as_str().unwrap_or_default().to_uppercase()),
                    other => Err(DispatchError::Render {
                        view: other.to_string(),
                        reason: "unknown view".into(),
                    }),
                }
            }
        }

        struct View(&'static str);

        #[async_trait]
        impl Middleware for View {
            async fn handle(&self, _request: &Request, response: &mut Response) -> Result<Next, DispatchError> {
                response.render(self.0, json!("hi"));
                Ok(Next::Stop)
            }
        }

        let mut router = MemoryRouter::new().with_view_engine(Upper);
        router.register(Method::Get, "/ok", Arc::new(View("shout")));
        router.register(Method::Get, "/bad", Arc::new(View("missing")));

        let response = router.dispatch(Request::get("/ok")).await;
        assert_eq!(response.body(), &Body::Text("HI".into()));

        let response = router.dispatch(Request::get("/bad")).await;
        assert_eq!(response.status(), 500);
    }
}
