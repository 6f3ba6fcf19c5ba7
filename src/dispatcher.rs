//! Request dispatch pipeline
//!
//! The dispatcher orders the interceptors once, then wires four stages into a
//! [`Router`]:
//!
//! 1. pre-handle: arms the after-completion listener, then runs `pre_handle`
//!    on each interceptor; the first `false` stops the request
//! 2. one route stage per [`RouteConfig`]: calls the controller and attaches
//!    its result as [`ResponseData`]
//! 3. post-handle: runs `post_handle` on each interceptor, always advances
//! 4. resolve: writes the model as JSON, or renders the view, unless the
//!    response is already finished

use crate::definition::RouteMapping;
use crate::http::{CompletionListener, Method, Request, Response, ResponseData};
use crate::provider::rank_key;
use crate::router::{Middleware, Next, Router};
use crate::{DiError, DispatchError, Token};
use ahash::RandomState;
use async_trait::async_trait;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace, warn};

/// Which interceptor hooks take part in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterceptorHooks {
    pub pre_handle: bool,
    pub post_handle: bool,
    pub after_completion: bool,
}

impl InterceptorHooks {
    pub const ALL: Self = Self {
        pre_handle: true,
        post_handle: true,
        after_completion: true,
    };

    pub const NONE: Self = Self {
        pre_handle: false,
        post_handle: false,
        after_completion: false,
    };
}

impl Default for InterceptorHooks {
    fn default() -> Self {
        Self::ALL
    }
}

/// Participates in the pipeline around route handlers.
///
/// Only the hooks reported by [`hooks`](Interceptor::hooks) are called; it is
/// read once when the dispatcher is configured.
#[async_trait]
pub trait Interceptor: Send + Sync + 'static {
    fn hooks(&self) -> InterceptorHooks {
        InterceptorHooks::ALL
    }

    /// Return `false` to stop the request before the route handler
    async fn pre_handle(&self, _request: &Request, _response: &mut Response) -> Result<bool, DispatchError> {
        Ok(true)
    }

    async fn post_handle(&self, _request: &Request, _response: &mut Response) -> Result<(), DispatchError> {
        Ok(())
    }

    /// Runs once the response is finalized, whatever happened before
    async fn after_completion(&self, _request: &Request, _response: &Response) -> Result<(), DispatchError> {
        Ok(())
    }
}

/// Answers the routes declared on its definition.
///
/// `handler` is the handler name of the matched [`RouteMapping`]. The returned
/// value becomes the response model.
#[async_trait]
pub trait Controller: Send + Sync + 'static {
    async fn handle(
        &self,
        handler: &str,
        request: &Request,
        response: &mut Response,
    ) -> Result<Value, DispatchError>;
}

/// A route bound to a controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteConfig {
    pub method: Method,
    pub path: String,
    pub handler: String,
    pub view: Option<String>,
    pub controller: Token,
}

struct InterceptorEntry {
    token: Token,
    order: Option<i32>,
    hooks: InterceptorHooks,
    interceptor: Arc<dyn Interceptor>,
}

/// Orders interceptors and wires the pipeline into a router
pub struct Dispatcher {
    pending: Vec<InterceptorEntry>,
    chain: Option<Arc<[InterceptorEntry]>>,
    controllers: HashMap<Token, Arc<dyn Controller>, RandomState>,
    routes: Vec<RouteConfig>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            chain: None,
            controllers: HashMap::default(),
            routes: Vec::new(),
        }
    }

    /// Add an interceptor with its ordering rank
    pub fn add_interceptor(&mut self, token: Token, interceptor: Arc<dyn Interceptor>, order: Option<i32>) {
        self.pending.push(InterceptorEntry {
            token,
            order,
            hooks: InterceptorHooks::NONE,
            interceptor,
        });
    }

    /// Add a controller and the routes it answers
    pub fn add_controller(&mut self, token: Token, controller: Arc<dyn Controller>, routes: &[RouteMapping]) {
        self.controllers.insert(token, controller);
        self.routes.extend(routes.iter().map(|route| RouteConfig {
            method: route.method,
            path: route.path.clone(),
            handler: route.handler.clone(),
            view: route.view.clone(),
            controller: token,
        }));
    }

    /// Routes in registration order
    #[inline]
    pub fn routes(&self) -> &[RouteConfig] {
        &self.routes
    }

    #[inline]
    pub fn is_configured(&self) -> bool {
        self.chain.is_some()
    }

    /// Interceptor tokens in pipeline order (empty before `configure`)
    pub fn interceptors(&self) -> Vec<Token> {
        self.chain
            .as_deref()
            .map(|chain| chain.iter().map(|entry| entry.token).collect())
            .unwrap_or_default()
    }

    /// Order the interceptors by rank (stable) and register the pipeline on `router`
    pub fn configure<R: Router + ?Sized>(&mut self, router: &mut R) -> crate::Result<()> {
        if self.chain.is_some() {
            return Err(DiError::illegal_state("dispatcher is already configured"));
        }

        let mut entries = std::mem::take(&mut self.pending);
        entries.sort_by_key(|entry| rank_key(entry.order));
        for entry in &mut entries {
            entry.hooks = entry.interceptor.hooks();
        }
        let chain: Arc<[InterceptorEntry]> = entries.into();

        #[cfg(feature = "logging")]
        debug!(
            target: "ioc_runtime",
            interceptors = ?chain.iter().map(|e| e.token.name()).collect::<Vec<_>>(),
            routes = self.routes.len(),
            "Configuring dispatcher"
        );

        self.configure_middlewares(router, &chain)?;
        self.chain = Some(chain);
        Ok(())
    }

    fn configure_middlewares<R: Router + ?Sized>(&self, router: &mut R, chain: &Arc<[InterceptorEntry]>) -> crate::Result<()> {
        // Resolve every controller first so a bad route registers nothing
        let mut stages = Vec::with_capacity(self.routes.len());
        for route in &self.routes {
            let controller = self
                .controllers
                .get(&route.controller)
                .ok_or_else(|| DiError::not_found(route.controller, None))?;
            stages.push(RouteStage {
                controller: Arc::clone(controller),
                controller_name: route.controller.name(),
                handler: route.handler.clone(),
                view: route.view.clone(),
            });
        }

        router.use_middleware(Arc::new(PreHandleStage {
            chain: Arc::clone(chain),
        }));

        for (route, stage) in self.routes.iter().zip(stages) {
            #[cfg(feature = "logging")]
            debug!(
                target: "ioc_runtime",
                method = %route.method,
                path = %route.path,
                controller = route.controller.name(),
                handler = %route.handler,
                "Registering route"
            );

            router.register(route.method, &route.path, Arc::new(stage));
        }

        router.use_middleware(Arc::new(PostHandleStage {
            chain: Arc::clone(chain),
        }));
        router.use_middleware(Arc::new(ResolveStage));
        Ok(())
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("interceptors", &self.interceptors())
            .field("controllers", &self.controllers.len())
            .field("routes", &self.routes)
            .finish()
    }
}

struct PreHandleStage {
    chain: Arc<[InterceptorEntry]>,
}

#[async_trait]
impl Middleware for PreHandleStage {
    async fn handle(&self, request: &Request, response: &mut Response) -> Result<Next, DispatchError> {
        if self.chain.iter().any(|entry| entry.hooks.after_completion) {
            response.on_complete(AfterCompletion {
                chain: Arc::clone(&self.chain),
            });
        }

        for entry in self.chain.iter().filter(|entry| entry.hooks.pre_handle) {
            let proceed = guarded(
                || format!("{}::pre_handle", entry.token.name()),
                entry.interceptor.pre_handle(request, response),
            )
            .await?;
            if !proceed {
                #[cfg(feature = "logging")]
                debug!(
                    target: "ioc_runtime",
                    interceptor = entry.token.name(),
                    path = %request.path,
                    "Request stopped in pre-handle"
                );
                return Ok(Next::Stop);
            }
        }
        Ok(Next::Continue)
    }
}

struct AfterCompletion {
    chain: Arc<[InterceptorEntry]>,
}

#[async_trait]
impl CompletionListener for AfterCompletion {
    async fn on_complete(&self, request: &Request, response: &Response) {
        for entry in self.chain.iter().filter(|entry| entry.hooks.after_completion) {
            let outcome = guarded(
                || format!("{}::after_completion", entry.token.name()),
                entry.interceptor.after_completion(request, response),
            )
            .await;
            if let Err(_error) = outcome {
                #[cfg(feature = "logging")]
                warn!(
                    target: "ioc_runtime",
                    interceptor = entry.token.name(),
                    error = %_error,
                    "After-completion hook failed"
                );
            }
        }
    }
}

struct RouteStage {
    controller: Arc<dyn Controller>,
    controller_name: &'static str,
    handler: String,
    view: Option<String>,
}

#[async_trait]
impl Middleware for RouteStage {
    async fn handle(&self, request: &Request, response: &mut Response) -> Result<Next, DispatchError> {
        #[cfg(feature = "logging")]
        trace!(
            target: "ioc_runtime",
            controller = self.controller_name,
            handler = %self.handler,
            "Invoking route handler"
        );

        let model = guarded(
            || format!("{}::{}", self.controller_name, self.handler),
            self.controller.handle(&self.handler, request, response),
        )
        .await?;

        response.set_data(ResponseData {
            model,
            view: self.view.clone(),
        });
        Ok(Next::Continue)
    }
}

/// Await `call`, turning a panic into [`DispatchError::Panicked`] labelled by `label`
async fn guarded<T, F>(label: impl FnOnce() -> String, call: F) -> Result<T, DispatchError>
where
    F: Future<Output = Result<T, DispatchError>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(DispatchError::Panicked(format!("{}: {}", label(), panic_message(&*panic)))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

struct PostHandleStage {
    chain: Arc<[InterceptorEntry]>,
}

#[async_trait]
impl Middleware for PostHandleStage {
    async fn handle(&self, request: &Request, response: &mut Response) -> Result<Next, DispatchError> {
        // Every interceptor runs; the first failure is reported afterwards
        let mut first_error = None;
        for entry in self.chain.iter().filter(|entry| entry.hooks.post_handle) {
            let outcome = guarded(
                || format!("{}::post_handle", entry.token.name()),
                entry.interceptor.post_handle(request, response),
            )
            .await;
            if let Err(error) = outcome {
                first_error.get_or_insert(error);
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(Next::Continue),
        }
    }
}

struct ResolveStage;

#[async_trait]
impl Middleware for ResolveStage {
    async fn handle(&self, _request: &Request, response: &mut Response) -> Result<Next, DispatchError> {
        if response.is_finished() {
            #[cfg(feature = "logging")]
            trace!(target: "ioc_runtime", path = %_request.path, "Response already finished");
            return Ok(Next::Stop);
        }

        // No route answered: leave the response to the router
        let Some(data) = response.data().cloned() else {
            return Ok(Next::Continue);
        };

        match data.view {
            None => response.json(&data.model)?,
            Some(view) => response.render(view, data.model),
        }
        Ok(Next::Stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::Body;
    use crate::router::MemoryRouter;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    type Log = Arc<Mutex<Vec<String>>>;

    struct Logged {
        name: &'static str,
        log: Log,
        allow: bool,
        hooks: InterceptorHooks,
    }

    #[async_trait]
    impl Interceptor for Logged {
        fn hooks(&self) -> InterceptorHooks {
            self.hooks
        }

        async fn pre_handle(&self, _request: &Request, response: &mut Response) -> Result<bool, DispatchError> {
            self.log.lock().unwrap().push(format!("{}.pre", self.name));
            if !self.allow {
                response.set_status(401);
                response.end();
            }
            Ok(self.allow)
        }

        async fn post_handle(&self, _request: &Request, _response: &mut Response) -> Result<(), DispatchError> {
            self.log.lock().unwrap().push(format!("{}.post", self.name));
            Ok(())
        }

        async fn after_completion(&self, _request: &Request, response: &Response) -> Result<(), DispatchError> {
            self.log
                .lock()
                .unwrap()
                .push(format!("{}.after({})", self.name, response.status()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct Echo {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Controller for Echo {
        async fn handle(
            &self,
            handler: &str,
            _request: &Request,
            response: &mut Response,
        ) -> Result<Value, DispatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match handler {
                "get" => Ok(json!("GET resolved")),
                "post" => Ok(json!("POST resolved")),
                "direct" => {
                    response.send("written by handler");
                    Ok(json!("ignored"))
                }
                "panic" => panic!("handler exploded"),
                "deny" => Err(DispatchError::status(409, "conflict")),
                other => Err(DispatchError::unknown_handler::<Self>(other)),
            }
        }
    }

    fn route(method: Method, path: &str, handler: &str, view: Option<&str>) -> RouteMapping {
        RouteMapping {
            method,
            path: path.to_string(),
            handler: handler.to_string(),
            view: view.map(str::to_string),
        }
    }

    fn logged(name: &'static str, log: &Log, allow: bool) -> Arc<dyn Interceptor> {
        Arc::new(Logged {
            name,
            log: Arc::clone(log),
            allow,
            hooks: InterceptorHooks::ALL,
        })
    }

    fn echo_routes() -> Vec<RouteMapping> {
        vec![
            route(Method::Get, "/get", "get", None),
            route(Method::Post, "/post", "post", Some("viewName")),
            route(Method::Get, "/direct", "direct", None),
            route(Method::Get, "/panic", "panic", None),
            route(Method::Get, "/deny", "deny", None),
            route(Method::Get, "/missing", "nope", None),
        ]
    }

    fn wire(dispatcher: &mut Dispatcher, echo: &Arc<Echo>) -> MemoryRouter {
        dispatcher.add_controller(Token::of::<Echo>(), Arc::clone(echo) as Arc<dyn Controller>, &echo_routes());
        let mut router = MemoryRouter::new();
        dispatcher.configure(&mut router).unwrap();
        router
    }

    #[tokio::test]
    async fn test_json_and_view_resolution() {
        let echo = Arc::new(Echo::default());
        let router = wire(&mut Dispatcher::new(), &echo);

        let response = router.dispatch(Request::get("/get")).await;
        assert_eq!(response.status(), 200);
        assert_eq!(response.body(), &Body::Json(json!("GET resolved")));

        let response = router.dispatch(Request::post("/post")).await;
        assert_eq!(
            response.body(),
            &Body::View {
                name: "viewName".into(),
                model: json!("POST resolved"),
            }
        );
        assert_eq!(
            response.data(),
            Some(&ResponseData {
                model: json!("POST resolved"),
                view: Some("viewName".into()),
            })
        );
    }

    #[tokio::test]
    async fn test_finished_response_left_alone() {
        let echo = Arc::new(Echo::default());
        let router = wire(&mut Dispatcher::new(), &echo);

        let response = router.dispatch(Request::get("/direct")).await;
        assert_eq!(response.body(), &Body::Text("written by handler".into()));
    }

    #[tokio::test]
    async fn test_interceptor_order_is_stable() {
        let log: Log = Arc::default();
        let echo = Arc::new(Echo::default());

        struct First;
        struct Second;
        struct Third;
        struct Last;

        let mut dispatcher = Dispatcher::new();
        dispatcher.add_interceptor(Token::of::<Last>(), logged("last", &log, true), None);
        dispatcher.add_interceptor(Token::of::<Second>(), logged("second", &log, true), Some(5));
        dispatcher.add_interceptor(Token::of::<First>(), logged("first", &log, true), Some(1));
        dispatcher.add_interceptor(Token::of::<Third>(), logged("third", &log, true), Some(5));
        let router = wire(&mut dispatcher, &echo);

        assert_eq!(
            dispatcher.interceptors(),
            vec![Token::of::<First>(), Token::of::<Second>(), Token::of::<Third>(), Token::of::<Last>()]
        );

        router.dispatch(Request::get("/get")).await;
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "first.pre",
                "second.pre",
                "third.pre",
                "last.pre",
                "first.post",
                "second.post",
                "third.post",
                "last.post",
                "first.after(200)",
                "second.after(200)",
                "third.after(200)",
                "last.after(200)",
            ]
        );
    }

    #[tokio::test]
    async fn test_pre_handle_short_circuit() {
        let log: Log = Arc::default();
        let echo = Arc::new(Echo::default());

        struct Guard;
        struct Audit;
        struct Metrics;

        let mut dispatcher = Dispatcher::new();
        dispatcher.add_interceptor(Token::of::<Audit>(), logged("audit", &log, true), Some(0));
        dispatcher.add_interceptor(Token::of::<Guard>(), logged("guard", &log, false), Some(1));
        dispatcher.add_interceptor(Token::of::<Metrics>(), logged("metrics", &log, true), Some(2));
        let router = wire(&mut dispatcher, &echo);

        let response = router.dispatch(Request::get("/get")).await;

        assert_eq!(response.status(), 401);
        assert_eq!(echo.calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "audit.pre",
                "guard.pre",
                "audit.after(401)",
                "guard.after(401)",
                "metrics.after(401)",
            ]
        );
    }

    #[tokio::test]
    async fn test_only_declared_hooks_run() {
        let log: Log = Arc::default();
        let echo = Arc::new(Echo::default());

        struct PostOnly;

        let mut dispatcher = Dispatcher::new();
        dispatcher.add_interceptor(
            Token::of::<PostOnly>(),
            Arc::new(Logged {
                name: "post-only",
                log: Arc::clone(&log),
                allow: false,
                hooks: InterceptorHooks {
                    post_handle: true,
                    ..InterceptorHooks::NONE
                },
            }),
            None,
        );
        let router = wire(&mut dispatcher, &echo);

        let response = router.dispatch(Request::get("/get")).await;
        assert_eq!(response.status(), 200);
        assert_eq!(*log.lock().unwrap(), vec!["post-only.post"]);
    }

    #[tokio::test]
    async fn test_handler_errors_reach_error_channel() {
        let log: Log = Arc::default();
        let echo = Arc::new(Echo::default());

        struct Audit;

        let mut dispatcher = Dispatcher::new();
        dispatcher.add_interceptor(Token::of::<Audit>(), logged("audit", &log, true), None);
        let router = wire(&mut dispatcher, &echo);

        let response = router.dispatch(Request::get("/panic")).await;
        assert_eq!(response.status(), 500);
        match response.body() {
            Body::Json(body) => assert!(body["error"].as_str().unwrap().contains("handler exploded")),
            other => panic!("unexpected body {other:?}"),
        }

        let response = router.dispatch(Request::get("/deny")).await;
        assert_eq!(response.status(), 409);

        let response = router.dispatch(Request::get("/missing")).await;
        assert_eq!(response.status(), 500);
        match response.body() {
            Body::Json(body) => assert!(body["error"].as_str().unwrap().contains("`nope`")),
            other => panic!("unexpected body {other:?}"),
        }

        // after_completion still ran for every failed request
        let after = log
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.starts_with("audit.after"))
            .count();
        assert_eq!(after, 3);
    }

    enum Fault {
        PanicBefore,
        PanicAfter,
        FailAfter,
    }

    struct Faulty {
        fault: Fault,
    }

    #[async_trait]
    impl Interceptor for Faulty {
        fn hooks(&self) -> InterceptorHooks {
            InterceptorHooks {
                after_completion: false,
                ..InterceptorHooks::ALL
            }
        }

        async fn pre_handle(&self, _request: &Request, _response: &mut Response) -> Result<bool, DispatchError> {
            match self.fault {
                Fault::PanicBefore => panic!("pre-handle exploded"),
                _ => Ok(true),
            }
        }

        async fn post_handle(&self, _request: &Request, _response: &mut Response) -> Result<(), DispatchError> {
            match self.fault {
                Fault::PanicAfter => panic!("post-handle exploded"),
                Fault::FailAfter => Err(DispatchError::status(503, "unavailable")),
                Fault::PanicBefore => Ok(()),
            }
        }
    }

    #[tokio::test]
    async fn test_interceptor_panic_reaches_error_channel() {
        struct Audit;
        struct Broken;

        for (fault, hook, handled) in [(Fault::PanicBefore, "::pre_handle", 0), (Fault::PanicAfter, "::post_handle", 1)] {
            let log: Log = Arc::default();
            let echo = Arc::new(Echo::default());

            let mut dispatcher = Dispatcher::new();
            dispatcher.add_interceptor(Token::of::<Audit>(), logged("audit", &log, true), Some(0));
            dispatcher.add_interceptor(Token::of::<Broken>(), Arc::new(Faulty { fault }), Some(1));
            let router = wire(&mut dispatcher, &echo);

            let response = tokio::spawn(async move { router.dispatch(Request::get("/get")).await })
                .await
                .unwrap();

            assert_eq!(response.status(), 500);
            match response.body() {
                Body::Json(body) => {
                    let message = body["error"].as_str().unwrap();
                    assert!(message.contains(hook));
                    assert!(message.contains("exploded"));
                }
                other => panic!("unexpected body {other:?}"),
            }
            assert_eq!(echo.calls.load(Ordering::SeqCst), handled);
            assert_eq!(log.lock().unwrap().last().map(String::as_str), Some("audit.after(500)"));
        }
    }

    #[tokio::test]
    async fn test_post_handle_failure_runs_remaining_interceptors() {
        let log: Log = Arc::default();
        let echo = Arc::new(Echo::default());

        struct Failing;
        struct Audit;

        let mut dispatcher = Dispatcher::new();
        dispatcher.add_interceptor(Token::of::<Failing>(), Arc::new(Faulty { fault: Fault::FailAfter }), Some(0));
        dispatcher.add_interceptor(Token::of::<Audit>(), logged("audit", &log, true), Some(1));
        let router = wire(&mut dispatcher, &echo);

        let response = router.dispatch(Request::get("/get")).await;
        assert_eq!(response.status(), 503);
        assert_eq!(*log.lock().unwrap(), vec!["audit.pre", "audit.post", "audit.after(503)"]);
    }

    #[tokio::test]
    async fn test_unmatched_route_is_not_found() {
        let echo = Arc::new(Echo::default());
        let router = wire(&mut Dispatcher::new(), &echo);

        let response = router.dispatch(Request::post("/get")).await;
        assert_eq!(response.status(), 404);
        assert_eq!(echo.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_registration_order() {
        let echo = Arc::new(Echo::default());
        let mut dispatcher = Dispatcher::new();
        let router = wire(&mut dispatcher, &echo);

        // pre-handle, six routes, post-handle, resolve
        assert_eq!(router.len(), 9);
        assert_eq!(router.routes()[0], (Method::Get, "/get"));
        assert_eq!(dispatcher.routes()[1].view.as_deref(), Some("viewName"));
    }

    #[test]
    fn test_configure_twice() {
        let mut dispatcher = Dispatcher::new();
        let mut router = MemoryRouter::new();
        dispatcher.configure(&mut router).unwrap();
        assert!(matches!(
            dispatcher.configure(&mut router),
            Err(DiError::IllegalState(_))
        ));
    }

    #[test]
    fn test_route_without_controller() {
        struct Ghost;

        let mut dispatcher = Dispatcher::new();
        dispatcher.routes.push(RouteConfig {
            method: Method::Get,
            path: "/ghost".into(),
            handler: "boo".into(),
            view: None,
            controller: Token::of::<Ghost>(),
        });

        let mut router = MemoryRouter::new();
        assert!(matches!(
            dispatcher.configure(&mut router),
            Err(DiError::NoSuchComponent { .. })
        ));
        assert!(router.is_empty());
    }
}
