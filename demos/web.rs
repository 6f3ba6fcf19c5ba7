//! A small request pipeline: two controllers behind a timing interceptor.
//!
//! Run with `cargo run --example web --features logging-pretty`.

use ioc_runtime::ViewEngine;
use ioc_runtime::prelude::*;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

#[derive(Default)]
struct UserStore {
    users: Mutex<HashMap<String, String>>,
}

impl UserStore {
    fn insert(&self, id: &str, name: &str) {
        self.users
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.to_string(), name.to_string());
    }

    fn find(&self, id: &str) -> Option<String> {
        self.users
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }
}

struct UserController {
    store: Arc<UserStore>,
}

#[async_trait]
impl Controller for UserController {
    async fn handle(
        &self,
        handler: &str,
        request: &Request,
        response: &mut Response,
    ) -> Result<Value, DispatchError> {
        match handler {
            "show" => {
                let id = request.param("id").unwrap_or_default();
                match self.store.find(id) {
                    Some(name) => Ok(json!({ "id": id, "name": name })),
                    None => Err(DispatchError::status(404, format!("no user `{id}`"))),
                }
            }
            "create" => {
                let body = request.body.clone().unwrap_or(Value::Null);
                let id = body["id"].as_str().unwrap_or_default();
                let name = body["name"].as_str().unwrap_or_default();
                self.store.insert(id, name);
                response.set_status(201);
                Ok(json!({ "created": id }))
            }
            other => Err(DispatchError::unknown_handler::<Self>(other)),
        }
    }
}

#[derive(Default)]
struct HomeController;

#[async_trait]
impl Controller for HomeController {
    async fn handle(
        &self,
        _handler: &str,
        _request: &Request,
        _response: &mut Response,
    ) -> Result<Value, DispatchError> {
        Ok(json!({ "title": "home" }))
    }
}

struct Timing;

#[async_trait]
impl Interceptor for Timing {
    fn hooks(&self) -> InterceptorHooks {
        InterceptorHooks {
            pre_handle: true,
            post_handle: false,
            after_completion: true,
        }
    }

    async fn pre_handle(
        &self,
        _request: &Request,
        response: &mut Response,
    ) -> Result<bool, DispatchError> {
        response.set_header("x-started", format!("{:?}", Instant::now()));
        Ok(true)
    }

    async fn after_completion(
        &self,
        request: &Request,
        response: &Response,
    ) -> Result<(), DispatchError> {
        println!("{} {} -> {}", request.method, request.path, response.status());
        Ok(())
    }
}

struct Page;

impl ViewEngine for Page {
    fn render(&self, view: &str, model: &Value) -> Result<String, DispatchError> {
        Ok(format!("<h1>{view}</h1><pre>{model}</pre>"))
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    ioc_runtime::logging::builder().debug().runtime_only().pretty().try_init()?;

    let context = Arc::new(
        ApplicationContext::builder()
            .component(ComponentDefinition::of::<UserStore>().build())
            .component(
                ComponentDefinition::builder(|deps| {
                    Ok::<_, BoxError>(UserController {
                        store: deps.get::<UserStore>()?,
                    })
                })
                .depends_on::<UserStore>()
                .route(Method::Get, "/users/:id", "show")
                .route(Method::Post, "/users", "create")
                .build(),
            )
            .component(
                ComponentDefinition::of::<HomeController>()
                    .route_with_view(Method::Get, "/", "index", "home")
                    .build(),
            )
            .component(
                ComponentDefinition::builder(|_| Ok::<_, BoxError>(Timing))
                    .interceptor()
                    .order(10)
                    .build(),
            )
            .router(|| MemoryRouter::new().with_view_engine(Page))
            .build(),
    );

    context.start()?;
    context.register_exit_hook();

    let router = context.get_router()?;
    let requests = [
        Request::get("/"),
        Request::post("/users").with_body(json!({ "id": "1", "name": "Ada" })),
        Request::get("/users/1"),
        Request::get("/users/2"),
        Request::get("/missing"),
    ];

    for request in requests {
        let response = router.dispatch(request).await;
        println!("  {:?}", response.body());
    }

    let destroyed = context.destroy();
    println!("destroyed {destroyed} components");
    Ok(())
}
