//! # ioc-runtime - Inversion-of-Control Application Runtime
//!
//! A component container, lifecycle manager and request dispatch pipeline.
//!
//! ## Features
//!
//! - **Dependency graph resolution** - singletons are built dependencies-first,
//!   cycles are reported with their full path before anything is constructed
//! - **Base-type resolution** - components bind trait objects (`Arc<dyn Trait>`)
//!   and are selected by qualifier when several match
//! - **Profiles** - components gated on the active profile list
//! - **Post-processors** - rewrite definitions before instantiation, wrap
//!   instances after construction
//! - **Request pipeline** - ordered interceptors with pre-handle short-circuit,
//!   controllers, JSON or view responses, after-completion callbacks
//! - **Observable** - optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use ioc_runtime::prelude::*;
//!
//! #[derive(Default)]
//! struct Database;
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let context = ApplicationContext::builder()
//!     .component(ComponentDefinition::of::<Database>().build())
//!     .component(
//!         ComponentDefinition::builder(|deps| {
//!             Ok::<_, BoxError>(UserService { db: deps.get::<Database>()? })
//!         })
//!         .depends_on::<Database>()
//!         .build(),
//!     )
//!     .build();
//!
//! context.start().unwrap();
//!
//! let users = context.get_component::<UserService>().unwrap();
//! assert!(Arc::ptr_eq(&users.db, &context.get_component::<Database>().unwrap()));
//!
//! context.destroy();
//! ```
//!
//! ## Controllers and Interceptors
//!
//! ```rust
//! use ioc_runtime::prelude::*;
//! use serde_json::{Value, json};
//!
//! #[derive(Default)]
//! struct Greeting;
//!
//! #[async_trait]
//! impl Controller for Greeting {
//!     async fn handle(&self, handler: &str, request: &Request, _response: &mut Response) -> Result<Value, DispatchError> {
//!         match handler {
//!             "hello" => Ok(json!({ "hello": request.param("name") })),
//!             other => Err(DispatchError::unknown_handler::<Self>(other)),
//!         }
//!     }
//! }
//!
//! let context = ApplicationContext::builder()
//!     .component(
//!         ComponentDefinition::of::<Greeting>()
//!             .route(Method::Get, "/hello/:name", "hello")
//!             .build(),
//!     )
//!     .build();
//! context.start().unwrap();
//!
//! let router = context.get_router().unwrap();
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let response = router.dispatch(Request::get("/hello/ada")).await;
//! assert_eq!(response.body(), &Body::Json(json!({ "hello": "ada" })));
//! # });
//! ```
//!
//! ## Lifecycle
//!
//! - `start()` loads properties, registers discovered definitions, initializes
//!   the [`Injector`], orders aspects and wires the [`Dispatcher`]
//! - reads fail with [`DiError::IllegalState`] unless the context is ready
//! - `destroy()` runs pre-destroy hooks in reverse instantiation order

mod config;
mod context;
mod definition;
mod discovery;
mod dispatcher;
mod error;
mod factory;
mod http;
mod injector;
#[cfg(feature = "logging")]
pub mod logging;
mod processor;
mod provider;
mod registry;
mod router;
mod signal;
mod storage;

pub use config::*;
pub use context::*;
pub use definition::*;
pub use discovery::*;
pub use dispatcher::*;
pub use error::*;
pub use factory::{Dependencies, Instance};
pub use http::*;
pub use injector::*;
pub use processor::*;
pub use provider::{Injectable, Lifetime, Qualifier, Token};
pub use registry::*;
pub use router::*;
pub use signal::*;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

pub use async_trait::async_trait;
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ApplicationContext, Aspect, Body, BoxError, ComponentDefinition, ContextState, Controller,
        Dependencies, DiError, DispatchError, Injector, Interceptor, InterceptorHooks, Lifetime,
        MemoryRouter, Method, Qualifier, Request, Response, Router, Token, async_trait,
    };
    pub use std::sync::Arc;
}
