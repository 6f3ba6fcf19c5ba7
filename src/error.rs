//! Error types for the container, the application context and the request pipeline

use crate::provider::{Qualifier, Token};
use thiserror::Error;

/// Boxed error returned by component factories, lifecycle hooks and post-processors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the container and the application lifecycle.
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// A definition with the same token was already registered
    #[error("Component already registered: {token}")]
    DuplicateRegistration { token: Token },

    /// No active definition matches the token (and qualifier)
    #[error("No component found for {token}{}", qualified(.qualifier))]
    NoSuchComponent {
        token: Token,
        qualifier: Option<Qualifier>,
    },

    /// More than one active definition matches the token (and qualifier)
    #[error(
        "Ambiguous component {token}{}: candidates are [{}]",
        qualified(.qualifier),
        .candidates.join(", ")
    )]
    AmbiguousComponent {
        token: Token,
        qualifier: Option<Qualifier>,
        candidates: Vec<&'static str>,
    },

    /// The required-dependency graph contains a cycle
    #[error("Circular dependency detected: {}", .path.join(" -> "))]
    CircularDependency { path: Vec<&'static str> },

    /// A factory, hook or post-processor failed for a component
    #[error("Failed to create component {type_name}: {reason}")]
    CreationFailed {
        type_name: &'static str,
        reason: String,
    },

    /// Startup failed; wraps the underlying cause
    #[error("Container initialization failed: {0}")]
    ContainerInitialization(#[source] Box<DiError>),

    /// Lifecycle misuse (reading before `start()`, double `start()`)
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// The injector was already initialized and accepts no further definitions
    #[error("Injector is frozen - no further definitions accepted")]
    Frozen,

    /// A property source could not be loaded
    #[error("Configuration error: {0}")]
    Configuration(String),
}

fn qualified(qualifier: &Option<Qualifier>) -> String {
    match qualifier {
        Some(q) => format!(" qualified by `{q}`"),
        None => String::new(),
    }
}

impl DiError {
    /// Create a NoSuchComponent error
    #[inline]
    pub fn not_found(token: Token, qualifier: Option<&Qualifier>) -> Self {
        Self::NoSuchComponent {
            token,
            qualifier: qualifier.cloned(),
        }
    }

    /// Create a CreationFailed error
    #[inline]
    pub fn creation_failed(token: Token, reason: impl Into<String>) -> Self {
        Self::CreationFailed {
            type_name: token.name(),
            reason: reason.into(),
        }
    }

    /// Create an IllegalState error
    #[inline]
    pub fn illegal_state(message: impl Into<String>) -> Self {
        Self::IllegalState(message.into())
    }

    /// Wrap a startup failure. Already wrapped errors are passed through.
    pub fn initialization(cause: DiError) -> Self {
        match cause {
            wrapped @ Self::ContainerInitialization(_) => wrapped,
            other => Self::ContainerInitialization(Box::new(other)),
        }
    }

    /// Convert an error produced by user code for `token`.
    ///
    /// Container errors raised inside a factory (for instance by
    /// `Dependencies::get`) keep their identity.
    pub fn from_boxed(token: Token, error: BoxError) -> Self {
        match error.downcast::<DiError>() {
            Ok(inner) => *inner,
            Err(other) => Self::creation_failed(token, other.to_string()),
        }
    }

    /// The startup cause when this is a `ContainerInitialization` error
    pub fn cause(&self) -> Option<&DiError> {
        match self {
            Self::ContainerInitialization(inner) => Some(inner),
            _ => None,
        }
    }
}

/// Result type alias for container operations
pub type Result<T> = std::result::Result<T, DiError>;

/// Errors forwarded to the router's error channel while handling a request.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The controller does not know the handler named by the route
    #[error("Controller {controller} has no handler named `{handler}`")]
    UnknownHandler {
        controller: &'static str,
        handler: String,
    },

    /// An interceptor or controller chose the response status
    #[error("{message}")]
    Status { status: u16, message: String },

    /// An interceptor or controller failed
    #[error("Handler failed: {0}")]
    Handler(#[source] BoxError),

    /// The model could not be encoded as JSON
    #[error("Failed to serialize response model: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The view engine rejected a view
    #[error("Failed to render view `{view}`: {reason}")]
    Render { view: String, reason: String },

    /// A route handler or interceptor hook panicked
    #[error("Handler panicked: {0}")]
    Panicked(String),
}

impl DispatchError {
    /// Wrap an arbitrary handler error
    pub fn handler(error: impl Into<BoxError>) -> Self {
        Self::Handler(error.into())
    }

    /// The handler name is not known to controller `C`
    pub fn unknown_handler<C: ?Sized>(handler: impl Into<String>) -> Self {
        Self::UnknownHandler {
            controller: std::any::type_name::<C>(),
            handler: handler.into(),
        }
    }

    /// Fail the request with an explicit status code
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    /// HTTP status the default error handler answers with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Status { status, .. } => *status,
            _ => 500,
        }
    }
}
