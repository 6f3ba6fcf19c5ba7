//! Minimal request/response model
//!
//! The pipeline only needs what a router hands to middleware: method, path,
//! headers, query, path parameters and an optional JSON body on the way in;
//! status, headers, a body and response-scoped data on the way out.

use crate::DispatchError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            other => Err(format!("unsupported HTTP method `{other}`")),
        }
    }
}

/// An incoming request
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    /// Filled by the router from the matched path pattern
    pub params: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: BTreeMap::new(),
            query: BTreeMap::new(),
            params: BTreeMap::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// Header names are stored lowercased
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// Response payload
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Body {
    #[default]
    Empty,
    Text(String),
    Json(Value),
    /// A view to render with `model`; turned into text by a view engine
    View { name: String, model: Value },
}

/// Response-scoped data attached by a route handler
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseData {
    pub model: Value,
    pub view: Option<String>,
}

/// Notified once the response has been finalized
#[async_trait]
pub trait CompletionListener: Send + Sync {
    async fn on_complete(&self, request: &Request, response: &Response);
}

/// An outgoing response.
///
/// A response is *finished* once a body was written through [`json`](Self::json),
/// [`send`](Self::send), [`render`](Self::render) or [`end`](Self::end);
/// later writes are ignored.
pub struct Response {
    status: u16,
    headers: BTreeMap<String, String>,
    body: Body,
    finished: bool,
    data: Option<ResponseData>,
    listeners: Vec<Box<dyn CompletionListener>>,
}

impl Response {
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: BTreeMap::new(),
            body: Body::Empty,
            finished: false,
            data: None,
            listeners: Vec::new(),
        }
    }

    #[inline]
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) -> &mut Self {
        self.status = status;
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn set_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> &mut Self {
        self.headers.insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    #[inline]
    pub fn body(&self) -> &Body {
        &self.body
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Serialize `value` as the JSON body
    pub fn json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), DispatchError> {
        if self.finished {
            return Ok(());
        }
        let value = serde_json::to_value(value)?;
        self.set_header("content-type", "application/json");
        self.finish(Body::Json(value));
        Ok(())
    }

    /// Send a plain text body
    pub fn send(&mut self, text: impl Into<String>) {
        if self.finished {
            return;
        }
        self.set_header("content-type", "text/plain; charset=utf-8");
        self.finish(Body::Text(text.into()));
    }

    /// Render `view` with `model`
    pub fn render(&mut self, view: impl Into<String>, model: Value) {
        self.finish(Body::View {
            name: view.into(),
            model,
        });
    }

    /// Finish without a body
    pub fn end(&mut self) {
        self.finish(Body::Empty);
    }

    fn finish(&mut self, body: Body) {
        if self.finished {
            return;
        }
        self.body = body;
        self.finished = true;
    }

    /// Replace the body of a finished response (used by view engines)
    pub(crate) fn replace_body(&mut self, body: Body) {
        self.body = body;
    }

    #[inline]
    pub fn data(&self) -> Option<&ResponseData> {
        self.data.as_ref()
    }

    pub fn set_data(&mut self, data: ResponseData) {
        self.data = Some(data);
    }

    /// Register a listener fired once the response completes
    pub fn on_complete(&mut self, listener: impl CompletionListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Fire and drop every completion listener, in registration order
    pub async fn emit_complete(&mut self, request: &Request) {
        let listeners = std::mem::take(&mut self.listeners);
        for listener in listeners {
            listener.on_complete(request, self).await;
        }
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("finished", &self.finished)
            .field("data", &self.data)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_method_parse() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!(Method::Delete.to_string(), "DELETE");
        assert!("BREW".parse::<Method>().is_err());
    }

    #[test]
    fn test_first_write_wins() {
        let mut response = Response::new();
        response.json(&json!({"a": 1})).unwrap();
        response.send("ignored");

        assert!(response.is_finished());
        assert_eq!(response.body(), &Body::Json(json!({"a": 1})));
        assert_eq!(response.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn test_request_headers_case_insensitive() {
        let request = Request::get("/").with_header("X-Token", "abc");
        assert_eq!(request.header("x-token"), Some("abc"));
    }

    #[tokio::test]
    async fn test_completion_listeners_fire_once() {
        struct Count(Arc<AtomicU32>);

        #[async_trait]
        impl CompletionListener for Count {
            async fn on_complete(&self, _request: &Request, response: &Response) {
                assert!(response.is_finished());
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let hits = Arc::new(AtomicU32::new(0));
        let request = Request::get("/");
        let mut response = Response::new();
        response.on_complete(Count(Arc::clone(&hits)));
        response.end();

        response.emit_complete(&request).await;
        response.emit_complete(&request).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
