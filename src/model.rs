//! Request and response data models.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// HTTP method used for the reasoning request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    #[default]
    Post,
    Put,
    Delete,
    Patch,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
            Method::Patch => reqwest::Method::PATCH,
        }
    }
}

/// A fully resolved request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    /// Endpoint URL
    pub url: String,

    /// JSON body; never sent for `GET`
    pub body: Map<String, Value>,

    /// Caller headers. `Content-Type` is always overridden on the wire.
    pub headers: HashMap<String, String>,

    /// HTTP method
    pub method: Method,
}

impl RequestSpec {
    /// Create a request with an empty body, no headers and `POST`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            body: Map::new(),
            headers: HashMap::new(),
            method: Method::default(),
        }
    }

    /// Resolve per-call overrides against the defaults for `url`.
    pub fn from_overrides(url: impl Into<String>, overrides: ReasonOverrides) -> Self {
        let defaults = Self::new(url);
        Self {
            url: defaults.url,
            body: overrides.body.unwrap_or(defaults.body),
            headers: overrides.headers.unwrap_or(defaults.headers),
            method: overrides.method.unwrap_or(defaults.method),
        }
    }
}

/// Per-call overrides for a [`RequestSpec`]. Unset fields fall back to the
/// defaults; set fields replace them wholesale.
///
/// # Example
/// ```rust
/// use reason_stream::model::{Method, ReasonOverrides, RequestSpec};
///
/// let overrides = ReasonOverrides::new()
///     .with_field("prompt", "why is the sky blue?")
///     .with_method(Method::Put);
///
/// let spec = RequestSpec::from_overrides("http://localhost/reason", overrides);
/// assert_eq!(spec.method, Method::Put);
/// assert_eq!(spec.body["prompt"], "why is the sky blue?");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReasonOverrides {
    pub body: Option<Map<String, Value>>,
    pub headers: Option<HashMap<String, String>>,
    pub method: Option<Method>,
}

impl ReasonOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the body.
    pub fn with_body(mut self, body: Map<String, Value>) -> Self {
        self.body = Some(body);
        self
    }

    /// Set a single body field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.body
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Replace the headers.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Add a single header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Set the method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }
}

/// A fully buffered response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Body of an `application/json` response
    Json(Value),

    /// Body of a `text/html` response
    Text(String),
}

impl Payload {
    /// Convert into a snapshot value. Text becomes a JSON string.
    pub fn into_value(self) -> Value {
        match self {
            Payload::Json(value) => value,
            Payload::Text(text) => Value::String(text),
        }
    }
}

/// One item produced by a fetcher.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseEnvelope {
    /// A decoded piece of a streamed body
    Fragment { text: String },

    /// The single, final item of a buffered response
    NotStream { payload: Payload },
}

/// How a response body is consumed, decided from its `Content-Type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Json,
    Html,
    Stream,
}

impl ResponseKind {
    /// Classify a `Content-Type` header value. A missing header means a stream.
    ///
    /// # Example
    /// ```
    /// use reason_stream::model::ResponseKind;
    ///
    /// assert_eq!(ResponseKind::from_content_type(Some("application/json; charset=utf-8")), ResponseKind::Json);
    /// assert_eq!(ResponseKind::from_content_type(Some("text/html")), ResponseKind::Html);
    /// assert_eq!(ResponseKind::from_content_type(None), ResponseKind::Stream);
    /// ```
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        match content_type {
            Some(ct) if ct.contains("application/json") => ResponseKind::Json,
            Some(ct) if ct.contains("text/html") => ResponseKind::Html,
            _ => ResponseKind::Stream,
        }
    }
}

/// Snapshot and lifecycle flags published by a [`Reasoner`](crate::reasoner::Reasoner).
#[derive(Debug, Clone, PartialEq)]
pub struct ReasonState {
    /// Latest merged result. Replaced wholesale on every update.
    pub data: Value,

    pub is_loading: bool,

    pub is_streaming: bool,

    /// Invocation that currently owns this state
    pub(crate) generation: u64,
}

impl Default for ReasonState {
    fn default() -> Self {
        Self {
            data: Value::Object(Map::new()),
            is_loading: false,
            is_streaming: false,
            generation: 0,
        }
    }
}

impl ReasonState {
    /// Neither loading nor streaming.
    pub fn is_idle(&self) -> bool {
        !self.is_loading && !self.is_streaming
    }
}
