//! HTTP request type.
//!
//! [`HttpRequest`] carries what the view mixins read from a request: method,
//! path, GET and POST dictionaries, the URL keyword arguments captured by the
//! router, and the flash-message storage.

use std::collections::HashMap;

use http::{HeaderMap, Method};

use crate::messages::MessageStorage;
use crate::querydict::QueryDict;

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// An HTTP request, modeled after Django's `HttpRequest`.
///
/// # Examples
///
/// ```
/// use helpful_http::HttpRequest;
///
/// let request = HttpRequest::builder()
///     .method(http::Method::GET)
///     .path("/authors/add/")
///     .query_string("_popup=1")
///     .build();
///
/// assert_eq!(request.get().get("_popup"), Some("1"));
/// ```
#[derive(Debug)]
pub struct HttpRequest {
    method: Method,
    path: String,
    query_string: String,
    content_type: Option<String>,
    get: QueryDict,
    post: QueryDict,
    headers: HeaderMap,
    kwargs: HashMap<String, String>,
    body: Vec<u8>,
    messages: MessageStorage,
}

impl HttpRequest {
    /// Creates a new [`HttpRequestBuilder`].
    pub fn builder() -> HttpRequestBuilder {
        HttpRequestBuilder::default()
    }

    /// Creates an `HttpRequest` from axum request parts and the body bytes.
    pub fn from_axum(parts: http::request::Parts, body: Vec<u8>) -> Self {
        let content_type = parts
            .headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let mut builder = Self::builder()
            .method(parts.method)
            .path(parts.uri.path())
            .query_string(parts.uri.query().unwrap_or(""))
            .body(body);
        if let Some(ct) = content_type {
            builder = builder.content_type(&ct);
        }
        let mut request = builder.build();
        request.headers = parts.headers;
        request
    }

    /// Returns the HTTP method.
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path (without query string).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the raw query string.
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// Returns the content type of the body, if set.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns the GET parameters.
    pub const fn get(&self) -> &QueryDict {
        &self.get
    }

    /// Returns the POST parameters.
    pub const fn post(&self) -> &QueryDict {
        &self.post
    }

    /// Returns the request headers.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the URL keyword arguments captured by the router.
    pub const fn kwargs(&self) -> &HashMap<String, String> {
        &self.kwargs
    }

    /// Returns a single URL keyword argument.
    pub fn kwarg(&self, name: &str) -> Option<&str> {
        self.kwargs.get(name).map(String::as_str)
    }

    /// Sets a URL keyword argument.
    pub fn set_kwarg(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.kwargs.insert(name.into(), value.into());
    }

    /// Returns the raw body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the flash-message storage for this request.
    pub const fn messages(&self) -> &MessageStorage {
        &self.messages
    }

    /// Returns the full path including the query string.
    pub fn get_full_path(&self) -> String {
        if self.query_string.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query_string)
        }
    }
}

/// Builder for [`HttpRequest`] instances.
#[derive(Debug)]
pub struct HttpRequestBuilder {
    method: Method,
    path: String,
    query_string: String,
    content_type: Option<String>,
    headers: HeaderMap,
    kwargs: HashMap<String, String>,
    body: Vec<u8>,
    messages: MessageStorage,
}

impl Default for HttpRequestBuilder {
    fn default() -> Self {
        Self {
            method: Method::GET,
            path: "/".to_string(),
            query_string: String::new(),
            content_type: None,
            headers: HeaderMap::new(),
            kwargs: HashMap::new(),
            body: Vec::new(),
            messages: MessageStorage::new(),
        }
    }
}

impl HttpRequestBuilder {
    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the request path.
    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    /// Sets the query string (without leading `?`).
    #[must_use]
    pub fn query_string(mut self, qs: &str) -> Self {
        self.query_string = qs.to_string();
        self
    }

    /// Sets the content type.
    #[must_use]
    pub fn content_type(mut self, ct: &str) -> Self {
        self.content_type = Some(ct.to_string());
        self
    }

    /// Adds a header.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            http::header::HeaderName::from_bytes(name.as_bytes()),
            http::header::HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Adds a URL keyword argument.
    #[must_use]
    pub fn kwarg(mut self, name: &str, value: &str) -> Self {
        self.kwargs.insert(name.to_string(), value.to_string());
        self
    }

    /// Sets the raw body.
    #[must_use]
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Sets a URL-encoded form body and the matching content type.
    #[must_use]
    pub fn form(self, data: &QueryDict) -> Self {
        self.content_type(FORM_URLENCODED)
            .body(data.urlencode().into_bytes())
    }

    /// Shares an existing message storage with the request.
    #[must_use]
    pub fn messages(mut self, messages: MessageStorage) -> Self {
        self.messages = messages;
        self
    }

    /// Builds the [`HttpRequest`].
    pub fn build(self) -> HttpRequest {
        let get = QueryDict::parse(&self.query_string);
        let post = if self
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with(FORM_URLENCODED))
        {
            QueryDict::parse(&String::from_utf8_lossy(&self.body))
        } else {
            QueryDict::new()
        };

        HttpRequest {
            method: self.method,
            path: self.path,
            query_string: self.query_string,
            content_type: self.content_type,
            get,
            post,
            headers: self.headers,
            kwargs: self.kwargs,
            body: self.body,
            messages: self.messages,
        }
    }
}
