//! HTTP response types.
//!
//! [`HttpResponse`] is a status, headers and a text body. Responses rendered
//! from a template also keep the template names and the context they were
//! rendered with, so tests can assert against the context instead of
//! scraping HTML (the equivalent of Django's test-client `response.context`).

use axum::response::IntoResponse;
use http::{HeaderMap, HeaderValue, StatusCode};

/// Template context: an ordered JSON object.
pub type TemplateContext = serde_json::Map<String, serde_json::Value>;

/// An HTTP response, modeled after Django's `HttpResponse`.
///
/// # Examples
///
/// ```
/// use helpful_http::HttpResponse;
///
/// let response = HttpResponse::ok("Hello");
/// assert_eq!(response.status(), http::StatusCode::OK);
/// assert_eq!(response.text(), "Hello");
/// ```
#[derive(Debug, Clone)]
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    content: String,
    content_type: String,
    charset: String,
    template_names: Vec<String>,
    context: Option<TemplateContext>,
}

impl HttpResponse {
    /// Creates a new `HttpResponse` with the given status and body.
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            content: body.into(),
            content_type: "text/html".to_string(),
            charset: "utf-8".to_string(),
            template_names: Vec::new(),
            context: None,
        }
    }

    /// Creates a 200 OK response.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, body)
    }

    /// Creates a 404 Not Found response.
    pub fn not_found(body: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, body)
    }

    /// Creates a 500 Internal Server Error response.
    pub fn server_error(body: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, body)
    }

    /// Creates a 405 Method Not Allowed response listing the permitted methods.
    pub fn not_allowed(permitted_methods: &[&str]) -> Self {
        let allowed = permitted_methods.join(", ");
        let mut response = Self::new(
            StatusCode::METHOD_NOT_ALLOWED,
            format!("Method Not Allowed. Permitted: {allowed}"),
        );
        if let Ok(value) = HeaderValue::from_str(&allowed) {
            response.headers.insert(http::header::ALLOW, value);
        }
        response
    }

    /// Creates a 200 response produced by rendering `template_names[0]`
    /// (or the first one found) with `context`.
    pub fn rendered(
        body: impl Into<String>,
        template_names: Vec<String>,
        context: TemplateContext,
    ) -> Self {
        let mut response = Self::ok(body);
        response.template_names = template_names;
        response.context = Some(context);
        response
    }

    /// Returns the status code.
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Sets the status code.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Returns the headers.
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the headers mutably.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Returns a header value as a string.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the redirect target, if this is a redirect.
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(http::header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }

    /// Returns the content type.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Sets the content type.
    pub fn set_content_type(&mut self, content_type: impl Into<String>) {
        self.content_type = content_type.into();
    }

    /// Returns the body.
    pub fn text(&self) -> &str {
        &self.content
    }

    /// Returns the body as bytes.
    pub fn content_bytes(&self) -> &[u8] {
        self.content.as_bytes()
    }

    /// Returns the template names this response was rendered from.
    pub fn template_names(&self) -> &[String] {
        &self.template_names
    }

    /// Returns the context this response was rendered with.
    pub const fn context(&self) -> Option<&TemplateContext> {
        self.context.as_ref()
    }

    /// Returns a single context entry.
    pub fn context_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.context.as_ref().and_then(|ctx| ctx.get(key))
    }

    fn full_content_type(&self) -> String {
        if self.content_type.starts_with("text/") || self.content_type.contains("json") {
            format!("{}; charset={}", self.content_type, self.charset)
        } else {
            self.content_type.clone()
        }
    }
}

impl IntoResponse for HttpResponse {
    fn into_response(self) -> axum::response::Response {
        let content_type = self.full_content_type();
        let mut response = (self.status, self.content).into_response();
        if let Ok(ct) = HeaderValue::from_str(&content_type) {
            response.headers_mut().insert(http::header::CONTENT_TYPE, ct);
        }
        for (key, value) in &self.headers {
            response.headers_mut().insert(key, value.clone());
        }
        response
    }
}

/// A 302 redirect, equivalent to Django's `HttpResponseRedirect`.
pub struct HttpResponseRedirect;

impl HttpResponseRedirect {
    /// Creates a 302 Found redirect to `url`.
    pub fn new(url: &str) -> HttpResponse {
        let mut response = HttpResponse::new(StatusCode::FOUND, "");
        if let Ok(value) = HeaderValue::from_str(url) {
            response.headers.insert(http::header::LOCATION, value);
        }
        response
    }
}

/// A 403 response, equivalent to Django's `HttpResponseForbidden`.
pub struct HttpResponseForbidden;

impl HttpResponseForbidden {
    /// Creates an empty-bodied 403 Forbidden response.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> HttpResponse {
        HttpResponse::new(StatusCode::FORBIDDEN, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok() {
        let response = HttpResponse::ok("hi");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.content_bytes(), b"hi");
        assert!(response.context().is_none());
    }

    #[test]
    fn test_redirect() {
        let response = HttpResponseRedirect::new("/authors/1/");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.location(), Some("/authors/1/"));
    }

    #[test]
    fn test_forbidden() {
        let response = HttpResponseForbidden::new();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.text().is_empty());
    }

    #[test]
    fn test_not_allowed() {
        let response = HttpResponse::not_allowed(&["GET", "POST"]);
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.header("allow"), Some("GET, POST"));
    }

    #[test]
    fn test_rendered_keeps_context() {
        let mut context = TemplateContext::new();
        context.insert("title".into(), serde_json::json!("Books"));
        let response =
            HttpResponse::rendered("<h1>Books</h1>", vec!["book_list.html".into()], context);
        assert_eq!(response.template_names(), ["book_list.html".to_string()]);
        assert_eq!(
            response.context_value("title"),
            Some(&serde_json::json!("Books"))
        );
    }

    #[tokio::test]
    async fn test_into_axum_response() {
        let response = HttpResponseRedirect::new("/done/").into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(http::header::LOCATION).unwrap(),
            "/done/"
        );
        assert_eq!(
            response.headers().get(http::header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
    }
}
