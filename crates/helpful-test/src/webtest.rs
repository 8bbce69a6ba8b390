//! A client that dispatches requests straight to a view.
//!
//! There is no routing and no network: each call builds an
//! [`HttpRequest`], hands it to [`View::dispatch`] and wraps the result in a
//! [`TestResponse`]. Flash messages recorded by the view are drained into
//! the response.

use helpful_http::{
    HttpRequest, HttpRequestBuilder, HttpResponse, Message, MessageStorage, QueryDict,
    TemplateContext,
};
use helpful_views::View;
use http::{Method, StatusCode};

/// Drives one view in tests.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use helpful_http::{HttpRequest, HttpResponse};
/// use helpful_test::WebTest;
/// use helpful_views::View;
///
/// struct Greeting;
///
/// #[async_trait]
/// impl View for Greeting {
///     async fn get(&self, request: HttpRequest) -> HttpResponse {
///         HttpResponse::ok(format!("Hi {}", request.get().get("name").unwrap_or("you")))
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() {
/// let app = WebTest::new(Greeting);
/// let response = app.get("/greet/?name=Ada").await;
/// assert_eq!(response.status_code(), 200);
/// assert_eq!(response.text(), "Hi Ada");
/// # }
/// ```
#[derive(Debug)]
pub struct WebTest<V> {
    view: V,
    kwargs: Vec<(String, String)>,
    messages: MessageStorage,
}

impl<V: View> WebTest<V> {
    /// Wraps a view.
    pub fn new(view: V) -> Self {
        Self {
            view,
            kwargs: Vec::new(),
            messages: MessageStorage::new(),
        }
    }

    /// Adds a URL keyword argument sent with every request.
    #[must_use]
    pub fn with_kwarg(mut self, name: &str, value: &str) -> Self {
        self.kwargs.push((name.to_string(), value.to_string()));
        self
    }

    /// Returns the wrapped view.
    pub const fn view(&self) -> &V {
        &self.view
    }

    /// Returns a mutable reference to the wrapped view.
    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Sends a GET. `path` may carry a query string.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(Self::builder(Method::GET, path)).await
    }

    /// Sends a POST with a URL-encoded form body.
    pub async fn post(&self, path: &str, data: &[(&str, &str)]) -> TestResponse {
        let builder = Self::builder(Method::POST, path).form(&QueryDict::from_pairs(data));
        self.request(builder).await
    }

    /// Sends a request built by the caller, after adding the default
    /// kwargs and the message storage.
    pub async fn request(&self, builder: HttpRequestBuilder) -> TestResponse {
        let builder = self
            .kwargs
            .iter()
            .fold(builder, |b, (name, value)| b.kwarg(name, value))
            .messages(self.messages.clone());
        self.send(builder.build()).await
    }

    /// Dispatches a ready-made request. Its own message storage is used.
    pub async fn send(&self, request: HttpRequest) -> TestResponse {
        let messages = request.messages().clone();
        tracing::debug!(method = %request.method(), path = request.path(), "WebTest request");
        let response = self.view.dispatch(request).await;
        TestResponse {
            response,
            messages: messages.drain(),
        }
    }

    fn builder(method: Method, path: &str) -> HttpRequestBuilder {
        let (path, query) = path.split_once('?').unwrap_or((path, ""));
        HttpRequest::builder()
            .method(method)
            .path(path)
            .query_string(query)
    }
}

/// A captured view response.
#[derive(Debug)]
pub struct TestResponse {
    response: HttpResponse,
    messages: Vec<Message>,
}

impl TestResponse {
    /// Wraps a response produced outside [`WebTest`].
    pub const fn new(response: HttpResponse) -> Self {
        Self {
            response,
            messages: Vec::new(),
        }
    }

    /// Returns the status.
    pub const fn status(&self) -> StatusCode {
        self.response.status()
    }

    /// Returns the status as a number.
    pub const fn status_code(&self) -> u16 {
        self.response.status().as_u16()
    }

    /// Returns a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.response.header(name)
    }

    /// Returns the redirect target.
    pub fn location(&self) -> Option<&str> {
        self.response.location()
    }

    /// Returns the body as text.
    pub fn text(&self) -> &str {
        self.response.text()
    }

    /// Returns the template context, if the view rendered a template.
    pub const fn context(&self) -> Option<&TemplateContext> {
        self.response.context()
    }

    /// Returns one context entry.
    pub fn context_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.response.context_value(key)
    }

    /// Returns the candidate template names.
    pub fn template_names(&self) -> &[String] {
        self.response.template_names()
    }

    /// Returns the flash messages recorded while handling the request.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the underlying response.
    pub const fn response(&self) -> &HttpResponse {
        &self.response
    }

    /// Unwraps the underlying response.
    pub fn into_inner(self) -> HttpResponse {
        self.response
    }
}

impl From<HttpResponse> for TestResponse {
    fn from(response: HttpResponse) -> Self {
        Self::new(response)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;

    struct Recorder;

    #[async_trait]
    impl View for Recorder {
        async fn get(&self, request: HttpRequest) -> HttpResponse {
            HttpResponse::ok(format!(
                "{}|{}|{}",
                request.path(),
                request.get().get("page").unwrap_or(""),
                request.kwarg("pk").unwrap_or("")
            ))
        }

        async fn post(&self, request: HttpRequest) -> HttpResponse {
            request.messages().success("saved");
            HttpResponse::ok(request.post().get("title").unwrap_or("").to_string())
        }
    }

    #[tokio::test]
    async fn test_get_splits_query_and_sends_kwargs() {
        let app = WebTest::new(Recorder).with_kwarg("pk", "4");
        let response = app.get("/items/4/?page=2").await;
        assert_eq!(response.text(), "/items/4/|2|4");
    }

    #[tokio::test]
    async fn test_post_captures_messages() {
        let app = WebTest::new(Recorder);
        let response = app.post("/items/", &[("title", "Lamp")]).await;
        assert_eq!(response.text(), "Lamp");
        assert_eq!(response.messages().len(), 1);
        assert_eq!(response.messages()[0].text, "saved");

        let response = app.get("/items/").await;
        assert!(response.messages().is_empty());
    }

    #[tokio::test]
    async fn test_unhandled_method() {
        let app = WebTest::new(Recorder);
        let response = app
            .request(HttpRequest::builder().method(Method::DELETE))
            .await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
