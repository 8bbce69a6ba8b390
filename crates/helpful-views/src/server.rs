//! Serving views over HTTP with axum.
//!
//! [`ViewRouter`] maps axum path patterns to views. Path captures become
//! the request's URL keyword arguments, so `/books/{pk}/` feeds
//! `request.kwarg("pk")`. Request bodies over the router's limit, or that
//! fail to read, get a 400 before any view runs.
//!
//! # Examples
//!
//! ```no_run
//! use async_trait::async_trait;
//! use helpful_http::{HttpRequest, HttpResponse};
//! use helpful_views::server::ViewRouter;
//! use helpful_views::View;
//!
//! struct Hello;
//!
//! #[async_trait]
//! impl View for Hello {
//!     async fn get(&self, request: HttpRequest) -> HttpResponse {
//!         HttpResponse::ok(format!("Hello {}", request.kwarg("name").unwrap_or("?")))
//!     }
//! }
//!
//! # async fn example() -> helpful_core::HelpfulResult<()> {
//! ViewRouter::new()
//!     .route("/hello/{name}/", Hello.as_view())
//!     .run("127.0.0.1:8000")
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{RawPathParams, Request};
use axum::response::IntoResponse;
use axum::routing::any;
use percent_encoding::percent_decode_str;

use helpful_core::{HelpfulError, HelpfulResult};
use helpful_http::{HttpRequest, HttpResponse};

use crate::views::ViewFunction;

/// Default cap on the size of a request body, in bytes.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Routes requests to views by path pattern.
pub struct ViewRouter {
    routes: Vec<(String, Arc<ViewFunction>)>,
    body_limit: usize,
}

impl Default for ViewRouter {
    fn default() -> Self {
        Self {
            routes: Vec::new(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl ViewRouter {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the largest request body accepted, in bytes.
    #[must_use]
    pub const fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    /// Adds a route. `path` uses axum syntax (`/items/{pk}/`).
    #[must_use]
    pub fn route(mut self, path: &str, view: ViewFunction) -> Self {
        self.routes.push((path.to_string(), Arc::new(view)));
        self
    }

    /// Returns the number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if no routes were added.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Converts the routes into an axum router.
    pub fn into_axum_router(self) -> axum::Router {
        let limit = self.body_limit;
        self.routes
            .into_iter()
            .fold(axum::Router::new(), |router, (path, view)| {
                let handler = move |params: RawPathParams, req: Request<Body>| {
                    let view = Arc::clone(&view);
                    async move {
                        let (parts, body) = req.into_parts();
                        let body = match axum::body::to_bytes(body, limit).await {
                            Ok(bytes) => bytes.to_vec(),
                            Err(e) => {
                                tracing::warn!(
                                    path = parts.uri.path(),
                                    limit,
                                    error = %e,
                                    "Failed to read request body"
                                );
                                return HttpResponse::new(
                                    http::StatusCode::BAD_REQUEST,
                                    "Request body could not be read",
                                )
                                .into_response();
                            }
                        };
                        let mut request = HttpRequest::from_axum(parts, body);
                        for (name, raw) in &params {
                            let value = percent_decode_str(raw).decode_utf8_lossy();
                            request.set_kwarg(name, value.into_owned());
                        }
                        tracing::debug!(
                            path = request.path(),
                            kwargs = ?request.kwargs(),
                            "Routing request to view"
                        );
                        view(request).await.into_response()
                    }
                };
                router.route(&path, any(handler))
            })
    }

    /// Serves the routes on `addr` until the server stops.
    pub async fn run(self, addr: &str) -> HelpfulResult<()> {
        let router = self.into_axum_router();
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            HelpfulError::ImproperlyConfigured(format!("Failed to bind to {addr}: {e}"))
        })?;
        tracing::info!("Serving views at http://{addr}/");
        axum::serve(listener, router).await?;
        Ok(())
    }
}

impl std::fmt::Debug for ViewRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let paths: Vec<&str> = self.routes.iter().map(|(p, _)| p.as_str()).collect();
        f.debug_struct("ViewRouter")
            .field("routes", &paths)
            .field("body_limit", &self.body_limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::views::View;

    struct Echo;

    #[async_trait]
    impl View for Echo {
        async fn get(&self, request: HttpRequest) -> HttpResponse {
            HttpResponse::ok(format!("slug={}", request.kwarg("slug").unwrap_or("")))
        }

        async fn post(&self, request: HttpRequest) -> HttpResponse {
            HttpResponse::ok(format!("name={}", request.post().get("name").unwrap_or("")))
        }
    }

    async fn call(router: axum::Router, req: http::Request<Body>) -> (http::StatusCode, String) {
        let response = router.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_path_params_become_kwargs() {
        let router = ViewRouter::new()
            .route("/pages/{slug}/", Echo.as_view())
            .into_axum_router();
        let req = http::Request::builder()
            .uri("/pages/hello%20world/")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call(router, req).await;
        assert_eq!(status, http::StatusCode::OK);
        assert_eq!(body, "slug=hello world");
    }

    #[tokio::test]
    async fn test_form_body_reaches_view() {
        let router = ViewRouter::new().route("/echo/", Echo.as_view()).into_axum_router();
        let req = http::Request::builder()
            .method(http::Method::POST)
            .uri("/echo/")
            .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("name=Ada"))
            .unwrap();
        let (_, body) = call(router, req).await;
        assert_eq!(body, "name=Ada");
    }

    #[tokio::test]
    async fn test_oversized_body_is_400() {
        let router = ViewRouter::new()
            .body_limit(4)
            .route("/echo/", Echo.as_view())
            .into_axum_router();
        let req = http::Request::builder()
            .method(http::Method::POST)
            .uri("/echo/")
            .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("name=Ada"))
            .unwrap();
        let (status, body) = call(router, req).await;
        assert_eq!(status, http::StatusCode::BAD_REQUEST);
        assert_eq!(body, "Request body could not be read");
    }

    #[tokio::test]
    async fn test_unhandled_method_is_405() {
        let router = ViewRouter::new().route("/echo/", Echo.as_view()).into_axum_router();
        let req = http::Request::builder()
            .method(http::Method::DELETE)
            .uri("/echo/")
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(router, req).await;
        assert_eq!(status, http::StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_debug_lists_paths() {
        let router = ViewRouter::new().route("/a/", Echo.as_view());
        assert_eq!(router.len(), 1);
        assert_eq!(
            format!("{router:?}"),
            "ViewRouter { routes: [\"/a/\"], body_limit: 2097152 }"
        );
    }
}
