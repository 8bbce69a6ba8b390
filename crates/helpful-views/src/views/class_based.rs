//! Class-based view building blocks.
//!
//! ## Key Types
//!
//! - [`View`] - HTTP method dispatch, the base of every view
//! - [`ModelMixin`] - The services and (optional) model a view works on
//! - [`ContextMixin`] - Template context assembly
//! - [`TemplateResponseMixin`] - Template name resolution and rendering
//! - [`ViewFunction`] - A boxed handler produced by [`View::as_view`]

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::Instrument;

use helpful_core::logging::request_span;
use helpful_core::{HelpfulError, HelpfulResult};
use helpful_db::ModelMeta;
use helpful_forms::fields::escape_html;
use helpful_http::{HttpRequest, HttpResponse, HttpResponseForbidden, TemplateContext};

use crate::services::ViewServices;

/// A view as a plain async function.
pub type ViewFunction =
    Box<dyn Fn(HttpRequest) -> Pin<Box<dyn Future<Output = HttpResponse> + Send>> + Send + Sync>;

/// The base trait for class-based views.
///
/// Every handler returns 405 unless overridden. Generic views implement
/// their behavior as default methods on their own traits, and a concrete
/// view wires those into the handlers it accepts:
///
/// ```
/// use async_trait::async_trait;
/// use helpful_http::{HttpRequest, HttpResponse};
/// use helpful_views::View;
///
/// struct Ping;
///
/// #[async_trait]
/// impl View for Ping {
///     async fn get(&self, _request: HttpRequest) -> HttpResponse {
///         HttpResponse::ok("pong")
///     }
/// }
/// ```
#[async_trait]
pub trait View: Send + Sync {
    /// Returns the HTTP methods this view allows.
    fn allowed_methods(&self) -> Vec<http::Method> {
        vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::PATCH,
            http::Method::DELETE,
            http::Method::HEAD,
            http::Method::OPTIONS,
        ]
    }

    /// Routes the request to the handler for its method, inside a request
    /// span.
    async fn dispatch(&self, request: HttpRequest) -> HttpResponse {
        let span = request_span(request.method().as_str(), request.path());
        async move {
            tracing::debug!("Dispatching request");
            if !self.allowed_methods().contains(request.method()) {
                return self.http_method_not_allowed(request).await;
            }
            let response = match *request.method() {
                http::Method::GET => self.get(request).await,
                http::Method::POST => self.post(request).await,
                http::Method::PUT => self.put(request).await,
                http::Method::PATCH => self.patch(request).await,
                http::Method::DELETE => self.delete(request).await,
                http::Method::HEAD => self.head(request).await,
                http::Method::OPTIONS => self.options(request).await,
                _ => self.http_method_not_allowed(request).await,
            };
            tracing::debug!(status = response.status().as_u16(), "Request handled");
            response
        }
        .instrument(span)
        .await
    }

    /// Handles GET requests.
    async fn get(&self, request: HttpRequest) -> HttpResponse {
        self.http_method_not_allowed(request).await
    }

    /// Handles POST requests.
    async fn post(&self, request: HttpRequest) -> HttpResponse {
        self.http_method_not_allowed(request).await
    }

    /// Handles PUT requests.
    async fn put(&self, request: HttpRequest) -> HttpResponse {
        self.http_method_not_allowed(request).await
    }

    /// Handles PATCH requests.
    async fn patch(&self, request: HttpRequest) -> HttpResponse {
        self.http_method_not_allowed(request).await
    }

    /// Handles DELETE requests.
    async fn delete(&self, request: HttpRequest) -> HttpResponse {
        self.http_method_not_allowed(request).await
    }

    /// Handles HEAD requests. Delegates to `get`.
    async fn head(&self, request: HttpRequest) -> HttpResponse {
        self.get(request).await
    }

    /// Handles OPTIONS requests with the `Allow` header.
    async fn options(&self, _request: HttpRequest) -> HttpResponse {
        let methods = self.allowed_methods();
        let method_strs: Vec<&str> = methods.iter().map(http::Method::as_str).collect();
        let mut response = HttpResponse::ok("");
        if let Ok(value) = http::header::HeaderValue::from_str(&method_strs.join(", ")) {
            response.headers_mut().insert(http::header::ALLOW, value);
        }
        response
    }

    /// Returns 405 with the allowed methods.
    async fn http_method_not_allowed(&self, request: HttpRequest) -> HttpResponse {
        tracing::warn!(method = %request.method(), "Method not allowed");
        let methods = self.allowed_methods();
        let method_strs: Vec<&str> = methods.iter().map(http::Method::as_str).collect();
        HttpResponse::not_allowed(&method_strs)
    }

    /// Converts this view into a [`ViewFunction`].
    #[allow(clippy::wrong_self_convention)]
    fn as_view(self) -> ViewFunction
    where
        Self: Sized + 'static,
    {
        let view = Arc::new(self);
        Box::new(move |request: HttpRequest| -> Pin<Box<dyn Future<Output = HttpResponse> + Send>> {
            let view = view.clone();
            Box::pin(async move { view.dispatch(request).await })
        })
    }
}

/// Turns an error reached while handling a request into a response.
///
/// Configuration errors are developer mistakes and surface as 500s, logged
/// at `error` level. Messages can carry request input such as a URL primary
/// key, so bodies are HTML-escaped.
pub fn error_response(err: &HelpfulError) -> HttpResponse {
    match err {
        HelpfulError::PermissionDenied(msg) => {
            tracing::warn!(reason = %msg, "Permission denied");
            HttpResponseForbidden::new()
        }
        HelpfulError::NotFound(msg) | HelpfulError::DoesNotExist(msg) => {
            tracing::debug!(reason = %msg, "Not found");
            HttpResponse::not_found(escape_html(msg))
        }
        HelpfulError::ImproperlyConfigured(msg) => {
            tracing::error!(error = %msg, "View is improperly configured");
            HttpResponse::server_error(escape_html(&err.to_string()))
        }
        other => {
            tracing::error!(error = %other, "Request failed");
            let status = http::StatusCode::from_u16(other.status_code())
                .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);
            HttpResponse::new(status, escape_html(&other.to_string()))
        }
    }
}

/// The services and model a view works on.
pub trait ModelMixin: Send + Sync {
    /// Returns the store, settings and renderer.
    fn services(&self) -> &ViewServices;

    /// Returns the model, if the view has one.
    fn model(&self) -> Option<&'static ModelMeta> {
        None
    }

    /// Returns the model or a configuration error naming what is missing.
    fn require_model(&self) -> HelpfulResult<&'static ModelMeta> {
        self.model().ok_or_else(|| {
            HelpfulError::ImproperlyConfigured(
                "This view is missing a model. Define model() or override the lookup".to_string(),
            )
        })
    }
}

/// Provides template context data.
pub trait ContextMixin {
    /// Extra entries merged into every context.
    fn extra_context(&self) -> Option<&TemplateContext> {
        None
    }

    /// Finishes a context built by a view. Entries from
    /// [`ContextMixin::extra_context`] are merged last.
    fn get_context_data(&self, mut kwargs: TemplateContext) -> TemplateContext {
        if let Some(extra) = self.extra_context() {
            for (key, value) in extra {
                kwargs.insert(key.clone(), value.clone());
            }
        }
        kwargs
    }
}

/// Resolves template names and renders responses.
pub trait TemplateResponseMixin: ModelMixin {
    /// An explicit template name, tried first.
    fn template_name(&self) -> Option<&str> {
        None
    }

    /// Overrides the suffix of the model-derived template name.
    fn template_name_suffix(&self) -> Option<&str> {
        None
    }

    /// Returns the templates to try, in order: the explicit name, then
    /// `<app_label>/<model_name><suffix>.html` when the view has a model.
    fn get_template_names(&self, default_suffix: &str) -> HelpfulResult<Vec<String>> {
        let mut names = Vec::new();
        if let Some(name) = self.template_name() {
            names.push(name.to_string());
        }
        if let Some(model) = self.model() {
            let suffix = self.template_name_suffix().unwrap_or(default_suffix);
            names.push(format!(
                "{}/{}{suffix}.html",
                model.app_label, model.model_name
            ));
        }
        if names.is_empty() {
            return Err(HelpfulError::ImproperlyConfigured(
                "TemplateResponseMixin requires either a definition of 'template_name' \
                 or an implementation of 'get_template_names()'"
                    .to_string(),
            ));
        }
        Ok(names)
    }

    /// Renders the view's templates with `context`.
    fn render_to_response(&self, default_suffix: &str, context: TemplateContext) -> HttpResponse {
        match self.get_template_names(default_suffix) {
            Ok(names) => render_template_response(self.services(), names, context),
            Err(e) => error_response(&e),
        }
    }
}

/// Renders the first available template of `names`.
///
/// Without a renderer the context is dumped as JSON inside a bare HTML
/// page. Either way the response keeps the names and the context.
pub fn render_template_response(
    services: &ViewServices,
    names: Vec<String>,
    context: TemplateContext,
) -> HttpResponse {
    let body = match services.renderer.as_deref() {
        Some(renderer) => match renderer.render(&names, &context) {
            Ok(html) => html,
            Err(e) => return error_response(&e),
        },
        None => fallback_body(&names, &context),
    };
    HttpResponse::rendered(body, names, context)
}

fn fallback_body(names: &[String], context: &TemplateContext) -> String {
    let template = names.first().map_or("", String::as_str);
    let context_json = serde_json::to_string_pretty(context).unwrap_or_default();
    format!("<!-- Template: {template} -->\n<html><body><pre>{context_json}</pre></body></html>")
}
