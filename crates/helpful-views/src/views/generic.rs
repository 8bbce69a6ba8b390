//! Generic model views.
//!
//! Each view is a trait whose handler method (`list`, `detail`, `create`,
//! `update`) does the work; a concrete view implements the mixins it builds
//! on and calls the handler from [`View::get`] / [`View::post`]:
//!
//! ```
//! use std::sync::{Arc, LazyLock};
//!
//! use async_trait::async_trait;
//! use helpful_db::{FieldDef, FieldType, MemoryStore, ModelMeta};
//! use helpful_http::{HttpRequest, HttpResponse};
//! use helpful_views::{
//!     ContextMixin, ListView, ModelMixin, SearchableListMixin, SortableListMixin,
//!     TemplateResponseMixin, View, ViewServices,
//! };
//!
//! static TASK: LazyLock<ModelMeta> = LazyLock::new(|| {
//!     ModelMeta::new("todo", "task")
//!         .field(FieldDef::new("title", FieldType::CharField { max_length: 100 }))
//! });
//!
//! struct TaskList(ViewServices);
//!
//! impl ModelMixin for TaskList {
//!     fn services(&self) -> &ViewServices {
//!         &self.0
//!     }
//!     fn model(&self) -> Option<&'static ModelMeta> {
//!         Some(&TASK)
//!     }
//! }
//! impl ContextMixin for TaskList {}
//! impl TemplateResponseMixin for TaskList {}
//! impl SearchableListMixin for TaskList {}
//! impl SortableListMixin for TaskList {}
//! impl ListView for TaskList {}
//!
//! #[async_trait]
//! impl View for TaskList {
//!     async fn get(&self, request: HttpRequest) -> HttpResponse {
//!         self.list(request).await
//!     }
//! }
//!
//! # #[tokio::main]
//! # async fn main() {
//! let view = TaskList(ViewServices::new(Arc::new(MemoryStore::new(vec![&TASK]))));
//! let response = view.dispatch(HttpRequest::builder().path("/tasks/").build()).await;
//! assert_eq!(response.context_value("model_verbose_name_plural").unwrap(), "tasks");
//! # }
//! ```

use async_trait::async_trait;

use helpful_core::{HelpfulError, HelpfulResult};
use helpful_db::Instance;
use helpful_forms::{Form, FormKwargs};
use helpful_http::{HttpRequest, HttpResponse, HttpResponseRedirect, TemplateContext};

use super::class_based::{error_response, ContextMixin, TemplateResponseMixin, View};
use crate::mixins::{
    insert_verbose_names, FormFieldMixin, SearchableListMixin, SingleObjectMixin,
    SortableListMixin, TitleMixin,
};
use crate::pagination::Paginator;

/// Lists the objects of a model with search, sorting and pagination.
///
/// Context: `object_list`, `<model_name>_list`, `search_query` (empty when
/// absent), `sort_helper`, `paginator`, `page_obj`, `is_paginated` and both
/// verbose names.
#[async_trait]
pub trait ListView:
    View + ContextMixin + TemplateResponseMixin + SearchableListMixin + SortableListMixin
{
    /// Page size. `None` (or 0) disables pagination.
    fn paginate_by(&self) -> Option<usize> {
        Some(self.services().settings.paginate_by)
    }

    /// Every object of the model, before search and sorting.
    async fn get_queryset(&self) -> HelpfulResult<Vec<Instance>> {
        let model = self.require_model()?;
        self.services().store.all(model).await
    }

    /// Builds the list context.
    async fn get_list_context(&self, request: &HttpRequest) -> HelpfulResult<TemplateContext> {
        let objects = self.get_queryset().await?;
        let objects = self.filter_by_search(request, objects);
        let objects = self.sort_objects(request, objects);

        let mut context = TemplateContext::new();
        let page_objects = match self.paginate_by().filter(|n| *n > 0) {
            Some(per_page) => {
                let paginator = Paginator::new(objects, per_page);
                let raw = request
                    .get()
                    .get(&self.services().settings.page_var)
                    .unwrap_or("1");
                let page = paginator.page(paginator.validate_number(raw)?)?;
                context.insert("paginator".to_string(), paginator.to_json());
                context.insert("page_obj".to_string(), page.to_json());
                context.insert(
                    "is_paginated".to_string(),
                    page.has_other_pages().into(),
                );
                page.into_object_list()
            }
            None => {
                context.insert("paginator".to_string(), serde_json::Value::Null);
                context.insert("page_obj".to_string(), serde_json::Value::Null);
                context.insert("is_paginated".to_string(), false.into());
                objects
            }
        };

        let object_list: Vec<serde_json::Value> =
            page_objects.iter().map(Instance::to_json).collect();
        if let Some(model) = self.model() {
            context.insert(
                format!("{}_list", model.model_name),
                object_list.clone().into(),
            );
            insert_verbose_names(&mut context, model, true);
        }
        context.insert("object_list".to_string(), object_list.into());
        context.insert(
            "search_query".to_string(),
            self.get_search_query(request).unwrap_or_default().into(),
        );
        context.insert("sort_helper".to_string(), self.sort_context(request));
        Ok(self.get_context_data(context))
    }

    /// Handles GET.
    async fn list(&self, request: HttpRequest) -> HttpResponse {
        match self.get_list_context(&request).await {
            Ok(context) => self.render_to_response("_list", context),
            Err(e) => error_response(&e),
        }
    }
}

/// Shows one object.
///
/// Context: `object`, `<model_name>` and both verbose names.
#[async_trait]
pub trait DetailView: View + ContextMixin + TemplateResponseMixin + SingleObjectMixin {
    /// Handles GET.
    async fn detail(&self, request: HttpRequest) -> HttpResponse {
        let object = match self.get_object(&request).await {
            Ok(object) => object,
            Err(e) => return error_response(&e),
        };
        let mut context = TemplateContext::new();
        let json = object.to_json();
        context.insert(object.meta().model_name.to_string(), json.clone());
        context.insert("object".to_string(), json);
        insert_verbose_names(&mut context, object.meta(), true);
        self.render_to_response("_detail", self.get_context_data(context))
    }
}

/// Form handling shared by [`CreateView`] and [`UpdateView`].
pub trait ModelFormMixin: FormFieldMixin {
    /// Where to go after a successful save. `{pk}`, `{id}` and `{<field>}`
    /// are replaced with the saved object's values.
    fn success_url(&self) -> Option<&str> {
        None
    }

    /// Builds the form for `instance`, bound to the request body on POST
    /// and PUT.
    fn get_form(&self, request: &HttpRequest, instance: Instance) -> HelpfulResult<Box<dyn Form>> {
        let class = self.get_form_class()?;
        let data = is_submission(request).then(|| request.post().clone());
        Ok(class.construct(FormKwargs::new().data(data).instance(instance)))
    }

    /// Returns the redirect target for a saved object: the interpolated
    /// `success_url`, else the object's canonical URL.
    fn get_success_url(&self, object: &Instance) -> HelpfulResult<String> {
        if let Some(url) = self.success_url() {
            return Ok(interpolate_url(url, object));
        }
        object.get_absolute_url().ok_or_else(|| {
            HelpfulError::ImproperlyConfigured(
                "No URL to redirect to.  Either provide a url or define a \
                 get_absolute_url method on the Model."
                    .to_string(),
            )
        })
    }
}

/// Creates an object from a generated or explicit form.
///
/// Context: `form`, `popup`, `title` and both verbose names. When the
/// request carries the popup parameter (`_popup=1`), a successful save
/// answers with a script that hands the new object back to the opener
/// window instead of redirecting.
#[async_trait]
pub trait CreateView: View + ContextMixin + TemplateResponseMixin + ModelFormMixin + TitleMixin {
    /// Returns `true` if the request came from a related-object popup.
    fn is_popup(&self, request: &HttpRequest) -> bool {
        request
            .get()
            .get(&self.services().settings.popup_var)
            .unwrap_or("0")
            == "1"
    }

    /// Builds the create context around `form`.
    fn get_create_context(&self, request: &HttpRequest, form: &dyn Form) -> TemplateContext {
        let mut context = TemplateContext::new();
        context.insert("form".to_string(), form.as_context());
        if let Some(model) = self.model() {
            insert_verbose_names(&mut context, model, true);
        }
        context.insert("popup".to_string(), self.is_popup(request).into());
        self.insert_title(&mut context);
        self.get_context_data(context)
    }

    /// Saves the form and redirects, or closes the popup.
    async fn form_valid(
        &self,
        request: &HttpRequest,
        mut form: Box<dyn Form>,
    ) -> HelpfulResult<HttpResponse> {
        let object = form.save(self.services().store.as_ref()).await?;
        tracing::info!(model = %object.meta().label(), pk = ?object.pk(), "Object created");
        if self.is_popup(request) {
            return Ok(popup_response(&object));
        }
        Ok(HttpResponseRedirect::new(&self.get_success_url(&object)?))
    }

    /// Validates a submission and saves it, or renders the form.
    async fn process_create(&self, request: &HttpRequest) -> HelpfulResult<HttpResponse> {
        let model = self.require_model()?;
        let mut form = self.get_form(request, Instance::new(model))?;
        if is_submission(request) {
            if form.is_valid().await {
                return self.form_valid(request, form).await;
            }
            tracing::debug!(errors = form.errors().len(), "Create form is invalid");
        }
        Ok(self.render_to_response("_form", self.get_create_context(request, form.as_ref())))
    }

    /// Handles GET and POST.
    async fn create(&self, request: HttpRequest) -> HttpResponse {
        self.process_create(&request)
            .await
            .unwrap_or_else(|e| error_response(&e))
    }
}

/// Edits an existing object.
///
/// Context: `object`, `<model_name>`, `form`, `title` and both verbose
/// names.
#[async_trait]
pub trait UpdateView:
    View + ContextMixin + TemplateResponseMixin + ModelFormMixin + TitleMixin + SingleObjectMixin
{
    /// Builds the update context around `object` and `form`.
    fn get_update_context(&self, object: &Instance, form: &dyn Form) -> TemplateContext {
        let mut context = TemplateContext::new();
        let json = object.to_json();
        context.insert(object.meta().model_name.to_string(), json.clone());
        context.insert("object".to_string(), json);
        context.insert("form".to_string(), form.as_context());
        insert_verbose_names(&mut context, object.meta(), true);
        self.insert_title(&mut context);
        self.get_context_data(context)
    }

    /// Saves the form and redirects.
    async fn form_valid(
        &self,
        _request: &HttpRequest,
        mut form: Box<dyn Form>,
    ) -> HelpfulResult<HttpResponse> {
        let object = form.save(self.services().store.as_ref()).await?;
        tracing::info!(model = %object.meta().label(), pk = ?object.pk(), "Object updated");
        Ok(HttpResponseRedirect::new(&self.get_success_url(&object)?))
    }

    /// Validates a submission and saves it, or renders the form.
    async fn process_update(&self, request: &HttpRequest) -> HelpfulResult<HttpResponse> {
        let object = self.get_object(request).await?;
        let mut form = self.get_form(request, object.clone())?;
        if is_submission(request) {
            if form.is_valid().await {
                return self.form_valid(request, form).await;
            }
            tracing::debug!(errors = form.errors().len(), "Update form is invalid");
        }
        Ok(self.render_to_response("_form", self.get_update_context(&object, form.as_ref())))
    }

    /// Handles GET and POST.
    async fn update(&self, request: HttpRequest) -> HttpResponse {
        self.process_update(&request)
            .await
            .unwrap_or_else(|e| error_response(&e))
    }
}

fn is_submission(request: &HttpRequest) -> bool {
    matches!(*request.method(), http::Method::POST | http::Method::PUT)
}

pub(crate) fn interpolate_url(url: &str, object: &Instance) -> String {
    let pk = object.pk().map_or_else(String::new, |pk| pk.to_string());
    let mut url = url.replace("{pk}", &pk).replace("{id}", &pk);
    for field in &object.meta().fields {
        let placeholder = format!("{{{}}}", field.name);
        if url.contains(&placeholder) {
            url = url.replace(&placeholder, &object.get(field.name).to_form_string());
        }
    }
    url
}

/// The response that closes a related-object popup and hands the new
/// object's key and display text back to the opener.
pub fn popup_response(object: &Instance) -> HttpResponse {
    let pk = object.pk().map_or_else(String::new, |pk| pk.to_string());
    HttpResponse::ok(format!(
        r#"
<script type="text/javascript">
    opener.dismissAddAnotherPopup(
        window,
        "{}",
        "{}"
    );
</script>"#,
        escape_js(&pk),
        escape_js(&object.to_string())
    ))
}

fn escape_js(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '<' => out.push_str("\\u003C"),
            '>' => out.push_str("\\u003E"),
            '&' => out.push_str("\\u0026"),
            c => out.push(c),
        }
    }
    out
}
