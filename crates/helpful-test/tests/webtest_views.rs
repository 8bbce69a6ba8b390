//! Generic views driven through the `WebTest` client.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use helpful_core::HelpfulResult;
use helpful_db::{FieldDef, FieldType, MemoryStore, ModelMeta};
use helpful_forms::{field_layout, FieldLayout};
use helpful_http::{HttpRequest, HttpResponse, TemplateContext};
use helpful_test::{
    assert_contains, assert_form_has_no_errors, assert_redirects, check_form_has_no_errors,
    WebTest,
};
use helpful_views::{
    error_response, ContextMixin, CreateView, FormFieldMixin, ModelFormMixin, ModelMixin,
    TemplateResponseMixin, TitleMixin, View, ViewServices,
};

static RECIPE: LazyLock<ModelMeta> = LazyLock::new(|| {
    ModelMeta::new("kitchen", "recipe")
        .field(FieldDef::new("title", FieldType::CharField { max_length: 60 }))
        .field(FieldDef::new("servings", FieldType::IntegerField))
        .display(|r| r.get("title").to_string())
        .absolute_url(|r| format!("/recipes/{}/", r.pk().unwrap_or_default()))
});

struct RecipeView {
    services: ViewServices,
    fields: Vec<FieldLayout>,
}

impl RecipeView {
    fn new() -> Self {
        Self {
            services: ViewServices::new(Arc::new(MemoryStore::new(vec![&RECIPE]))),
            fields: field_layout![[["title"], ["servings"]]],
        }
    }
}

impl ModelMixin for RecipeView {
    fn services(&self) -> &ViewServices {
        &self.services
    }

    fn model(&self) -> Option<&'static ModelMeta> {
        Some(&RECIPE)
    }
}

impl ContextMixin for RecipeView {}
impl TemplateResponseMixin for RecipeView {}

impl FormFieldMixin for RecipeView {
    fn form_fields(&self) -> Option<&[FieldLayout]> {
        Some(&self.fields)
    }
}

impl ModelFormMixin for RecipeView {}

impl TitleMixin for RecipeView {
    fn title(&self) -> Option<&str> {
        Some("New recipe")
    }
}

impl CreateView for RecipeView {}

impl RecipeView {
    async fn rows(&self, request: &HttpRequest) -> HelpfulResult<HttpResponse> {
        let data = (*request.method() == http::Method::POST).then(|| request.post());
        let mut formset = self.get_formset(data, Vec::new())?;
        if data.is_some() && formset.is_valid().await {
            formset.save(self.services.store.as_ref()).await?;
            return Ok(HttpResponse::ok("saved"));
        }
        let mut context = TemplateContext::new();
        context.insert("formset".to_string(), formset.as_context());
        Ok(self.render_to_response("_rows", context))
    }
}

#[async_trait]
impl View for RecipeView {
    async fn get(&self, request: HttpRequest) -> HttpResponse {
        if request.path().ends_with("/rows/") {
            return self.rows(&request).await.unwrap_or_else(|e| error_response(&e));
        }
        self.create(request).await
    }

    async fn post(&self, request: HttpRequest) -> HttpResponse {
        if request.path().ends_with("/rows/") {
            return self.rows(&request).await.unwrap_or_else(|e| error_response(&e));
        }
        self.create(request).await
    }
}

#[tokio::test]
async fn unbound_create_form_has_no_errors() {
    let app = WebTest::new(RecipeView::new());
    let response = app.get("/recipes/add/").await;
    assert_eq!(response.template_names(), ["kitchen/recipe_form.html"]);
    assert_eq!(response.context_value("title").unwrap(), "New recipe");
    assert_form_has_no_errors(&response, "form", "formset");
    assert_contains(&response, "recipe_form.html");
}

#[tokio::test]
async fn valid_create_redirects() {
    let app = WebTest::new(RecipeView::new());
    let response = app
        .post("/recipes/add/", &[("title", "Soup"), ("servings", "4")])
        .await;
    assert_redirects(&response, "/recipes/1/");
    assert_form_has_no_errors(&response, "form", "formset");
}

#[tokio::test]
async fn invalid_create_reports_form_errors() {
    let app = WebTest::new(RecipeView::new());
    let response = app
        .post("/recipes/add/", &[("title", "Soup"), ("servings", "many")])
        .await;
    assert_eq!(response.status_code(), 200);
    let text = check_form_has_no_errors(response.context(), "form", "formset").unwrap_err();
    assert!(text.starts_with("Form contains errors: \n* servings\n  * "));
    assert!(text.ends_with('\n'));
}

#[tokio::test]
async fn formset_rows_report_their_index() {
    let app = WebTest::new(RecipeView::new());
    let response = app.get("/recipes/rows/").await;
    assert_eq!(
        response.context_value("formset").unwrap()["forms"].as_array().unwrap().len(),
        3
    );
    assert_form_has_no_errors(&response, "form", "formset");

    let response = app
        .post(
            "/recipes/rows/",
            &[
                ("recipe-TOTAL_FORMS", "2"),
                ("recipe-INITIAL_FORMS", "0"),
                ("recipe-0-title", "Bread"),
                ("recipe-0-servings", "2"),
                ("recipe-1-title", "Cake"),
            ],
        )
        .await;
    let text = check_form_has_no_errors(response.context(), "form", "formset").unwrap_err();
    assert!(text.starts_with("Formset form #1 contains errors: \n* servings\n"));
    assert!(!text.contains("#0"));
}

#[tokio::test]
#[should_panic(expected = "Form contains errors")]
async fn assertion_fails_on_invalid_form() {
    let app = WebTest::new(RecipeView::new());
    let response = app.post("/recipes/add/", &[("servings", "2")]).await;
    assert_form_has_no_errors(&response, "form", "formset");
}
