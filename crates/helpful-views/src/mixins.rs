//! Mixins shared by the generic views.
//!
//! - [`FormFieldMixin`] - Builds a model form class and its grid layout from
//!   a declarative field layout spec
//! - [`TitleMixin`] - Adds a static `title` to the context
//! - [`SearchableListMixin`] / [`SortableListMixin`] - Query-parameter driven
//!   list filtering and ordering
//! - [`SingleObjectMixin`] - Looks up the object named by the URL

use std::cmp::Ordering;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;

use helpful_core::{HelpfulError, HelpfulResult, ModelFormBase};
use helpful_db::{Instance, ModelMeta, Value};
use helpful_forms::{
    construct_form_layout, get_flat_fields, modelform_factory, FieldLayout, FormClass, FormHelper,
    FormSet, Layout, DEFAULT_ABSOLUTE_MAX,
};
use helpful_http::{HttpRequest, QueryDict, TemplateContext};

use crate::views::class_based::ModelMixin;

/// Derives a form class from a field layout spec when no explicit class is
/// configured.
///
/// The spec is a list of rows; each row is a field name or a group of
/// columns. The flattened field names (minus the formset `DELETE` checkbox)
/// select the model form's fields, and the rows become a grid layout.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, LazyLock};
///
/// use helpful_db::{FieldDef, FieldType, MemoryStore, ModelMeta};
/// use helpful_forms::{field_layout, FieldLayout, FormKwargs};
/// use helpful_views::{FormFieldMixin, ModelMixin, ViewServices};
///
/// static CITY: LazyLock<ModelMeta> = LazyLock::new(|| {
///     ModelMeta::new("geo", "city")
///         .field(FieldDef::new("name", FieldType::CharField { max_length: 80 }))
///         .field(FieldDef::new("country", FieldType::CharField { max_length: 80 }))
/// });
///
/// struct CityForm {
///     services: ViewServices,
///     fields: Vec<FieldLayout>,
/// }
///
/// impl ModelMixin for CityForm {
///     fn services(&self) -> &ViewServices {
///         &self.services
///     }
///     fn model(&self) -> Option<&'static ModelMeta> {
///         Some(&CITY)
///     }
/// }
///
/// impl FormFieldMixin for CityForm {
///     fn form_fields(&self) -> Option<&[FieldLayout]> {
///         Some(&self.fields)
///     }
/// }
///
/// let view = CityForm {
///     services: ViewServices::new(Arc::new(MemoryStore::new(vec![&CITY]))),
///     fields: field_layout![[["name"], ["country"]]],
/// };
/// let form = view.get_form_class().unwrap().construct(FormKwargs::new());
/// assert_eq!(form.fields().len(), 2);
/// ```
pub trait FormFieldMixin: ModelMixin {
    /// An explicit form class. Takes precedence over `form_fields`.
    fn form_class(&self) -> Option<Arc<dyn FormClass>> {
        None
    }

    /// The model of an inline formset, used instead of [`ModelMixin::model`].
    fn inline_model(&self) -> Option<&'static ModelMeta> {
        None
    }

    /// The field layout spec.
    fn form_fields(&self) -> Option<&[FieldLayout]> {
        None
    }

    /// An explicit layout, used instead of the one built from the spec.
    fn form_layout(&self) -> Option<&Layout> {
        None
    }

    /// The base for generated model forms. Defaults to the settings.
    fn model_form_base(&self) -> ModelFormBase {
        self.services().settings.model_form_base
    }

    /// Returns the flat field names selected by the spec.
    fn get_form_fields(&self) -> Option<Vec<String>> {
        get_flat_fields(self.form_fields())
    }

    /// Returns the explicit layout, else the grid built from the spec.
    fn get_form_layout(&self) -> HelpfulResult<Option<Layout>> {
        if let Some(layout) = self.form_layout() {
            return Ok(Some(layout.clone()));
        }
        self.form_fields().map(construct_form_layout).transpose()
    }

    /// Returns the helper attached to generated forms. It never renders
    /// the `<form>` tag; the page template owns it.
    fn get_form_helper(&self) -> HelpfulResult<FormHelper> {
        let mut helper = FormHelper::new().with_form_tag(false);
        if let Some(layout) = self.get_form_layout()? {
            helper = helper.with_layout(layout);
        }
        Ok(helper)
    }

    /// Returns the helper attached to formsets.
    fn get_formset_helper(&self) -> HelpfulResult<FormHelper> {
        Ok(self.get_form_helper()?.with_render_hidden_fields(true))
    }

    /// The formset prefix. Defaults to the model name.
    fn formset_prefix(&self) -> String {
        self.inline_model()
            .or_else(|| self.model())
            .map_or_else(|| "form".to_string(), |m| m.model_name.to_string())
    }

    /// Number of blank forms in an unbound formset.
    fn formset_extra(&self) -> usize {
        3
    }

    /// Most forms a formset builds from submitted management data.
    fn formset_absolute_max(&self) -> usize {
        DEFAULT_ABSOLUTE_MAX
    }

    /// Builds a formset over `instances` with the formset helper attached.
    fn get_formset(
        &self,
        data: Option<&QueryDict>,
        instances: Vec<Instance>,
    ) -> HelpfulResult<FormSet> {
        let class = self.get_form_class()?;
        let mut formset = FormSet::with_absolute_max(
            class.as_ref(),
            self.formset_prefix(),
            data,
            instances,
            self.formset_extra(),
            self.formset_absolute_max(),
        );
        formset.set_helper(self.get_formset_helper()?);
        Ok(formset)
    }

    /// Returns the form class: the explicit one, else a model form over the
    /// configured fields. The generated form localizes the fields it includes.
    fn get_form_class(&self) -> HelpfulResult<Arc<dyn FormClass>> {
        if let Some(class) = self.form_class() {
            return Ok(class);
        }
        let model = self.inline_model().or_else(|| self.model()).ok_or_else(|| {
            HelpfulError::ImproperlyConfigured(
                "Please specify either a form_class or model".to_string(),
            )
        })?;
        let fields = self.get_form_fields().ok_or_else(|| {
            HelpfulError::ImproperlyConfigured(
                "Please specify either a form_class or form_fields".to_string(),
            )
        })?;
        let class = modelform_factory(model, &fields, &fields, self.model_form_base())?
            .with_helper(self.get_form_helper()?);
        Ok(Arc::new(class))
    }
}

/// Adds a static title to the context.
pub trait TitleMixin {
    /// The title, if any.
    fn title(&self) -> Option<&str> {
        None
    }

    /// Inserts `title` unless the context already has one.
    fn insert_title(&self, context: &mut TemplateContext) {
        if let Some(title) = self.title().filter(|t| !t.is_empty()) {
            if !context.contains_key("title") {
                context.insert("title".to_string(), title.into());
            }
        }
    }
}

/// Inserts `model_verbose_name`, and `model_verbose_name_plural` when
/// `plural` is set.
pub fn insert_verbose_names(context: &mut TemplateContext, model: &ModelMeta, plural: bool) {
    context.insert(
        "model_verbose_name".to_string(),
        model.verbose_name.clone().into(),
    );
    if plural {
        context.insert(
            "model_verbose_name_plural".to_string(),
            model.verbose_name_plural.clone().into(),
        );
    }
}

static SEARCH_TERM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)"|(\S+)"#).expect("valid regex"));

/// Splits a search query into terms. Double-quoted phrases stay whole.
pub fn split_search_terms(query: &str) -> Vec<String> {
    SEARCH_TERM
        .captures_iter(query)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Reads a field for filtering and ordering. `id` and `pk` name the key.
pub fn lookup_value(instance: &Instance, field: &str) -> Value {
    match field {
        "id" | "pk" => Value::from(instance.pk()),
        name => instance.get(name).clone(),
    }
}

/// Filters a list by the search query parameter.
pub trait SearchableListMixin: ModelMixin {
    /// Fields searched by the query. Empty disables search.
    fn search_fields(&self) -> &[&str] {
        &[]
    }

    /// Whether the query is split into terms that must all match.
    fn search_split(&self) -> bool {
        true
    }

    /// Returns the trimmed search query, if one was given.
    fn get_search_query(&self, request: &HttpRequest) -> Option<String> {
        request
            .get()
            .get(&self.services().settings.search_var)
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_string)
    }

    /// Keeps objects where every term appears, case-insensitively, in at
    /// least one search field.
    fn filter_by_search(&self, request: &HttpRequest, objects: Vec<Instance>) -> Vec<Instance> {
        let fields = self.search_fields();
        let Some(query) = self.get_search_query(request) else {
            return objects;
        };
        if fields.is_empty() {
            return objects;
        }
        let terms: Vec<String> = if self.search_split() {
            split_search_terms(&query)
        } else {
            vec![query]
        };
        let terms: Vec<String> = terms.iter().map(|t| t.to_lowercase()).collect();
        tracing::debug!(?terms, "Filtering list by search terms");
        objects
            .into_iter()
            .filter(|obj| {
                let haystacks: Vec<String> = fields
                    .iter()
                    .map(|f| lookup_value(obj, f).to_form_string().to_lowercase())
                    .collect();
                terms
                    .iter()
                    .all(|term| haystacks.iter().any(|h| h.contains(term.as_str())))
            })
            .collect()
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl SortDirection {
    /// Returns the query-parameter spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Orders a list by query parameters, restricted to allowed fields.
pub trait SortableListMixin: ModelMixin {
    /// Fields the list may be sorted on.
    fn sort_fields(&self) -> &[&str] {
        &["id"]
    }

    /// Returns the requested sort field and direction, if the field is
    /// allowed. Unknown directions sort ascending.
    fn get_sort(&self, request: &HttpRequest) -> Option<(String, SortDirection)> {
        let settings = &self.services().settings;
        let field = request.get().get(&settings.order_var)?;
        if !self.sort_fields().contains(&field) {
            return None;
        }
        let direction = match request.get().get(&settings.order_type_var) {
            Some("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        };
        Some((field.to_string(), direction))
    }

    /// Sorts `objects` by the requested field. The sort is stable.
    fn sort_objects(&self, request: &HttpRequest, mut objects: Vec<Instance>) -> Vec<Instance> {
        if let Some((field, direction)) = self.get_sort(request) {
            objects.sort_by(|a, b| {
                let ordering = compare_values(&lookup_value(a, &field), &lookup_value(b, &field));
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            });
        }
        objects
    }

    /// Returns the `sort_helper` context entry: the active sort and the
    /// allowed fields.
    fn sort_context(&self, request: &HttpRequest) -> serde_json::Value {
        let (field, direction) = self
            .get_sort(request)
            .map_or((None, None), |(f, d)| (Some(f), Some(d.as_str())));
        serde_json::json!({
            "fields": self.sort_fields(),
            "field": field,
            "direction": direction,
        })
    }
}

const fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Int(_) | Value::Float(_) => 2,
        Value::String(_) => 3,
        Value::Date(_) => 4,
    }
}

#[allow(clippy::cast_precision_loss)]
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Int(x), Value::Int(y)) => x.cmp(y),
        (Value::Float(x), Value::Float(y)) => x.total_cmp(y),
        (Value::Int(x), Value::Float(y)) => (*x as f64).total_cmp(y),
        (Value::Float(x), Value::Int(y)) => x.total_cmp(&(*y as f64)),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Date(x), Value::Date(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Looks up the object named by a URL keyword argument.
#[async_trait]
pub trait SingleObjectMixin: ModelMixin {
    /// The URL keyword argument carrying the primary key.
    fn pk_url_kwarg(&self) -> &str {
        "pk"
    }

    /// Fetches the object. A missing or malformed key is a 404.
    async fn get_object(&self, request: &HttpRequest) -> HelpfulResult<Instance> {
        let model = self.require_model()?;
        let kwarg = self.pk_url_kwarg();
        let raw = request.kwarg(kwarg).ok_or_else(|| {
            HelpfulError::NotFound(format!("No '{kwarg}' in the URL for {}", model.label()))
        })?;
        let pk: i64 = raw
            .parse()
            .map_err(|_| HelpfulError::NotFound(format!("Invalid primary key '{raw}'")))?;
        self.services().store.get(model, pk).await
    }
}
