//! The [`Form`] trait, form construction and [`BaseForm`].
//!
//! Forms are built through a [`FormClass`], the equivalent of passing a form
//! class plus keyword arguments around: views hold an `Arc<dyn FormClass>`
//! and call [`FormClass::construct`] with per-request [`FormKwargs`]. Any
//! `Fn(FormKwargs) -> Box<dyn Form>` closure is a form class.

use std::collections::BTreeMap;

use async_trait::async_trait;

use helpful_core::{HelpfulError, HelpfulResult};
use helpful_db::{Instance, ObjectStore, Value};
use helpful_http::QueryDict;

use crate::errors::FormErrors;
use crate::fields::{clean_field_value, escape_html, format_value, FormFieldDef};
use crate::layout::FormHelper;

/// The core form trait.
///
/// Validation is async so that `clean` hooks can query a store.
#[async_trait]
pub trait Form: Send + Sync {
    /// Returns the field definitions in form order.
    fn fields(&self) -> &[FormFieldDef];

    /// Returns the prefix used to namespace input names.
    fn prefix(&self) -> Option<&str>;

    /// Binds submitted data, clearing earlier validation results.
    fn bind(&mut self, data: &QueryDict);

    /// Returns `true` once data has been bound.
    fn is_bound(&self) -> bool;

    /// Returns the value to show in the input for `field`: the submitted
    /// string when bound, the initial value otherwise.
    fn value_for(&self, field: &FormFieldDef) -> Option<String>;

    /// Runs field cleaning then [`Form::clean`]. Unbound forms are invalid.
    async fn is_valid(&mut self) -> bool;

    /// Returns the errors found by the last [`Form::is_valid`] call.
    fn errors(&self) -> &FormErrors;

    /// Returns the cleaned values of the last [`Form::is_valid`] call.
    fn cleaned_data(&self) -> &BTreeMap<String, Value>;

    /// Cross-field validation hook. Runs after field cleaning.
    async fn clean(&self) -> Result<(), FormErrors> {
        Ok(())
    }

    /// Returns the rendering helper, if one is attached.
    fn helper(&self) -> Option<&FormHelper> {
        None
    }

    /// Attaches a rendering helper.
    fn set_helper(&mut self, helper: FormHelper);

    /// Returns the model instance backing this form, if any.
    fn instance(&self) -> Option<&Instance> {
        None
    }

    /// Persists the form's instance. Only model-backed forms can be saved.
    async fn save(&mut self, _store: &dyn ObjectStore) -> HelpfulResult<Instance> {
        Err(HelpfulError::ImproperlyConfigured(
            "This form is not backed by a model and cannot be saved".to_string(),
        ))
    }

    /// Returns the input name for `field`, including the prefix.
    fn add_prefix(&self, field: &str) -> String {
        match self.prefix() {
            Some(prefix) => format!("{prefix}-{field}"),
            None => field.to_string(),
        }
    }

    /// Returns `true` if validation found any error.
    fn has_errors(&self) -> bool {
        !self.errors().is_empty()
    }

    /// Serializes the form for a template context.
    fn as_context(&self) -> serde_json::Value {
        form_context(self)
    }
}

/// Builds the template context of a form.
///
/// The result carries `prefix`, `is_bound`, the per-field entries under
/// `fields`, the error map under `errors`, `non_field_errors`, the helper
/// and the rendered `html`.
pub fn form_context<F: Form + ?Sized>(form: &F) -> serde_json::Value {
    let errors = form.errors();
    let fields: Vec<serde_json::Value> = form
        .fields()
        .iter()
        .map(|field| {
            let html_name = form.add_prefix(&field.name);
            let value = form.value_for(field);
            serde_json::json!({
                "name": field.name,
                "html_name": html_name,
                "label": field.label,
                "help_text": field.help_text,
                "required": field.required,
                "localize": field.localize,
                "is_hidden": field.widget.is_hidden(),
                "value": value,
                "errors": errors.get(&field.name).unwrap_or_default(),
                "html": field.widget.render(&html_name, value.as_deref(), field.required),
            })
        })
        .collect();

    serde_json::json!({
        "prefix": form.prefix(),
        "is_bound": form.is_bound(),
        "fields": fields,
        "errors": errors,
        "non_field_errors": errors.non_field_errors(),
        "helper": form.helper(),
        "html": render_form(form),
    })
}

/// Renders a form's fields, wrapped in a `<form>` tag unless the helper
/// disables it.
pub fn render_form<F: Form + ?Sized>(form: &F) -> String {
    let render_field = |name: &str| {
        form.fields()
            .iter()
            .find(|field| field.name == name)
            .map(|field| render_field_row(form, field))
            .unwrap_or_default()
    };

    let mut body = String::new();
    for message in form.errors().non_field_errors() {
        body.push_str(&format!(
            "<div class=\"alert alert-danger\">{}</div>",
            escape_html(message)
        ));
    }

    let layout = form.helper().and_then(|helper| helper.layout.as_ref());
    match layout {
        Some(layout) => {
            body.push_str(&layout.render(render_field));
            let render_hidden = form.helper().is_some_and(|h| h.render_hidden_fields);
            if render_hidden {
                let in_layout = layout.field_names();
                for field in form.fields() {
                    if field.widget.is_hidden() && !in_layout.contains(&field.name.as_str()) {
                        body.push_str(&render_field_row(form, field));
                    }
                }
            }
        }
        None => {
            for field in form.fields() {
                body.push_str(&render_field_row(form, field));
            }
        }
    }

    let form_tag = form.helper().map_or(true, |helper| helper.form_tag);
    if form_tag {
        format!("<form method=\"post\">{body}</form>")
    } else {
        body
    }
}

fn render_field_row<F: Form + ?Sized>(form: &F, field: &FormFieldDef) -> String {
    let html_name = form.add_prefix(&field.name);
    let input = field
        .widget
        .render(&html_name, form.value_for(field).as_deref(), field.required);
    if field.widget.is_hidden() {
        return input;
    }
    let mut html = format!(
        "<div class=\"form-group\"><label for=\"id_{}\">{}</label>{input}",
        escape_html(&html_name),
        escape_html(&field.label)
    );
    if let Some(messages) = form.errors().get(&field.name) {
        for message in messages {
            html.push_str(&format!(
                "<span class=\"help-block\">{}</span>",
                escape_html(message)
            ));
        }
    }
    if !field.help_text.is_empty() {
        html.push_str(&format!(
            "<p class=\"help-block\">{}</p>",
            escape_html(&field.help_text)
        ));
    }
    html.push_str("</div>");
    html
}

/// Keyword arguments for constructing a form.
#[derive(Debug, Clone, Default)]
pub struct FormKwargs {
    /// Input-name prefix.
    pub prefix: Option<String>,
    /// Submitted data; `None` leaves the form unbound.
    pub data: Option<QueryDict>,
    /// The instance a model form edits.
    pub instance: Option<Instance>,
    /// Initial values, overriding field and instance values.
    pub initial: BTreeMap<String, Value>,
}

impl FormKwargs {
    /// Creates empty kwargs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the prefix.
    #[must_use]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Sets the submitted data.
    #[must_use]
    pub fn data(mut self, data: Option<QueryDict>) -> Self {
        self.data = data;
        self
    }

    /// Sets the instance.
    #[must_use]
    pub fn instance(mut self, instance: Instance) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Adds an initial value.
    #[must_use]
    pub fn initial(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.initial.insert(field.to_string(), value.into());
        self
    }
}

/// Something that can construct forms.
pub trait FormClass: Send + Sync {
    /// Constructs a form from keyword arguments.
    fn construct(&self, kwargs: FormKwargs) -> Box<dyn Form>;
}

impl<F> FormClass for F
where
    F: Fn(FormKwargs) -> Box<dyn Form> + Send + Sync,
{
    fn construct(&self, kwargs: FormKwargs) -> Box<dyn Form> {
        self(kwargs)
    }
}

/// A general-purpose form over a list of field definitions.
///
/// # Examples
///
/// ```
/// use helpful_forms::fields::{FormFieldDef, FormFieldType};
/// use helpful_forms::{BaseForm, Form};
/// use helpful_http::QueryDict;
///
/// # #[tokio::main]
/// # async fn main() {
/// let mut form = BaseForm::new(vec![FormFieldDef::new(
///     "name",
///     FormFieldType::Char { max_length: Some(20), strip: true },
/// )])
/// .with_prefix("author");
/// form.bind(&QueryDict::parse("author-name=Ursula"));
/// assert!(form.is_valid().await);
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct BaseForm {
    field_defs: Vec<FormFieldDef>,
    initial: BTreeMap<String, Value>,
    prefix: Option<String>,
    bound: bool,
    raw_data: BTreeMap<String, Option<String>>,
    errors: FormErrors,
    cleaned_data: BTreeMap<String, Value>,
    helper: Option<FormHelper>,
}

impl BaseForm {
    /// Creates an unbound form.
    pub fn new(fields: Vec<FormFieldDef>) -> Self {
        Self {
            field_defs: fields,
            ..Self::default()
        }
    }

    /// Creates a form from kwargs, binding it when data is present.
    pub fn from_kwargs(fields: Vec<FormFieldDef>, kwargs: FormKwargs) -> Self {
        let mut form = Self::new(fields);
        form.prefix = kwargs.prefix;
        form.initial = kwargs.initial;
        if let Some(data) = kwargs.data {
            form.bind(&data);
        }
        form
    }

    /// Sets the prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Sets initial values.
    #[must_use]
    pub fn with_initial(mut self, initial: BTreeMap<String, Value>) -> Self {
        self.initial = initial;
        self
    }

    /// Returns the initial values.
    pub const fn initial(&self) -> &BTreeMap<String, Value> {
        &self.initial
    }

    /// Sets an initial value.
    pub fn set_initial(&mut self, field: &str, value: Value) {
        self.initial.insert(field.to_string(), value);
    }

    /// Merges errors into the current error map.
    pub fn add_errors(&mut self, errors: FormErrors) {
        for (field, messages) in errors.iter() {
            self.errors.extend(field, messages.iter().cloned());
        }
    }

    /// Runs field-level cleaning only. Returns `true` if no field failed.
    pub fn clean_fields(&mut self) -> bool {
        self.errors.clear();
        self.cleaned_data.clear();
        if !self.bound {
            return false;
        }
        for field in &self.field_defs {
            if field.disabled {
                if let Some(initial) = self.initial.get(&field.name).or(field.initial.as_ref()) {
                    self.cleaned_data.insert(field.name.clone(), initial.clone());
                }
                continue;
            }
            let raw = self.raw_data.get(&field.name).and_then(Option::as_deref);
            match clean_field_value(field, raw) {
                Ok(value) => {
                    self.cleaned_data.insert(field.name.clone(), value);
                }
                Err(messages) => self.errors.extend(&field.name, messages),
            }
        }
        self.errors.is_empty()
    }
}

#[async_trait]
impl Form for BaseForm {
    fn fields(&self) -> &[FormFieldDef] {
        &self.field_defs
    }

    fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    fn bind(&mut self, data: &QueryDict) {
        self.bound = true;
        self.errors.clear();
        self.cleaned_data.clear();
        self.raw_data = self
            .field_defs
            .iter()
            .map(|field| {
                let value = data.get(&self.add_prefix(&field.name)).map(String::from);
                (field.name.clone(), value)
            })
            .collect();
    }

    fn is_bound(&self) -> bool {
        self.bound
    }

    fn value_for(&self, field: &FormFieldDef) -> Option<String> {
        if self.bound && !field.disabled {
            return self.raw_data.get(&field.name).cloned().flatten();
        }
        self.initial
            .get(&field.name)
            .or(field.initial.as_ref())
            .map(|value| format_value(field, value))
    }

    async fn is_valid(&mut self) -> bool {
        if !self.clean_fields() {
            return false;
        }
        if let Err(errors) = self.clean().await {
            self.add_errors(errors);
        }
        self.errors.is_empty()
    }

    fn errors(&self) -> &FormErrors {
        &self.errors
    }

    fn cleaned_data(&self) -> &BTreeMap<String, Value> {
        &self.cleaned_data
    }

    fn helper(&self) -> Option<&FormHelper> {
        self.helper.as_ref()
    }

    fn set_helper(&mut self, helper: FormHelper) {
        self.helper = Some(helper);
    }
}

/// Validates every form and returns `true` only if all are valid.
///
/// Every form is validated, so each one carries its errors afterwards.
pub async fn all_valid(forms: &mut [Box<dyn Form>]) -> bool {
    let mut valid = true;
    for form in forms.iter_mut() {
        valid &= form.is_valid().await;
    }
    valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FormFieldType;
    use crate::layout::{Div, Layout};

    fn fields() -> Vec<FormFieldDef> {
        vec![
            FormFieldDef::new(
                "username",
                FormFieldType::Char {
                    max_length: Some(20),
                    strip: true,
                },
            ),
            FormFieldDef::new("email", FormFieldType::Email),
            FormFieldDef::new(
                "age",
                FormFieldType::Integer {
                    min_value: Some(0),
                    max_value: Some(150),
                },
            )
            .required(false),
        ]
    }

    struct MatchingForm(BaseForm);

    #[async_trait]
    impl Form for MatchingForm {
        fn fields(&self) -> &[FormFieldDef] {
            self.0.fields()
        }
        fn prefix(&self) -> Option<&str> {
            self.0.prefix()
        }
        fn bind(&mut self, data: &QueryDict) {
            self.0.bind(data);
        }
        fn is_bound(&self) -> bool {
            self.0.is_bound()
        }
        fn value_for(&self, field: &FormFieldDef) -> Option<String> {
            self.0.value_for(field)
        }
        async fn is_valid(&mut self) -> bool {
            if !self.0.clean_fields() {
                return false;
            }
            if let Err(errors) = self.clean().await {
                self.0.add_errors(errors);
            }
            self.0.errors().is_empty()
        }
        fn errors(&self) -> &FormErrors {
            self.0.errors()
        }
        fn cleaned_data(&self) -> &BTreeMap<String, Value> {
            self.0.cleaned_data()
        }
        async fn clean(&self) -> Result<(), FormErrors> {
            if self.0.cleaned_data().get("username") == Some(&Value::from("admin")) {
                let mut errors = FormErrors::new();
                errors.add(crate::errors::NON_FIELD_ERRORS, "Reserved name.");
                return Err(errors);
            }
            Ok(())
        }
        fn set_helper(&mut self, helper: FormHelper) {
            self.0.set_helper(helper);
        }
    }

    #[tokio::test]
    async fn test_unbound_is_invalid() {
        let mut form = BaseForm::new(fields());
        assert!(!form.is_bound());
        assert!(!form.is_valid().await);
        assert!(!form.has_errors());
    }

    #[tokio::test]
    async fn test_bind_and_validate() {
        let mut form = BaseForm::new(fields());
        form.bind(&QueryDict::parse("username=alice&email=alice%40example.com&age=30"));
        assert!(form.is_valid().await);
        assert_eq!(form.cleaned_data().get("age"), Some(&Value::Int(30)));
        assert_eq!(
            form.cleaned_data().get("username"),
            Some(&Value::from("alice"))
        );
    }

    #[tokio::test]
    async fn test_errors_accumulate() {
        let mut form = BaseForm::new(fields());
        form.bind(&QueryDict::parse("email=nope&age=-1"));
        assert!(!form.is_valid().await);
        assert!(form.errors().contains_key("username"));
        assert!(form.errors().contains_key("email"));
        assert!(form.errors().contains_key("age"));
    }

    #[tokio::test]
    async fn test_prefix_namespaces_inputs() {
        let mut form = BaseForm::from_kwargs(
            fields(),
            FormKwargs::new()
                .prefix("author")
                .data(Some(QueryDict::parse("author-username=bob&author-email=b%40b.org"))),
        );
        assert!(form.is_bound());
        assert_eq!(form.add_prefix("email"), "author-email");
        assert!(form.is_valid().await);
    }

    #[tokio::test]
    async fn test_rebind_clears_state() {
        let mut form = BaseForm::new(fields());
        form.bind(&QueryDict::parse("username=alice"));
        assert!(!form.is_valid().await);
        form.bind(&QueryDict::parse("username=alice&email=a%40b.org"));
        assert!(form.is_valid().await);
        assert!(form.errors().is_empty());
    }

    #[tokio::test]
    async fn test_clean_hook_adds_non_field_error() {
        let mut form = MatchingForm(BaseForm::new(fields()));
        form.bind(&QueryDict::parse("username=admin&email=a%40b.org"));
        assert!(!form.is_valid().await);
        assert_eq!(form.errors().non_field_errors(), ["Reserved name."]);
    }

    #[tokio::test]
    async fn test_all_valid_validates_every_form() {
        let mut forms: Vec<Box<dyn Form>> = vec![
            Box::new(BaseForm::from_kwargs(
                fields(),
                FormKwargs::new()
                    .prefix("a")
                    .data(Some(QueryDict::parse("a-username=x&a-email=x%40y.org"))),
            )),
            Box::new(BaseForm::from_kwargs(
                fields(),
                FormKwargs::new().prefix("b").data(Some(QueryDict::new())),
            )),
            Box::new(BaseForm::from_kwargs(
                fields(),
                FormKwargs::new().prefix("c").data(Some(QueryDict::new())),
            )),
        ];
        assert!(!all_valid(&mut forms).await);
        assert!(!forms[0].has_errors());
        assert!(forms[1].has_errors());
        assert!(forms[2].has_errors());
    }

    #[test]
    fn test_context_unbound_uses_initial() {
        let form = BaseForm::new(fields()).with_initial(BTreeMap::from([(
            "username".to_string(),
            Value::from("carol"),
        )]));
        let ctx = form.as_context();
        assert_eq!(ctx["is_bound"], false);
        assert_eq!(ctx["fields"][0]["value"], "carol");
        assert_eq!(ctx["fields"][0]["label"], "Username");
        assert_eq!(ctx["errors"], serde_json::json!({}));
        assert!(ctx["html"].as_str().unwrap().starts_with("<form method=\"post\">"));
    }

    #[tokio::test]
    async fn test_context_carries_errors() {
        let mut form = BaseForm::new(fields()).with_prefix("p");
        form.bind(&QueryDict::parse("p-username=alice"));
        form.is_valid().await;
        let ctx = form.as_context();
        assert_eq!(ctx["prefix"], "p");
        assert_eq!(ctx["errors"]["email"][0], "This field is required.");
        assert_eq!(ctx["fields"][0]["html_name"], "p-username");
        assert_eq!(ctx["fields"][0]["value"], "alice");
    }

    #[test]
    fn test_render_with_helper_layout() {
        let mut form = BaseForm::new(fields());
        form.set_helper(
            FormHelper::new()
                .with_form_tag(false)
                .with_layout(Layout::new([Div::new(["email"], "row")])),
        );
        let html = render_form(&form);
        assert!(html.starts_with("<div class=\"row\"><div class=\"form-group\">"));
        assert!(html.contains("name=\"email\""));
        assert!(!html.contains("name=\"username\""));
        assert!(!html.contains("<form"));
    }

    #[tokio::test]
    async fn test_closure_form_class() {
        let class = |kwargs: FormKwargs| -> Box<dyn Form> {
            Box::new(BaseForm::from_kwargs(fields(), kwargs))
        };
        let form = class.construct(FormKwargs::new().prefix("x"));
        assert_eq!(form.prefix(), Some("x"));
        assert!(!form.is_bound());
    }

    #[tokio::test]
    async fn test_base_form_cannot_save() {
        let store = helpful_db::MemoryStore::new(Vec::new());
        let mut form = BaseForm::new(fields());
        let err = form.save(&store).await.unwrap_err();
        assert!(err.is_configuration_error());
    }
}
