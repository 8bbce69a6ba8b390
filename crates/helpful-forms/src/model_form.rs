//! Model forms generated from [`ModelMeta`].
//!
//! [`modelform_factory`] checks a field list against a model and returns a
//! [`ModelFormClass`]. Each [`FormClass::construct`] call builds a
//! [`ModelForm`] around the given instance, or a fresh one.

use std::collections::BTreeMap;

use async_trait::async_trait;

use helpful_core::{HelpfulError, HelpfulResult, ModelFormBase, ValidationError};
use helpful_db::{FieldDef, FieldType, Instance, ModelMeta, ObjectStore, Value};
use helpful_http::QueryDict;

use crate::errors::FormErrors;
use crate::fields::{pretty_name, FormFieldDef, FormFieldType, Widget};
use crate::form::{BaseForm, Form, FormClass, FormKwargs};
use crate::layout::FormHelper;

/// A form class generated for a model.
#[derive(Debug, Clone)]
pub struct ModelFormClass {
    meta: &'static ModelMeta,
    fields: Vec<FormFieldDef>,
    base: ModelFormBase,
    helper: Option<FormHelper>,
}

impl ModelFormClass {
    /// Returns the model.
    pub const fn meta(&self) -> &'static ModelMeta {
        self.meta
    }

    /// Returns the generated field definitions.
    pub fn fields(&self) -> &[FormFieldDef] {
        &self.fields
    }

    /// Returns the form base this class was generated with.
    pub const fn base(&self) -> ModelFormBase {
        self.base
    }

    /// Attaches a helper to every form this class constructs.
    #[must_use]
    pub fn with_helper(mut self, helper: FormHelper) -> Self {
        self.helper = Some(helper);
        self
    }
}

impl FormClass for ModelFormClass {
    fn construct(&self, kwargs: FormKwargs) -> Box<dyn Form> {
        let mut form = ModelForm::new(self.meta, self.fields.clone(), kwargs);
        if let Some(helper) = &self.helper {
            form.set_helper(helper.clone());
        }
        Box::new(form)
    }
}

/// Generates a form class for `meta` with the listed fields in order.
///
/// Fields named in `localized_fields` are localized. Unknown or
/// non-editable field names are configuration errors.
///
/// # Examples
///
/// ```
/// use std::sync::LazyLock;
///
/// use helpful_core::ModelFormBase;
/// use helpful_db::model::{FieldDef, FieldType, ModelMeta};
/// use helpful_forms::modelform_factory;
///
/// static BOOK: LazyLock<ModelMeta> = LazyLock::new(|| {
///     ModelMeta::new("library", "book")
///         .field(FieldDef::new("title", FieldType::CharField { max_length: 100 }))
///         .field(FieldDef::new("price", FieldType::FloatField))
/// });
///
/// let class = modelform_factory(
///     &BOOK,
///     &["title".to_string(), "price".to_string()],
///     &["price".to_string()],
///     ModelFormBase::Plain,
/// )
/// .unwrap();
/// assert!(class.fields()[1].localize);
/// assert!(modelform_factory(&BOOK, &["isbn".to_string()], &[], ModelFormBase::Plain).is_err());
/// ```
pub fn modelform_factory(
    meta: &'static ModelMeta,
    fields: &[String],
    localized_fields: &[String],
    base: ModelFormBase,
) -> HelpfulResult<ModelFormClass> {
    let unknown: Vec<&str> = fields
        .iter()
        .filter(|name| meta.get_field(name).is_none())
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(HelpfulError::ImproperlyConfigured(format!(
            "Unknown field(s) ({}) specified for {}",
            unknown.join(", "),
            meta.model_name
        )));
    }

    let mut defs = Vec::with_capacity(fields.len());
    for name in fields {
        let Some(model_field) = meta.get_field(name) else {
            continue;
        };
        if !model_field.editable {
            return Err(HelpfulError::ImproperlyConfigured(format!(
                "'{name}' cannot be specified for {} model form as it is a non-editable field",
                meta.model_name
            )));
        }
        let localize = localized_fields.iter().any(|f| f == name);
        defs.push(form_field_for(model_field, base).localize(localize));
    }

    tracing::debug!(
        model = %meta.label(),
        fields = defs.len(),
        ?base,
        "Generated model form class"
    );

    Ok(ModelFormClass {
        meta,
        fields: defs,
        base,
        helper: None,
    })
}

fn form_field_for(field: &FieldDef, base: ModelFormBase) -> FormFieldDef {
    let field_type = match &field.field_type {
        FieldType::CharField { max_length } => FormFieldType::Char {
            max_length: Some(*max_length),
            strip: true,
        },
        FieldType::TextField => FormFieldType::Text,
        FieldType::AutoField | FieldType::IntegerField => FormFieldType::Integer {
            min_value: None,
            max_value: None,
        },
        FieldType::FloatField => FormFieldType::Float {
            min_value: None,
            max_value: None,
        },
        FieldType::BooleanField => FormFieldType::Boolean,
        FieldType::DateField => FormFieldType::Date,
        FieldType::EmailField => FormFieldType::Email,
        FieldType::ForeignKey { to, .. } => FormFieldType::ModelChoice { to: *to },
    };

    let is_boolean = matches!(field_type, FormFieldType::Boolean);
    let mut def = FormFieldDef::new(field.name, field_type)
        .required(!field.blank && !is_boolean)
        .label(pretty_name(&field.verbose_name))
        .help_text(field.help_text.clone());
    if let Some(default) = &field.default {
        def = def.initial(default.clone());
    }
    if let (ModelFormBase::Autocomplete, Some((to, _))) = (base, field.foreign_key()) {
        def = def.widget(Widget::Autocomplete { model: to });
    }
    def
}

/// A form bound to a model instance.
#[derive(Debug, Clone)]
pub struct ModelForm {
    form: BaseForm,
    meta: &'static ModelMeta,
    instance: Instance,
}

impl ModelForm {
    /// Builds a form for `meta`. Initial values come from the instance,
    /// overridden by `kwargs.initial`.
    pub fn new(meta: &'static ModelMeta, fields: Vec<FormFieldDef>, kwargs: FormKwargs) -> Self {
        let instance = kwargs.instance.unwrap_or_else(|| Instance::new(meta));
        let mut initial: BTreeMap<String, Value> = fields
            .iter()
            .filter_map(|field| {
                let value = instance.get(&field.name);
                (!value.is_null()).then(|| (field.name.clone(), value.clone()))
            })
            .collect();
        initial.extend(kwargs.initial);

        let mut form = BaseForm::new(fields).with_initial(initial);
        if let Some(prefix) = kwargs.prefix {
            form = form.with_prefix(prefix);
        }
        if let Some(data) = kwargs.data {
            form.bind(&data);
        }
        Self {
            form,
            meta,
            instance,
        }
    }

    /// Returns the model.
    pub const fn meta(&self) -> &'static ModelMeta {
        self.meta
    }
}

#[async_trait]
impl Form for ModelForm {
    fn fields(&self) -> &[FormFieldDef] {
        self.form.fields()
    }

    fn prefix(&self) -> Option<&str> {
        self.form.prefix()
    }

    fn bind(&mut self, data: &QueryDict) {
        self.form.bind(data);
    }

    fn is_bound(&self) -> bool {
        self.form.is_bound()
    }

    fn value_for(&self, field: &FormFieldDef) -> Option<String> {
        self.form.value_for(field)
    }

    async fn is_valid(&mut self) -> bool {
        self.form.is_valid().await
    }

    fn errors(&self) -> &FormErrors {
        self.form.errors()
    }

    fn cleaned_data(&self) -> &BTreeMap<String, Value> {
        self.form.cleaned_data()
    }

    fn helper(&self) -> Option<&FormHelper> {
        self.form.helper()
    }

    fn set_helper(&mut self, helper: FormHelper) {
        self.form.set_helper(helper);
    }

    fn instance(&self) -> Option<&Instance> {
        Some(&self.instance)
    }

    /// Copies the cleaned data onto the instance and saves it.
    async fn save(&mut self, store: &dyn ObjectStore) -> HelpfulResult<Instance> {
        if !self.form.is_bound() || self.form.has_errors() {
            let action = if self.instance.pk().is_some() {
                "changed"
            } else {
                "created"
            };
            return Err(HelpfulError::ValidationError(ValidationError::new(
                format!(
                    "The {} could not be {action} because the data didn't validate.",
                    self.meta.verbose_name
                ),
                "invalid",
            )));
        }
        for (name, value) in self.form.cleaned_data() {
            self.instance.set(name, value.clone());
        }
        store.save(&mut self.instance).await?;
        tracing::debug!(
            model = %self.meta.label(),
            pk = ?self.instance.pk(),
            "Saved model form instance"
        );
        Ok(self.instance.clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use helpful_db::{MemoryStore, OnDelete};

    use super::*;

    static AUTHOR: LazyLock<ModelMeta> = LazyLock::new(|| {
        ModelMeta::new("library", "author")
            .field(FieldDef::new("name", FieldType::CharField { max_length: 50 }))
    });

    static BOOK: LazyLock<ModelMeta> = LazyLock::new(|| {
        ModelMeta::new("library", "book")
            .field(FieldDef::new("title", FieldType::CharField { max_length: 100 }))
            .field(FieldDef::new("price", FieldType::FloatField).nullable())
            .field(FieldDef::new("in_print", FieldType::BooleanField).default(true))
            .field(
                FieldDef::new(
                    "author",
                    FieldType::ForeignKey {
                        to: "library.author",
                        on_delete: OnDelete::Cascade,
                    },
                )
                .verbose_name("written by"),
            )
            .field(FieldDef::new("slug", FieldType::CharField { max_length: 20 }).not_editable())
    });

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_unknown_fields_listed() {
        let err = modelform_factory(&BOOK, &names(&["title", "isbn", "pages"]), &[], ModelFormBase::Plain)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Improperly configured: Unknown field(s) (isbn, pages) specified for book"
        );
    }

    #[test]
    fn test_non_editable_rejected() {
        let err = modelform_factory(&BOOK, &names(&["slug"]), &[], ModelFormBase::Plain).unwrap_err();
        assert!(err.to_string().contains("non-editable"));
    }

    #[test]
    fn test_generated_fields() {
        let class = modelform_factory(
            &BOOK,
            &names(&["author", "title", "in_print", "price"]),
            &names(&["price"]),
            ModelFormBase::Plain,
        )
        .unwrap();
        let fields = class.fields();
        assert_eq!(fields[0].name, "author");
        assert_eq!(fields[0].label, "Written by");
        assert_eq!(fields[0].widget, Widget::TextInput);
        assert!(!fields[2].required);
        assert!(!fields[3].required);
        assert!(fields[3].localize);
        assert_eq!(fields[3].widget, Widget::TextInput);
    }

    #[test]
    fn test_autocomplete_base() {
        let class = modelform_factory(&BOOK, &names(&["author"]), &[], ModelFormBase::Autocomplete)
            .unwrap();
        assert_eq!(
            class.fields()[0].widget,
            Widget::Autocomplete {
                model: "library.author"
            }
        );
    }

    #[tokio::test]
    async fn test_create_and_save() {
        let store = MemoryStore::new(vec![&AUTHOR, &BOOK]);
        let class = modelform_factory(&BOOK, &names(&["title", "price", "author"]), &names(&["price"]), ModelFormBase::Plain)
            .unwrap();
        let mut form = class.construct(
            FormKwargs::new().data(Some(QueryDict::parse("title=Dune&price=9%2C5&author=1"))),
        );
        assert!(form.is_valid().await);
        let book = form.save(&store).await.unwrap();
        assert!(book.pk().is_some());
        assert_eq!(book.get("price"), &Value::Float(9.5));
        assert_eq!(book.get("in_print"), &Value::Bool(true));
        assert_eq!(store.all(&BOOK).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_uses_instance_initial() {
        let store = MemoryStore::new(vec![&AUTHOR, &BOOK]);
        let mut book = Instance::new(&BOOK);
        book.set("title", "Old");
        book.set("author", 1_i64);
        store.save(&mut book).await.unwrap();

        let class = modelform_factory(&BOOK, &names(&["title"]), &[], ModelFormBase::Plain).unwrap();
        let form = class.construct(FormKwargs::new().instance(book.clone()));
        assert_eq!(form.as_context()["fields"][0]["value"], "Old");

        let mut form = class.construct(
            FormKwargs::new()
                .instance(book.clone())
                .data(Some(QueryDict::parse("title=New"))),
        );
        assert!(form.is_valid().await);
        let saved = form.save(&store).await.unwrap();
        assert_eq!(saved.pk(), book.pk());
        assert_eq!(store.get(&BOOK, saved.pk().unwrap()).await.unwrap().get("title"), &Value::from("New"));
    }

    #[tokio::test]
    async fn test_save_invalid_refused() {
        let store = MemoryStore::new(vec![&BOOK]);
        let class = modelform_factory(&BOOK, &names(&["title"]), &[], ModelFormBase::Plain).unwrap();
        let mut form = class.construct(FormKwargs::new().data(Some(QueryDict::new())));
        assert!(!form.is_valid().await);
        let err = form.save(&store).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: The book could not be created because the data didn't validate."
        );
    }

    #[test]
    fn test_helper_attached() {
        let class = modelform_factory(&BOOK, &names(&["title"]), &[], ModelFormBase::Plain)
            .unwrap()
            .with_helper(FormHelper::new().with_form_tag(false));
        let form = class.construct(FormKwargs::new());
        assert!(form.helper().is_some_and(|h| !h.form_tag));
    }
}
