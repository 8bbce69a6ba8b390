//! Model metadata and instances.
//!
//! [`ModelMeta`] is the equivalent of a Django model's `_meta`: names, verbose
//! names, field definitions (including foreign keys and their `on_delete`
//! rule), the `__str__` equivalent and an optional `get_absolute_url`.
//! [`Instance`] is a dynamically-typed row of such a model.

use std::collections::BTreeMap;
use std::fmt;

use crate::value::Value;

/// What happens to a referencing row when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Delete the referencing rows too.
    Cascade,
    /// Refuse the delete while referencing rows exist.
    Protect,
    /// Set the foreign key to null.
    SetNull,
    /// Leave the referencing rows alone.
    DoNothing,
}

/// The type of a model field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// Auto-incrementing integer primary key.
    AutoField,
    /// Bounded string.
    CharField {
        /// Maximum length in characters.
        max_length: usize,
    },
    /// Unbounded text.
    TextField,
    /// 64-bit integer.
    IntegerField,
    /// Float.
    FloatField,
    /// Boolean.
    BooleanField,
    /// Date without time.
    DateField,
    /// Email address.
    EmailField,
    /// Foreign key to another model, by `app_label.model_name`.
    ForeignKey {
        /// Label of the referenced model.
        to: &'static str,
        /// Rule applied when the referenced row is deleted.
        on_delete: OnDelete,
    },
}

/// A model field definition.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// The attribute name.
    pub name: &'static str,
    /// The field type.
    pub field_type: FieldType,
    /// Human-readable name, used as the form label.
    pub verbose_name: String,
    /// Help text shown beside form inputs.
    pub help_text: String,
    /// Whether the column may hold null.
    pub null: bool,
    /// Whether forms may leave the field empty.
    pub blank: bool,
    /// Whether the field appears in generated forms.
    pub editable: bool,
    /// Default value for new instances.
    pub default: Option<Value>,
}

impl FieldDef {
    /// Creates a required, editable field.
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            editable: !matches!(field_type, FieldType::AutoField),
            field_type,
            verbose_name: name.replace('_', " "),
            help_text: String::new(),
            null: false,
            blank: false,
            default: None,
        }
    }

    /// Marks the field nullable and blank.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.null = true;
        self.blank = true;
        self
    }

    /// Allows blank form input.
    #[must_use]
    pub fn blank(mut self) -> Self {
        self.blank = true;
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the verbose name.
    #[must_use]
    pub fn verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = name.into();
        self
    }

    /// Sets the help text.
    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = text.into();
        self
    }

    /// Excludes the field from generated forms.
    #[must_use]
    pub fn not_editable(mut self) -> Self {
        self.editable = false;
        self
    }

    /// Returns the target label and rule if this is a foreign key.
    pub const fn foreign_key(&self) -> Option<(&'static str, OnDelete)> {
        match self.field_type {
            FieldType::ForeignKey { to, on_delete } => Some((to, on_delete)),
            _ => None,
        }
    }
}

/// Model metadata, the equivalent of Django's `Model._meta`.
///
/// # Examples
///
/// ```
/// use helpful_db::model::{FieldDef, FieldType, Instance, ModelMeta};
/// use std::sync::LazyLock;
///
/// static AUTHOR: LazyLock<ModelMeta> = LazyLock::new(|| {
///     ModelMeta::new("library", "author")
///         .field(FieldDef::new("name", FieldType::CharField { max_length: 100 }))
///         .display(|obj| obj.get("name").to_string())
/// });
///
/// let mut author = Instance::new(&AUTHOR);
/// author.set("name", "Ursula K. Le Guin");
/// assert_eq!(author.to_string(), "Ursula K. Le Guin");
/// assert_eq!(AUTHOR.verbose_name_plural, "authors");
/// ```
#[derive(Debug, Clone)]
pub struct ModelMeta {
    /// The application label (e.g. "library").
    pub app_label: &'static str,
    /// The lowercase model name (e.g. "author").
    pub model_name: &'static str,
    /// Singular human-readable name.
    pub verbose_name: String,
    /// Plural human-readable name.
    pub verbose_name_plural: String,
    /// Field definitions in declaration order, excluding the `id` key.
    pub fields: Vec<FieldDef>,
    /// The `__str__` equivalent.
    pub display: fn(&Instance) -> String,
    /// The `get_absolute_url` equivalent, if the model has one.
    pub absolute_url: Option<fn(&Instance) -> String>,
}

fn default_display(instance: &Instance) -> String {
    match instance.pk() {
        Some(pk) => format!("{} object ({pk})", instance.meta().verbose_name),
        None => format!("{} object (None)", instance.meta().verbose_name),
    }
}

impl ModelMeta {
    /// Creates metadata with verbose names derived from the model name.
    pub fn new(app_label: &'static str, model_name: &'static str) -> Self {
        let verbose_name = model_name.replace('_', " ");
        Self {
            app_label,
            model_name,
            verbose_name_plural: format!("{verbose_name}s"),
            verbose_name,
            fields: Vec::new(),
            display: default_display,
            absolute_url: None,
        }
    }

    /// Sets the singular verbose name.
    #[must_use]
    pub fn verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = name.into();
        self
    }

    /// Sets the plural verbose name.
    #[must_use]
    pub fn verbose_name_plural(mut self, name: impl Into<String>) -> Self {
        self.verbose_name_plural = name.into();
        self
    }

    /// Appends a field definition.
    #[must_use]
    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Sets the `__str__` equivalent.
    #[must_use]
    pub fn display(mut self, display: fn(&Instance) -> String) -> Self {
        self.display = display;
        self
    }

    /// Sets the `get_absolute_url` equivalent.
    #[must_use]
    pub fn absolute_url(mut self, absolute_url: fn(&Instance) -> String) -> Self {
        self.absolute_url = Some(absolute_url);
        self
    }

    /// Returns the `app_label.model_name` label.
    pub fn label(&self) -> String {
        format!("{}.{}", self.app_label, self.model_name)
    }

    /// Looks up a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns the foreign keys declared on this model.
    pub fn foreign_keys(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.foreign_key().is_some())
    }
}

/// A model instance with dynamically typed field values.
#[derive(Debug, Clone)]
pub struct Instance {
    meta: &'static ModelMeta,
    pk: Option<i64>,
    values: BTreeMap<String, Value>,
}

impl Instance {
    /// Creates an unsaved instance with field defaults applied.
    pub fn new(meta: &'static ModelMeta) -> Self {
        let values = meta
            .fields
            .iter()
            .filter_map(|f| f.default.clone().map(|d| (f.name.to_string(), d)))
            .collect();
        Self {
            meta,
            pk: None,
            values,
        }
    }

    /// Returns the model metadata.
    pub const fn meta(&self) -> &'static ModelMeta {
        self.meta
    }

    /// Returns the primary key, or `None` if unsaved.
    pub const fn pk(&self) -> Option<i64> {
        self.pk
    }

    /// Sets the primary key.
    pub fn set_pk(&mut self, pk: i64) {
        self.pk = Some(pk);
    }

    /// Returns a field value, [`Value::Null`] if unset.
    pub fn get(&self, field: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.values.get(field).unwrap_or(&NULL)
    }

    /// Sets a field value.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        self.values.insert(field.to_string(), value.into());
    }

    /// Returns the canonical URL when the model defines one.
    pub fn get_absolute_url(&self) -> Option<String> {
        self.meta.absolute_url.map(|url| url(self))
    }

    /// Returns `true` if both instances are the same saved row.
    pub fn same_row(&self, other: &Self) -> bool {
        self.pk.is_some()
            && self.pk == other.pk
            && self.meta.app_label == other.meta.app_label
            && self.meta.model_name == other.meta.model_name
    }

    /// Serializes the instance for a template context.
    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        obj.insert("pk".to_string(), serde_json::json!(self.pk));
        for (name, value) in &self.values {
            obj.insert(name.clone(), value.to_json());
        }
        obj.insert("str".to_string(), serde_json::Value::String(self.to_string()));
        if let Some(url) = self.get_absolute_url() {
            obj.insert("absolute_url".to_string(), serde_json::Value::String(url));
        }
        serde_json::Value::Object(obj)
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&(self.meta.display)(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::LazyLock;

    static BOOK: LazyLock<ModelMeta> = LazyLock::new(|| {
        ModelMeta::new("library", "book")
            .verbose_name("Book")
            .verbose_name_plural("Books")
            .field(FieldDef::new("title", FieldType::CharField { max_length: 200 }))
            .field(FieldDef::new("pages", FieldType::IntegerField).default(0_i64))
            .field(FieldDef::new(
                "author",
                FieldType::ForeignKey {
                    to: "library.author",
                    on_delete: OnDelete::Protect,
                },
            ))
            .display(|obj| obj.get("title").to_string())
            .absolute_url(|obj| format!("/books/{}/", obj.pk().unwrap_or_default()))
    });

    static NOTE: LazyLock<ModelMeta> = LazyLock::new(|| ModelMeta::new("library", "reading_note"));

    #[test]
    fn test_meta_names() {
        assert_eq!(BOOK.label(), "library.book");
        assert_eq!(BOOK.verbose_name, "Book");
        assert_eq!(NOTE.verbose_name, "reading note");
        assert_eq!(NOTE.verbose_name_plural, "reading notes");
    }

    #[test]
    fn test_foreign_keys() {
        let fks: Vec<_> = BOOK.foreign_keys().map(|f| f.name).collect();
        assert_eq!(fks, vec!["author"]);
        assert_eq!(
            BOOK.get_field("author").unwrap().foreign_key(),
            Some(("library.author", OnDelete::Protect))
        );
        assert!(BOOK.get_field("missing").is_none());
    }

    #[test]
    fn test_instance_defaults_and_display() {
        let mut book = Instance::new(&BOOK);
        assert_eq!(book.get("pages"), &Value::Int(0));
        assert_eq!(book.get("title"), &Value::Null);
        book.set("title", "The Dispossessed");
        assert_eq!(book.to_string(), "The Dispossessed");
    }

    #[test]
    fn test_default_display() {
        let mut note = Instance::new(&NOTE);
        assert_eq!(note.to_string(), "reading note object (None)");
        note.set_pk(3);
        assert_eq!(note.to_string(), "reading note object (3)");
    }

    #[test]
    fn test_absolute_url() {
        let mut book = Instance::new(&BOOK);
        book.set_pk(12);
        assert_eq!(book.get_absolute_url().as_deref(), Some("/books/12/"));
        assert_eq!(Instance::new(&NOTE).get_absolute_url(), None);
    }

    #[test]
    fn test_same_row() {
        let mut a = Instance::new(&BOOK);
        let mut b = Instance::new(&BOOK);
        assert!(!a.same_row(&b));
        a.set_pk(1);
        b.set_pk(1);
        assert!(a.same_row(&b));
    }

    #[test]
    fn test_to_json() {
        let mut book = Instance::new(&BOOK);
        book.set_pk(2);
        book.set("title", "Lathe");
        let json = book.to_json();
        assert_eq!(json["pk"], serde_json::json!(2));
        assert_eq!(json["title"], serde_json::json!("Lathe"));
        assert_eq!(json["str"], serde_json::json!("Lathe"));
        assert_eq!(json["absolute_url"], serde_json::json!("/books/2/"));
    }
}
