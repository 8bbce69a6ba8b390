//! Form field definitions, value cleaning and widget rendering.
//!
//! Each [`FormFieldDef`] describes one form field: its [`FormFieldType`]
//! (which controls parsing and coercion in [`clean_field_value`]), the
//! [`Widget`] it renders with, and its label, help text and flags.

use std::sync::LazyLock;

use regex::Regex;

use helpful_db::Value;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").expect("valid regex")
});

/// The type of a form field, with its type-specific parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum FormFieldType {
    /// A single-line string.
    Char {
        /// Maximum length in characters.
        max_length: Option<usize>,
        /// Whether to strip surrounding whitespace.
        strip: bool,
    },
    /// Multi-line text.
    Text,
    /// An integer.
    Integer {
        /// Minimum allowed value.
        min_value: Option<i64>,
        /// Maximum allowed value.
        max_value: Option<i64>,
    },
    /// A float.
    Float {
        /// Minimum allowed value.
        min_value: Option<f64>,
        /// Maximum allowed value.
        max_value: Option<f64>,
    },
    /// A checkbox.
    Boolean,
    /// A date (YYYY-MM-DD).
    Date,
    /// An email address.
    Email,
    /// A reference to a row of another model, submitted as its primary key.
    ModelChoice {
        /// Label of the referenced model.
        to: &'static str,
    },
}

/// How a field renders to HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Widget {
    /// `<input type="text">`
    TextInput,
    /// `<input type="number">`
    NumberInput,
    /// `<input type="email">`
    EmailInput,
    /// `<input type="date">`
    DateInput,
    /// `<input type="checkbox">`
    CheckboxInput,
    /// `<textarea>`
    Textarea,
    /// `<input type="hidden">`
    HiddenInput,
    /// A text input wired to a client-side autocomplete for `model`.
    Autocomplete {
        /// Label of the model to search.
        model: &'static str,
    },
}

impl Widget {
    /// Returns the default widget for a field type.
    pub const fn for_type(field_type: &FormFieldType) -> Self {
        match field_type {
            FormFieldType::Char { .. } | FormFieldType::ModelChoice { .. } => Self::TextInput,
            FormFieldType::Text => Self::Textarea,
            FormFieldType::Integer { .. } | FormFieldType::Float { .. } => Self::NumberInput,
            FormFieldType::Boolean => Self::CheckboxInput,
            FormFieldType::Date => Self::DateInput,
            FormFieldType::Email => Self::EmailInput,
        }
    }

    /// Returns `true` for hidden inputs.
    pub const fn is_hidden(&self) -> bool {
        matches!(self, Self::HiddenInput)
    }

    /// Renders the widget for `html_name` with the current raw value.
    pub fn render(&self, html_name: &str, value: Option<&str>, required: bool) -> String {
        let name = escape_html(html_name);
        let value = value.unwrap_or("");
        let required = if required { " required" } else { "" };
        let value_attr = if value.is_empty() {
            String::new()
        } else {
            format!(" value=\"{}\"", escape_html(value))
        };
        match self {
            Self::TextInput => {
                format!("<input type=\"text\" name=\"{name}\" id=\"id_{name}\"{value_attr}{required}>")
            }
            Self::NumberInput => {
                format!("<input type=\"number\" name=\"{name}\" id=\"id_{name}\"{value_attr}{required}>")
            }
            Self::EmailInput => {
                format!("<input type=\"email\" name=\"{name}\" id=\"id_{name}\"{value_attr}{required}>")
            }
            Self::DateInput => {
                format!("<input type=\"date\" name=\"{name}\" id=\"id_{name}\"{value_attr}{required}>")
            }
            Self::HiddenInput => {
                format!("<input type=\"hidden\" name=\"{name}\" id=\"id_{name}\"{value_attr}>")
            }
            Self::CheckboxInput => {
                let checked = if is_truthy(value) { " checked" } else { "" };
                format!("<input type=\"checkbox\" name=\"{name}\" id=\"id_{name}\"{checked}>")
            }
            Self::Textarea => format!(
                "<textarea name=\"{name}\" id=\"id_{name}\"{required}>{}</textarea>",
                escape_html(value)
            ),
            Self::Autocomplete { model } => format!(
                "<input type=\"text\" name=\"{name}\" id=\"id_{name}\" class=\"autocomplete\" \
                 data-autocomplete-model=\"{model}\"{value_attr}{required}>"
            ),
        }
    }
}

/// A form field definition.
#[derive(Debug, Clone)]
pub struct FormFieldDef {
    /// The field name, without any form prefix.
    pub name: String,
    /// The field type.
    pub field_type: FormFieldType,
    /// Whether an empty submission is an error.
    pub required: bool,
    /// Initial value for unbound forms.
    pub initial: Option<Value>,
    /// Human-readable label.
    pub label: String,
    /// Help text shown beside the input.
    pub help_text: String,
    /// The widget used for rendering.
    pub widget: Widget,
    /// Whether input and output use locale-aware number formats.
    pub localize: bool,
    /// Disabled fields render but always clean to their initial value.
    pub disabled: bool,
}

impl FormFieldDef {
    /// Creates a required field with the default widget for its type.
    pub fn new(name: impl Into<String>, field_type: FormFieldType) -> Self {
        let name = name.into();
        Self {
            label: pretty_name(&name),
            widget: Widget::for_type(&field_type),
            name,
            field_type,
            required: true,
            initial: None,
            help_text: String::new(),
            localize: false,
            disabled: false,
        }
    }

    /// Sets whether the field is required.
    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Sets the initial value.
    #[must_use]
    pub fn initial(mut self, value: impl Into<Value>) -> Self {
        self.initial = Some(value.into());
        self
    }

    /// Sets the label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the help text.
    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = text.into();
        self
    }

    /// Replaces the widget.
    #[must_use]
    pub fn widget(mut self, widget: Widget) -> Self {
        self.widget = widget;
        self
    }

    /// Marks the field as localized.
    ///
    /// Localized numeric fields render as text inputs, since a browser
    /// number input rejects a decimal comma.
    #[must_use]
    pub fn localize(mut self, localize: bool) -> Self {
        self.localize = localize;
        if localize && self.widget == Widget::NumberInput {
            self.widget = Widget::TextInput;
        }
        self
    }

    /// Marks the field as disabled.
    #[must_use]
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

/// Converts a raw submitted value into a typed [`Value`].
///
/// Returns every error found for the field rather than stopping at the
/// first one.
pub fn clean_field_value(field: &FormFieldDef, raw: Option<&str>) -> Result<Value, Vec<String>> {
    let raw_str = raw.unwrap_or("");
    let is_empty = match field.field_type {
        FormFieldType::Char { strip: true, .. } => raw_str.trim().is_empty(),
        _ => raw_str.is_empty(),
    };

    if field.required && is_empty && field.field_type != FormFieldType::Boolean {
        return Err(vec!["This field is required.".to_string()]);
    }
    if is_empty && field.field_type != FormFieldType::Boolean {
        return Ok(Value::Null);
    }

    let mut errors = Vec::new();
    let value = match &field.field_type {
        FormFieldType::Char { max_length, strip } => {
            let s = if *strip { raw_str.trim() } else { raw_str };
            if let Some(max) = max_length {
                let len = s.chars().count();
                if len > *max {
                    errors.push(format!(
                        "Ensure this value has at most {max} characters (it has {len})."
                    ));
                }
            }
            Value::String(s.to_string())
        }

        FormFieldType::Text => Value::String(raw_str.to_string()),

        FormFieldType::Integer {
            min_value,
            max_value,
        } => match raw_str.trim().parse::<i64>() {
            Ok(n) => {
                if let Some(min) = min_value {
                    if n < *min {
                        errors.push(format!(
                            "Ensure this value is greater than or equal to {min}."
                        ));
                    }
                }
                if let Some(max) = max_value {
                    if n > *max {
                        errors.push(format!("Ensure this value is less than or equal to {max}."));
                    }
                }
                Value::Int(n)
            }
            Err(_) => {
                errors.push("Enter a whole number.".to_string());
                Value::Null
            }
        },

        FormFieldType::Float {
            min_value,
            max_value,
        } => {
            let normalized = if field.localize {
                raw_str.trim().replace(',', ".")
            } else {
                raw_str.trim().to_string()
            };
            match normalized.parse::<f64>() {
                Ok(n) => {
                    if let Some(min) = min_value {
                        if n < *min {
                            errors.push(format!(
                                "Ensure this value is greater than or equal to {min}."
                            ));
                        }
                    }
                    if let Some(max) = max_value {
                        if n > *max {
                            errors
                                .push(format!("Ensure this value is less than or equal to {max}."));
                        }
                    }
                    Value::Float(n)
                }
                Err(_) => {
                    errors.push("Enter a number.".to_string());
                    Value::Null
                }
            }
        }

        FormFieldType::Boolean => {
            let checked = is_truthy(raw_str);
            if field.required && !checked {
                errors.push("This field is required.".to_string());
            }
            Value::Bool(checked)
        }

        FormFieldType::Date => match chrono::NaiveDate::parse_from_str(raw_str.trim(), "%Y-%m-%d")
        {
            Ok(d) => Value::Date(d),
            Err(_) => {
                errors.push("Enter a valid date.".to_string());
                Value::Null
            }
        },

        FormFieldType::Email => {
            let email = raw_str.trim();
            if !EMAIL_RE.is_match(email) {
                errors.push("Enter a valid email address.".to_string());
            }
            Value::String(email.to_string())
        }

        FormFieldType::ModelChoice { .. } => match raw_str.trim().parse::<i64>() {
            Ok(pk) => Value::Int(pk),
            Err(_) => {
                errors.push(
                    "Select a valid choice. That choice is not one of the available choices."
                        .to_string(),
                );
                Value::Null
            }
        },
    };

    if errors.is_empty() {
        Ok(value)
    } else {
        Err(errors)
    }
}

/// Formats a value for a form input, honouring `localize`.
pub fn format_value(field: &FormFieldDef, value: &Value) -> String {
    match value {
        Value::Float(f) if field.localize => f.to_string().replace('.', ","),
        Value::Bool(true) => "on".to_string(),
        Value::Bool(false) => String::new(),
        other => other.to_form_string(),
    }
}

fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

/// Turns `field_name` into `Field name`.
pub fn pretty_name(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Escapes the HTML special characters in `s`.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}
