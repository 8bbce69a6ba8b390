//! Per-field form errors.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The key under which form-level (non-field) errors are stored.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Validation errors of one form, keyed by field name.
///
/// Serializes as a plain `{field: [messages]}` object, which is also the
/// shape it takes inside a template context.
///
/// # Examples
///
/// ```
/// use helpful_forms::FormErrors;
///
/// let mut errors = FormErrors::new();
/// errors.add("title", "This field is required.");
/// assert_eq!(errors.as_text(), "* title\n  * This field is required.");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    /// Creates an empty error map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an error message to `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    /// Appends several messages to `field`.
    pub fn extend(&mut self, field: &str, messages: impl IntoIterator<Item = String>) {
        self.0.entry(field.to_string()).or_default().extend(messages);
    }

    /// Returns the messages for `field`.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Returns `true` if `field` has errors.
    pub fn contains_key(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Returns the form-level errors.
    pub fn non_field_errors(&self) -> &[String] {
        self.get(NON_FIELD_ERRORS).unwrap_or_default()
    }

    /// Returns `true` if there are no errors.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of fields with errors.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Removes every error.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Iterates over `(field, messages)` pairs in field-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    /// Renders the errors as a plain-text bullet list.
    pub fn as_text(&self) -> String {
        self.0
            .iter()
            .map(|(field, messages)| {
                let items: Vec<String> = messages.iter().map(|m| format!("  * {m}")).collect();
                format!("* {field}\n{}", items.join("\n"))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_text_multiple_fields() {
        let mut errors = FormErrors::new();
        errors.add("title", "This field is required.");
        errors.add("pages", "Enter a whole number.");
        errors.add("pages", "Ensure this value is greater than or equal to 1.");
        assert_eq!(
            errors.as_text(),
            "* pages\n  * Enter a whole number.\n  * Ensure this value is greater than or equal to 1.\n\
             * title\n  * This field is required."
        );
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_empty() {
        let errors = FormErrors::new();
        assert!(errors.is_empty());
        assert_eq!(errors.as_text(), "");
        assert!(errors.non_field_errors().is_empty());
    }

    #[test]
    fn test_serde_shape() {
        let mut errors = FormErrors::new();
        errors.add(NON_FIELD_ERRORS, "Titles must differ.");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({"__all__": ["Titles must differ."]}));
        let back: FormErrors = serde_json::from_value(json).unwrap();
        assert_eq!(back.non_field_errors(), ["Titles must differ."]);
    }
}
