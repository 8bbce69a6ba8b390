//! Settings for the view layer.
//!
//! [`Settings`] holds the knobs the mixins read at request time: query
//! parameter names, default page size, the delete-confirmation fallback
//! template and the model-form base. Every field has a default, so a TOML
//! file only needs to list what it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::HelpfulError;

/// The form base used for auto-generated model forms.
///
/// This is a static choice rather than a runtime check for an optional
/// enhanced form class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelFormBase {
    /// Plain model forms.
    #[default]
    Plain,
    /// Model forms whose relation fields render as autocomplete widgets.
    Autocomplete,
}

/// View-layer settings.
///
/// # Examples
///
/// ```
/// use helpful_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert_eq!(settings.paginate_by, 10);
/// assert_eq!(settings.popup_var, "_popup");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Whether debug mode is enabled. Controls the log format.
    pub debug: bool,
    /// The log filter (e.g. "info", "helpful_views=debug").
    pub log_level: String,
    /// Default page size for list views.
    pub paginate_by: usize,
    /// Query parameter that marks a popup create request.
    pub popup_var: String,
    /// Query parameter carrying the list search query.
    pub search_var: String,
    /// Query parameter carrying the list sort field.
    pub order_var: String,
    /// Query parameter carrying the sort direction (`asc` / `desc`).
    pub order_type_var: String,
    /// Query parameter carrying the page number.
    pub page_var: String,
    /// Template tried after the model-specific delete confirmation template.
    pub delete_confirm_fallback_template: String,
    /// Base used for generated model forms.
    pub model_form_base: ModelFormBase,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),
            paginate_by: 10,
            popup_var: "_popup".to_string(),
            search_var: "q".to_string(),
            order_var: "o".to_string(),
            order_type_var: "ot".to_string(),
            page_var: "page".to_string(),
            delete_confirm_fallback_template: "helpful/base_confirm_delete.html".to_string(),
            model_form_base: ModelFormBase::Plain,
        }
    }
}

impl Settings {
    /// Loads settings from a TOML string. Missing keys keep their defaults.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, HelpfulError> {
        toml::from_str(toml_str).map_err(|e| {
            HelpfulError::ImproperlyConfigured(format!("Failed to parse settings TOML: {e}"))
        })
    }

    /// Loads settings from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, HelpfulError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.debug);
        assert_eq!(settings.search_var, "q");
        assert_eq!(settings.order_var, "o");
        assert_eq!(settings.order_type_var, "ot");
        assert_eq!(settings.page_var, "page");
        assert_eq!(settings.model_form_base, ModelFormBase::Plain);
    }

    #[test]
    fn test_from_toml_partial() {
        let settings = Settings::from_toml_str(
            r#"
            debug = false
            paginate_by = 25
            model_form_base = "autocomplete"
            "#,
        )
        .unwrap();
        assert!(!settings.debug);
        assert_eq!(settings.paginate_by, 25);
        assert_eq!(settings.model_form_base, ModelFormBase::Autocomplete);
        assert_eq!(settings.popup_var, "_popup");
    }

    #[test]
    fn test_from_toml_invalid() {
        let err = Settings::from_toml_str("paginate_by = \"many\"").unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_from_missing_file() {
        let err = Settings::from_file("/nonexistent/helpful.toml").unwrap_err();
        assert!(matches!(err, HelpfulError::Io(_)));
    }
}
