//! Formsets: a list of forms sharing a prefix.
//!
//! Form `i` of a formset with prefix `book` uses the prefix `book-i`. The
//! management data (`book-TOTAL_FORMS`, `book-INITIAL_FORMS`) tells a bound
//! formset how many forms were submitted.

use std::collections::BTreeMap;

use helpful_core::HelpfulResult;
use helpful_db::{Instance, ObjectStore};
use helpful_http::QueryDict;

use crate::errors::FormErrors;
use crate::form::{Form, FormClass, FormKwargs};
use crate::layout::FormHelper;

/// Suffix of the management field holding the number of forms.
pub const TOTAL_FORM_COUNT: &str = "TOTAL_FORMS";
/// Suffix of the management field holding the number of existing objects.
pub const INITIAL_FORM_COUNT: &str = "INITIAL_FORMS";
/// Largest number of forms a formset builds, whatever the management data says.
pub const DEFAULT_ABSOLUTE_MAX: usize = 1000;

/// A list of forms rendered and validated together.
pub struct FormSet {
    prefix: String,
    forms: Vec<Box<dyn Form>>,
    initial_count: usize,
    bound: bool,
    helper: Option<FormHelper>,
    non_form_errors: Vec<String>,
}

impl std::fmt::Debug for FormSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormSet")
            .field("prefix", &self.prefix)
            .field("forms", &self.forms.len())
            .field("bound", &self.bound)
            .finish_non_exhaustive()
    }
}

impl FormSet {
    /// Builds a formset from `class`.
    ///
    /// Unbound formsets get one form per instance plus `extra` blank ones.
    /// Bound formsets read the form count from the management data; when it
    /// is missing, the formset gets a non-form error and no forms. At most
    /// [`DEFAULT_ABSOLUTE_MAX`] forms are built.
    pub fn new(
        class: &dyn FormClass,
        prefix: impl Into<String>,
        data: Option<&QueryDict>,
        instances: Vec<Instance>,
        extra: usize,
    ) -> Self {
        Self::with_absolute_max(class, prefix, data, instances, extra, DEFAULT_ABSOLUTE_MAX)
    }

    /// Like [`FormSet::new`] with a custom cap on the number of forms.
    ///
    /// A submitted count above `absolute_max` is cut down to it and adds a
    /// non-form error, so the formset does not validate.
    pub fn with_absolute_max(
        class: &dyn FormClass,
        prefix: impl Into<String>,
        data: Option<&QueryDict>,
        instances: Vec<Instance>,
        extra: usize,
        absolute_max: usize,
    ) -> Self {
        let prefix = prefix.into();
        let initial_count = instances.len();
        let mut non_form_errors = Vec::new();
        let total = match data {
            None => (initial_count + extra).min(absolute_max),
            Some(data) => {
                match data
                    .get(&format!("{prefix}-{TOTAL_FORM_COUNT}"))
                    .and_then(|n| n.parse::<usize>().ok())
                {
                    Some(total) if total > absolute_max => {
                        tracing::warn!(
                            prefix = %prefix,
                            total,
                            absolute_max,
                            "Formset count over the limit"
                        );
                        non_form_errors
                            .push(format!("Please submit at most {absolute_max} forms."));
                        absolute_max
                    }
                    Some(total) => total,
                    None => {
                        non_form_errors.push(
                            "ManagementForm data is missing or has been tampered with".to_string(),
                        );
                        0
                    }
                }
            }
        };

        let mut instances = instances.into_iter();
        let forms = (0..total)
            .map(|i| {
                let mut kwargs = FormKwargs::new()
                    .prefix(format!("{prefix}-{i}"))
                    .data(data.cloned());
                if let Some(instance) = instances.next() {
                    kwargs = kwargs.instance(instance);
                }
                class.construct(kwargs)
            })
            .collect();

        Self {
            prefix,
            forms,
            initial_count,
            bound: data.is_some(),
            helper: None,
            non_form_errors,
        }
    }

    /// Returns the prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns `true` if the formset was built with submitted data.
    pub const fn is_bound(&self) -> bool {
        self.bound
    }

    /// Returns the forms.
    pub fn forms(&self) -> &[Box<dyn Form>] {
        &self.forms
    }

    /// Returns the forms mutably.
    pub fn forms_mut(&mut self) -> &mut [Box<dyn Form>] {
        &mut self.forms
    }

    /// Returns the helper, if any.
    pub const fn helper(&self) -> Option<&FormHelper> {
        self.helper.as_ref()
    }

    /// Attaches a helper.
    pub fn set_helper(&mut self, helper: FormHelper) {
        self.helper = Some(helper);
    }

    /// Validates every form. Unbound formsets are invalid.
    pub async fn is_valid(&mut self) -> bool {
        if !self.bound {
            return false;
        }
        let mut valid = self.non_form_errors.is_empty();
        for form in &mut self.forms {
            valid &= form.is_valid().await;
        }
        valid
    }

    /// Returns the error map of each form, in form order.
    pub fn errors(&self) -> Vec<&FormErrors> {
        self.forms.iter().map(|form| form.errors()).collect()
    }

    /// Returns the errors not tied to a single form.
    pub fn non_form_errors(&self) -> &[String] {
        &self.non_form_errors
    }

    /// Returns the number of messages across all forms plus non-form errors.
    pub fn total_error_count(&self) -> usize {
        self.non_form_errors.len()
            + self
                .forms
                .iter()
                .flat_map(|form| form.errors().iter())
                .map(|(_, messages)| messages.len())
                .sum::<usize>()
    }

    /// Returns the management data to render as hidden inputs.
    pub fn management_form(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (
                format!("{}-{TOTAL_FORM_COUNT}", self.prefix),
                self.forms.len().to_string(),
            ),
            (
                format!("{}-{INITIAL_FORM_COUNT}", self.prefix),
                self.initial_count.to_string(),
            ),
        ])
    }

    /// Saves every bound form. Call after [`FormSet::is_valid`].
    pub async fn save(&mut self, store: &dyn ObjectStore) -> HelpfulResult<Vec<Instance>> {
        let mut saved = Vec::with_capacity(self.forms.len());
        for form in &mut self.forms {
            saved.push(form.save(store).await?);
        }
        Ok(saved)
    }

    /// Serializes the formset for a template context.
    pub fn as_context(&self) -> serde_json::Value {
        let mut management_html = String::new();
        for (name, value) in self.management_form() {
            management_html.push_str(&format!(
                "<input type=\"hidden\" name=\"{name}\" id=\"id_{name}\" value=\"{value}\">"
            ));
        }
        serde_json::json!({
            "prefix": self.prefix,
            "is_bound": self.bound,
            "forms": self.forms.iter().map(|form| form.as_context()).collect::<Vec<_>>(),
            "errors": self.errors(),
            "non_form_errors": self.non_form_errors,
            "management_form": self.management_form(),
            "management_form_html": management_html,
            "helper": self.helper,
        })
    }
}
