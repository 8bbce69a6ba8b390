//! Assertions over captured view responses.

use helpful_forms::FormErrors;
use helpful_http::TemplateContext;

use crate::webtest::TestResponse;

/// Checks that the form and formset in a rendered context validated.
///
/// Passes when the response rendered no template, or when neither context
/// entry is present. Otherwise the error text of the form and of every
/// formset form with errors is collected; a non-empty collection is the
/// `Err` value. An `errors` entry that is not a field-to-messages map counts
/// as errors when it is non-empty, and is reported as JSON.
///
/// # Examples
///
/// ```
/// use helpful_http::TemplateContext;
/// use helpful_test::check_form_has_no_errors;
///
/// let mut context = TemplateContext::new();
/// context.insert(
///     "form".to_string(),
///     serde_json::json!({"errors": {"title": ["This field is required."]}}),
/// );
/// let text = check_form_has_no_errors(Some(&context), "form", "formset").unwrap_err();
/// assert_eq!(
///     text,
///     "Form contains errors: \n* title\n  * This field is required.\n"
/// );
/// assert!(check_form_has_no_errors(None, "form", "formset").is_ok());
/// ```
pub fn check_form_has_no_errors(
    context: Option<&TemplateContext>,
    form_context_name: &str,
    formset_context_name: &str,
) -> Result<(), String> {
    let Some(context) = context else {
        return Ok(());
    };
    let form = present(context, form_context_name);
    let formset = present(context, formset_context_name);
    if form.is_none() && formset.is_none() {
        return Ok(());
    }

    let mut message = String::new();
    if let Some(errors) = form.and_then(errors_of) {
        message.push_str(&format!("Form contains errors: \n{errors}\n"));
    }
    if let Some(forms) = formset.and_then(|f| f.get("forms")).and_then(|f| f.as_array()) {
        for (i, errors) in forms.iter().enumerate().filter_map(|(i, f)| errors_of(f).map(|e| (i, e))) {
            message.push_str(&format!("Formset form #{i} contains errors: \n{errors}\n"));
        }
    }

    if message.is_empty() {
        Ok(())
    } else {
        Err(message)
    }
}

fn present<'a>(context: &'a TemplateContext, name: &str) -> Option<&'a serde_json::Value> {
    context.get(name).filter(|value| match value {
        serde_json::Value::Null => false,
        serde_json::Value::Object(map) => !map.is_empty(),
        _ => true,
    })
}

/// Returns the error text of one form context, if it has errors.
fn errors_of(form: &serde_json::Value) -> Option<String> {
    let errors = form.get("errors")?;
    match serde_json::from_value::<FormErrors>(errors.clone()) {
        Ok(errors) => (!errors.is_empty()).then(|| errors.as_text()),
        Err(e) => {
            let empty = match errors {
                serde_json::Value::Null => true,
                serde_json::Value::Array(items) => items.is_empty(),
                serde_json::Value::Object(map) => map.is_empty(),
                serde_json::Value::String(text) => text.is_empty(),
                serde_json::Value::Bool(_) | serde_json::Value::Number(_) => false,
            };
            if empty {
                return None;
            }
            tracing::debug!(error = %e, "Form errors are not a field map");
            Some(errors.to_string())
        }
    }
}

/// Fails unless the response's form and formset validated.
///
/// # Panics
///
/// Panics with the collected error text of [`check_form_has_no_errors`].
#[track_caller]
pub fn assert_form_has_no_errors(
    response: &TestResponse,
    form_context_name: &str,
    formset_context_name: &str,
) {
    if let Err(text) =
        check_form_has_no_errors(response.context(), form_context_name, formset_context_name)
    {
        panic!("{text}");
    }
}

/// Asserts that the body contains `text`.
///
/// # Panics
///
/// Panics if the body does not contain `text`.
#[track_caller]
pub fn assert_contains(response: &TestResponse, text: &str) {
    let body = response.text();
    assert!(
        body.contains(text),
        "Response body does not contain '{text}'.\nActual body: {body}"
    );
}

/// Asserts that the response redirects to `expected_url`.
///
/// # Panics
///
/// Panics if the status is not 3xx or the location differs.
#[track_caller]
pub fn assert_redirects(response: &TestResponse, expected_url: &str) {
    let status = response.status_code();
    assert!(
        (300..400).contains(&status),
        "Expected a redirect (3xx), got {status}"
    );
    assert_eq!(
        response.location(),
        Some(expected_url),
        "Expected redirect to '{expected_url}'"
    );
}

#[cfg(test)]
mod tests {
    use helpful_http::HttpResponse;
    use serde_json::json;

    use super::*;

    fn context(entries: serde_json::Value) -> TemplateContext {
        match entries {
            serde_json::Value::Object(map) => map,
            _ => TemplateContext::new(),
        }
    }

    #[test]
    fn test_absent_entries_pass() {
        let ctx = context(json!({"title": "x"}));
        assert!(check_form_has_no_errors(Some(&ctx), "form", "formset").is_ok());
        let ctx = context(json!({"form": null, "formset": {}}));
        assert!(check_form_has_no_errors(Some(&ctx), "form", "formset").is_ok());
    }

    #[test]
    fn test_valid_form_passes() {
        let ctx = context(json!({"form": {"errors": {}, "is_bound": true}}));
        assert!(check_form_has_no_errors(Some(&ctx), "form", "formset").is_ok());
    }

    #[test]
    fn test_formset_errors_are_numbered_from_zero() {
        let ctx = context(json!({
            "formset": {"forms": [
                {"errors": {}},
                {"errors": {"name": ["Too long."]}},
                {"errors": {"__all__": ["Duplicate."], "qty": ["Enter a whole number."]}},
            ]}
        }));
        let text = check_form_has_no_errors(Some(&ctx), "form", "formset").unwrap_err();
        assert_eq!(
            text,
            "Formset form #1 contains errors: \n* name\n  * Too long.\n\
             Formset form #2 contains errors: \n* __all__\n  * Duplicate.\n* qty\n  * Enter a whole number.\n"
        );
    }

    #[test]
    fn test_form_and_formset_accumulate() {
        let ctx = context(json!({
            "main": {"errors": {"title": ["Required."]}},
            "rows": {"forms": [{"errors": {"x": ["Bad."]}}]},
        }));
        let text = check_form_has_no_errors(Some(&ctx), "main", "rows").unwrap_err();
        assert!(text.starts_with("Form contains errors: \n* title\n  * Required.\n"));
        assert!(text.ends_with("Formset form #0 contains errors: \n* x\n  * Bad.\n"));
    }

    #[test]
    fn test_unexpected_error_shapes_still_fail() {
        let ctx = context(json!({"form": {"errors": ["Bad."]}}));
        let text = check_form_has_no_errors(Some(&ctx), "form", "formset").unwrap_err();
        assert_eq!(text, "Form contains errors: \n[\"Bad.\"]\n");

        let ctx = context(json!({"formset": {"forms": [{"errors": {"name": "Too long."}}]}}));
        let text = check_form_has_no_errors(Some(&ctx), "form", "formset").unwrap_err();
        assert!(text.starts_with("Formset form #0 contains errors: \n"));
        assert!(text.contains("Too long."));

        let ctx = context(json!({"form": {"errors": []}, "formset": {"forms": [{"errors": null}]}}));
        assert!(check_form_has_no_errors(Some(&ctx), "form", "formset").is_ok());
    }

    #[test]
    #[should_panic(expected = "Form contains errors")]
    fn test_assert_panics_with_text() {
        let ctx = context(json!({"form": {"errors": {"title": ["Required."]}}}));
        let response = TestResponse::new(HttpResponse::rendered(
            String::new(),
            vec!["t.html".to_string()],
            ctx,
        ));
        assert_form_has_no_errors(&response, "form", "formset");
    }

    #[test]
    fn test_response_without_context_passes() {
        let response = TestResponse::new(HttpResponse::ok("plain"));
        assert_form_has_no_errors(&response, "form", "formset");
        assert_contains(&response, "plain");
    }
}
