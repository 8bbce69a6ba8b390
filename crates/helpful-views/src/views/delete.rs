//! Cascade-aware delete confirmation.

use async_trait::async_trait;

use helpful_core::{HelpfulError, HelpfulResult};
use helpful_db::{Instance, NestedObject, NestedObjects};
use helpful_http::{
    HttpRequest, HttpResponse, HttpResponseForbidden, HttpResponseRedirect, TemplateContext,
};

use super::class_based::{
    error_response, render_template_response, ContextMixin, TemplateResponseMixin, View,
};
use super::generic::interpolate_url;
use crate::mixins::SingleObjectMixin;

/// Formats an object as `<verbose_name> "<display>"`.
pub fn format_object(object: &Instance) -> String {
    format!("{} \"{object}\"", object.meta().verbose_name)
}

/// Deletes an object and everything that cascades from it.
///
/// GET renders a confirmation page listing the dependents that will go
/// with the object. POST deletes, unless [`DeleteView::can_delete`] says no
/// or a dependent is protected; both answer 403 and leave the store alone.
/// A successful delete records a success message and redirects.
///
/// Context: `object`, `<model_name>`, `object_name`, `nested_objects`,
/// `protected_objects`, `can_delete` and `model_verbose_name`.
#[async_trait]
pub trait DeleteView: View + ContextMixin + TemplateResponseMixin + SingleObjectMixin {
    /// Where to go after deleting. `{pk}`, `{id}` and `{<field>}` are
    /// replaced with the deleted object's values.
    fn success_url(&self) -> Option<&str> {
        None
    }

    /// Per-object permission hook, consulted before the dependents are.
    fn can_delete(&self, _object: &Instance) -> bool {
        true
    }

    /// Resolves the redirect target.
    fn get_success_url(&self, object: &Instance) -> HelpfulResult<String> {
        self.success_url()
            .map(|url| interpolate_url(url, object))
            .ok_or_else(|| {
                HelpfulError::ImproperlyConfigured(
                    "No URL to redirect to. Provide a success_url.".to_string(),
                )
            })
    }

    /// The confirmation templates, followed by the configured fallback.
    fn get_delete_template_names(&self) -> HelpfulResult<Vec<String>> {
        let mut names = self.get_template_names("_confirm_delete")?;
        names.push(self.services().settings.delete_confirm_fallback_template.clone());
        Ok(names)
    }

    /// Returns the dependent tree and the formatted protected objects.
    async fn get_nested_objects(
        &self,
        object: &Instance,
    ) -> HelpfulResult<(Vec<NestedObject>, Vec<String>)> {
        let mut collector = NestedObjects::new(self.services().store.as_ref());
        collector.collect(vec![object.clone()]).await?;
        let protected = collector.protected().iter().map(format_object).collect();
        Ok((collector.nested(format_object), protected))
    }

    /// Builds the confirmation context.
    async fn get_delete_context(&self, object: &Instance) -> HelpfulResult<TemplateContext> {
        let (nested, protected) = self.get_nested_objects(object).await?;
        let mut context = TemplateContext::new();
        let json = object.to_json();
        context.insert(object.meta().model_name.to_string(), json.clone());
        context.insert("object".to_string(), json);
        context.insert("object_name".to_string(), format_object(object).into());
        context.insert("nested_objects".to_string(), serde_json::to_value(nested)?);
        context.insert("protected_objects".to_string(), protected.into());
        context.insert("can_delete".to_string(), self.can_delete(object).into());
        if let Some(model) = self.model() {
            context.insert(
                "model_verbose_name".to_string(),
                model.verbose_name.clone().into(),
            );
        }
        Ok(self.get_context_data(context))
    }

    /// Renders the confirmation page.
    async fn render_confirmation(&self, request: &HttpRequest) -> HelpfulResult<HttpResponse> {
        let object = self.get_object(request).await?;
        let context = self.get_delete_context(&object).await?;
        let names = self.get_delete_template_names()?;
        Ok(render_template_response(self.services(), names, context))
    }

    /// Handles GET.
    async fn confirm_delete(&self, request: HttpRequest) -> HttpResponse {
        self.render_confirmation(&request)
            .await
            .unwrap_or_else(|e| error_response(&e))
    }

    /// Deletes the object and its cascade, or refuses.
    async fn process_delete(&self, request: &HttpRequest) -> HelpfulResult<HttpResponse> {
        let object = self.get_object(request).await?;
        if !self.can_delete(&object) {
            tracing::warn!(object = %format_object(&object), "Delete refused by can_delete");
            return Ok(HttpResponseForbidden::new());
        }

        let mut collector = NestedObjects::new(self.services().store.as_ref());
        collector.collect(vec![object.clone()]).await?;
        if !collector.can_delete() {
            let protected: Vec<String> = collector.protected().iter().map(format_object).collect();
            tracing::warn!(
                object = %format_object(&object),
                ?protected,
                "Delete blocked by protected related objects"
            );
            return Ok(HttpResponseForbidden::new());
        }

        let success_url = self.get_success_url(&object)?;
        let deleted = collector.delete().await?;
        tracing::info!(object = %format_object(&object), deleted, "Object deleted");
        request
            .messages()
            .success(format!("{} was deleted successfuly.", format_object(&object)));
        Ok(HttpResponseRedirect::new(&success_url))
    }

    /// Handles POST (and DELETE, if the view routes it here).
    async fn delete_object(&self, request: HttpRequest) -> HttpResponse {
        self.process_delete(&request)
            .await
            .unwrap_or_else(|e| error_response(&e))
    }
}
