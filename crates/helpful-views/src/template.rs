//! Template rendering.
//!
//! Views render through the [`TemplateRenderer`] trait. [`TeraRenderer`] is
//! the stock implementation; it ships the delete confirmation fallback
//! template so a delete view renders even when the project defines no
//! model-specific one.

use helpful_core::{HelpfulError, HelpfulResult};
use helpful_http::TemplateContext;

/// Name of the built-in delete confirmation template.
pub const BASE_CONFIRM_DELETE: &str = "helpful/base_confirm_delete.html";

const MACROS: &str = "helpful/macros.html";

const MACROS_SOURCE: &str = r#"{% macro tree(items) %}<ul>{% for item in items %}<li>{{ item.label }}{% if item.children %}{{ self::tree(items=item.children) }}{% endif %}</li>{% endfor %}</ul>{% endmacro tree %}"#;

const BASE_CONFIRM_DELETE_SOURCE: &str = r#"{% import "helpful/macros.html" as helpful %}<h1>Delete {{ model_verbose_name }}</h1>
{% if protected_objects %}<p>Deleting {{ object_name }} would require deleting the following protected related objects:</p>
<ul>{% for obj in protected_objects %}<li>{{ obj }}</li>{% endfor %}</ul>
{% elif can_delete %}<p>Are you sure you want to delete {{ object_name }}? All of the following related items will be deleted:</p>
{{ helpful::tree(items=nested_objects) }}
<form method="post"><input type="submit" value="Yes, I'm sure"></form>
{% else %}<p>{{ object_name }} cannot be deleted.</p>
{% endif %}"#;

/// Renders the first available template of a candidate list.
pub trait TemplateRenderer: Send + Sync {
    /// Returns `true` if a template with this name is registered.
    fn has_template(&self, name: &str) -> bool;

    /// Renders a single named template.
    fn render_template(&self, name: &str, context: &TemplateContext) -> HelpfulResult<String>;

    /// Renders the first of `names` that exists.
    fn render(&self, names: &[String], context: &TemplateContext) -> HelpfulResult<String> {
        let name = names
            .iter()
            .find(|name| self.has_template(name))
            .ok_or_else(|| HelpfulError::TemplateError(names.join(", ")))?;
        self.render_template(name, context)
    }
}

/// A [`TemplateRenderer`] backed by [`tera`].
///
/// # Examples
///
/// ```
/// use helpful_http::TemplateContext;
/// use helpful_views::template::{TemplateRenderer, TeraRenderer};
///
/// let mut renderer = TeraRenderer::new();
/// renderer.add_raw_template("hello.html", "Hello {{ name }}!").unwrap();
///
/// let mut context = TemplateContext::new();
/// context.insert("name".to_string(), "world".into());
/// let html = renderer
///     .render(&["missing.html".to_string(), "hello.html".to_string()], &context)
///     .unwrap();
/// assert_eq!(html, "Hello world!");
/// ```
#[derive(Debug)]
pub struct TeraRenderer {
    tera: tera::Tera,
}

impl Default for TeraRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TeraRenderer {
    /// Creates a renderer holding only the built-in templates.
    pub fn new() -> Self {
        let mut tera = tera::Tera::default();
        if let Err(e) = tera.add_raw_templates(vec![
            (MACROS, MACROS_SOURCE),
            (BASE_CONFIRM_DELETE, BASE_CONFIRM_DELETE_SOURCE),
        ]) {
            tracing::error!(error = %e, "Built-in templates failed to parse");
        }
        Self { tera }
    }

    /// Loads the templates matching `glob` on top of the built-in ones.
    pub fn from_glob(glob: &str) -> HelpfulResult<Self> {
        let loaded = tera::Tera::new(glob).map_err(template_error)?;
        let mut renderer = Self::new();
        renderer.tera.extend(&loaded).map_err(template_error)?;
        renderer.tera.build_inheritance_chains().map_err(template_error)?;
        Ok(renderer)
    }

    /// Registers a template from a string.
    pub fn add_raw_template(&mut self, name: &str, content: &str) -> HelpfulResult<()> {
        self.tera
            .add_raw_template(name, content)
            .map_err(template_error)
    }
}

impl TemplateRenderer for TeraRenderer {
    fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    fn render_template(&self, name: &str, context: &TemplateContext) -> HelpfulResult<String> {
        let context = tera::Context::from_serialize(context).map_err(template_error)?;
        self.tera.render(name, &context).map_err(template_error)
    }
}

fn template_error(e: tera::Error) -> HelpfulError {
    let mut message = e.to_string();
    let mut source = std::error::Error::source(&e);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    HelpfulError::TemplateError(message)
}
