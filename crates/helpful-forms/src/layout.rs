//! Form layouts and the form helper.
//!
//! A [`Layout`] is a tree of [`LayoutObject`]s: field references and
//! [`Div`]s carrying a CSS class. A [`FormHelper`] attaches a layout to a
//! form or formset together with rendering flags. Rendering walks the tree
//! and asks the caller for each field's HTML.

use serde::Serialize;

use crate::fields::escape_html;

/// One node of a layout tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayoutObject {
    /// A reference to a form field by name.
    Field {
        /// The field name.
        name: String,
    },
    /// A `<div>` wrapping other layout objects.
    Div(Div),
}

impl From<&str> for LayoutObject {
    fn from(name: &str) -> Self {
        Self::Field {
            name: name.to_string(),
        }
    }
}

impl From<String> for LayoutObject {
    fn from(name: String) -> Self {
        Self::Field { name }
    }
}

impl From<Div> for LayoutObject {
    fn from(div: Div) -> Self {
        Self::Div(div)
    }
}

/// A `<div>` with a CSS class around a list of layout objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Div {
    /// The CSS class.
    pub css_class: String,
    /// The wrapped objects.
    pub fields: Vec<LayoutObject>,
}

impl Div {
    /// Creates a div with the given children and CSS class.
    pub fn new<I, T>(fields: I, css_class: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<LayoutObject>,
    {
        Self {
            css_class: css_class.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

/// The root of a layout tree.
///
/// # Examples
///
/// ```
/// use helpful_forms::layout::{Div, Layout};
///
/// let layout = Layout::new([Div::new(
///     [Div::new(["title"], "col-sm-12")],
///     "row",
/// )]);
/// assert_eq!(layout.field_names(), vec!["title"]);
/// let html = layout.render(|name| format!("<input name=\"{name}\">"));
/// assert_eq!(
///     html,
///     "<div class=\"row\"><div class=\"col-sm-12\"><input name=\"title\"></div></div>"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Layout {
    /// The top-level objects.
    pub fields: Vec<LayoutObject>,
}

impl Layout {
    /// Creates a layout from top-level objects.
    pub fn new<I, T>(fields: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<LayoutObject>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the referenced field names in document order.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        collect_names(&self.fields, &mut names);
        names
    }

    /// Renders the layout, delegating each field to `render_field`.
    pub fn render<F>(&self, render_field: F) -> String
    where
        F: Fn(&str) -> String,
    {
        let mut out = String::new();
        render_objects(&self.fields, &render_field, &mut out);
        out
    }
}

fn collect_names<'a>(objects: &'a [LayoutObject], names: &mut Vec<&'a str>) {
    for object in objects {
        match object {
            LayoutObject::Field { name } => names.push(name),
            LayoutObject::Div(div) => collect_names(&div.fields, names),
        }
    }
}

fn render_objects<F>(objects: &[LayoutObject], render_field: &F, out: &mut String)
where
    F: Fn(&str) -> String,
{
    for object in objects {
        match object {
            LayoutObject::Field { name } => out.push_str(&render_field(name)),
            LayoutObject::Div(div) => {
                out.push_str(&format!("<div class=\"{}\">", escape_html(&div.css_class)));
                render_objects(&div.fields, render_field, out);
                out.push_str("</div>");
            }
        }
    }
}

/// Rendering configuration attached to a form or formset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormHelper {
    /// The layout, if any. Without one, fields render in form order.
    pub layout: Option<Layout>,
    /// Whether the renderer emits the surrounding `<form>` tag.
    pub form_tag: bool,
    /// Whether hidden fields are rendered even when the layout omits them.
    pub render_hidden_fields: bool,
}

impl Default for FormHelper {
    fn default() -> Self {
        Self {
            layout: None,
            form_tag: true,
            render_hidden_fields: false,
        }
    }
}

impl FormHelper {
    /// Creates a helper with the default flags.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the layout.
    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Sets whether the `<form>` tag is rendered.
    #[must_use]
    pub fn with_form_tag(mut self, form_tag: bool) -> Self {
        self.form_tag = form_tag;
        self
    }

    /// Sets whether hidden fields are always rendered.
    #[must_use]
    pub fn with_render_hidden_fields(mut self, render: bool) -> Self {
        self.render_hidden_fields = render;
        self
    }
}
