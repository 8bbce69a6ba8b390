//! Declarative field layouts.
//!
//! A field layout is a list of rows. Each row is either a single field name
//! (a one-column row) or a group of columns, and each column is a group of
//! field names stacked on top of each other:
//!
//! ```text
//! [
//!     "title",                          one column
//!     [["first_name"], ["last_name"]],  two columns
//!     [["street", "city"], ["zip"]],    two columns, the first one stacked
//! ]
//! ```
//!
//! The same spec produces the field list of a generated model form (see
//! [`get_flat_fields`]) and a grid [`Layout`] with one `row` div per row and
//! a `col-sm-*` div per column (see [`construct_form_layout`]).

use helpful_core::{HelpfulError, HelpfulResult};

use crate::layout::{Div, Layout};

/// The formset deletion checkbox. It may appear in a layout but is never a
/// model field.
pub const DELETE_FIELD: &str = "DELETE";

/// One entry of a field layout spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldLayout {
    /// A field name.
    Field(String),
    /// A nested group: a row of columns, or a column of fields.
    Group(Vec<FieldLayout>),
    /// A placeholder that contributes no field.
    Empty,
}

impl FieldLayout {
    /// Creates a field entry.
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    /// Creates a group entry.
    pub fn group<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Self>,
    {
        Self::Group(items.into_iter().map(Into::into).collect())
    }
}

impl From<&str> for FieldLayout {
    fn from(name: &str) -> Self {
        Self::Field(name.to_string())
    }
}

impl From<Option<&str>> for FieldLayout {
    fn from(name: Option<&str>) -> Self {
        name.map_or(Self::Empty, Self::from)
    }
}

/// Builds a `Vec<FieldLayout>` from nested literals.
///
/// String literals become fields, bracketed lists become groups and `None`
/// becomes [`FieldLayout::Empty`].
///
/// # Examples
///
/// ```
/// use helpful_forms::{field_layout, FieldLayout};
///
/// let spec = field_layout!["title", [["first_name"], ["last_name"]], None];
/// assert_eq!(spec.len(), 3);
/// assert_eq!(spec[0], FieldLayout::field("title"));
/// assert_eq!(spec[2], FieldLayout::Empty);
/// ```
#[macro_export]
macro_rules! field_layout {
    (@item [$($inner:tt),* $(,)?]) => {
        $crate::FieldLayout::Group(vec![$($crate::field_layout!(@item $inner)),*])
    };
    (@item None) => {
        $crate::FieldLayout::Empty
    };
    (@item $name:expr) => {
        $crate::FieldLayout::from($name)
    };
    ($($item:tt),* $(,)?) => {
        vec![$($crate::field_layout!(@item $item)),*]
    };
}

/// A column of field names.
pub type Column = Vec<String>;

/// A row of columns.
pub type Row = Vec<Column>;

/// Flattens a spec into field names in document order, skipping empty
/// entries.
pub fn flatten(items: &[FieldLayout]) -> Vec<String> {
    let mut out = Vec::new();
    flatten_into(items, &mut out);
    out
}

fn flatten_into(items: &[FieldLayout], out: &mut Vec<String>) {
    for item in items {
        match item {
            FieldLayout::Field(name) => out.push(name.clone()),
            FieldLayout::Group(children) => flatten_into(children, out),
            FieldLayout::Empty => {}
        }
    }
}

/// Returns the model field names a spec refers to, with the formset
/// `DELETE` checkbox removed. `None` in, `None` out.
pub fn get_flat_fields(spec: Option<&[FieldLayout]>) -> Option<Vec<String>> {
    spec.map(|spec| {
        flatten(spec)
            .into_iter()
            .filter(|name| name != DELETE_FIELD)
            .collect()
    })
}

/// Normalizes a spec into rows of columns.
///
/// A row given as a single field name becomes a one-column row. A row whose
/// first entry is a plain field name is rejected, since columns must be
/// groups. Empty rows are skipped. Column counts are not checked here.
pub fn normalize_rows(spec: &[FieldLayout]) -> HelpfulResult<Vec<Row>> {
    let mut rows = Vec::with_capacity(spec.len());
    for row in spec {
        match row {
            FieldLayout::Empty => {}
            FieldLayout::Field(name) => rows.push(vec![vec![name.clone()]]),
            FieldLayout::Group(columns) => {
                if matches!(columns.first(), Some(FieldLayout::Field(_))) {
                    return Err(HelpfulError::ImproperlyConfigured(format!(
                        "Rows should be lists of lists, not lists of strings: {:?}",
                        flatten(columns)
                    )));
                }
                rows.push(
                    columns
                        .iter()
                        .map(|column| match column {
                            FieldLayout::Field(name) => vec![name.clone()],
                            FieldLayout::Group(fields) => flatten(fields),
                            FieldLayout::Empty => Vec::new(),
                        })
                        .collect(),
                );
            }
        }
    }
    Ok(rows)
}

/// Returns the grid class for a row with `columns` columns.
pub const fn column_class(columns: usize) -> Option<&'static str> {
    match columns {
        1 => Some("col-sm-12"),
        2 => Some("col-sm-6"),
        3 => Some("col-sm-4"),
        _ => None,
    }
}

/// Builds the grid layout for a spec.
///
/// # Examples
///
/// ```
/// use helpful_forms::{construct_form_layout, field_layout};
///
/// let layout = construct_form_layout(&field_layout!["title", [["a"], ["b"]]]).unwrap();
/// let html = layout.render(|name| name.to_string());
/// assert_eq!(
///     html,
///     "<div class=\"row\"><div class=\"col-sm-12\">title</div></div>\
///      <div class=\"row\"><div class=\"col-sm-6\">a</div><div class=\"col-sm-6\">b</div></div>"
/// );
/// ```
pub fn construct_form_layout(spec: &[FieldLayout]) -> HelpfulResult<Layout> {
    let mut row_divs = Vec::new();
    for row in normalize_rows(spec)? {
        let col_class = match (row.len(), column_class(row.len())) {
            (_, Some(class)) => class,
            (0, None) => {
                return Err(HelpfulError::ImproperlyConfigured(
                    "Row is empty".to_string(),
                ))
            }
            (_, None) => {
                return Err(HelpfulError::ImproperlyConfigured(
                    "Row is too long".to_string(),
                ))
            }
        };
        let field_divs: Vec<Div> = row
            .into_iter()
            .map(|column| Div::new(column, col_class))
            .collect();
        row_divs.push(Div::new(field_divs, "row"));
    }
    Ok(Layout::new(row_divs))
}
