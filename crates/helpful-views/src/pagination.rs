//! Pagination for list views.
//!
//! [`Paginator`] splits a list into pages of `per_page` items; [`Page`] is
//! one of them. Both serialize to the `paginator` / `page_obj` entries of a
//! list view's context.
//!
//! # Examples
//!
//! ```
//! use helpful_views::pagination::Paginator;
//!
//! let items: Vec<i32> = (1..=25).collect();
//! let paginator = Paginator::new(items, 10);
//! assert_eq!(paginator.num_pages(), 3);
//!
//! let page = paginator.page(3).unwrap();
//! assert_eq!(page.object_list(), &[21, 22, 23, 24, 25]);
//! assert!(!page.has_next());
//! assert_eq!(page.start_index(), 21);
//! ```

use std::fmt;

use helpful_core::HelpfulError;

/// Errors raised when selecting a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationError {
    /// The page number is past the last page.
    EmptyPage,
    /// The page parameter is not an integer.
    PageNotAnInteger,
    /// The page number is below 1.
    InvalidPage(String),
}

impl fmt::Display for PaginationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPage => write!(f, "That page contains no results"),
            Self::PageNotAnInteger => write!(f, "That page number is not an integer"),
            Self::InvalidPage(msg) => write!(f, "Invalid page: {msg}"),
        }
    }
}

impl std::error::Error for PaginationError {}

impl From<PaginationError> for HelpfulError {
    fn from(err: PaginationError) -> Self {
        Self::NotFound(format!("Invalid page ({err})"))
    }
}

/// Splits a list of objects into pages.
#[derive(Debug, Clone)]
pub struct Paginator<T> {
    object_list: Vec<T>,
    per_page: usize,
    allow_empty_first_page: bool,
}

impl<T: Clone> Paginator<T> {
    /// Creates a paginator. A `per_page` of 0 is treated as 1.
    pub fn new(object_list: Vec<T>, per_page: usize) -> Self {
        Self {
            object_list,
            per_page: per_page.max(1),
            allow_empty_first_page: true,
        }
    }

    /// Sets whether an empty list still has one (empty) page.
    #[must_use]
    pub fn allow_empty_first_page(mut self, allow: bool) -> Self {
        self.allow_empty_first_page = allow;
        self
    }

    /// Returns the total number of objects.
    pub fn count(&self) -> usize {
        self.object_list.len()
    }

    /// Returns the page size.
    pub const fn per_page(&self) -> usize {
        self.per_page
    }

    /// Returns the number of pages.
    pub fn num_pages(&self) -> usize {
        let count = self.count();
        if count == 0 {
            return usize::from(self.allow_empty_first_page);
        }
        count.div_ceil(self.per_page)
    }

    /// Parses a page parameter. `"last"` selects the last page.
    pub fn validate_number(&self, raw: &str) -> Result<usize, PaginationError> {
        if raw == "last" {
            return Ok(self.num_pages().max(1));
        }
        let number: i64 = raw
            .trim()
            .parse()
            .map_err(|_| PaginationError::PageNotAnInteger)?;
        if number < 1 {
            return Err(PaginationError::InvalidPage(
                "That page number is less than 1".to_string(),
            ));
        }
        usize::try_from(number).map_err(|_| PaginationError::EmptyPage)
    }

    /// Returns page `number` (1-based).
    pub fn page(&self, number: usize) -> Result<Page<T>, PaginationError> {
        if number == 0 {
            return Err(PaginationError::InvalidPage(
                "That page number is less than 1".to_string(),
            ));
        }
        let num_pages = self.num_pages();
        if number > num_pages {
            if number == 1 && self.allow_empty_first_page {
                return Ok(Page {
                    object_list: Vec::new(),
                    number,
                    num_pages,
                    count: 0,
                    per_page: self.per_page,
                });
            }
            return Err(PaginationError::EmptyPage);
        }

        let start = (number - 1) * self.per_page;
        let end = (start + self.per_page).min(self.count());
        Ok(Page {
            object_list: self.object_list[start..end].to_vec(),
            number,
            num_pages,
            count: self.count(),
            per_page: self.per_page,
        })
    }

    /// Serializes the paginator for a template context.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "count": self.count(),
            "num_pages": self.num_pages(),
            "per_page": self.per_page,
            "page_range": (1..=self.num_pages()).collect::<Vec<_>>(),
        })
    }
}

/// One page of a [`Paginator`].
#[derive(Debug, Clone)]
pub struct Page<T> {
    object_list: Vec<T>,
    number: usize,
    num_pages: usize,
    count: usize,
    per_page: usize,
}

impl<T: Clone> Page<T> {
    /// Returns the items on this page.
    pub fn object_list(&self) -> &[T] {
        &self.object_list
    }

    /// Consumes the page, returning its items.
    pub fn into_object_list(self) -> Vec<T> {
        self.object_list
    }

    /// Returns the 1-based page number.
    pub const fn number(&self) -> usize {
        self.number
    }

    /// Returns `true` if a next page exists.
    pub const fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    /// Returns `true` if a previous page exists.
    pub const fn has_previous(&self) -> bool {
        self.number > 1
    }

    /// Returns `true` if there is more than one page.
    pub const fn has_other_pages(&self) -> bool {
        self.has_next() || self.has_previous()
    }

    /// Returns the next page number, if any.
    pub const fn next_page_number(&self) -> Option<usize> {
        if self.has_next() {
            Some(self.number + 1)
        } else {
            None
        }
    }

    /// Returns the previous page number, if any.
    pub const fn previous_page_number(&self) -> Option<usize> {
        if self.has_previous() {
            Some(self.number - 1)
        } else {
            None
        }
    }

    /// Returns the 1-based index of the first item, 0 for an empty list.
    pub const fn start_index(&self) -> usize {
        if self.count == 0 {
            0
        } else {
            (self.number - 1) * self.per_page + 1
        }
    }

    /// Returns the 1-based index of the last item.
    pub const fn end_index(&self) -> usize {
        if self.number == self.num_pages {
            self.count
        } else {
            self.number * self.per_page
        }
    }

    /// Serializes the page metadata for a template context.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "number": self.number,
            "has_next": self.has_next(),
            "has_previous": self.has_previous(),
            "has_other_pages": self.has_other_pages(),
            "next_page_number": self.next_page_number(),
            "previous_page_number": self.previous_page_number(),
            "start_index": self.start_index(),
            "end_index": self.end_index(),
        })
    }
}
