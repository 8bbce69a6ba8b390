//! Error types for django-helpful.
//!
//! [`HelpfulError`] covers the failure categories the view mixins can hit:
//! misconfigured views, refused deletes, missing objects, storage failures
//! and template failures. Each variant maps to an HTTP status code via
//! [`HelpfulError::status_code`].

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// A validation error with optional field-level errors.
///
/// # Examples
///
/// ```
/// use helpful_core::error::ValidationError;
///
/// let err = ValidationError::new("This field is required.", "required");
/// assert_eq!(err.to_string(), "This field is required.");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The primary error message.
    pub message: String,
    /// A short code identifying the failure (e.g. "required", "invalid").
    pub code: String,
    /// Per-field errors, keyed by field name.
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl ValidationError {
    /// Creates a new `ValidationError` with a message and code.
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            field_errors: BTreeMap::new(),
        }
    }

    /// Creates a `ValidationError` containing per-field errors.
    pub fn with_field_errors(field_errors: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            message: String::new(),
            code: "invalid".to_string(),
            field_errors,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.message.is_empty() {
            return write!(f, "{}", self.message);
        }
        let mut first = true;
        for (field, errors) in &self.field_errors {
            for error in errors {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {error}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// The primary error type for django-helpful.
#[derive(Error, Debug)]
pub enum HelpfulError {
    /// The view class is misconfigured (missing model, malformed layout,
    /// no derivable success URL, ...). These are developer errors.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    /// HTTP 403. Raised when a delete is refused.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// HTTP 404.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A lookup expected exactly one object but found none.
    #[error("Object does not exist: {0}")]
    DoesNotExist(String),

    /// A storage-level failure.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// One or more fields failed validation.
    #[error("Validation error: {0}")]
    ValidationError(ValidationError),

    /// Template lookup or rendering failed.
    #[error("Template error: {0}")]
    TemplateError(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HelpfulError {
    /// Returns the HTTP status code associated with this error.
    ///
    /// - `ValidationError` -> 400
    /// - `PermissionDenied` -> 403
    /// - `NotFound`, `DoesNotExist` -> 404
    /// - everything else -> 500
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::ValidationError(_) => 400,
            Self::PermissionDenied(_) => 403,
            Self::NotFound(_) | Self::DoesNotExist(_) => 404,
            Self::ImproperlyConfigured(_)
            | Self::DatabaseError(_)
            | Self::TemplateError(_)
            | Self::SerializationError(_)
            | Self::Io(_) => 500,
        }
    }

    /// Returns `true` for errors caused by a misconfigured view.
    pub const fn is_configuration_error(&self) -> bool {
        matches!(self, Self::ImproperlyConfigured(_))
    }
}

impl From<ValidationError> for HelpfulError {
    fn from(err: ValidationError) -> Self {
        Self::ValidationError(err)
    }
}

impl From<serde_json::Error> for HelpfulError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// A convenience type alias for results using [`HelpfulError`].
pub type HelpfulResult<T> = Result<T, HelpfulError>;
