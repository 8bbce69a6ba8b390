//! # helpful-test
//!
//! Test helpers for views built on `helpful-views`.
//!
//! - [`WebTest`] dispatches requests straight to a view and captures the
//!   response together with the flash messages it recorded
//! - [`assert_form_has_no_errors`] fails a test with readable error text
//!   when a rendered form or formset did not validate

pub mod assertions;
pub mod webtest;

pub use assertions::{
    assert_contains, assert_form_has_no_errors, assert_redirects, check_form_has_no_errors,
};
pub use webtest::{TestResponse, WebTest};
