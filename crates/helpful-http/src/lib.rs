//! # helpful-http
//!
//! The request/response seam the view mixins run on: [`HttpRequest`] with
//! parsed GET/POST data, [`HttpResponse`] that remembers the template
//! context it was rendered with, and request-scoped flash messages.

pub mod messages;
pub mod querydict;
pub mod request;
pub mod response;

pub use messages::{Level, Message, MessageStorage};
pub use querydict::QueryDict;
pub use request::{HttpRequest, HttpRequestBuilder};
pub use response::{
    HttpResponse, HttpResponseForbidden, HttpResponseRedirect, TemplateContext,
};
