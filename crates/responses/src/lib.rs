//! # Responses
//!
//! Named response templates and the helpers tests use to turn them into expected reply text.
//!
//! ## Pieces
//!
//! - [`TemplateSet`] / [`ResponseTemplate`]: named text + optional speech, looked up by explicit key
//! - [`TemplateStore`]: loads sets (and per-locale overrides) from a resource directory
//! - [`format`] / [`format_positional`]: `{token}` substitution
//! - [`ResponseBuilder`]: ordered [`ResponseFormatter`]s plus reply resolution
//! - [`ExpectedReply`] / [`Tokens`]: what an assertion compares against
//!
//! Sets are constructed and passed explicitly; there is no process-wide store.

pub mod formatter;
pub mod resolve;
pub mod store;
pub mod template;

pub use formatter::{
    format, format_positional, token_names, ResponseBuilder, ResponseFormatter,
    TextResponseFormatter,
};
pub use resolve::{
    resolve_replies, resolve_replies_positional, resolve_speak_replies, ExpectedReply, Tokens,
};
pub use store::TemplateStore;
pub use template::{Reply, ResponseTemplate, TemplateSet};
