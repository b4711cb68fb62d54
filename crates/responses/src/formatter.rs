//! `{token}` substitution.
//!
//! A placeholder is one or more word characters inside a single pair of braces. Braces that
//! are doubled (`{{a}}`), unbalanced (`{a}}`), empty or contain non-word characters are left
//! as literal text.

use std::collections::HashMap;
use std::ops::Range;
use std::sync::LazyLock;

use dbot_core::{DbotError, Result};
use regex::Regex;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("token pattern is valid"));

/// Placeholder occurrences in left-to-right order: byte range of `{name}` and the name.
fn placeholders(template: &str) -> Vec<(Range<usize>, &str)> {
    let bytes = template.as_bytes();
    TOKEN_RE
        .captures_iter(template)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let nested = (whole.start() > 0 && bytes[whole.start() - 1] == b'{')
                || bytes.get(whole.end()) == Some(&b'}');
            if nested {
                return None;
            }
            Some((whole.range(), caps.get(1)?.as_str()))
        })
        .collect()
}

/// Identifiers of every placeholder in `template`, in scan order (duplicates kept).
pub fn token_names(template: &str) -> Vec<&str> {
    placeholders(template).into_iter().map(|(_, name)| name).collect()
}

/// Replaces each `{name}` with `values[name]`; an absent name fails with `MissingToken`.
pub fn format(template: &str, values: &HashMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for (range, name) in placeholders(template) {
        let value = values.get(name).ok_or_else(|| DbotError::MissingToken {
            token: name.to_string(),
            template: template.to_string(),
        })?;
        out.push_str(&template[last..range.start]);
        out.push_str(value);
        last = range.end;
    }
    out.push_str(&template[last..]);
    Ok(out)
}

/// Replaces the i-th placeholder with `values[i]`, whatever its identifier.
/// Fewer values than placeholders fails with `InsufficientTokens`; extra values are ignored.
pub fn format_positional<S: AsRef<str>>(template: &str, values: &[S]) -> Result<String> {
    let spots = placeholders(template);
    if values.len() < spots.len() {
        return Err(DbotError::InsufficientTokens {
            expected: spots.len(),
            actual: values.len(),
        });
    }
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for ((range, _), value) in spots.iter().zip(values) {
        out.push_str(&template[last..range.start]);
        out.push_str(value.as_ref());
        last = range.end;
    }
    out.push_str(&template[last..]);
    Ok(out)
}

/// One formatting pass a [`ResponseBuilder`] can apply to response text.
pub trait ResponseFormatter: Send + Sync {
    /// Whether this formatter has anything to do for `text`.
    fn can_format(&self, text: &str) -> bool;
    fn format(&self, text: &str, tokens: &HashMap<String, String>) -> Result<String>;
}

/// Named `{token}` substitution via [`format`].
#[derive(Debug, Clone, Copy, Default)]
pub struct TextResponseFormatter;

impl ResponseFormatter for TextResponseFormatter {
    fn can_format(&self, text: &str) -> bool {
        !placeholders(text).is_empty()
    }

    fn format(&self, text: &str, tokens: &HashMap<String, String>) -> Result<String> {
        format(text, tokens)
    }
}

/// Applies registered formatters in order; each one that can format the current text does.
pub struct ResponseBuilder {
    formatters: Vec<Box<dyn ResponseFormatter>>,
}

impl ResponseBuilder {
    /// Builder with no formatters (text passes through unchanged).
    pub fn new() -> Self {
        Self {
            formatters: Vec::new(),
        }
    }

    pub fn add_formatter(mut self, formatter: impl ResponseFormatter + 'static) -> Self {
        self.formatters.push(Box::new(formatter));
        self
    }

    pub fn format(&self, text: &str, tokens: &HashMap<String, String>) -> Result<String> {
        let mut current = text.to_string();
        for formatter in &self.formatters {
            if formatter.can_format(&current) {
                current = formatter.format(&current, tokens)?;
            }
        }
        Ok(current)
    }
}

impl Default for ResponseBuilder {
    /// Builder with a [`TextResponseFormatter`].
    fn default() -> Self {
        Self::new().add_formatter(TextResponseFormatter)
    }
}
