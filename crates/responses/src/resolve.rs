//! Turning templates into the literal strings a test expects.

use std::collections::HashMap;

use dbot_core::{Activity, DbotError, Result};

use crate::formatter::{format, format_positional, token_names, ResponseBuilder};
use crate::template::{Reply, ResponseTemplate};

/// Token values for one expected reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tokens {
    /// `{name}` → value.
    Named(HashMap<String, String>),
    /// i-th placeholder → i-th value.
    Positional(Vec<String>),
}

impl Tokens {
    pub fn named<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Tokens::Named(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn positional<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Tokens::Positional(values.into_iter().map(Into::into).collect())
    }

    pub fn apply(&self, template: &str) -> Result<String> {
        match self {
            Tokens::Named(values) => format(template, values),
            Tokens::Positional(values) => format_positional(template, values),
        }
    }
}

/// Reply text a test expects, optionally with tokens still to substitute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedReply {
    pub text: String,
    pub tokens: Option<Tokens>,
}

impl ExpectedReply {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tokens: None,
        }
    }

    pub fn with_tokens(mut self, tokens: Tokens) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Literal string to compare against; text without tokens is taken as-is.
    pub fn resolve(&self) -> Result<String> {
        match &self.tokens {
            Some(tokens) => tokens.apply(&self.text),
            None => Ok(self.text.clone()),
        }
    }
}

impl From<&str> for ExpectedReply {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for ExpectedReply {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl ResponseBuilder {
    /// Formats each reply's text. `None` tokens yields one empty string per reply.
    pub fn resolve_replies(
        &self,
        replies: &[Reply],
        tokens: Option<&HashMap<String, String>>,
    ) -> Result<Vec<String>> {
        let Some(tokens) = tokens else {
            return Ok(vec![String::new(); replies.len()]);
        };
        replies
            .iter()
            .map(|reply| self.format(&reply.text, tokens))
            .collect()
    }

    /// Formats each reply's speech rendering, falling back to its text when it has none.
    /// `None` tokens yields one empty string per reply.
    pub fn resolve_speak_replies(
        &self,
        replies: &[Reply],
        tokens: Option<&HashMap<String, String>>,
    ) -> Result<Vec<String>> {
        let Some(tokens) = tokens else {
            return Ok(vec![String::new(); replies.len()]);
        };
        replies
            .iter()
            .map(|reply| self.format(reply.speak.as_deref().unwrap_or(&reply.text), tokens))
            .collect()
    }

    /// Message activity for `template` with text and speech formatted from `tokens`.
    pub fn render(
        &self,
        template: &ResponseTemplate,
        tokens: &HashMap<String, String>,
    ) -> Result<Activity> {
        let text = self.format(&template.text, tokens)?;
        let speak = template
            .speak
            .as_deref()
            .map(|speak| self.format(speak, tokens))
            .transpose()?;
        Ok(template.to_activity(text, speak))
    }
}

/// [`ResponseBuilder::resolve_replies`] with the default builder.
pub fn resolve_replies(
    replies: &[Reply],
    tokens: Option<&HashMap<String, String>>,
) -> Result<Vec<String>> {
    ResponseBuilder::default().resolve_replies(replies, tokens)
}

/// [`ResponseBuilder::resolve_speak_replies`] with the default builder.
pub fn resolve_speak_replies(
    replies: &[Reply],
    tokens: Option<&HashMap<String, String>>,
) -> Result<Vec<String>> {
    ResponseBuilder::default().resolve_speak_replies(replies, tokens)
}

/// Formats reply `i` with `tokens[i]` filling every one of its placeholders.
/// Fewer tokens than replies fails with `InsufficientTokens`.
pub fn resolve_replies_positional<S: AsRef<str>>(
    replies: &[Reply],
    tokens: &[S],
) -> Result<Vec<String>> {
    if tokens.len() < replies.len() {
        return Err(DbotError::InsufficientTokens {
            expected: replies.len(),
            actual: tokens.len(),
        });
    }
    replies
        .iter()
        .zip(tokens)
        .map(|(reply, token)| {
            let fill = vec![token.as_ref(); token_names(&reply.text).len()];
            format_positional(&reply.text, &fill)
        })
        .collect()
}
