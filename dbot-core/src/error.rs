use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbotError {
    #[error("Template not found: '{name}' in set '{set}'")]
    TemplateNotFound { set: String, name: String },

    #[error("Missing token '{token}' for template: {template}")]
    MissingToken { token: String, template: String },

    #[error("Insufficient tokens: template has {expected} placeholder(s), got {actual} value(s)")]
    InsufficientTokens { expected: usize, actual: usize },

    #[error("Reply mismatch: expected {expected:?}, actual {actual:?}")]
    ReplyMismatch {
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("No reply within {timeout_ms}ms: expected {expected:?}, captured {partial:?}")]
    Timeout {
        timeout_ms: u64,
        expected: Vec<String>,
        partial: Vec<String>,
    },

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    #[error("State error: {0}")]
    State(String),

    #[error("Bot error: {0}")]
    Bot(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by a bot or middleware while processing a turn.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("No text in activity")]
    NoText,

    #[error("Unexpected activity: {0}")]
    UnexpectedActivity(String),
}

pub type Result<T> = std::result::Result<T, DbotError>;
