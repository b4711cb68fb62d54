//! Storage error types.
//!
//! Used by state store implementations and [`crate::BotState`]; converts into
//! [`dbot_core::DbotError::State`] at the crate boundary.

use thiserror::Error;

/// Errors that can occur when using storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Cannot build {scope} state key: activity has no {field}")]
    MissingKeyPart { scope: &'static str, field: &'static str },
}

impl From<StorageError> for dbot_core::DbotError {
    fn from(e: StorageError) -> Self {
        dbot_core::DbotError::State(e.to_string())
    }
}
