//! Storage crate: state persistence for scripted bot turns.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`repository`] – StateStore trait
//! - [`memory_storage`] – MemoryStorage (in-memory, one per flow)
//! - [`bot_state`] – BotState (conversation / user scopes)

mod bot_state;
mod error;
mod memory_storage;
mod repository;

pub use bot_state::{BotState, StateScope};
pub use error::StorageError;
pub use memory_storage::MemoryStorage;
pub use repository::StateStore;
