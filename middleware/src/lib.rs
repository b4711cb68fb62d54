//! # Middleware crate for scripted bot turns
//!
//! Middleware a test flow installs around the bot-under-test: state auto-save, console
//! output, reply capture, and a scripted intent recognizer.

mod auto_save;
mod intent;
mod middleware;

#[cfg(test)]
mod test;

pub use auto_save::AutoSaveStateMiddleware;
pub use intent::{FakeIntentRecognizerMiddleware, DEFAULT_INTENTS};
pub use middleware::{ConsoleOutputMiddleware, ReplyCaptureMiddleware};
