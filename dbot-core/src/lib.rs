//! # dbot-core
//!
//! Core types and traits for scripted bot turns: [`Bot`], [`Middleware`], [`Activity`],
//! [`TurnContext`], errors, and tracing initialization. Transport-agnostic; used by
//! handler-chain, middleware, storage and dbot-testkit.

pub mod bot;
pub mod error;
pub mod logger;
pub mod types;

pub use bot::Bot;
pub use error::{DbotError, HandlerError, Result};
pub use logger::{init_test_tracing, init_tracing};
pub use types::{
    Activity, ActivityType, ChannelAccount, ConversationAccount, InputHint, Middleware,
    ReplySink, StateBag, TurnContext,
};
