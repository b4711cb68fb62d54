//! # dbot-testkit
//!
//! Scripted conversation tests for bots. A [`BotTestHarness`] wraps a bot factory and builds
//! [`TestFlow`]s; each flow owns a fresh in-memory state store, state auto-save, console
//! output, reply capture, and optionally a fake intent recognizer.
//!
//! ```no_run
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use dbot_core::{Bot, Result, TurnContext};
//! use dbot_testkit::BotTestHarness;
//!
//! struct ConfirmBot;
//!
//! #[async_trait]
//! impl Bot for ConfirmBot {
//!     async fn on_turn(&self, ctx: &mut TurnContext) -> Result<()> {
//!         let reply = match ctx.intent() {
//!             Some("ConfirmYes") => "Done.",
//!             _ => "Sorry?",
//!         };
//!         ctx.send_text(reply);
//!         Ok(())
//!     }
//! }
//!
//! # async fn run() -> Result<()> {
//! let harness = BotTestHarness::new(|| -> Arc<dyn Bot> { Arc::new(ConfirmBot) });
//! harness
//!     .test_flow_with_intent(None)
//!     .send("Yes")
//!     .assert_reply("Done.")
//!     .send("maybe")
//!     .assert_reply("Sorry?")
//!     .start_test()
//!     .await
//! # }
//! ```

pub mod adapter;
pub mod config;
pub mod flow;
pub mod harness;

pub use adapter::TestAdapter;
pub use config::TestConfig;
pub use flow::TestFlow;
pub use harness::{BotFactory, BotTestHarness};

pub use middleware::{FakeIntentRecognizerMiddleware, DEFAULT_INTENTS};
pub use responses::{ExpectedReply, Reply, TemplateSet, Tokens};
