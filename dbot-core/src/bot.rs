//! Bot abstraction: the turn handler driven by an adapter.
//!
//! [`Bot`] is the single capability a bot-under-test implements; adapters and test flows
//! build a [`TurnContext`] per inbound activity and hand it to [`Bot::on_turn`].

use crate::error::Result;
use crate::types::TurnContext;
use async_trait::async_trait;

/// Handles one turn. Reads the inbound activity (and intent annotation) from `ctx` and
/// emits replies through [`TurnContext::send_activity`].
#[async_trait]
pub trait Bot: Send + Sync {
    async fn on_turn(&self, ctx: &mut TurnContext) -> Result<()>;
}
