//! # Handler chain
//!
//! Runs a sequence of middleware around one bot turn. Middleware `before` runs in order and
//! can stop the chain (the bot is skipped); then the bot handles the turn; then middleware
//! `after` callbacks run in reverse order.

use dbot_core::{Bot, Middleware, Result, TurnContext};
use std::sync::Arc;
use tracing::{info, instrument};

/// Outcome of one pass through the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    /// The bot handled the turn and every middleware `after` ran.
    Completed,
    /// A middleware `before` returned false; the bot did not run.
    Stopped,
}

/// Chain of middleware wrapping a bot: before in order, bot, after in reverse order.
#[derive(Clone, Default)]
pub struct HandlerChain {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl HandlerChain {
    /// Creates an empty chain (no middleware).
    pub fn new() -> Self {
        Self {
            middleware: Vec::new(),
        }
    }

    /// Appends a middleware (before runs in registration order, after in reverse).
    pub fn add_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// In-place variant of [`HandlerChain::add_middleware`].
    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.middleware.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Runs middleware before, then the bot, then middleware after in reverse.
    #[instrument(skip(self, ctx, bot))]
    pub async fn handle(&self, ctx: &mut TurnContext, bot: &dyn Bot) -> Result<ChainOutcome> {
        let activity_id = ctx.activity().id.clone();
        info!(
            activity_id = %activity_id,
            activity_type = ?ctx.activity().activity_type,
            "step: handler_chain started"
        );

        for mw in &self.middleware {
            let mw_name = std::any::type_name_of_val(mw.as_ref());
            info!(middleware = %mw_name, "step: middleware before");
            let should_continue = mw.before(ctx).await?;
            if !should_continue {
                info!(
                    middleware = %mw_name,
                    "step: middleware before returned false, chain stopped"
                );
                return Ok(ChainOutcome::Stopped);
            }
        }

        info!(intent = ?ctx.intent(), "step: bot turn");
        bot.on_turn(ctx).await?;
        info!(replies = ctx.replies().len(), "step: bot turn done");

        for mw in self.middleware.iter().rev() {
            let mw_name = std::any::type_name_of_val(mw.as_ref());
            info!(middleware = %mw_name, "step: middleware after");
            mw.after(ctx).await?;
        }

        info!(activity_id = %activity_id, "step: handler_chain finished");

        Ok(ChainOutcome::Completed)
    }
}

// Integration tests live in tests/handler_chain_test.rs
