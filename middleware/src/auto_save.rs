use async_trait::async_trait;
use dbot_core::{Middleware, Result, TurnContext};
use storage::BotState;
use tracing::{info, instrument};

/// Loads conversation and user state into the turn before the bot runs and saves both after.
#[derive(Clone)]
pub struct AutoSaveStateMiddleware {
    user_state: BotState,
    conversation_state: BotState,
}

impl AutoSaveStateMiddleware {
    pub fn new(user_state: BotState, conversation_state: BotState) -> Self {
        Self {
            user_state,
            conversation_state,
        }
    }
}

#[async_trait]
impl Middleware for AutoSaveStateMiddleware {
    #[instrument(skip(self, ctx))]
    async fn before(&self, ctx: &mut TurnContext) -> Result<bool> {
        ctx.conversation_state = self.conversation_state.load(ctx.activity()).await?;
        ctx.user_state = self.user_state.load(ctx.activity()).await?;
        info!(
            activity_id = %ctx.activity().id,
            "step: AutoSaveStateMiddleware before, state loaded"
        );
        Ok(true)
    }

    #[instrument(skip(self, ctx))]
    async fn after(&self, ctx: &mut TurnContext) -> Result<()> {
        self.conversation_state
            .save(ctx.activity(), &ctx.conversation_state)
            .await?;
        self.user_state.save(ctx.activity(), &ctx.user_state).await?;
        info!(
            activity_id = %ctx.activity().id,
            "step: AutoSaveStateMiddleware after, state saved"
        );
        Ok(())
    }
}
