//! Test double of a bot-hosting adapter: addresses simulated activities and runs them
//! through the middleware chain and the bot.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dbot_core::{Activity, Bot, ChannelAccount, ConversationAccount, Result, TurnContext};
use handler_chain::{ChainOutcome, HandlerChain};
use tracing::{info, instrument};
use uuid::Uuid;

pub struct TestAdapter {
    chain: HandlerChain,
    channel_id: String,
    conversation: ConversationAccount,
    user: ChannelAccount,
    bot: ChannelAccount,
    next_id: AtomicU64,
}

impl TestAdapter {
    /// Adapter over `chain` with a fresh conversation id on the `test` channel.
    pub fn new(chain: HandlerChain) -> Self {
        Self {
            chain,
            channel_id: crate::config::DEFAULT_CHANNEL_ID.to_string(),
            conversation: ConversationAccount {
                id: Uuid::new_v4().to_string(),
                name: Some("Conversation1".to_string()),
            },
            user: ChannelAccount::new("user1", "User1"),
            bot: ChannelAccount::new("bot", "Bot"),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_channel_id(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = channel_id.into();
        self
    }

    pub fn with_user(mut self, user: ChannelAccount) -> Self {
        self.user = user;
        self
    }

    pub fn conversation(&self) -> &ConversationAccount {
        &self.conversation
    }

    pub fn user(&self) -> &ChannelAccount {
        &self.user
    }

    /// Fills in id, channel, conversation, sender and recipient of a simulated user activity.
    pub fn make_activity(&self, mut activity: Activity) -> Activity {
        activity.id = self.next_id.fetch_add(1, Ordering::SeqCst).to_string();
        activity.channel_id = self.channel_id.clone();
        activity.conversation = self.conversation.clone();
        activity.from = self.user.clone();
        activity.recipient = self.bot.clone();
        if activity.timestamp.is_none() {
            activity.timestamp = Some(Utc::now());
        }
        activity
    }

    /// Runs one turn for `activity` through the chain and `bot`; returns the finished context.
    #[instrument(skip(self, activity, bot))]
    pub async fn process_activity(&self, activity: Activity, bot: &dyn Bot) -> Result<TurnContext> {
        let activity = self.make_activity(activity);
        info!(
            activity_id = %activity.id,
            text = %activity.text_or_empty(),
            "step: TestAdapter turn started"
        );
        let mut ctx = TurnContext::new(activity);
        let outcome = self.chain.handle(&mut ctx, bot).await?;
        info!(
            outcome = ?outcome,
            replies = ctx.replies().len(),
            stopped = outcome == ChainOutcome::Stopped,
            "step: TestAdapter turn finished"
        );
        Ok(ctx)
    }
}
