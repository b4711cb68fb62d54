use async_trait::async_trait;
use dbot_core::{Activity, Middleware, ReplySink, Result, TurnContext};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

/// Logs each inbound activity and every reply as it is sent; always continues.
pub struct ConsoleOutputMiddleware;

struct ConsoleSink;

impl ReplySink for ConsoleSink {
    fn on_send(&self, activity: &Activity) {
        info!(
            reply_to = ?activity.reply_to_id,
            text = %activity.text_or_empty(),
            speak = ?activity.speak,
            "Bot:"
        );
    }
}

#[async_trait]
impl Middleware for ConsoleOutputMiddleware {
    #[instrument(skip(self, ctx))]
    async fn before(&self, ctx: &mut TurnContext) -> Result<bool> {
        let activity = ctx.activity();
        info!(
            user_id = %activity.from.id,
            activity_type = ?activity.activity_type,
            text = %activity.text_or_empty(),
            "User:"
        );
        ctx.on_send_activities(Arc::new(ConsoleSink));
        Ok(true)
    }

    #[instrument(skip(self, ctx))]
    async fn after(&self, ctx: &mut TurnContext) -> Result<()> {
        debug!(
            activity_id = %ctx.activity().id,
            replies = ctx.replies().len(),
            intent = ?ctx.intent(),
            "Processed turn"
        );
        Ok(())
    }
}

/// Forwards every reply sent during a turn, as it is sent, to a channel read by the test flow.
#[derive(Clone)]
pub struct ReplyCaptureMiddleware {
    reply_tx: mpsc::UnboundedSender<Activity>,
}

struct ChannelSink(mpsc::UnboundedSender<Activity>);

impl ReplySink for ChannelSink {
    fn on_send(&self, activity: &Activity) {
        if self.0.send(activity.clone()).is_err() {
            warn!("Reply receiver dropped; reply not captured");
        }
    }
}

impl ReplyCaptureMiddleware {
    pub fn new(reply_tx: mpsc::UnboundedSender<Activity>) -> Self {
        Self { reply_tx }
    }

    /// Creates the middleware and returns the receiver for captured replies.
    pub fn with_receiver() -> (Self, mpsc::UnboundedReceiver<Activity>) {
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        (Self::new(reply_tx), reply_rx)
    }
}

#[async_trait]
impl Middleware for ReplyCaptureMiddleware {
    async fn before(&self, ctx: &mut TurnContext) -> Result<bool> {
        ctx.on_send_activities(Arc::new(ChannelSink(self.reply_tx.clone())));
        Ok(true)
    }
}
