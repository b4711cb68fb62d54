//! Fixture bots for flow tests.
//!
//! Each bot implements [`dbot_core::Bot`] directly; tests hand a factory closure to
//! [`dbot_testkit::BotTestHarness`].

#![allow(dead_code)] // each test file uses a different subset

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dbot_core::{ActivityType, Bot, DbotError, HandlerError, Result, TurnContext};
use dbot_testkit::{BotTestHarness, TemplateSet};
use responses::{ResponseBuilder, ResponseTemplate};

/// Replies with the resolved intent, or `None`.
pub struct IntentEchoBot;

#[async_trait]
impl Bot for IntentEchoBot {
    async fn on_turn(&self, ctx: &mut TurnContext) -> Result<()> {
        let reply = format!("intent: {}", ctx.intent().unwrap_or("None"));
        ctx.send_text(reply);
        Ok(())
    }
}

/// Sends a fixed list of replies every turn.
pub struct ScriptedBot(pub Vec<&'static str>);

#[async_trait]
impl Bot for ScriptedBot {
    async fn on_turn(&self, ctx: &mut TurnContext) -> Result<()> {
        for text in &self.0 {
            ctx.send_text(*text);
        }
        Ok(())
    }
}

/// Waits between replies to exercise asynchronous reply capture.
pub struct SlowBot {
    pub delay: Duration,
}

#[async_trait]
impl Bot for SlowBot {
    async fn on_turn(&self, ctx: &mut TurnContext) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        ctx.send_text("first");
        tokio::time::sleep(self.delay).await;
        ctx.send_text("second");
        Ok(())
    }
}

/// Never replies.
pub struct SilentBot;

#[async_trait]
impl Bot for SilentBot {
    async fn on_turn(&self, _ctx: &mut TurnContext) -> Result<()> {
        Ok(())
    }
}

/// Fails every turn.
pub struct FailingBot;

#[async_trait]
impl Bot for FailingBot {
    async fn on_turn(&self, _ctx: &mut TurnContext) -> Result<()> {
        Err(DbotError::Bot("downstream unavailable".to_string()))
    }
}

/// Describes events and conversation updates; echoes messages.
pub struct EventBot;

#[async_trait]
impl Bot for EventBot {
    async fn on_turn(&self, ctx: &mut TurnContext) -> Result<()> {
        let activity = ctx.activity().clone();
        let reply = match activity.activity_type {
            ActivityType::Event => format!(
                "event: {} {}",
                activity.name.as_deref().unwrap_or(""),
                activity.value.map(|v| v.to_string()).unwrap_or_default()
            ),
            ActivityType::ConversationUpdate => "Welcome!".to_string(),
            ActivityType::Message => format!(
                "echo: {} ({})",
                activity.text_or_empty(),
                ctx.intent().unwrap_or("None")
            ),
        };
        ctx.send_text(reply);
        Ok(())
    }
}

pub const MESSAGE_RESPONSES: &str = r#"{
    "MessagePrompt": { "text": "What message do you want to send?", "speak": "What message?", "inputHint": "expectingInput" },
    "ConfirmPrompt": { "text": "Send '{message}'?", "speak": "Send {message}?", "inputHint": "expectingInput" },
    "MessageSent": { "text": "Sent '{message}'." },
    "Cancelled": { "text": "Ok, cancelled." }
}"#;

pub fn message_templates() -> Arc<TemplateSet> {
    Arc::new(TemplateSet::from_json("MessageResponses", MESSAGE_RESPONSES).expect("fixture templates"))
}

/// Small send-a-message dialog driven by conversation state and intents:
/// prompt → capture message → confirm (ConfirmYes / ConfirmNo / Cancel).
pub struct MessageBot {
    pub templates: Arc<TemplateSet>,
}

impl MessageBot {
    fn reply(&self, ctx: &mut TurnContext, name: &str, tokens: &HashMap<String, String>) -> Result<()> {
        let template: &ResponseTemplate = self.templates.get(name)?;
        let activity = ResponseBuilder::default().render(template, tokens)?;
        ctx.send_activity(activity);
        Ok(())
    }
}

#[async_trait]
impl Bot for MessageBot {
    async fn on_turn(&self, ctx: &mut TurnContext) -> Result<()> {
        if !ctx.activity().is_message() {
            return Err(HandlerError::UnexpectedActivity(format!(
                "{:?}",
                ctx.activity().activity_type
            ))
            .into());
        }
        let step = ctx.conversation_state.get::<String>("step")?;
        let message = ctx.conversation_state.get::<String>("message")?;
        let mut tokens = HashMap::new();

        if ctx.intent() == Some("Cancel") {
            ctx.conversation_state.remove("step");
            ctx.conversation_state.remove("message");
            return self.reply(ctx, "Cancelled", &tokens);
        }

        match step.as_deref() {
            None => {
                ctx.conversation_state.set("step", &"message")?;
                self.reply(ctx, "MessagePrompt", &tokens)
            }
            Some("message") => {
                let text = ctx.text()?.to_string();
                ctx.conversation_state.set("message", &text)?;
                ctx.conversation_state.set("step", &"confirm")?;
                tokens.insert("message".to_string(), text);
                self.reply(ctx, "ConfirmPrompt", &tokens)
            }
            _ => {
                tokens.insert("message".to_string(), message.unwrap_or_default());
                ctx.conversation_state.remove("step");
                ctx.conversation_state.remove("message");
                match ctx.intent() {
                    Some("ConfirmYes") => self.reply(ctx, "MessageSent", &tokens),
                    _ => self.reply(ctx, "Cancelled", &tokens),
                }
            }
        }
    }
}

pub fn harness_for<B>(make: fn() -> B) -> BotTestHarness
where
    B: Bot + 'static,
{
    BotTestHarness::new(move || -> Arc<dyn Bot> { Arc::new(make()) })
}
