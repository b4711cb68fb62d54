//! Core types: activities, accounts, turn context, and the Middleware trait.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{DbotError, Result};

/// User or bot identity on a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelAccount {
    pub id: String,
    pub name: Option<String>,
}

impl ChannelAccount {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
        }
    }
}

/// Conversation identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationAccount {
    pub id: String,
    pub name: Option<String>,
}

/// Kind of activity exchanged between user and bot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityType {
    #[default]
    Message,
    Event,
    ConversationUpdate,
}

/// Hint to the channel about whether the bot expects user input after a reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InputHint {
    #[default]
    AcceptingInput,
    ExpectingInput,
    IgnoringInput,
}

/// A single inbound or outbound exchange (user message, event, or bot reply).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    pub activity_type: ActivityType,
    pub text: Option<String>,
    pub speak: Option<String>,
    /// Event name; only meaningful for [`ActivityType::Event`].
    pub name: Option<String>,
    pub value: Option<Value>,
    pub input_hint: Option<InputHint>,
    pub channel_id: String,
    pub from: ChannelAccount,
    pub recipient: ChannelAccount,
    pub conversation: ConversationAccount,
    pub reply_to_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Activity {
    /// Message activity carrying `text`.
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            activity_type: ActivityType::Message,
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Message activity with both a text and a speech rendering.
    pub fn message_with_speak(text: impl Into<String>, speak: impl Into<String>) -> Self {
        Self {
            speak: Some(speak.into()),
            ..Self::message(text)
        }
    }

    pub fn event(name: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            activity_type: ActivityType::Event,
            name: Some(name.into()),
            value,
            ..Default::default()
        }
    }

    pub fn conversation_update() -> Self {
        Self {
            activity_type: ActivityType::ConversationUpdate,
            ..Default::default()
        }
    }

    pub fn with_input_hint(mut self, hint: InputHint) -> Self {
        self.input_hint = Some(hint);
        self
    }

    /// Text or empty string.
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    pub fn is_message(&self) -> bool {
        self.activity_type == ActivityType::Message
    }
}

/// Observer notified of every reply sent during a turn, as it is sent.
pub trait ReplySink: Send + Sync {
    fn on_send(&self, activity: &Activity);
}

/// Key/value state for one scope (conversation or user), loaded per turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateBag {
    values: Map<String, Value>,
}

impl StateBag {
    pub fn from_map(values: Map<String, Value>) -> Self {
        Self { values }
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.values
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.values
    }

    /// Reads and deserializes `key`; `None` when absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.values.get(key) {
            Some(v) => Ok(Some(serde_json::from_value(v.clone())?)),
            None => Ok(None),
        }
    }

    pub fn set<T: Serialize>(&mut self, key: impl Into<String>, value: &T) -> Result<()> {
        self.values.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Per-turn context: the inbound activity, the intent annotation slot, emitted replies and state.
pub struct TurnContext {
    activity: Activity,
    intent: Option<String>,
    replies: Vec<Activity>,
    sinks: Vec<Arc<dyn ReplySink>>,
    pub conversation_state: StateBag,
    pub user_state: StateBag,
}

impl TurnContext {
    pub fn new(activity: Activity) -> Self {
        Self {
            activity,
            intent: None,
            replies: Vec::new(),
            sinks: Vec::new(),
            conversation_state: StateBag::default(),
            user_state: StateBag::default(),
        }
    }

    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    /// Inbound text; `HandlerError::NoText` for activities without text.
    pub fn text(&self) -> Result<&str> {
        self.activity
            .text
            .as_deref()
            .ok_or(DbotError::Handler(crate::error::HandlerError::NoText))
    }

    pub fn intent(&self) -> Option<&str> {
        self.intent.as_deref()
    }

    pub fn set_intent(&mut self, intent: impl Into<String>) {
        self.intent = Some(intent.into());
    }

    pub fn clear_intent(&mut self) {
        self.intent = None;
    }

    /// Registers an observer for replies sent from now on in this turn.
    pub fn on_send_activities(&mut self, sink: Arc<dyn ReplySink>) {
        self.sinks.push(sink);
    }

    /// Sends a reply: addresses it back to the sender and notifies every registered sink.
    pub fn send_activity(&mut self, mut reply: Activity) {
        reply.channel_id = self.activity.channel_id.clone();
        reply.conversation = self.activity.conversation.clone();
        reply.from = self.activity.recipient.clone();
        reply.recipient = self.activity.from.clone();
        reply.reply_to_id = Some(self.activity.id.clone());
        if reply.timestamp.is_none() {
            reply.timestamp = Some(Utc::now());
        }
        for sink in &self.sinks {
            sink.on_send(&reply);
        }
        self.replies.push(reply);
    }

    /// Shorthand for sending a plain text message.
    pub fn send_text(&mut self, text: impl Into<String>) {
        self.send_activity(Activity::message(text));
    }

    pub fn replies(&self) -> &[Activity] {
        &self.replies
    }

    pub fn responded(&self) -> bool {
        !self.replies.is_empty()
    }
}

/// Pipeline step around the bot turn: `before` in registration order, `after` in reverse.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Runs before the bot. Return false to skip the bot and the rest of the chain.
    async fn before(&self, _ctx: &mut TurnContext) -> Result<bool> {
        Ok(true)
    }
    /// Runs after the bot (reverse order).
    async fn after(&self, _ctx: &mut TurnContext) -> Result<()> {
        Ok(())
    }
}
