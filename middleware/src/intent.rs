//! Scripted stand-in for an intent recognizer.

use async_trait::async_trait;
use dbot_core::{Middleware, Result, TurnContext};
use std::sync::RwLock;
use tracing::{debug, info, instrument};

/// Confirm/cancel intents every recognizer-backed flow understands unless overwritten.
pub const DEFAULT_INTENTS: [(&str, &str); 3] = [
    ("Yes", "ConfirmYes"),
    ("No", "ConfirmNo"),
    ("Cancel", "Cancel"),
];

/// Maps literal utterances to intent labels and annotates each message turn with the match.
///
/// Lookup is exact and case-sensitive. On a miss the optional target intent is used; without
/// one the turn carries no intent. Non-message activities are never annotated.
#[derive(Debug, Default)]
pub struct FakeIntentRecognizerMiddleware {
    target_intent: Option<String>,
    mappings: RwLock<Vec<(String, String)>>,
}

impl FakeIntentRecognizerMiddleware {
    pub fn new(target_intent: Option<String>) -> Self {
        Self {
            target_intent,
            mappings: RwLock::new(Vec::new()),
        }
    }

    /// Recognizer that resolves `intent` for every unmapped utterance.
    pub fn with_target(intent: impl Into<String>) -> Self {
        Self::new(Some(intent.into()))
    }

    /// Registers `utterance → intent`. A later call for the same utterance replaces the earlier one.
    pub fn add_intent_result(&self, utterance: impl Into<String>, intent: impl Into<String>) {
        let utterance = utterance.into();
        let intent = intent.into();
        let mut mappings = self
            .mappings
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match mappings.iter_mut().find(|(u, _)| *u == utterance) {
            Some(entry) => entry.1 = intent,
            None => mappings.push((utterance, intent)),
        }
    }

    /// Installs [`DEFAULT_INTENTS`].
    pub fn add_default_intents(&self) {
        for (utterance, intent) in DEFAULT_INTENTS {
            self.add_intent_result(utterance, intent);
        }
    }

    pub fn target_intent(&self) -> Option<&str> {
        self.target_intent.as_deref()
    }

    /// Intent for `utterance`: mapped label, else target intent, else `None`.
    pub fn recognize(&self, utterance: &str) -> Option<String> {
        let mappings = self
            .mappings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        mappings
            .iter()
            .find(|(u, _)| u == utterance)
            .map(|(_, intent)| intent.clone())
            .or_else(|| self.target_intent.clone())
    }

    /// Registered pairs in registration order.
    pub fn mappings(&self) -> Vec<(String, String)> {
        self.mappings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Middleware for FakeIntentRecognizerMiddleware {
    #[instrument(skip(self, ctx))]
    async fn before(&self, ctx: &mut TurnContext) -> Result<bool> {
        if !ctx.activity().is_message() {
            debug!("step: FakeIntentRecognizer skipped non-message activity");
            return Ok(true);
        }
        let utterance = ctx.activity().text_or_empty().to_string();
        match self.recognize(&utterance) {
            Some(intent) => {
                info!(utterance = %utterance, intent = %intent, "step: intent recognized");
                ctx.set_intent(intent);
            }
            None => {
                info!(utterance = %utterance, "step: no intent recognized");
                ctx.clear_intent();
            }
        }
        Ok(true)
    }
}
