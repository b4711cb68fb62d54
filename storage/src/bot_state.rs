//! Conversation- and user-scoped state on top of a [`StateStore`].

use crate::error::StorageError;
use crate::repository::StateStore;
use dbot_core::{Activity, Result, StateBag};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Which slice of the store a [`BotState`] reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateScope {
    /// Keyed by channel + conversation id.
    Conversation,
    /// Keyed by channel + sender id.
    User,
}

impl StateScope {
    fn label(self) -> &'static str {
        match self {
            StateScope::Conversation => "conversation",
            StateScope::User => "user",
        }
    }
}

/// Loads and saves one state scope for the activity of a turn.
#[derive(Clone)]
pub struct BotState {
    store: Arc<dyn StateStore>,
    scope: StateScope,
}

impl BotState {
    pub fn new(store: Arc<dyn StateStore>, scope: StateScope) -> Self {
        Self { store, scope }
    }

    /// Conversation state over `store`.
    pub fn conversation(store: Arc<dyn StateStore>) -> Self {
        Self::new(store, StateScope::Conversation)
    }

    /// User state over `store`.
    pub fn user(store: Arc<dyn StateStore>) -> Self {
        Self::new(store, StateScope::User)
    }

    pub fn scope(&self) -> StateScope {
        self.scope
    }

    /// Storage key for the activity: `{channel}/conversations/{id}` or `{channel}/users/{id}`.
    pub fn storage_key(&self, activity: &Activity) -> Result<String> {
        let scope = self.scope.label();
        if activity.channel_id.is_empty() {
            return Err(StorageError::MissingKeyPart {
                scope,
                field: "channel id",
            }
            .into());
        }
        let key = match self.scope {
            StateScope::Conversation => {
                if activity.conversation.id.is_empty() {
                    return Err(StorageError::MissingKeyPart {
                        scope,
                        field: "conversation id",
                    }
                    .into());
                }
                format!("{}/conversations/{}", activity.channel_id, activity.conversation.id)
            }
            StateScope::User => {
                if activity.from.id.is_empty() {
                    return Err(StorageError::MissingKeyPart {
                        scope,
                        field: "sender id",
                    }
                    .into());
                }
                format!("{}/users/{}", activity.channel_id, activity.from.id)
            }
        };
        Ok(key)
    }

    /// Reads the scope's state; empty bag when nothing was saved yet.
    #[instrument(skip(self, activity), fields(scope = self.scope.label()))]
    pub async fn load(&self, activity: &Activity) -> Result<StateBag> {
        let key = self.storage_key(activity)?;
        let document = self.store.read(&key).await?;
        debug!(key = %key, existing = document.is_some(), "step: state loaded");
        Ok(document.map(StateBag::from_map).unwrap_or_default())
    }

    #[instrument(skip(self, activity, state), fields(scope = self.scope.label()))]
    pub async fn save(&self, activity: &Activity, state: &StateBag) -> Result<()> {
        let key = self.storage_key(activity)?;
        self.store.write(&key, state.as_map().clone()).await?;
        debug!(key = %key, "step: state saved");
        Ok(())
    }

    /// Deletes the scope's state; true when something was removed.
    pub async fn clear(&self, activity: &Activity) -> Result<bool> {
        let key = self.storage_key(activity)?;
        self.store.delete(&key).await
    }
}
