//! In-memory [`StateStore`]: one per test flow, data lost when dropped.

use crate::repository::StateStore;
use async_trait::async_trait;
use dbot_core::Result;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory state store for tests. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    documents: Arc<RwLock<HashMap<String, Map<String, Value>>>>,
}

impl MemoryStorage {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Sorted keys, for diagnostics.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.documents.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn clear(&self) {
        self.documents.write().await.clear();
    }
}

#[async_trait]
impl StateStore for MemoryStorage {
    async fn read(&self, key: &str) -> Result<Option<Map<String, Value>>> {
        let documents = self.documents.read().await;
        let found = documents.get(key).cloned();
        debug!(key = %key, found = found.is_some(), "step: MemoryStorage read");
        Ok(found)
    }

    async fn write(&self, key: &str, document: Map<String, Value>) -> Result<()> {
        debug!(key = %key, fields = document.len(), "step: MemoryStorage write");
        self.documents
            .write()
            .await
            .insert(key.to_string(), document);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.documents.write().await.remove(key).is_some())
    }
}
