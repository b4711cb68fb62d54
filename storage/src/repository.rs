use async_trait::async_trait;
use dbot_core::Result;
use serde_json::{Map, Value};

/// Key/value store for serialized state documents.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn read(&self, key: &str) -> Result<Option<Map<String, Value>>>;
    async fn write(&self, key: &str, document: Map<String, Value>) -> Result<()>;
    /// Returns true when a document was removed.
    async fn delete(&self, key: &str) -> Result<bool>;
}
