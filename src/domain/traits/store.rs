use async_trait::async_trait;
use crate::application::errors::StorageError;
use crate::domain::entities::KeywordsState;

/// RuleStore trait - abstraction for keyword rule persistence
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Load the persisted state; a store that was never written yields the default
    async fn load(&self) -> Result<KeywordsState, StorageError>;

    /// Replace the persisted state
    async fn save(&self, state: &KeywordsState) -> Result<(), StorageError>;
}
