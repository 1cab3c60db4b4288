//! Extension trait definitions

use async_trait::async_trait;
use serde::Serialize;

use crate::application::errors::BotError;
use crate::domain::entities::MessageEvent;

/// Core extension trait that all extensions must implement
#[async_trait]
pub trait Extension: Send + Sync {
    /// Unique identifier for the extension
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// A new message was posted. Returns whether the extension answered it.
    async fn on_message(&self, event: &MessageEvent) -> Result<bool, BotError>;

    /// Optional: a message was edited
    async fn on_message_changed(&self, _event: &MessageEvent) -> Result<(), BotError> {
        Ok(())
    }

    /// Optional: a message was removed
    async fn on_message_deleted(&self, _event: &MessageEvent) -> Result<(), BotError> {
        Ok(())
    }
}

/// Extension information for status listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtensionInfo {
    pub name: String,
    pub description: String,
    pub enabled: bool,
    /// Channels the extension is limited to; empty means everywhere
    pub channels: Vec<String>,
}

impl std::fmt::Display for ExtensionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = if self.enabled { "enabled" } else { "disabled" };
        let scope = if self.channels.is_empty() {
            "all channels".to_string()
        } else {
            self.channels.join(", ")
        };
        write!(f, "*{}* ({}): {} - {}", self.name, state, self.description, scope)
    }
}
