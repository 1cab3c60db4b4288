use async_trait::async_trait;
use crate::domain::entities::{OutgoingMessage, User};
use crate::application::errors::PlatformError;

/// ChatPlatform trait - abstraction for the messaging platform the bot talks to
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Identify the bot itself, so it can ignore its own messages
    async fn identify(&self) -> Result<BotInfo, PlatformError>;

    /// Send a message; returns the platform's message id when it gives one
    async fn send(&self, message: &OutgoingMessage) -> Result<Option<String>, PlatformError>;

    /// Open (or reuse) a direct conversation with a user, returning its channel id
    async fn open_direct(&self, user_id: &str) -> Result<String, PlatformError>;

    /// Look up a workspace member
    async fn user_info(&self, user_id: &str) -> Result<User, PlatformError>;
}

/// Bot identity
#[derive(Debug, Clone)]
pub struct BotInfo {
    pub user_id: String,
    pub name: String,
    pub team: Option<String>,
}
