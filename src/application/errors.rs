//! Application layer errors

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Extension error: {0}")]
    Extension(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors talking to the chat platform
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("Rate limited: retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("User error: {0}")]
    User(String),

    #[error("Slack API error: {0}")]
    Api(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl From<reqwest::Error> for PlatformError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PlatformError::Timeout(err.to_string())
        } else if err.is_connect() {
            PlatformError::Network(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            PlatformError::InvalidPayload(err.to_string())
        } else {
            PlatformError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for PlatformError {
    fn from(err: serde_json::Error) -> Self {
        PlatformError::InvalidPayload(err.to_string())
    }
}

/// An `ok: false` answer from the Slack web API
#[derive(Debug, Clone)]
pub struct SlackApiError {
    /// Error code from Slack (e.g. "channel_not_found")
    pub code: String,
    /// Name of the API method that failed
    pub method: String,
}

impl SlackApiError {
    pub fn new(method: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            method: method.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.code.as_str(),
            "ratelimited" | "rate_limited" | "service_unavailable" | "internal_error" | "request_timeout" | "fatal_error"
        )
    }
}

impl From<SlackApiError> for PlatformError {
    fn from(err: SlackApiError) -> Self {
        let detail = format!("{} failed: {}", err.method, err.code);
        match err.code.as_str() {
            "ratelimited" | "rate_limited" => PlatformError::RateLimited { retry_after_secs: 30 },
            "invalid_auth" | "not_authed" | "account_inactive" | "token_revoked" => {
                PlatformError::Auth(detail)
            }
            "channel_not_found" | "not_in_channel" | "is_archived" => PlatformError::Channel(detail),
            "user_not_found" | "user_not_in_channel" | "user_disabled" => PlatformError::User(detail),
            _ => PlatformError::Api(detail),
        }
    }
}

/// Admin command errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    #[error("Unknown extension: {0}")]
    UnknownExtension(String),

    #[error("Permission denied")]
    PermissionDenied,
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlatformError::RateLimited { retry_after_secs: 60 };
        assert_eq!(err.to_string(), "Rate limited: retry after 60 seconds");

        let err: BotError = ConfigError::MissingField("slack.bot-token".to_string()).into();
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing required field: slack.bot-token"
        );
    }

    #[test]
    fn test_api_error_retryable() {
        assert!(SlackApiError::new("chat.postEphemeral", "ratelimited").is_retryable());
        assert!(!SlackApiError::new("chat.postEphemeral", "channel_not_found").is_retryable());
    }

    #[test]
    fn test_api_error_conversion() {
        let err: PlatformError = SlackApiError::new("auth.test", "invalid_auth").into();
        assert!(matches!(err, PlatformError::Auth(_)));

        let err: PlatformError = SlackApiError::new("chat.postEphemeral", "user_not_in_channel").into();
        assert!(matches!(err, PlatformError::User(_)));

        let err: PlatformError = SlackApiError::new("chat.postMessage", "msg_too_long").into();
        assert_eq!(err.to_string(), "Slack API error: chat.postMessage failed: msg_too_long");
    }
}
