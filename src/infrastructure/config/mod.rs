//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::application::errors::ConfigError;

/// Bot configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub server: ServerConfig,
    pub slack: SlackConfig,
    pub extensions: ExtensionsConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    pub name: String,
    /// Name shown on posted messages
    pub username: Option<String>,
    /// Emoji used as avatar on posted messages, e.g. `:robot_face:`
    pub icon_emoji: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Path Slack posts events to
    pub api_endpoint: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SlackConfig {
    pub bot_token: Option<String>,
    pub signing_secret: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ExtensionsConfig {
    pub keywords: KeywordsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct KeywordsConfig {
    pub enabled: bool,
    pub store_path: PathBuf,
    /// Channel ids the extension is limited to; empty means everywhere
    pub channels: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SecurityConfig {
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_seconds: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "modbot".to_string(),
            username: None,
            icon_emoji: Some(":robot_face:".to_string()),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            api_endpoint: "/slack/events".to_string(),
        }
    }
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            signing_secret: None,
            api_base: "https://slack.com/api".to_string(),
        }
    }
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            store_path: PathBuf::from("modbot_keywords.json"),
            channels: Vec::new(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 20,
            window_seconds: 60,
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_env() -> Self {
        let mut config = Config::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Environment values win over the file
    pub fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(token) = var("SLACK_BOT_TOKEN") {
            self.slack.bot_token = Some(token);
        }
        if let Some(secret) = var("SLACK_SIGNING_SECRET") {
            self.slack.signing_secret = Some(secret);
        }
        if let Some(username) = var("SLACK_BOT_USERNAME") {
            self.bot.username = Some(username);
        }
        if let Some(host) = var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid PORT value: {}", port),
            }
        }
    }

    /// Check what the webhook server cannot run without
    pub fn validate(&self) -> Result<(), ConfigError> {
        let present = |v: &Option<String>| v.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false);

        if !present(&self.slack.bot_token) {
            return Err(ConfigError::MissingField("slack.bot-token".to_string()));
        }
        if !present(&self.slack.signing_secret) {
            return Err(ConfigError::MissingField("slack.signing-secret".to_string()));
        }
        if !self.server.api_endpoint.starts_with('/') {
            return Err(ConfigError::InvalidValue(format!(
                "server.api-endpoint must start with '/': {}",
                self.server.api_endpoint
            )));
        }
        if self.security.rate_limit.max_requests == 0 {
            return Err(ConfigError::InvalidValue(
                "security.rate-limit.max-requests must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Default configuration as YAML, for `init-config`
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
