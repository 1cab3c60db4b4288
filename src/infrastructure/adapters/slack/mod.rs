//! Slack adapter - Web API client used to answer events

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::application::errors::{PlatformError, SlackApiError};
use crate::domain::entities::{Delivery, OutgoingMessage, User};
use crate::domain::traits::{BotInfo, ChatPlatform};
use crate::infrastructure::config::Config;

/// Slack API base URL
pub const API_BASE: &str = "https://slack.com/api";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct AuthTestResponse {
    user_id: String,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    team: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PostResponse {
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    message_ts: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenResponse {
    channel: ChannelRef,
}

#[derive(Debug, Deserialize)]
struct ChannelRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    user: SlackUser,
}

/// Member object as returned by `users.info`
#[derive(Debug, Deserialize)]
struct SlackUser {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    real_name: Option<String>,
    #[serde(default)]
    is_admin: bool,
    #[serde(default)]
    is_owner: bool,
    #[serde(default)]
    is_bot: bool,
    #[serde(default)]
    profile: Option<SlackProfile>,
}

#[derive(Debug, Deserialize)]
struct SlackProfile {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    real_name: Option<String>,
}

impl From<SlackUser> for User {
    fn from(u: SlackUser) -> Self {
        let profile = u.profile.unwrap_or(SlackProfile { display_name: None, real_name: None });
        User {
            id: u.id,
            name: u.name,
            real_name: u.real_name.or(profile.real_name),
            display_name: profile.display_name,
            is_admin: u.is_admin,
            is_owner: u.is_owner,
            is_bot: u.is_bot,
        }
    }
}

/// Slack Web API adapter
pub struct SlackAdapter {
    token: String,
    api_base: String,
    username: Option<String>,
    icon_emoji: Option<String>,
    client: Client,
}

impl SlackAdapter {
    pub fn new(token: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            token: token.into(),
            api_base: API_BASE.to_string(),
            username: None,
            icon_emoji: None,
            client,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut adapter = Self::new(config.slack.bot_token.clone().unwrap_or_default())
            .with_api_base(config.slack.api_base.clone());
        adapter.username = config.bot.username.clone();
        adapter.icon_emoji = config.bot.icon_emoji.clone();
        adapter
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_identity(mut self, username: Option<String>, icon_emoji: Option<String>) -> Self {
        self.username = username;
        self.icon_emoji = icon_emoji;
        self
    }

    /// Get the API URL for a method
    fn api_url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }

    /// Method and JSON body for an outgoing message
    fn message_payload(&self, message: &OutgoingMessage) -> (&'static str, Value) {
        let mut payload = json!({
            "channel": message.channel,
            "text": message.text,
        });

        let method = match &message.delivery {
            Delivery::Ephemeral { user } => {
                payload["user"] = json!(user);
                "chat.postEphemeral"
            }
            Delivery::Thread { thread_ts } => {
                payload["thread_ts"] = json!(thread_ts);
                "chat.postMessage"
            }
            Delivery::Regular => "chat.postMessage",
        };

        if let Some(username) = &self.username {
            payload["username"] = json!(username);
        }
        if let Some(icon) = &self.icon_emoji {
            payload["icon_emoji"] = json!(icon);
        }

        (method, payload)
    }

    /// POST a JSON body to a Web API method
    async fn api_call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        payload: &Value,
    ) -> Result<T, PlatformError> {
        let response = self
            .client
            .post(self.api_url(method))
            .bearer_auth(&self.token)
            .header("Content-Type", "application/json; charset=utf-8")
            .json(payload)
            .send()
            .await?;

        Self::read_response(method, response).await
    }

    /// POST form parameters, for read methods that do not take JSON
    async fn api_form<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, &str)],
    ) -> Result<T, PlatformError> {
        let response = self
            .client
            .post(self.api_url(method))
            .bearer_auth(&self.token)
            .form(params)
            .send()
            .await?;

        Self::read_response(method, response).await
    }

    async fn read_response<T: serde::de::DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<T, PlatformError> {
        // Check for rate limiting
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(30);
            return Err(PlatformError::RateLimited { retry_after_secs: retry_after });
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::Api(format!("{} returned {}: {}", method, status, body)));
        }

        let body: Value = response.json().await?;
        Self::check_ok(method, body)
    }

    /// Turn an `ok: false` envelope into a typed error
    fn check_ok<T: serde::de::DeserializeOwned>(method: &str, body: Value) -> Result<T, PlatformError> {
        if body.get("ok").and_then(Value::as_bool) != Some(true) {
            let code = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error");
            return Err(SlackApiError::new(method, code).into());
        }

        if let Some(warning) = body.get("warning").and_then(Value::as_str) {
            tracing::debug!("{} warning: {}", method, warning);
        }

        Ok(serde_json::from_value(body)?)
    }
}

#[async_trait]
impl ChatPlatform for SlackAdapter {
    async fn identify(&self) -> Result<BotInfo, PlatformError> {
        let auth: AuthTestResponse = self.api_call("auth.test", &json!({})).await?;
        tracing::info!("Authenticated as bot user: {}", auth.user_id);

        Ok(BotInfo {
            name: auth.user.unwrap_or_else(|| auth.user_id.clone()),
            user_id: auth.user_id,
            team: auth.team,
        })
    }

    async fn send(&self, message: &OutgoingMessage) -> Result<Option<String>, PlatformError> {
        let (method, payload) = self.message_payload(message);
        let posted: PostResponse = self.api_call(method, &payload).await?;
        Ok(posted.ts.or(posted.message_ts))
    }

    async fn open_direct(&self, user_id: &str) -> Result<String, PlatformError> {
        let opened: OpenResponse = self
            .api_call("conversations.open", &json!({ "users": user_id, "return_im": true }))
            .await?;
        Ok(opened.channel.id)
    }

    async fn user_info(&self, user_id: &str) -> Result<User, PlatformError> {
        let info: UserInfoResponse = self.api_form("users.info", &[("user", user_id)]).await?;
        Ok(info.user.into())
    }
}
