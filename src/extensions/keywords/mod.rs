//! Keywords extension - redirects people to the right channel
//!
//! Scans messages for configured keywords and answers, privately by
//! default, with the reply of the matching rule. Admins manage the rules
//! with `keyword ...` commands sent to the bot in a direct message.

pub mod replies;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::errors::{BotError, CommandError};
use crate::application::messaging::parser::{CommandParser, KeywordCommand};
use crate::application::services::{
    keyword_service::plan_replies, KeywordService, UserDirectory,
};
use crate::domain::entities::{MessageEvent, OutgoingMessage};
use crate::domain::traits::ChatPlatform;
use crate::extensions::trait_def::Extension;

pub const NAME: &str = "Keywords";

pub struct KeywordsExtension {
    service: Arc<KeywordService>,
    users: Arc<UserDirectory>,
    platform: Arc<dyn ChatPlatform>,
    parser: CommandParser,
}

impl KeywordsExtension {
    pub fn new(
        service: Arc<KeywordService>,
        users: Arc<UserDirectory>,
        platform: Arc<dyn ChatPlatform>,
    ) -> Self {
        Self {
            service,
            users,
            platform,
            parser: CommandParser::new("keyword", "modbot"),
        }
    }

    /// Admin typed a command in a public channel: answer in a direct message instead
    async fn switch_to_im(&self, user: &str) -> Result<bool, BotError> {
        let channel = match self.platform.open_direct(user).await {
            Ok(channel) => channel,
            Err(e) => {
                warn!(user = %user, "Could not open IM, command dropped: {}", e);
                return Ok(false);
            }
        };
        self.platform
            .send(&OutgoingMessage::regular(channel, replies::CONFIG_IN_PUBLIC))
            .await?;
        Ok(true)
    }

    /// Execute a command and build the answer shown to the admin
    async fn execute(&self, command: KeywordCommand, who: &str) -> String {
        let result = match command {
            KeywordCommand::List => {
                info!("[Keyword] List viewed by {}", who);
                return replies::keyword_list(&self.service.snapshot().await);
            }
            KeywordCommand::Help => {
                info!("[Keyword] Help viewed by {}", who);
                return replies::HELP.to_string();
            }
            KeywordCommand::ConfigList => {
                info!("[Keyword] Config list viewed by {}", who);
                return replies::config_list(&self.service.settings().await);
            }
            KeywordCommand::Add { keyword, reply } => self
                .service
                .add_text(&keyword, &reply)
                .await
                .map(|_| {
                    info!("[Keyword] New keyword {} by {}", keyword, who);
                    replies::add_confirmation(&keyword)
                }),
            KeywordCommand::QuickAdd { keyword, channels } => self
                .service
                .add_channels(&keyword, channels)
                .await
                .map(|_| {
                    info!("[Keyword] New quick keyword {} by {}", keyword, who);
                    replies::add_confirmation(&keyword)
                }),
            KeywordCommand::Template { text } => self
                .service
                .set_template(&text)
                .await
                .map(|_| {
                    info!("[Keyword] New template by {}", who);
                    replies::TEMPLATE_CONFIRMATION.to_string()
                }),
            KeywordCommand::Delete { keyword } => {
                self.service.delete(&keyword).await.map(|removed| {
                    if removed {
                        info!("[Keyword] Keyword {} deleted by {}", keyword, who);
                        replies::delete_confirmation(&keyword)
                    } else {
                        replies::DELETE_MISSING.to_string()
                    }
                })
            }
            KeywordCommand::Config { key, value } => self
                .service
                .set_setting(&key, &value)
                .await
                .map(|(key, value)| {
                    info!("[Keyword] {} set to {} by {}", key.as_str(), value, who);
                    replies::CONFIG_CONFIRMATION.to_string()
                }),
        };

        result.unwrap_or_else(|e| Self::error_reply(&e))
    }

    fn error_reply(err: &BotError) -> String {
        match err {
            BotError::Command(CommandError::UnknownSetting(_)) => replies::CONFIG_UNKNOWN_KEY.to_string(),
            BotError::Command(CommandError::InvalidArgs(detail)) => replies::not_understood(detail),
            other => {
                warn!("[Keyword] Command failed: {}", other);
                replies::SAVE_FAILED.to_string()
            }
        }
    }

    /// Look for a keyword and send the reply; returns whether anything was sent
    async fn reply_to_keywords(&self, event: &MessageEvent, user: &str, is_admin: bool) -> Result<bool, BotError> {
        let settings = self.service.settings().await;

        if is_admin && !settings.reply_to_keywords_by_admins {
            return Ok(false);
        }
        if event.is_thread_reply() && !settings.reply_to_replies {
            return Ok(false);
        }

        let Some(found) = self.service.match_message(&event.text).await else {
            return Ok(false);
        };

        let outgoing = plan_replies(event, &found.text, &settings);
        if outgoing.is_empty() {
            debug!("[Keyword] {} matched but every delivery is disabled", found.trigger);
            return Ok(false);
        }

        for message in &outgoing {
            self.platform.send(message).await?;
        }

        // Replies go out before the name lookup, which may call users.info
        let who = self.users.display_name(user).await;
        info!(channel = %event.channel, "[Keyword] Keyword {} sent by {}", found.trigger, who);
        Ok(true)
    }
}

#[async_trait]
impl Extension for KeywordsExtension {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Redirects users to channels based on keywords"
    }

    async fn on_message(&self, event: &MessageEvent) -> Result<bool, BotError> {
        let Some(user) = event.user.as_deref() else {
            return Ok(false);
        };

        let settings = self.service.settings().await;
        let is_command = self.parser.is_keyword_command(&event.text);

        // Only look the user up when the answer depends on it
        let is_admin = if is_command || !settings.reply_to_keywords_by_admins {
            self.users.is_admin_or_owner(user).await
        } else {
            false
        };

        if is_command && is_admin {
            if event.is_public_channel() {
                return self.switch_to_im(user).await;
            }

            let who = self.users.display_name(user).await;
            let answer = match self.parser.parse_keyword(&event.text) {
                Some(Ok(command)) => self.execute(command, &who).await,
                Some(Err(e)) => Self::error_reply(&BotError::Command(e)),
                None => return Ok(false),
            };
            self.platform
                .send(&OutgoingMessage::regular(&event.channel, answer))
                .await?;
            return Ok(true);
        }

        self.reply_to_keywords(event, user, is_admin).await
    }
}
