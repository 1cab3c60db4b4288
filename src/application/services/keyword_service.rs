use std::sync::Arc;
use tokio::sync::RwLock;

use crate::application::errors::{BotError, CommandError, StorageError};
use crate::application::messaging::sanitizer::match_words;
use crate::domain::entities::{
    KeywordRule, KeywordSettings, KeywordsState, MessageEvent, OutgoingMessage,
    SettingKey,
};
use crate::domain::traits::RuleStore;

/// A rule that fired on a message, with its reply already rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordMatch {
    pub trigger: String,
    pub text: String,
}

/// Find the rule whose trigger appears first in `text`.
///
/// Triggers match whole, contiguous, sanitized words. At the same position
/// the longer trigger wins, then the earlier rule.
pub fn find_match<'a>(rules: &'a [KeywordRule], text: &str) -> Option<(&'a KeywordRule, &'a str)> {
    let message = match_words(text);
    if message.is_empty() {
        return None;
    }

    let mut best: Option<(usize, usize, usize, &'a KeywordRule, &'a str)> = None;

    for (order, rule) in rules.iter().enumerate() {
        for trigger in &rule.triggers {
            let needle = match_words(trigger);
            if needle.is_empty() || needle.len() > message.len() {
                continue;
            }
            let Some(start) = message.windows(needle.len()).position(|w| w == needle.as_slice()) else {
                continue;
            };

            let better = match best {
                None => true,
                Some((b_start, b_len, b_order, _, _)) => {
                    (start, std::cmp::Reverse(needle.len()), order)
                        < (b_start, std::cmp::Reverse(b_len), b_order)
                }
            };
            if better {
                best = Some((start, needle.len(), order, rule, trigger.as_str()));
            }
        }
    }

    best.map(|(_, _, _, rule, trigger)| (rule, trigger))
}

/// Messages to send for a matched keyword; empty when every delivery is off
pub fn plan_replies(event: &MessageEvent, text: &str, settings: &KeywordSettings) -> Vec<OutgoingMessage> {
    let mut replies = Vec::with_capacity(2);

    if settings.reply_in_ephemeral {
        if let Some(user) = &event.user {
            replies.push(OutgoingMessage::ephemeral(&event.channel, user, text));
        }
    }
    if settings.reply_in_thread {
        replies.push(OutgoingMessage::in_thread(&event.channel, event.thread_root(), text));
    }

    replies
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Keyword rules, settings and template, kept in memory and persisted on change
pub struct KeywordService {
    state: RwLock<KeywordsState>,
    store: Arc<dyn RuleStore>,
}

impl KeywordService {
    /// Load persisted state from the store
    pub async fn load(store: Arc<dyn RuleStore>) -> Result<Self, StorageError> {
        let state = store.load().await?;
        tracing::info!(
            rules = state.rules.len(),
            "Loaded keyword rules"
        );
        Ok(Self {
            state: RwLock::new(state),
            store,
        })
    }

    /// Match a message and render the reply of the winning rule
    pub async fn match_message(&self, text: &str) -> Option<KeywordMatch> {
        let state = self.state.read().await;
        find_match(&state.rules, text).map(|(rule, trigger)| KeywordMatch {
            trigger: trigger.to_string(),
            text: rule.render(&state.template),
        })
    }

    pub async fn settings(&self) -> KeywordSettings {
        self.state.read().await.settings
    }

    pub async fn snapshot(&self) -> KeywordsState {
        self.state.read().await.clone()
    }

    /// Add a literal reply rule
    pub async fn add_text(&self, keyword: &str, reply: &str) -> Result<(), BotError> {
        let rule = KeywordRule::text(keyword, reply)?;
        self.update(|state| {
            state.upsert(rule);
            Ok(())
        })
        .await
    }

    /// Add a rule rendered through the template
    pub async fn add_channels(&self, keyword: &str, channels: Vec<String>) -> Result<(), BotError> {
        let rule = KeywordRule::channels(keyword, channels)?;
        self.update(|state| {
            state.upsert(rule);
            Ok(())
        })
        .await
    }

    /// Remove a trigger; `Ok(false)` when it did not exist
    pub async fn delete(&self, keyword: &str) -> Result<bool, BotError> {
        let mut removed = false;
        self.update(|state| {
            removed = state.remove_trigger(keyword);
            Ok(())
        })
        .await?;
        Ok(removed)
    }

    pub async fn set_template(&self, template: &str) -> Result<(), BotError> {
        self.update(|state| state.set_template(template)).await
    }

    /// Change a delivery setting from admin-typed key and value
    pub async fn set_setting(&self, key: &str, value: &str) -> Result<(SettingKey, bool), BotError> {
        let key = SettingKey::parse(key)
            .ok_or_else(|| CommandError::UnknownSetting(key.to_string()))?;
        let value = parse_bool(value).ok_or_else(|| {
            CommandError::InvalidArgs(format!("{} is not true or false", value))
        })?;

        self.update(|state| {
            state.settings.set(key, value);
            Ok(())
        })
        .await?;
        Ok((key, value))
    }

    /// Apply a change to a copy, persist it, then make it live
    async fn update<F>(&self, change: F) -> Result<(), BotError>
    where
        F: FnOnce(&mut KeywordsState) -> Result<(), CommandError>,
    {
        let mut state = self.state.write().await;
        let mut next = state.clone();
        change(&mut next)?;
        self.store.save(&next).await?;
        *state = next;
        Ok(())
    }
}
