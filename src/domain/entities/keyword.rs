use serde::{Deserialize, Serialize};
use crate::application::errors::CommandError;
use crate::application::messaging::sanitizer::normalize_trigger;

/// Placeholder replaced by the channel list in the shared template
pub const CHANNELS_PLACEHOLDER: &str = "{channels}";

const DEFAULT_TEMPLATE: &str = "Hello and welcome!\n\
Projects are organized in channels by skill.\n\
Based on your message, you can join {channels}\n\
--\n\
_Note: I'm a bot (bleep blop!). I can get things wrong; if I'm bothering you, contact a moderator._";

/// What the bot answers when a rule matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordReply {
    /// Literal message
    Text(String),
    /// Channel references rendered through the shared template
    Channels(Vec<String>),
}

/// One or more trigger phrases paired with a reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub triggers: Vec<String>,
    pub reply: KeywordReply,
}

impl KeywordRule {
    /// Triggers are stored in the form messages are matched in
    pub fn new(triggers: Vec<String>, reply: KeywordReply) -> Result<Self, CommandError> {
        let mut normalized: Vec<String> = Vec::with_capacity(triggers.len());
        for trigger in &triggers {
            let trigger = normalize_trigger(trigger);
            if trigger.is_empty() {
                return Err(CommandError::InvalidArgs("trigger text must not be empty".to_string()));
            }
            if !normalized.contains(&trigger) {
                normalized.push(trigger);
            }
        }
        if normalized.is_empty() {
            return Err(CommandError::InvalidArgs("trigger text must not be empty".to_string()));
        }
        Ok(Self { triggers: normalized, reply })
    }

    pub fn text(trigger: impl Into<String>, text: impl Into<String>) -> Result<Self, CommandError> {
        Self::new(vec![trigger.into()], KeywordReply::Text(text.into()))
    }

    pub fn channels(trigger: impl Into<String>, channels: Vec<String>) -> Result<Self, CommandError> {
        if channels.is_empty() {
            return Err(CommandError::InvalidArgs("at least one channel is required".to_string()));
        }
        Self::new(vec![trigger.into()], KeywordReply::Channels(channels))
    }

    pub fn has_trigger(&self, trigger: &str) -> bool {
        let wanted = normalize_trigger(trigger);
        self.triggers.iter().any(|t| normalize_trigger(t) == wanted)
    }

    /// Reply text for this rule, rendering template rules with `template`
    pub fn render(&self, template: &str) -> String {
        match &self.reply {
            KeywordReply::Text(text) => text.clone(),
            KeywordReply::Channels(channels) => {
                // Slack links (<#C123|name>) already carry their '#'
                let list: Vec<String> = channels
                    .iter()
                    .map(|c| if c.contains('#') { c.clone() } else { format!("#{}", c) })
                    .collect();
                template.replace(CHANNELS_PLACEHOLDER, &list.join(" "))
            }
        }
    }
}

/// Delivery behavior that admins can change at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordSettings {
    pub reply_in_ephemeral: bool,
    pub reply_in_thread: bool,
    pub reply_to_keywords_by_admins: bool,
    pub reply_to_replies: bool,
}

impl Default for KeywordSettings {
    fn default() -> Self {
        Self {
            reply_in_ephemeral: true,
            reply_in_thread: false,
            reply_to_keywords_by_admins: true,
            reply_to_replies: false,
        }
    }
}

/// Names of the settings as typed by admins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    ReplyInEphemeral,
    ReplyInThread,
    ReplyToKeywordsByAdmins,
    ReplyToReplies,
}

impl SettingKey {
    pub const ALL: [SettingKey; 4] = [
        SettingKey::ReplyInEphemeral,
        SettingKey::ReplyInThread,
        SettingKey::ReplyToKeywordsByAdmins,
        SettingKey::ReplyToReplies,
    ];

    pub fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::ReplyInEphemeral => "reply_in_ephemeral",
            SettingKey::ReplyInThread => "reply_in_thread",
            SettingKey::ReplyToKeywordsByAdmins => "reply_to_keywords_by_admins",
            SettingKey::ReplyToReplies => "reply_to_replies",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SettingKey::ReplyInEphemeral => "The bot will reply privately.",
            SettingKey::ReplyInThread => "The bot will reply publicly inside a thread.",
            SettingKey::ReplyToKeywordsByAdmins => "The bot will reply to admins if they say keywords.",
            SettingKey::ReplyToReplies => {
                "The bot will reply to replies in threads (false = top-level messages only)."
            }
        }
    }
}

impl KeywordSettings {
    pub fn get(&self, key: SettingKey) -> bool {
        match key {
            SettingKey::ReplyInEphemeral => self.reply_in_ephemeral,
            SettingKey::ReplyInThread => self.reply_in_thread,
            SettingKey::ReplyToKeywordsByAdmins => self.reply_to_keywords_by_admins,
            SettingKey::ReplyToReplies => self.reply_to_replies,
        }
    }

    pub fn set(&mut self, key: SettingKey, value: bool) {
        match key {
            SettingKey::ReplyInEphemeral => self.reply_in_ephemeral = value,
            SettingKey::ReplyInThread => self.reply_in_thread = value,
            SettingKey::ReplyToKeywordsByAdmins => self.reply_to_keywords_by_admins = value,
            SettingKey::ReplyToReplies => self.reply_to_replies = value,
        }
    }
}

/// Everything the keyword extension persists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordsState {
    pub rules: Vec<KeywordRule>,
    pub settings: KeywordSettings,
    pub template: String,
}

impl Default for KeywordsState {
    fn default() -> Self {
        Self {
            rules: Vec::new(),
            settings: KeywordSettings::default(),
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

impl KeywordsState {
    /// Add a rule, taking its triggers away from any older rule
    pub fn upsert(&mut self, rule: KeywordRule) {
        for trigger in &rule.triggers {
            self.detach_trigger(trigger);
        }
        self.rules.push(rule);
    }

    /// Remove a trigger; returns false if no rule had it
    pub fn remove_trigger(&mut self, trigger: &str) -> bool {
        self.detach_trigger(trigger)
    }

    /// Triggers compare in normalized form, so `Café` and `cafe` are one trigger
    fn detach_trigger(&mut self, trigger: &str) -> bool {
        let wanted = normalize_trigger(trigger);
        let mut found = false;
        for rule in &mut self.rules {
            let before = rule.triggers.len();
            rule.triggers.retain(|t| normalize_trigger(t) != wanted);
            found |= rule.triggers.len() != before;
        }
        // A rule without triggers can never fire
        self.rules.retain(|r| !r.triggers.is_empty());
        found
    }

    pub fn set_template(&mut self, template: impl Into<String>) -> Result<(), CommandError> {
        let template = template.into();
        if !template.contains(CHANNELS_PLACEHOLDER) {
            return Err(CommandError::InvalidArgs(format!(
                "template must contain {}",
                CHANNELS_PLACEHOLDER
            )));
        }
        self.template = template;
        Ok(())
    }

    pub fn find_rule(&self, trigger: &str) -> Option<&KeywordRule> {
        self.rules.iter().find(|r| r.has_trigger(trigger))
    }
}
