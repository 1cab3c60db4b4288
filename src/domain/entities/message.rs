use serde::{Deserialize, Serialize};

/// What kind of message event this is, derived from the Slack subtype
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Posted,
    Changed,
    Deleted,
    Bot,
    Other(String),
}

impl MessageKind {
    pub fn as_str(&self) -> &str {
        match self {
            MessageKind::Posted => "posted",
            MessageKind::Changed => "message_changed",
            MessageKind::Deleted => "message_deleted",
            MessageKind::Bot => "bot_message",
            MessageKind::Other(s) => s,
        }
    }
}

/// An inbound `message` event as delivered by the Events API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Sender; absent on bot and some system messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub channel: String,
    /// im, channel, group or mpim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_type: Option<String>,
    #[serde(default)]
    pub ts: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<String>,
    /// Edited message carried by `message_changed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Box<MessageEvent>>,
    /// Timestamp of the removed message carried by `message_deleted`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_ts: Option<String>,
    /// Copied from the envelope, unix seconds
    #[serde(skip)]
    pub event_time: i64,
}

impl MessageEvent {
    pub fn new(
        user: impl Into<String>,
        channel: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            user: Some(user.into()),
            channel: channel.into(),
            text: text.into(),
            ts: format!("{}.000000", chrono::Utc::now().timestamp()),
            event_time: chrono::Utc::now().timestamp(),
            ..Default::default()
        }
    }

    pub fn with_channel_type(mut self, channel_type: impl Into<String>) -> Self {
        self.channel_type = Some(channel_type.into());
        self
    }

    pub fn with_ts(mut self, ts: impl Into<String>) -> Self {
        self.ts = ts.into();
        self
    }

    pub fn with_thread_ts(mut self, thread_ts: impl Into<String>) -> Self {
        self.thread_ts = Some(thread_ts.into());
        self
    }

    pub fn with_event_time(mut self, event_time: i64) -> Self {
        self.event_time = event_time;
        self
    }

    pub fn kind(&self) -> MessageKind {
        match self.subtype.as_deref() {
            None | Some("thread_broadcast") => MessageKind::Posted,
            Some("message_changed") => MessageKind::Changed,
            Some("message_deleted") => MessageKind::Deleted,
            Some("bot_message") => MessageKind::Bot,
            Some(other) => MessageKind::Other(other.to_string()),
        }
    }

    pub fn is_from_bot(&self) -> bool {
        self.bot_id.is_some() || self.kind() == MessageKind::Bot
    }

    /// Public channels are where configuration must not happen
    pub fn is_public_channel(&self) -> bool {
        self.channel_type.as_deref() == Some("channel")
    }

    pub fn is_direct_message(&self) -> bool {
        self.channel_type.as_deref() == Some("im") || self.channel.starts_with('D')
    }

    /// A reply inside a thread, as opposed to the thread's parent
    pub fn is_thread_reply(&self) -> bool {
        matches!(&self.thread_ts, Some(thread_ts) if *thread_ts != self.ts)
    }

    /// Timestamp that threaded replies should attach to
    pub fn thread_root(&self) -> &str {
        self.thread_ts.as_deref().unwrap_or(&self.ts)
    }
}

/// How an outgoing message is shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Visible to one user only, not kept in channel history
    Ephemeral { user: String },
    /// Public reply inside a thread
    Thread { thread_ts: String },
    /// Plain channel message
    Regular,
}

/// A message the bot wants to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub channel: String,
    pub text: String,
    pub delivery: Delivery,
}

impl OutgoingMessage {
    pub fn regular(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            text: text.into(),
            delivery: Delivery::Regular,
        }
    }

    pub fn ephemeral(
        channel: impl Into<String>,
        user: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            text: text.into(),
            delivery: Delivery::Ephemeral { user: user.into() },
        }
    }

    pub fn in_thread(
        channel: impl Into<String>,
        thread_ts: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            text: text.into(),
            delivery: Delivery::Thread { thread_ts: thread_ts.into() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_slack_message() {
        let json = serde_json::json!({
            "type": "message",
            "user": "U123",
            "text": "Hello python folks",
            "channel": "C456",
            "channel_type": "channel",
            "ts": "1600000000.000100"
        });
        let event: MessageEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.user.as_deref(), Some("U123"));
        assert_eq!(event.kind(), MessageKind::Posted);
        assert!(event.is_public_channel());
        assert!(!event.is_thread_reply());
        assert_eq!(event.thread_root(), "1600000000.000100");
    }

    #[test]
    fn test_message_changed_carries_edit() {
        let json = serde_json::json!({
            "type": "message",
            "subtype": "message_changed",
            "channel": "C456",
            "ts": "1600000001.000000",
            "message": {"user": "U123", "text": "edited", "ts": "1600000000.000100"}
        });
        let event: MessageEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.kind(), MessageKind::Changed);
        assert_eq!(event.message.unwrap().text, "edited");
    }

    #[test]
    fn test_thread_reply_detection() {
        let parent = MessageEvent::new("U1", "C1", "hi")
            .with_ts("10.0")
            .with_thread_ts("10.0");
        assert!(!parent.is_thread_reply());

        let reply = MessageEvent::new("U1", "C1", "hi")
            .with_ts("11.0")
            .with_thread_ts("10.0");
        assert!(reply.is_thread_reply());
        assert_eq!(reply.thread_root(), "10.0");
    }

    #[test]
    fn test_bot_detection() {
        let mut event = MessageEvent::new("U1", "C1", "beep");
        assert!(!event.is_from_bot());
        event.bot_id = Some("B1".to_string());
        assert!(event.is_from_bot());
    }
}
