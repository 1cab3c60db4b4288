//! Console adapter for development/testing

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

use crate::application::errors::{BotError, PlatformError};
use crate::application::messaging::EventDispatcher;
use crate::domain::entities::{Delivery, MessageEvent, OutgoingMessage, User};
use crate::domain::traits::{BotInfo, ChatPlatform};

pub const LOCAL_USER: &str = "ULOCAL";
pub const PUBLIC_CHANNEL: &str = "CLOCAL";
pub const DIRECT_CHANNEL: &str = "DLOCAL";

/// Console platform for local development: replies are printed, the local user is an admin
pub struct ConsoleAdapter {
    sender: Option<mpsc::UnboundedSender<String>>,
}

impl ConsoleAdapter {
    pub fn new() -> Self {
        Self { sender: None }
    }

    /// Send rendered replies to a channel instead of stdout
    pub fn with_sender(mut self, sender: mpsc::UnboundedSender<String>) -> Self {
        self.sender = Some(sender);
        self
    }

    fn render(message: &OutgoingMessage) -> String {
        match &message.delivery {
            Delivery::Ephemeral { user } => {
                format!("[BOT -> {} only, #{}] {}", user, message.channel, message.text)
            }
            Delivery::Thread { thread_ts } => {
                format!("[BOT in thread {}, #{}] {}", thread_ts, message.channel, message.text)
            }
            Delivery::Regular => format!("[BOT #{}] {}", message.channel, message.text),
        }
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatPlatform for ConsoleAdapter {
    async fn identify(&self) -> Result<BotInfo, PlatformError> {
        Ok(BotInfo {
            user_id: "UCONSOLEBOT".to_string(),
            name: "modbot".to_string(),
            team: None,
        })
    }

    async fn send(&self, message: &OutgoingMessage) -> Result<Option<String>, PlatformError> {
        let line = Self::render(message);
        match &self.sender {
            Some(sender) => sender
                .send(line)
                .map_err(|e| PlatformError::Network(e.to_string()))?,
            None => println!("{}", line),
        }
        Ok(None)
    }

    async fn open_direct(&self, user_id: &str) -> Result<String, PlatformError> {
        if user_id == LOCAL_USER {
            Ok(DIRECT_CHANNEL.to_string())
        } else {
            Err(PlatformError::User(format!("no console user {}", user_id)))
        }
    }

    async fn user_info(&self, user_id: &str) -> Result<User, PlatformError> {
        let user = User::new(user_id).with_display_name("local");
        Ok(if user_id == LOCAL_USER { user.as_owner() } else { user })
    }
}

/// Turn a typed line into an event: `/im <text>` is a direct message, anything else public
pub fn line_to_event(line: &str) -> MessageEvent {
    match line.strip_prefix("/im ") {
        Some(text) => MessageEvent::new(LOCAL_USER, DIRECT_CHANNEL, text).with_channel_type("im"),
        None => MessageEvent::new(LOCAL_USER, PUBLIC_CHANNEL, line).with_channel_type("channel"),
    }
}

/// Feed lines from `input` to the dispatcher until EOF or `/quit`
pub async fn run_simulation<R>(dispatcher: &EventDispatcher, input: R) -> Result<usize, BotError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    let mut handled = 0;

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| BotError::Internal(format!("Failed to read input: {}", e)))?
    {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            break;
        }

        let outcome = dispatcher.dispatch(line_to_event(line)).await?;
        tracing::debug!("{:?}", outcome);
        handled += 1;
    }

    Ok(handled)
}
