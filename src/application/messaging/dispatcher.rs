//! Event dispatcher - Routes Slack message events to extensions

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::middleware::{Context, MiddlewareChain, MiddlewareError};
use super::parser::{AdminCommand, CommandParser};
use crate::application::errors::BotError;
use crate::application::services::UserDirectory;
use crate::domain::entities::{MessageEvent, MessageKind, OutgoingMessage};
use crate::domain::traits::ChatPlatform;
use crate::extensions::ExtensionManager;

const ADMIN_HELP: &str = "Bot controls (admin only!):\n\
- Type *modbot status* to list extensions\n\
- Type *modbot enable* _extension_ or *modbot disable* _extension_ to turn one on or off";

/// What happened to an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Dropped before reaching any extension
    Ignored(&'static str),
    /// An edit or removal, forwarded to this many extensions
    Forwarded(usize),
    /// A `modbot ...` control command was answered
    Admin,
    /// Passed to this many extensions; `replied` if any answered
    Handled { extensions: usize, replied: bool },
}

/// Routes message events through middleware to extensions
pub struct EventDispatcher {
    started_at: i64,
    bot_user_id: String,
    platform: Arc<dyn ChatPlatform>,
    users: Arc<UserDirectory>,
    extensions: Arc<ExtensionManager>,
    middleware: MiddlewareChain,
    parser: CommandParser,
}

impl EventDispatcher {
    pub fn new(
        bot_user_id: impl Into<String>,
        platform: Arc<dyn ChatPlatform>,
        users: Arc<UserDirectory>,
        extensions: Arc<ExtensionManager>,
    ) -> Self {
        Self {
            started_at: chrono::Utc::now().timestamp(),
            bot_user_id: bot_user_id.into(),
            platform,
            users,
            extensions,
            middleware: MiddlewareChain::new(),
            parser: CommandParser::new("keyword", "modbot"),
        }
    }

    /// Add middleware to the inbound chain
    pub fn with_middleware(mut self, middleware: MiddlewareChain) -> Self {
        self.middleware = middleware;
        self
    }

    /// Events older than this (unix seconds) are ignored
    pub fn with_start_time(mut self, started_at: i64) -> Self {
        self.started_at = started_at;
        self
    }

    pub fn started_at(&self) -> i64 {
        self.started_at
    }

    pub fn extensions(&self) -> &ExtensionManager {
        &self.extensions
    }

    /// Process one message event
    pub async fn dispatch(&self, event: MessageEvent) -> Result<Dispatch, BotError> {
        if event.event_time < self.started_at {
            debug!(ts = %event.ts, "Ignoring event from before startup");
            return Ok(Dispatch::Ignored("stale"));
        }

        match event.kind() {
            MessageKind::Deleted => return Ok(self.forward_deleted(&event).await),
            MessageKind::Changed => return Ok(self.forward_changed(&event).await),
            _ => {}
        }

        if event.is_from_bot() || event.user.as_deref() == Some(self.bot_user_id.as_str()) {
            return Ok(Dispatch::Ignored("bot message"));
        }
        if event.user.is_none() || event.text.trim().is_empty() {
            return Ok(Dispatch::Ignored("no user or text"));
        }

        let ctx = match self.middleware.run(Context::new(event)) {
            Ok(ctx) => ctx,
            Err(MiddlewareError::RateLimited { retry_after }) => {
                info!("Dropping message, sender rate limited for {:?}", retry_after);
                return Ok(Dispatch::Ignored("rate limited"));
            }
            Err(MiddlewareError::Blocked(reason)) => {
                debug!("Message blocked: {}", reason);
                return Ok(Dispatch::Ignored("blocked"));
            }
            Err(MiddlewareError::Internal(msg)) => return Err(BotError::Internal(msg)),
        };
        let event = ctx.event;

        if let Some(command) = self.parser.parse_admin(&event.text) {
            if event.is_direct_message() {
                if let Some(user) = event.user.as_deref() {
                    if self.users.is_admin_or_owner(user).await {
                        self.run_admin(command, &event).await?;
                        return Ok(Dispatch::Admin);
                    }
                }
            }
        }

        let active = self.extensions.active_for(&event);
        let mut replied = false;
        for extension in &active {
            match extension.on_message(&event).await {
                Ok(answered) => replied |= answered,
                Err(e) => warn!(extension = extension.name(), "Extension failed on message: {}", e),
            }
        }

        Ok(Dispatch::Handled { extensions: active.len(), replied })
    }

    async fn forward_deleted(&self, event: &MessageEvent) -> Dispatch {
        let active = self.extensions.active_for(event);
        for extension in &active {
            if let Err(e) = extension.on_message_deleted(event).await {
                warn!(extension = extension.name(), "Extension failed on deletion: {}", e);
            }
        }
        Dispatch::Forwarded(active.len())
    }

    async fn forward_changed(&self, event: &MessageEvent) -> Dispatch {
        let active = self.extensions.active_for(event);
        for extension in &active {
            if let Err(e) = extension.on_message_changed(event).await {
                warn!(extension = extension.name(), "Extension failed on edit: {}", e);
            }
        }
        Dispatch::Forwarded(active.len())
    }

    async fn run_admin(&self, command: AdminCommand, event: &MessageEvent) -> Result<(), BotError> {
        let text = match command {
            AdminCommand::Status => {
                let lines: Vec<String> = self.extensions.list().iter().map(|e| e.to_string()).collect();
                format!("Extensions:\n{}", lines.join("\n"))
            }
            AdminCommand::Enable(name) => match self.extensions.enable(&name) {
                Ok(name) => format!("{} is now enabled", name),
                Err(e) => e.to_string(),
            },
            AdminCommand::Disable(name) => match self.extensions.disable(&name) {
                Ok(name) => format!("{} is now disabled", name),
                Err(e) => e.to_string(),
            },
            AdminCommand::Help => ADMIN_HELP.to_string(),
        };

        self.platform
            .send(&OutgoingMessage::regular(&event.channel, text))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use crate::application::errors::PlatformError;
    use crate::application::messaging::middleware::RateLimitMiddleware;
    use crate::domain::entities::User;
    use crate::domain::traits::BotInfo;
    use crate::extensions::Extension;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<OutgoingMessage>>,
    }

    #[async_trait]
    impl ChatPlatform for Recorder {
        async fn identify(&self) -> Result<BotInfo, PlatformError> {
            Ok(BotInfo { user_id: "UBOT".into(), name: "modbot".into(), team: None })
        }

        async fn send(&self, message: &OutgoingMessage) -> Result<Option<String>, PlatformError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(None)
        }

        async fn open_direct(&self, user_id: &str) -> Result<String, PlatformError> {
            Ok(format!("D{}", user_id))
        }

        async fn user_info(&self, user_id: &str) -> Result<User, PlatformError> {
            let user = User::new(user_id);
            Ok(if user_id == "UADMIN" { user.as_owner() } else { user })
        }
    }

    #[derive(Default)]
    struct Counter {
        posted: AtomicUsize,
        changed: AtomicUsize,
        deleted: AtomicUsize,
    }

    #[async_trait]
    impl Extension for Counter {
        fn name(&self) -> &str {
            "Counter"
        }

        fn description(&self) -> &str {
            "counts events"
        }

        async fn on_message(&self, _event: &MessageEvent) -> Result<bool, BotError> {
            self.posted.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }

        async fn on_message_changed(&self, _event: &MessageEvent) -> Result<(), BotError> {
            self.changed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn on_message_deleted(&self, _event: &MessageEvent) -> Result<(), BotError> {
            self.deleted.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn setup() -> (EventDispatcher, Arc<Recorder>, Arc<Counter>) {
        let platform = Arc::new(Recorder::default());
        let counter = Arc::new(Counter::default());
        let mut manager = ExtensionManager::new();
        manager.register(counter.clone(), vec![]).unwrap();

        let users = Arc::new(UserDirectory::new(platform.clone()));
        let dispatcher = EventDispatcher::new("UBOT", platform.clone(), users, Arc::new(manager))
            .with_start_time(100);
        (dispatcher, platform, counter)
    }

    fn message(user: &str, text: &str) -> MessageEvent {
        MessageEvent::new(user, "C1", text).with_event_time(200)
    }

    #[tokio::test]
    async fn test_routes_new_messages() {
        let (dispatcher, _, counter) = setup();
        let result = dispatcher.dispatch(message("U1", "hello")).await.unwrap();
        assert_eq!(result, Dispatch::Handled { extensions: 1, replied: true });
        assert_eq!(counter.posted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ignores_stale_own_and_empty() {
        let (dispatcher, _, counter) = setup();

        let stale = message("U1", "hello").with_event_time(50);
        assert_eq!(dispatcher.dispatch(stale).await.unwrap(), Dispatch::Ignored("stale"));

        let own = message("UBOT", "hello");
        assert_eq!(dispatcher.dispatch(own).await.unwrap(), Dispatch::Ignored("bot message"));

        let mut bot = message("U1", "hello");
        bot.bot_id = Some("B1".to_string());
        assert_eq!(dispatcher.dispatch(bot).await.unwrap(), Dispatch::Ignored("bot message"));

        let empty = message("U1", "   ");
        assert_eq!(dispatcher.dispatch(empty).await.unwrap(), Dispatch::Ignored("no user or text"));

        assert_eq!(counter.posted.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_routes_edits_and_deletions() {
        let (dispatcher, _, counter) = setup();

        let mut changed = MessageEvent::default().with_event_time(200);
        changed.channel = "C1".to_string();
        changed.subtype = Some("message_changed".to_string());
        assert_eq!(dispatcher.dispatch(changed).await.unwrap(), Dispatch::Forwarded(1));

        let mut deleted = MessageEvent::default().with_event_time(200);
        deleted.channel = "C1".to_string();
        deleted.subtype = Some("message_deleted".to_string());
        dispatcher.dispatch(deleted).await.unwrap();

        assert_eq!(counter.changed.load(Ordering::SeqCst), 1);
        assert_eq!(counter.deleted.load(Ordering::SeqCst), 1);
        assert_eq!(counter.posted.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rate_limited_sender_is_dropped() {
        let (dispatcher, _, counter) = setup();
        let dispatcher = dispatcher.with_middleware(
            MiddlewareChain::new().add(RateLimitMiddleware::new(1, 60)),
        );

        dispatcher.dispatch(message("U1", "one")).await.unwrap();
        let second = dispatcher.dispatch(message("U1", "two")).await.unwrap();
        assert_eq!(second, Dispatch::Ignored("rate limited"));
        assert_eq!(counter.posted.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_admin_disables_extension_from_im() {
        let (dispatcher, platform, counter) = setup();

        let disable = MessageEvent::new("UADMIN", "DADMIN", "modbot disable counter")
            .with_channel_type("im")
            .with_event_time(200);
        assert_eq!(dispatcher.dispatch(disable).await.unwrap(), Dispatch::Admin);
        assert_eq!(platform.sent.lock().unwrap()[0].text, "Counter is now disabled");

        let result = dispatcher.dispatch(message("U1", "hello")).await.unwrap();
        assert_eq!(result, Dispatch::Handled { extensions: 0, replied: false });
        assert_eq!(counter.posted.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_admin_commands_need_admin_in_im() {
        let (dispatcher, platform, counter) = setup();

        // Not an admin: just a message
        let event = MessageEvent::new("U1", "D1", "modbot disable counter")
            .with_channel_type("im")
            .with_event_time(200);
        assert!(matches!(dispatcher.dispatch(event).await.unwrap(), Dispatch::Handled { .. }));

        // Admin, but in public
        let event = message("UADMIN", "modbot status").with_channel_type("channel");
        assert!(matches!(dispatcher.dispatch(event).await.unwrap(), Dispatch::Handled { .. }));

        assert!(platform.sent.lock().unwrap().is_empty());
        assert!(dispatcher.extensions().is_enabled("Counter"));
        assert_eq!(counter.posted.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_restricted_extension_still_hears_direct_messages() {
        let platform = Arc::new(Recorder::default());
        let counter = Arc::new(Counter::default());
        let mut manager = ExtensionManager::new();
        manager.register(counter.clone(), vec!["CWELCOME".to_string()]).unwrap();
        let users = Arc::new(UserDirectory::new(platform.clone()));
        let dispatcher = EventDispatcher::new("UBOT", platform, users, Arc::new(manager))
            .with_start_time(100);

        let elsewhere = MessageEvent::new("U1", "CRANDOM", "python").with_channel_type("channel").with_event_time(200);
        assert_eq!(
            dispatcher.dispatch(elsewhere).await.unwrap(),
            Dispatch::Handled { extensions: 0, replied: false }
        );

        let welcome = MessageEvent::new("U1", "CWELCOME", "python").with_channel_type("channel").with_event_time(200);
        assert_eq!(
            dispatcher.dispatch(welcome).await.unwrap(),
            Dispatch::Handled { extensions: 1, replied: true }
        );

        let im = MessageEvent::new("UADMIN", "DADMIN", "keyword list").with_channel_type("im").with_event_time(200);
        assert_eq!(
            dispatcher.dispatch(im).await.unwrap(),
            Dispatch::Handled { extensions: 1, replied: true }
        );
        assert_eq!(counter.posted.load(Ordering::SeqCst), 2);
    }
}
