//! modbot - Slack community bot that points people to the right channel

pub mod domain;
pub mod application;
pub mod extensions;
pub mod infrastructure;

use std::sync::Arc;

use application::errors::BotError;
use application::messaging::{EventDispatcher, LoggingMiddleware, MiddlewareChain, RateLimitMiddleware};
use application::services::{KeywordService, UserDirectory};
use domain::traits::ChatPlatform;
use extensions::{keywords, ExtensionManager, KeywordsExtension};
use infrastructure::config::Config;
use infrastructure::storage::JsonRuleStore;

/// Wire extensions, services and middleware around a platform
pub async fn build_dispatcher(config: &Config, platform: Arc<dyn ChatPlatform>) -> Result<EventDispatcher, BotError> {
    let me = platform.identify().await?;
    tracing::info!("[Bot] Connected with user ID {}", me.user_id);

    let users = Arc::new(UserDirectory::new(platform.clone()));

    let keywords_config = &config.extensions.keywords;
    let store = Arc::new(JsonRuleStore::new(keywords_config.store_path.clone()));
    let service = Arc::new(KeywordService::load(store).await?);

    let mut manager = ExtensionManager::new();
    manager.register(
        Arc::new(KeywordsExtension::new(service, users.clone(), platform.clone())),
        keywords_config.channels.clone(),
    )?;
    if !keywords_config.enabled {
        manager.disable(keywords::NAME)?;
    }

    let limits = &config.security.rate_limit;
    let middleware = MiddlewareChain::new()
        .add(LoggingMiddleware)
        .add(RateLimitMiddleware::new(limits.max_requests, limits.window_seconds));

    Ok(EventDispatcher::new(me.user_id, platform, users, Arc::new(manager)).with_middleware(middleware))
}
