use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::application::errors::PlatformError;
use crate::domain::entities::User;
use crate::domain::traits::ChatPlatform;

/// How long looked-up users are trusted before the whole cache is dropped
pub const DEFAULT_USER_TTL: Duration = Duration::from_secs(10 * 60);

struct UserCache {
    users: HashMap<String, User>,
    refreshed_at: Instant,
}

/// Cached view of workspace members, used for permission checks and log labels
pub struct UserDirectory {
    platform: Arc<dyn ChatPlatform>,
    cache: RwLock<UserCache>,
    ttl: Duration,
}

impl UserDirectory {
    pub fn new(platform: Arc<dyn ChatPlatform>) -> Self {
        Self::with_ttl(platform, DEFAULT_USER_TTL)
    }

    pub fn with_ttl(platform: Arc<dyn ChatPlatform>, ttl: Duration) -> Self {
        Self {
            platform,
            cache: RwLock::new(UserCache {
                users: HashMap::new(),
                refreshed_at: Instant::now(),
            }),
            ttl,
        }
    }

    /// Get a user, from the cache when it is fresh enough
    pub async fn get(&self, user_id: &str) -> Result<User, PlatformError> {
        {
            let cache = self.cache.read().await;
            if cache.refreshed_at.elapsed() < self.ttl {
                if let Some(user) = cache.users.get(user_id) {
                    return Ok(user.clone());
                }
            }
        }

        let user = self.platform.user_info(user_id).await?;

        let mut cache = self.cache.write().await;
        if cache.refreshed_at.elapsed() >= self.ttl {
            tracing::info!("Refreshing cache of users");
            cache.users.clear();
            cache.refreshed_at = Instant::now();
        }
        cache.users.insert(user_id.to_string(), user.clone());
        Ok(user)
    }

    /// Admins and owners may configure the bot. Lookup failures deny.
    pub async fn is_admin_or_owner(&self, user_id: &str) -> bool {
        match self.get(user_id).await {
            Ok(user) => user.can_administrate(),
            Err(e) => {
                tracing::warn!(user = %user_id, "User lookup failed, treating as non-admin: {}", e);
                false
            }
        }
    }

    /// Human-readable name for logs, falling back to the raw id
    pub async fn display_name(&self, user_id: &str) -> String {
        match self.get(user_id).await {
            Ok(user) => user.label(),
            Err(_) => user_id.to_string(),
        }
    }

    pub async fn cached_len(&self) -> usize {
        self.cache.read().await.users.len()
    }
}
