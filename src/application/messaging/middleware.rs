//! Middleware run on every inbound message before extensions see it

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::domain::entities::MessageEvent;

/// Context passed through middleware chain
#[derive(Debug, Clone)]
pub struct Context {
    pub event: MessageEvent,
    pub channel_id: String,
    pub user_id: Option<String>,
    pub data: HashMap<String, String>,
}

impl Context {
    pub fn new(event: MessageEvent) -> Self {
        let channel_id = event.channel.clone();
        let user_id = event.user.clone();

        Self {
            event,
            channel_id,
            user_id,
            data: HashMap::new(),
        }
    }

    /// Get data from context
    pub fn get(&self, key: &str) -> Option<&String> {
        self.data.get(key)
    }

    /// Set data in context
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }
}

/// Middleware trait - processors that can intercept inbound messages
pub trait Middleware: Send + Sync {
    /// Process a message and either pass it on or stop it
    fn process(&self, ctx: Context, next: Next) -> MiddlewareResult;
}

/// Result of middleware processing
pub type MiddlewareResult = Result<Context, MiddlewareError>;

/// Middleware errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiddlewareError {
    /// Stop processing silently
    Blocked(String),
    /// Sender exceeded the allowed message rate
    RateLimited { retry_after: Duration },
    /// Internal error
    Internal(String),
}

impl std::fmt::Display for MiddlewareError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MiddlewareError::Blocked(msg) => write!(f, "Blocked: {}", msg),
            MiddlewareError::RateLimited { retry_after } => {
                write!(f, "Rate limited, retry after {:?}", retry_after)
            }
            MiddlewareError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for MiddlewareError {}

/// Next middleware in chain
#[derive(Clone)]
pub struct Next {
    remaining: Arc<[Arc<dyn Middleware>]>,
}

impl Next {
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        Self {
            remaining: middlewares.into(),
        }
    }

    /// Process remaining middleware
    pub fn run(self, ctx: Context) -> MiddlewareResult {
        match self.remaining.split_first() {
            Some((first, rest)) => {
                let next = Next { remaining: rest.to_vec().into() };
                first.process(ctx, next)
            }
            // No more middleware, processing complete
            None => Ok(ctx),
        }
    }
}

/// Middleware chain builder
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Run a context through every middleware in order
    pub fn run(&self, ctx: Context) -> MiddlewareResult {
        Next::new(self.middlewares.clone()).run(ctx)
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

struct Windows {
    senders: HashMap<String, Vec<Instant>>,
    last_sweep: Instant,
}

/// Per-user sliding-window rate limit
pub struct RateLimitMiddleware {
    windows: Mutex<Windows>,
    max_requests: u32,
    window: Duration,
}

impl RateLimitMiddleware {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            windows: Mutex::new(Windows {
                senders: HashMap::new(),
                last_sweep: Instant::now(),
            }),
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Senders with history still being tracked
    pub fn tracked_senders(&self) -> usize {
        self.windows.lock().map(|w| w.senders.len()).unwrap_or(0)
    }

    fn check_rate_limit(&self, key: &str) -> Result<(), MiddlewareError> {
        let mut windows = self.windows.lock()
            .map_err(|_| MiddlewareError::Internal("Lock poisoned".to_string()))?;

        let now = Instant::now();
        let window = self.window;

        // Forget idle senders at most once per window
        if now.duration_since(windows.last_sweep) >= window {
            windows.senders.retain(|_, times| {
                times.last().is_some_and(|&t| now.duration_since(t) < window)
            });
            windows.last_sweep = now;
        }

        let times = windows.senders.entry(key.to_string()).or_default();
        times.retain(|&t| now.duration_since(t) < window);

        if times.len() >= self.max_requests as usize {
            let retry_after = times.first()
                .map(|t| window.saturating_sub(now.duration_since(*t)))
                .unwrap_or(window);

            return Err(MiddlewareError::RateLimited { retry_after });
        }

        times.push(now);
        Ok(())
    }
}

impl Middleware for RateLimitMiddleware {
    fn process(&self, ctx: Context, next: Next) -> MiddlewareResult {
        // Rate limit by user, or channel for anonymous events
        let key = ctx.user_id.clone().unwrap_or_else(|| ctx.channel_id.clone());

        self.check_rate_limit(&key)?;

        next.run(ctx)
    }
}

/// Logging middleware for debugging
pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn process(&self, ctx: Context, next: Next) -> MiddlewareResult {
        let preview: String = ctx.event.text.chars().take(50).collect();
        let user = ctx.user_id.clone().unwrap_or_default();

        tracing::debug!(channel = %ctx.channel_id, user = %user, "{}", preview);

        let result = next.run(ctx);

        if let Err(e) = &result {
            tracing::debug!(user = %user, "Message stopped: {}", e);
        }

        result
    }
}
