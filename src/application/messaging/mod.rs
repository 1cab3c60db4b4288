//! Message handling - Event-driven message processing

pub mod dispatcher;
pub mod middleware;
pub mod parser;
pub mod sanitizer;

pub use dispatcher::{Dispatch, EventDispatcher};
pub use middleware::{LoggingMiddleware, Middleware, MiddlewareChain, RateLimitMiddleware};
pub use parser::{AdminCommand, CommandParser, KeywordCommand};
