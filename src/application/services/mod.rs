//! Application services - Business logic orchestration

pub mod keyword_service;
pub mod user_service;

pub use keyword_service::{KeywordMatch, KeywordService};
pub use user_service::UserDirectory;
