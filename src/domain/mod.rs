//! Domain layer - Core business logic with no external dependencies
//! 
//! This layer contains:
//! - Entities: Core business objects (User, MessageEvent, KeywordRule)
//! - Traits: Abstractions for infrastructure (ChatPlatform, RuleStore)

pub mod entities;
pub mod traits;
