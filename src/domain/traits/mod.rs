//! Domain traits - Abstractions for infrastructure implementations

pub mod platform;
pub mod store;

pub use platform::{ChatPlatform, BotInfo};
pub use store::RuleStore;
