//! Extension system for modbot
//!
//! Every feature reacting to Slack messages is an extension registered
//! with the manager, which also records where it may act.

pub mod keywords;
pub mod manager;
pub mod trait_def;

pub use keywords::KeywordsExtension;
pub use manager::ExtensionManager;
pub use trait_def::{Extension, ExtensionInfo};
