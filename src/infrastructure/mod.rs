//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Configuration loading
//! - Storage: Keyword rule persistence
//! - Adapters: Platform integrations (Slack, console)
//! - Server: Events API webhook

pub mod config;
pub mod storage;
pub mod adapters;
pub mod server;
