//! Application layer - Use cases and business logic
//! 
//! This layer contains:
//! - Services: keyword rules and the user directory
//! - Errors: Domain-specific errors
//! - Messaging: Sanitizing, command parsing, middleware, dispatching

pub mod errors;
pub mod services;
pub mod messaging;
