//! Application layer - Use cases and business logic
//! 
//! This layer contains:
//! - Services: Poll and vote rules on top of the storage traits
//! - Errors: Domain-specific errors
//! - Messaging: Message parsing and command dispatching

pub mod errors;
pub mod services;
pub mod messaging;
