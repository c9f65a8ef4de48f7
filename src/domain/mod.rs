//! Domain layer - Core poll and vote model
//!
//! This layer contains:
//! - Entities: Polls, options, votes, chat messages and commands
//! - Traits: Capability interfaces for storage and chat transports
//! - Rules: Tabulation and visibility/ownership predicates

pub mod entities;
pub mod traits;
