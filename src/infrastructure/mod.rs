//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Configuration loading
//! - Database: SQLite poll storage
//! - Adapters: Platform integrations (Telegram, console)

pub mod config;
pub mod database;
pub mod adapters;
