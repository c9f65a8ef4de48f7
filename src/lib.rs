//! vote-bot - poll and voting bot for chat platforms

pub mod domain;
pub mod application;
pub mod infrastructure;
