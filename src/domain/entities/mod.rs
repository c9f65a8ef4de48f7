//! Domain entities - Core business objects with no external dependencies

pub mod command;
pub mod message;
pub mod poll;
pub mod user;
pub mod vote;

pub use command::{CommandSpec, PollCommand, COMMANDS};
pub use message::{Content, Message, Reply};
pub use poll::{Poll, PollId, PollOption};
pub use user::User;
pub use vote::{OptionTally, PollResults, Vote};
