//! Message handling - Parsing chat text and dispatching poll commands

pub mod dispatcher;
pub mod parser;

pub use dispatcher::PollDispatcher;
pub use parser::MessageParser;
