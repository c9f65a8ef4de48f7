//! Application layer errors

use thiserror::Error;

use crate::domain::entities::PollId;

/// Coarse classification of a domain failure.
///
/// The dispatcher decides how to answer the user from the kind alone, so new
/// variants only need a kind to be rendered sensibly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Poll absent, wrong channel, no options, no votes
    NotFound,
    /// Requester is not the poll creator
    Authorization,
    /// Input rejected before any storage mutation
    Validation,
    /// Benign outcome such as nothing to retract
    Conflict,
    /// Transaction open/commit/rollback or query failure
    StorageFault,
}

/// Startup and transport errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for BotError {
    fn from(e: std::io::Error) -> Self {
        BotError::Internal(e.to_string())
    }
}

/// Command parsing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Command not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Invalid poll ID: {0:?}")]
    InvalidPollId(String),

    #[error("Invalid options: {0:?}")]
    InvalidOptions(String),

    #[error("{}poll without options cannot be created", poll_kind(.multi))]
    MissingOptions { multi: bool },
}

fn poll_kind(multi: &bool) -> &'static str {
    if *multi {
        "multi"
    } else {
        ""
    }
}

/// Poll and vote service errors
#[derive(Error, Debug)]
pub enum PollError {
    #[error("poll {0} not found")]
    PollNotFound(PollId),

    #[error("user is not the owner of poll {0}")]
    NotPollOwner(PollId),

    #[error("poll {0} was finished")]
    PollFinished(PollId),

    #[error("no options defined for poll {0}")]
    NoOptions(PollId),

    #[error("no vote to cancel in poll {0}")]
    NoVoteToCancel(PollId),

    #[error("no votes in poll {0} yet")]
    NoVotesInPoll(PollId),

    #[error("only one option in the poll is allowed")]
    OnlyOneOptionAllowed,

    #[error("option number {num} is out of range 1..={max}")]
    InvalidOptionNumber { num: u32, max: u32 },

    #[error("poll without options cannot be created")]
    EmptyOptionList,

    #[error("vote without options")]
    EmptyVote,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PollError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PollError::PollNotFound(_)
            | PollError::NoOptions(_)
            | PollError::NoVotesInPoll(_) => ErrorKind::NotFound,
            PollError::NotPollOwner(_) => ErrorKind::Authorization,
            PollError::PollFinished(_)
            | PollError::OnlyOneOptionAllowed
            | PollError::InvalidOptionNumber { .. }
            | PollError::EmptyOptionList
            | PollError::EmptyVote => ErrorKind::Validation,
            PollError::NoVoteToCancel(_) => ErrorKind::Conflict,
            PollError::Storage(_) => ErrorKind::StorageFault,
        }
    }
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("poll {0} does not exist")]
    PollNotFound(PollId),

    #[error("poll {0} is finished")]
    PollFinished(PollId),

    #[error("no options found for poll {0}")]
    NoOptionsFound(PollId),

    #[error("no votes found for poll {0}")]
    NoVotes(PollId),

    #[error("{op}: failed to open transaction: {source}")]
    TransactionOpen {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("{op}: failed to commit transaction: {source}")]
    Commit {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// Rollback after `cause` failed too; the store may hold a partial write.
    #[error("{op}: failed to roll back after \"{cause}\": {source}")]
    Rollback {
        op: &'static str,
        #[source]
        source: rusqlite::Error,
        cause: Box<StorageError>,
    },

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    /// Whether the failure may have left a partially applied write behind.
    pub fn is_inconsistent(&self) -> bool {
        matches!(self, StorageError::Rollback { .. })
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
