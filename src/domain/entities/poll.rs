use serde::{Deserialize, Serialize};

/// Storage-assigned poll identifier
pub type PollId = i64;

/// A named decision request scoped to one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub id: PollId,
    pub name: String,
    pub creator: String,
    pub channel: String,
    pub is_finished: bool,
    pub is_multi_vote: bool,
}

impl Poll {
    /// Build an unsaved poll; the ID is assigned by storage on creation.
    pub fn new(
        name: impl Into<String>,
        creator: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            name: name.into(),
            creator: creator.into(),
            channel: channel.into(),
            is_finished: false,
            is_multi_vote: false,
        }
    }

    pub fn with_multi_vote(mut self, multi_vote: bool) -> Self {
        self.is_multi_vote = multi_vote;
        self
    }

    /// Polls from another channel are treated as nonexistent.
    pub fn is_visible_from(&self, channel: &str) -> bool {
        self.channel == channel
    }

    pub fn is_owned_by(&self, user: &str) -> bool {
        self.creator == user
    }
}

/// One selectable choice within a poll
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: i64,
    pub poll_id: PollId,
    pub name: String,
    /// 1-based ordinal, stable for the lifetime of the poll
    pub num: u32,
}

impl PollOption {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            poll_id: 0,
            name: name.into(),
            num: 0,
        }
    }

    /// Options in input order, numbered from 1.
    pub fn from_names<I, S>(names: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().map(Self::new).collect()
    }

    pub fn label(&self) -> String {
        format!("{}) {}", self.num, self.name)
    }
}
