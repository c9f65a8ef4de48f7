use async_trait::async_trait;

use crate::application::errors::StorageError;
use crate::domain::entities::{Poll, PollId, PollOption, Vote};

/// Poll lifecycle storage used by the poll service.
///
/// Storage knows nothing about requesters; ownership and channel checks
/// belong to the caller.
#[async_trait]
pub trait PollStore: Send + Sync {
    /// Insert the poll and all its options in one transaction.
    ///
    /// Option numbers are assigned 1..=N in input order and each option's
    /// `poll_id` is back-filled with the new poll ID.
    async fn create_poll_with_options(
        &self,
        poll: Poll,
        options: Vec<PollOption>,
    ) -> Result<(Poll, Vec<PollOption>), StorageError>;

    async fn get_poll(&self, poll_id: PollId) -> Result<Poll, StorageError>;

    /// Idempotently mark the poll finished.
    async fn finish_poll(&self, poll_id: PollId) -> Result<(), StorageError>;

    /// Delete votes, options and the poll row as one atomic unit.
    async fn delete_poll(&self, poll_id: PollId) -> Result<(), StorageError>;
}

/// Vote storage used by the vote service
#[async_trait]
pub trait VoteStore: Send + Sync {
    async fn get_poll(&self, poll_id: PollId) -> Result<Poll, StorageError>;

    /// Options ordered by number. Fails with `NoOptionsFound` when empty.
    async fn get_options(&self, poll_id: PollId) -> Result<Vec<PollOption>, StorageError>;

    /// Atomically insert or replace the (poll, voter) vote.
    ///
    /// Fails with `PollFinished` when the poll is closed at write time.
    async fn cast_vote(
        &self,
        poll_id: PollId,
        voter: &str,
        options: &[u32],
    ) -> Result<Vote, StorageError>;

    /// Returns whether a vote existed. Fails with `PollFinished` when the
    /// poll is closed at write time.
    async fn retract_vote(&self, voter: &str, poll_id: PollId) -> Result<bool, StorageError>;

    /// Fails with `NoVotes` when the poll has none.
    async fn get_votes(&self, poll_id: PollId) -> Result<Vec<Vote>, StorageError>;
}
