use std::sync::Arc;

use super::poll_service::poll_error;
use crate::application::errors::{PollError, StorageError};
use crate::domain::entities::{Poll, PollId, PollResults, Vote};
use crate::domain::traits::VoteStore;

/// Vote lifecycle: cast, retract, tabulate
pub struct VoteService {
    store: Arc<dyn VoteStore>,
}

impl VoteService {
    pub fn new(store: Arc<dyn VoteStore>) -> Self {
        Self { store }
    }

    /// Cast or replace `voter`'s vote.
    ///
    /// Duplicate numbers collapse to one; the ballot is rejected as a whole
    /// if any number falls outside the poll's options.
    pub async fn vote(
        &self,
        poll_id: PollId,
        voter: &str,
        channel: &str,
        option_nums: &[u32],
    ) -> Result<Vote, PollError> {
        let poll = self.open_poll(poll_id, channel).await?;

        let ballot = dedup_ballot(option_nums);
        if ballot.is_empty() {
            return Err(PollError::EmptyVote);
        }
        if ballot.len() > 1 && !poll.is_multi_vote {
            return Err(PollError::OnlyOneOptionAllowed);
        }

        let options = self.store.get_options(poll_id).await.map_err(|e| match e {
            StorageError::NoOptionsFound(_) => PollError::NoOptions(poll_id),
            other => PollError::Storage(other),
        })?;
        let max = options.len() as u32;
        if let Some(&num) = ballot.iter().find(|&&num| num == 0 || num > max) {
            return Err(PollError::InvalidOptionNumber { num, max });
        }

        // Storage re-checks that the poll is open in the same transaction as the write
        let vote = self
            .store
            .cast_vote(poll_id, voter, &ballot)
            .await
            .map_err(|e| poll_error(poll_id, e))?;
        tracing::debug!(poll_id, vote_id = vote.id, options = ?vote.options, "vote stored");
        Ok(vote)
    }

    pub async fn retract_vote(
        &self,
        poll_id: PollId,
        voter: &str,
        channel: &str,
    ) -> Result<(), PollError> {
        self.open_poll(poll_id, channel).await?;

        let retracted = self
            .store
            .retract_vote(voter, poll_id)
            .await
            .map_err(|e| poll_error(poll_id, e))?;
        if !retracted {
            return Err(PollError::NoVoteToCancel(poll_id));
        }
        Ok(())
    }

    /// Vote counts per option, labelled `"{num}) {name}"` in option order.
    ///
    /// Results are public within the channel; no ownership check applies.
    pub async fn get_results(
        &self,
        poll_id: PollId,
        channel: &str,
    ) -> Result<PollResults, PollError> {
        self.visible_poll(poll_id, channel).await?;

        let options = self.store.get_options(poll_id).await.map_err(|e| match e {
            StorageError::NoOptionsFound(_) => PollError::NoOptions(poll_id),
            other => PollError::Storage(other),
        })?;
        let votes = self.store.get_votes(poll_id).await.map_err(|e| match e {
            StorageError::NoVotes(_) => PollError::NoVotesInPoll(poll_id),
            other => PollError::Storage(other),
        })?;

        Ok(PollResults::tally(&options, &votes))
    }

    async fn visible_poll(&self, poll_id: PollId, channel: &str) -> Result<Poll, PollError> {
        let poll = self
            .store
            .get_poll(poll_id)
            .await
            .map_err(|e| poll_error(poll_id, e))?;

        if !poll.is_visible_from(channel) {
            return Err(PollError::PollNotFound(poll_id));
        }
        Ok(poll)
    }

    /// A visible poll that still accepts vote changes.
    async fn open_poll(&self, poll_id: PollId, channel: &str) -> Result<Poll, PollError> {
        let poll = self.visible_poll(poll_id, channel).await?;
        if poll.is_finished {
            return Err(PollError::PollFinished(poll_id));
        }
        Ok(poll)
    }
}

fn dedup_ballot(option_nums: &[u32]) -> Vec<u32> {
    let mut ballot = Vec::with_capacity(option_nums.len());
    for &num in option_nums {
        if !ballot.contains(&num) {
            ballot.push(num);
        }
    }
    ballot
}
