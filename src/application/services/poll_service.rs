use std::sync::Arc;

use crate::application::errors::{PollError, StorageError};
use crate::domain::entities::{Poll, PollId, PollOption};
use crate::domain::traits::PollStore;

/// Poll lifecycle: create, finish, delete, with ownership enforcement
pub struct PollService {
    store: Arc<dyn PollStore>,
}

impl PollService {
    pub fn new(store: Arc<dyn PollStore>) -> Self {
        Self { store }
    }

    /// Persist a poll together with its options.
    ///
    /// An empty option list is rejected before storage is touched.
    pub async fn create_poll(
        &self,
        poll: Poll,
        options: Vec<PollOption>,
    ) -> Result<(Poll, Vec<PollOption>), PollError> {
        if options.is_empty() {
            return Err(PollError::EmptyOptionList);
        }

        let (poll, options) = self.store.create_poll_with_options(poll, options).await?;
        tracing::debug!(poll_id = poll.id, options = options.len(), "poll created");
        Ok((poll, options))
    }

    pub async fn finish_poll(
        &self,
        poll_id: PollId,
        requester: &str,
        channel: &str,
    ) -> Result<(), PollError> {
        self.owned_poll(poll_id, requester, channel).await?;
        self.store.finish_poll(poll_id).await.map_err(|e| poll_error(poll_id, e))
    }

    pub async fn delete_poll(
        &self,
        poll_id: PollId,
        requester: &str,
        channel: &str,
    ) -> Result<(), PollError> {
        self.owned_poll(poll_id, requester, channel).await?;
        self.store.delete_poll(poll_id).await.map_err(|e| poll_error(poll_id, e))
    }

    /// Load a poll the requester may mutate.
    async fn owned_poll(
        &self,
        poll_id: PollId,
        requester: &str,
        channel: &str,
    ) -> Result<Poll, PollError> {
        let poll = self
            .store
            .get_poll(poll_id)
            .await
            .map_err(|e| poll_error(poll_id, e))?;

        // Cross-channel references look exactly like missing polls
        if !poll.is_visible_from(channel) {
            return Err(PollError::PollNotFound(poll_id));
        }
        if !poll.is_owned_by(requester) {
            return Err(PollError::NotPollOwner(poll_id));
        }
        Ok(poll)
    }
}

/// Map storage answers about the poll's state to domain errors, keep the rest.
pub(crate) fn poll_error(poll_id: PollId, err: StorageError) -> PollError {
    match err {
        StorageError::PollNotFound(_) => PollError::PollNotFound(poll_id),
        StorageError::PollFinished(_) => PollError::PollFinished(poll_id),
        other => PollError::Storage(other),
    }
}
