//! Message dispatcher - Routes poll commands to the services and renders replies

use crate::application::errors::{CommandError, ErrorKind, PollError};
use crate::application::services::{PollService, VoteService};
use crate::domain::entities::{
    Content, Message, Poll, PollCommand, PollId, PollOption, PollResults, Reply, User, COMMANDS,
};
use super::parser::MessageParser;

/// What the user asked for, used to word failure replies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Create { multi: bool },
    Finish,
    Delete,
    Vote,
    Retract,
    Results,
}

impl Action {
    fn name(self) -> &'static str {
        match self {
            Action::Create { multi: false } => "create poll",
            Action::Create { multi: true } => "create multipoll",
            Action::Finish => "finish poll",
            Action::Delete => "delete poll",
            Action::Vote => "vote",
            Action::Retract => "retract vote",
            Action::Results => "get poll results",
        }
    }
}

/// Routes parsed messages to the poll and vote services.
///
/// Every command yields exactly one reply: success replies are posted to the
/// channel, failures answer the triggering message.
pub struct PollDispatcher {
    parser: MessageParser,
    polls: PollService,
    votes: VoteService,
}

impl PollDispatcher {
    pub fn new(prefix: impl Into<String>, polls: PollService, votes: VoteService) -> Self {
        Self {
            parser: MessageParser::new(prefix),
            polls,
            votes,
        }
    }

    /// Ignore group commands addressed to other bots
    pub fn with_bot_username(self, username: impl Into<String>) -> Self {
        let Self { parser, polls, votes } = self;
        Self {
            parser: parser.with_bot_username(username),
            polls,
            votes,
        }
    }

    pub fn parser(&self) -> &MessageParser {
        &self.parser
    }

    /// Parse raw chat text from `sender` and dispatch it
    pub async fn process_text(
        &self,
        chat_id: impl Into<String>,
        sender: User,
        text: impl Into<String>,
    ) -> Option<Reply> {
        let message = self.parser.parse(chat_id, text, Some(sender));
        self.dispatch(&message).await
    }

    /// Handle a message; non-command messages produce no reply.
    pub async fn dispatch(&self, message: &Message) -> Option<Reply> {
        let Content::Command { name, args, body } = &message.content else {
            return None;
        };
        let Some(sender) = &message.sender else {
            tracing::warn!(
                channel = %message.chat_id,
                command = %name,
                "command without sender ignored"
            );
            return None;
        };
        let user = sender.id.as_str();
        tracing::debug!(
            channel = %message.chat_id,
            user,
            name = sender.display_name(),
            command = %name,
            "handling command"
        );

        let command = match PollCommand::parse(name, args, body) {
            Ok(command) => command,
            Err(CommandError::NotFound(name)) => {
                tracing::debug!(
                    channel = %message.chat_id,
                    command = %name,
                    "unknown command ignored"
                );
                return None;
            }
            Err(e) => {
                tracing::warn!(channel = %message.chat_id, user, error = %e, "invalid command");
                return Some(Reply::to_sender(message, command_error_text(&e)));
            }
        };

        let reply = match command {
            PollCommand::Create { name, options, multi_vote } => {
                self.create(message, user, name, options, multi_vote).await
            }
            PollCommand::Finish { poll_id } => self.finish(message, user, poll_id).await,
            PollCommand::Delete { poll_id } => self.delete(message, user, poll_id).await,
            PollCommand::Vote { poll_id, options } => {
                self.vote(message, user, poll_id, &options).await
            }
            PollCommand::Retract { poll_id } => self.retract(message, user, poll_id).await,
            PollCommand::Results { poll_id } => self.results(message, poll_id).await,
            PollCommand::Help => Reply::to_sender(message, self.help_text()),
        };
        Some(reply)
    }

    async fn create(
        &self,
        message: &Message,
        user: &str,
        name: String,
        options: Vec<String>,
        multi_vote: bool,
    ) -> Reply {
        let action = Action::Create { multi: multi_vote };
        let poll = Poll::new(name, user, &message.chat_id).with_multi_vote(multi_vote);

        match self.polls.create_poll(poll, PollOption::from_names(options)).await {
            Ok((poll, options)) => {
                tracing::info!(
                    poll_id = poll.id,
                    user,
                    channel = %poll.channel,
                    multi_vote,
                    "poll created"
                );
                Reply::to_channel(message, render_created(&poll, &options))
            }
            Err(e) => failure(message, action, None, &e),
        }
    }

    async fn finish(&self, message: &Message, user: &str, poll_id: PollId) -> Reply {
        match self.polls.finish_poll(poll_id, user, &message.chat_id).await {
            Ok(()) => {
                tracing::info!(poll_id, user, "poll finished");
                Reply::to_channel(message, format!("poll {} was finished", poll_id))
            }
            Err(e) => failure(message, Action::Finish, Some(poll_id), &e),
        }
    }

    async fn delete(&self, message: &Message, user: &str, poll_id: PollId) -> Reply {
        match self.polls.delete_poll(poll_id, user, &message.chat_id).await {
            Ok(()) => {
                tracing::info!(poll_id, user, "poll deleted");
                Reply::to_channel(message, format!("poll {} was deleted", poll_id))
            }
            Err(e) => failure(message, Action::Delete, Some(poll_id), &e),
        }
    }

    async fn vote(&self, message: &Message, user: &str, poll_id: PollId, options: &[u32]) -> Reply {
        match self.votes.vote(poll_id, user, &message.chat_id, options).await {
            Ok(vote) => {
                tracing::info!(poll_id, user, options = ?vote.options, "vote counted");
                Reply::to_channel(message, "your vote was counted")
            }
            Err(e) => failure(message, Action::Vote, Some(poll_id), &e),
        }
    }

    async fn retract(&self, message: &Message, user: &str, poll_id: PollId) -> Reply {
        match self.votes.retract_vote(poll_id, user, &message.chat_id).await {
            Ok(()) => {
                tracing::info!(poll_id, user, "vote retracted");
                Reply::to_channel(message, "your vote was retracted")
            }
            Err(e) => failure(message, Action::Retract, Some(poll_id), &e),
        }
    }

    async fn results(&self, message: &Message, poll_id: PollId) -> Reply {
        match self.votes.get_results(poll_id, &message.chat_id).await {
            Ok(results) => {
                tracing::info!(poll_id, selections = results.total_selections(), "results counted");
                Reply::to_channel(message, render_results(&results))
            }
            Err(e) => failure(message, Action::Results, Some(poll_id), &e),
        }
    }

    fn help_text(&self) -> String {
        let prefix = self.parser.prefix();
        let mut help = "Available commands:\n".to_string();
        for cmd in COMMANDS {
            help.push_str(&format!("  {}{} - {}\n", prefix, cmd.usage, cmd.description));
        }
        help.trim_end().to_string()
    }
}

fn render_created(poll: &Poll, options: &[PollOption]) -> String {
    let kind = if poll.is_multi_vote { "multipoll" } else { "poll" };
    let mut text = format!("New {} created: {}\nID: {}", kind, poll.name, poll.id);
    for option in options {
        text.push('\n');
        text.push_str(&option.label());
    }
    text
}

fn render_results(results: &PollResults) -> String {
    let mut text = "Results:".to_string();
    for entry in results.iter() {
        text.push_str(&format!("\n{}: {}", entry.label, entry.count));
    }
    text
}

fn command_error_text(err: &CommandError) -> String {
    match err {
        CommandError::InvalidPollId(_) => "invalid poll ID".to_string(),
        CommandError::InvalidOptions(_) => "invalid options".to_string(),
        CommandError::InvalidArgs(msg) => msg.clone(),
        CommandError::MissingOptions { .. } => err.to_string(),
        CommandError::NotFound(name) => format!("unknown command: {}", name),
    }
}

/// Log a failed command and build the reply the user sees
fn failure(message: &Message, action: Action, poll_id: Option<PollId>, err: &PollError) -> Reply {
    let user = message.sender_id().unwrap_or_default();
    match err {
        PollError::Storage(storage) => tracing::error!(
            action = action.name(),
            poll_id,
            user,
            channel = %message.chat_id,
            inconsistent = storage.is_inconsistent(),
            error = %storage,
            "storage failure"
        ),
        _ if err.kind() == ErrorKind::Conflict => {
            tracing::info!(action = action.name(), poll_id, user, reason = %err, "nothing to do")
        }
        _ => tracing::warn!(action = action.name(), poll_id, user, reason = %err, "request denied"),
    }

    Reply::to_sender(message, failure_text(action, err))
}

fn failure_text(action: Action, err: &PollError) -> String {
    match err {
        PollError::PollNotFound(_) => "poll not found".to_string(),
        PollError::NotPollOwner(_) => {
            let verb = if action == Action::Delete { "delete" } else { "finish" };
            format!("impossible to {} poll which you are not creator of", verb)
        }
        PollError::PollFinished(_) if action == Action::Vote => {
            "failed to vote because poll was finished".to_string()
        }
        PollError::PollFinished(_) => "poll was finished".to_string(),
        PollError::OnlyOneOptionAllowed => {
            "failed to vote because it doesn't support multiple options".to_string()
        }
        PollError::InvalidOptionNumber { .. } => "invalid option number".to_string(),
        PollError::EmptyVote => "invalid options".to_string(),
        PollError::NoVoteToCancel(_) => "you haven't voted yet in this poll".to_string(),
        PollError::NoVotesInPoll(_) => "no votes in poll".to_string(),
        PollError::NoOptions(_) => "poll has no options".to_string(),
        PollError::EmptyOptionList => match action {
            Action::Create { multi: true } => {
                "multipoll without options cannot be created".to_string()
            }
            _ => "poll without options cannot be created".to_string(),
        },
        PollError::Storage(_) => format!("failed to {}", action.name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::errors::StorageError;

    #[test]
    fn test_failure_text_for_owner_checks() {
        let err = PollError::NotPollOwner(4);
        assert_eq!(
            failure_text(Action::Delete, &err),
            "impossible to delete poll which you are not creator of"
        );
        assert_eq!(
            failure_text(Action::Finish, &err),
            "impossible to finish poll which you are not creator of"
        );
    }

    #[test]
    fn test_storage_faults_get_generic_text() {
        let err = PollError::Storage(StorageError::Rollback {
            op: "delete_poll",
            source: rusqlite::Error::InvalidQuery,
            cause: Box::new(StorageError::Unavailable("disk".to_string())),
        });
        assert_eq!(failure_text(Action::Delete, &err), "failed to delete poll");

        let err = PollError::Storage(StorageError::Unavailable("disk".to_string()));
        assert_eq!(
            failure_text(Action::Create { multi: true }, &err),
            "failed to create multipoll"
        );
    }

    #[test]
    fn test_finished_poll_wording() {
        let err = PollError::PollFinished(1);
        assert_eq!(failure_text(Action::Vote, &err), "failed to vote because poll was finished");
        assert_eq!(failure_text(Action::Retract, &err), "poll was finished");
    }

    #[test]
    fn test_render_results_in_option_order() {
        let options: Vec<PollOption> = (1..=10)
            .map(|num| PollOption {
                id: num as i64,
                poll_id: 1,
                name: format!("opt{}", num),
                num,
            })
            .collect();
        let results = PollResults::tally(&options, &[]);

        let text = render_results(&results);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Results:");
        assert_eq!(lines[1], "1) opt1: 0");
        assert_eq!(lines[2], "2) opt2: 0");
        assert_eq!(lines[10], "10) opt10: 0");
    }
}
