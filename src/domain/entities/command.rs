use super::PollId;
use crate::application::errors::CommandError;

/// Static description of a chat command, used for help text and for
/// registering commands with the chat platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "poll",
        description: "Create a single-choice poll",
        usage: "poll <name>, then one option per line",
    },
    CommandSpec {
        name: "multipoll",
        description: "Create a poll allowing several choices",
        usage: "multipoll <name>, then one option per line",
    },
    CommandSpec {
        name: "vote",
        description: "Vote in a poll",
        usage: "vote <id> <num> [num...]",
    },
    CommandSpec {
        name: "retract",
        description: "Retract your vote",
        usage: "retract <id>",
    },
    CommandSpec {
        name: "results",
        description: "Show poll results",
        usage: "results <id>",
    },
    CommandSpec {
        name: "finish",
        description: "Close a poll you created",
        usage: "finish <id>",
    },
    CommandSpec {
        name: "delete",
        description: "Delete a poll you created",
        usage: "delete <id>",
    },
    CommandSpec {
        name: "help",
        description: "Show help message",
        usage: "help",
    },
];

/// A parsed poll command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollCommand {
    Create {
        name: String,
        options: Vec<String>,
        multi_vote: bool,
    },
    Finish { poll_id: PollId },
    Delete { poll_id: PollId },
    Vote { poll_id: PollId, options: Vec<u32> },
    Retract { poll_id: PollId },
    Results { poll_id: PollId },
    Help,
}

impl PollCommand {
    /// Build a command from the keyword, first-line arguments and body lines.
    pub fn parse(name: &str, args: &[String], body: &[String]) -> Result<Self, CommandError> {
        match name.to_lowercase().as_str() {
            "poll" => Self::parse_create(args, body, false),
            "multipoll" => Self::parse_create(args, body, true),
            "finish" => Ok(PollCommand::Finish {
                poll_id: parse_poll_id(args)?,
            }),
            "delete" => Ok(PollCommand::Delete {
                poll_id: parse_poll_id(args)?,
            }),
            "retract" => Ok(PollCommand::Retract {
                poll_id: parse_poll_id(args)?,
            }),
            "results" => Ok(PollCommand::Results {
                poll_id: parse_poll_id(args)?,
            }),
            "vote" => {
                let poll_id = parse_poll_id(args)?;
                // Numbers either inline after the ID or on the next line
                let raw = if args.len() > 1 {
                    args[1..].join(" ")
                } else {
                    body.first().cloned().unwrap_or_default()
                };
                Ok(PollCommand::Vote {
                    poll_id,
                    options: parse_option_nums(&raw)?,
                })
            }
            "help" | "start" => Ok(PollCommand::Help),
            _ => Err(CommandError::NotFound(name.to_string())),
        }
    }

    fn parse_create(
        args: &[String],
        body: &[String],
        multi_vote: bool,
    ) -> Result<Self, CommandError> {
        let name = args.join(" ");
        if name.is_empty() {
            return Err(CommandError::InvalidArgs("poll name is required".to_string()));
        }
        if body.is_empty() {
            return Err(CommandError::MissingOptions { multi: multi_vote });
        }

        Ok(PollCommand::Create {
            name,
            options: body.to_vec(),
            multi_vote,
        })
    }
}

fn parse_poll_id(args: &[String]) -> Result<PollId, CommandError> {
    let raw = args.first().map(String::as_str).unwrap_or_default();
    match raw.parse::<PollId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(CommandError::InvalidPollId(raw.to_string())),
    }
}

fn parse_option_nums(raw: &str) -> Result<Vec<u32>, CommandError> {
    let nums = raw
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| CommandError::InvalidOptions(raw.to_string()))?;

    if nums.is_empty() {
        return Err(CommandError::InvalidOptions(raw.to_string()));
    }
    Ok(nums)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_create_poll() {
        let args = strings(&["Lunch", "place"]);
        let cmd = PollCommand::parse("poll", &args, &strings(&["Pizza", "Sushi"])).unwrap();
        assert_eq!(
            cmd,
            PollCommand::Create {
                name: "Lunch place".to_string(),
                options: strings(&["Pizza", "Sushi"]),
                multi_vote: false,
            }
        );
    }

    #[test]
    fn test_parse_create_without_options() {
        let err = PollCommand::parse("multipoll", &strings(&["Lunch"]), &[]).unwrap_err();
        assert_eq!(err, CommandError::MissingOptions { multi: true });
    }

    #[test]
    fn test_parse_vote_inline_and_body() {
        let inline = PollCommand::parse("vote", &strings(&["7", "1", "3"]), &[]).unwrap();
        assert_eq!(inline, PollCommand::Vote { poll_id: 7, options: vec![1, 3] });

        let body = PollCommand::parse("vote", &strings(&["7"]), &strings(&["2, 4"])).unwrap();
        assert_eq!(body, PollCommand::Vote { poll_id: 7, options: vec![2, 4] });
    }

    #[test]
    fn test_parse_vote_rejects_garbage() {
        let err = PollCommand::parse("vote", &strings(&["7", "one"]), &[]).unwrap_err();
        assert_eq!(err, CommandError::InvalidOptions("one".to_string()));

        let err = PollCommand::parse("vote", &strings(&["7"]), &[]).unwrap_err();
        assert_eq!(err, CommandError::InvalidOptions(String::new()));
    }

    #[test]
    fn test_parse_poll_id() {
        assert_eq!(
            PollCommand::parse("results", &strings(&["12"]), &[]).unwrap(),
            PollCommand::Results { poll_id: 12 }
        );
        assert_eq!(
            PollCommand::parse("finish", &strings(&["abc"]), &[]).unwrap_err(),
            CommandError::InvalidPollId("abc".to_string())
        );
        assert_eq!(
            PollCommand::parse("delete", &[], &[]).unwrap_err(),
            CommandError::InvalidPollId(String::new())
        );
        assert_eq!(
            PollCommand::parse("retract", &strings(&["-3"]), &[]).unwrap_err(),
            CommandError::InvalidPollId("-3".to_string())
        );
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            PollCommand::parse("dance", &[], &[]).unwrap_err(),
            CommandError::NotFound("dance".to_string())
        );
    }

    #[test]
    fn test_command_names_are_unique() {
        let mut names: Vec<&str> = COMMANDS.iter().map(|c| c.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), COMMANDS.len());
    }
}
