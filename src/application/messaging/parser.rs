//! Message parser - Parses raw chat text into structured messages

use crate::domain::entities::{Content, Message, User};

/// Parses incoming messages into structured Message objects
pub struct MessageParser {
    command_prefix: String,
    /// Commands addressed as `/cmd@other` are ignored when this is set
    bot_username: Option<String>,
}

impl MessageParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            command_prefix: prefix.into(),
            bot_username: None,
        }
    }

    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = Some(username.into());
        self
    }

    pub fn prefix(&self) -> &str {
        &self.command_prefix
    }

    /// Parse a text message
    pub fn parse(
        &self,
        chat_id: impl Into<String>,
        text: impl Into<String>,
        sender: Option<User>,
    ) -> Message {
        let text = text.into();
        let trimmed = text.trim();

        let content = if trimmed.is_empty() {
            Content::Empty
        } else {
            match trimmed.strip_prefix(self.command_prefix.as_str()) {
                Some(rest) if !self.command_prefix.is_empty() => self
                    .parse_command(rest)
                    .unwrap_or_else(|| Content::Text(trimmed.to_string())),
                _ => Content::Text(trimmed.to_string()),
            }
        };

        Message::new(chat_id, content).with_sender_opt(sender)
    }

    /// Split a command into keyword, first-line arguments and body lines.
    ///
    /// Returns `None` for a command addressed to a different bot.
    fn parse_command(&self, cmd_text: &str) -> Option<Content> {
        let mut lines = cmd_text.lines();
        let first = lines.next().unwrap_or_default();

        let mut words = first.split_whitespace();
        let keyword = words.next().unwrap_or_default();
        // Group chats address commands as `/vote@my_bot`
        let (name, mention) = match keyword.split_once('@') {
            Some((name, mention)) => (name, Some(mention)),
            None => (keyword, None),
        };
        if let (Some(mention), Some(own)) = (mention, self.bot_username.as_deref()) {
            if !mention.eq_ignore_ascii_case(own) {
                return None;
            }
        }
        let name = name.to_lowercase();
        let args = words.map(str::to_string).collect();

        let body = lines
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        Some(Content::Command { name, args, body })
    }
}
