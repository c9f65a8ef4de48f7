//! Console adapter for development/testing

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::application::errors::BotError;
use crate::application::messaging::MessageParser;
use crate::domain::entities::{Message, User};
use crate::domain::traits::{Bot, BotInfo};
use crate::infrastructure::config::ConsoleConfig;

/// Console bot adapter for local development.
///
/// Every message comes from the configured user in the configured channel.
pub struct ConsoleAdapter {
    info: BotInfo,
    user: String,
    channel: String,
}

impl ConsoleAdapter {
    pub fn new(bot_name: impl Into<String>, config: &ConsoleConfig) -> Self {
        Self {
            info: BotInfo {
                id: "console".to_string(),
                name: bot_name.into(),
                username: "console".to_string(),
            },
            user: config.user.clone(),
            channel: config.channel.clone(),
        }
    }

    /// Read one chat message: lines up to a blank line or EOF.
    ///
    /// Returns `None` once the input is exhausted.
    pub async fn read_message<R>(reader: &mut R) -> std::io::Result<Option<String>>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = Vec::new();
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).await? == 0 {
                break;
            }
            let line = line.trim_end_matches(['\r', '\n']);
            if line.trim().is_empty() {
                if lines.is_empty() {
                    continue;
                }
                break;
            }
            lines.push(line.to_string());
        }

        if lines.is_empty() {
            Ok(None)
        } else {
            Ok(Some(lines.join("\n")))
        }
    }

    /// Wrap console text as a message from the configured identity
    pub fn to_message(&self, parser: &MessageParser, text: &str) -> Message {
        parser
            .parse(&self.channel, text, Some(User::new(&self.user)))
            .with_platform("console")
    }
}

#[async_trait]
impl Bot for ConsoleAdapter {
    async fn start(&self) -> Result<(), BotError> {
        tracing::info!(
            user = %self.user,
            channel = %self.channel,
            "Starting console bot (dev mode)"
        );
        println!("Type a command, finish it with an empty line. Ctrl-D quits.");
        Ok(())
    }

    async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<String, BotError> {
        match reply_to {
            Some(_) => println!("[BOT -> {}] {}", self.user, text),
            None => println!("[BOT #{}] {}", chat_id, text),
        }
        Ok("console_msg".to_string())
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}
